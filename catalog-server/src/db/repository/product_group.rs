//! Product Group Repository

use super::RepoResult;
use shared::models::ProductGroup;
use sqlx::SqliteConnection;

pub async fn find_all(conn: &mut SqliteConnection) -> RepoResult<Vec<ProductGroup>> {
    let rows = sqlx::query_as::<_, ProductGroup>("SELECT id, name FROM product_group ORDER BY name")
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

pub async fn create(conn: &mut SqliteConnection, name: &str) -> RepoResult<ProductGroup> {
    let row = sqlx::query_as::<_, ProductGroup>(
        "INSERT INTO product_group (name) VALUES (?) RETURNING id, name",
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

/// Add a product to a group; existing membership is left as is
pub async fn add_product(
    conn: &mut SqliteConnection,
    group_id: i64,
    product_id: i64,
) -> RepoResult<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO product_group_product (group_id, product_id) VALUES (?, ?)",
    )
    .bind(group_id)
    .bind(product_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn find_product_ids(conn: &mut SqliteConnection, group_id: i64) -> RepoResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT product_id FROM product_group_product WHERE group_id = ? ORDER BY product_id",
    )
    .bind(group_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids)
}
