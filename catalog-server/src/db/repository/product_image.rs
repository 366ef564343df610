//! Product Image Repository

use super::RepoResult;
use shared::models::ProductImage;
use sqlx::SqliteConnection;

const COLUMNS: &str = "id, product_id, role, name, image, thumb, created_at";

pub async fn exists(conn: &mut SqliteConnection, product_id: i64, name: &str) -> RepoResult<bool> {
    let found = sqlx::query_scalar::<_, i64>(
        "SELECT 1 FROM product_image WHERE product_id = ? AND name = ? LIMIT 1",
    )
    .bind(product_id)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(found.is_some())
}

/// Record a derived image; `None` when the product already has one with this name
pub async fn insert_if_absent(
    conn: &mut SqliteConnection,
    product_id: i64,
    role: &str,
    name: &str,
    image: &str,
    thumb: Option<&str>,
) -> RepoResult<Option<ProductImage>> {
    let now = shared::util::now_millis();
    let sql = format!(
        "INSERT INTO product_image (product_id, role, name, image, thumb, created_at) VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT(product_id, name) DO NOTHING RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, ProductImage>(&sql)
        .bind(product_id)
        .bind(role)
        .bind(name)
        .bind(image)
        .bind(thumb)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn find_by_product(
    conn: &mut SqliteConnection,
    product_id: i64,
) -> RepoResult<Vec<ProductImage>> {
    let sql = format!("SELECT {COLUMNS} FROM product_image WHERE product_id = ? ORDER BY id");
    let rows = sqlx::query_as::<_, ProductImage>(&sql)
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}
