//! Brand Repository

use super::RepoResult;
use shared::models::Brand;
use sqlx::SqliteConnection;

const COLUMNS: &str = "id, name, slug, sort_order";

pub async fn find_by_slug(conn: &mut SqliteConnection, slug: &str) -> RepoResult<Option<Brand>> {
    let sql = format!("SELECT {COLUMNS} FROM brand WHERE slug = ?");
    let row = sqlx::query_as::<_, Brand>(&sql)
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn find_all(conn: &mut SqliteConnection) -> RepoResult<Vec<Brand>> {
    let sql = format!("SELECT {COLUMNS} FROM brand ORDER BY sort_order, name");
    let rows = sqlx::query_as::<_, Brand>(&sql)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

/// Insert a brand unless the slug is taken; `None` means someone else owns it
pub async fn insert_if_absent(
    conn: &mut SqliteConnection,
    name: &str,
    slug: &str,
    sort_order: i64,
) -> RepoResult<Option<Brand>> {
    let sql = format!(
        "INSERT INTO brand (name, slug, sort_order) VALUES (?, ?, ?) ON CONFLICT(slug) DO NOTHING RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, Brand>(&sql)
        .bind(name)
        .bind(slug)
        .bind(sort_order)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn set_sort_order(conn: &mut SqliteConnection, id: i64, sort_order: i64) -> RepoResult<()> {
    sqlx::query("UPDATE brand SET sort_order = ? WHERE id = ?")
        .bind(sort_order)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
