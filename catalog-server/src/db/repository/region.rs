//! Region Repository
//!
//! Regions are a reference dimension: imports only read them.

use super::RepoResult;
use shared::models::Region;
use sqlx::SqliteConnection;

pub async fn find_all(conn: &mut SqliteConnection) -> RepoResult<Vec<Region>> {
    let rows = sqlx::query_as::<_, Region>("SELECT id, name FROM region ORDER BY name")
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

pub async fn create(conn: &mut SqliteConnection, name: &str) -> RepoResult<Region> {
    let row = sqlx::query_as::<_, Region>("INSERT INTO region (name) VALUES (?) RETURNING id, name")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row)
}
