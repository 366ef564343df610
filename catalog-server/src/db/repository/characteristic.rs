//! Characteristic Repository

use super::RepoResult;
use shared::models::{Characteristic, CharacteristicValue};
use sqlx::SqliteConnection;

const COLUMNS: &str = "id, name, slug, category_id, scope_key";
const VALUE_COLUMNS: &str = "id, product_id, characteristic_id, value, slug";

pub async fn find(
    conn: &mut SqliteConnection,
    slug: &str,
    scope_key: i64,
) -> RepoResult<Option<Characteristic>> {
    let sql = format!("SELECT {COLUMNS} FROM characteristic WHERE slug = ? AND scope_key = ?");
    let row = sqlx::query_as::<_, Characteristic>(&sql)
        .bind(slug)
        .bind(scope_key)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn insert_if_absent(
    conn: &mut SqliteConnection,
    name: &str,
    slug: &str,
    category_id: Option<i64>,
    scope_key: i64,
) -> RepoResult<Option<Characteristic>> {
    let sql = format!(
        "INSERT INTO characteristic (name, slug, category_id, scope_key) VALUES (?, ?, ?, ?) \
         ON CONFLICT(slug, scope_key) DO NOTHING RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, Characteristic>(&sql)
        .bind(name)
        .bind(slug)
        .bind(category_id)
        .bind(scope_key)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// Set the value of a characteristic for a product, overwriting any previous value
pub async fn upsert_value(
    conn: &mut SqliteConnection,
    product_id: i64,
    characteristic_id: i64,
    value: &str,
    slug: &str,
) -> RepoResult<CharacteristicValue> {
    let sql = format!(
        "INSERT INTO characteristic_value (product_id, characteristic_id, value, slug) VALUES (?, ?, ?, ?) \
         ON CONFLICT(product_id, characteristic_id) DO UPDATE SET value = excluded.value, slug = excluded.slug \
         RETURNING {VALUE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, CharacteristicValue>(&sql)
        .bind(product_id)
        .bind(characteristic_id)
        .bind(value)
        .bind(slug)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn find_values_by_product(
    conn: &mut SqliteConnection,
    product_id: i64,
) -> RepoResult<Vec<CharacteristicValue>> {
    let sql = format!(
        "SELECT {VALUE_COLUMNS} FROM characteristic_value WHERE product_id = ? ORDER BY characteristic_id"
    );
    let rows = sqlx::query_as::<_, CharacteristicValue>(&sql)
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}
