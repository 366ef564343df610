//! Price Repository
//!
//! Prices are stored as decimal strings and parsed back into [`Decimal`].

use super::{RepoError, RepoResult};
use rust_decimal::Decimal;
use shared::models::Price;
use sqlx::SqliteConnection;
use std::str::FromStr;

const COLUMNS: &str = "id, product_id, region_id, price, old_price, updated_at";

#[derive(sqlx::FromRow)]
struct PriceRow {
    id: i64,
    product_id: i64,
    region_id: i64,
    price: String,
    old_price: Option<String>,
    updated_at: i64,
}

impl TryFrom<PriceRow> for Price {
    type Error = RepoError;

    fn try_from(row: PriceRow) -> Result<Self, Self::Error> {
        let parse = |s: &str| {
            Decimal::from_str(s)
                .map_err(|e| RepoError::Database(format!("corrupt price '{s}' in row {}: {e}", row.id)))
        };
        Ok(Price {
            id: row.id,
            product_id: row.product_id,
            region_id: row.region_id,
            price: parse(&row.price)?,
            old_price: row.old_price.as_deref().map(parse).transpose()?,
            updated_at: row.updated_at,
        })
    }
}

pub async fn find(
    conn: &mut SqliteConnection,
    product_id: i64,
    region_id: i64,
) -> RepoResult<Option<Price>> {
    let sql = format!("SELECT {COLUMNS} FROM price WHERE product_id = ? AND region_id = ?");
    let row = sqlx::query_as::<_, PriceRow>(&sql)
        .bind(product_id)
        .bind(region_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(Price::try_from).transpose()
}

pub async fn find_by_product(conn: &mut SqliteConnection, product_id: i64) -> RepoResult<Vec<Price>> {
    let sql = format!("SELECT {COLUMNS} FROM price WHERE product_id = ? ORDER BY region_id");
    let rows = sqlx::query_as::<_, PriceRow>(&sql)
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;
    rows.into_iter().map(Price::try_from).collect()
}

/// Insert a first price; `false` when the pair already has one
pub async fn insert_if_absent(
    conn: &mut SqliteConnection,
    product_id: i64,
    region_id: i64,
    value: Decimal,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let result = sqlx::query(
        "INSERT INTO price (product_id, region_id, price, old_price, updated_at) VALUES (?, ?, ?, NULL, ?) \
         ON CONFLICT(product_id, region_id) DO NOTHING",
    )
    .bind(product_id)
    .bind(region_id)
    .bind(value.to_string())
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Move the current price into `old_price` and store the new one
pub async fn shift_and_set(conn: &mut SqliteConnection, id: i64, value: Decimal) -> RepoResult<()> {
    let now = shared::util::now_millis();
    sqlx::query("UPDATE price SET old_price = price, price = ?, updated_at = ? WHERE id = ?")
        .bind(value.to_string())
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, product_id: i64, region_id: i64) -> RepoResult<bool> {
    let result = sqlx::query("DELETE FROM price WHERE product_id = ? AND region_id = ?")
        .bind(product_id)
        .bind(region_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
