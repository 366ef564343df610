//! Regional price resolution

use super::IngestError;
use super::lookup::RegionIndex;
use crate::db::repository::{RepoError, price};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;
use std::str::FromStr;

/// What happened to one price cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceChange {
    Created,
    Updated,
    Unchanged,
    Cleared,
    Skipped,
}

/// Parse a price cell: spaces dropped, `,` accepted as decimal separator,
/// negatives rejected, rounded to 2 places
pub fn parse_price(cell: &str) -> Option<Decimal> {
    let mut text: String = cell
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    if !text.contains('.') && text.matches(',').count() == 1 {
        text = text.replace(',', ".");
    }
    let value = Decimal::from_str(&text).ok()?;
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }
    Some(value.round_dp(2))
}

/// Apply one region column's cell to the product's price
pub async fn apply(
    conn: &mut SqliteConnection,
    product_id: i64,
    regions: &RegionIndex,
    column: &str,
    cell: Option<&str>,
    clear_if_empty: bool,
) -> Result<PriceChange, IngestError> {
    let region = regions
        .get(column)
        .ok_or_else(|| IngestError::RegionNotFound(column.to_string()))?;
    let store_error = |source: RepoError| IngestError::PriceStore {
        region: column.to_string(),
        source,
    };

    let Some(cell) = cell.map(str::trim).filter(|c| !c.is_empty()) else {
        if clear_if_empty && price::delete(conn, product_id, region.id).await.map_err(store_error)? {
            tracing::debug!(product_id, region = %region.name, "Price cleared");
            return Ok(PriceChange::Cleared);
        }
        return Ok(PriceChange::Skipped);
    };

    let value = parse_price(cell).ok_or_else(|| IngestError::InvalidPrice {
        column: column.to_string(),
        value: cell.to_string(),
    })?;

    if price::insert_if_absent(conn, product_id, region.id, value)
        .await
        .map_err(store_error)?
    {
        return Ok(PriceChange::Created);
    }

    let current = price::find(conn, product_id, region.id)
        .await
        .map_err(store_error)?;
    match current {
        Some(existing) if existing.price == value => Ok(PriceChange::Unchanged),
        Some(existing) => {
            price::shift_and_set(conn, existing.id, value)
                .await
                .map_err(store_error)?;
            tracing::debug!(product_id, region = %region.name, old = %existing.price, new = %value, "Price changed");
            Ok(PriceChange::Updated)
        }
        // Deleted between the two statements; nothing to shift
        None => Ok(PriceChange::Skipped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::region;
    use crate::ingest::lookup::region_index;
    use crate::ingest::{category, product};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("1 299,50"), Some(dec("1299.50")));
        assert_eq!(parse_price("10"), Some(dec("10")));
        assert_eq!(parse_price("10.005"), Some(dec("10.00")));
        assert_eq!(parse_price("0"), Some(dec("0")));
        assert_eq!(parse_price("-5"), None);
        assert_eq!(parse_price("abc"), None);
        assert_eq!(parse_price("1,2,3"), None);
    }

    async fn setup(conn: &mut SqliteConnection) -> (i64, RegionIndex) {
        region::create(conn, "Moscow").await.unwrap();
        let regions = region_index(region::find_all(conn).await.unwrap());
        let chain = category::resolve(conn, &["Tools"], 1).await.unwrap();
        let fields = product::ProductFields {
            article: "A1",
            ..Default::default()
        };
        let defaults = product::ProductDefaults {
            title: "Widget",
            description: "No description",
            priority: 500,
        };
        let p = product::resolve(conn, &fields, &chain, defaults, &mut Vec::new())
            .await
            .unwrap();
        (p.id, regions)
    }

    #[tokio::test]
    async fn test_price_history() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let (id, regions) = setup(&mut conn).await;

        let change = apply(&mut conn, id, &regions, "Moscow", Some("100"), false).await.unwrap();
        assert_eq!(change, PriceChange::Created);
        let change = apply(&mut conn, id, &regions, "Moscow", Some("100.00"), false).await.unwrap();
        assert_eq!(change, PriceChange::Unchanged);
        let change = apply(&mut conn, id, &regions, "Moscow", Some("120"), false).await.unwrap();
        assert_eq!(change, PriceChange::Updated);

        let prices = price::find_by_product(&mut conn, id).await.unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].price, dec("120"));
        assert_eq!(prices[0].old_price, Some(dec("100")));
    }

    #[tokio::test]
    async fn test_invalid_and_empty_cells() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let (id, regions) = setup(&mut conn).await;

        let err = apply(&mut conn, id, &regions, "Moscow", Some("abc"), false).await.unwrap_err();
        assert!(matches!(err, IngestError::InvalidPrice { .. }));
        let err = apply(&mut conn, id, &regions, "Atlantis", Some("10"), false).await.unwrap_err();
        assert!(matches!(err, IngestError::RegionNotFound(_)));

        apply(&mut conn, id, &regions, "Moscow", Some("50"), false).await.unwrap();
        let change = apply(&mut conn, id, &regions, "Moscow", Some(""), false).await.unwrap();
        assert_eq!(change, PriceChange::Skipped);
        let change = apply(&mut conn, id, &regions, "Moscow", None, true).await.unwrap();
        assert_eq!(change, PriceChange::Cleared);
        assert!(price::find_by_product(&mut conn, id).await.unwrap().is_empty());
    }
}
