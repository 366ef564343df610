//! Product group membership

use super::IngestError;
use super::lookup::GroupIndex;
use crate::db::repository::product_group;
use sqlx::SqliteConnection;

/// Link the product to every known group named in `cell`
///
/// Unknown names are skipped. Returns the number of new memberships and
/// any field-local failures.
pub async fn apply(
    conn: &mut SqliteConnection,
    product_id: i64,
    groups: &GroupIndex,
    cell: &str,
    delimiter: char,
) -> (usize, Vec<IngestError>) {
    let mut linked = 0;
    let mut errors = Vec::new();
    for name in cell.split(delimiter).map(str::trim).filter(|n| !n.is_empty()) {
        let Some(group) = groups.get(name) else {
            tracing::debug!(group = %name, product_id, "Unknown product group skipped");
            continue;
        };
        match product_group::add_product(conn, group.id, product_id).await {
            Ok(true) => linked += 1,
            Ok(false) => {}
            Err(source) => errors.push(IngestError::GroupLink {
                group: name.to_string(),
                source,
            }),
        }
    }
    (linked, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::ingest::lookup::group_index;
    use crate::ingest::{category, product};

    #[tokio::test]
    async fn test_links_known_groups_once() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let sale = product_group::create(&mut conn, "Sale").await.unwrap();
        let new = product_group::create(&mut conn, "New").await.unwrap();
        let groups = group_index(product_group::find_all(&mut conn).await.unwrap());

        let chain = category::resolve(&mut conn, &["Tools"], 1).await.unwrap();
        let fields = product::ProductFields {
            article: "A1",
            ..Default::default()
        };
        let defaults = product::ProductDefaults {
            title: "Widget",
            description: "No description",
            priority: 500,
        };
        let p = product::resolve(&mut conn, &fields, &chain, defaults, &mut Vec::new())
            .await
            .unwrap();

        let (linked, errors) = apply(&mut conn, p.id, &groups, "Sale, Ghost ,New", ',').await;
        assert_eq!(linked, 2);
        assert!(errors.is_empty());
        let (linked, _) = apply(&mut conn, p.id, &groups, "Sale", ',').await;
        assert_eq!(linked, 0);

        assert_eq!(product_group::find_product_ids(&mut conn, sale.id).await.unwrap(), vec![p.id]);
        assert_eq!(product_group::find_product_ids(&mut conn, new.id).await.unwrap(), vec![p.id]);
    }
}
