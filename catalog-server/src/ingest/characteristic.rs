//! Characteristic resolution

use super::IngestError;
use super::settings::CharacteristicScope;
use super::slug::slugify;
use crate::db::repository::{RepoError, characteristic};
use shared::models::{Characteristic, CharacteristicValue};
use sqlx::SqliteConnection;

/// Scope key for a characteristic named under `category_id`
pub fn scope_key(scope: CharacteristicScope, category_id: i64) -> i64 {
    match scope {
        CharacteristicScope::PerCategory => category_id,
        CharacteristicScope::Global => 0,
    }
}

pub async fn find_or_create(
    conn: &mut SqliteConnection,
    name: &str,
    category_id: i64,
    scope: CharacteristicScope,
) -> Result<Characteristic, RepoError> {
    let slug = slugify(name);
    let key = scope_key(scope, category_id);
    if let Some(existing) = characteristic::find(conn, &slug, key).await? {
        return Ok(existing);
    }
    let owner = match scope {
        CharacteristicScope::PerCategory => Some(category_id),
        CharacteristicScope::Global => None,
    };
    match characteristic::insert_if_absent(conn, name, &slug, owner, key).await? {
        Some(created) => {
            tracing::debug!(characteristic = %created.name, id = created.id, scope_key = key, "Characteristic created");
            Ok(created)
        }
        None => characteristic::find(conn, &slug, key)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("characteristic '{slug}'"))),
    }
}

/// Store `value` for the product under the characteristic named `column`
pub async fn apply(
    conn: &mut SqliteConnection,
    product_id: i64,
    category_id: i64,
    column: &str,
    value: &str,
    scope: CharacteristicScope,
) -> Result<CharacteristicValue, IngestError> {
    let wrap = |source: RepoError| IngestError::Characteristic {
        column: column.to_string(),
        source,
    };
    let characteristic = find_or_create(conn, column, category_id, scope)
        .await
        .map_err(wrap)?;
    characteristic::upsert_value(conn, product_id, characteristic.id, value, &slugify(value))
        .await
        .map_err(wrap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::ingest::{category, product};

    async fn seed_product(conn: &mut SqliteConnection, article: &str, path: &[&str]) -> (i64, i64) {
        let chain = category::resolve(conn, path, 1).await.unwrap();
        let fields = product::ProductFields {
            article,
            ..Default::default()
        };
        let defaults = product::ProductDefaults {
            title: article,
            description: "No description",
            priority: 500,
        };
        let p = product::resolve(conn, &fields, &chain, defaults, &mut Vec::new())
            .await
            .unwrap();
        (p.id, chain.last().unwrap().id)
    }

    #[tokio::test]
    async fn test_value_is_overwritten() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let (product_id, category_id) = seed_product(&mut conn, "A1", &["Tools"]).await;
        let scope = CharacteristicScope::PerCategory;

        let first = apply(&mut conn, product_id, category_id, "Color", "Red", scope).await.unwrap();
        let second = apply(&mut conn, product_id, category_id, "Color", "Blue", scope).await.unwrap();
        assert_eq!(first.characteristic_id, second.characteristic_id);
        assert_eq!(second.value, "Blue");
        assert_eq!(second.slug, "blue");
        let values = characteristic::find_values_by_product(&mut conn, product_id).await.unwrap();
        assert_eq!(values.len(), 1);
    }

    #[tokio::test]
    async fn test_scope_policies() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let (_, tools) = seed_product(&mut conn, "A1", &["Tools"]).await;
        let (_, garden) = seed_product(&mut conn, "A2", &["Garden"]).await;

        let a = find_or_create(&mut conn, "Color", tools, CharacteristicScope::PerCategory).await.unwrap();
        let b = find_or_create(&mut conn, "Color", garden, CharacteristicScope::PerCategory).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.category_id, Some(tools));

        let g1 = find_or_create(&mut conn, "Color", tools, CharacteristicScope::Global).await.unwrap();
        let g2 = find_or_create(&mut conn, "Color", garden, CharacteristicScope::Global).await.unwrap();
        assert_eq!(g1.id, g2.id);
        assert_eq!(g1.scope_key, 0);
    }
}
