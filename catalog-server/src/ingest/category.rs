//! Category path resolution
//!
//! Turns a delimited path cell (root first) into a chain of nested-set
//! nodes, creating missing nodes under their parent.

use super::IngestError;
use super::slug::slugify;
use crate::db::repository::{RepoError, category};
use shared::models::{Category, CategoryCreate};
use sqlx::SqliteConnection;

/// Non-empty trimmed segments of a path cell, root first
pub fn split_path<'a>(cell: &'a str, delimiter: &str) -> Vec<&'a str> {
    if delimiter.is_empty() {
        let segment = cell.trim();
        return if segment.is_empty() { Vec::new() } else { vec![segment] };
    }
    cell.split(delimiter)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Resolve every segment of `path`; returns the chain root..leaf
pub async fn resolve(
    conn: &mut SqliteConnection,
    path: &[&str],
    tree_id: i64,
) -> Result<Vec<Category>, IngestError> {
    if path.is_empty() {
        return Err(IngestError::EmptyCategoryPath);
    }

    let mut chain: Vec<Category> = Vec::with_capacity(path.len());
    for (level, name) in path.iter().enumerate() {
        let node = find_or_create(conn, name, chain.last(), tree_id, level as i64)
            .await
            .map_err(|source| IngestError::CategoryCreate {
                name: name.to_string(),
                source,
            })?;
        chain.push(node);
    }
    Ok(chain)
}

async fn find_or_create(
    conn: &mut SqliteConnection,
    name: &str,
    parent: Option<&Category>,
    tree_id: i64,
    level: i64,
) -> Result<Category, RepoError> {
    let slug = slugify(name);
    if let Some(existing) = category::find_by_slug(conn, &slug).await? {
        return Ok(existing);
    }

    let lft = match parent {
        None => category::max_rght_in_tree(conn, tree_id).await?.unwrap_or(0) + 1,
        Some(parent) => {
            // The parent row may have been widened by an earlier gap in this row
            let parent = category::find_by_id(conn, parent.id)
                .await?
                .ok_or_else(|| RepoError::NotFound(format!("category {}", parent.id)))?;
            let lft = category::max_child_rght(conn, parent.id)
                .await?
                .unwrap_or(parent.lft)
                + 1;
            category::open_gap(conn, parent.tree_id, lft, 2).await?;
            lft
        }
    };

    let data = CategoryCreate {
        name: name.to_string(),
        slug: slug.clone(),
        parent_id: parent.map(|p| p.id),
        lft,
        rght: lft + 1,
        tree_id: parent.map(|p| p.tree_id).unwrap_or(tree_id),
        level,
    };

    match category::insert_if_absent(conn, &data).await? {
        Some(created) => {
            tracing::debug!(category = %created.name, id = created.id, lft, level, "Category created");
            Ok(created)
        }
        // Lost a race on the slug; the winner's row is the one to use
        None => category::find_by_slug(conn, &slug)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("category '{slug}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    async fn assert_valid_tree(conn: &mut SqliteConnection) {
        let all = category::find_all(conn).await.unwrap();
        for node in &all {
            assert!(node.lft < node.rght, "{} has lft >= rght", node.name);
            if let Some(parent_id) = node.parent_id {
                let parent = all.iter().find(|c| c.id == parent_id).unwrap();
                assert!(parent.contains(node), "{} escapes {}", node.name, parent.name);
            }
        }
        for a in &all {
            for b in &all {
                if a.id != b.id && a.parent_id == b.parent_id {
                    assert!(a.rght < b.lft || b.rght < a.lft, "{} overlaps {}", a.name, b.name);
                }
            }
        }
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("Home | Tools", " | "), vec!["Home", "Tools"]);
        assert_eq!(split_path(" Home |  | Tools ", " | "), vec!["Home", "Tools"]);
        assert!(split_path("   ", " | ").is_empty());
        assert_eq!(split_path("Garden", " | "), vec!["Garden"]);
    }

    #[tokio::test]
    async fn test_resolve_creates_chain() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();

        let chain = resolve(&mut conn, &["Home", "Tools"], 1).await.unwrap();
        assert_eq!(chain.len(), 2);
        let home = category::find_by_slug(&mut conn, "home").await.unwrap().unwrap();
        let tools = category::find_by_slug(&mut conn, "tools").await.unwrap().unwrap();
        assert_eq!(tools.parent_id, Some(home.id));
        assert_eq!((home.lft, home.rght), (1, 4));
        assert_eq!((tools.lft, tools.rght), (2, 3));
        assert_eq!((home.level, tools.level), (0, 1));
        assert_valid_tree(&mut conn).await;
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();

        let first = resolve(&mut conn, &["Home", "Tools"], 1).await.unwrap();
        let second = resolve(&mut conn, &["Home", "Tools"], 1).await.unwrap();
        assert_eq!(first.last().unwrap().id, second.last().unwrap().id);
        assert_eq!(category::find_all(&mut conn).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_siblings_and_roots_keep_tree_valid() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();

        resolve(&mut conn, &["Home", "Tools"], 1).await.unwrap();
        resolve(&mut conn, &["Garden"], 1).await.unwrap();
        resolve(&mut conn, &["Home", "Kitchen", "Knives"], 1).await.unwrap();
        resolve(&mut conn, &["Home", "Tools", "Hammers"], 1).await.unwrap();
        resolve(&mut conn, &["Garden", "Seeds"], 1).await.unwrap();

        assert_valid_tree(&mut conn).await;
        let home = category::find_by_slug(&mut conn, "home").await.unwrap().unwrap();
        let hammers = category::find_by_slug(&mut conn, "hammers").await.unwrap().unwrap();
        let garden = category::find_by_slug(&mut conn, "garden").await.unwrap().unwrap();
        assert!(home.contains(&hammers));
        assert!(!garden.contains(&hammers));
        assert!(home.rght < garden.lft);
    }

    #[tokio::test]
    async fn test_empty_path_is_rejected() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        assert!(matches!(
            resolve(&mut conn, &[], 1).await,
            Err(IngestError::EmptyCategoryPath)
        ));
    }
}
