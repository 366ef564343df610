//! Category Repository
//!
//! Nested-set storage. Bounds are only ever widened by [`open_gap`], which
//! keeps every interval valid while making room for a new node.

use super::RepoResult;
use shared::models::{Category, CategoryCreate};
use sqlx::SqliteConnection;

const COLUMNS: &str =
    "id, name, slug, parent_id, is_visible, sort_order, lft, rght, tree_id, level, created_at";

pub async fn find_by_slug(conn: &mut SqliteConnection, slug: &str) -> RepoResult<Option<Category>> {
    let sql = format!("SELECT {COLUMNS} FROM category WHERE slug = ?");
    let row = sqlx::query_as::<_, Category>(&sql)
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<Category>> {
    let sql = format!("SELECT {COLUMNS} FROM category WHERE id = ?");
    let row = sqlx::query_as::<_, Category>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// All nodes in tree order
pub async fn find_all(conn: &mut SqliteConnection) -> RepoResult<Vec<Category>> {
    let sql = format!("SELECT {COLUMNS} FROM category ORDER BY tree_id, lft");
    let rows = sqlx::query_as::<_, Category>(&sql)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

/// Largest right bound in a tree, `None` for an empty tree
pub async fn max_rght_in_tree(conn: &mut SqliteConnection, tree_id: i64) -> RepoResult<Option<i64>> {
    let max = sqlx::query_scalar::<_, Option<i64>>(
        "SELECT MAX(rght) FROM category WHERE tree_id = ?",
    )
    .bind(tree_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(max)
}

/// Largest right bound among the direct children of `parent_id`
pub async fn max_child_rght(conn: &mut SqliteConnection, parent_id: i64) -> RepoResult<Option<i64>> {
    let max = sqlx::query_scalar::<_, Option<i64>>(
        "SELECT MAX(rght) FROM category WHERE parent_id = ?",
    )
    .bind(parent_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(max)
}

/// Shift every bound `>= at` in the tree by `width`
///
/// Right bounds move first so `lft < rght` holds after each statement.
pub async fn open_gap(
    conn: &mut SqliteConnection,
    tree_id: i64,
    at: i64,
    width: i64,
) -> RepoResult<()> {
    sqlx::query("UPDATE category SET rght = rght + ? WHERE tree_id = ? AND rght >= ?")
        .bind(width)
        .bind(tree_id)
        .bind(at)
        .execute(&mut *conn)
        .await?;
    sqlx::query("UPDATE category SET lft = lft + ? WHERE tree_id = ? AND lft >= ?")
        .bind(width)
        .bind(tree_id)
        .bind(at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Insert a node unless its slug exists; `None` on conflict
///
/// `sort_order` is set to the new id.
pub async fn insert_if_absent(
    conn: &mut SqliteConnection,
    data: &CategoryCreate,
) -> RepoResult<Option<Category>> {
    let now = shared::util::now_millis();
    let sql = format!(
        "INSERT INTO category (name, slug, parent_id, is_visible, sort_order, lft, rght, tree_id, level, created_at) \
         VALUES (?, ?, ?, 1, 0, ?, ?, ?, ?, ?) ON CONFLICT(slug) DO NOTHING RETURNING {COLUMNS}"
    );
    let inserted = sqlx::query_as::<_, Category>(&sql)
        .bind(&data.name)
        .bind(&data.slug)
        .bind(data.parent_id)
        .bind(data.lft)
        .bind(data.rght)
        .bind(data.tree_id)
        .bind(data.level)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(mut category) = inserted else {
        return Ok(None);
    };

    sqlx::query("UPDATE category SET sort_order = id WHERE id = ?")
        .bind(category.id)
        .execute(&mut *conn)
        .await?;
    category.sort_order = category.id;
    Ok(Some(category))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    fn create(name: &str, parent_id: Option<i64>, lft: i64, rght: i64, level: i64) -> CategoryCreate {
        CategoryCreate {
            name: name.into(),
            slug: name.to_lowercase(),
            parent_id,
            lft,
            rght,
            tree_id: 1,
            level,
        }
    }

    #[tokio::test]
    async fn test_insert_sets_sort_order_and_ignores_duplicate_slug() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();

        let root = insert_if_absent(&mut conn, &create("Tools", None, 1, 2, 0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(root.sort_order, root.id);
        assert!(root.is_visible);

        let dup = insert_if_absent(&mut conn, &create("Tools", None, 3, 4, 0))
            .await
            .unwrap();
        assert!(dup.is_none());
        assert_eq!(max_rght_in_tree(&mut conn, 1).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_open_gap_widens_ancestors_and_shifts_right_nodes() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();

        let a = insert_if_absent(&mut conn, &create("A", None, 1, 4, 0)).await.unwrap().unwrap();
        insert_if_absent(&mut conn, &create("A1", Some(a.id), 2, 3, 1)).await.unwrap();
        insert_if_absent(&mut conn, &create("B", None, 5, 6, 0)).await.unwrap();

        // Room for a second child of A at lft = 4
        open_gap(&mut conn, 1, 4, 2).await.unwrap();

        let a = find_by_slug(&mut conn, "a").await.unwrap().unwrap();
        let a1 = find_by_slug(&mut conn, "a1").await.unwrap().unwrap();
        let b = find_by_slug(&mut conn, "b").await.unwrap().unwrap();
        assert_eq!((a.lft, a.rght), (1, 6));
        assert_eq!((a1.lft, a1.rght), (2, 3));
        assert_eq!((b.lft, b.rght), (7, 8));
        assert_eq!(max_child_rght(&mut conn, a.id).await.unwrap(), Some(3));
    }
}
