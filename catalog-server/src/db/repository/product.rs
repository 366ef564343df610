//! Product Repository

use super::{RepoError, RepoResult};
use shared::models::{Product, ProductCreate, ProductUpdate};
use sqlx::SqliteConnection;

const COLUMNS: &str = "id, article, COALESCE(slug, '') AS slug, title, description, priority, category_id, brand_id, in_stock, thumb, catalog_image, search_image, created_at, updated_at";

/// Product column holding a listing image path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingImage {
    Catalog,
    Search,
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<Product>> {
    let sql = format!("SELECT {COLUMNS} FROM product WHERE id = ?");
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn find_by_article(
    conn: &mut SqliteConnection,
    article: &str,
) -> RepoResult<Option<Product>> {
    let sql = format!("SELECT {COLUMNS} FROM product WHERE article = ?");
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(article)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn slug_exists(conn: &mut SqliteConnection, slug: &str) -> RepoResult<bool> {
    let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM product WHERE slug = ? LIMIT 1")
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// Insert a product
///
/// A unique violation (article or slug) surfaces as [`RepoError::Duplicate`].
pub async fn insert(conn: &mut SqliteConnection, data: &ProductCreate) -> RepoResult<Product> {
    let now = shared::util::now_millis();
    let sql = format!(
        "INSERT INTO product (article, slug, title, description, priority, category_id, brand_id, in_stock, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(&data.article)
        .bind(&data.slug)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.priority)
        .bind(data.category_id)
        .bind(data.brand_id)
        .bind(data.in_stock)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn set_slug(conn: &mut SqliteConnection, id: i64, slug: &str) -> RepoResult<()> {
    sqlx::query("UPDATE product SET slug = ? WHERE id = ?")
        .bind(slug)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Apply the present fields of `data`; absent fields keep their value
pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    data: &ProductUpdate,
) -> RepoResult<Product> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE product SET title = COALESCE(?, title), description = COALESCE(?, description), \
         priority = COALESCE(?, priority), category_id = COALESCE(?, category_id), \
         brand_id = COALESCE(?, brand_id), in_stock = COALESCE(?, in_stock), updated_at = ? WHERE id = ?",
    )
    .bind(&data.title)
    .bind(&data.description)
    .bind(data.priority)
    .bind(data.category_id)
    .bind(data.brand_id)
    .bind(data.in_stock)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    if rows == 0 {
        return Err(RepoError::NotFound(format!("product {id}")));
    }
    find_by_id(conn, id)
        .await?
        .ok_or_else(|| RepoError::Database(format!("product {id} vanished during update")))
}

pub async fn set_thumb(conn: &mut SqliteConnection, id: i64, thumb: &str) -> RepoResult<()> {
    sqlx::query("UPDATE product SET thumb = ? WHERE id = ?")
        .bind(thumb)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn set_listing_image(
    conn: &mut SqliteConnection,
    id: i64,
    column: ListingImage,
    path: &str,
) -> RepoResult<()> {
    let sql = match column {
        ListingImage::Catalog => "UPDATE product SET catalog_image = ? WHERE id = ?",
        ListingImage::Search => "UPDATE product SET search_image = ? WHERE id = ?",
    };
    sqlx::query(sql)
        .bind(path)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// `(id, article)` of every product
pub async fn find_articles(conn: &mut SqliteConnection) -> RepoResult<Vec<(i64, String)>> {
    let rows = sqlx::query_as::<_, (i64, String)>("SELECT id, article FROM product ORDER BY id")
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

/// Returns whether the flag changed
pub async fn set_in_stock(conn: &mut SqliteConnection, id: i64, in_stock: bool) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE product SET in_stock = ?, updated_at = ? WHERE id = ? AND in_stock <> ?")
        .bind(in_stock)
        .bind(shared::util::now_millis())
        .bind(id)
        .bind(in_stock)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    Ok(rows > 0)
}

/// Delete a product; prices, values, images and memberships cascade
pub async fn delete(conn: &mut SqliteConnection, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM product WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    Ok(rows > 0)
}

// ── Additional categories ──

pub async fn add_additional_category(
    conn: &mut SqliteConnection,
    product_id: i64,
    category_id: i64,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO product_additional_category (product_id, category_id) VALUES (?, ?)",
    )
    .bind(product_id)
    .bind(category_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn find_additional_categories(
    conn: &mut SqliteConnection,
    product_id: i64,
) -> RepoResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT category_id FROM product_additional_category WHERE product_id = ? ORDER BY category_id",
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids)
}

pub async fn count(conn: &mut SqliteConnection) -> RepoResult<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM product")
        .fetch_one(&mut *conn)
        .await?;
    Ok(n)
}
