//! Product resolution
//!
//! Find-or-create by article, then bring the mutable fields in line with
//! the row.

use super::IngestError;
use super::slug::slugify;
use crate::db::repository::{RepoError, brand, product};
use shared::models::{Brand, Category, Product, ProductCreate, ProductUpdate};
use sqlx::SqliteConnection;

/// Product fields read from one row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFields<'a> {
    pub article: &'a str,
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub priority: Option<&'a str>,
    pub brand: Option<&'a str>,
    pub in_stock: Option<&'a str>,
}

/// Fallbacks for absent cells
#[derive(Debug, Clone, Copy)]
pub struct ProductDefaults<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub priority: i64,
}

/// Integer priority; fractional values truncate, anything else is `None`
pub fn parse_priority(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    if let Ok(v) = cell.parse::<i64>() {
        return Some(v);
    }
    cell.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.trunc() as i64)
}

pub fn parse_in_stock(cell: &str) -> Option<bool> {
    match cell.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "+" | "да" => Some(true),
        "0" | "false" | "no" | "n" | "-" | "нет" => Some(false),
        _ => None,
    }
}

/// Find-or-create a brand by slug
pub async fn resolve_brand(
    conn: &mut SqliteConnection,
    name: &str,
    sort_order: Option<i64>,
) -> Result<Brand, RepoError> {
    let slug = slugify(name);
    let mut found = brand::find_by_slug(conn, &slug).await?;
    if found.is_none() {
        found = match brand::insert_if_absent(conn, name, &slug, sort_order.unwrap_or(0)).await? {
            Some(created) => {
                tracing::debug!(brand = %created.name, id = created.id, "Brand created");
                return Ok(created);
            }
            None => brand::find_by_slug(conn, &slug).await?,
        };
    }
    let mut existing = found.ok_or_else(|| RepoError::NotFound(format!("brand '{slug}'")))?;
    if let Some(order) = sort_order
        && order != existing.sort_order
    {
        brand::set_sort_order(conn, existing.id, order).await?;
        existing.sort_order = order;
    }
    Ok(existing)
}

/// Resolve the row's product against its leaf category
///
/// Field-local problems (an unresolvable brand) are pushed to `warnings`.
pub async fn resolve(
    conn: &mut SqliteConnection,
    fields: &ProductFields<'_>,
    chain: &[Category],
    defaults: ProductDefaults<'_>,
    warnings: &mut Vec<IngestError>,
) -> Result<Product, IngestError> {
    let article = fields.article.trim();
    if article.is_empty() {
        return Err(IngestError::MissingArticle);
    }
    let leaf = chain.last().ok_or(IngestError::EmptyCategoryPath)?;

    let brand_id = match fields.brand.map(str::trim).filter(|b| !b.is_empty()) {
        Some(name) => match resolve_brand(conn, name, None).await {
            Ok(b) => Some(b.id),
            Err(source) => {
                warnings.push(IngestError::Brand {
                    name: name.to_string(),
                    source,
                });
                None
            }
        },
        None => None,
    };

    let persist_error = |source: RepoError| IngestError::ProductCreate {
        article: article.to_string(),
        source,
    };

    let product = match product::find_by_article(conn, article)
        .await
        .map_err(persist_error)?
    {
        Some(existing) => update(conn, &existing, fields, leaf.id, brand_id, defaults)
            .await
            .map_err(persist_error)?,
        None => create(conn, article, fields, leaf.id, brand_id, defaults)
            .await
            .map_err(persist_error)?,
    };

    for node in chain {
        product::add_additional_category(conn, product.id, node.id)
            .await
            .map_err(persist_error)?;
    }
    Ok(product)
}

fn title_of<'a>(fields: &ProductFields<'a>, defaults: ProductDefaults<'a>) -> &'a str {
    fields
        .title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(defaults.title)
}

fn description_of<'a>(fields: &ProductFields<'a>, defaults: ProductDefaults<'a>) -> &'a str {
    fields
        .description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(defaults.description)
}

async fn create(
    conn: &mut SqliteConnection,
    article: &str,
    fields: &ProductFields<'_>,
    category_id: i64,
    brand_id: Option<i64>,
    defaults: ProductDefaults<'_>,
) -> Result<Product, RepoError> {
    let title = title_of(fields, defaults);
    let base_slug = slugify(title);
    let slug_taken = product::slug_exists(conn, &base_slug).await?;

    let data = ProductCreate {
        article: article.to_string(),
        slug: (!slug_taken).then(|| base_slug.clone()),
        title: title.to_string(),
        description: description_of(fields, defaults).to_string(),
        priority: fields
            .priority
            .and_then(parse_priority)
            .unwrap_or(defaults.priority),
        category_id,
        brand_id,
        in_stock: fields.in_stock.and_then(parse_in_stock).unwrap_or(true),
    };

    let mut created = match product::insert(conn, &data).await {
        Ok(p) => p,
        Err(RepoError::Duplicate(msg)) => {
            // Another import created the article first
            if let Some(existing) = product::find_by_article(conn, article).await? {
                return update(conn, &existing, fields, category_id, brand_id, defaults).await;
            }
            // Otherwise the slug was claimed after our check
            let retry = ProductCreate { slug: None, ..data };
            tracing::debug!(article, reason = %msg, "Product slug collided, retrying without slug");
            let mut p = product::insert(conn, &retry).await?;
            assign_suffixed_slug(conn, &mut p, &base_slug).await?;
            tracing::info!(article, id = p.id, slug = %p.slug, "Product created");
            return Ok(p);
        }
        Err(e) => return Err(e),
    };

    if slug_taken {
        assign_suffixed_slug(conn, &mut created, &base_slug).await?;
    }
    tracing::info!(article, id = created.id, slug = %created.slug, "Product created");
    Ok(created)
}

/// Give a slug-less product `{base}-{id}`, or `{base}-{id}-2`, `-3`… when an
/// earlier title already produced that text
async fn assign_suffixed_slug(
    conn: &mut SqliteConnection,
    created: &mut Product,
    base: &str,
) -> Result<(), RepoError> {
    let stem = format!("{base}-{}", created.id);
    let mut candidate = stem.clone();
    let mut attempt = 1;
    loop {
        if !product::slug_exists(conn, &candidate).await? {
            match product::set_slug(conn, created.id, &candidate).await {
                Ok(()) => {
                    created.slug = candidate;
                    return Ok(());
                }
                Err(RepoError::Duplicate(_)) => {}
                Err(e) => return Err(e),
            }
        }
        attempt += 1;
        candidate = format!("{stem}-{attempt}");
    }
}

async fn update(
    conn: &mut SqliteConnection,
    existing: &Product,
    fields: &ProductFields<'_>,
    category_id: i64,
    brand_id: Option<i64>,
    defaults: ProductDefaults<'_>,
) -> Result<Product, RepoError> {
    let data = ProductUpdate {
        title: Some(title_of(fields, defaults).to_string()),
        description: Some(description_of(fields, defaults).to_string()),
        priority: fields.priority.and_then(parse_priority),
        category_id: Some(category_id),
        brand_id,
        in_stock: fields.in_stock.and_then(parse_in_stock),
    };
    let updated = product::update(conn, existing.id, &data).await?;
    tracing::debug!(article = %existing.article, id = existing.id, "Product updated");
    Ok(updated)
}
