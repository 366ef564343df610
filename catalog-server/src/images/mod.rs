//! Product image derivation
//!
//! Each source named in a row's images cell is fetched once, decoded and
//! rendered into the role variants the product is still missing. Variants
//! are written as lossless WebP under the media root and recorded as
//! [`ProductImage`](shared::models::ProductImage) rows.
//!
//! | role        | geometry                 | source images |
//! |-------------|--------------------------|---------------|
//! | `ORIGINAL`  | untouched                | all (opt-in)  |
//! | `CATALOG`   | fit + pad on white       | first         |
//! | `SEARCH`    | fit + pad on white       | first         |
//! | `WATERMARK` | fill (center crop) + mark| all           |

mod fetch;
mod store;
mod transform;

pub use fetch::ImageSource;
pub use transform::{Geometry, ImageSize};

use crate::db::repository::{RepoError, product, product_image};
use crate::ingest::IngestError;
use image::RgbaImage;
use shared::error::ErrorCode;
use shared::models::Product;
use sqlx::SqliteConnection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageRole {
    Original,
    Catalog,
    Search,
    Watermark,
}

impl ImageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageRole::Original => "ORIGINAL",
            ImageRole::Catalog => "CATALOG",
            ImageRole::Search => "SEARCH",
            ImageRole::Watermark => "WATERMARK",
        }
    }

    /// Roles derived from the source at `position` in the cell
    pub fn for_position(position: usize, keep_original: bool) -> Vec<ImageRole> {
        let mut roles = vec![ImageRole::Watermark];
        if keep_original {
            roles.push(ImageRole::Original);
        }
        if position == 0 {
            roles.push(ImageRole::Catalog);
            roles.push(ImageRole::Search);
        }
        roles
    }

    /// Idempotence tag stored in `product_image.name`
    pub fn tag(&self, basename: &str) -> String {
        format!("{}_{}", self.as_str(), basename)
    }
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("payload of {size} bytes exceeds {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("watermark unavailable: {0}")]
    Watermark(String),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("image record not stored: {0}")]
    Persist(#[from] RepoError),

    #[error("image worker failed: {0}")]
    Worker(String),
}

impl ImageError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ImageError::Fetch(_) => ErrorCode::ImageFetchFailed,
            ImageError::Timeout(_) => ErrorCode::TimeoutError,
            ImageError::TooLarge { .. } => ErrorCode::FileTooLarge,
            ImageError::Decode(_) => ErrorCode::InvalidImageFile,
            ImageError::Encode(_) => ErrorCode::ImageProcessingFailed,
            ImageError::Watermark(_) => ErrorCode::WatermarkUnavailable,
            ImageError::Io(_) => ErrorCode::FileStorageFailed,
            ImageError::Persist(_) => ErrorCode::DatabaseError,
            ImageError::Worker(_) => ErrorCode::InternalError,
        }
    }
}

/// Target sizes per role
#[derive(Debug, Clone, Copy)]
pub struct RoleSizes {
    pub catalog: ImageSize,
    pub search: ImageSize,
    pub watermark: ImageSize,
    /// Watermark asset size
    pub wt_mark: ImageSize,
}

impl Default for RoleSizes {
    fn default() -> Self {
        Self {
            catalog: ImageSize::new(500, 500),
            search: ImageSize::new(42, 50),
            watermark: ImageSize::new(1280, 720),
            wt_mark: ImageSize::new(42, 50),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageSettings {
    pub media_root: PathBuf,
    /// Directory under the media root for derived files
    pub catalog_path: String,
    pub sizes: RoleSizes,
    pub watermark_path: Option<PathBuf>,
    /// Watermark opacity in percent
    pub watermark_opacity: u8,
    pub watermark_margin: u32,
    pub fetch_timeout: Duration,
    pub max_bytes: usize,
    pub keep_original: bool,
    /// Base directory for relative local sources
    pub source_root: Option<PathBuf>,
    pub delimiter: String,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("media"),
            catalog_path: "catalog/products".into(),
            sizes: RoleSizes::default(),
            watermark_path: None,
            watermark_opacity: 60,
            watermark_margin: 30,
            fetch_timeout: Duration::from_secs(15),
            max_bytes: 20 * 1024 * 1024,
            keep_original: false,
            source_root: None,
            delimiter: "||".into(),
        }
    }
}

impl ImageSettings {
    pub fn size_of(&self, role: ImageRole) -> Option<ImageSize> {
        match role {
            ImageRole::Original => None,
            ImageRole::Catalog => Some(self.sizes.catalog),
            ImageRole::Search => Some(self.sizes.search),
            ImageRole::Watermark => Some(self.sizes.watermark),
        }
    }
}

/// One rendered and written variant
#[derive(Debug, Clone)]
struct Rendered {
    role: ImageRole,
    /// Path relative to the media root
    path: String,
    thumb: String,
}

/// Output of the blocking render step for one source
struct SourceOutput {
    product_thumb: Option<String>,
    variants: Vec<Result<Rendered, (ImageRole, ImageError)>>,
}

pub struct ImagePipeline {
    settings: Arc<ImageSettings>,
    http: reqwest::Client,
    watermark: Option<Arc<RgbaImage>>,
}

impl ImagePipeline {
    /// Build the pipeline, loading and pre-scaling the watermark asset
    ///
    /// A missing or unreadable asset is logged; watermark variants are then
    /// rendered unmarked.
    pub fn new(settings: ImageSettings, http: reqwest::Client) -> Self {
        let watermark = settings.watermark_path.as_deref().and_then(|path| {
            match load_watermark(path, &settings) {
                Ok(mark) => {
                    tracing::info!(path = %path.display(), "Watermark loaded");
                    Some(Arc::new(mark))
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, code = ?e.code(), "Watermark not loaded");
                    None
                }
            }
        });
        Self {
            settings: Arc::new(settings),
            http,
            watermark,
        }
    }

    pub fn settings(&self) -> &ImageSettings {
        &self.settings
    }

    pub fn has_watermark(&self) -> bool {
        self.watermark.is_some()
    }

    /// Derive the missing variants for every source in `cell`
    ///
    /// Failures are per source or per role and come back as field-local
    /// errors; nothing here aborts the row.
    pub async fn process_product(
        &self,
        conn: &mut SqliteConnection,
        product: &Product,
        cell: &str,
    ) -> Vec<IngestError> {
        let mut errors = Vec::new();
        let sources = cell
            .split(self.settings.delimiter.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty());

        for (position, origin) in sources.enumerate() {
            let skipped = |error| IngestError::Image {
                origin: origin.to_string(),
                error,
            };
            match self.process_source(conn, product, position, origin).await {
                Ok(role_errors) => errors.extend(role_errors.into_iter().map(skipped)),
                Err(error) => errors.push(skipped(error)),
            }
        }
        errors
    }

    /// Render and record one source
    ///
    /// `Err` means nothing was derived from the source. Failures of single
    /// roles come back in the `Ok` list and leave the other roles in place.
    async fn process_source(
        &self,
        conn: &mut SqliteConnection,
        product: &Product,
        position: usize,
        origin: &str,
    ) -> Result<Vec<ImageError>, ImageError> {
        let source = ImageSource::parse(origin, self.settings.source_root.as_deref());
        let basename = source.basename();

        let mut pending = Vec::new();
        for role in ImageRole::for_position(position, self.settings.keep_original) {
            if !product_image::exists(conn, product.id, &role.tag(&basename)).await? {
                pending.push(role);
            }
        }
        if pending.is_empty() {
            tracing::debug!(product_id = product.id, origin, "All image variants present, fetch skipped");
            return Ok(Vec::new());
        }

        let bytes = source
            .fetch(&self.http, self.settings.fetch_timeout, self.settings.max_bytes)
            .await?;

        let settings = Arc::clone(&self.settings);
        let watermark = self.watermark.clone();
        let hint = source.extension();
        let want_thumb = position == 0;
        let output = tokio::task::spawn_blocking(move || {
            render_source(&bytes, hint.as_deref(), &pending, want_thumb, &settings, watermark.as_deref())
        })
        .await
        .map_err(|e| ImageError::Worker(e.to_string()))??;

        let mut role_errors = Vec::new();
        if let Some(thumb) = output.product_thumb.as_deref()
            && let Err(e) = product::set_thumb(conn, product.id, thumb).await
        {
            tracing::warn!(product_id = product.id, origin, error = %e, "Product thumbnail not stored");
            role_errors.push(ImageError::Persist(e));
        }

        for variant in output.variants {
            let rendered = match variant {
                Ok(r) => r,
                Err((role, error)) => {
                    tracing::warn!(product_id = product.id, origin, role = role.as_str(), error = %error, "Image variant skipped");
                    role_errors.push(error);
                    continue;
                }
            };
            if let Err(e) = self.persist(conn, product, &basename, &rendered).await {
                tracing::warn!(product_id = product.id, origin, role = rendered.role.as_str(), error = %e, "Image variant not recorded");
                store::remove_variant(&self.settings.media_root, &rendered.path);
                role_errors.push(ImageError::Persist(e));
                continue;
            }
            tracing::debug!(product_id = product.id, role = rendered.role.as_str(), path = %rendered.path, "Image variant stored");
        }
        Ok(role_errors)
    }

    async fn persist(
        &self,
        conn: &mut SqliteConnection,
        product: &Product,
        basename: &str,
        rendered: &Rendered,
    ) -> Result<(), RepoError> {
        product_image::insert_if_absent(
            conn,
            product.id,
            rendered.role.as_str(),
            &rendered.role.tag(basename),
            &rendered.path,
            Some(&rendered.thumb),
        )
        .await?;
        let listing = match rendered.role {
            ImageRole::Catalog => product::ListingImage::Catalog,
            ImageRole::Search => product::ListingImage::Search,
            ImageRole::Original | ImageRole::Watermark => return Ok(()),
        };
        product::set_listing_image(conn, product.id, listing, &rendered.path).await
    }
}

fn load_watermark(path: &Path, settings: &ImageSettings) -> Result<RgbaImage, ImageError> {
    let bytes = std::fs::read(path).map_err(|e| ImageError::Watermark(e.to_string()))?;
    let hint = path.extension().and_then(|e| e.to_str());
    let asset = transform::decode(&bytes, hint).map_err(|e| ImageError::Watermark(e.to_string()))?;
    Ok(transform::prepare_watermark(
        &asset,
        settings.sizes.wt_mark,
        settings.watermark_opacity,
    ))
}

/// Decode once and render every pending role
fn render_source(
    bytes: &[u8],
    hint: Option<&str>,
    roles: &[ImageRole],
    want_thumb: bool,
    settings: &ImageSettings,
    watermark: Option<&RgbaImage>,
) -> Result<SourceOutput, ImageError> {
    let decoded = transform::decode(bytes, hint)?;
    let product_thumb = if want_thumb {
        Some(transform::thumbnail(&decoded)?)
    } else {
        None
    };

    let variants = roles
        .iter()
        .map(|&role| render_role(&decoded, role, settings, watermark).map_err(|e| (role, e)))
        .collect();
    Ok(SourceOutput {
        product_thumb,
        variants,
    })
}

fn render_role(
    decoded: &image::DynamicImage,
    role: ImageRole,
    settings: &ImageSettings,
    watermark: Option<&RgbaImage>,
) -> Result<Rendered, ImageError> {
    let variant = match (role, settings.size_of(role)) {
        (ImageRole::Watermark, Some(size)) => {
            let mut canvas = transform::resize(decoded, size, Geometry::Fill);
            if let Some(mark) = watermark {
                transform::apply_watermark(&mut canvas, mark, settings.watermark_margin);
            }
            canvas
        }
        (_, Some(size)) => transform::resize(decoded, size, Geometry::Pad),
        (_, None) => decoded.to_rgba8(),
    };
    let thumb = transform::thumbnail(&image::DynamicImage::ImageRgba8(variant.clone()))?;
    let encoded = transform::encode_webp(&variant)?;
    let path = store::write_variant(&settings.media_root, &settings.catalog_path, role, &encoded)?;
    Ok(Rendered { role, path, thumb })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_for_position() {
        assert_eq!(
            ImageRole::for_position(0, false),
            vec![ImageRole::Watermark, ImageRole::Catalog, ImageRole::Search]
        );
        assert_eq!(ImageRole::for_position(1, false), vec![ImageRole::Watermark]);
        assert_eq!(
            ImageRole::for_position(2, true),
            vec![ImageRole::Watermark, ImageRole::Original]
        );
    }

    #[test]
    fn test_tag_and_codes() {
        assert_eq!(ImageRole::Catalog.tag("a.png"), "CATALOG_a.png");
        assert_eq!(ImageError::Decode("bad".into()).code(), ErrorCode::InvalidImageFile);
        assert_eq!(
            ImageError::TooLarge { size: 10, limit: 5 }.code(),
            ErrorCode::FileTooLarge
        );
    }

    #[tokio::test]
    async fn test_failed_role_keeps_the_others() {
        use crate::db::DbService;
        use crate::ingest::category;
        use shared::models::ProductCreate;

        let media = tempfile::tempdir().unwrap();
        let sources = tempfile::tempdir().unwrap();
        image::RgbaImage::from_pixel(40, 30, image::Rgba([200, 10, 10, 255]))
            .save(sources.path().join("red.png"))
            .unwrap();

        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let chain = category::resolve(&mut conn, &["Tools"], 1).await.unwrap();
        let created = product::insert(
            &mut conn,
            &ProductCreate {
                article: "A1".into(),
                slug: Some("drill".into()),
                title: "Drill".into(),
                description: "No description".into(),
                priority: 500,
                category_id: chain[0].id,
                brand_id: None,
                in_stock: true,
            },
        )
        .await
        .unwrap();
        sqlx::query(
            "CREATE TRIGGER reject_watermark BEFORE INSERT ON product_image \
             WHEN NEW.role = 'WATERMARK' BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        )
        .execute(&mut *conn)
        .await
        .unwrap();

        let settings = ImageSettings {
            media_root: media.path().to_path_buf(),
            source_root: Some(sources.path().to_path_buf()),
            ..Default::default()
        };
        let pipeline = ImagePipeline::new(settings, reqwest::Client::new());
        let errors = pipeline.process_product(&mut conn, &created, "red.png").await;

        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            IngestError::Image { error: ImageError::Persist(_), .. }
        ));

        let mut roles: Vec<_> = product_image::find_by_product(&mut conn, created.id)
            .await
            .unwrap()
            .into_iter()
            .map(|img| img.role)
            .collect();
        roles.sort();
        assert_eq!(roles, vec!["CATALOG", "SEARCH"]);

        let stored = product::find_by_id(&mut conn, created.id).await.unwrap().unwrap();
        assert!(stored.catalog_image.is_some());
        assert!(stored.search_image.is_some());

        let files = std::fs::read_dir(media.path().join("catalog/products")).unwrap().count();
        assert_eq!(files, 2);
    }

    #[test]
    fn test_missing_watermark_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ImageSettings {
            watermark_path: Some(dir.path().join("absent.png")),
            ..Default::default()
        };
        let pipeline = ImagePipeline::new(settings, reqwest::Client::new());
        assert!(!pipeline.has_watermark());
    }
}
