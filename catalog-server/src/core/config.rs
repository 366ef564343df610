//! Server configuration
//!
//! | variable                 | default                 |
//! |--------------------------|-------------------------|
//! | DATABASE_PATH            | catalog.db              |
//! | HTTP_PORT                | 8080                    |
//! | ENVIRONMENT              | development             |
//! | JWT_SECRET               | required outside dev    |
//! | UPLOAD_DIR               | uploads                 |
//! | MAX_UPLOAD_BYTES         | 52428800                |
//! | REMOVE_UPLOADS           | true                    |
//! | MEDIA_PATH               | media                   |
//! | CATALOG_PATH             | catalog/products        |
//! | WATERMARK_PATH           | unset                   |
//! | WATERMARK_OPACITY        | 60                      |
//! | WATERMARK_MARGIN         | 30                      |
//! | IMAGE_FETCH_TIMEOUT_SECS | 15                      |
//! | MAX_IMAGE_BYTES          | 20971520                |
//! | KEEP_ORIGINAL_IMAGES     | false                   |
//! | IMAGE_SOURCE_ROOT        | unset                   |
//! | CATEGORY_DELIMITER       | " \| "                  |
//! | IMAGE_DELIMITER          | "\|\|"                  |
//! | CSV_DELIMITER            | sniffed                 |
//! | CATALOG_TREE_ID          | 1                       |
//! | CHARACTERISTIC_SCOPE     | per_category            |
//! | CLEAR_PRICE_IF_EMPTY     | false                   |
//! | ITEMS_NOT_IN_FILE_ACTION | ignore                  |
//! | POST_IMPORT_HOOKS        | unset (comma separated) |
//! | LOG_LEVEL / LOG_JSON / LOG_DIR | info / false / unset |
//!
//! Image sizes: `PRODUCT_{CATALOG,SEARCH,WATERMARK,WT_MARK}_IMAGE_{WIDTH,HEIGHT}`.

use crate::images::{ImageSettings, ImageSize, RoleSizes};
use crate::ingest::{CharacteristicScope, IngestSettings, MissingItemsAction};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub http_port: u16,
    /// development | staging | production
    pub environment: String,
    pub jwt_secret: String,
    /// Where uploaded files wait for their run
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Delete the uploaded file once its run finishes
    pub remove_uploads: bool,
    /// URLs notified after a completed products import
    pub post_import_hooks: Vec<String>,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    pub ingest: IngestSettings,
    pub images: ImageSettings,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    match var(name) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %raw, "Invalid value, using default");
            default
        }),
        None => default,
    }
}

fn flag_or(name: &str, default: bool) -> bool {
    match var(name).map(|v| v.to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

fn size_or(role: &str, default: ImageSize) -> ImageSize {
    ImageSize::new(
        parse_or(&format!("PRODUCT_{role}_IMAGE_WIDTH"), default.width),
        parse_or(&format!("PRODUCT_{role}_IMAGE_HEIGHT"), default.height),
    )
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        match var(name) {
            Some(v) => Ok(v),
            None if environment == "development" => Ok(format!("dev-{name}-not-for-production")),
            None => Err(format!("{name} must be set in {environment} environment").into()),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = var("ENVIRONMENT").unwrap_or_else(|| "development".into());

        let csv_delimiter = match var("CSV_DELIMITER") {
            Some(d) if d == "\\t" || d == "tab" => Some(b'\t'),
            Some(d) if d.len() == 1 => Some(d.as_bytes()[0]),
            Some(d) => return Err(format!("CSV_DELIMITER must be a single byte, got '{d}'").into()),
            None => None,
        };
        let characteristic_scope = match var("CHARACTERISTIC_SCOPE") {
            Some(raw) => CharacteristicScope::from_str(&raw)?,
            None => CharacteristicScope::default(),
        };
        let items_not_in_file_action = match var("ITEMS_NOT_IN_FILE_ACTION") {
            Some(raw) => MissingItemsAction::from_str(&raw)?,
            None => MissingItemsAction::default(),
        };
        let defaults = IngestSettings::default();
        let ingest = IngestSettings {
            category_delimiter: std::env::var("CATEGORY_DELIMITER")
                .unwrap_or(defaults.category_delimiter.clone()),
            csv_delimiter,
            tree_id: parse_or("CATALOG_TREE_ID", defaults.tree_id),
            characteristic_scope,
            clear_price_if_empty: flag_or("CLEAR_PRICE_IF_EMPTY", false),
            items_not_in_file_action,
            ..defaults
        };

        let image_defaults = ImageSettings::default();
        let sizes = RoleSizes::default();
        let images = ImageSettings {
            media_root: var("MEDIA_PATH")
                .map(PathBuf::from)
                .unwrap_or(image_defaults.media_root),
            catalog_path: var("CATALOG_PATH").unwrap_or(image_defaults.catalog_path),
            sizes: RoleSizes {
                catalog: size_or("CATALOG", sizes.catalog),
                search: size_or("SEARCH", sizes.search),
                watermark: size_or("WATERMARK", sizes.watermark),
                wt_mark: size_or("WT_MARK", sizes.wt_mark),
            },
            watermark_path: var("WATERMARK_PATH").map(PathBuf::from),
            watermark_opacity: parse_or("WATERMARK_OPACITY", image_defaults.watermark_opacity).min(100),
            watermark_margin: parse_or("WATERMARK_MARGIN", image_defaults.watermark_margin),
            fetch_timeout: Duration::from_secs(parse_or("IMAGE_FETCH_TIMEOUT_SECS", 15)),
            max_bytes: parse_or("MAX_IMAGE_BYTES", image_defaults.max_bytes),
            keep_original: flag_or("KEEP_ORIGINAL_IMAGES", false),
            source_root: var("IMAGE_SOURCE_ROOT").map(PathBuf::from),
            delimiter: std::env::var("IMAGE_DELIMITER").unwrap_or(image_defaults.delimiter),
        };

        Ok(Self {
            database_path: var("DATABASE_PATH").unwrap_or_else(|| "catalog.db".into()),
            http_port: parse_or("HTTP_PORT", 8080),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            environment,
            upload_dir: var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", 50 * 1024 * 1024),
            remove_uploads: flag_or("REMOVE_UPLOADS", true),
            post_import_hooks: var("POST_IMPORT_HOOKS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|u| !u.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: flag_or("LOG_JSON", false),
            log_dir: var("LOG_DIR"),
            ingest,
            images,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Development defaults rooted at `work_dir`
    pub fn for_work_dir(work_dir: &std::path::Path) -> Self {
        Self {
            database_path: work_dir.join("catalog.db").display().to_string(),
            http_port: 0,
            environment: "development".into(),
            jwt_secret: "dev-JWT_SECRET-not-for-production".into(),
            upload_dir: work_dir.join("uploads"),
            max_upload_bytes: 50 * 1024 * 1024,
            remove_uploads: true,
            post_import_hooks: Vec::new(),
            log_level: "info".into(),
            log_json: false,
            log_dir: None,
            ingest: IngestSettings::default(),
            images: ImageSettings {
                media_root: work_dir.join("media"),
                ..ImageSettings::default()
            },
        }
    }
}
