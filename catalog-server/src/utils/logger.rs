//! Logging Infrastructure
//!
//! Console output plus optional daily rotating files:
//! - `{log_dir}/app/` application logs (deleted after 14 days)
//! - `{log_dir}/import/` per-row import events (target `import`, kept)

use std::fs;
use std::path::{Path, PathBuf};
use tracing::Metadata;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{LevelFilter, filter_fn};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Target of import row events
pub const IMPORT_TARGET: &str = "import";

const APP_LOG_RETENTION_DAYS: i64 = 14;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize the logging system
///
/// `RUST_LOG` overrides `level` for console output when set.
pub fn init_logger(level: &str, json_format: bool, log_dir: Option<&str>) -> anyhow::Result<()> {
    let mut layers: Vec<BoxedLayer> = vec![console_layer(level, json_format)];

    if let Some(dir) = log_dir {
        let log_dir = Path::new(dir);
        let app_dir = log_dir.join("app");
        let import_dir = log_dir.join("import");
        fs::create_dir_all(&app_dir)?;
        fs::create_dir_all(&import_dir)?;

        layers.push(file_layer(&app_dir, "app", level, json_format, false)?);
        layers.push(file_layer(&import_dir, "import", level, json_format, true)?);

        tokio::spawn(periodic_cleanup(log_dir.to_path_buf()));
    }

    tracing_subscriber::registry().with(layers).try_init()?;
    Ok(())
}

fn console_layer(level: &str, json_format: bool) -> BoxedLayer {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_filter(filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .with_filter(filter)
            .boxed()
    }
}

/// Daily rotating file layer; `import_only` selects import events,
/// otherwise everything else
fn file_layer(
    dir: &Path,
    prefix: &str,
    level: &str,
    json_format: bool,
    import_only: bool,
) -> anyhow::Result<BoxedLayer> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(dir)?;
    let max_level = level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    let selects = move |meta: &Metadata<'_>| {
        *meta.level() <= max_level && (meta.target() == IMPORT_TARGET) == import_only
    };

    let layer = if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_writer(std::sync::Mutex::new(appender))
            .with_filter(filter_fn(selects))
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(appender))
            .with_filter(filter_fn(selects))
            .boxed()
    };
    Ok(layer)
}

/// Delete `app.YYYY-MM-DD.log` files older than the retention window
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<()> {
    let cutoff = chrono::Local::now().date_naive() - chrono::Duration::days(APP_LOG_RETENTION_DAYS);

    let app_log_dir = log_dir.join("app");
    if !app_log_dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(app_log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(date_part) = name
            .strip_prefix("app.")
            .and_then(|d| d.strip_suffix(".log"))
            && let Ok(date) = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            && date < cutoff
        {
            fs::remove_file(&path)?;
            tracing::info!(file = %name, "Deleted old log file");
        }
    }
    Ok(())
}

/// Runs hourly
async fn periodic_cleanup(log_dir: PathBuf) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
    loop {
        interval.tick().await;
        if let Err(e) = cleanup_old_logs(&log_dir) {
            tracing::warn!(error = %e, "Log cleanup failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_removes_only_expired_app_logs() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("app");
        fs::create_dir_all(&app).unwrap();
        let old = (chrono::Local::now().date_naive() - chrono::Duration::days(30)).format("%Y-%m-%d");
        let today = chrono::Local::now().date_naive().format("%Y-%m-%d");
        fs::write(app.join(format!("app.{old}.log")), "x").unwrap();
        fs::write(app.join(format!("app.{today}.log")), "x").unwrap();
        fs::write(app.join("notes.txt"), "x").unwrap();

        cleanup_old_logs(dir.path()).unwrap();

        assert!(!app.join(format!("app.{old}.log")).exists());
        assert!(app.join(format!("app.{today}.log")).exists());
        assert!(app.join("notes.txt").exists());
    }
}
