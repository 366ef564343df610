//! Catalog ingestion engine
//!
//! [`IngestEngine::prepare`] opens a source, loads the reference snapshot
//! and classifies the header; every fatal problem surfaces there.
//! [`PreparedRun::run`] then walks the data rows one at a time.

pub mod category;
pub mod characteristic;
pub mod columns;
pub mod error;
pub mod group;
pub mod lookup;
pub mod price;
pub mod product;
pub mod reader;
pub mod row;
pub mod settings;
pub mod slug;
pub mod unlisted;

pub use error::{IngestError, Severity};
pub use settings::{CharacteristicScope, ColumnNames, IngestSettings, MissingItemsAction};

use crate::db::repository::{product_group, region};
use crate::images::ImagePipeline;
use columns::ColumnRoles;
use lookup::{GroupIndex, RegionIndex, group_index, region_index};
use reader::{ReaderOptions, SourceRow, TabularSource};
use row::RowContext;
use serde::Serialize;
use shared::models::{ImportTaskSummary, UploadType};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Result of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub rows_total: usize,
    pub rows_committed: usize,
    pub rows_aborted: usize,
    pub warnings: usize,
    pub cancelled: bool,
    pub elapsed_ms: u64,
    /// Set when reading stopped early on an unrecoverable source error
    pub failure: Option<String>,
    /// Products outside the file changed by the items-not-in-file action
    pub unlisted: usize,
}

impl IngestReport {
    pub fn summary(&self) -> ImportTaskSummary {
        let comment = if let Some(failure) = &self.failure {
            Some(failure.clone())
        } else if self.cancelled {
            Some(format!("cancelled after {} rows", self.rows_total))
        } else if self.rows_aborted > 0 {
            Some(format!("{} rows aborted", self.rows_aborted))
        } else {
            None
        };
        ImportTaskSummary {
            rows_total: self.rows_total as i64,
            rows_committed: self.rows_committed as i64,
            rows_aborted: self.rows_aborted as i64,
            warnings: self.warnings as i64,
            comment,
        }
    }
}

#[derive(Clone)]
pub struct IngestEngine {
    pool: SqlitePool,
    settings: Arc<IngestSettings>,
    images: Arc<ImagePipeline>,
    /// Serializes row transactions across concurrent runs
    write_gate: Arc<Mutex<()>>,
}

impl IngestEngine {
    pub fn new(pool: SqlitePool, settings: IngestSettings, images: ImagePipeline) -> Self {
        Self {
            pool,
            settings: Arc::new(settings),
            images: Arc::new(images),
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    pub fn images(&self) -> &ImagePipeline {
        &self.images
    }

    /// Open and validate a source without touching any row
    pub async fn prepare(&self, path: &Path, kind: UploadType) -> Result<PreparedRun, IngestError> {
        let options = ReaderOptions {
            delimiter: self.settings.csv_delimiter,
        };
        let owned = path.to_path_buf();
        let source = tokio::task::spawn_blocking(move || TabularSource::open(&owned, &options))
            .await
            .map_err(|e| IngestError::Parse(format!("reader task failed: {e}")))??;

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| IngestError::ReferenceData(e.into()))?;
        let regions = region_index(
            region::find_all(&mut conn)
                .await
                .map_err(IngestError::ReferenceData)?,
        );
        let groups = group_index(
            product_group::find_all(&mut conn)
                .await
                .map_err(IngestError::ReferenceData)?,
        );
        drop(conn);

        let spec = match kind {
            UploadType::Products => self.settings.product_columns(),
            UploadType::Brands => self.settings.brand_columns(),
        };
        let roles = columns::classify(source.header(), &spec, &regions)?;

        tracing::info!(
            target: "import",
            path = %path.display(),
            kind = kind.as_str(),
            format = ?source.format(),
            regions = regions.len(),
            groups = groups.len(),
            "Import prepared"
        );
        Ok(PreparedRun {
            engine: self.clone(),
            kind,
            path: path.to_path_buf(),
            source,
            roles,
            regions,
            groups,
        })
    }

    /// Apply the items-not-in-file action after a complete products run
    ///
    /// Skipped when the run read no article or some records could not be
    /// parsed, since their articles are unknown.
    async fn settle_unlisted(
        &self,
        path: &Path,
        seen: &HashSet<String>,
        unreadable: usize,
        report: &mut IngestReport,
    ) {
        let action = self.settings.items_not_in_file_action;
        if action == MissingItemsAction::Ignore {
            return;
        }
        if seen.is_empty() || unreadable > 0 {
            tracing::warn!(target: "import", path = %path.display(), action = ?action, unreadable, "Items-not-in-file action skipped");
            return;
        }

        let _gate = self.write_gate.lock().await;
        let result = async {
            let mut tx = self.pool.begin().await?;
            let changed = unlisted::apply(&mut tx, action, seen).await?;
            tx.commit().await?;
            Ok::<_, crate::db::repository::RepoError>(changed)
        }
        .await;
        match result {
            Ok(changed) => {
                report.unlisted = changed;
                tracing::info!(target: "import", path = %path.display(), action = ?action, changed, "Unlisted products settled");
            }
            Err(e) => {
                report.warnings += 1;
                tracing::error!(target: "import", path = %path.display(), action = ?action, error = %e, "Items-not-in-file action failed");
            }
        }
    }

    /// `prepare` then `run`
    pub async fn ingest(
        &self,
        path: &Path,
        kind: UploadType,
        cancel: &CancellationToken,
    ) -> Result<IngestReport, IngestError> {
        Ok(self.prepare(path, kind).await?.run(cancel).await)
    }
}

/// A validated source ready to be processed
pub struct PreparedRun {
    engine: IngestEngine,
    kind: UploadType,
    path: PathBuf,
    source: TabularSource,
    roles: ColumnRoles,
    regions: RegionIndex,
    groups: GroupIndex,
}

impl PreparedRun {
    pub fn kind(&self) -> UploadType {
        self.kind
    }

    pub fn roles(&self) -> &ColumnRoles {
        &self.roles
    }

    /// Process every data row in order
    ///
    /// Cancellation is checked between rows only.
    pub async fn run(self, cancel: &CancellationToken) -> IngestReport {
        let started = Instant::now();
        let PreparedRun {
            engine,
            kind,
            path,
            source,
            roles,
            regions,
            groups,
        } = self;
        let ctx = RowContext {
            settings: &engine.settings,
            roles: &roles,
            regions: &regions,
            groups: &groups,
            images: &engine.images,
        };

        let mut report = IngestReport::default();
        let mut seen = HashSet::new();
        let mut unreadable = 0usize;
        let mut source = Some(source);
        while let Some(current) = source.take() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                tracing::info!(target: "import", path = %path.display(), rows = report.rows_total, "Import cancelled");
                current.close();
                break;
            }

            let (current, item) = match next_row(current).await {
                Ok(pair) => pair,
                Err(message) => {
                    tracing::error!(target: "import", path = %path.display(), error = %message, "Reader stopped");
                    report.failure = Some(message);
                    break;
                }
            };
            let Some(item) = item else {
                current.close();
                break;
            };
            source = Some(current);

            let row = match item {
                Ok(row) => row,
                Err(e) if e.severity() == Severity::Fatal => {
                    tracing::error!(target: "import", path = %path.display(), code = ?e.code(), error = %e, "Source unreadable");
                    report.failure = Some(e.to_string());
                    if let Some(s) = source.take() {
                        s.close();
                    }
                    break;
                }
                Err(e) => {
                    unreadable += 1;
                    report.rows_total += 1;
                    report.rows_aborted += 1;
                    tracing::warn!(target: "import", code = ?e.code(), error = %e, "Row aborted");
                    continue;
                }
            };

            report.rows_total += 1;
            let outcome = {
                let _gate = engine.write_gate.lock().await;
                match kind {
                    UploadType::Products => {
                        row::process_product_row(&engine.pool, &ctx, &row).await
                    }
                    UploadType::Brands => row::process_brand_row(&engine.pool, &ctx, &row).await,
                }
            };
            if kind == UploadType::Products
                && let Some(article) = &outcome.article
            {
                seen.insert(article.trim().to_string());
            }
            report.warnings += outcome.warnings.len();
            if outcome.is_committed() {
                report.rows_committed += 1;
            } else {
                report.rows_aborted += 1;
            }
        }

        if kind == UploadType::Products && !report.cancelled && report.failure.is_none() {
            engine.settle_unlisted(&path, &seen, unreadable, &mut report).await;
        }

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            target: "import",
            path = %path.display(),
            kind = kind.as_str(),
            rows_total = report.rows_total,
            rows_committed = report.rows_committed,
            rows_aborted = report.rows_aborted,
            warnings = report.warnings,
            unlisted = report.unlisted,
            cancelled = report.cancelled,
            elapsed_ms = report.elapsed_ms,
            "Import finished"
        );
        report
    }
}

type NextRow = (TabularSource, Option<Result<SourceRow, IngestError>>);

/// Pull the next row on the blocking pool
async fn next_row(mut source: TabularSource) -> Result<NextRow, String> {
    tokio::task::spawn_blocking(move || {
        let item = source.next();
        (source, item)
    })
    .await
    .map_err(|e| format!("reader task failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_summary_comment() {
        let report = IngestReport {
            rows_total: 5,
            rows_committed: 4,
            rows_aborted: 1,
            warnings: 2,
            ..Default::default()
        };
        let summary = report.summary();
        assert_eq!(summary.rows_committed, 4);
        assert_eq!(summary.comment.as_deref(), Some("1 rows aborted"));

        let cancelled = IngestReport {
            rows_total: 3,
            cancelled: true,
            ..Default::default()
        };
        assert_eq!(cancelled.summary().comment.as_deref(), Some("cancelled after 3 rows"));
        assert_eq!(IngestReport::default().summary().comment, None);
    }
}
