//! Background import runs
//!
//! Each accepted upload runs as its own tokio task. The registry keeps a
//! cancellation token per running task id.

use super::ServerState;
use super::hooks::{self, HookPayload};
use crate::db::repository::import_task;
use crate::ingest::{IngestReport, PreparedRun};
use dashmap::DashMap;
use shared::models::{ImportStatus, UploadType};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct ImportJobs {
    running: Arc<DashMap<i64, CancellationToken>>,
}

impl ImportJobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self, task_id: i64) -> bool {
        self.running.contains_key(&task_id)
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Request cancellation; the run stops before its next row
    pub fn cancel(&self, task_id: i64) -> bool {
        match self.running.get(&task_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every running import
    pub fn cancel_all(&self) {
        for entry in self.running.iter() {
            entry.value().cancel();
        }
    }

    /// Run a prepared import in the background
    pub fn spawn(
        &self,
        state: ServerState,
        task_id: i64,
        run: PreparedRun,
        upload: PathBuf,
    ) -> JoinHandle<ImportStatus> {
        let token = CancellationToken::new();
        let registration = self.register(task_id, token.clone());

        tokio::spawn(async move {
            let kind = run.kind();
            if let Err(e) = import_task::set_status(&state.pool, task_id, ImportStatus::InProgress).await {
                tracing::warn!(task_id, error = %e, "Failed to mark import in progress");
            }

            let report = supervised(task_id, async move { run.run(&token).await }).await;
            let status = final_status(&report);
            match import_task::finish(&state.pool, task_id, status, &report.summary()).await {
                Ok(task) => tracing::info!(task_id, status = %task.status, "Import task finished"),
                Err(e) => tracing::error!(task_id, error = %e, "Failed to record import result"),
            }
            drop(registration);

            if state.config.remove_uploads
                && let Err(e) = tokio::fs::remove_file(&upload).await
            {
                tracing::warn!(task_id, path = %upload.display(), error = %e, "Failed to remove upload");
            }

            if status == ImportStatus::Completed
                && kind == UploadType::Products
                && !state.config.post_import_hooks.is_empty()
            {
                let payload = HookPayload {
                    task_id,
                    upload_type: kind.as_str(),
                    rows_committed: report.rows_committed,
                    rows_aborted: report.rows_aborted,
                };
                hooks::notify(&state.http, &state.config.post_import_hooks, &payload).await;
            }
            status
        })
    }
}

impl ImportJobs {
    fn register(&self, task_id: i64, token: CancellationToken) -> Registration {
        self.running.insert(task_id, token);
        Registration {
            running: Arc::clone(&self.running),
            task_id,
        }
    }
}

/// Registry entry of a running task, removed on drop
struct Registration {
    running: Arc<DashMap<i64, CancellationToken>>,
    task_id: i64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.running.remove(&self.task_id);
    }
}

/// Drive `work` on its own task; a panic ends as a failed report
async fn supervised<F>(task_id: i64, work: F) -> IngestReport
where
    F: Future<Output = IngestReport> + Send + 'static,
{
    match tokio::spawn(work).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(task_id, error = %e, "Import run aborted");
            IngestReport {
                failure: Some(format!("import run aborted: {e}")),
                ..Default::default()
            }
        }
    }
}

pub fn final_status(report: &IngestReport) -> ImportStatus {
    if report.failure.is_some() {
        ImportStatus::Failed
    } else if report.cancelled {
        ImportStatus::Cancelled
    } else {
        ImportStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_status() {
        assert_eq!(final_status(&IngestReport::default()), ImportStatus::Completed);
        let cancelled = IngestReport {
            cancelled: true,
            ..Default::default()
        };
        assert_eq!(final_status(&cancelled), ImportStatus::Cancelled);
        let failed = IngestReport {
            failure: Some("disk gone".into()),
            cancelled: true,
            ..Default::default()
        };
        assert_eq!(final_status(&failed), ImportStatus::Failed);
    }

    #[tokio::test]
    async fn test_panicking_run_ends_failed() {
        let report = supervised(7, async { panic!("reader exploded") }).await;
        assert_eq!(final_status(&report), ImportStatus::Failed);
        assert!(report.failure.unwrap().contains("panicked"));

        let report = supervised(8, async { IngestReport::default() }).await;
        assert_eq!(final_status(&report), ImportStatus::Completed);
    }

    #[tokio::test]
    async fn test_registration_released_when_task_unwinds() {
        let jobs = ImportJobs::new();
        let registration = jobs.register(3, CancellationToken::new());
        assert!(jobs.is_running(3));

        let handle = tokio::spawn(async move {
            let _registration = registration;
            panic!("run died");
        });
        assert!(handle.await.is_err());
        assert!(!jobs.is_running(3));
        assert!(jobs.is_empty());
    }

    #[test]
    fn test_cancel_unknown_task() {
        let jobs = ImportJobs::new();
        assert!(!jobs.cancel(42));
        assert!(jobs.is_empty());
    }
}
