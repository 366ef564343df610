//! Post-import notifications
//!
//! After a completed products import every configured URL receives a JSON
//! POST so downstream services can rebuild search indexes and category
//! trees. Failures are logged and otherwise ignored.

use serde::Serialize;
use std::time::Duration;

const HOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize)]
pub struct HookPayload {
    pub task_id: i64,
    pub upload_type: &'static str,
    pub rows_committed: usize,
    pub rows_aborted: usize,
}

/// POST `payload` to each URL; returns how many accepted it
pub async fn notify(http: &reqwest::Client, urls: &[String], payload: &HookPayload) -> usize {
    let mut delivered = 0;
    for url in urls {
        let result = http
            .post(url)
            .timeout(HOOK_TIMEOUT)
            .json(payload)
            .send()
            .await
            .and_then(|r| r.error_for_status());
        match result {
            Ok(_) => {
                delivered += 1;
                tracing::info!(task_id = payload.task_id, url = %url, "Post-import hook delivered");
            }
            Err(e) => {
                tracing::warn!(task_id = payload.task_id, url = %url, error = %e, "Post-import hook failed");
            }
        }
    }
    delivered
}
