//! Import Task Repository

use super::{RepoError, RepoResult};
use shared::models::{ImportStatus, ImportTask, ImportTaskSummary, UploadType};
use sqlx::SqlitePool;

const COLUMNS: &str = "id, file_name, upload_type, status, rows_total, rows_committed, rows_aborted, warnings, comment, created_at, finished_at";

pub async fn create(
    pool: &SqlitePool,
    file_name: &str,
    upload_type: UploadType,
) -> RepoResult<ImportTask> {
    let now = shared::util::now_millis();
    let sql = format!(
        "INSERT INTO import_task (file_name, upload_type, status, created_at) VALUES (?, ?, ?, ?) RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, ImportTask>(&sql)
        .bind(file_name)
        .bind(upload_type.as_str())
        .bind(ImportStatus::Pending.as_str())
        .bind(now)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<ImportTask>> {
    let sql = format!("SELECT {COLUMNS} FROM import_task WHERE id = ?");
    let row = sqlx::query_as::<_, ImportTask>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn set_status(pool: &SqlitePool, id: i64, status: ImportStatus) -> RepoResult<()> {
    let rows = sqlx::query("UPDATE import_task SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    if rows == 0 {
        return Err(RepoError::NotFound(format!("import task {id}")));
    }
    Ok(())
}

/// Store the final status and counters of a run
pub async fn finish(
    pool: &SqlitePool,
    id: i64,
    status: ImportStatus,
    summary: &ImportTaskSummary,
) -> RepoResult<ImportTask> {
    let now = shared::util::now_millis();
    let sql = format!(
        "UPDATE import_task SET status = ?, rows_total = ?, rows_committed = ?, rows_aborted = ?, \
         warnings = ?, comment = ?, finished_at = ? WHERE id = ? RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, ImportTask>(&sql)
        .bind(status.as_str())
        .bind(summary.rows_total)
        .bind(summary.rows_committed)
        .bind(summary.rows_aborted)
        .bind(summary.warnings)
        .bind(&summary.comment)
        .bind(now)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("import task {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    #[tokio::test]
    async fn test_task_lifecycle() {
        let db = DbService::in_memory().await.unwrap();

        let task = create(&db.pool, "goods.xlsx", UploadType::Products).await.unwrap();
        assert_eq!(task.status, "PENDING");
        assert_eq!(task.upload_type, "PRODUCTS");
        assert!(task.finished_at.is_none());

        set_status(&db.pool, task.id, ImportStatus::InProgress).await.unwrap();
        let summary = ImportTaskSummary {
            rows_total: 3,
            rows_committed: 2,
            rows_aborted: 1,
            warnings: 4,
            comment: Some("1 row aborted".into()),
        };
        let done = finish(&db.pool, task.id, ImportStatus::Completed, &summary)
            .await
            .unwrap();
        assert_eq!(done.status, "COMPLETED");
        assert_eq!(done.rows_committed, 2);
        assert!(done.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let db = DbService::in_memory().await.unwrap();
        assert!(find_by_id(&db.pool, 42).await.unwrap().is_none());
        assert!(matches!(
            set_status(&db.pool, 42, ImportStatus::Failed).await,
            Err(RepoError::NotFound(_))
        ));
    }
}
