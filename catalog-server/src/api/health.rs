//! Health check endpoint

use axum::Json;
use axum::extract::State;

use crate::core::ServerState;

pub async fn health_check(State(state): State<ServerState>) -> Json<serde_json::Value> {
    let database = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Health check database ping failed");
            "unavailable"
        }
    };
    Json(serde_json::json!({
        "status": if database == "ok" { "ok" } else { "degraded" },
        "service": "catalog-server",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "running_imports": state.jobs.len(),
    }))
}
