//! HTTP surface: upload, task polling, authentication

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use catalog_server::api::create_router;
use catalog_server::auth::create_token;
use catalog_server::core::{Config, ServerState};
use catalog_server::db::DbService;
use catalog_server::db::repository::product;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "catalog-test-boundary";

async fn setup() -> (TempDir, ServerState, Router, String) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::for_work_dir(dir.path());
    let token = create_token("operator-1", &config.jwt_secret).unwrap();
    let db = DbService::in_memory().await.unwrap();
    let state = ServerState::with_pool(config, db.pool).unwrap();
    let app = create_router(state.clone());
    (dir, state, app, token)
}

fn multipart(file_name: &str, content: &str) -> String {
    format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {content}\r\n\
         --{BOUNDARY}--\r\n"
    )
}

fn upload_request(uri: &str, token: Option<&str>, body: String) -> Request<Body> {
    let mut builder = Request::builder()
        .method("PUT")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let (_dir, _state, app, _) = setup().await;
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn upload_requires_token() {
    let (_dir, _state, app, _) = setup().await;
    let body = multipart("goods.csv", "SKU,CATEGORIES\nA1,Tools");
    let response = app
        .oneshot(upload_request("/api/upload/goods.csv?type=PRODUCTS", None, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn upload_runs_import_to_completion() {
    let (_dir, state, app, token) = setup().await;
    let body = multipart(
        "goods.csv",
        "SKU,TITLE,CATEGORIES,PRIORITY\nA1,Widget,Home | Tools,10\nA2,Hammer,Home | Tools,",
    );
    let response = app
        .clone()
        .oneshot(upload_request(
            "/api/upload/goods.csv?type=PRODUCTS",
            Some(&token),
            body,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let accepted = json_body(response).await;
    let task_id = accepted["data"]["task_id"].as_i64().unwrap();
    assert_eq!(accepted["data"]["upload_type"], "PRODUCTS");

    let mut task = Value::Null;
    for _ in 0..100 {
        let request = Request::get(format!("/api/import/tasks/{task_id}"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        task = json_body(response).await;
        if task["data"]["status"] == "COMPLETED" {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(task["data"]["status"], "COMPLETED");
    assert_eq!(task["data"]["rows_committed"], 2);
    assert_eq!(task["data"]["rows_aborted"], 0);

    let mut conn = state.pool.acquire().await.unwrap();
    assert_eq!(product::count(&mut conn).await.unwrap(), 2);
}

#[tokio::test]
async fn upload_rejects_bad_requests_synchronously() {
    let (_dir, _state, app, token) = setup().await;

    let response = app
        .clone()
        .oneshot(upload_request(
            "/api/upload/goods.csv?type=ORDERS",
            Some(&token),
            multipart("goods.csv", "SKU,CATEGORIES\nA1,Tools"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(upload_request(
            "/api/upload/goods.csv?type=PRODUCTS",
            Some(&token),
            multipart("goods.csv", "SKU,TITLE\nA1,Widget"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["message"].as_str().unwrap().contains("CATEGORIES"));
}

#[tokio::test]
async fn unknown_task_is_not_found() {
    let (_dir, _state, app, token) = setup().await;
    let request = Request::post("/api/import/tasks/999/cancel")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
