//! HTTP boundary tests, driven in-process through the router.

mod common;

use axum::{
    Router,
    body::Body,
    http::{self, Request, StatusCode},
};
use common::*;
use http_body_util::BodyExt;
use orchestrator::api::router;
use orchestrator::directory::ServiceEntry;
use orchestrator::engine::Engine;
use orchestrator::model::{Status, TaskId};
use serde_json::{Value, json};
use tower::ServiceExt;

fn test_engine() -> Engine {
    engine_for(vec![
        ServiceEntry::new("dummy", "127.0.0.1:1"),
        ServiceEntry::new("process_dicom", "127.0.0.1:1").required_field("directory"),
    ])
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn post_submission_is_accepted() {
    let engine = test_engine();
    let app = router(engine.clone());

    let (status, body) = send(&app, post_json("/run/dummy", r#"{"x": 1}"#)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["service"], "dummy");
    assert_eq!(body["status"], "queued");

    let id: TaskId = serde_json::from_value(body["task_id"].clone()).unwrap();
    let task = engine.get(id).unwrap();
    assert_eq!(task.payload, json!({"x": 1}));
    assert_eq!(task.status, Status::Queued);
}

#[tokio::test]
async fn empty_post_body_is_an_empty_payload() {
    let engine = test_engine();
    let app = router(engine.clone());

    let (status, body) = send(&app, post_json("/run/dummy", "")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let id: TaskId = serde_json::from_value(body["task_id"].clone()).unwrap();
    assert_eq!(engine.get(id).unwrap().payload, json!({}));
}

#[tokio::test]
async fn query_submission_builds_payload_from_parameters() {
    let engine = test_engine();
    let app = router(engine.clone());

    let (status, body) = send(&app, get("/run/process_dicom?directory=%20scan-01%20")).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let id: TaskId = serde_json::from_value(body["task_id"].clone()).unwrap();
    let task = engine.get(id).unwrap();
    assert_eq!(task.payload, json!({"directory": "scan-01"}));
    assert_eq!(task.source_reference.as_deref(), Some("scan-01"));
}

#[tokio::test]
async fn missing_required_parameter_is_bad_request() {
    let engine = test_engine();
    let app = router(engine.clone());

    let (status, body) = send(&app, get("/run/process_dicom")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("directory"));

    let (status, _) = send(&app, get("/run/process_dicom?directory=")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, post_json("/run/process_dicom", "{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(engine.list().is_empty());
}

#[tokio::test]
async fn unknown_service_is_not_found() {
    let engine = test_engine();
    let app = router(engine.clone());

    let (status, body) = send(&app, post_json("/run/segmentation", "{}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (_, tasks) = send(&app, get("/tasks")).await;
    assert_eq!(tasks["tasks"], json!([]));
}

#[tokio::test]
async fn invalid_json_body_is_bad_request() {
    let engine = test_engine();
    let app = router(engine.clone());

    let (status, _) = send(&app, post_json("/run/dummy", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(engine.list().is_empty());
}

#[tokio::test]
async fn status_of_queued_task_is_pending() {
    let app = router(test_engine());

    let (_, accepted) = send(&app, post_json("/run/dummy", "{}")).await;
    let id = accepted["task_id"].as_str().unwrap();

    let (status, body) = send(&app, get(&format!("/status/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task_id"], id);
    assert_eq!(body["service"], "dummy");
    assert_eq!(body["status"], "queued");
    assert_eq!(body["elapsed_time"], "pending");
    assert!(body["result"].is_null());
    assert!(body["created_at"].is_string());
}

#[tokio::test]
async fn unknown_task_status_is_not_found() {
    let app = router(test_engine());

    let (status, _) = send(&app, get(&format!("/status/{}", TaskId::new()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get("/status/1712345678901")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn task_list_preserves_submission_order() {
    let app = router(test_engine());

    let mut ids = Vec::new();
    for n in 0..3 {
        let (_, accepted) = send(&app, post_json("/run/dummy", &format!(r#"{{"n": {n}}}"#))).await;
        ids.push(accepted["task_id"].clone());
    }

    let (status, body) = send(&app, get("/tasks")).await;
    assert_eq!(status, StatusCode::OK);
    let listed: Vec<Value> = body["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["task_id"].clone())
        .collect();
    assert_eq!(listed, ids);
}

#[tokio::test]
async fn health_reports_queue_depth() {
    let app = router(test_engine());
    send(&app, post_json("/run/dummy", "{}")).await;

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["tasks"], 1);
    assert_eq!(body["queued"], 1);
    assert_eq!(body["workers"], 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn completed_task_status_over_http() {
    let addr = spawn_replying(StatusCode::OK, r#"{"status": "success", "result": 42}"#).await;
    let engine = engine_for(vec![ServiceEntry::new("answer", addr)]);
    let pool = engine.start().unwrap();
    let app = router(engine.clone());

    let (status, accepted) = send(&app, post_json("/run/answer", "{}")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let id = accepted["task_id"].as_str().unwrap().to_string();

    tokio::time::timeout(std::time::Duration::from_secs(10), engine.wait_idle())
        .await
        .unwrap();

    let (status, body) = send(&app, get(&format!("/status/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["result"], 42);
    assert!(body["elapsed_time"].as_f64().unwrap() >= 0.0);

    pool.shutdown().await;
}

#[tokio::test]
async fn submission_after_shutdown_is_unavailable() {
    let engine = test_engine();
    let pool = engine.start().unwrap();
    pool.shutdown().await;
    let app = router(engine.clone());

    let (status, _) = send(&app, post_json("/run/dummy", "{}")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(engine.list().is_empty());
}
