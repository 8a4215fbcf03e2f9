//! Shared helpers: in-process backend services and polling utilities.

#![allow(dead_code)]

use std::time::Duration;

use axum::{Json, Router, http::StatusCode, routing::post};
use orchestrator::directory::{ServiceDirectory, ServiceEntry};
use orchestrator::engine::{Engine, EngineConfig};
use orchestrator::model::{Task, TaskId};
use serde_json::Value;
use tokio::net::TcpListener;

/// Serve `app` on an ephemeral localhost port. Returns `host:port`.
pub async fn spawn_backend(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr.to_string()
}

/// Backend whose `/run` always answers with `status` and a raw `body`.
pub async fn spawn_replying(status: StatusCode, body: &'static str) -> String {
    spawn_backend(Router::new().route("/run", post(move || async move { (status, body) }))).await
}

/// Backend that sleeps `delay` and then echoes the payload back as the result.
pub async fn spawn_echo(delay: Duration) -> String {
    spawn_backend(Router::new().route(
        "/run",
        post(move |Json(payload): Json<Value>| async move {
            tokio::time::sleep(delay).await;
            Json(serde_json::json!({ "status": "success", "result": payload }))
        }),
    ))
    .await
}

/// Accepts connections and never answers.
pub async fn spawn_silent() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    addr.to_string()
}

/// An address nothing listens on.
pub async fn closed_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

pub fn engine_with(entries: Vec<ServiceEntry>, config: EngineConfig) -> Engine {
    Engine::new(ServiceDirectory::from_entries(entries).unwrap(), config)
}

/// Single-worker engine with a short backend timeout.
pub fn engine_for(entries: Vec<ServiceEntry>) -> Engine {
    engine_with(
        entries,
        EngineConfig {
            workers: 1,
            backend_timeout: Duration::from_secs(5),
            retention_warn_threshold: None,
        },
    )
}

/// Poll until the task reaches a terminal status.
pub async fn wait_terminal(engine: &Engine, id: TaskId) -> Task {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let task = engine.get(id).unwrap();
            if task.status.is_terminal() {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("task did not finish in time")
}
