//! HTTP boundary: submission, status, and listing endpoints.
//!
//! | method | path               | purpose                                   |
//! |--------|--------------------|-------------------------------------------|
//! | POST   | `/run/{service}`   | submit with a JSON body                   |
//! | GET    | `/run/{service}`   | submit with query parameters as payload   |
//! | GET    | `/status/{id}`     | one task's status                         |
//! | GET    | `/tasks`           | every task                                |
//! | GET    | `/health`          | liveness and queue depth                  |

mod error;

pub use error::ApiError;

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::engine::Engine;
use crate::error::Error;
use crate::model::{NewTask, Status, StatusView, Task, TaskId};

type Result<T> = std::result::Result<T, ApiError>;

/// Query key that sets the source reference explicitly instead of being
/// forwarded in the payload.
const SOURCE_PARAM: &str = "source";

pub fn router(engine: Engine) -> Router {
    Router::new()
        .route("/run/{service}", get(submit_query).post(submit_json))
        .route("/status/{task_id}", get(task_status))
        .route("/tasks", get(list_tasks))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

/// Body of a `202 Accepted` submission response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Accepted {
    pub service: String,
    pub task_id: TaskId,
    pub status: Status,
}

/// Body of `GET /tasks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskList {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Deserialize)]
struct SubmitParams {
    source: Option<String>,
}

async fn submit_json(
    Path(service): Path<String>,
    Query(params): Query<SubmitParams>,
    State(engine): State<Engine>,
    body: Bytes,
) -> Result<(StatusCode, Json<Accepted>)> {
    let payload: Value = if body.iter().all(u8::is_ascii_whitespace) {
        json!({})
    } else {
        serde_json::from_slice(&body).map_err(|e| Error::InvalidPayload(e.to_string()))?
    };

    let mut new = NewTask::new(service).payload(payload);
    if let Some(source) = params.source {
        new = new.source_reference(source);
    }
    accept(&engine, new)
}

async fn submit_query(
    Path(service): Path<String>,
    Query(mut params): Query<BTreeMap<String, String>>,
    State(engine): State<Engine>,
) -> Result<(StatusCode, Json<Accepted>)> {
    let source = params.remove(SOURCE_PARAM);
    let payload: serde_json::Map<String, Value> = params
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();

    let mut new = NewTask::new(service).payload(Value::Object(payload));
    if let Some(source) = source {
        new = new.source_reference(source);
    }
    accept(&engine, new)
}

fn accept(engine: &Engine, new: NewTask) -> Result<(StatusCode, Json<Accepted>)> {
    let task = engine.submit(new)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(Accepted {
            service: task.service,
            task_id: task.task_id,
            status: task.status,
        }),
    ))
}

async fn task_status(
    Path(task_id): Path<String>,
    State(engine): State<Engine>,
) -> Result<Json<StatusView>> {
    let id: TaskId = task_id.parse()?;
    Ok(Json(engine.get(id)?.status_view()))
}

async fn list_tasks(State(engine): State<Engine>) -> Json<TaskList> {
    Json(TaskList {
        tasks: engine.list(),
    })
}

async fn health(State(engine): State<Engine>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "tasks": engine.task_count(),
        "queued": engine.queued(),
        "workers": engine.config().workers,
    }))
}
