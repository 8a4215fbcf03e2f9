//! Core data model.
//!
//! A task is one request routed to a backend service. It records where it is
//! going, what it carries, and how far through its lifecycle it has got.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Stored as the result of a completed task whose backend reported none.
pub const OK_SENTINEL: &str = "ok";

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A unit of dispatched work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,

    /// Logical backend service name, as listed in the service directory.
    pub service: String,

    /// Backend address resolved at submission. Never re-resolved.
    pub address: String,

    /// Path of the execution entry point on the backend.
    pub entry_point: String,

    /// Request body forwarded verbatim to the backend.
    pub payload: Value,

    pub status: Status,

    /// Backend result on completion, failure detail on failure. Absent until terminal.
    pub result: Option<Value>,

    /// Human-readable context (e.g. an input path). No effect on dispatch.
    pub source_reference: Option<String>,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Seconds between start and completion, millisecond precision.
    pub elapsed_time: Option<f64>,
}

impl Task {
    /// `queued -> running`.
    pub fn start(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.transition(Status::Running)?;
        self.started_at = Some(at);
        Ok(())
    }

    /// `running -> completed`, storing the backend's result value.
    pub fn complete(&mut self, result: Value, at: DateTime<Utc>) -> Result<()> {
        self.finish(Status::Completed, result, at)
    }

    /// `running -> failed`, storing the failure detail.
    pub fn fail(&mut self, detail: Value, at: DateTime<Utc>) -> Result<()> {
        self.finish(Status::Failed, detail, at)
    }

    fn finish(&mut self, to: Status, result: Value, at: DateTime<Utc>) -> Result<()> {
        let started = self.started_at.ok_or(Error::InvalidTransition {
            from: self.status,
            to,
        })?;
        self.transition(to)?;
        self.result = Some(result);
        self.completed_at = Some(at);
        self.elapsed_time = Some(elapsed_seconds(started, at));
        Ok(())
    }

    fn transition(&mut self, to: Status) -> Result<()> {
        if !self.status.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Point-in-time view served by `GET /status/{task_id}`.
    pub fn status_view(&self) -> StatusView {
        StatusView {
            task_id: self.task_id,
            service: self.service.clone(),
            status: self.status,
            elapsed_time: self.elapsed_time.map_or_else(|| json!("pending"), |s| json!(s)),
            result: self.result.clone().unwrap_or(Value::Null),
            created_at: self.created_at,
        }
    }
}

/// Elapsed seconds rounded to the millisecond, clamped at zero.
fn elapsed_seconds(started: DateTime<Utc>, completed: DateTime<Utc>) -> f64 {
    let micros = (completed - started)
        .num_microseconds()
        .unwrap_or(i64::MAX)
        .max(0);
    (micros as f64 / 1000.0).round() / 1000.0
}

/// Status response body. `elapsed_time` is a number of seconds or `"pending"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusView {
    pub task_id: TaskId,
    pub service: String,
    pub status: Status,
    pub elapsed_time: Value,
    pub result: Value,
    pub created_at: DateTime<Utc>,
}

/// Newtype for task IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(TaskId)
            .map_err(|_| Error::NotFound(format!("task {s}")))
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Accepted and waiting in the dispatch queue.
    Queued,
    /// A worker is calling the backend.
    Running,
    /// Backend reported success. Terminal.
    Completed,
    /// Backend, transport, or worker failure. Terminal.
    Failed,
}

impl Status {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: Status) -> bool {
        use Status::*;
        matches!(
            (self, to),
            (Queued, Running) | (Running, Completed) | (Running, Failed)
        )
    }

    /// Is this a terminal status?
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Queued => "queued",
            Status::Running => "running",
            Status::Completed => "completed",
            Status::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for new tasks. The engine's public API for submitting work.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub(crate) service: String,
    pub(crate) payload: Value,
    pub(crate) source_reference: Option<String>,
}

impl NewTask {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            payload: Value::Object(Default::default()),
            source_reference: None,
        }
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn source_reference(mut self, reference: impl Into<String>) -> Self {
        self.source_reference = Some(reference.into());
        self
    }
}
