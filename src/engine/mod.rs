//! Dispatch engine: submission and status API over the task store and queue.
//!
//! Submissions are validated against the service directory, stored as
//! `queued`, and pushed onto the dispatch queue. Status reads go straight to
//! the store and never wait on workers.

pub mod pool;
pub mod worker;

pub use pool::WorkerPool;
pub use worker::Worker;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use opentelemetry::KeyValue;
use serde_json::Value;
use tracing::info;

use crate::backend::BackendClient;
use crate::config::Config;
use crate::directory::{ServiceDirectory, ServiceEntry};
use crate::error::{Error, Result};
use crate::model::{NewTask, Status, Task, TaskId};
use crate::queue::DispatchQueue;
use crate::store::TaskStore;
use crate::telemetry::metrics;

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub workers: usize,
    pub backend_timeout: Duration,
    pub retention_warn_threshold: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            backend_timeout: Duration::from_secs(3600),
            retention_warn_threshold: None,
        }
    }
}

impl From<&Config> for EngineConfig {
    fn from(config: &Config) -> Self {
        Self {
            workers: config.workers,
            backend_timeout: config.backend_timeout,
            retention_warn_threshold: config.retention_warn_threshold,
        }
    }
}

/// The dispatch engine. Cheap to clone; clones share all state.
#[derive(Debug, Clone)]
pub struct Engine {
    directory: Arc<ServiceDirectory>,
    store: Arc<TaskStore>,
    queue: Arc<DispatchQueue>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(directory: ServiceDirectory, config: EngineConfig) -> Self {
        let store = match config.retention_warn_threshold {
            Some(threshold) => TaskStore::with_retention_warning(threshold),
            None => TaskStore::new(),
        };
        Self {
            directory: Arc::new(directory),
            store: Arc::new(store),
            queue: Arc::new(DispatchQueue::new()),
            config,
        }
    }

    pub fn directory(&self) -> &ServiceDirectory {
        &self.directory
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Spawn the worker pool. Call once; the pool owns the queue's shutdown.
    pub fn start(&self) -> Result<WorkerPool> {
        let backend = BackendClient::new(self.config.backend_timeout)?;
        info!(timeout_s = backend.timeout().as_secs(), "backend client ready");
        Ok(WorkerPool::spawn(
            self.config.workers,
            Arc::clone(&self.store),
            Arc::clone(&self.queue),
            backend,
        ))
    }

    /// Validate, store, and enqueue a task. Returns without waiting for it to run.
    pub fn submit(&self, new: NewTask) -> Result<Task> {
        let service = new.service.clone();
        let result = self.try_submit(new);
        let label = match &result {
            Ok(_) => "ok",
            Err(Error::UnknownService(_)) => "unknown_service",
            Err(Error::QueueClosed) => "closed",
            Err(_) => "invalid",
        };
        metrics::tasks_submitted().add(
            1,
            &[
                KeyValue::new("service", service),
                KeyValue::new("result", label),
            ],
        );
        result
    }

    fn try_submit(&self, new: NewTask) -> Result<Task> {
        let entry = self
            .directory
            .resolve(&new.service)
            .ok_or_else(|| Error::UnknownService(new.service.clone()))?;

        let mut payload = new.payload;
        let required = validate_payload(entry, &mut payload)?;

        let task = Task {
            task_id: TaskId::new(),
            service: entry.name.clone(),
            address: entry.address.clone(),
            entry_point: entry.entry_point.clone(),
            payload,
            status: Status::Queued,
            result: None,
            source_reference: new.source_reference.or(required),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            elapsed_time: None,
        };
        let id = task.task_id;

        self.queue.push_with(id, || self.store.put(task.clone()))?;

        info!(task_id = %id, service = %task.service, "task queued");
        Ok(task)
    }

    /// Snapshot of one task.
    pub fn get(&self, id: TaskId) -> Result<Task> {
        self.store.get(id)
    }

    /// Snapshots of all tasks, in submission order.
    pub fn list(&self) -> Vec<Task> {
        self.store.list_all()
    }

    /// Total tasks held by the store.
    pub fn task_count(&self) -> usize {
        self.store.len()
    }

    /// Tasks waiting for a worker.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Resolve once every submitted task has been dispatched to completion.
    pub async fn wait_idle(&self) {
        self.queue.wait_idle().await
    }
}

/// Check the service's required field and normalize it in place.
///
/// Returns the field value, which doubles as the default source reference.
fn validate_payload(entry: &ServiceEntry, payload: &mut Value) -> Result<Option<String>> {
    let Some(field) = entry.required_field.as_deref() else {
        return Ok(None);
    };
    let missing = || Error::MissingField {
        service: entry.name.clone(),
        field: field.to_string(),
    };

    let slot = payload
        .as_object_mut()
        .and_then(|obj| obj.get_mut(field))
        .ok_or_else(missing)?;
    let value = slot.as_str().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(missing());
    }
    *slot = Value::String(value.clone());
    Ok(Some(value))
}
