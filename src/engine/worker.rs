//! Dispatch worker: pulls task IDs off the queue and runs them on their backend.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use opentelemetry::KeyValue;
use serde_json::json;
use tokio::task::JoinError;
use tracing::{Instrument, error, info, warn};

use crate::backend::{Backend, Reply};
use crate::model::{Status, TaskId};
use crate::queue::DispatchQueue;
use crate::store::TaskStore;
use crate::telemetry::metrics;
use crate::telemetry::task::{record_state_transition, start_task_span};

/// One long-lived dispatch loop. Handles a single task at a time.
pub struct Worker<B> {
    index: usize,
    store: Arc<TaskStore>,
    queue: Arc<DispatchQueue>,
    backend: B,
}

impl<B: Backend> Worker<B> {
    pub fn new(index: usize, store: Arc<TaskStore>, queue: Arc<DispatchQueue>, backend: B) -> Self {
        Self {
            index,
            store,
            queue,
            backend,
        }
    }

    /// Drain the queue until it is closed.
    ///
    /// Each task runs on its own tokio task. A panic anywhere in its dispatch
    /// fails that task and the loop carries on with the next one.
    pub async fn run(self) {
        info!(worker = self.index, "worker started");
        while let Some(id) = self.queue.pop().await {
            let handle = tokio::spawn(
                dispatch(
                    self.index,
                    Arc::clone(&self.store),
                    self.backend.clone(),
                    id,
                )
                .in_current_span(),
            );
            if let Err(e) = handle.await {
                self.recover(id, e);
            }
            self.queue.task_done();
        }
        info!(worker = self.index, "worker stopped");
    }

    /// Record an aborted dispatch as the task's failure.
    fn recover(&self, id: TaskId, e: JoinError) {
        let detail = if e.is_panic() {
            error!(worker = self.index, task_id = %id, "dispatch panicked");
            json!({ "error": format!("worker panicked: {e}") })
        } else {
            json!({ "error": format!("dispatch aborted: {e}") })
        };

        let outcome = self.store.update(id, |t| {
            let now = Utc::now();
            match t.status {
                Status::Queued => {
                    t.start(now)?;
                    t.fail(detail, now)
                }
                Status::Running => t.fail(detail, now),
                Status::Completed | Status::Failed => Ok(()),
            }
        });
        if let Err(e) = outcome {
            error!(task_id = %id, "cannot record task failure: {e}");
        }
    }
}

/// Run one task to a terminal status. Anything that goes wrong is either
/// recorded on the task or logged and skipped.
async fn dispatch<B: Backend>(worker: usize, store: Arc<TaskStore>, backend: B, id: TaskId) {
    let task = match store.get(id) {
        Ok(t) => t,
        Err(e) => {
            error!(worker, task_id = %id, "dequeued unknown task, skipping: {e}");
            return;
        }
    };

    let span = start_task_span(&task.service, &id, worker);
    async {
        if let Err(e) = store.update(id, |t| t.start(Utc::now())) {
            error!(task_id = %id, "cannot start task, skipping: {e}");
            return;
        }
        record_transition(&span, Status::Queued, Status::Running);

        let started = Instant::now();
        let reply = backend
            .invoke(&task.address, &task.entry_point, &task.payload)
            .await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        let (to, outcome) = match reply {
            Reply::Completed(value) => (
                Status::Completed,
                store.update(id, |t| t.complete(value, Utc::now())),
            ),
            Reply::Failed(detail) => {
                warn!(task_id = %id, %detail, "backend call failed");
                (
                    Status::Failed,
                    store.update(id, |t| t.fail(detail, Utc::now())),
                )
            }
        };

        metrics::dispatch_duration_ms().record(
            duration_ms,
            &[
                KeyValue::new("service", task.service.clone()),
                KeyValue::new("outcome", to.to_string()),
            ],
        );

        match outcome {
            Ok(()) => {
                record_transition(&span, Status::Running, to);
                info!(task_id = %id, status = %to, duration_ms, "task finished");
            }
            Err(e) => error!(task_id = %id, "cannot record task outcome: {e}"),
        }
    }
    .instrument(span.clone())
    .await
}

fn record_transition(span: &tracing::Span, from: Status, to: Status) {
    record_state_transition(span, from, to);
    metrics::task_state_transitions().add(
        1,
        &[
            KeyValue::new("from", from.to_string()),
            KeyValue::new("to", to.to_string()),
        ],
    );
}
