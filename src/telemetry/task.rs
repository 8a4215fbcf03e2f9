//! Task dispatch span helpers.
//!
//! One span per dequeued task, covering the backend call and the transition
//! that records its outcome.

use tracing::Span;

use crate::model::{Status, TaskId};

/// Start a span for dispatching one task.
///
/// The `task.status` field is declared empty and is filled by
/// [`record_state_transition`].
pub fn start_task_span(service: &str, task_id: &TaskId, worker: usize) -> Span {
    tracing::info_span!(
        "task.dispatch",
        "task.service" = service,
        "task.id" = %task_id,
        "worker" = worker,
        "task.status" = tracing::field::Empty,
    )
}

/// Record a status transition on the span and emit a `state_transition` event.
pub fn record_state_transition(span: &Span, from: Status, to: Status) {
    span.record("task.status", tracing::field::display(to));
    span.in_scope(|| {
        tracing::info!(%from, %to, "state_transition");
    });
}
