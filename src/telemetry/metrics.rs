//! Metric instrument factories.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without an OTLP endpoint the global provider is a no-op.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("orchestrator")
}

/// Counter: submission attempts.
/// Labels: `service`, `result` ("ok" | "unknown_service" | "invalid" | "closed").
pub fn tasks_submitted() -> Counter<u64> {
    meter()
        .u64_counter("orchestrator.tasks.submitted")
        .with_description("Number of task submissions")
        .build()
}

/// Counter: task status transitions.
/// Labels: `from`, `to`.
pub fn task_state_transitions() -> Counter<u64> {
    meter()
        .u64_counter("orchestrator.tasks.state_transitions")
        .with_description("Number of task status transitions")
        .build()
}

/// Counter: dispatch queue operations (push, pop, close).
/// Labels: `operation`.
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("orchestrator.queue.operations")
        .with_description("Number of dispatch queue operations")
        .build()
}

/// Histogram: backend call duration in milliseconds.
/// Labels: `service`, `outcome` ("completed" | "failed").
pub fn dispatch_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("orchestrator.dispatch.duration_ms")
        .with_description("Backend call duration in milliseconds")
        .with_unit("ms")
        .build()
}
