//! # orchestrator
//!
//! Front-end that accepts processing requests, queues them, and dispatches
//! each to one of several named backend services over HTTP, tracking every
//! task through `queued -> running -> completed | failed`.
//!
//! Provides the service directory, an in-memory task store, a FIFO dispatch
//! queue, a worker pool, an axum HTTP boundary, and OpenTelemetry observability.

pub mod api;
pub mod backend;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod model;
pub mod queue;
pub mod store;
pub mod telemetry;
