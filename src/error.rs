//! Error types for the orchestrator.

use thiserror::Error;

use crate::model::{Status, TaskId};

#[derive(Debug, Error)]
pub enum Error {
    #[error("service not found: {0}")]
    UnknownService(String),

    #[error("{field} parameter is required for service {service}")]
    MissingField { service: String, field: String },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("task not found: {0}")]
    NotFound(String),

    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: Status, to: Status },

    #[error("task {0} already exists")]
    DuplicateTask(TaskId),

    #[error("dispatch queue is closed")]
    QueueClosed,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
