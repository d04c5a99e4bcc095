//! Error types for the trainer core.
//!
//! None of these are fatal to the process: permission denial is a
//! first-class UI state, external-call failures surface as user-facing
//! messages, and invalid input is rejected before any external call.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MrtError>;

#[derive(Error, Debug)]
pub enum MrtError {
    #[error("Permission required: {0}")]
    Permission(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("SMS store error: {0}")]
    SmsStore(String),

    #[error("Report store error: {0}")]
    ReportStore(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
