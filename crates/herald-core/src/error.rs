//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level error type shared by the bus, repository, and HTTP layers.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A stored event was not found.
    #[error("event not found: {0}")]
    EventNotFound(Uuid),

    /// The bus (or something owning one) was used after `close()`.
    #[error("event bus already closed")]
    Closed,

    /// Malformed input, such as an unparseable `since` timestamp.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Infrastructure(format!("event payload codec failed: {err}"))
    }
}
