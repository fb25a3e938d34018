//! Client error types.

use herald_core::error::DomainError;
use thiserror::Error;

/// Errors raised while talking to a Herald server.
///
/// The polling loop never surfaces these: a failed poll is logged and
/// treated as an empty batch.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network failure, timeout, or an undecodable response body.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server responded with {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The client was used outside its lifecycle (e.g. after `close`).
    #[error("invalid client state: {0}")]
    State(&'static str),

    /// Error from the local bus or event projection.
    #[error(transparent)]
    Domain(#[from] DomainError),
}
