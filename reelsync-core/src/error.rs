//! Error types and error handling utilities.

use thiserror::Error;

/// Failure taxonomy for the reconciliation engine.
///
/// Nothing here is fatal to a session. Per-video failures are absorbed by
/// the caller so sibling videos keep processing; store and platform failures
/// degrade to skipped cosmetics or a missed sync event.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Settings file transfer hit the filesystem.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A settings document failed to parse or serialize.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The shared key-value store rejected or lost an operation.
    /// Constructed by store implementations, never by the engine.
    #[error("Store error: {0}")]
    Store(String),

    /// The platform refused a write (out-of-range value, PiP denial).
    #[error("Platform rejection: {0}")]
    Platform(String),

    /// A heuristic failed to locate the element it was after.
    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
