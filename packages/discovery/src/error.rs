//! Error types for the discovery orchestrator.
//!
//! None of these are fatal to the surrounding application. Store errors
//! degrade to "no prior session", backend errors degrade to an empty or
//! unchanged result list.

use thiserror::Error;

/// Errors from session storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage backend failed (I/O, poisoned lock, remote store).
    #[error("storage backend error: {0}")]
    Backend(#[from] anyhow::Error),

    /// Stored record could not be encoded or decoded.
    #[error("session record is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A session key string that is neither `global` nor `campaign:<uuid>`.
#[derive(Debug, Error)]
#[error("invalid session key: {0:?}")]
pub struct SessionKeyError(pub String);

/// Errors surfaced by [`crate::EngineHandle`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine loop has stopped (unmounted or dropped).
    #[error("discovery engine is no longer running")]
    Closed,

    /// Shortlist lookups need a campaign; the global session has none.
    #[error("the global session has no campaign shortlist")]
    NoCampaign,

    #[error("backend request failed: {0}")]
    Backend(#[source] anyhow::Error),
}
