//! Unified error types surfaced by the engine API.
//!
//! Wraps failures from the session store, record parsing, and task
//! coordination so RPC callers can bubble them up with consistent context.

use thiserror::Error;

pub use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("session {0} not found")]
    SessionNotFound(String),

    #[error("actor {actor} not found in session {session}")]
    ActorNotFound { session: String, actor: i64 },

    #[error("invalid intent: {0}")]
    InvalidIntent(String),

    #[error("insufficient resource: {0}")]
    InsufficientResource(String),

    #[error("no match request on record for {0}")]
    NoMatchRequest(i64),

    #[error("profile for character {0} unavailable")]
    ProfileUnavailable(i64),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("corrupt record at {key}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl EngineError {
    /// Whether an RPC caller should surface this as "session expired".
    pub fn is_session_gone(&self) -> bool {
        matches!(self, EngineError::SessionNotFound(_) | EngineError::ActorNotFound { .. })
    }
}
