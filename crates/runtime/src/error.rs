use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Adapter generation could not faithfully reproduce an action's
    /// parameter list. Raised at build time, never at call time.
    #[error("schema mismatch for {action}: {reason}")]
    SchemaMismatch { action: String, reason: String },

    /// A snapshot was requested for a session that was never started or was
    /// already discarded. A caller bug, surfaced immediately.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Arguments did not resolve against the action's parameter list.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The underlying action failed or timed out. Reported back to the
    /// model as a failed tool result, not propagated as a process fault.
    #[error("execution failed: {0}")]
    Execution(String),

    #[error(transparent)]
    Storage(#[from] storage::Error),

    #[error(transparent)]
    Catalog(#[from] catalog::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
