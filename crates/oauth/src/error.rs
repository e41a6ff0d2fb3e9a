use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No (complete) credential configuration exists for a provider.
    /// Fatal to that provider's flows, not to the process.
    #[error("unsupported provider {provider}: missing {}", missing.join(", "))]
    UnsupportedProvider {
        provider: String,
        missing: Vec<String>,
    },

    /// The provider rejected a grant (invalid, expired, or revoked).
    /// Recoverable by operator re-authentication.
    #[error("authentication failed for {provider}: {reason}")]
    Authentication { provider: String, reason: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Storage(#[from] storage::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
