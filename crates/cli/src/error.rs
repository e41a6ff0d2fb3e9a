//! CLI error types.

use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration is invalid or missing required fields.
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// An argument could not be parsed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An error occurred in the catalog layer.
    #[error(transparent)]
    Catalog(#[from] catalog::Error),

    /// An error occurred in the OAuth layer.
    #[error(transparent)]
    Oauth(#[from] oauth::Error),

    /// An error occurred in the runtime layer.
    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    /// An error occurred in the storage layer.
    #[error(transparent)]
    Storage(#[from] storage::Error),

    /// A JSON value could not be parsed or rendered.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
