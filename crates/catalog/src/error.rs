//! Catalog error types.

use thiserror::Error;

/// Errors from catalog registration and lookup.
#[derive(Debug, Error)]
pub enum Error {
    /// A tool with this name is already registered.
    #[error("duplicate tool: {0}")]
    DuplicateTool(String),

    /// No tool with this name is registered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// A tool declared an action without providing a handler for it.
    #[error("tool {tool} has no handler for action {action}")]
    MissingHandler { tool: String, action: String },
}

pub type Result<T> = std::result::Result<T, Error>;
