//! Action handler trait.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Binding-scoped data handed to a handler at invocation time.
///
/// `config` holds the binding's non-secret settings (e.g. a calendar
/// identifier); `credentials` holds the secret fields the execution path is
/// allowed to see. Both are owned copies frozen at session start.
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    pub config: Value,
    pub credentials: Value,
}

/// Errors raised by action handlers.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("execution failed: {0}")]
    Execution(String),
}

/// The bound callable behind one tool action.
///
/// Implementations receive arguments already resolved against the action's
/// declared parameter list: every required parameter is present and every
/// optional parameter carries either the caller's value or its default.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn call(
        &self,
        ctx: &ActionContext,
        args: Map<String, Value>,
    ) -> Result<Value, ActionError>;
}
