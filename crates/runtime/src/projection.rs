//! Two-tier binding projection.
//!
//! [`SafeView`] is the only form ever returned to administrative and listing
//! callers: it carries no secrets. The full projection (config *and*
//! credentials) exists only as [`FullView`], which is crate-private: the
//! single consumer is the snapshot service, so credentials cannot leak
//! through any other path by construction.

use std::collections::BTreeSet;

use catalog::{ActionContext, ToolDefinition};
use chrono::{DateTime, Utc};
use serde::Serialize;
use storage::AgentToolBinding;

use crate::status::{connection_status, ConnectionStatus};
use crate::Result;

/// The secret-free view of a binding.
#[derive(Debug, Clone, Serialize)]
pub struct SafeView {
    pub tool_name: String,
    pub enabled: bool,
    pub config: serde_json::Value,
    pub disabled_actions: BTreeSet<String>,
    pub connection_status: ConnectionStatus,
    pub token_expires_at: Option<DateTime<Utc>>,
}

/// Project a binding for administrative consumers. Excludes credentials.
pub fn project_safe(binding: &AgentToolBinding, definition: &ToolDefinition) -> SafeView {
    SafeView {
        tool_name: binding.tool_name.clone(),
        enabled: binding.enabled,
        config: binding.config.clone(),
        disabled_actions: binding.disabled_actions.clone(),
        connection_status: connection_status(definition.requires_auth, binding.auth_status),
        token_expires_at: binding.token_expires_at,
    }
}

/// The secret-bearing view of a binding, for the execution path only.
#[derive(Debug, Clone)]
pub(crate) struct FullView {
    pub(crate) tool_name: String,
    pub(crate) config: serde_json::Value,
    pub(crate) credentials: serde_json::Value,
    pub(crate) disabled_actions: BTreeSet<String>,
}

impl FullView {
    /// The owned per-call context handed to action handlers.
    pub(crate) fn context(&self) -> ActionContext {
        ActionContext {
            config: self.config.clone(),
            credentials: self.credentials.clone(),
        }
    }
}

/// Project a binding for the execution path. Owned copies throughout: the
/// view holds the values read now, not a live reference.
pub(crate) fn project_full(binding: &AgentToolBinding) -> Result<FullView> {
    Ok(FullView {
        tool_name: binding.tool_name.clone(),
        config: binding.config.clone(),
        credentials: serde_json::to_value(&binding.credentials)?,
        disabled_actions: binding.disabled_actions.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use storage::{AgentId, AuthStatus};

    fn binding() -> AgentToolBinding {
        let mut b = AgentToolBinding::new(AgentId::new(), "calendar", json!({"calendar_id": "x"}));
        b.credentials.access_token = Some("secret-token".into());
        b.credentials.refresh_token = Some("secret-refresh".into());
        b
    }

    #[test]
    fn safe_view_never_contains_credentials() {
        let def = ToolDefinition::authorized("calendar", "google");
        let view = project_safe(&binding(), &def);
        let rendered = serde_json::to_string(&view).unwrap();
        assert!(!rendered.contains("secret-token"));
        assert!(!rendered.contains("secret-refresh"));
    }

    #[test]
    fn safe_view_derives_status_from_inputs() {
        let def = ToolDefinition::authorized("calendar", "google");
        let mut b = binding();
        b.auth_status = AuthStatus::Authenticated;
        assert_eq!(
            project_safe(&b, &def).connection_status,
            ConnectionStatus::ConnectedAuthValid
        );

        // No-auth tools are connected regardless of stored auth status.
        let open = ToolDefinition::open("messaging");
        b.auth_status = AuthStatus::Expired;
        assert_eq!(
            project_safe(&b, &open).connection_status,
            ConnectionStatus::ConnectedNoAuth
        );
    }

    #[test]
    fn full_view_exposes_credentials_to_the_execution_path() {
        let view = project_full(&binding()).unwrap();
        let ctx = view.context();
        assert_eq!(ctx.credentials["access_token"], "secret-token");
        assert_eq!(ctx.config["calendar_id"], "x");
    }
}
