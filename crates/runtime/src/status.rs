//! Derived connection status.

use catalog::ToolDefinition;
use serde::Serialize;
use storage::{AgentToolBinding, AuthStatus};

/// Whether a tool is currently usable for an agent.
///
/// Never stored: always recomputed from binding existence, the tool's auth
/// requirement, and the persisted [`AuthStatus`], so it cannot drift from
/// its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    NotConnected,
    ConnectedNoAuth,
    ConnectedAuthValid,
    ConnectedAuthInvalid,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotConnected => "not_connected",
            Self::ConnectedNoAuth => "connected_no_auth",
            Self::ConnectedAuthValid => "connected_auth_valid",
            Self::ConnectedAuthInvalid => "connected_auth_invalid",
        };
        write!(f, "{name}")
    }
}

/// Map a binding's auth state to its connection status.
///
/// Total over its inputs. Callers handle the no-binding case as
/// [`ConnectionStatus::NotConnected`] before calling this.
pub fn connection_status(requires_auth: bool, auth_status: AuthStatus) -> ConnectionStatus {
    match (requires_auth, auth_status) {
        (false, _) => ConnectionStatus::ConnectedNoAuth,
        (true, AuthStatus::Authenticated) => ConnectionStatus::ConnectedAuthValid,
        (true, AuthStatus::NotAuthenticated | AuthStatus::Expired) => {
            ConnectionStatus::ConnectedAuthInvalid
        }
    }
}

/// Connection status for an optional binding against its definition.
pub fn binding_status(
    binding: Option<&AgentToolBinding>,
    definition: &ToolDefinition,
) -> ConnectionStatus {
    match binding {
        None => ConnectionStatus::NotConnected,
        Some(b) => connection_status(definition.requires_auth, b.auth_status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truth_table() {
        use AuthStatus::*;
        use ConnectionStatus::*;

        let cases = [
            (false, NotAuthenticated, ConnectedNoAuth),
            (false, Authenticated, ConnectedNoAuth),
            (false, Expired, ConnectedNoAuth),
            (true, NotAuthenticated, ConnectedAuthInvalid),
            (true, Authenticated, ConnectedAuthValid),
            (true, Expired, ConnectedAuthInvalid),
        ];
        for (requires_auth, auth, expected) in cases {
            assert_eq!(connection_status(requires_auth, auth), expected);
        }
    }

    #[test]
    fn missing_binding_is_not_connected() {
        let def = ToolDefinition::authorized("calendar", "google");
        assert_eq!(binding_status(None, &def), ConnectionStatus::NotConnected);
    }

    #[test]
    fn present_binding_defers_to_truth_table() {
        let def = ToolDefinition::authorized("calendar", "google");
        let binding = AgentToolBinding::new(
            storage::AgentId::new(),
            "calendar",
            serde_json::json!({}),
        );
        assert_eq!(
            binding_status(Some(&binding), &def),
            ConnectionStatus::ConnectedAuthInvalid
        );
    }
}
