//! Binding row types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AgentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Persisted authorization state of a binding.
///
/// Only meaningful when the bound tool requires authorization. This is the
/// only auth state that is ever stored; connection status is derived from it
/// on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    NotAuthenticated,
    Authenticated,
    Expired,
}

impl AuthStatus {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::Authenticated => "authenticated",
            Self::Expired => "expired",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "not_authenticated" => Some(Self::NotAuthenticated),
            "authenticated" => Some(Self::Authenticated),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

/// Secret credential fields of a binding.
///
/// Opaque to everything except the execution path; the safe projection in
/// the runtime crate never includes these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCredentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// The association of one tool with one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentToolBinding {
    pub agent_id: AgentId,
    pub tool_name: String,
    /// Non-secret settings, e.g. a calendar identifier.
    pub config: serde_json::Value,
    pub credentials: TokenCredentials,
    pub disabled_actions: BTreeSet<String>,
    pub enabled: bool,
    pub auth_status: AuthStatus,
    pub token_expires_at: Option<DateTime<Utc>>,
}

impl AgentToolBinding {
    /// A fresh binding, as created when an operator connects a tool.
    pub fn new(agent_id: AgentId, tool_name: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            agent_id,
            tool_name: tool_name.into(),
            config,
            credentials: TokenCredentials::default(),
            disabled_actions: BTreeSet::new(),
            enabled: true,
            auth_status: AuthStatus::NotAuthenticated,
            token_expires_at: None,
        }
    }
}
