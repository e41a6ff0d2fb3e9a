//! Session snapshot service.
//!
//! A snapshot freezes an agent's available tool surface at call start:
//! every enabled binding's full projection, minus disabled actions, turned
//! into function adapters. The snapshot is exclusively owned by the call
//! that created it: configuration edits, OAuth completions, and token
//! refreshes that happen after `start` are invisible to it. The only way a
//! call picks up a change is to be a new call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use catalog::Catalog;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use storage::{AgentId, BindingStore};
use tokio::sync::RwLock;

use crate::adapter::{FunctionAdapter, FunctionSchema};
use crate::projection::project_full;
use crate::{Error, Result};

/// Identifier of one call/session, assigned by the conversational transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The frozen tool surface of one call.
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub agent_id: AgentId,
    pub taken_at: DateTime<Utc>,
    adapters: Vec<FunctionAdapter>,
}

impl std::fmt::Debug for SessionSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSnapshot")
            .field("session_id", &self.session_id)
            .field("agent_id", &self.agent_id)
            .field("taken_at", &self.taken_at)
            .finish_non_exhaustive()
    }
}

impl SessionSnapshot {
    /// Schemas of every adapter in this snapshot, for the model runtime.
    pub fn schemas(&self) -> Vec<&FunctionSchema> {
        self.adapters.iter().map(FunctionAdapter::schema).collect()
    }

    /// Look up an adapter by its qualified `tool.action` name.
    pub fn adapter(&self, name: &str) -> Option<&FunctionAdapter> {
        self.adapters.iter().find(|a| a.name() == name)
    }
}

/// A tool call result as reported back to the model, so the conversation can
/// continue across failed calls.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallOutcome {
    Success { output: Value },
    Failure { error: String },
}

/// Creates, serves, and discards per-call snapshots.
pub struct SnapshotStore {
    catalog: Arc<Catalog>,
    store: Arc<BindingStore>,
    action_timeout: Duration,
    sessions: RwLock<HashMap<SessionId, Arc<SessionSnapshot>>>,
}

impl SnapshotStore {
    pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(catalog: Arc<Catalog>, store: Arc<BindingStore>) -> Self {
        Self::with_timeout(catalog, store, Self::DEFAULT_ACTION_TIMEOUT)
    }

    pub fn with_timeout(
        catalog: Arc<Catalog>,
        store: Arc<BindingStore>,
        action_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            store,
            action_timeout,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Freeze the agent's enabled tool surface for a new session.
    ///
    /// Starting an id that is already live replaces its snapshot: the new
    /// call sees current configuration, the old handle keeps the old one.
    pub async fn start(
        &self,
        agent_id: AgentId,
        session_id: SessionId,
    ) -> Result<Arc<SessionSnapshot>> {
        let mut adapters = Vec::new();

        for binding in self.store.list_for_agent(agent_id)? {
            if !binding.enabled {
                continue;
            }
            let tool = match self.catalog.get(&binding.tool_name) {
                Ok(tool) => tool,
                Err(e) => {
                    tracing::warn!(
                        agent_id = %agent_id,
                        tool = %binding.tool_name,
                        error = %e,
                        "binding references unregistered tool; excluded from session"
                    );
                    continue;
                }
            };

            let full = project_full(&binding)?;
            for action in &tool.definition.actions {
                if full.disabled_actions.contains(&action.name) {
                    continue;
                }
                let Some(handler) = tool.handler(&action.name) else {
                    tracing::error!(
                        tool = %binding.tool_name,
                        action = %action.name,
                        "registered action has no handler; excluded from session"
                    );
                    continue;
                };
                match FunctionAdapter::build(&full.tool_name, action, full.context(), handler) {
                    Ok(adapter) => adapters.push(adapter),
                    // Abort only this action's exposure, before the call
                    // starts; the rest of the snapshot is served.
                    Err(e) => tracing::error!(
                        tool = %binding.tool_name,
                        action = %action.name,
                        error = %e,
                        "adapter build failed; action excluded from session"
                    ),
                }
            }
        }

        let snapshot = Arc::new(SessionSnapshot {
            session_id: session_id.clone(),
            agent_id,
            taken_at: Utc::now(),
            adapters,
        });
        tracing::debug!(
            session_id = %session_id,
            agent_id = %agent_id,
            actions = snapshot.adapters.len(),
            "session snapshot taken"
        );

        self.sessions
            .write()
            .await
            .insert(session_id, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// The frozen snapshot for a live session.
    pub async fn get(&self, session_id: &SessionId) -> Result<Arc<SessionSnapshot>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }

    /// Discard a session's snapshot.
    pub async fn end(&self, session_id: &SessionId) {
        if self.sessions.write().await.remove(session_id).is_none() {
            tracing::debug!(session_id = %session_id, "end for unknown session");
        }
    }

    /// Entry point for the model runtime's tool-call callback.
    ///
    /// A missing session is a caller bug and surfaces as an error; anything
    /// wrong with the call itself (unknown action, bad arguments, handler
    /// failure, timeout) becomes a [`CallOutcome::Failure`] for the model.
    pub async fn dispatch(
        &self,
        session_id: &SessionId,
        action_name: &str,
        args: Map<String, Value>,
    ) -> Result<CallOutcome> {
        let snapshot = self.get(session_id).await?;
        let Some(adapter) = snapshot.adapter(action_name) else {
            return Ok(CallOutcome::Failure {
                error: format!("unknown action: {action_name}"),
            });
        };

        match adapter.invoke(args, self.action_timeout).await {
            Ok(output) => Ok(CallOutcome::Success { output }),
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    action = action_name,
                    error = %e,
                    "tool call failed"
                );
                Ok(CallOutcome::Failure {
                    error: e.to_string(),
                })
            }
        }
    }
}
