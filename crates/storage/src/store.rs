//! SQLite binding store implementation.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, Row};

use crate::{AgentId, AgentToolBinding, AuthStatus, Error, Result, TokenCredentials};

/// SQLite-backed store of agent/tool bindings.
///
/// The one resource shared across components: the refresh task, the snapshot
/// service, and operator commands all read and write through it. Writes are
/// whole-row and last-write-wins, so concurrent writers converge to one
/// coherent row rather than a blend of two.
pub struct BindingStore {
    conn: Mutex<Connection>,
}

impl BindingStore {
    /// Open or create a binding store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory binding store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn init_schema(&self) -> Result<()> {
        self.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS bindings (
                agent_id TEXT NOT NULL,
                tool_name TEXT NOT NULL,
                config TEXT NOT NULL,
                credentials TEXT NOT NULL,
                disabled_actions TEXT NOT NULL,
                enabled INTEGER NOT NULL,
                auth_status TEXT NOT NULL,
                token_expires_at TEXT,
                PRIMARY KEY (agent_id, tool_name)
            );
            CREATE INDEX IF NOT EXISTS idx_bindings_expiry
                ON bindings(token_expires_at);
            "#,
        )?;
        Ok(())
    }

    /// Create a binding for an agent/tool pair.
    pub fn connect_tool(
        &self,
        agent_id: AgentId,
        tool_name: &str,
        config: serde_json::Value,
    ) -> Result<AgentToolBinding> {
        if self.read_binding(agent_id, tool_name)?.is_some() {
            return Err(Error::AlreadyConnected {
                agent_id: agent_id.to_string(),
                tool_name: tool_name.to_string(),
            });
        }
        let binding = AgentToolBinding::new(agent_id, tool_name, config);
        self.insert(&binding)?;
        Ok(binding)
    }

    fn insert(&self, binding: &AgentToolBinding) -> Result<()> {
        let row = EncodedRow::from(binding)?;
        self.lock().execute(
            "INSERT INTO bindings
                 (agent_id, tool_name, config, credentials, disabled_actions,
                  enabled, auth_status, token_expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                binding.agent_id.to_string(),
                binding.tool_name,
                row.config,
                row.credentials,
                row.disabled_actions,
                binding.enabled,
                binding.auth_status.as_str(),
                row.token_expires_at,
            ],
        )?;
        Ok(())
    }

    /// Read one binding, if it exists.
    pub fn read_binding(
        &self,
        agent_id: AgentId,
        tool_name: &str,
    ) -> Result<Option<AgentToolBinding>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT agent_id, tool_name, config, credentials, disabled_actions,
                    enabled, auth_status, token_expires_at
             FROM bindings WHERE agent_id = ?1 AND tool_name = ?2",
        )?;
        let mut rows = stmt.query(params![agent_id.to_string(), tool_name])?;
        match rows.next()? {
            Some(row) => Ok(Some(decode_row(row)?)),
            None => Ok(None),
        }
    }

    /// Overwrite a binding's row. Last write wins.
    pub fn write_binding(&self, binding: &AgentToolBinding) -> Result<()> {
        let row = EncodedRow::from(binding)?;
        let changed = self.lock().execute(
            "UPDATE bindings SET
                 config = ?3, credentials = ?4, disabled_actions = ?5,
                 enabled = ?6, auth_status = ?7, token_expires_at = ?8
             WHERE agent_id = ?1 AND tool_name = ?2",
            params![
                binding.agent_id.to_string(),
                binding.tool_name,
                row.config,
                row.credentials,
                row.disabled_actions,
                binding.enabled,
                binding.auth_status.as_str(),
                row.token_expires_at,
            ],
        )?;
        if changed == 0 {
            return Err(Error::BindingNotFound {
                agent_id: binding.agent_id.to_string(),
                tool_name: binding.tool_name.clone(),
            });
        }
        Ok(())
    }

    /// Delete a binding.
    pub fn disconnect_tool(&self, agent_id: AgentId, tool_name: &str) -> Result<()> {
        let changed = self.lock().execute(
            "DELETE FROM bindings WHERE agent_id = ?1 AND tool_name = ?2",
            params![agent_id.to_string(), tool_name],
        )?;
        if changed == 0 {
            return Err(Error::BindingNotFound {
                agent_id: agent_id.to_string(),
                tool_name: tool_name.to_string(),
            });
        }
        Ok(())
    }

    /// All bindings for an agent, ordered by tool name.
    pub fn list_for_agent(&self, agent_id: AgentId) -> Result<Vec<AgentToolBinding>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT agent_id, tool_name, config, credentials, disabled_actions,
                    enabled, auth_status, token_expires_at
             FROM bindings WHERE agent_id = ?1 ORDER BY tool_name",
        )?;
        let mut rows = stmt.query(params![agent_id.to_string()])?;
        let mut bindings = Vec::new();
        while let Some(row) = rows.next()? {
            bindings.push(decode_row(row)?);
        }
        Ok(bindings)
    }

    /// Bindings whose token expires within `lead_time` from now (or already
    /// has), excluding never-authenticated ones. These are the refresh
    /// candidates for one lifecycle cycle.
    pub fn list_requiring_refresh(&self, lead_time: Duration) -> Result<Vec<AgentToolBinding>> {
        let cutoff = (Utc::now() + lead_time).to_rfc3339();
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT agent_id, tool_name, config, credentials, disabled_actions,
                    enabled, auth_status, token_expires_at
             FROM bindings
             WHERE auth_status != 'not_authenticated'
               AND enabled = 1
               AND token_expires_at IS NOT NULL
               AND token_expires_at <= ?1
             ORDER BY token_expires_at",
        )?;
        let mut rows = stmt.query(params![cutoff])?;
        let mut bindings = Vec::new();
        while let Some(row) = rows.next()? {
            bindings.push(decode_row(row)?);
        }
        Ok(bindings)
    }
}

/// JSON/text encodings of a binding's structured columns.
struct EncodedRow {
    config: String,
    credentials: String,
    disabled_actions: String,
    token_expires_at: Option<String>,
}

impl EncodedRow {
    fn from(binding: &AgentToolBinding) -> Result<Self> {
        Ok(Self {
            config: serde_json::to_string(&binding.config)?,
            credentials: serde_json::to_string(&binding.credentials)?,
            disabled_actions: serde_json::to_string(&binding.disabled_actions)?,
            token_expires_at: binding.token_expires_at.map(|t| t.to_rfc3339()),
        })
    }
}

fn decode_row(row: &Row<'_>) -> Result<AgentToolBinding> {
    let agent_id: String = row.get(0)?;
    let tool_name: String = row.get(1)?;
    let config: String = row.get(2)?;
    let credentials: String = row.get(3)?;
    let disabled_actions: String = row.get(4)?;
    let enabled: bool = row.get(5)?;
    let auth_status: String = row.get(6)?;
    let token_expires_at: Option<String> = row.get(7)?;

    let agent_id: AgentId = agent_id
        .parse()
        .map_err(|_| invalid_column(0, "agent_id uuid"))?;
    let config: serde_json::Value = serde_json::from_str(&config)?;
    let credentials: TokenCredentials = serde_json::from_str(&credentials)?;
    let disabled_actions: BTreeSet<String> = serde_json::from_str(&disabled_actions)?;
    let auth_status =
        AuthStatus::parse(&auth_status).ok_or_else(|| invalid_column(6, "auth_status"))?;
    let token_expires_at = match token_expires_at {
        Some(text) => Some(
            DateTime::parse_from_rfc3339(&text)
                .map_err(|_| invalid_column(7, "token_expires_at"))?
                .with_timezone(&Utc),
        ),
        None => None,
    };

    Ok(AgentToolBinding {
        agent_id,
        tool_name,
        config,
        credentials,
        disabled_actions,
        enabled,
        auth_status,
        token_expires_at,
    })
}

fn invalid_column(index: usize, what: &str) -> Error {
    Error::Database(rusqlite::Error::InvalidColumnType(
        index,
        what.to_string(),
        rusqlite::types::Type::Text,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> BindingStore {
        BindingStore::in_memory().unwrap()
    }

    #[test]
    fn connect_read_roundtrip() {
        let store = store();
        let agent = AgentId::new();
        let created = store
            .connect_tool(agent, "calendar", json!({ "calendar_id": "team" }))
            .unwrap();

        let read = store.read_binding(agent, "calendar").unwrap().unwrap();
        assert_eq!(read.tool_name, created.tool_name);
        assert_eq!(read.config, json!({ "calendar_id": "team" }));
        assert_eq!(read.auth_status, AuthStatus::NotAuthenticated);
        assert!(read.enabled);
        assert!(read.token_expires_at.is_none());
    }

    #[test]
    fn connecting_twice_fails() {
        let store = store();
        let agent = AgentId::new();
        store.connect_tool(agent, "calendar", json!({})).unwrap();
        assert!(matches!(
            store.connect_tool(agent, "calendar", json!({})),
            Err(Error::AlreadyConnected { .. })
        ));
    }

    #[test]
    fn write_overwrites_whole_row() {
        let store = store();
        let agent = AgentId::new();
        let mut binding = store.connect_tool(agent, "calendar", json!({})).unwrap();

        binding.auth_status = AuthStatus::Authenticated;
        binding.credentials.access_token = Some("tok".into());
        binding.token_expires_at = Some(Utc::now() + Duration::hours(1));
        binding.disabled_actions.insert("create_event".into());
        store.write_binding(&binding).unwrap();

        let read = store.read_binding(agent, "calendar").unwrap().unwrap();
        assert_eq!(read.auth_status, AuthStatus::Authenticated);
        assert_eq!(read.credentials.access_token.as_deref(), Some("tok"));
        assert!(read.disabled_actions.contains("create_event"));
    }

    #[test]
    fn write_missing_binding_fails() {
        let store = store();
        let binding = AgentToolBinding::new(AgentId::new(), "calendar", json!({}));
        assert!(matches!(
            store.write_binding(&binding),
            Err(Error::BindingNotFound { .. })
        ));
    }

    #[test]
    fn disconnect_removes_binding() {
        let store = store();
        let agent = AgentId::new();
        store.connect_tool(agent, "calendar", json!({})).unwrap();
        store.disconnect_tool(agent, "calendar").unwrap();
        assert!(store.read_binding(agent, "calendar").unwrap().is_none());
    }

    #[test]
    fn refresh_query_selects_expiring_authenticated_bindings() {
        let store = store();
        let agent = AgentId::new();

        // Expiring soon: selected.
        let mut due = store.connect_tool(agent, "calendar", json!({})).unwrap();
        due.auth_status = AuthStatus::Authenticated;
        due.token_expires_at = Some(Utc::now() + Duration::minutes(2));
        store.write_binding(&due).unwrap();

        // Far from expiry: not selected.
        let mut fresh = store.connect_tool(agent, "mail", json!({})).unwrap();
        fresh.auth_status = AuthStatus::Authenticated;
        fresh.token_expires_at = Some(Utc::now() + Duration::hours(2));
        store.write_binding(&fresh).unwrap();

        // Never authenticated: not selected even with an expiry set.
        let mut unauth = store.connect_tool(agent, "messaging", json!({})).unwrap();
        unauth.token_expires_at = Some(Utc::now() - Duration::minutes(1));
        store.write_binding(&unauth).unwrap();

        let candidates = store.list_requiring_refresh(Duration::minutes(5)).unwrap();
        let names: Vec<_> = candidates.iter().map(|b| b.tool_name.as_str()).collect();
        assert_eq!(names, vec!["calendar"]);
    }

    #[test]
    fn refresh_query_includes_already_expired() {
        let store = store();
        let agent = AgentId::new();
        let mut stale = store.connect_tool(agent, "calendar", json!({})).unwrap();
        stale.auth_status = AuthStatus::Expired;
        stale.token_expires_at = Some(Utc::now() - Duration::hours(3));
        store.write_binding(&stale).unwrap();

        let candidates = store.list_requiring_refresh(Duration::minutes(5)).unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn disabled_bindings_are_not_refresh_candidates() {
        let store = store();
        let agent = AgentId::new();
        let mut binding = store.connect_tool(agent, "calendar", json!({})).unwrap();
        binding.auth_status = AuthStatus::Authenticated;
        binding.token_expires_at = Some(Utc::now() - Duration::minutes(1));
        binding.enabled = false;
        store.write_binding(&binding).unwrap();

        assert!(store
            .list_requiring_refresh(Duration::minutes(5))
            .unwrap()
            .is_empty());
    }
}
