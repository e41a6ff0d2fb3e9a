//! Unattended token refresh.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use catalog::Catalog;
use chrono::Utc;
use storage::{AgentId, AgentToolBinding, AuthStatus, BindingStore};

use crate::credentials::CredentialResolver;
use crate::endpoint::{TokenEndpoint, TokenResponse};
use crate::{Error, Result};

/// Timing policy for the refresh cycle.
#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    /// How often the cycle runs.
    pub interval: Duration,
    /// How long before expiry a token becomes a refresh candidate.
    pub lead_time: chrono::Duration,
    /// Bound on a single refresh attempt.
    pub timeout: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            lead_time: chrono::Duration::minutes(5),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Background token refresher.
///
/// Runs on a fixed interval, fully decoupled from any in-progress call. Each
/// cycle scans for bindings whose token expires within the lead-time window
/// and refreshes them concurrently. A failed refresh marks the binding
/// `Expired` and keeps the stale token so the operator can still identify
/// and re-authenticate it; it never aborts the cycle for other bindings and
/// never escalates to the caller. Bindings that keep failing stay `Expired`
/// indefinitely; nothing is auto-disabled.
pub struct RefreshManager {
    store: Arc<BindingStore>,
    catalog: Arc<Catalog>,
    resolver: CredentialResolver,
    endpoint: Arc<dyn TokenEndpoint>,
    policy: RefreshPolicy,
    /// Bindings with a refresh attempt currently running. Binding-scoped
    /// mutual exclusion: independent bindings refresh independently.
    in_flight: Mutex<HashSet<(AgentId, String)>>,
}

impl RefreshManager {
    pub fn new(
        store: Arc<BindingStore>,
        catalog: Arc<Catalog>,
        resolver: CredentialResolver,
        endpoint: Arc<dyn TokenEndpoint>,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            store,
            catalog,
            resolver,
            endpoint,
            policy,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Run refresh cycles forever. Intended to be spawned as a background
    /// task alongside the call-serving path.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.policy.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }

    /// One refresh cycle: scan for due bindings and refresh them
    /// concurrently.
    pub async fn run_cycle(self: &Arc<Self>) {
        let due = match self.store.list_requiring_refresh(self.policy.lead_time) {
            Ok(due) => due,
            Err(e) => {
                tracing::warn!(error = %e, "refresh scan failed");
                return;
            }
        };
        if due.is_empty() {
            return;
        }
        tracing::debug!(count = due.len(), "refreshing expiring bindings");

        let mut handles = Vec::with_capacity(due.len());
        for binding in due {
            let mgr = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                mgr.refresh_binding(binding).await;
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Refresh one binding. Skips silently when an attempt for the same
    /// binding is already in flight.
    pub async fn refresh_binding(&self, mut binding: AgentToolBinding) {
        let key = (binding.agent_id, binding.tool_name.clone());
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, key) else {
            tracing::debug!(
                agent_id = %binding.agent_id,
                tool = %binding.tool_name,
                "refresh already in flight"
            );
            return;
        };

        let provider = match self.catalog.get(&binding.tool_name) {
            Ok(tool) => match &tool.definition.auth_provider {
                Some(provider) if tool.definition.requires_auth => provider.clone(),
                _ => {
                    tracing::debug!(
                        tool = %binding.tool_name,
                        "tool requires no auth; nothing to refresh"
                    );
                    return;
                }
            },
            Err(e) => {
                tracing::warn!(
                    tool = %binding.tool_name,
                    error = %e,
                    "refresh skipped: tool not in catalog"
                );
                return;
            }
        };

        match self.attempt(&provider, &binding).await {
            Ok(response) => {
                let now = Utc::now();
                binding.token_expires_at = Some(response.expires_at(now));
                binding.credentials.access_token = Some(response.access_token);
                // Providers may rotate the refresh token or omit it; keep
                // the stored one unless a new one arrives.
                if response.refresh_token.is_some() {
                    binding.credentials.refresh_token = response.refresh_token;
                }
                binding.auth_status = AuthStatus::Authenticated;
                if let Err(e) = self.store.write_binding(&binding) {
                    tracing::warn!(
                        agent_id = %binding.agent_id,
                        tool = %binding.tool_name,
                        error = %e,
                        "failed to persist refreshed token"
                    );
                    return;
                }
                tracing::info!(
                    agent_id = %binding.agent_id,
                    tool = %binding.tool_name,
                    provider = %provider,
                    expires_at = %binding.token_expires_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
                    "token refreshed"
                );
            }
            Err(e) => {
                // Keep the stale token pair: the binding stays identifiable
                // for operator re-authentication.
                binding.auth_status = AuthStatus::Expired;
                if let Err(write_err) = self.store.write_binding(&binding) {
                    tracing::warn!(
                        agent_id = %binding.agent_id,
                        tool = %binding.tool_name,
                        error = %write_err,
                        "failed to persist expired status"
                    );
                }
                tracing::warn!(
                    agent_id = %binding.agent_id,
                    tool = %binding.tool_name,
                    provider = %provider,
                    error = %e,
                    "token refresh failed; binding marked expired"
                );
            }
        }
    }

    async fn attempt(&self, provider: &str, binding: &AgentToolBinding) -> Result<TokenResponse> {
        let creds = self.resolver.resolve(provider)?;
        let refresh_token = binding.credentials.refresh_token.as_deref().ok_or_else(|| {
            Error::Authentication {
                provider: provider.to_string(),
                reason: "no refresh token stored".to_string(),
            }
        })?;

        match tokio::time::timeout(
            self.policy.timeout,
            self.endpoint.refresh(provider, &creds, refresh_token),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Network(format!(
                "token refresh timed out after {:?}",
                self.policy.timeout
            ))),
        }
    }
}

/// Removes the binding's in-flight marker when the attempt finishes,
/// whichever way it finishes.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<(AgentId, String)>>,
    key: (AgentId, String),
}

impl<'a> InFlightGuard<'a> {
    fn acquire(
        set: &'a Mutex<HashSet<(AgentId, String)>>,
        key: (AgentId, String),
    ) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());
        inserted.then_some(Self { set, key })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::ProviderEntry;
    use async_trait::async_trait;
    use catalog::builtins;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Endpoint fake: counts refresh calls, optionally failing or stalling.
    struct FakeEndpoint {
        calls: AtomicUsize,
        fail: bool,
        delay: Duration,
    }

    impl FakeEndpoint {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
                delay: Duration::ZERO,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::ok()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::ok()
            }
        }
    }

    #[async_trait]
    impl TokenEndpoint for FakeEndpoint {
        async fn exchange_code(
            &self,
            _provider: &str,
            _creds: &crate::Credentials,
            _code: &str,
        ) -> Result<TokenResponse> {
            unreachable!("refresh tests never exchange codes")
        }

        async fn refresh(
            &self,
            provider: &str,
            _creds: &crate::Credentials,
            _refresh_token: &str,
        ) -> Result<TokenResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(Error::Authentication {
                    provider: provider.to_string(),
                    reason: "invalid_grant".to_string(),
                });
            }
            Ok(TokenResponse {
                access_token: "new-access".into(),
                refresh_token: Some("new-refresh".into()),
                expires_in: Some(3600),
            })
        }
    }

    fn resolver() -> CredentialResolver {
        let mut entries = HashMap::new();
        entries.insert(
            "google".to_string(),
            ProviderEntry {
                client_id: Some("id".into()),
                client_secret: Some("secret".into()),
                redirect_uri: Some("https://example.com/cb".into()),
            },
        );
        CredentialResolver::new(entries)
    }

    fn manager(endpoint: Arc<FakeEndpoint>, timeout: Duration) -> (Arc<RefreshManager>, Arc<BindingStore>) {
        let store = Arc::new(BindingStore::in_memory().unwrap());
        let catalog = Arc::new(builtins::default_catalog().unwrap());
        let policy = RefreshPolicy {
            timeout,
            ..Default::default()
        };
        let mgr = Arc::new(RefreshManager::new(
            Arc::clone(&store),
            catalog,
            resolver(),
            endpoint,
            policy,
        ));
        (mgr, store)
    }

    fn expiring_binding(store: &BindingStore, agent: AgentId) -> AgentToolBinding {
        let mut binding = store.connect_tool(agent, "calendar", json!({})).unwrap();
        binding.auth_status = AuthStatus::Authenticated;
        binding.credentials.access_token = Some("stale-access".into());
        binding.credentials.refresh_token = Some("stale-refresh".into());
        binding.token_expires_at = Some(Utc::now() - chrono::Duration::minutes(1));
        store.write_binding(&binding).unwrap();
        binding
    }

    #[tokio::test]
    async fn cycle_refreshes_expiring_binding() {
        let endpoint = Arc::new(FakeEndpoint::ok());
        let (mgr, store) = manager(Arc::clone(&endpoint), Duration::from_secs(10));
        let agent = AgentId::new();
        expiring_binding(&store, agent);

        mgr.run_cycle().await;

        let binding = store.read_binding(agent, "calendar").unwrap().unwrap();
        assert_eq!(binding.auth_status, AuthStatus::Authenticated);
        assert_eq!(
            binding.credentials.access_token.as_deref(),
            Some("new-access")
        );
        assert!(binding.token_expires_at.unwrap() > Utc::now());
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_refresh_expires_binding_and_keeps_stale_token() {
        let endpoint = Arc::new(FakeEndpoint::failing());
        let (mgr, store) = manager(Arc::clone(&endpoint), Duration::from_secs(10));
        let agent = AgentId::new();
        expiring_binding(&store, agent);

        mgr.run_cycle().await;

        let binding = store.read_binding(agent, "calendar").unwrap().unwrap();
        assert_eq!(binding.auth_status, AuthStatus::Expired);
        assert_eq!(
            binding.credentials.refresh_token.as_deref(),
            Some("stale-refresh")
        );
        assert_eq!(
            binding.credentials.access_token.as_deref(),
            Some("stale-access")
        );
    }

    #[tokio::test]
    async fn timed_out_refresh_is_a_failure() {
        let endpoint = Arc::new(FakeEndpoint::slow(Duration::from_millis(200)));
        let (mgr, store) = manager(Arc::clone(&endpoint), Duration::from_millis(10));
        let agent = AgentId::new();
        expiring_binding(&store, agent);

        mgr.run_cycle().await;

        let binding = store.read_binding(agent, "calendar").unwrap().unwrap();
        assert_eq!(binding.auth_status, AuthStatus::Expired);
    }

    #[tokio::test]
    async fn missing_refresh_token_expires_binding() {
        let endpoint = Arc::new(FakeEndpoint::ok());
        let (mgr, store) = manager(Arc::clone(&endpoint), Duration::from_secs(10));
        let agent = AgentId::new();
        let mut binding = expiring_binding(&store, agent);
        binding.credentials.refresh_token = None;
        store.write_binding(&binding).unwrap();

        mgr.run_cycle().await;

        let binding = store.read_binding(agent, "calendar").unwrap().unwrap();
        assert_eq!(binding.auth_status, AuthStatus::Expired);
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_attempts_on_one_binding_run_once() {
        let endpoint = Arc::new(FakeEndpoint::slow(Duration::from_millis(50)));
        let (mgr, store) = manager(Arc::clone(&endpoint), Duration::from_secs(10));
        let agent = AgentId::new();
        let binding = expiring_binding(&store, agent);

        tokio::join!(
            mgr.refresh_binding(binding.clone()),
            mgr.refresh_binding(binding.clone()),
        );

        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);
        let binding = store.read_binding(agent, "calendar").unwrap().unwrap();
        assert_eq!(binding.auth_status, AuthStatus::Authenticated);
        assert_eq!(
            binding.credentials.access_token.as_deref(),
            Some("new-access")
        );
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_cycle() {
        // Two agents bound to calendar; one binding is missing its refresh
        // token so only that attempt fails.
        let endpoint = Arc::new(FakeEndpoint::ok());
        let store = Arc::new(BindingStore::in_memory().unwrap());
        let catalog = Arc::new(builtins::default_catalog().unwrap());

        let agent_ok = AgentId::new();
        let agent_bad = AgentId::new();
        expiring_binding(&store, agent_ok);
        let mut bad = expiring_binding(&store, agent_bad);
        bad.credentials.refresh_token = None; // forces a per-binding failure
        store.write_binding(&bad).unwrap();

        let mgr = Arc::new(RefreshManager::new(
            Arc::clone(&store),
            catalog,
            resolver(),
            endpoint,
            RefreshPolicy::default(),
        ));
        mgr.run_cycle().await;

        let ok = store.read_binding(agent_ok, "calendar").unwrap().unwrap();
        let bad = store.read_binding(agent_bad, "calendar").unwrap().unwrap();
        assert_eq!(ok.auth_status, AuthStatus::Authenticated);
        assert_eq!(bad.auth_status, AuthStatus::Expired);
    }
}
