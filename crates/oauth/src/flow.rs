//! Operator-facing authorization flow.

use std::sync::Arc;

use storage::{AgentId, AgentToolBinding, AuthStatus, BindingStore};

use crate::credentials::CredentialResolver;
use crate::endpoint::TokenEndpoint;
use crate::providers;
use crate::{Error, Result};

/// Drives the authorization-code side of the credential lifecycle: building
/// the URL an operator visits, then turning the returned code into stored
/// tokens on the binding.
pub struct AuthFlow {
    resolver: CredentialResolver,
    endpoint: Arc<dyn TokenEndpoint>,
}

impl AuthFlow {
    pub fn new(resolver: CredentialResolver, endpoint: Arc<dyn TokenEndpoint>) -> Self {
        Self { resolver, endpoint }
    }

    /// The URL an operator visits to authorize a provider, carrying the
    /// provider's extra parameters from the endpoint table.
    pub fn authorization_url(&self, provider: &str, state: &str) -> Result<String> {
        let creds = self.resolver.resolve(provider)?;
        let endpoints =
            providers::endpoints(provider).ok_or_else(|| Error::UnsupportedProvider {
                provider: provider.to_string(),
                missing: Vec::new(),
            })?;

        let mut params = vec![
            ("response_type", "code"),
            ("client_id", creds.client_id.as_str()),
            ("redirect_uri", creds.redirect_uri.as_str()),
            ("state", state),
        ];
        params.extend_from_slice(endpoints.extra_auth_params);

        let url = reqwest::Url::parse_with_params(endpoints.auth_url, &params)
            .map_err(|e| Error::InvalidResponse(format!("authorization url: {e}")))?;
        Ok(url.into())
    }

    /// Complete authorization for a binding: exchange the code, store the
    /// token pair, and mark the binding authenticated.
    pub async fn complete(
        &self,
        store: &BindingStore,
        agent_id: AgentId,
        tool_name: &str,
        provider: &str,
        code: &str,
    ) -> Result<AgentToolBinding> {
        let creds = self.resolver.resolve(provider)?;
        let mut binding = store.read_binding(agent_id, tool_name)?.ok_or_else(|| {
            storage::Error::BindingNotFound {
                agent_id: agent_id.to_string(),
                tool_name: tool_name.to_string(),
            }
        })?;

        let response = self.endpoint.exchange_code(provider, &creds, code).await?;

        let now = chrono::Utc::now();
        binding.token_expires_at = Some(response.expires_at(now));
        binding.credentials.access_token = Some(response.access_token);
        if response.refresh_token.is_some() {
            binding.credentials.refresh_token = response.refresh_token;
        }
        binding.auth_status = AuthStatus::Authenticated;
        store.write_binding(&binding)?;

        tracing::info!(
            agent_id = %agent_id,
            tool = tool_name,
            provider,
            "authorization completed"
        );
        Ok(binding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::ProviderEntry;
    use crate::endpoint::TokenResponse;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StaticEndpoint;

    #[async_trait]
    impl TokenEndpoint for StaticEndpoint {
        async fn exchange_code(
            &self,
            _provider: &str,
            _creds: &crate::Credentials,
            _code: &str,
        ) -> Result<TokenResponse> {
            Ok(TokenResponse {
                access_token: "access".into(),
                refresh_token: Some("refresh".into()),
                expires_in: Some(3600),
            })
        }

        async fn refresh(
            &self,
            _provider: &str,
            _creds: &crate::Credentials,
            _refresh_token: &str,
        ) -> Result<TokenResponse> {
            unreachable!("flow tests never refresh")
        }
    }

    fn flow() -> AuthFlow {
        let mut entries = HashMap::new();
        entries.insert(
            "google".to_string(),
            ProviderEntry {
                client_id: Some("id".into()),
                client_secret: Some("secret".into()),
                redirect_uri: Some("https://example.com/cb".into()),
            },
        );
        AuthFlow::new(CredentialResolver::new(entries), Arc::new(StaticEndpoint))
    }

    #[test]
    fn authorization_url_carries_provider_extras() {
        let url = flow().authorization_url("google", "xyz").unwrap();
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=id"));
        assert!(url.contains("state=xyz"));
        assert!(url.contains("access_type=offline"));
    }

    #[tokio::test]
    async fn complete_marks_binding_authenticated() {
        let store = BindingStore::in_memory().unwrap();
        let agent = AgentId::new();
        store
            .connect_tool(agent, "calendar", serde_json::json!({}))
            .unwrap();

        let binding = flow()
            .complete(&store, agent, "calendar", "google", "the-code")
            .await
            .unwrap();

        assert_eq!(binding.auth_status, AuthStatus::Authenticated);
        assert_eq!(binding.credentials.access_token.as_deref(), Some("access"));
        assert_eq!(
            binding.credentials.refresh_token.as_deref(),
            Some("refresh")
        );
        assert!(binding.token_expires_at.is_some());
    }

    #[tokio::test]
    async fn complete_without_binding_fails() {
        let store = BindingStore::in_memory().unwrap();
        let err = flow()
            .complete(&store, AgentId::new(), "calendar", "google", "c")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }
}
