//! Token endpoint client.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::credentials::Credentials;
use crate::providers;
use crate::{Error, Result};

/// Lifetime assumed when a provider omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// A token pair returned by a provider's token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    /// Absolute expiry computed from `expires_in`.
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::seconds(self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS))
    }
}

/// The provider token endpoint, as a seam so the refresh path can be tested
/// without network access.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange an authorization code for a token pair.
    async fn exchange_code(
        &self,
        provider: &str,
        creds: &Credentials,
        code: &str,
    ) -> Result<TokenResponse>;

    /// Exchange a refresh token for a new token pair.
    async fn refresh(
        &self,
        provider: &str,
        creds: &Credentials,
        refresh_token: &str,
    ) -> Result<TokenResponse>;
}

/// reqwest-backed token endpoint.
pub struct HttpTokenEndpoint {
    client: reqwest::Client,
}

impl HttpTokenEndpoint {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn post_form(
        &self,
        provider: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse> {
        let endpoints =
            providers::endpoints(provider).ok_or_else(|| Error::UnsupportedProvider {
                provider: provider.to_string(),
                missing: Vec::new(),
            })?;

        let response = self
            .client
            .post(endpoints.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                provider: provider.to_string(),
                reason: format!("{status}: {body}"),
            });
        }

        response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

impl Default for HttpTokenEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
    async fn exchange_code(
        &self,
        provider: &str,
        creds: &Credentials,
        code: &str,
    ) -> Result<TokenResponse> {
        self.post_form(
            provider,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &creds.redirect_uri),
                ("client_id", &creds.client_id),
                ("client_secret", &creds.client_secret),
            ],
        )
        .await
    }

    async fn refresh(
        &self,
        provider: &str,
        creds: &Credentials,
        refresh_token: &str,
    ) -> Result<TokenResponse> {
        self.post_form(
            provider,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &creds.client_id),
                ("client_secret", &creds.client_secret),
            ],
        )
        .await
    }
}
