//! Credential resolver.

use std::collections::HashMap;

use serde::Deserialize;

use crate::providers;
use crate::{Error, Result};

/// A complete client credential triple for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// A possibly-incomplete configuration entry for one provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderEntry {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
}

impl ProviderEntry {
    /// Names of the configuration variables still missing for `provider`.
    fn missing(&self, provider: &str) -> Vec<String> {
        let prefix = provider.to_uppercase();
        let mut missing = Vec::new();
        if self.client_id.is_none() {
            missing.push(format!("{prefix}_CLIENT_ID"));
        }
        if self.client_secret.is_none() {
            missing.push(format!("{prefix}_CLIENT_SECRET"));
        }
        if self.redirect_uri.is_none() {
            missing.push(format!("{prefix}_REDIRECT_URI"));
        }
        missing
    }
}

/// Maps a provider identifier to its client credentials.
///
/// A lookup table, not a chain of provider branches: entries come from
/// process configuration (with environment fallback per field), and callers
/// ask for a provider by name.
#[derive(Debug, Clone, Default)]
pub struct CredentialResolver {
    entries: HashMap<String, ProviderEntry>,
}

impl CredentialResolver {
    /// Build a resolver from configuration entries, filling any missing
    /// field from `<PROVIDER>_CLIENT_ID` / `_CLIENT_SECRET` /
    /// `_REDIRECT_URI` environment variables.
    pub fn new(mut entries: HashMap<String, ProviderEntry>) -> Self {
        for provider in providers::supported() {
            let entry = entries.entry(provider.to_string()).or_default();
            let prefix = provider.to_uppercase();
            fill_from_env(&mut entry.client_id, &format!("{prefix}_CLIENT_ID"));
            fill_from_env(&mut entry.client_secret, &format!("{prefix}_CLIENT_SECRET"));
            fill_from_env(&mut entry.redirect_uri, &format!("{prefix}_REDIRECT_URI"));
        }
        Self { entries }
    }

    /// A resolver configured purely from the environment.
    pub fn from_env() -> Self {
        Self::new(HashMap::new())
    }

    /// Resolve a provider's credentials, failing with the list of missing
    /// configuration variables when incomplete or unknown.
    pub fn resolve(&self, provider: &str) -> Result<Credentials> {
        let entry = self
            .entries
            .get(provider)
            .ok_or_else(|| Error::UnsupportedProvider {
                provider: provider.to_string(),
                missing: ProviderEntry::default().missing(provider),
            })?;

        match (&entry.client_id, &entry.client_secret, &entry.redirect_uri) {
            (Some(id), Some(secret), Some(uri)) => Ok(Credentials {
                client_id: id.clone(),
                client_secret: secret.clone(),
                redirect_uri: uri.clone(),
            }),
            _ => Err(Error::UnsupportedProvider {
                provider: provider.to_string(),
                missing: entry.missing(provider),
            }),
        }
    }

    /// Pre-flight check: is this provider fully configured, and if not,
    /// which variables are missing?
    pub fn validate(&self, provider: &str) -> (bool, Vec<String>) {
        match self.resolve(provider) {
            Ok(_) => (true, Vec::new()),
            Err(Error::UnsupportedProvider { missing, .. }) => (false, missing),
            Err(_) => (false, Vec::new()),
        }
    }
}

fn fill_from_env(field: &mut Option<String>, var: &str) {
    if field.is_none()
        && let Ok(value) = std::env::var(var)
        && !value.is_empty()
    {
        *field = Some(value);
    }
}
