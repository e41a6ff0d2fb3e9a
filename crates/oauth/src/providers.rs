//! Provider endpoint table.
//!
//! One entry per supported OAuth provider: its endpoints and any extra
//! authorization parameters the provider wants (e.g. Google's offline
//! access). Adding a provider means adding a row here and supplying its
//! credentials in configuration, with no call site changes.

/// Endpoints and quirks of one OAuth provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderEndpoints {
    pub name: &'static str,
    pub auth_url: &'static str,
    pub token_url: &'static str,
    /// Extra query parameters attached to the authorization URL.
    pub extra_auth_params: &'static [(&'static str, &'static str)],
}

const PROVIDERS: &[ProviderEndpoints] = &[
    ProviderEndpoints {
        name: "google",
        auth_url: "https://accounts.google.com/o/oauth2/v2/auth",
        token_url: "https://oauth2.googleapis.com/token",
        // Offline access is what yields a refresh token.
        extra_auth_params: &[("access_type", "offline"), ("prompt", "consent")],
    },
    ProviderEndpoints {
        name: "microsoft",
        auth_url: "https://login.microsoftonline.com/common/oauth2/v2.0/authorize",
        token_url: "https://login.microsoftonline.com/common/oauth2/v2.0/token",
        extra_auth_params: &[],
    },
    ProviderEndpoints {
        name: "slack",
        auth_url: "https://slack.com/oauth/v2/authorize",
        token_url: "https://slack.com/api/oauth.v2.access",
        extra_auth_params: &[],
    },
];

/// Look up a provider's endpoints by name.
pub fn endpoints(provider: &str) -> Option<&'static ProviderEndpoints> {
    PROVIDERS.iter().find(|p| p.name == provider)
}

/// Names of all supported providers.
pub fn supported() -> impl Iterator<Item = &'static str> {
    PROVIDERS.iter().map(|p| p.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_providers_resolve() {
        assert!(endpoints("google").is_some());
        assert!(endpoints("microsoft").is_some());
        assert!(endpoints("github").is_none());
    }

    #[test]
    fn google_requests_offline_access() {
        let google = endpoints("google").unwrap();
        assert!(google
            .extra_auth_params
            .contains(&("access_type", "offline")));
    }
}
