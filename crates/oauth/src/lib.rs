//! OAuth credential lifecycle: acquisition, background refresh, expiry.
//!
//! Three pieces, all table-driven so that supporting a new provider is a
//! data change rather than new branches at call sites:
//!
//! - [`CredentialResolver`] maps a provider identifier to the client
//!   credential triple (`client_id`, `client_secret`, `redirect_uri`) from
//!   process configuration, with a [`CredentialResolver::validate`]
//!   pre-flight that names missing variables.
//! - [`AuthFlow`] drives the authorization-code grant: build the URL the
//!   operator visits (with per-provider extra parameters from the
//!   [`providers`] table), then exchange the returned code and store the
//!   token pair on the binding.
//! - [`RefreshManager`] is the unattended background refresher. It never
//!   runs on a call's request path, contains failures per binding, and
//!   guards each binding against concurrent refresh attempts.
//!
//! The actual HTTP exchange sits behind the [`TokenEndpoint`] trait so the
//! lifecycle logic is testable without a network.

mod credentials;
mod endpoint;
mod error;
mod flow;
pub mod providers;
mod refresh;

pub use credentials::{CredentialResolver, Credentials, ProviderEntry};
pub use endpoint::{HttpTokenEndpoint, TokenEndpoint, TokenResponse};
pub use error::{Error, Result};
pub use flow::AuthFlow;
pub use refresh::{RefreshManager, RefreshPolicy};
