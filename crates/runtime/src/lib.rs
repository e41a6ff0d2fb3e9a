//! Capstan runtime: the call-serving side of tool integration.
//!
//! This crate turns stored bindings and catalog metadata into the surface a
//! function-calling model can use during one live conversation:
//!
//! - **Connection status** ([`connection_status`], [`binding_status`]): a
//!   pure function of binding existence, the tool's auth requirement, and
//!   persisted auth state. Derived on every read, never stored.
//! - **Two-tier projection** ([`project_safe`], [`SafeView`]): the
//!   secret-free view for administrative callers. The secret-bearing full
//!   view is crate-private and flows only into snapshots.
//! - **Session snapshots** ([`SnapshotStore`], [`SessionSnapshot`]): a
//!   copy-on-read freeze of the agent's enabled tool surface, keyed by
//!   session id, immune to mid-call configuration edits.
//! - **Function adapters** ([`FunctionAdapter`], [`FunctionSchema`]): per
//!   snapshotted action, a standalone callable whose schema reproduces the
//!   action's exact parameter list and whose invocation forwards resolved
//!   arguments to the bound handler.
//!
//! Each call path runs in its own scope with its own immutable snapshot;
//! calls never contend with each other over tool configuration state.

mod adapter;
mod error;
mod projection;
mod snapshot;
mod status;

pub use adapter::{FunctionAdapter, FunctionSchema, OptionalParam, ParameterSchema, RequiredParam};
pub use error::{Error, Result};
pub use projection::{project_safe, SafeView};
pub use snapshot::{CallOutcome, SessionId, SessionSnapshot, SnapshotStore};
pub use status::{binding_status, connection_status, ConnectionStatus};
