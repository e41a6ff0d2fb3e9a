//! SQLite-backed persistence for agent/tool bindings.
//!
//! This crate is the durable collaborator every other component reads and
//! writes through. It owns one table: `bindings`, one row per agent/tool
//! pair, carrying the binding's config, secret credentials, disabled
//! actions, enabled flag, and persisted auth state.
//!
//! # Core concepts
//!
//! ## BindingStore
//!
//! The [`BindingStore`] wraps a SQLite database. All operations are atomic
//! at the single-row level; writes replace the whole row, so two concurrent
//! writers (the refresh task and an operator completing OAuth, say) are
//! last-write-wins rather than producing a blended row.
//!
//! ## AgentToolBinding
//!
//! An [`AgentToolBinding`] associates one agent with one tool. It is created
//! when an operator connects a tool, mutated by configuration edits, OAuth
//! completion, and the token refresher, and deleted on disconnect.
//!
//! ## AuthStatus
//!
//! [`AuthStatus`] is the *only* persisted auth state. Connection status is a
//! pure function of this plus the tool definition and is derived by the
//! runtime crate on every read. It is never written here, so it can never
//! drift from its inputs.

mod binding;
mod error;
mod store;

pub use binding::{AgentId, AgentToolBinding, AuthStatus, TokenCredentials};
pub use error::{Error, Result};
pub use store::BindingStore;
