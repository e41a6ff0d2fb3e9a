//! Tool catalog: definitions, handlers, and the process-wide registry.
//!
//! A *tool* is an externally defined capability exposed to the conversational
//! agent; each tool carries one or more *actions* with fixed parameter lists.
//! This crate owns the metadata types describing tools ([`ToolDefinition`],
//! [`ToolAction`], [`ParamSpec`]), the [`ActionHandler`] trait implemented by
//! the code behind each action, and the [`Catalog`] registry populated once
//! at startup.
//!
//! The catalog is deliberately static: definitions are registered at process
//! start and never mutated, so every other layer (projection, snapshots,
//! adapters) can treat tool metadata as immutable.

pub mod builtins;
mod error;
mod handler;
mod registry;
mod types;

pub use error::{Error, Result};
pub use handler::{ActionContext, ActionError, ActionHandler};
pub use registry::{Catalog, RegisteredTool};
pub use types::{ParamSpec, ParamType, ToolAction, ToolDefinition};
