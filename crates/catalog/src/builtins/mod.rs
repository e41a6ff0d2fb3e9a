//! Builtin tools.
//!
//! Reference tool implementations registered by the default catalog: a
//! `calendar` tool that requires Google authorization and an unauthenticated
//! `messaging` tool. Deployments register their own tools next to (or
//! instead of) these; the builtins keep the catalog, adapter, and execution
//! paths exercised end to end.

mod calendar;
mod messaging;

pub use calendar::CalendarTool;
pub use messaging::MessagingTool;

use crate::{Catalog, Result};

/// A catalog pre-populated with the builtin tools.
pub fn default_catalog() -> Result<Catalog> {
    let mut catalog = Catalog::new();
    catalog.register(CalendarTool::registered())?;
    catalog.register(MessagingTool::registered())?;
    Ok(catalog)
}
