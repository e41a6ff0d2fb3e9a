//! Process-wide tool registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::handler::ActionHandler;
use crate::types::ToolDefinition;
use crate::{Error, Result};

/// A tool definition paired with the handlers implementing its actions.
pub struct RegisteredTool {
    pub definition: ToolDefinition,
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl RegisteredTool {
    pub fn new(definition: ToolDefinition) -> Self {
        Self {
            definition,
            handlers: HashMap::new(),
        }
    }

    pub fn with_handler(
        mut self,
        action: impl Into<String>,
        handler: Arc<dyn ActionHandler>,
    ) -> Self {
        self.handlers.insert(action.into(), handler);
        self
    }

    /// Handler for one of this tool's actions.
    pub fn handler(&self, action: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(action).cloned()
    }
}

/// Static registry of tool definitions, keyed by name.
///
/// Populated once at process start and read-only thereafter, so it needs no
/// interior locking; share it behind an `Arc`.
#[derive(Default)]
pub struct Catalog {
    tools: HashMap<String, RegisteredTool>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Every declared action must have a handler.
    pub fn register(&mut self, tool: RegisteredTool) -> Result<()> {
        let name = tool.definition.name.clone();
        if self.tools.contains_key(&name) {
            return Err(Error::DuplicateTool(name));
        }
        for action in &tool.definition.actions {
            if !tool.handlers.contains_key(&action.name) {
                return Err(Error::MissingHandler {
                    tool: name.clone(),
                    action: action.name.clone(),
                });
            }
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Look up a registered tool by name.
    pub fn get(&self, name: &str) -> Result<&RegisteredTool> {
        self.tools
            .get(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))
    }

    /// All registered definitions, sorted by name for stable output.
    pub fn list(&self) -> Vec<&ToolDefinition> {
        let mut defs: Vec<_> = self.tools.values().map(|t| &t.definition).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{ActionContext, ActionError};
    use crate::types::ToolAction;
    use async_trait::async_trait;
    use serde_json::{Map, Value};

    struct Nop;

    #[async_trait]
    impl ActionHandler for Nop {
        async fn call(
            &self,
            _ctx: &ActionContext,
            _args: Map<String, Value>,
        ) -> std::result::Result<Value, ActionError> {
            Ok(Value::Null)
        }
    }

    fn tool(name: &str) -> RegisteredTool {
        RegisteredTool::new(
            ToolDefinition::open(name).with_action(ToolAction::new("ping", "Ping")),
        )
        .with_handler("ping", Arc::new(Nop))
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut catalog = Catalog::new();
        catalog.register(tool("a")).unwrap();
        assert!(matches!(
            catalog.register(tool("a")),
            Err(Error::DuplicateTool(_))
        ));
    }

    #[test]
    fn unknown_tool_lookup_fails() {
        let catalog = Catalog::new();
        assert!(matches!(catalog.get("nope"), Err(Error::UnknownTool(_))));
    }

    #[test]
    fn registration_requires_handlers() {
        let mut catalog = Catalog::new();
        let missing = RegisteredTool::new(
            ToolDefinition::open("bare").with_action(ToolAction::new("ping", "Ping")),
        );
        assert!(matches!(
            catalog.register(missing),
            Err(Error::MissingHandler { .. })
        ));
    }

    #[test]
    fn list_is_sorted() {
        let mut catalog = Catalog::new();
        catalog.register(tool("b")).unwrap();
        catalog.register(tool("a")).unwrap();
        let names: Vec<_> = catalog.list().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
