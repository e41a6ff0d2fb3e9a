//! Messaging tool (no authorization required).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::handler::{ActionContext, ActionError, ActionHandler};
use crate::registry::RegisteredTool;
use crate::types::{ParamSpec, ParamType, ToolAction, ToolDefinition};

/// Sends messages through the deployment's messaging backend.
pub struct MessagingTool;

impl MessagingTool {
    pub fn definition() -> ToolDefinition {
        ToolDefinition::open("messaging")
            .with_action(
                ToolAction::new("send_message", "Send a message to a recipient")
                    .with_param(ParamSpec::required("to", ParamType::String))
                    .with_param(ParamSpec::required("body", ParamType::String))
                    .with_param(ParamSpec::optional("cc", ParamType::String, Value::Null)),
            )
            .with_action(
                ToolAction::new("list_channels", "List available channels")
                    .with_param(ParamSpec::optional("limit", ParamType::Integer, json!(20))),
            )
    }

    pub fn registered() -> RegisteredTool {
        RegisteredTool::new(Self::definition())
            .with_handler("send_message", Arc::new(SendMessage))
            .with_handler("list_channels", Arc::new(ListChannels))
    }
}

struct SendMessage;

#[async_trait]
impl ActionHandler for SendMessage {
    async fn call(
        &self,
        _ctx: &ActionContext,
        args: Map<String, Value>,
    ) -> Result<Value, ActionError> {
        let to = args
            .get("to")
            .and_then(Value::as_str)
            .ok_or_else(|| ActionError::InvalidInput("to must be a string".into()))?;
        if to.is_empty() {
            return Err(ActionError::InvalidInput("to must not be empty".into()));
        }

        Ok(json!({
            "status": "queued",
            "to": to,
            "cc": args.get("cc").cloned().unwrap_or(Value::Null),
        }))
    }
}

struct ListChannels;

#[async_trait]
impl ActionHandler for ListChannels {
    async fn call(
        &self,
        _ctx: &ActionContext,
        args: Map<String, Value>,
    ) -> Result<Value, ActionError> {
        let limit = args.get("limit").and_then(Value::as_u64).unwrap_or(20) as usize;
        let channels = ["general", "support", "sales"];
        Ok(json!({
            "channels": channels.iter().take(limit).collect::<Vec<_>>(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_message_echoes_recipients() {
        let mut args = Map::new();
        args.insert("to".into(), json!("ops@example.com"));
        args.insert("body".into(), json!("hello"));
        args.insert("cc".into(), Value::Null);

        let out = SendMessage
            .call(&ActionContext::default(), args)
            .await
            .unwrap();
        assert_eq!(out["status"], "queued");
        assert_eq!(out["to"], "ops@example.com");
        assert_eq!(out["cc"], Value::Null);
    }

    #[tokio::test]
    async fn send_message_rejects_empty_recipient() {
        let mut args = Map::new();
        args.insert("to".into(), json!(""));
        args.insert("body".into(), json!("hello"));

        let err = SendMessage
            .call(&ActionContext::default(), args)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::InvalidInput(_)));
    }
}
