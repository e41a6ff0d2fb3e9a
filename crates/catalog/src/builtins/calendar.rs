//! Calendar tool (Google-authorized).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::handler::{ActionContext, ActionError, ActionHandler};
use crate::registry::RegisteredTool;
use crate::types::{ParamSpec, ParamType, ToolAction, ToolDefinition};

/// Reads and writes events on the calendar named by the binding's config.
pub struct CalendarTool;

impl CalendarTool {
    pub fn definition() -> ToolDefinition {
        ToolDefinition::authorized("calendar", "google")
            .with_action(
                ToolAction::new("list_events", "List upcoming calendar events")
                    .with_param(ParamSpec::optional(
                        "time_min",
                        ParamType::String,
                        Value::Null,
                    ))
                    .with_param(ParamSpec::optional(
                        "max_results",
                        ParamType::Integer,
                        json!(10),
                    )),
            )
            .with_action(
                ToolAction::new("create_event", "Create a calendar event")
                    .with_param(ParamSpec::required("title", ParamType::String))
                    .with_param(ParamSpec::required("start", ParamType::String))
                    .with_param(ParamSpec::required("end", ParamType::String))
                    .with_param(ParamSpec::optional(
                        "attendees",
                        ParamType::Array,
                        json!([]),
                    )),
            )
    }

    pub fn registered() -> RegisteredTool {
        RegisteredTool::new(Self::definition())
            .with_handler("list_events", Arc::new(ListEvents))
            .with_handler("create_event", Arc::new(CreateEvent))
    }
}

/// The access token frozen into the session's context, or an auth error.
fn access_token(ctx: &ActionContext) -> Result<&str, ActionError> {
    ctx.credentials
        .get("access_token")
        .and_then(Value::as_str)
        .ok_or_else(|| ActionError::Execution("no access token for calendar".into()))
}

fn calendar_id(ctx: &ActionContext) -> &str {
    ctx.config
        .get("calendar_id")
        .and_then(Value::as_str)
        .unwrap_or("primary")
}

struct ListEvents;

#[async_trait]
impl ActionHandler for ListEvents {
    async fn call(
        &self,
        ctx: &ActionContext,
        args: Map<String, Value>,
    ) -> Result<Value, ActionError> {
        access_token(ctx)?;
        let max = args.get("max_results").and_then(Value::as_u64).unwrap_or(10);
        Ok(json!({
            "calendar_id": calendar_id(ctx),
            "time_min": args.get("time_min").cloned().unwrap_or(Value::Null),
            "max_results": max,
            "events": [],
        }))
    }
}

struct CreateEvent;

#[async_trait]
impl ActionHandler for CreateEvent {
    async fn call(
        &self,
        ctx: &ActionContext,
        args: Map<String, Value>,
    ) -> Result<Value, ActionError> {
        access_token(ctx)?;
        let title = args
            .get("title")
            .and_then(Value::as_str)
            .ok_or_else(|| ActionError::InvalidInput("title must be a string".into()))?;

        Ok(json!({
            "status": "created",
            "calendar_id": calendar_id(ctx),
            "title": title,
            "start": args.get("start").cloned().unwrap_or(Value::Null),
            "end": args.get("end").cloned().unwrap_or(Value::Null),
            "attendees": args.get("attendees").cloned().unwrap_or(json!([])),
        }))
    }
}
