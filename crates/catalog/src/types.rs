//! Tool metadata types.
//!
//! These describe what a tool can do (its actions and their exact parameter
//! lists) independently of any agent binding. They are derived once when a
//! tool implementation is registered and never mutated afterwards. The
//! adapter layer reproduces parameter lists from this metadata, so the
//! `ParamSpec` here is the single source of truth for the model-facing
//! schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared type of a single action parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    /// Whether a JSON value is an instance of this type.
    ///
    /// Integers are accepted where numbers are declared, but not the
    /// reverse.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        };
        write!(f, "{name}")
    }
}

/// One parameter of an action.
///
/// Required parameters carry no default; optional parameters always carry
/// one (possibly `null`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    /// A required parameter.
    pub fn required(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            default: None,
        }
    }

    /// An optional parameter with a default value.
    pub fn optional(name: impl Into<String>, ty: ParamType, default: Value) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            default: Some(default),
        }
    }
}

/// One callable operation belonging to a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolAction {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

impl ToolAction {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.parameters.push(param);
        self
    }
}

/// A tool definition: its name, auth requirements, and actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub requires_auth: bool,
    /// OAuth provider identifier, set iff `requires_auth`.
    pub auth_provider: Option<String>,
    pub actions: Vec<ToolAction>,
}

impl ToolDefinition {
    /// A tool that needs no authorization.
    pub fn open(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires_auth: false,
            auth_provider: None,
            actions: Vec::new(),
        }
    }

    /// A tool whose bindings must be authorized against `provider`.
    pub fn authorized(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires_auth: true,
            auth_provider: Some(provider.into()),
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: ToolAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Find an action by name.
    pub fn action(&self, name: &str) -> Option<&ToolAction> {
        self.actions.iter().find(|a| a.name == name)
    }
}
