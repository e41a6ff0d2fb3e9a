//! Function adapters.
//!
//! An adapter is the standalone callable the model runtime introspects and
//! invokes: it reproduces one action's exact parameter list (same names,
//! same required/optional split, same declared types and defaults) without
//! the tool instance, and forwards every received argument to the bound
//! handler at call time.
//!
//! Reproduction is validated when the adapter is *built* (at session start),
//! so a parameter list that cannot be represented fails fast with
//! [`Error::SchemaMismatch`] instead of exposing a silently wrong schema to
//! the model mid-call.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use catalog::{ActionContext, ActionError, ActionHandler, ParamType, ToolAction};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{Error, Result};

/// The function-calling schema exposed to the model runtime.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

/// Required and optional parameter lists, with defaults on the optionals.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParameterSchema {
    pub required: Vec<RequiredParam>,
    pub optional: Vec<OptionalParam>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequiredParam {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionalParam {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub default: Value,
}

/// A snapshotted action bound to its handler and frozen context.
pub struct FunctionAdapter {
    schema: FunctionSchema,
    action: ToolAction,
    ctx: ActionContext,
    handler: Arc<dyn ActionHandler>,
}

impl FunctionAdapter {
    /// Build an adapter for one action.
    ///
    /// Fails with [`Error::SchemaMismatch`] when the declared parameter list
    /// cannot be reproduced faithfully: duplicate names, a required
    /// parameter carrying a default, an optional parameter missing one, or
    /// a default that is neither `null` nor of the declared type.
    pub fn build(
        tool_name: &str,
        action: &ToolAction,
        ctx: ActionContext,
        handler: Arc<dyn ActionHandler>,
    ) -> Result<Self> {
        let qualified = format!("{tool_name}.{}", action.name);
        let mismatch = |reason: String| Error::SchemaMismatch {
            action: qualified.clone(),
            reason,
        };

        let mut seen = HashSet::new();
        let mut parameters = ParameterSchema::default();

        for param in &action.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(mismatch(format!("duplicate parameter {}", param.name)));
            }
            match (param.required, &param.default) {
                (true, Some(_)) => {
                    return Err(mismatch(format!(
                        "required parameter {} carries a default",
                        param.name
                    )));
                }
                (true, None) => parameters.required.push(RequiredParam {
                    name: param.name.clone(),
                    ty: param.ty,
                }),
                (false, None) => {
                    return Err(mismatch(format!(
                        "optional parameter {} has no default",
                        param.name
                    )));
                }
                (false, Some(default)) => {
                    if !default.is_null() && !param.ty.matches(default) {
                        return Err(mismatch(format!(
                            "default for {} is not a {}",
                            param.name, param.ty
                        )));
                    }
                    parameters.optional.push(OptionalParam {
                        name: param.name.clone(),
                        ty: param.ty,
                        default: default.clone(),
                    });
                }
            }
        }

        Ok(Self {
            schema: FunctionSchema {
                name: qualified,
                description: action.description.clone(),
                parameters,
            },
            action: action.clone(),
            ctx,
            handler,
        })
    }

    /// The introspectable schema for this adapter.
    pub fn schema(&self) -> &FunctionSchema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    /// Invoke the bound action with the runtime's argument map.
    ///
    /// Arguments are resolved by name against the reproduced signature:
    /// required parameters must be present with the declared type, optional
    /// parameters fall back to their defaults, unknown arguments are
    /// rejected. The resolved map is then forwarded to the handler under
    /// `timeout`.
    pub async fn invoke(&self, args: Map<String, Value>, timeout: Duration) -> Result<Value> {
        let resolved = self.resolve_args(args)?;
        match tokio::time::timeout(timeout, self.handler.call(&self.ctx, resolved)).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(ActionError::InvalidInput(reason))) => Err(Error::InvalidArguments(reason)),
            Ok(Err(ActionError::Execution(reason))) => Err(Error::Execution(reason)),
            Err(_) => Err(Error::Execution(format!(
                "{} timed out after {timeout:?}",
                self.schema.name
            ))),
        }
    }

    fn resolve_args(&self, args: Map<String, Value>) -> Result<Map<String, Value>> {
        for key in args.keys() {
            if self.action.parameters.iter().all(|p| p.name != *key) {
                return Err(Error::InvalidArguments(format!(
                    "unknown argument {key} for {}",
                    self.schema.name
                )));
            }
        }

        let mut resolved = Map::with_capacity(self.action.parameters.len());
        for param in &self.action.parameters {
            match args.get(&param.name) {
                Some(value) => {
                    let null_ok = !param.required
                        && value.is_null()
                        && param.default.as_ref().is_some_and(Value::is_null);
                    if !null_ok && !param.ty.matches(value) {
                        return Err(Error::InvalidArguments(format!(
                            "argument {} must be a {}",
                            param.name, param.ty
                        )));
                    }
                    resolved.insert(param.name.clone(), value.clone());
                }
                None if param.required => {
                    return Err(Error::InvalidArguments(format!(
                        "missing required argument {}",
                        param.name
                    )));
                }
                None => {
                    // Optional parameters always carry a default; build()
                    // enforced that.
                    if let Some(default) = &param.default {
                        resolved.insert(param.name.clone(), default.clone());
                    }
                }
            }
        }
        Ok(resolved)
    }
}

impl std::fmt::Debug for FunctionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionAdapter")
            .field("name", &self.schema.name)
            .field("required", &self.schema.parameters.required.len())
            .field("optional", &self.schema.parameters.optional.len())
            .finish()
    }
}
