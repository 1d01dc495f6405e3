//! Tool registry: declarative specs plus handler lookup.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use thiserror::Error;

use crate::llm::{FunctionDefinition, ToolDefinition};

use super::ToolHandler;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),
}

/// Declared type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamKind {
    fn json_type(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }

    /// Whether a JSON value satisfies this kind.
    pub(super) fn accepts(self, value: &serde_json::Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Number => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

impl ParamSpec {
    #[must_use]
    pub fn required(kind: ParamKind, description: &'static str) -> Self {
        Self {
            kind,
            required: true,
            description,
        }
    }

    #[must_use]
    pub fn optional(kind: ParamKind, description: &'static str) -> Self {
        Self {
            kind,
            required: false,
            description,
        }
    }
}

/// Whether a tool only reads state or commits something irreversible.
///
/// Read-only tools may run concurrently and be retried; mutating tools are
/// serialized, gated behind user confirmation, and never retried blindly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    ReadOnly,
    Mutating,
}

/// One registered tool: schema for the model, handler for the dispatcher.
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: BTreeMap<&'static str, ParamSpec>,
    pub effect: SideEffect,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolSpec {
    /// Render the JSON-schema function definition advertised to the model.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .params
            .iter()
            .map(|(name, spec)| {
                (
                    (*name).to_string(),
                    serde_json::json!({
                        "type": spec.kind.json_type(),
                        "description": spec.description,
                    }),
                )
            })
            .collect();

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| *name)
            .collect();

        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: self.name.to_string(),
                description: self.description.to_string(),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                })),
            },
        }
    }
}

/// All tools available to the agent, keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, ToolSpec>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique.
    pub fn register(&mut self, spec: ToolSpec) -> Result<(), RegistryError> {
        if self.tools.contains_key(spec.name) {
            return Err(RegistryError::DuplicateTool(spec.name.to_string()));
        }
        self.tools.insert(spec.name, spec);
        Ok(())
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name)
    }

    /// Definitions for the model, sorted by name for a stable prompt.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut specs: Vec<&ToolSpec> = self.tools.values().collect();
        specs.sort_by_key(|s| s.name);
        specs.iter().map(|s| s.definition()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
