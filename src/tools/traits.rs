use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of reference a fan-out tool looks for in upstream results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// `http(s)://arxiv.org/abs/{id}` links.
    ArxivUrl,
    /// `**Title**` markers as emitted by search tools.
    BoldTitle,
}

/// How a step with no explicit parameters gets its input from upstream results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputBinding {
    /// First parameter gets the step description.
    #[default]
    Direct,
    /// Call once per reference found upstream, bound to the first parameter.
    References {
        kind: ReferenceKind,
        limit: Option<usize>,
    },
    /// First parameter gets the description, `context` gets the upstream text.
    Generation,
}

/// Description of a tool for planners and the agents endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<String>,
}

/// Core tool trait: a named `(parameters) -> text` capability
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name, matched against step actions
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Declared parameter names, in binding order
    fn parameter_names(&self) -> Vec<&str>;

    fn input_binding(&self) -> InputBinding {
        InputBinding::Direct
    }

    async fn execute(&self, args: &Map<String, Value>) -> anyhow::Result<String>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self
                .parameter_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Render a parameter value as plain text; strings are taken verbatim.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn required_arg(args: &Map<String, Value>, tool: &str, name: &str) -> Result<String, ToolError> {
    args.get(name)
        .map(value_text)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ToolError::MissingParameter {
            name: tool.to_string(),
            parameter: name.to_string(),
        })
}

pub fn optional_arg(args: &Map<String, Value>, name: &str) -> Option<String> {
    args.get(name).map(value_text).filter(|s| !s.is_empty())
}
