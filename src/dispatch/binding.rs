use super::extract::{context_preview, extract_references, upstream_text};
use crate::planner::PlanStep;
use crate::tools::{InputBinding, Tool, ToolRegistry};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// What dispatching a step will do, decided before any tool runs.
pub enum Resolution {
    /// No tool matched; the text is the step result.
    Unknown(String),
    /// A reference-extracting tool found nothing upstream; the upstream text is the result.
    PassThrough(String),
    /// Call `tool` once per argument set, joining the outputs.
    Invoke {
        tool: Arc<dyn Tool>,
        calls: Vec<Map<String, Value>>,
    },
}

impl Resolution {
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            Self::Invoke { tool, .. } => Some(tool.name()),
            _ => None,
        }
    }

    pub fn calls(&self) -> &[Map<String, Value>] {
        match self {
            Self::Invoke { calls, .. } => calls,
            _ => &[],
        }
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(text) => f.debug_tuple("Unknown").field(text).finish(),
            Self::PassThrough(text) => f.debug_tuple("PassThrough").field(text).finish(),
            Self::Invoke { tool, calls } => f
                .debug_struct("Invoke")
                .field("tool", &tool.name())
                .field("calls", calls)
                .finish(),
        }
    }
}

/// Exact name, then fuzzy name, then the agent's default tool.
pub fn resolve_tool(registry: &ToolRegistry, action: &str, agent_id: &str) -> Option<Arc<dyn Tool>> {
    registry
        .get(action)
        .or_else(|| registry.fuzzy_match(action))
        .or_else(|| registry.agent_default(agent_id))
        .cloned()
}

/// Resolve the tool for `step` and bind its arguments from explicit parameters,
/// upstream results or the step description.
pub fn resolve(registry: &ToolRegistry, step: &PlanStep, upstream: &[(String, String)]) -> Resolution {
    let Some(tool) = resolve_tool(registry, &step.action, &step.agent_id) else {
        return Resolution::Unknown(format!(
            "Unknown action: {}. Description: {}",
            step.action, step.description
        ));
    };

    let params: Vec<String> = tool
        .parameter_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let declares = |name: &str| params.iter().any(|p| p == name);

    let mut args: Map<String, Value> = step
        .parameters
        .iter()
        .filter(|(key, _)| declares(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let has_upstream = !upstream.is_empty();
    let upstream = upstream_text(upstream);

    if args.is_empty() && has_upstream {
        match tool.input_binding() {
            InputBinding::References { kind, limit } => {
                let references = extract_references(&upstream, kind, limit);
                if references.is_empty() {
                    return Resolution::PassThrough(upstream);
                }
                if let Some(first) = params.first() {
                    let calls = references
                        .into_iter()
                        .map(|reference| {
                            let mut call = Map::new();
                            call.insert(first.clone(), Value::String(reference));
                            call
                        })
                        .collect();
                    return Resolution::Invoke { tool, calls };
                }
            }
            InputBinding::Generation => {
                if let Some(first) = params.first() {
                    args.insert(first.clone(), Value::String(step.description.clone()));
                }
                if declares("context") {
                    args.insert(
                        "context".to_string(),
                        Value::String(context_preview(&upstream).to_string()),
                    );
                }
            }
            InputBinding::Direct => {}
        }
    }

    if args.is_empty()
        && let Some(first) = params.first()
    {
        args.insert(first.clone(), Value::String(step.description.clone()));
    }

    if has_upstream && declares("context") && !args.contains_key("context") {
        args.insert(
            "context".to_string(),
            Value::String(context_preview(&upstream).to_string()),
        );
    }

    Resolution::Invoke {
        tool,
        calls: vec![args],
    }
}
