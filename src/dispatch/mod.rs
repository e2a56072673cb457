//! Step dispatch: action resolution, argument binding and tool invocation.
//!
//! Dispatch never fails. Unknown actions and tool errors are turned into
//! result text so the step still completes.

mod binding;
mod extract;

pub use binding::{Resolution, resolve, resolve_tool};
pub use extract::{CONTEXT_LIMIT_CHARS, context_preview, extract_references, upstream_text};

use crate::planner::PlanStep;
use crate::tools::{Tool, ToolRegistry};
use futures_util::future::join_all;
use serde_json::{Map, Value};

/// Separator between the outputs of a fan-out call.
pub const FAN_OUT_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Clone)]
pub struct Dispatcher {
    registry: ToolRegistry,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn resolve(&self, step: &PlanStep, upstream: &[(String, String)]) -> Resolution {
        resolve(&self.registry, step, upstream)
    }

    /// Run `step` against the dependency results in `upstream` (`dependsOn` order).
    pub async fn dispatch(&self, step: &PlanStep, upstream: &[(String, String)]) -> String {
        match self.resolve(step, upstream) {
            Resolution::Unknown(text) => {
                tracing::warn!(step = %step.id, action = %step.action, "no tool matched action");
                text
            }
            Resolution::PassThrough(text) => {
                tracing::debug!(step = %step.id, "no references upstream, passing results through");
                text
            }
            Resolution::Invoke { tool, calls } => {
                tracing::debug!(
                    step = %step.id,
                    action = %step.action,
                    tool = tool.name(),
                    calls = calls.len(),
                    "dispatching step"
                );
                // Fan-out calls run concurrently; outputs keep reference order.
                let outputs = join_all(
                    calls
                        .iter()
                        .map(|args| invoke(tool.as_ref(), &step.action, args)),
                )
                .await;
                outputs.join(FAN_OUT_SEPARATOR)
            }
        }
    }
}

async fn invoke(tool: &dyn Tool, action: &str, args: &Map<String, Value>) -> String {
    match tool.execute(args).await {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(tool = tool.name(), "tool execution failed: {e}");
            format!("Tool execution failed ({action}): {e}")
        }
    }
}
