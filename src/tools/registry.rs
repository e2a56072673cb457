use super::traits::{Tool, ToolSpec};
use std::collections::HashMap;
use std::sync::Arc;

/// Ordered tool table plus the per-agent fallback tools.
///
/// Registration order matters: fuzzy action matching picks the first
/// registered tool whose name contains the normalized action.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    agent_defaults: HashMap<String, String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Replaces any existing tool with the same name in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        match self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
    }

    #[must_use]
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn set_agent_default(&mut self, agent_id: impl Into<String>, tool_name: impl Into<String>) {
        self.agent_defaults.insert(agent_id.into(), tool_name.into());
    }

    #[must_use]
    pub fn with_agent_default(
        mut self,
        agent_id: impl Into<String>,
        tool_name: impl Into<String>,
    ) -> Self {
        self.set_agent_default(agent_id, tool_name);
        self
    }

    pub fn extend_agent_defaults(&mut self, defaults: HashMap<String, String>) {
        self.agent_defaults.extend(defaults);
    }

    /// Exact lookup by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// First tool whose name contains `action` after normalization
    /// (spaces to underscores, lowercase). Empty actions never match.
    pub fn fuzzy_match(&self, action: &str) -> Option<&Arc<dyn Tool>> {
        let normalized = normalize_action(action);
        if normalized.is_empty() {
            return None;
        }
        self.tools.iter().find(|t| t.name().contains(&normalized))
    }

    /// Fallback tool for an agent type, if the agent has one and it is registered.
    pub fn agent_default(&self, agent_id: &str) -> Option<&Arc<dyn Tool>> {
        self.agent_defaults
            .get(agent_id)
            .and_then(|name| self.get(name))
    }

    /// Registered tool names, in registration order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|tool| tool.spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

pub fn normalize_action(action: &str) -> String {
    action.replace(' ', "_").to_lowercase()
}
