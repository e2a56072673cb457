//! Agent registry: the research agents the planner may assign steps to.

pub mod defaults;
pub mod store;

pub use defaults::{FALLBACK_AGENT_COLOR, FALLBACK_AGENT_ICON, builtin_agents};
pub use store::{AgentStore, JsonAgentStore};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub backstory: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_orchestrator: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constitution: Option<String>,
    /// Tool used when a step's action matches nothing registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_tool: Option<String>,
}

fn default_icon() -> String {
    FALLBACK_AGENT_ICON.into()
}

fn default_color() -> String {
    "#A855F7".into()
}

fn default_enabled() -> bool {
    true
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            icon: default_icon(),
            description: String::new(),
            role: String::new(),
            goal: String::new(),
            backstory: String::new(),
            capabilities: Vec::new(),
            enabled: default_enabled(),
            requires_approval: false,
            color: default_color(),
            is_orchestrator: None,
            constitution: None,
            default_tool: None,
        }
    }
}

impl AgentProfile {
    /// `defaultTool`, else the first capability.
    pub fn default_tool(&self) -> Option<&str> {
        self.default_tool
            .as_deref()
            .or_else(|| self.capabilities.first().map(String::as_str))
    }
}

/// Agent id → fallback tool name, for every agent that has one.
pub fn agent_default_tools(agents: &[AgentProfile]) -> HashMap<String, String> {
    agents
        .iter()
        .filter_map(|agent| {
            agent
                .default_tool()
                .map(|tool| (agent.id.clone(), tool.to_string()))
        })
        .collect()
}

/// Colour and icon for an agent node; unknown agents get the neutral fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentBadge {
    pub color: String,
    pub icon: String,
}

impl AgentBadge {
    pub fn fallback() -> Self {
        Self {
            color: FALLBACK_AGENT_COLOR.into(),
            icon: FALLBACK_AGENT_ICON.into(),
        }
    }
}

pub fn agent_badges(agents: &[AgentProfile]) -> HashMap<String, AgentBadge> {
    agents
        .iter()
        .map(|agent| {
            (
                agent.id.clone(),
                AgentBadge {
                    color: agent.color.clone(),
                    icon: agent.icon.clone(),
                },
            )
        })
        .collect()
}
