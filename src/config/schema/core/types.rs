use super::super::{ApprovalConfig, ExecutionConfig, GatewayConfig, ToolsConfig};
use anyhow::{Result, bail};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    pub api_key: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    /// Agent registry file. Defaults to `agents.json` next to config.toml.
    #[serde(default)]
    pub agents_path: Option<PathBuf>,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub approval: ApprovalConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_api_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_model() -> String {
    "gpt-4.1".into()
}

fn default_temperature() -> f64 {
    0.2
}

pub(super) fn agentflow_dir() -> PathBuf {
    let home = UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
    home.join(".agentflow")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: agentflow_dir().join("config.toml"),
            api_key: None,
            api_base_url: default_api_base_url(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            agents_path: None,
            gateway: GatewayConfig::default(),
            execution: ExecutionConfig::default(),
            approval: ApprovalConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.execution.max_parallel_steps == 0 {
            bail!("execution.max_parallel_steps must be at least 1");
        }
        if !(0.0..=2.0).contains(&self.default_temperature) {
            bail!(
                "default_temperature must be within 0.0..=2.0, got {}",
                self.default_temperature
            );
        }
        if self.approval.timeout_secs == 0 {
            bail!("approval.timeout_secs must be at least 1");
        }
        Ok(())
    }

    /// Location of the agent registry file.
    pub fn agents_file(&self) -> PathBuf {
        if let Some(path) = &self.agents_path {
            return path.clone();
        }
        self.config_path
            .parent()
            .map_or_else(|| PathBuf::from("agents.json"), |dir| dir.join("agents.json"))
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }
}
