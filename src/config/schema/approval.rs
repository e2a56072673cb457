use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalMode {
    /// Checkpoints approve themselves after `auto_approve_delay_ms`.
    Auto,
    /// Checkpoints wait for an explicit decision.
    #[default]
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    #[serde(default)]
    pub mode: ApprovalMode,
    /// Delay before an automatic approval (default: 2000)
    #[serde(default = "default_auto_approve_delay_ms")]
    pub auto_approve_delay_ms: u64,
    /// How long a checkpoint waits for a decision before it counts as rejected
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_auto_approve_delay_ms() -> u64 {
    2000
}

fn default_timeout_secs() -> u64 {
    300
}

impl ApprovalConfig {
    pub fn auto_approve_delay(&self) -> Duration {
        Duration::from_millis(self.auto_approve_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            mode: ApprovalMode::default(),
            auto_approve_delay_ms: default_auto_approve_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
