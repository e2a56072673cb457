use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pacing and parallelism of the plan executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Pause after each step settles, in milliseconds (default: 200)
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// Pause between activating and completing the output edges (default: 300)
    #[serde(default = "default_output_delay_ms")]
    pub output_delay_ms: u64,
    /// Upper bound on concurrently running steps (default: 4)
    #[serde(default = "default_max_parallel_steps")]
    pub max_parallel_steps: usize,
}

fn default_step_delay_ms() -> u64 {
    200
}

fn default_output_delay_ms() -> u64 {
    300
}

fn default_max_parallel_steps() -> usize {
    4
}

impl ExecutionConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn output_delay(&self) -> Duration {
        Duration::from_millis(self.output_delay_ms)
    }

    /// Zero delays, used by tests and batch runs.
    pub fn unpaced(max_parallel_steps: usize) -> Self {
        Self {
            step_delay_ms: 0,
            output_delay_ms: 0,
            max_parallel_steps,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            step_delay_ms: default_step_delay_ms(),
            output_delay_ms: default_output_delay_ms(),
            max_parallel_steps: default_max_parallel_steps(),
        }
    }
}
