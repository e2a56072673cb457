mod approval;
mod core;
mod execution;
mod gateway;
mod tools;

pub use approval::{ApprovalConfig, ApprovalMode};
pub use core::Config;
pub use execution::ExecutionConfig;
pub use gateway::GatewayConfig;
pub use tools::ToolsConfig;
