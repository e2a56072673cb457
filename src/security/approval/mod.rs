pub mod auto;
pub mod cli;
pub mod hub;

pub use auto::AutoApproveBroker;
pub use cli::CliApprovalBroker;
pub use hub::{ApprovalHub, ApprovalRecord, ApprovalStatus};

use crate::config::{ApprovalConfig, ApprovalMode};
use crate::utils::truncate_with_ellipsis;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A checkpoint the executor is waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRequest {
    pub task_id: String,
    pub step_id: String,
    pub checkpoint_id: String,
    pub action: String,
    pub description: String,
    pub result_preview: String,
}

impl CheckpointRequest {
    const PREVIEW_CHARS: usize = 200;

    pub fn new(task_id: &str, step: &crate::planner::PlanStep, result: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            step_id: step.id.clone(),
            checkpoint_id: step.checkpoint_id(),
            action: step.action.clone(),
            description: step.description.clone(),
            result_preview: truncate_with_ellipsis(result, Self::PREVIEW_CHARS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approved,
    Rejected { reason: String },
}

impl ApprovalDecision {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

pub trait ApprovalBroker: Send + Sync {
    /// Called before the checkpoint is announced to the client.
    fn checkpoint_opened(&self, _request: &CheckpointRequest) {}

    /// Called once the executor stops waiting, whatever the outcome.
    fn checkpoint_closed(&self, _request: &CheckpointRequest) {}

    fn await_decision<'a>(
        &'a self,
        request: &'a CheckpointRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ApprovalDecision>> + Send + 'a>>;
}

/// Broker used by the gateway: fixed-delay approvals in auto mode,
/// otherwise decisions posted to the shared hub.
pub fn broker_for_mode(config: &ApprovalConfig, hub: &Arc<ApprovalHub>) -> Arc<dyn ApprovalBroker> {
    match config.mode {
        ApprovalMode::Auto => {
            Arc::new(AutoApproveBroker::new(config.auto_approve_delay())) as Arc<dyn ApprovalBroker>
        }
        ApprovalMode::Manual => Arc::clone(hub) as Arc<dyn ApprovalBroker>,
    }
}
