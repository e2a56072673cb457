use super::{ApprovalBroker, ApprovalDecision, CheckpointRequest};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Approves every checkpoint after a fixed delay.
pub struct AutoApproveBroker {
    delay: Duration,
}

impl AutoApproveBroker {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl ApprovalBroker for AutoApproveBroker {
    fn await_decision<'a>(
        &'a self,
        request: &'a CheckpointRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ApprovalDecision>> + Send + 'a>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            tracing::debug!(step = %request.step_id, "checkpoint auto-approved");
            Ok(ApprovalDecision::Approved)
        })
    }
}
