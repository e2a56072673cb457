use super::{ApprovalBroker, ApprovalDecision, CheckpointRequest};
use anyhow::Result;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Asks on the terminal. Output goes to stderr so stdout stays a clean event stream.
pub struct CliApprovalBroker {
    timeout: Duration,
}

impl CliApprovalBroker {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ApprovalBroker for CliApprovalBroker {
    fn await_decision<'a>(
        &'a self,
        request: &'a CheckpointRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ApprovalDecision>> + Send + 'a>> {
        Box::pin(async move {
            eprintln!();
            eprintln!("┌─ Checkpoint Review ──────────────────────────────");
            eprintln!("│ Step:    {}", request.step_id);
            eprintln!("│ Action:  {}", request.action);
            eprintln!("│ Task:    {}", request.description);
            eprintln!("│ Result:  {}", request.result_preview.replace('\n', " "));
            eprintln!("├──────────────────────────────────────────────────");
            eprintln!("│ [A]pprove  [R]eject");
            eprintln!("└──────────────────────────────────────────────────");
            eprint!("  > ");

            let decision = match tokio::time::timeout(self.timeout, read_single_char()).await {
                Ok(Ok(ch)) => parse_answer(ch),
                Ok(Err(e)) => ApprovalDecision::rejected(format!("input error: {e}")),
                Err(_) => ApprovalDecision::rejected("approval timed out"),
            };
            Ok(decision)
        })
    }
}

fn parse_answer(ch: char) -> ApprovalDecision {
    match ch.to_ascii_lowercase() {
        'a' | 'y' => ApprovalDecision::Approved,
        'r' | 'n' => ApprovalDecision::rejected("rejected by user"),
        other => ApprovalDecision::rejected(format!("unrecognized input: '{other}'")),
    }
}

async fn read_single_char() -> Result<char> {
    let ch = tokio::task::spawn_blocking(|| {
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        input
            .trim()
            .chars()
            .next()
            .ok_or_else(|| anyhow::anyhow!("no input received"))
    })
    .await??;
    Ok(ch)
}
