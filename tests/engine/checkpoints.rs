use std::sync::Arc;
use std::time::Duration;

use agentflow::engine::{ExecutionEvent, ExecutionRequest};
use agentflow::error::ApprovalError;
use agentflow::graph::{EdgeStatus, NodeStatus};
use agentflow::planner::{Plan, PlanStep};
use agentflow::security::{ApprovalBroker, ApprovalHub, ApprovalStatus};
use agentflow::tools::ToolRegistry;
use tokio::sync::mpsc;

use crate::flow_harness::{
    ScriptedTool, auto_approve, collect, executor, has_node_event, node_event,
};

fn reviewed_plan() -> Plan {
    Plan::new(
        "draft then refine",
        vec![
            PlanStep::new("a", "x", "echo")
                .with_description("draft")
                .with_approval(),
            PlanStep::new("b", "x", "echo")
                .with_description("refine")
                .depending_on(["a"]),
        ],
    )
}

fn echo_registry() -> ToolRegistry {
    ToolRegistry::new().with_tool(Arc::new(ScriptedTool::echo("echo", &["text"])))
}

fn edge_completed(events: &[ExecutionEvent], edge: &str) -> bool {
    events.iter().any(|e| {
        matches!(
            e,
            ExecutionEvent::EdgeStatus { edge_id, status: EdgeStatus::Completed }
                if edge_id == edge
        )
    })
}

/// Drive a run against `hub`, answering each checkpoint with `approved`.
async fn run_with_reviewer(hub: &Arc<ApprovalHub>, approved: bool, comment: &str) -> Vec<ExecutionEvent> {
    let broker: Arc<dyn ApprovalBroker> = hub.clone();
    let mut rx = Arc::new(executor(echo_registry(), broker)).spawn(ExecutionRequest::new(reviewed_plan()));

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        if let ExecutionEvent::CheckpointReached { step_id, .. } = &event {
            assert_eq!(hub.status(None, step_id), Ok(ApprovalStatus::Pending));
            hub.resolve(None, step_id, approved, comment).unwrap();
        }
        events.push(event);
    }
    events
}

#[tokio::test]
async fn checkpoint_sits_between_step_completion_and_dependents() {
    let rx = Arc::new(executor(echo_registry(), auto_approve()))
        .spawn(ExecutionRequest::new(reviewed_plan()));
    let events = collect(rx).await;

    let a_done = node_event(&events, "a", NodeStatus::Completed);
    let awaiting = node_event(&events, "checkpoint_a", NodeStatus::AwaitingApproval);
    let reached = events
        .iter()
        .position(|e| {
            matches!(
                e,
                ExecutionEvent::CheckpointReached { node_id, step_id }
                    if node_id == "checkpoint_a" && step_id == "a"
            )
        })
        .unwrap();
    let approved = node_event(&events, "checkpoint_a", NodeStatus::Approved);
    let b_running = node_event(&events, "b", NodeStatus::Running);

    assert!(a_done < awaiting);
    assert!(awaiting < reached);
    assert!(reached < approved);
    assert!(approved < b_running);

    assert!(edge_completed(&events, "e-a-checkpoint_a"));
    assert!(edge_completed(&events, "e-checkpoint_a-b"));
    assert_eq!(events.last().unwrap().kind(), "execution_complete");
}

#[tokio::test]
async fn reviewer_approval_lets_the_run_finish() {
    let hub = Arc::new(ApprovalHub::new());
    let events = run_with_reviewer(&hub, true, "looks good").await;

    assert!(has_node_event(&events, "checkpoint_a", NodeStatus::Approved));
    assert!(has_node_event(&events, "b", NodeStatus::Completed));
    assert_eq!(events.last().unwrap().kind(), "execution_complete");

    let record = hub.record(None, "a").unwrap();
    assert_eq!(record.status, ApprovalStatus::Approved);
    assert_eq!(record.comment, "looks good");
    assert_eq!(hub.open_count(), 0);
}

#[tokio::test]
async fn reviewer_rejection_halts_and_leaves_dependents_pending() {
    let hub = Arc::new(ApprovalHub::new());
    let events = run_with_reviewer(&hub, false, "too vague").await;

    assert!(has_node_event(&events, "checkpoint_a", NodeStatus::Rejected));
    assert!(!has_node_event(&events, "b", NodeStatus::Running));

    match events.last().unwrap() {
        ExecutionEvent::ExecutionHalted {
            reason,
            completed_step_ids,
            pending_step_ids,
            ..
        } => {
            assert_eq!(reason, "checkpoint for step a was rejected: too vague");
            assert!(completed_step_ids.is_empty());
            assert_eq!(pending_step_ids, &vec!["a".to_string(), "b".to_string()]);
        }
        other => panic!("unexpected terminal event {other:?}"),
    }
}

#[tokio::test]
async fn silent_reviewer_times_out_into_rejection() {
    let broker: Arc<dyn ApprovalBroker> = Arc::new(ApprovalHub::new());
    let rx = Arc::new(
        executor(echo_registry(), broker).with_approval_timeout(Duration::from_millis(30)),
    )
    .spawn(ExecutionRequest::new(reviewed_plan()));
    let events = collect(rx).await;

    match events.last().unwrap() {
        ExecutionEvent::ExecutionHalted { reason, .. } => {
            assert_eq!(reason, "checkpoint for step a was rejected: approval timed out");
        }
        other => panic!("unexpected terminal event {other:?}"),
    }
}

/// Read events up to the first checkpoint; returns the run's task id and the events seen.
async fn until_checkpoint(rx: &mut mpsc::Receiver<ExecutionEvent>) -> (String, Vec<ExecutionEvent>) {
    let mut task_id = String::new();
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        if let ExecutionEvent::GraphInit { graph } = &event {
            task_id.clone_from(&graph.task_id);
        }
        let reached = matches!(event, ExecutionEvent::CheckpointReached { .. });
        events.push(event);
        if reached {
            break;
        }
    }
    (task_id, events)
}

#[tokio::test]
async fn concurrent_runs_keep_their_checkpoints_apart() {
    let hub = Arc::new(ApprovalHub::new());
    let broker: Arc<dyn ApprovalBroker> = hub.clone();
    let executor = Arc::new(executor(echo_registry(), broker));
    let mut first = executor.spawn(ExecutionRequest::new(reviewed_plan()));
    let mut second = executor.spawn(ExecutionRequest::new(reviewed_plan()));

    let (first_task, mut first_events) = until_checkpoint(&mut first).await;
    let (second_task, mut second_events) = until_checkpoint(&mut second).await;
    assert_ne!(first_task, second_task);
    assert_eq!(hub.open_count(), 2);

    assert!(matches!(
        hub.resolve(None, "a", true, ""),
        Err(ApprovalError::Ambiguous { .. })
    ));
    hub.resolve(Some(&first_task), "a", true, "ship it").unwrap();
    first_events.extend(collect(first).await);
    assert_eq!(first_events.last().unwrap().kind(), "execution_complete");
    assert_eq!(
        hub.status(Some(&second_task), "a"),
        Ok(ApprovalStatus::Pending)
    );

    hub.resolve(None, "a", false, "wrong run").unwrap();
    second_events.extend(collect(second).await);
    match second_events.last().unwrap() {
        ExecutionEvent::ExecutionHalted { reason, .. } => {
            assert_eq!(reason, "checkpoint for step a was rejected: wrong run");
        }
        other => panic!("unexpected terminal event {other:?}"),
    }
    assert_eq!(hub.open_count(), 0);
}

#[tokio::test]
async fn timed_out_checkpoint_is_retired() {
    let hub = Arc::new(ApprovalHub::new());
    let broker: Arc<dyn ApprovalBroker> = hub.clone();
    let rx = Arc::new(
        executor(echo_registry(), broker).with_approval_timeout(Duration::from_millis(30)),
    )
    .spawn(ExecutionRequest::new(reviewed_plan()));
    collect(rx).await;

    assert_eq!(hub.open_count(), 0);
    assert!(matches!(
        hub.resolve(None, "a", true, "too late"),
        Err(ApprovalError::NotFound(_))
    ));
}
