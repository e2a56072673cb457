use std::sync::Arc;

use agentflow::engine::{
    ExecutionEvent, ExecutionOutcome, ExecutionRequest, SynthesisInput, Synthesizer,
};
use agentflow::graph::{GraphStatus, NodeStatus, OUTPUT_NODE_ID};
use agentflow::planner::{Plan, PlanStep};
use agentflow::tools::{InputBinding, ReferenceKind, ToolRegistry};
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::flow_harness::{
    ScriptedTool, auto_approve, collect, executor, executor_with_synthesizer, has_node_event,
    node_event, node_result,
};

/// Synthesizer that errors or answers with blank text.
enum BrokenSynthesizer {
    Failing,
    Blank,
}

#[async_trait]
impl Synthesizer for BrokenSynthesizer {
    async fn synthesize(&self, _input: &SynthesisInput) -> anyhow::Result<String> {
        match self {
            Self::Failing => anyhow::bail!("provider unavailable"),
            Self::Blank => Ok("  \n".into()),
        }
    }
}

fn two_step_plan() -> Plan {
    Plan::new(
        "two",
        vec![
            PlanStep::new("a", "x", "echo").with_description("first"),
            PlanStep::new("b", "x", "echo")
                .with_description("second")
                .depending_on(["a"]),
        ],
    )
}

#[tokio::test]
async fn unregistered_action_falls_back_to_agent_default_tool() {
    let search = Arc::new(ScriptedTool::echo("alpha_search", &["query"]));
    let registry = ToolRegistry::new()
        .with_tool(search.clone())
        .with_agent_default("alpha", "alpha_search");

    let plan = Plan::new(
        "look something up",
        vec![PlanStep::new("step_1", "alpha", "search_x").with_description("quantum error correction")],
    );
    let rx = Arc::new(executor(registry, auto_approve())).spawn(ExecutionRequest::new(plan));
    let events = collect(rx).await;

    assert_eq!(
        node_result(&events, "step_1"),
        "alpha_search: quantum error correction"
    );
    assert_eq!(search.calls().len(), 1);
}

#[tokio::test]
async fn unknown_action_without_default_reports_itself() {
    let plan = Plan::new(
        "s",
        vec![PlanStep::new("step_1", "nobody", "teleport").with_description("go")],
    );
    let rx = Arc::new(executor(ToolRegistry::new(), auto_approve()))
        .spawn(ExecutionRequest::new(plan));
    let events = collect(rx).await;

    assert_eq!(
        node_result(&events, "step_1"),
        "Unknown action: teleport. Description: go"
    );
    assert_eq!(events.last().unwrap().kind(), "execution_complete");
}

#[tokio::test]
async fn summarize_fans_out_over_bold_titles_upstream() {
    let search = Arc::new(ScriptedTool::with_reply("search_y", &["query"], |_| {
        "1. **Attention Is All You Need** (2017)\n2. **Graph Attention Networks** (2018)".into()
    }));
    let summarize = Arc::new(
        ScriptedTool::with_reply("summarize_y", &["title"], |args| {
            format!("summary of {}", args["title"].as_str().unwrap_or_default())
        })
        .binding(InputBinding::References {
            kind: ReferenceKind::BoldTitle,
            limit: None,
        }),
    );
    let registry = ToolRegistry::new()
        .with_tool(search)
        .with_tool(summarize.clone());

    let plan = Plan::new(
        "search then summarize",
        vec![
            PlanStep::new("step_1", "y", "search_y").with_description("attention"),
            PlanStep::new("step_2", "y", "summarize_y")
                .with_description("summarize the hits")
                .depending_on(["step_1"]),
        ],
    );
    let rx = Arc::new(executor(registry, auto_approve())).spawn(ExecutionRequest::new(plan));
    let events = collect(rx).await;

    assert_eq!(
        node_result(&events, "step_2"),
        "summary of Attention Is All You Need\n\n---\n\nsummary of Graph Attention Networks"
    );
    let titles: Vec<String> = summarize
        .calls()
        .iter()
        .map(|args| args["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        titles,
        vec!["Attention Is All You Need", "Graph Attention Networks"]
    );
}

#[tokio::test]
async fn three_step_cycle_halts_before_running_anything() {
    let registry = ToolRegistry::new().with_tool(Arc::new(ScriptedTool::echo("echo", &["text"])));
    let plan = Plan::new(
        "circular",
        vec![
            PlanStep::new("a", "x", "echo").depending_on(["c"]),
            PlanStep::new("b", "x", "echo").depending_on(["a"]),
            PlanStep::new("c", "x", "echo").depending_on(["b"]),
        ],
    );

    let (tx, rx) = mpsc::channel(64);
    let outcome = executor(registry, auto_approve())
        .execute(ExecutionRequest::new(plan), tx)
        .await
        .unwrap();

    match outcome {
        ExecutionOutcome::Halted {
            reason,
            completed,
            pending,
        } => {
            assert!(reason.starts_with("cycle detected"), "reason: {reason}");
            assert!(completed.is_empty());
            assert_eq!(pending, vec!["a", "b", "c"]);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    let events = collect(rx).await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind(), "graph_init");
    match &events[1] {
        ExecutionEvent::ExecutionHalted {
            graph,
            completed_step_ids,
            pending_step_ids,
            ..
        } => {
            assert_eq!(graph.status, GraphStatus::Halted);
            assert!(completed_step_ids.is_empty());
            assert_eq!(pending_step_ids.len(), 3);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn zero_step_plan_completes_with_plan_summary() {
    let plan = Plan::new("Hi! Ask me about research papers.", vec![]);
    let rx = Arc::new(executor(ToolRegistry::new(), auto_approve()))
        .spawn(ExecutionRequest::new(plan));
    let events = collect(rx).await;

    assert_eq!(events.len(), 2);
    match &events[1] {
        ExecutionEvent::ExecutionComplete { graph, summary } => {
            assert_eq!(summary, "Hi! Ask me about research papers.");
            assert_eq!(graph.status, GraphStatus::Completed);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn dependents_start_only_after_every_dependency_completes() {
    let registry = ToolRegistry::new().with_tool(Arc::new(ScriptedTool::echo("echo", &["text"])));
    let plan = Plan::new(
        "diamond",
        vec![
            PlanStep::new("a", "x", "echo").with_description("root"),
            PlanStep::new("b", "x", "echo")
                .with_description("left")
                .depending_on(["a"]),
            PlanStep::new("c", "x", "echo")
                .with_description("right")
                .depending_on(["a"]),
            PlanStep::new("d", "x", "echo")
                .with_description("join")
                .depending_on(["b", "c"]),
        ],
    );
    let rx = Arc::new(executor(registry, auto_approve())).spawn(ExecutionRequest::new(plan));
    let events = collect(rx).await;

    let a_done = node_event(&events, "a", NodeStatus::Completed);
    assert!(node_event(&events, "b", NodeStatus::Running) > a_done);
    assert!(node_event(&events, "c", NodeStatus::Running) > a_done);

    let d_running = node_event(&events, "d", NodeStatus::Running);
    assert!(d_running > node_event(&events, "b", NodeStatus::Completed));
    assert!(d_running > node_event(&events, "c", NodeStatus::Completed));

    assert!(node_event(&events, OUTPUT_NODE_ID, NodeStatus::Running) > d_running);
    assert_eq!(events.last().unwrap().kind(), "execution_complete");
}

#[tokio::test]
async fn final_snapshot_marks_every_node_and_carries_summary() {
    let registry = ToolRegistry::new().with_tool(Arc::new(ScriptedTool::echo("echo", &["text"])));
    let rx = Arc::new(executor(registry, auto_approve()))
        .spawn(ExecutionRequest::new(two_step_plan()));
    let events = collect(rx).await;

    let Some(ExecutionEvent::ExecutionComplete { graph, summary }) = events.last() else {
        panic!("run did not complete");
    };
    assert_eq!(
        summary,
        "### first\n\necho: first\n\n---\n\n### second\n\necho: second"
    );
    for id in ["a", "b", OUTPUT_NODE_ID] {
        assert_eq!(graph.node(id).unwrap().status(), NodeStatus::Completed, "{id}");
    }
    assert_eq!(
        graph.node(OUTPUT_NODE_ID).unwrap().data.result.as_deref(),
        Some(summary.as_str())
    );
    assert!(!has_node_event(&events, "a", NodeStatus::AwaitingApproval));
}

#[tokio::test]
async fn failed_or_blank_synthesis_falls_back_to_concatenated_results() {
    for synthesizer in [BrokenSynthesizer::Failing, BrokenSynthesizer::Blank] {
        let registry =
            ToolRegistry::new().with_tool(Arc::new(ScriptedTool::echo("echo", &["text"])));
        let rx = Arc::new(executor_with_synthesizer(
            registry,
            auto_approve(),
            Arc::new(synthesizer),
        ))
        .spawn(ExecutionRequest::new(two_step_plan()));
        let events = collect(rx).await;

        let Some(ExecutionEvent::ExecutionComplete { graph, summary }) = events.last() else {
            panic!("run did not complete");
        };
        assert_eq!(
            summary,
            "### first\n\necho: first\n\n---\n\n### second\n\necho: second"
        );
        assert_eq!(
            graph.node(OUTPUT_NODE_ID).unwrap().status(),
            NodeStatus::Completed
        );
    }
}

#[tokio::test]
async fn panicking_tool_becomes_a_failed_step_result() {
    let registry = ToolRegistry::new()
        .with_tool(Arc::new(ScriptedTool::with_reply("explode", &["text"], |_| {
            panic!("tool blew up")
        })))
        .with_tool(Arc::new(ScriptedTool::echo("echo", &["text"])));
    let plan = Plan::new(
        "survive a crash",
        vec![
            PlanStep::new("a", "x", "explode").with_description("boom"),
            PlanStep::new("b", "x", "echo")
                .with_description("after")
                .depending_on(["a"]),
        ],
    );
    let rx = Arc::new(executor(registry, auto_approve())).spawn(ExecutionRequest::new(plan));
    let events = collect(rx).await;

    let failed = node_result(&events, "a");
    assert!(
        failed.starts_with("Tool execution failed (explode): "),
        "result: {failed}"
    );
    assert!(has_node_event(&events, "b", NodeStatus::Completed));
    assert_eq!(events.last().unwrap().kind(), "execution_complete");
}
