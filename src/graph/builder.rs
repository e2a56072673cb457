use super::model::{EdgeStatus, ExecutionGraph, GraphEdge, GraphNode, GraphStatus, NodeKind, NodeStatus};
use crate::agents::AgentBadge;
use crate::planner::{InputModality, Plan};
use crate::utils::{truncate_chars, truncate_with_ellipsis};
use std::collections::{HashMap, HashSet};

pub const INPUT_NODE_ID: &str = "input";
pub const ORCHESTRATOR_NODE_ID: &str = "orchestrator";
pub const OUTPUT_NODE_ID: &str = "output";

const INPUT_LABEL_CHARS: usize = 60;
const AGENT_LABEL_CHARS: usize = 40;

/// Node id whose completion releases the dependents of `step_id`.
pub fn effective_source(plan: &Plan, step_id: &str) -> String {
    match plan.step(step_id) {
        Some(step) if step.requires_approval => step.checkpoint_id(),
        _ => step_id.to_string(),
    }
}

/// Derive the visualization graph for `plan`.
///
/// Agent nodes are decorated from `badges`; unknown agents get the fallback badge.
pub fn build_graph(
    plan: &Plan,
    request: &str,
    modality: InputModality,
    badges: &HashMap<String, AgentBadge>,
) -> ExecutionGraph {
    let mut nodes = Vec::with_capacity(plan.steps.len() * 2 + 3);
    let mut edges = Vec::new();

    let mut input = GraphNode::new(
        INPUT_NODE_ID,
        NodeKind::Input,
        truncate_with_ellipsis(request, INPUT_LABEL_CHARS),
        NodeStatus::Completed,
    );
    input.data.input_modality = Some(modality);
    nodes.push(input);
    nodes.push(GraphNode::new(
        ORCHESTRATOR_NODE_ID,
        NodeKind::Orchestrator,
        format!("Plan: {} tasks", plan.steps.len()),
        NodeStatus::Completed,
    ));
    edges.push(GraphEdge::new(
        "e-input-orch",
        INPUT_NODE_ID,
        ORCHESTRATOR_NODE_ID,
        EdgeStatus::Completed,
    ));

    if plan.is_empty() {
        return ExecutionGraph {
            task_id: plan.id.clone(),
            nodes,
            edges,
            status: GraphStatus::Planning,
        };
    }

    let known: HashSet<&str> = plan.steps.iter().map(|s| s.id.as_str()).collect();
    let fallback = AgentBadge::fallback();

    for step in &plan.steps {
        let badge = badges.get(&step.agent_id).unwrap_or(&fallback);
        let mut node = GraphNode::new(
            step.id.clone(),
            NodeKind::Agent,
            truncate_chars(&step.description, AGENT_LABEL_CHARS),
            NodeStatus::Pending,
        );
        node.data.agent_id = Some(step.agent_id.clone());
        node.data.agent_color = Some(badge.color.clone());
        node.data.agent_icon = Some(badge.icon.clone());
        nodes.push(node);

        if step.depends_on.is_empty() {
            edges.push(GraphEdge::new(
                format!("e-orch-{}", step.id),
                ORCHESTRATOR_NODE_ID,
                step.id.clone(),
                EdgeStatus::Pending,
            ));
        } else {
            for dep in step.depends_on.iter().filter(|d| known.contains(d.as_str())) {
                let id = format!("e-{dep}-{}", step.id);
                if edges.iter().any(|e: &GraphEdge| e.id == id) {
                    continue;
                }
                edges.push(GraphEdge::new(
                    id,
                    effective_source(plan, dep),
                    step.id.clone(),
                    EdgeStatus::Pending,
                ));
            }
        }

        if step.requires_approval {
            let checkpoint = step.checkpoint_id();
            nodes.push(GraphNode::new(
                checkpoint.clone(),
                NodeKind::Checkpoint,
                format!("Review: {}", step.action),
                NodeStatus::Pending,
            ));
            edges.push(GraphEdge::new(
                format!("e-{}-{checkpoint}", step.id),
                step.id.clone(),
                checkpoint,
                EdgeStatus::Pending,
            ));
        }
    }

    nodes.push(GraphNode::new(
        OUTPUT_NODE_ID,
        NodeKind::Output,
        "Result",
        NodeStatus::Pending,
    ));
    let sinks = plan.sink_ids();
    for step in plan.steps.iter().filter(|s| sinks.contains(s.id.as_str())) {
        let source = effective_source(plan, &step.id);
        edges.push(GraphEdge::new(
            format!("e-{source}-{OUTPUT_NODE_ID}"),
            source,
            OUTPUT_NODE_ID,
            EdgeStatus::Pending,
        ));
    }

    ExecutionGraph {
        task_id: plan.id.clone(),
        nodes,
        edges,
        status: GraphStatus::Planning,
    }
}
