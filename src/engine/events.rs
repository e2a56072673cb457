use crate::graph::{EdgeStatus, ExecutionGraph, NodeStatus};
use serde::{Deserialize, Serialize};

/// One state transition of an execution, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ExecutionEvent {
    GraphInit {
        graph: ExecutionGraph,
    },
    NodeStatus {
        node_id: String,
        status: NodeStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },
    EdgeStatus {
        edge_id: String,
        status: EdgeStatus,
    },
    CheckpointReached {
        node_id: String,
        step_id: String,
    },
    ExecutionComplete {
        graph: ExecutionGraph,
        summary: String,
    },
    ExecutionHalted {
        graph: ExecutionGraph,
        reason: String,
        completed_step_ids: Vec<String>,
        pending_step_ids: Vec<String>,
    },
}

impl ExecutionEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GraphInit { .. } => "graph_init",
            Self::NodeStatus { .. } => "node_status",
            Self::EdgeStatus { .. } => "edge_status",
            Self::CheckpointReached { .. } => "checkpoint_reached",
            Self::ExecutionComplete { .. } => "execution_complete",
            Self::ExecutionHalted { .. } => "execution_halted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ExecutionComplete { .. } | Self::ExecutionHalted { .. }
        )
    }
}
