use crate::planner::InputModality;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    Input,
    Orchestrator,
    Agent,
    Checkpoint,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    AwaitingApproval,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EdgeStatus {
    Pending,
    Active,
    Completed,
}

/// Lifecycle of a whole graph, as shown by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphStatus {
    #[default]
    Planning,
    Executing,
    Completed,
    Halted,
}

/// Layout is computed client-side; nodes always start at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_modality: Option<InputModality>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub data: NodeData,
    #[serde(default)]
    pub position: Position,
}

impl GraphNode {
    pub fn new(
        id: impl Into<String>,
        kind: NodeKind,
        label: impl Into<String>,
        status: NodeStatus,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            data: NodeData {
                label: label.into(),
                kind,
                status,
                agent_id: None,
                agent_color: None,
                agent_icon: None,
                result: None,
                duration_ms: None,
                input_modality: None,
            },
            position: Position::default(),
        }
    }

    pub fn status(&self) -> NodeStatus {
        self.data.status
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeData {
    pub status: EdgeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub data: EdgeData,
}

impl GraphEdge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        status: EdgeStatus,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            data: EdgeData { status },
        }
    }

    pub fn status(&self) -> EdgeStatus {
        self.data.status
    }
}

/// Visualization state of one plan execution.
///
/// Topology is fixed once built; only statuses, results and durations change.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionGraph {
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    #[serde(default)]
    pub status: GraphStatus,
}

impl ExecutionGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Returns false when no node has this id.
    pub fn set_node_status(&mut self, id: &str, status: NodeStatus) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.data.status = status;
                true
            }
            None => false,
        }
    }

    pub fn complete_node(&mut self, id: &str, result: &str, duration_ms: Option<u64>) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.data.status = NodeStatus::Completed;
                node.data.result = Some(result.to_string());
                if duration_ms.is_some() {
                    node.data.duration_ms = duration_ms;
                }
                true
            }
            None => false,
        }
    }

    pub fn set_edge_status(&mut self, id: &str, status: EdgeStatus) -> bool {
        match self.edges.iter_mut().find(|e| e.id == id) {
            Some(edge) => {
                edge.data.status = status;
                true
            }
            None => false,
        }
    }

    pub fn incoming_edge_ids(&self, target: &str) -> Vec<String> {
        self.edges
            .iter()
            .filter(|e| e.target == target)
            .map(|e| e.id.clone())
            .collect()
    }

    pub fn outgoing_edge_ids(&self, source: &str) -> Vec<String> {
        self.edges
            .iter()
            .filter(|e| e.source == source)
            .map(|e| e.id.clone())
            .collect()
    }
}
