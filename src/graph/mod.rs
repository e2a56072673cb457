mod builder;
mod model;

pub use builder::{INPUT_NODE_ID, ORCHESTRATOR_NODE_ID, OUTPUT_NODE_ID, build_graph, effective_source};
pub use model::{
    EdgeData, EdgeStatus, ExecutionGraph, GraphEdge, GraphNode, GraphStatus, NodeData, NodeKind,
    NodeStatus, Position,
};
