use super::events::ExecutionEvent;
use crate::error::ExecutionError;
use crate::graph::{EdgeStatus, ExecutionGraph, GraphStatus, NodeStatus};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Applies graph mutations and emits the matching events.
///
/// The graph lock is held across the send so concurrent steps cannot
/// reorder events relative to the graph state they describe.
#[derive(Clone)]
pub struct EventEmitter {
    graph: Arc<Mutex<ExecutionGraph>>,
    tx: mpsc::Sender<ExecutionEvent>,
    cancel: CancellationToken,
}

impl EventEmitter {
    pub fn new(
        graph: ExecutionGraph,
        tx: mpsc::Sender<ExecutionEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            graph: Arc::new(Mutex::new(graph)),
            tx,
            cancel,
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel the run as soon as the consumer goes away, even while no event
    /// is being sent. Watching stops when the returned guard is dropped.
    pub fn watch_consumer(&self) -> DropGuard {
        let finished = CancellationToken::new();
        let stop = finished.clone();
        let tx = self.tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = tx.closed() => {
                    tracing::debug!("event consumer went away, cancelling execution");
                    cancel.cancel();
                }
                () = stop.cancelled() => {}
                () = cancel.cancelled() => {}
            }
        });
        finished.drop_guard()
    }

    async fn send(&self, event: ExecutionEvent) -> Result<(), ExecutionError> {
        if self.cancel.is_cancelled() {
            return Err(ExecutionError::Disconnected);
        }
        if self.tx.send(event).await.is_err() {
            tracing::debug!("event consumer went away, cancelling execution");
            self.cancel.cancel();
            return Err(ExecutionError::Disconnected);
        }
        Ok(())
    }

    pub async fn snapshot(&self) -> ExecutionGraph {
        self.graph.lock().await.clone()
    }

    pub async fn incoming_edges(&self, node_id: &str) -> Vec<String> {
        self.graph.lock().await.incoming_edge_ids(node_id)
    }

    pub async fn outgoing_edges(&self, node_id: &str) -> Vec<String> {
        self.graph.lock().await.outgoing_edge_ids(node_id)
    }

    pub async fn graph_init(&self) -> Result<(), ExecutionError> {
        let graph = self.graph.lock().await;
        self.send(ExecutionEvent::GraphInit {
            graph: graph.clone(),
        })
        .await
    }

    pub async fn node_status(&self, node_id: &str, status: NodeStatus) -> Result<(), ExecutionError> {
        let mut graph = self.graph.lock().await;
        graph.set_node_status(node_id, status);
        self.send(ExecutionEvent::NodeStatus {
            node_id: node_id.to_string(),
            status,
            result: None,
            duration_ms: None,
        })
        .await
    }

    pub async fn node_completed(
        &self,
        node_id: &str,
        result: &str,
        duration_ms: Option<u64>,
    ) -> Result<(), ExecutionError> {
        let mut graph = self.graph.lock().await;
        graph.complete_node(node_id, result, duration_ms);
        self.send(ExecutionEvent::NodeStatus {
            node_id: node_id.to_string(),
            status: NodeStatus::Completed,
            result: Some(result.to_string()),
            duration_ms,
        })
        .await
    }

    pub async fn edges_status(&self, edge_ids: &[String], status: EdgeStatus) -> Result<(), ExecutionError> {
        let mut graph = self.graph.lock().await;
        for edge_id in edge_ids {
            graph.set_edge_status(edge_id, status);
            self.send(ExecutionEvent::EdgeStatus {
                edge_id: edge_id.clone(),
                status,
            })
            .await?;
        }
        Ok(())
    }

    pub async fn checkpoint_reached(&self, node_id: &str, step_id: &str) -> Result<(), ExecutionError> {
        let _graph = self.graph.lock().await;
        self.send(ExecutionEvent::CheckpointReached {
            node_id: node_id.to_string(),
            step_id: step_id.to_string(),
        })
        .await
    }

    pub async fn complete(&self, summary: &str) -> Result<(), ExecutionError> {
        let mut graph = self.graph.lock().await;
        graph.status = GraphStatus::Completed;
        self.send(ExecutionEvent::ExecutionComplete {
            graph: graph.clone(),
            summary: summary.to_string(),
        })
        .await
    }

    pub async fn halt(
        &self,
        reason: &str,
        completed_step_ids: Vec<String>,
        pending_step_ids: Vec<String>,
    ) -> Result<(), ExecutionError> {
        let mut graph = self.graph.lock().await;
        graph.status = GraphStatus::Halted;
        self.send(ExecutionEvent::ExecutionHalted {
            graph: graph.clone(),
            reason: reason.to_string(),
            completed_step_ids,
            pending_step_ids,
        })
        .await
    }
}
