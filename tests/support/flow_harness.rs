#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use agentflow::config::ExecutionConfig;
use agentflow::dispatch::Dispatcher;
use agentflow::engine::{ConcatSynthesizer, ExecutionEvent, Executor, Synthesizer};
use agentflow::graph::NodeStatus;
use agentflow::security::{ApprovalBroker, AutoApproveBroker};
use agentflow::tools::{InputBinding, Tool, ToolRegistry, value_text};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

type Reply = Box<dyn Fn(&Map<String, Value>) -> String + Send + Sync>;

/// Tool that records every argument set it is called with.
pub struct ScriptedTool {
    name: &'static str,
    params: Vec<&'static str>,
    binding: InputBinding,
    reply: Reply,
    calls: Mutex<Vec<Map<String, Value>>>,
}

impl ScriptedTool {
    /// Replies `"{name}: {first param}"`.
    pub fn echo(name: &'static str, params: &[&'static str]) -> Self {
        let first = params.first().copied().unwrap_or_default();
        Self::with_reply(name, params, move |args| {
            format!("{name}: {}", args.get(first).map(value_text).unwrap_or_default())
        })
    }

    pub fn with_reply(
        name: &'static str,
        params: &[&'static str],
        reply: impl Fn(&Map<String, Value>) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            params: params.to_vec(),
            binding: InputBinding::Direct,
            reply: Box::new(reply),
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn binding(mut self, binding: InputBinding) -> Self {
        self.binding = binding;
        self
    }

    pub fn calls(&self) -> Vec<Map<String, Value>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for ScriptedTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "scripted test tool"
    }

    fn parameter_names(&self) -> Vec<&str> {
        self.params.clone()
    }

    fn input_binding(&self) -> InputBinding {
        self.binding
    }

    async fn execute(&self, args: &Map<String, Value>) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push(args.clone());
        Ok((self.reply)(args))
    }
}

pub fn auto_approve() -> Arc<dyn ApprovalBroker> {
    Arc::new(AutoApproveBroker::new(Duration::ZERO))
}

pub fn executor(registry: ToolRegistry, approvals: Arc<dyn ApprovalBroker>) -> Executor {
    executor_with_synthesizer(registry, approvals, Arc::new(ConcatSynthesizer))
}

pub fn executor_with_synthesizer(
    registry: ToolRegistry,
    approvals: Arc<dyn ApprovalBroker>,
    synthesizer: Arc<dyn Synthesizer>,
) -> Executor {
    Executor::new(Dispatcher::new(registry), approvals, synthesizer)
        .with_pacing(ExecutionConfig::unpaced(4))
        .with_approval_timeout(Duration::from_secs(5))
}

pub async fn collect(mut rx: mpsc::Receiver<ExecutionEvent>) -> Vec<ExecutionEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

/// Index of the first `node_status` event setting `node_id` to `status`.
pub fn node_event(events: &[ExecutionEvent], node_id: &str, status: NodeStatus) -> usize {
    events
        .iter()
        .position(|e| {
            matches!(
                e,
                ExecutionEvent::NodeStatus { node_id: id, status: s, .. }
                    if id == node_id && *s == status
            )
        })
        .unwrap_or_else(|| panic!("no {status:?} event for {node_id}"))
}

pub fn has_node_event(events: &[ExecutionEvent], node_id: &str, status: NodeStatus) -> bool {
    events.iter().any(|e| {
        matches!(
            e,
            ExecutionEvent::NodeStatus { node_id: id, status: s, .. }
                if id == node_id && *s == status
        )
    })
}

/// Result text carried by the `completed` event of `node_id`.
pub fn node_result(events: &[ExecutionEvent], node_id: &str) -> String {
    events
        .iter()
        .find_map(|e| match e {
            ExecutionEvent::NodeStatus {
                node_id: id,
                status: NodeStatus::Completed,
                result,
                ..
            } if id == node_id => result.clone(),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no completed result for {node_id}"))
}
