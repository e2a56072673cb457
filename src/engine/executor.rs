use super::emitter::EventEmitter;
use super::events::ExecutionEvent;
use super::synthesizer::{StepResult, SynthesisInput, Synthesizer, concat_summary};
use crate::agents::AgentBadge;
use crate::config::ExecutionConfig;
use crate::dispatch::Dispatcher;
use crate::error::ExecutionError;
use crate::graph::{
    EdgeStatus, ExecutionGraph, GraphStatus, NodeStatus, OUTPUT_NODE_ID, build_graph,
};
use crate::planner::{DagContract, InputModality, Plan, PlanStep};
use crate::security::approval::{ApprovalBroker, ApprovalDecision, CheckpointRequest};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

const EVENT_BUFFER: usize = 64;
const DEFAULT_APPROVAL_TIMEOUT: Duration = Duration::from_secs(300);

/// A plan to execute, with the graph the client already rendered (if any).
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub plan: Plan,
    pub graph: Option<ExecutionGraph>,
}

impl ExecutionRequest {
    pub fn new(plan: Plan) -> Self {
        Self { plan, graph: None }
    }

    #[must_use]
    pub fn with_graph(mut self, graph: ExecutionGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Plans posted without an id still need one: checkpoints are keyed by it.
    fn assign_task_id(&mut self) {
        if !self.plan.id.trim().is_empty() {
            return;
        }
        self.plan.id = self
            .graph
            .as_ref()
            .map(|g| g.task_id.clone())
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(Plan::new_task_id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Completed {
        summary: String,
        results: Vec<StepResult>,
    },
    Halted {
        reason: String,
        completed: Vec<String>,
        pending: Vec<String>,
    },
}

/// Input modality implied by a plan's multimodal fields.
pub fn plan_modality(plan: &Plan) -> InputModality {
    if plan.audio_transcript.as_deref().is_some_and(|t| !t.is_empty()) {
        InputModality::Voice
    } else if plan.image_analysis.as_deref().is_some_and(|a| !a.is_empty()) {
        InputModality::Image
    } else {
        InputModality::Text
    }
}

/// Walks a plan's dependency graph, dispatching steps and streaming events.
pub struct Executor {
    dispatcher: Dispatcher,
    approvals: Arc<dyn ApprovalBroker>,
    synthesizer: Arc<dyn Synthesizer>,
    pacing: ExecutionConfig,
    approval_timeout: Duration,
    badges: HashMap<String, AgentBadge>,
}

enum Checkpoint {
    None,
    Approved,
    Rejected(String),
}

struct StepOutcome {
    step_id: String,
    result: String,
    checkpoint: Checkpoint,
}

#[derive(Clone)]
struct StepContext {
    task_id: String,
    dispatcher: Dispatcher,
    approvals: Arc<dyn ApprovalBroker>,
    emitter: EventEmitter,
    approval_timeout: Duration,
    step_delay: Duration,
}

impl Executor {
    pub fn new(
        dispatcher: Dispatcher,
        approvals: Arc<dyn ApprovalBroker>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        Self {
            dispatcher,
            approvals,
            synthesizer,
            pacing: ExecutionConfig::default(),
            approval_timeout: DEFAULT_APPROVAL_TIMEOUT,
            badges: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_pacing(mut self, pacing: ExecutionConfig) -> Self {
        self.pacing = pacing;
        self
    }

    #[must_use]
    pub fn with_approval_timeout(mut self, timeout: Duration) -> Self {
        self.approval_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_badges(mut self, badges: HashMap<String, AgentBadge>) -> Self {
        self.badges = badges;
        self
    }

    /// Run `request` on a background task and return its event stream.
    ///
    /// Dropping the receiver cancels the run.
    pub fn spawn(self: &Arc<Self>, mut request: ExecutionRequest) -> mpsc::Receiver<ExecutionEvent> {
        request.assign_task_id();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let executor = Arc::clone(self);
        tokio::spawn(async move {
            let task_id = request.plan.id.clone();
            match executor.execute(request, tx).await {
                Ok(ExecutionOutcome::Completed { results, .. }) => {
                    tracing::info!(task = %task_id, steps = results.len(), "execution complete");
                }
                Ok(ExecutionOutcome::Halted { reason, .. }) => {
                    tracing::warn!(task = %task_id, "execution halted: {reason}");
                }
                Err(e) => tracing::info!(task = %task_id, "execution stopped: {e}"),
            }
        });
        rx
    }

    pub async fn execute(
        &self,
        mut request: ExecutionRequest,
        tx: mpsc::Sender<ExecutionEvent>,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        request.assign_task_id();
        let ExecutionRequest { plan, graph } = request;
        let mut graph = graph.unwrap_or_else(|| {
            build_graph(&plan, &plan.user_message, plan_modality(&plan), &self.badges)
        });
        if graph.task_id.trim().is_empty() {
            graph.task_id.clone_from(&plan.id);
        }
        graph.status = GraphStatus::Executing;

        let emitter = EventEmitter::new(graph, tx, CancellationToken::new());
        let _consumer_watch = emitter.watch_consumer();
        emitter.graph_init().await?;

        if plan.is_empty() {
            emitter.complete(&plan.summary).await?;
            return Ok(ExecutionOutcome::Completed {
                summary: plan.summary.clone(),
                results: Vec::new(),
            });
        }

        tracing::info!(task = %plan.id, steps = plan.steps.len(), "executing plan");
        let (completed, results, rejected) = self.run_steps(&plan, &emitter).await?;

        if completed.len() < plan.steps.len() {
            let reason = halt_reason(&plan, &rejected);
            let (done, pending): (Vec<String>, Vec<String>) = plan
                .steps
                .iter()
                .map(|s| s.id.clone())
                .partition(|id| completed.contains_key(id));
            emitter.halt(&reason, done.clone(), pending.clone()).await?;
            return Ok(ExecutionOutcome::Halted {
                reason,
                completed: done,
                pending,
            });
        }

        let summary = self.finish(&plan, &emitter, &results).await?;
        Ok(ExecutionOutcome::Completed { summary, results })
    }

    #[allow(clippy::type_complexity)]
    async fn run_steps(
        &self,
        plan: &Plan,
        emitter: &EventEmitter,
    ) -> Result<(HashMap<String, String>, Vec<StepResult>, Vec<(String, String)>), ExecutionError>
    {
        let ctx = StepContext {
            task_id: plan.id.clone(),
            dispatcher: self.dispatcher.clone(),
            approvals: Arc::clone(&self.approvals),
            emitter: emitter.clone(),
            approval_timeout: self.approval_timeout,
            step_delay: self.pacing.step_delay(),
        };
        let max_parallel = self.pacing.max_parallel_steps.max(1);
        let cancel = emitter.cancel_token().clone();

        let mut completed: HashMap<String, String> = HashMap::new();
        let mut results = Vec::with_capacity(plan.steps.len());
        let mut rejected: Vec<(String, String)> = Vec::new();
        let mut started: HashSet<&str> = HashSet::new();
        let mut workers: JoinSet<Result<StepOutcome, ExecutionError>> = JoinSet::new();
        let mut running: HashMap<tokio::task::Id, String> = HashMap::new();

        loop {
            for step in &plan.steps {
                if workers.len() >= max_parallel {
                    break;
                }
                let ready = !started.contains(step.id.as_str())
                    && step.depends_on.iter().all(|d| completed.contains_key(d));
                if !ready {
                    continue;
                }
                started.insert(step.id.as_str());
                let upstream: Vec<(String, String)> = step
                    .depends_on
                    .iter()
                    .filter_map(|d| completed.get(d).map(|r| (d.clone(), r.clone())))
                    .collect();
                let handle = workers.spawn(run_step(ctx.clone(), step.clone(), upstream));
                running.insert(handle.id(), step.id.clone());
            }

            if workers.is_empty() {
                break;
            }

            let joined = tokio::select! {
                () = cancel.cancelled() => {
                    workers.shutdown().await;
                    return Err(ExecutionError::Disconnected);
                }
                joined = workers.join_next_with_id() => joined,
            };

            match joined {
                Some(Ok((id, Ok(outcome)))) => {
                    running.remove(&id);
                    match outcome.checkpoint {
                        Checkpoint::Rejected(reason) => {
                            tracing::info!(step = %outcome.step_id, "checkpoint rejected: {reason}");
                            rejected.push((outcome.step_id, reason));
                        }
                        Checkpoint::None | Checkpoint::Approved => {
                            if let Some(step) = plan.step(&outcome.step_id) {
                                results.push(StepResult {
                                    step_id: step.id.clone(),
                                    agent_id: step.agent_id.clone(),
                                    description: step.description.clone(),
                                    result: outcome.result.clone(),
                                });
                            }
                            completed.insert(outcome.step_id, outcome.result);
                        }
                    }
                }
                Some(Ok((_, Err(e)))) => {
                    workers.shutdown().await;
                    return Err(e);
                }
                Some(Err(join_error)) => {
                    let error = worker_failure(&mut running, &join_error);
                    workers.shutdown().await;
                    return Err(error);
                }
                None => break,
            }
        }

        Ok((completed, results, rejected))
    }

    async fn finish(
        &self,
        plan: &Plan,
        emitter: &EventEmitter,
        results: &[StepResult],
    ) -> Result<String, ExecutionError> {
        let output_edges = emitter.incoming_edges(OUTPUT_NODE_ID).await;
        emitter.edges_status(&output_edges, EdgeStatus::Active).await?;
        pause(self.pacing.output_delay()).await;
        emitter.edges_status(&output_edges, EdgeStatus::Completed).await?;
        emitter.node_status(OUTPUT_NODE_ID, NodeStatus::Running).await?;

        let input = SynthesisInput {
            request: plan.augmented_request(),
            plan_summary: plan.summary.clone(),
            results: results.to_vec(),
        };
        let summary = match self.synthesizer.synthesize(&input).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!("synthesizer returned nothing, concatenating step results");
                concat_summary(results)
            }
            Err(e) => {
                tracing::warn!("synthesis failed, concatenating step results: {e}");
                concat_summary(results)
            }
        };

        emitter.node_completed(OUTPUT_NODE_ID, &summary, None).await?;
        emitter.complete(&summary).await?;
        Ok(summary)
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

fn worker_failure(running: &mut HashMap<tokio::task::Id, String>, join_error: &JoinError) -> ExecutionError {
    let step_id = running.remove(&join_error.id()).unwrap_or_default();
    tracing::error!(step = %step_id, "step worker failed: {join_error}");
    ExecutionError::Worker {
        step_id,
        message: join_error.to_string(),
    }
}

fn halt_reason(plan: &Plan, rejected: &[(String, String)]) -> String {
    if let Some((step_id, reason)) = rejected.first() {
        return format!("checkpoint for step {step_id} was rejected: {reason}");
    }
    match DagContract::from_plan(plan).validate() {
        Err(e) => e.to_string(),
        Ok(()) => "no runnable steps remain".to_string(),
    }
}

#[allow(clippy::cast_possible_truncation)]
async fn run_step(
    ctx: StepContext,
    step: PlanStep,
    upstream: Vec<(String, String)>,
) -> Result<StepOutcome, ExecutionError> {
    let emitter = &ctx.emitter;
    let incoming = emitter.incoming_edges(&step.id).await;
    emitter.edges_status(&incoming, EdgeStatus::Active).await?;
    emitter.node_status(&step.id, NodeStatus::Running).await?;

    let started = Instant::now();
    let result = {
        let dispatcher = ctx.dispatcher.clone();
        let task_step = step.clone();
        // Own task so a panicking tool still yields a step result.
        match tokio::spawn(async move { dispatcher.dispatch(&task_step, &upstream).await }).await {
            Ok(result) => result,
            Err(e) => format!("Tool execution failed ({}): {e}", step.action),
        }
    };
    let duration_ms = started.elapsed().as_millis() as u64;

    emitter
        .node_completed(&step.id, &result, Some(duration_ms))
        .await?;
    emitter.edges_status(&incoming, EdgeStatus::Completed).await?;

    let checkpoint = if step.requires_approval {
        review(&ctx, &step, &result).await?
    } else {
        Checkpoint::None
    };

    pause(ctx.step_delay).await;
    Ok(StepOutcome {
        step_id: step.id,
        result,
        checkpoint,
    })
}

/// Closes an opened checkpoint on drop, including when the worker is aborted mid-wait.
struct OpenCheckpoint<'a> {
    broker: &'a dyn ApprovalBroker,
    request: &'a CheckpointRequest,
}

impl Drop for OpenCheckpoint<'_> {
    fn drop(&mut self) {
        self.broker.checkpoint_closed(self.request);
    }
}

async fn review(ctx: &StepContext, step: &PlanStep, result: &str) -> Result<Checkpoint, ExecutionError> {
    let emitter = &ctx.emitter;
    let request = CheckpointRequest::new(&ctx.task_id, step, result);
    let checkpoint_id = request.checkpoint_id.clone();

    ctx.approvals.checkpoint_opened(&request);
    let decision = {
        let _open = OpenCheckpoint {
            broker: ctx.approvals.as_ref(),
            request: &request,
        };
        emitter
            .node_status(&checkpoint_id, NodeStatus::AwaitingApproval)
            .await?;
        emitter.checkpoint_reached(&checkpoint_id, &step.id).await?;

        tokio::select! {
            () = emitter.cancel_token().cancelled() => return Err(ExecutionError::Disconnected),
            decided = tokio::time::timeout(ctx.approval_timeout, ctx.approvals.await_decision(&request)) => {
                match decided {
                    Ok(Ok(decision)) => decision,
                    Ok(Err(e)) => ApprovalDecision::rejected(format!("approval failed: {e}")),
                    Err(_) => ApprovalDecision::rejected("approval timed out"),
                }
            }
        }
    };

    match decision {
        ApprovalDecision::Approved => {
            emitter
                .node_status(&checkpoint_id, NodeStatus::Approved)
                .await?;
            let mut edges = emitter.incoming_edges(&checkpoint_id).await;
            edges.extend(emitter.outgoing_edges(&checkpoint_id).await);
            emitter.edges_status(&edges, EdgeStatus::Completed).await?;
            Ok(Checkpoint::Approved)
        }
        ApprovalDecision::Rejected { reason } => {
            emitter
                .node_status(&checkpoint_id, NodeStatus::Rejected)
                .await?;
            Ok(Checkpoint::Rejected(reason))
        }
    }
}
