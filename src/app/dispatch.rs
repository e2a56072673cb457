use crate::app::status::render_agents;
use crate::cli::{Cli, Commands};
use agentflow::Config;
use agentflow::agents::{AgentStore, JsonAgentStore};
use agentflow::engine::{ExecutionEvent, ExecutionRequest, WireFormat, encode};
use agentflow::gateway::{AppState, run_gateway};
use agentflow::planner::{Plan, PlanRequest};
use agentflow::security::{ApprovalBroker, AutoApproveBroker, CliApprovalBroker};
use anyhow::{Context, Result, bail};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

fn terminal_broker(config: &Config, manual: bool) -> Arc<dyn ApprovalBroker> {
    if manual {
        Arc::new(CliApprovalBroker::new(config.approval.timeout()))
    } else {
        Arc::new(AutoApproveBroker::new(config.approval.auto_approve_delay()))
    }
}

/// Run `plan` to completion, writing each event to stdout as one JSON line.
async fn stream_plan(state: &AppState, plan: Plan) -> Result<()> {
    let executor = Arc::new(state.executor().await);
    let mut rx = executor.spawn(ExecutionRequest::new(plan));

    let mut halted: Option<String> = None;
    let mut stdout = std::io::stdout().lock();
    while let Some(event) = rx.recv().await {
        if let ExecutionEvent::ExecutionHalted { reason, .. } = &event {
            halted = Some(reason.clone());
        }
        stdout.write_all(encode(&event, WireFormat::Ndjson)?.as_bytes())?;
        stdout.flush()?;
    }

    if let Some(reason) = halted {
        bail!("execution halted: {reason}");
    }
    Ok(())
}

async fn run_message(config: &Config, message: String, manual: bool) -> Result<()> {
    let mut state = AppState::from_config(config)?;
    state.broker = terminal_broker(config, manual);

    let plan = state
        .planner
        .plan(&PlanRequest::text(message))
        .await
        .context("planning failed")?;
    if plan.is_empty() {
        println!("{}", plan.summary);
        return Ok(());
    }
    info!(task = %plan.id, steps = plan.steps.len(), "executing plan");
    stream_plan(&state, plan).await
}

async fn execute_file(config: &Config, path: &Path, manual: bool) -> Result<()> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read plan file {}", path.display()))?;
    let plan: Plan = serde_json::from_str(&contents)
        .with_context(|| format!("invalid plan JSON in {}", path.display()))?;
    plan.validate()?;

    let mut state = AppState::from_config(config)?;
    state.broker = terminal_broker(config, manual);
    stream_plan(&state, plan).await
}

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Serve { host, port } => {
            let port = port.unwrap_or(config.gateway.port);
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            if port == 0 {
                info!("Starting AgentFlow gateway on {host} (random port)");
            } else {
                info!("Starting AgentFlow gateway on {host}:{port}");
            }
            run_gateway(&host, port, config).await
        }

        Commands::Run { message, manual } => run_message(&config, message, manual).await,

        Commands::Execute { plan, manual } => execute_file(&config, &plan, manual).await,

        Commands::Agents => {
            let store = JsonAgentStore::load(config.agents_file())?;
            println!("{}", render_agents(&config, &store.list().await));
            Ok(())
        }
    }
}
