//! Axum HTTP gateway: chat planning, streamed execution, checkpoint approval
//! and agent management for the web client.
//!
//! - Request body size limit (1MB; plans travel with their graph)
//! - Request timeout on handlers (streamed bodies are not cut off)
//! - CORS for the browser client

mod handlers;
mod stream;

use handlers::{
    handle_approve, handle_approval_status, handle_chat, handle_create_agent, handle_delete_agent,
    handle_execute, handle_health, handle_list_agents, handle_update_agent,
};

use crate::agents::{AgentStore, JsonAgentStore, agent_badges, agent_default_tools};
use crate::config::{Config, ExecutionConfig, GatewayConfig};
use crate::dispatch::Dispatcher;
use crate::engine::{ConcatSynthesizer, Executor, LlmSynthesizer, Synthesizer};
use crate::planner::{LlmPlanner, Planner};
use crate::providers;
use crate::security::approval::{ApprovalBroker, ApprovalHub, broker_for_mode};
use crate::tools::{ToolRegistry, research_tools};
use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderValue, StatusCode},
    routing::{get, post, put},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (1MB)
pub const MAX_BODY_SIZE: usize = 1_048_576;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<dyn Planner>,
    pub agents: Arc<dyn AgentStore>,
    /// Research tools; agent defaults are added per execution from the store.
    pub tools: ToolRegistry,
    pub approvals: Arc<ApprovalHub>,
    pub broker: Arc<dyn ApprovalBroker>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub execution: ExecutionConfig,
    pub approval_timeout: Duration,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let agents_path = config.agents_file();
        let agents: Arc<dyn AgentStore> = Arc::new(
            JsonAgentStore::load(&agents_path)
                .with_context(|| format!("failed to load agents from {}", agents_path.display()))?,
        );

        let provider = providers::create_provider(config);
        let planner: Arc<dyn Planner> = Arc::new(LlmPlanner::new(
            Arc::clone(&provider),
            Arc::clone(&agents),
            config.default_model.clone(),
            config.default_temperature,
        ));
        let synthesizer: Arc<dyn Synthesizer> = if config.has_api_key() {
            Arc::new(LlmSynthesizer::new(
                provider,
                config.default_model.clone(),
                config.default_temperature,
            ))
        } else {
            tracing::warn!("no API key configured, final summaries will concatenate step results");
            Arc::new(ConcatSynthesizer)
        };

        let approvals = Arc::new(ApprovalHub::new());
        let broker = broker_for_mode(&config.approval, &approvals);

        Ok(Self {
            planner,
            agents,
            tools: research_tools(&config.tools),
            approvals,
            broker,
            synthesizer,
            execution: config.execution.clone(),
            approval_timeout: config.approval.timeout(),
        })
    }

    /// Executor wired to the current agent registry.
    pub async fn executor(&self) -> Executor {
        let agents = self.agents.list().await;
        let mut tools = self.tools.clone();
        tools.extend_agent_defaults(agent_default_tools(&agents));

        Executor::new(
            Dispatcher::new(tools),
            Arc::clone(&self.broker),
            Arc::clone(&self.synthesizer),
        )
        .with_pacing(self.execution.clone())
        .with_approval_timeout(self.approval_timeout)
        .with_badges(agent_badges(&agents))
    }
}

fn cors_layer(config: &GatewayConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allows_any_origin() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

pub fn router(state: AppState, config: &GatewayConfig) -> Router {
    Router::new()
        .route("/api/health", get(handle_health))
        .route("/api/chat", post(handle_chat))
        .route("/api/execute", post(handle_execute))
        .route(
            "/api/approve/{step_id}",
            post(handle_approve).get(handle_approval_status),
        )
        .route(
            "/api/agents",
            get(handle_list_agents).post(handle_create_agent),
        )
        .route(
            "/api/agents/{agent_id}",
            put(handle_update_agent).delete(handle_delete_agent),
        )
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ))
        .layer(cors_layer(config))
}

/// Run the HTTP gateway on `host:port`.
pub async fn run_gateway(host: &str, port: u16, config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid gateway address {host}:{port}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    run_gateway_with_listener(listener, config).await
}

/// Run the HTTP gateway from a pre-bound listener.
pub async fn run_gateway_with_listener(
    listener: tokio::net::TcpListener,
    config: Config,
) -> Result<()> {
    let state = AppState::from_config(&config)?;
    serve(listener, state, &config.gateway).await
}

pub async fn serve(
    listener: tokio::net::TcpListener,
    state: AppState,
    config: &GatewayConfig,
) -> Result<()> {
    let addr = listener.local_addr()?;
    println!("◆ AgentFlow gateway listening on http://{addr}");
    println!("  GET  /api/health");
    println!("  POST /api/chat");
    println!("  POST /api/execute        → text/event-stream");
    println!("  POST /api/approve/{{stepId}}");
    println!("  GET  /api/agents");
    println!("  Press Ctrl+C to stop.\n");
    tracing::info!(%addr, "gateway started");

    axum::serve(listener, router(state, config))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
