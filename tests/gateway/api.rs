use std::sync::Arc;
use std::time::Duration;

use agentflow::agents::{AgentStore, JsonAgentStore};
use agentflow::config::{ExecutionConfig, GatewayConfig, ToolsConfig};
use agentflow::engine::{ConcatSynthesizer, ExecutionEvent};
use agentflow::gateway::{AppState, serve};
use agentflow::planner::{Plan, PlanRequest, PlanStep, Planner};
use agentflow::security::{ApprovalBroker, ApprovalHub};
use agentflow::tools::research_tools;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tempfile::TempDir;

/// Planner that always answers with the same plan.
struct FixedPlanner(Plan);

#[async_trait]
impl Planner for FixedPlanner {
    async fn plan(&self, request: &PlanRequest) -> anyhow::Result<Plan> {
        let mut plan = self.0.clone();
        plan.id = "task-1".into();
        plan.user_message = request.user_message.clone();
        Ok(plan)
    }
}

struct GatewayTestServer {
    port: u16,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
    _workspace: TempDir,
}

impl GatewayTestServer {
    async fn start(plan: Plan) -> Self {
        let workspace = TempDir::new().expect("temp workspace should be created");
        let agents: Arc<dyn AgentStore> = Arc::new(
            JsonAgentStore::load(workspace.path().join("agents.json"))
                .expect("agent store should load"),
        );
        let approvals = Arc::new(ApprovalHub::new());
        let broker: Arc<dyn ApprovalBroker> = approvals.clone();

        let state = AppState {
            planner: Arc::new(FixedPlanner(plan)),
            agents,
            tools: research_tools(&ToolsConfig::default()),
            approvals,
            broker,
            synthesizer: Arc::new(ConcatSynthesizer),
            execution: ExecutionConfig::unpaced(4),
            approval_timeout: Duration::from_secs(5),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral gateway listener should bind");
        let port = listener
            .local_addr()
            .expect("listener should expose local address")
            .port();
        let handle = tokio::spawn(async move {
            serve(listener, state, &GatewayConfig::default()).await
        });

        Self {
            port,
            handle,
            _workspace: workspace,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }
}

impl Drop for GatewayTestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("reqwest client should be built")
}

/// A plan whose only step resolves to no tool, so it runs without network access.
fn offline_plan() -> Plan {
    Plan::new(
        "Offline check",
        vec![PlanStep::new("step_1", "ghost", "no_such_tool").with_description("nothing")],
    )
}

fn sse_events(body: &str) -> Vec<ExecutionEvent> {
    body.split("\n\n")
        .filter_map(|frame| frame.strip_prefix("data: "))
        .map(|json| serde_json::from_str(json).expect("frame should be an execution event"))
        .collect()
}

#[tokio::test]
async fn health_reports_app_name() {
    let server = GatewayTestServer::start(offline_plan()).await;
    let body: Value = client()
        .get(server.url("/api/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"status": "ok", "app": "AgentFlow"}));
}

/// Events from the complete frames received so far.
fn complete_sse_events(body: &str) -> Vec<ExecutionEvent> {
    sse_events(&body[..body.rfind("\n\n").map_or(0, |i| i + 2)])
}

/// Read the execute stream until the run pauses at a checkpoint; returns its task id.
async fn read_until_checkpoint(response: &mut reqwest::Response, body: &mut String) -> String {
    loop {
        let chunk = response
            .chunk()
            .await
            .unwrap()
            .expect("stream should stay open until the checkpoint");
        body.push_str(&String::from_utf8_lossy(&chunk));
        let events = complete_sse_events(body);
        if events.iter().any(|e| e.kind() == "checkpoint_reached") {
            let Some(ExecutionEvent::GraphInit { graph }) = events.first() else {
                panic!("stream should open with graph_init");
            };
            return graph.task_id.clone();
        }
    }
}

#[tokio::test]
async fn approval_round_trip() {
    let server = GatewayTestServer::start(offline_plan()).await;
    let client = client();

    let unknown = client
        .post(server.url("/api/approve/step_1"))
        .json(&json!({"approved": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let plan = Plan::new(
        "Offline review",
        vec![
            PlanStep::new("step_1", "ghost", "no_such_tool")
                .with_description("nothing")
                .with_approval(),
        ],
    );
    let mut stream = client
        .post(server.url("/api/execute"))
        .json(&json!({"plan": plan}))
        .send()
        .await
        .unwrap();
    let mut body = String::new();
    let task_id = read_until_checkpoint(&mut stream, &mut body).await;
    assert!(!task_id.is_empty());

    let pending: Value = client
        .get(server.url(&format!("/api/approve/step_1?taskId={task_id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(pending, json!({"stepId": "step_1", "status": "pending"}));

    let ack: Value = client
        .post(server.url("/api/approve/step_1"))
        .json(&json!({"approved": false, "comment": "needs sources", "taskId": task_id}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        ack,
        json!({"stepId": "step_1", "taskId": task_id, "approved": false, "comment": "needs sources"})
    );

    while let Some(chunk) = stream.chunk().await.unwrap() {
        body.push_str(&String::from_utf8_lossy(&chunk));
    }
    match sse_events(&body).last().unwrap() {
        ExecutionEvent::ExecutionHalted { reason, .. } => {
            assert_eq!(reason, "checkpoint for step step_1 was rejected: needs sources");
        }
        other => panic!("unexpected terminal event {other:?}"),
    }

    let status: Value = client
        .get(server.url("/api/approve/step_1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "rejected");
}

#[tokio::test]
async fn status_of_an_unknown_step_is_pending() {
    let server = GatewayTestServer::start(offline_plan()).await;
    let pending: Value = client()
        .get(server.url("/api/approve/step_9"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(pending, json!({"stepId": "step_9", "status": "pending"}));
}

#[tokio::test]
async fn malformed_approval_body_is_rejected() {
    let server = GatewayTestServer::start(offline_plan()).await;
    let response = client()
        .post(server.url("/api/approve/step_1"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_returns_plan_and_graph() {
    let server = GatewayTestServer::start(offline_plan()).await;
    let body: Value = client()
        .post(server.url("/api/chat"))
        .json(&json!({"message": "check offline"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["plan"]["id"], "task-1");
    assert_eq!(body["plan"]["steps"][0]["id"], "step_1");
    let node_ids: Vec<&str> = body["graph"]["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap())
        .collect();
    assert_eq!(node_ids, vec!["input", "orchestrator", "step_1", "output"]);
    assert_eq!(body["graph"]["status"], "planning");
    assert!(body["message"].as_str().unwrap().starts_with("**Offline check**"));
}

#[tokio::test]
async fn chat_without_steps_returns_only_a_message() {
    let server = GatewayTestServer::start(Plan::new("Hello there!", vec![])).await;
    let body: Value = client()
        .post(server.url("/api/chat"))
        .json(&json!({"message": "hi"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        body,
        json!({"message": "Hello there!", "plan": null, "graph": null})
    );
}

#[tokio::test]
async fn execute_streams_events_until_completion() {
    let server = GatewayTestServer::start(offline_plan()).await;
    let response = client()
        .post(server.url("/api/execute"))
        .json(&json!({"plan": offline_plan()}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
    let events = sse_events(&response.text().await.unwrap());

    assert_eq!(events.first().unwrap().kind(), "graph_init");
    match events.last().unwrap() {
        ExecutionEvent::ExecutionComplete { summary, .. } => {
            assert!(summary.contains("Unknown action: no_such_tool"));
        }
        other => panic!("unexpected terminal event {other:?}"),
    }
}

#[tokio::test]
async fn execute_rejects_duplicate_step_ids() {
    let server = GatewayTestServer::start(offline_plan()).await;
    let plan = Plan::new(
        "dup",
        vec![
            PlanStep::new("s", "x", "a"),
            PlanStep::new("s", "x", "b"),
        ],
    );
    let response = client()
        .post(server.url("/api/execute"))
        .json(&json!({"plan": plan}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "duplicate step id: s");
}

#[tokio::test]
async fn agent_registry_crud() {
    let server = GatewayTestServer::start(offline_plan()).await;
    let client = client();

    let agents: Vec<Value> = client
        .get(server.url("/api/agents"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(agents.len(), 3);

    let created: Value = client
        .post(server.url("/api/agents"))
        .json(&json!({"id": "scout", "name": "Scout", "capabilities": ["wiki_search"]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created["id"], "scout");

    let updated: Value = client
        .put(server.url("/api/agents/scout"))
        .json(&json!({"id": "scout", "name": "Scout II"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["name"], "Scout II");

    let missing = client
        .put(server.url("/api/agents/nobody"))
        .json(&json!({"id": "nobody"}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let deleted: Value = client
        .delete(server.url("/api/agents/scout"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(deleted, json!({"ok": true}));

    let gone = client
        .delete(server.url("/api/agents/scout"))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    let body: Value = gone.json().await.unwrap();
    assert_eq!(body["error"], "Agent not found");
}
