use super::AppState;
use super::stream::sse_response;
use crate::agents::{AgentProfile, agent_badges};
use crate::engine::ExecutionRequest;
use crate::error::{ApprovalError, LlmError, PlanError};
use crate::graph::{ExecutionGraph, build_graph};
use crate::planner::{InputModality, Plan, PlanRequest};
use crate::utils::truncate_chars;
use axum::{
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"error": message.into()}))).into_response()
}

fn invalid_json(e: &JsonRejection) -> Response {
    error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON: {e}"))
}

/// GET /api/health
pub(super) async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok", "app": "AgentFlow"}))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ChatBody {
    #[serde(default)]
    pub message: String,
    #[serde(default, alias = "image_analysis")]
    pub image_analysis: Option<String>,
    #[serde(default, alias = "audio_transcript")]
    pub audio_transcript: Option<String>,
    #[serde(default, alias = "input_modality")]
    pub input_modality: Option<InputModality>,
}

impl ChatBody {
    fn into_plan_request(self) -> PlanRequest {
        let image_analysis = self.image_analysis.filter(|s| !s.trim().is_empty());
        let audio_transcript = self.audio_transcript.filter(|s| !s.trim().is_empty());

        let input_modality = if audio_transcript.is_some() {
            InputModality::Voice
        } else if image_analysis.is_some() {
            InputModality::Image
        } else {
            self.input_modality.unwrap_or_default()
        };

        let user_message = if !self.message.trim().is_empty() {
            self.message
        } else if let Some(transcript) = &audio_transcript {
            transcript.clone()
        } else if image_analysis.is_some() {
            "Analyze this image".to_string()
        } else {
            "Hello".to_string()
        };

        PlanRequest {
            user_message,
            image_analysis,
            audio_transcript,
            input_modality,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ChatReply {
    pub message: String,
    pub plan: Option<Plan>,
    pub graph: Option<ExecutionGraph>,
}

fn chat_message(plan: &Plan, request: &PlanRequest, agents: &[AgentProfile]) -> String {
    let mut agent_ids: Vec<&str> = Vec::new();
    for step in &plan.steps {
        if !agent_ids.contains(&step.agent_id.as_str()) {
            agent_ids.push(&step.agent_id);
        }
    }
    let names: Vec<&str> = agent_ids
        .iter()
        .filter_map(|id| agents.iter().find(|a| a.id == *id))
        .map(|a| a.name.as_str())
        .collect();

    let note = match request.input_modality {
        InputModality::Voice => request
            .audio_transcript
            .as_deref()
            .map(|t| format!("\n\n*Transcribed from voice:* \"{t}\""))
            .unwrap_or_default(),
        InputModality::Image => request
            .image_analysis
            .as_deref()
            .map(|a| format!("\n\n*From image analysis:* {}...", truncate_chars(a, 200)))
            .unwrap_or_default(),
        InputModality::Text => String::new(),
    };

    format!(
        "**{}** — {} step(s) via {}.{note}",
        plan.summary,
        plan.steps.len(),
        names.join(", ")
    )
}

/// POST /api/chat: plan a request and return the plan with its graph
pub(super) async fn handle_chat(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return invalid_json(&e),
    };
    let request = body.into_plan_request();

    let plan = match state.planner.plan(&request).await {
        Ok(plan) => plan,
        Err(e) => {
            tracing::warn!("planning failed: {e:#}");
            let status = if e.downcast_ref::<LlmError>().is_some()
                || e.downcast_ref::<PlanError>().is_some()
            {
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            return error_response(status, format!("Planning failed: {e}"));
        }
    };

    if plan.is_empty() {
        return Json(ChatReply {
            message: plan.summary,
            plan: None,
            graph: None,
        })
        .into_response();
    }

    let agents = state.agents.list().await;
    let graph = build_graph(
        &plan,
        &request.user_message,
        request.input_modality,
        &agent_badges(&agents),
    );
    tracing::info!(task = %plan.id, steps = plan.steps.len(), "plan ready");

    Json(ChatReply {
        message: chat_message(&plan, &request, &agents),
        plan: Some(plan),
        graph: Some(graph),
    })
    .into_response()
}

#[derive(Debug, Deserialize)]
pub(super) struct ExecuteBody {
    pub plan: Plan,
    #[serde(default)]
    pub graph: Option<ExecutionGraph>,
}

/// POST /api/execute: run a plan, streaming graph updates as SSE
pub(super) async fn handle_execute(
    State(state): State<AppState>,
    body: Result<Json<ExecuteBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return invalid_json(&e),
    };
    if let Err(e) = body.plan.validate() {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }

    let mut request = ExecutionRequest::new(body.plan);
    if let Some(graph) = body.graph {
        request = request.with_graph(graph);
    }

    let executor = Arc::new(state.executor().await);
    sse_response(executor.spawn(request))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApproveBody {
    pub approved: bool,
    #[serde(default)]
    pub comment: String,
    #[serde(default, alias = "task_id")]
    pub task_id: Option<String>,
}

/// Optional `?taskId=` scoping a step id to one execution.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TaskQuery {
    #[serde(default, alias = "task_id")]
    pub task_id: Option<String>,
}

fn approval_error(e: &ApprovalError) -> Response {
    let status = match e {
        ApprovalError::NotFound(_) => StatusCode::NOT_FOUND,
        ApprovalError::Ambiguous { .. } => StatusCode::CONFLICT,
    };
    error_response(status, e.to_string())
}

/// POST /api/approve/{stepId}: resolve an open checkpoint.
///
/// `taskId` (body or query) picks the execution; without it the step id
/// must belong to exactly one waiting execution.
pub(super) async fn handle_approve(
    State(state): State<AppState>,
    Path(step_id): Path<String>,
    Query(query): Query<TaskQuery>,
    body: Result<Json<ApproveBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return invalid_json(&e),
    };
    let task_id = body.task_id.as_deref().or(query.task_id.as_deref());
    match state
        .approvals
        .resolve(task_id, &step_id, body.approved, &body.comment)
    {
        Ok(record) => Json(json!({
            "stepId": step_id,
            "taskId": record.task_id,
            "approved": body.approved,
            "comment": body.comment,
        }))
        .into_response(),
        Err(e) => approval_error(&e),
    }
}

/// GET /api/approve/{stepId}
pub(super) async fn handle_approval_status(
    State(state): State<AppState>,
    Path(step_id): Path<String>,
    Query(query): Query<TaskQuery>,
) -> Response {
    match state.approvals.status(query.task_id.as_deref(), &step_id) {
        Ok(status) => Json(json!({"stepId": step_id, "status": status})).into_response(),
        Err(e) => approval_error(&e),
    }
}

/// GET /api/agents
pub(super) async fn handle_list_agents(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.agents.list().await)
}

/// POST /api/agents: create or replace by id
pub(super) async fn handle_create_agent(
    State(state): State<AppState>,
    body: Result<Json<AgentProfile>, JsonRejection>,
) -> Response {
    let Json(profile) = match body {
        Ok(b) => b,
        Err(e) => return invalid_json(&e),
    };
    if profile.id.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Agent id cannot be empty");
    }
    match state.agents.create(profile).await {
        Ok(created) => Json(created).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")),
    }
}

/// PUT /api/agents/{agentId}
pub(super) async fn handle_update_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    body: Result<Json<AgentProfile>, JsonRejection>,
) -> Response {
    let Json(profile) = match body {
        Ok(b) => b,
        Err(e) => return invalid_json(&e),
    };
    match state.agents.update(&agent_id, profile).await {
        Ok(Some(updated)) => Json(updated).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Agent not found"),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")),
    }
}

/// DELETE /api/agents/{agentId}
pub(super) async fn handle_delete_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Response {
    match state.agents.delete(&agent_id).await {
        Ok(true) => Json(json!({"ok": true})).into_response(),
        Ok(false) => error_response(StatusCode::NOT_FOUND, "Agent not found"),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::builtin_agents;
    use crate::planner::PlanStep;

    #[test]
    fn voice_transcript_stands_in_for_empty_message() {
        let body: ChatBody = serde_json::from_value(json!({
            "message": "",
            "audioTranscript": "find papers on protein folding"
        }))
        .unwrap();
        let request = body.into_plan_request();
        assert_eq!(request.user_message, "find papers on protein folding");
        assert_eq!(request.input_modality, InputModality::Voice);
    }

    #[test]
    fn image_only_request_gets_placeholder_message() {
        let body: ChatBody =
            serde_json::from_value(json!({"image_analysis": "a chart of GPU prices"})).unwrap();
        let request = body.into_plan_request();
        assert_eq!(request.user_message, "Analyze this image");
        assert_eq!(request.input_modality, InputModality::Image);
    }

    #[test]
    fn empty_request_says_hello() {
        let body: ChatBody = serde_json::from_value(json!({})).unwrap();
        let request = body.into_plan_request();
        assert_eq!(request.user_message, "Hello");
        assert_eq!(request.input_modality, InputModality::Text);
    }

    #[test]
    fn chat_message_names_agents_once_in_step_order() {
        let plan = Plan::new(
            "Survey diffusion models",
            vec![
                PlanStep::new("s1", "wikipedia", "wiki_search"),
                PlanStep::new("s2", "arxiv", "arxiv_search"),
                PlanStep::new("s3", "arxiv", "arxiv_summarize"),
                PlanStep::new("s4", "ghost", "x"),
            ],
        );
        let request = PlanRequest::text("diffusion");
        let message = chat_message(&plan, &request, &builtin_agents());
        let wiki = builtin_agents()
            .into_iter()
            .find(|a| a.id == "wikipedia")
            .unwrap()
            .name;
        let arxiv = builtin_agents()
            .into_iter()
            .find(|a| a.id == "arxiv")
            .unwrap()
            .name;
        assert_eq!(
            message,
            format!("**Survey diffusion models** — 4 step(s) via {wiki}, {arxiv}.")
        );
    }

    #[test]
    fn approve_body_accepts_either_task_id_spelling() {
        let camel: ApproveBody =
            serde_json::from_value(json!({"approved": true, "taskId": "t1"})).unwrap();
        let snake: ApproveBody =
            serde_json::from_value(json!({"approved": false, "task_id": "t2"})).unwrap();
        assert_eq!(camel.task_id.as_deref(), Some("t1"));
        assert_eq!(snake.task_id.as_deref(), Some("t2"));
        assert!(serde_json::from_value::<ApproveBody>(json!({"approved": true}))
            .unwrap()
            .task_id
            .is_none());
    }

    #[test]
    fn approval_errors_map_to_statuses() {
        let missing = approval_error(&ApprovalError::NotFound("s".into()));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        let ambiguous = approval_error(&ApprovalError::Ambiguous {
            step_id: "s".into(),
            task_ids: vec!["a".into(), "b".into()],
        });
        assert_eq!(ambiguous.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn image_note_is_truncated() {
        let plan = Plan::new("s", vec![PlanStep::new("s1", "arxiv", "arxiv_search")]);
        let request = PlanRequest {
            user_message: "m".into(),
            image_analysis: Some("x".repeat(300)),
            audio_transcript: None,
            input_modality: InputModality::Image,
        };
        let message = chat_message(&plan, &request, &[]);
        assert!(message.ends_with(&format!("\n\n*From image analysis:* {}...", "x".repeat(200))));
    }
}
