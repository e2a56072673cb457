use super::{InputModality, Plan, PlanParser};
use crate::agents::AgentStore;
use crate::providers::Provider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Everything the planner gets to see about a user request.
#[derive(Debug, Clone, Default)]
pub struct PlanRequest {
    pub user_message: String,
    pub image_analysis: Option<String>,
    pub audio_transcript: Option<String>,
    pub input_modality: InputModality,
}

impl PlanRequest {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            user_message: message.into(),
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, request: &PlanRequest) -> Result<Plan>;
}

const PLANNER_SYSTEM_PROMPT: &str = "You are a concise research librarian orchestrating an \
academic research team. You break requests into discrete steps and assign each to the most \
appropriate specialized agent. When results may be incomplete, say so.";

/// Planner backed by a chat completion provider.
pub struct LlmPlanner {
    provider: Arc<dyn Provider>,
    agents: Arc<dyn AgentStore>,
    model: String,
    temperature: f64,
}

impl LlmPlanner {
    pub fn new(
        provider: Arc<dyn Provider>,
        agents: Arc<dyn AgentStore>,
        model: impl Into<String>,
        temperature: f64,
    ) -> Self {
        Self {
            provider,
            agents,
            model: model.into(),
            temperature,
        }
    }

    async fn build_prompt(&self, request: &PlanRequest) -> String {
        let mut context_parts = vec![format!("User request: {}", request.user_message)];
        if let Some(image) = request.image_analysis.as_deref().filter(|s| !s.is_empty()) {
            context_parts.push(format!("[Image analysis: {image}]"));
        }
        if let Some(transcript) = request
            .audio_transcript
            .as_deref()
            .filter(|s| !s.is_empty() && *s != request.user_message)
        {
            context_parts.push(format!("[Audio transcript: {transcript}]"));
        }

        let agents: Vec<_> = self
            .agents
            .list()
            .await
            .into_iter()
            .filter(|a| a.enabled)
            .collect();
        let agent_lines = agents
            .iter()
            .map(|a| format!("- {}: {} (capabilities: {})", a.id, a.role, a.capabilities.join(", ")))
            .collect::<Vec<_>>()
            .join("\n");
        let agent_ids = agents
            .iter()
            .map(|a| a.id.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Analyze the following user request and create a structured execution plan.\n\n\
             {context}\n\n\
             Input modality: {modality}\n{note}\n\n\
             Available agents:\n{agent_lines}\n\n\
             Rules:\n\
             - These are research agents. Set requires_approval=false unless the user asks to review a step.\n\
             - If steps are independent, leave depends_on empty so they can run in parallel.\n\
             - If a step needs output from another step, add that step's id to depends_on.\n\
             - Use step ids like \"step_1\", \"step_2\".\n\
             - agent_id must be one of: {agent_ids}\n\
             - action must be one of the chosen agent's capabilities.\n\
             - If image analysis is provided, use it to inform search queries and proposal topics.\n\
             - If audio was transcribed, treat the transcript as the primary user intent.\n\n\
             {schema}",
            context = context_parts.join("\n\n"),
            modality = request.input_modality,
            note = request.input_modality.note(),
            schema = PlanParser::schema_prompt(),
        )
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn plan(&self, request: &PlanRequest) -> Result<Plan> {
        let prompt = self.build_prompt(request).await;
        let reply = self
            .provider
            .chat_with_system(Some(PLANNER_SYSTEM_PROMPT), &prompt, &self.model, self.temperature)
            .await
            .context("planner request failed")?;

        let mut plan = PlanParser::parse_reply(&reply)?;
        plan.id = Plan::new_task_id();
        plan.user_message.clone_from(&request.user_message);
        plan.image_analysis.clone_from(&request.image_analysis);
        plan.audio_transcript.clone_from(&request.audio_transcript);
        plan.created_at = Some(Utc::now());

        tracing::info!(plan_id = %plan.id, steps = plan.steps.len(), "plan created");
        Ok(plan)
    }
}
