use crate::error::PlanError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};

/// How the user delivered the request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InputModality {
    #[default]
    Text,
    Voice,
    Image,
}

impl InputModality {
    /// One-line hint for the planner prompt.
    pub fn note(self) -> &'static str {
        match self {
            Self::Text => "The user typed this request.",
            Self::Voice => "The user spoke this request via voice input.",
            Self::Image => {
                "The user provided an image along with their request. \
                 The image has been analyzed and the analysis is included above."
            }
        }
    }
}

/// One unit of work assigned to an agent.
///
/// Accepts both the camelCase wire spelling and the snake_case spelling
/// produced by planners; always serializes as camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub id: String,
    #[serde(default, alias = "agent_id")]
    pub agent_id: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "params")]
    pub parameters: Map<String, Value>,
    #[serde(default, alias = "requires_approval")]
    pub requires_approval: bool,
    #[serde(default, alias = "depends_on")]
    pub depends_on: Vec<String>,
}

impl PlanStep {
    pub fn new(id: impl Into<String>, agent_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            action: action.into(),
            description: String::new(),
            parameters: Map::new(),
            requires_approval: false,
            depends_on: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn depending_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_approval(mut self) -> Self {
        self.requires_approval = true;
        self
    }

    /// Node id of the checkpoint guarding this step.
    pub fn checkpoint_id(&self) -> String {
        format!("checkpoint_{}", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, alias = "user_message")]
    pub user_message: String,
    #[serde(default)]
    pub steps: Vec<PlanStep>,
    #[serde(default, alias = "image_analysis", skip_serializing_if = "Option::is_none")]
    pub image_analysis: Option<String>,
    #[serde(default, alias = "audio_transcript", skip_serializing_if = "Option::is_none")]
    pub audio_transcript: Option<String>,
    #[serde(default, alias = "created_at", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Plan {
    pub fn new(summary: impl Into<String>, steps: Vec<PlanStep>) -> Self {
        Self {
            id: String::new(),
            summary: summary.into(),
            user_message: String::new(),
            steps,
            image_analysis: None,
            audio_transcript: None,
            created_at: None,
        }
    }

    /// Short random id for a new task.
    pub fn new_task_id() -> String {
        let mut id = uuid::Uuid::new_v4().simple().to_string();
        id.truncate(8);
        id
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, id: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|step| step.id == id)
    }

    pub fn step_index(&self) -> HashMap<&str, usize> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| (step.id.as_str(), index))
            .collect()
    }

    /// Ids of steps that no other step depends on.
    pub fn sink_ids(&self) -> BTreeSet<&str> {
        let depended_on: BTreeSet<&str> = self
            .steps
            .iter()
            .flat_map(|step| step.depends_on.iter().map(String::as_str))
            .collect();
        self.steps
            .iter()
            .map(|step| step.id.as_str())
            .filter(|id| !depended_on.contains(id))
            .collect()
    }

    /// Structural checks that must hold before execution: non-empty, unique step ids.
    pub fn validate(&self) -> Result<(), PlanError> {
        let mut seen = BTreeSet::new();
        for step in &self.steps {
            if step.id.trim().is_empty() {
                return Err(PlanError::EmptyStepId);
            }
            if !seen.insert(step.id.as_str()) {
                return Err(PlanError::DuplicateStep(step.id.clone()));
            }
        }
        Ok(())
    }

    /// The request text handed to the synthesizer, with multimodal context appended.
    pub fn augmented_request(&self) -> String {
        let mut request = self.user_message.clone();
        if let Some(image) = self.image_analysis.as_deref().filter(|s| !s.is_empty()) {
            request.push_str(&format!("\n\n[Image analysis: {image}]"));
        }
        if let Some(transcript) = self
            .audio_transcript
            .as_deref()
            .filter(|s| !s.is_empty() && *s != self.user_message)
        {
            request.push_str(&format!("\n\n[Audio transcript: {transcript}]"));
        }
        request
    }
}
