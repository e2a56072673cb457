use crate::providers::Provider;
use async_trait::async_trait;
use std::fmt::Write;
use std::sync::Arc;

/// A completed step's contribution to the final answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub step_id: String,
    pub agent_id: String,
    pub description: String,
    pub result: String,
}

#[derive(Debug, Clone)]
pub struct SynthesisInput {
    /// User request with image and audio context appended.
    pub request: String,
    pub plan_summary: String,
    /// Completion order.
    pub results: Vec<StepResult>,
}

#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, input: &SynthesisInput) -> anyhow::Result<String>;
}

/// `### {description}\n\n{result}` sections separated by `\n\n---\n\n`.
pub fn concat_summary(results: &[StepResult]) -> String {
    results
        .iter()
        .map(|step| {
            let heading = if step.description.is_empty() {
                step.step_id.as_str()
            } else {
                step.description.as_str()
            };
            format!("### {heading}\n\n{}", step.result)
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Deterministic synthesizer, used when no provider is configured.
pub struct ConcatSynthesizer;

#[async_trait]
impl Synthesizer for ConcatSynthesizer {
    async fn synthesize(&self, input: &SynthesisInput) -> anyhow::Result<String> {
        Ok(concat_summary(&input.results))
    }
}

const SYSTEM_PROMPT: &str = "You are AgentFlow's research assistant. Several specialist agents \
worked on the user's request. Combine their findings into one clear, well-structured markdown \
answer. Cite paper titles and URLs that appear in the findings. Do not invent sources.";

pub struct LlmSynthesizer {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f64,
}

impl LlmSynthesizer {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f64) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
        }
    }

    fn prompt(input: &SynthesisInput) -> String {
        let mut prompt = format!(
            "User request:\n{}\n\nPlan: {}\n\nFindings:\n",
            input.request, input.plan_summary
        );
        for step in &input.results {
            let _ = write!(
                prompt,
                "\n## {} ({})\n{}\n",
                step.description, step.agent_id, step.result
            );
        }
        prompt
    }
}

#[async_trait]
impl Synthesizer for LlmSynthesizer {
    async fn synthesize(&self, input: &SynthesisInput) -> anyhow::Result<String> {
        self.provider
            .chat_with_system(
                Some(SYSTEM_PROMPT),
                &Self::prompt(input),
                &self.model,
                self.temperature,
            )
            .await
    }
}
