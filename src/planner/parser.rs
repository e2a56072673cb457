use super::{Plan, PlanStep};
use crate::error::PlanError;
use serde::Deserialize;

pub struct PlanParser;

#[derive(Deserialize)]
struct RawPlan {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    steps: Vec<PlanStep>,
}

impl PlanParser {
    pub fn schema_prompt() -> &'static str {
        concat!(
            "Respond with a JSON object in this exact format:\n",
            "{\n",
            "  \"summary\": \"<one sentence describing the plan>\",\n",
            "  \"steps\": [\n",
            "    {\n",
            "      \"id\": \"step_1\",\n",
            "      \"agent_id\": \"<agent id>\",\n",
            "      \"action\": \"<tool name>\",\n",
            "      \"description\": \"<what this step does>\",\n",
            "      \"params\": { \"<parameter>\": \"<value>\" },\n",
            "      \"requires_approval\": false,\n",
            "      \"depends_on\": [\"<step ids this step needs>\"]\n",
            "    }\n",
            "  ]\n",
            "}\n\n",
            "If the request needs no research, return an empty \"steps\" list and answer ",
            "the user in \"summary\".\n",
            "Wrap the JSON in a ```json code fence.",
        )
    }

    /// Parse a planner reply body. Zero-step plans are valid.
    pub fn parse(json_str: &str) -> Result<Plan, PlanError> {
        let raw: RawPlan =
            serde_json::from_str(json_str).map_err(|e| PlanError::Parse(e.to_string()))?;

        let plan = Plan::new(raw.summary, raw.steps);
        plan.validate()?;
        Ok(plan)
    }

    /// Extract and parse the JSON object embedded in free-form planner output.
    pub fn parse_reply(reply: &str) -> Result<Plan, PlanError> {
        let json = Self::extract_json(reply).ok_or(PlanError::MissingJson)?;
        Self::parse(json)
    }

    pub fn extract_json(text: &str) -> Option<&str> {
        for fence in ["```json", "```"] {
            if let Some(start) = text.find(fence) {
                let rest = &text[start + fence.len()..];
                if let Some(end) = rest.find("```") {
                    let candidate = rest[..end].trim();
                    if candidate.starts_with('{') {
                        return Some(candidate);
                    }
                }
            }
        }

        let open = text.find('{')?;
        let close = text.rfind('}')?;
        (close > open).then(|| &text[open..=close])
    }
}
