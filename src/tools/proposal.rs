//! Local template generators for research proposals and methodology sections.

use super::traits::{InputBinding, Tool, optional_arg, required_arg};
use crate::utils::truncate_chars;
use async_trait::async_trait;
use serde_json::{Map, Value};

const CONTEXT_PREVIEW_CHARS: usize = 300;

pub struct GenerateProposalTool;

#[async_trait]
impl Tool for GenerateProposalTool {
    fn name(&self) -> &str {
        "generate_proposal"
    }

    fn description(&self) -> &str {
        "Generate a structured research proposal outline given a topic and optional context from papers."
    }

    fn parameter_names(&self) -> Vec<&str> {
        vec!["topic", "context"]
    }

    fn input_binding(&self) -> InputBinding {
        InputBinding::Generation
    }

    async fn execute(&self, args: &Map<String, Value>) -> anyhow::Result<String> {
        let topic = required_arg(args, self.name(), "topic")?;
        let context = optional_arg(args, "context");
        let context = context.as_deref().map_or("To be filled from literature review", |c| {
            truncate_chars(c, CONTEXT_PREVIEW_CHARS)
        });

        Ok(format!(
            "## Research Proposal: {topic}\n\n\
             ### 1. Introduction & Motivation\n\
             - Research gap identified in the area of {topic}\n\
             - Context: {context}\n\n\
             ### 2. Research Questions\n\
             - RQ1: What are the current limitations in {topic}?\n\
             - RQ2: How can novel approaches improve the state of the art?\n\n\
             ### 3. Proposed Methodology\n\
             - Literature survey and gap analysis\n\
             - Experimental design and evaluation\n\n\
             ### 4. Expected Contributions\n\
             - Novel framework / algorithm / analysis for {topic}\n\
             - Empirical evaluation and reproducible benchmarks\n\n\
             ### 5. Timeline\n\
             - Phase 1 (Months 1-3): Literature review\n\
             - Phase 2 (Months 4-8): Implementation\n\
             - Phase 3 (Months 9-12): Evaluation & writing"
        ))
    }
}

pub struct OutlineMethodologyTool;

#[async_trait]
impl Tool for OutlineMethodologyTool {
    fn name(&self) -> &str {
        "outline_methodology"
    }

    fn description(&self) -> &str {
        "Generate a detailed methodology section for a research approach in a given domain."
    }

    fn parameter_names(&self) -> Vec<&str> {
        vec!["approach", "domain"]
    }

    fn input_binding(&self) -> InputBinding {
        InputBinding::Generation
    }

    async fn execute(&self, args: &Map<String, Value>) -> anyhow::Result<String> {
        let approach = required_arg(args, self.name(), "approach")?;
        let domain = optional_arg(args, "domain").unwrap_or_else(|| "General".to_string());

        Ok(format!(
            "## Methodology: {approach}\n\
             **Domain:** {domain}\n\n\
             ### 1. Data Collection\n\
             - Sources, datasets, and sampling strategy\n\n\
             ### 2. Approach Details\n\
             - {approach}: step-by-step procedure\n\
             - Baselines for comparison\n\n\
             ### 3. Evaluation Metrics\n\
             - Quantitative: accuracy, F1, BLEU, etc.\n\
             - Qualitative: human evaluation, case studies\n\n\
             ### 4. Reproducibility\n\
             - Code and data availability plan"
        ))
    }
}
