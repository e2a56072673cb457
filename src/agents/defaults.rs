use super::AgentProfile;

pub const FALLBACK_AGENT_COLOR: &str = "#6B7280";
pub const FALLBACK_AGENT_ICON: &str = "Bot";

#[allow(clippy::too_many_arguments)]
fn research_agent(
    id: &str,
    name: &str,
    icon: &str,
    color: &str,
    description: &str,
    role: &str,
    goal: &str,
    capabilities: [&str; 2],
) -> AgentProfile {
    AgentProfile {
        id: id.into(),
        name: name.into(),
        icon: icon.into(),
        description: description.into(),
        role: role.into(),
        goal: goal.into(),
        capabilities: capabilities.iter().map(|c| (*c).to_string()).collect(),
        color: color.into(),
        default_tool: Some(capabilities[0].to_string()),
        ..AgentProfile::default()
    }
}

/// The three research agents a fresh registry starts with.
pub fn builtin_agents() -> Vec<AgentProfile> {
    vec![
        research_agent(
            "arxiv",
            "ArXiv Agent",
            "BookOpen",
            "#A855F7",
            "Search and summarize recent arXiv papers",
            "ArXiv Research Analyst",
            "Search and summarize recent academic papers from arXiv",
            ["arxiv_search", "arxiv_summarize"],
        ),
        research_agent(
            "proposal",
            "Proposal Agent",
            "Lightbulb",
            "#F97316",
            "Generate research proposals and methodology outlines",
            "Research Proposal Strategist",
            "Generate structured research proposals and methodology outlines",
            ["generate_proposal", "outline_methodology"],
        ),
        research_agent(
            "wikipedia",
            "Wikipedia Agent",
            "Globe",
            "#06B6D4",
            "Look up and summarize Wikipedia articles",
            "Background Research Specialist",
            "Look up and summarize background information from Wikipedia",
            ["wiki_search", "wiki_summarize"],
        ),
    ]
}
