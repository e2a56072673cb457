use super::{
    ArxivClient, ArxivSearchTool, ArxivSummarizeTool, GenerateProposalTool, OutlineMethodologyTool,
    ToolRegistry, WikiSearchTool, WikiSummarizeTool,
};
use crate::agents::{AgentProfile, agent_default_tools};
use crate::config::ToolsConfig;
use reqwest::Client;
use std::sync::Arc;

/// HTTP client for the research tools: bounded timeout, identifying user agent.
pub fn research_http_client(config: &ToolsConfig) -> Client {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.request_timeout())
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// The built-in research tools, in fuzzy-match priority order.
pub fn research_tools(config: &ToolsConfig) -> ToolRegistry {
    let client = research_http_client(config);
    let arxiv = ArxivClient::new(client.clone(), config.arxiv_api_url.clone());

    ToolRegistry::new()
        .with_tool(Arc::new(ArxivSearchTool::new(arxiv.clone(), config.max_results)))
        .with_tool(Arc::new(ArxivSummarizeTool::new(arxiv)))
        .with_tool(Arc::new(GenerateProposalTool))
        .with_tool(Arc::new(OutlineMethodologyTool))
        .with_tool(Arc::new(WikiSearchTool::new(
            client.clone(),
            config.wikipedia_api_url.clone(),
            config.max_results,
        )))
        .with_tool(Arc::new(WikiSummarizeTool::new(
            client,
            config.wikipedia_rest_url.clone(),
        )))
}

/// Research tools wired to the fallback tools of `agents`.
pub fn registry_for_agents(config: &ToolsConfig, agents: &[AgentProfile]) -> ToolRegistry {
    let mut registry = research_tools(config);
    registry.extend_agent_defaults(agent_default_tools(agents));
    registry
}
