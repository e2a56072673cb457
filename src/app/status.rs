use agentflow::agents::AgentProfile;
use agentflow::config::Config;

/// Plain-text table of the agent registry for `agentflow agents`.
pub fn render_agents(config: &Config, agents: &[AgentProfile]) -> String {
    let mut lines = vec![
        format!("◆ AgentFlow agents ({})", config.agents_file().display()),
        String::new(),
    ];
    if agents.is_empty() {
        lines.push("  (no agents registered)".to_string());
        return lines.join("\n");
    }

    let id_width = agents.iter().map(|a| a.id.chars().count()).max().unwrap_or(0);
    for agent in agents {
        let marker = if agent.enabled { "●" } else { "○" };
        let tools = if agent.capabilities.is_empty() {
            "-".to_string()
        } else {
            agent.capabilities.join(", ")
        };
        let approval = if agent.requires_approval { "  [approval]" } else { "" };
        lines.push(format!(
            "  {marker} {:<id_width$}  {}  ({tools}){approval}",
            agent.id, agent.name
        ));
    }
    lines.join("\n")
}
