use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Endpoints and limits for the built-in research tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_arxiv_api_url")]
    pub arxiv_api_url: String,
    #[serde(default = "default_wikipedia_api_url")]
    pub wikipedia_api_url: String,
    /// Base of the Wikipedia REST API; `/page/summary/{title}` is appended.
    #[serde(default = "default_wikipedia_rest_url")]
    pub wikipedia_rest_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Result count used when a search step does not set one.
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

fn default_arxiv_api_url() -> String {
    "http://export.arxiv.org/api/query".into()
}

fn default_wikipedia_api_url() -> String {
    "https://en.wikipedia.org/w/api.php".into()
}

fn default_wikipedia_rest_url() -> String {
    "https://en.wikipedia.org/api/rest_v1".into()
}

fn default_user_agent() -> String {
    format!("AgentFlow/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_max_results() -> u32 {
    5
}

impl ToolsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            arxiv_api_url: default_arxiv_api_url(),
            wikipedia_api_url: default_wikipedia_api_url(),
            wikipedia_rest_url: default_wikipedia_rest_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            max_results: default_max_results(),
        }
    }
}
