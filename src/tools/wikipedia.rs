//! Wikipedia search and page-summary tools.

use super::traits::{InputBinding, ReferenceKind, Tool, required_arg};
use crate::error::ToolError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

/// Titles summarized per fan-out; search results list more than that.
const SUMMARIZED_TITLES: usize = 3;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
    pageid: u64,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    title: Option<String>,
    extract: Option<String>,
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<DesktopUrls>,
}

#[derive(Debug, Deserialize)]
struct DesktopUrls {
    page: Option<String>,
}

fn strip_search_markup(snippet: &str) -> String {
    snippet
        .replace("<span class=\"searchmatch\">", "")
        .replace("</span>", "")
}

fn request_error(tool: &str, message: impl Into<String>) -> ToolError {
    ToolError::Request {
        name: tool.to_string(),
        message: message.into(),
    }
}

pub struct WikiSearchTool {
    client: Client,
    api_url: String,
    limit: u32,
}

impl WikiSearchTool {
    pub fn new(client: Client, api_url: impl Into<String>, limit: u32) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            limit,
        }
    }
}

#[async_trait]
impl Tool for WikiSearchTool {
    fn name(&self) -> &str {
        "wiki_search"
    }

    fn description(&self) -> &str {
        "Search Wikipedia for articles matching a query. Returns titles and snippets."
    }

    fn parameter_names(&self) -> Vec<&str> {
        vec!["query"]
    }

    async fn execute(&self, args: &Map<String, Value>) -> anyhow::Result<String> {
        let query = required_arg(args, self.name(), "query")?;
        let limit = self.limit.to_string();

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query.as_str()),
                ("srlimit", limit.as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| request_error(self.name(), e.to_string()))?;

        if !response.status().is_success() {
            return Err(request_error(
                self.name(),
                format!("Wikipedia returned {}", response.status()),
            )
            .into());
        }

        let body: SearchResponse = response.json().await.map_err(|e| ToolError::MalformedResponse {
            name: self.name().to_string(),
            message: e.to_string(),
        })?;
        let hits = body.query.map(|q| q.search).unwrap_or_default();
        if hits.is_empty() {
            return Ok(format!("No Wikipedia articles found for '{query}'."));
        }

        let lines: Vec<String> = hits
            .iter()
            .map(|hit| {
                format!(
                    "**{}** (pageid: {})\n{}",
                    hit.title,
                    hit.pageid,
                    strip_search_markup(&hit.snippet)
                )
            })
            .collect();
        Ok(format!(
            "Found {} Wikipedia articles for '{query}':\n\n{}",
            lines.len(),
            lines.join("\n\n")
        ))
    }
}

pub struct WikiSummarizeTool {
    client: Client,
    rest_url: String,
}

impl WikiSummarizeTool {
    pub fn new(client: Client, rest_url: impl Into<String>) -> Self {
        Self {
            client,
            rest_url: rest_url.into(),
        }
    }

    fn summary_url(&self, title: &str) -> Result<Url, ToolError> {
        let mut url = Url::parse(&self.rest_url).map_err(|e| request_error(self.name(), e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| request_error(self.name(), "REST base URL cannot have path segments"))?
            .pop_if_empty()
            .extend(["page", "summary", title]);
        Ok(url)
    }
}

#[async_trait]
impl Tool for WikiSummarizeTool {
    fn name(&self) -> &str {
        "wiki_summarize"
    }

    fn description(&self) -> &str {
        "Fetch the summary/introduction of a Wikipedia article by title."
    }

    fn parameter_names(&self) -> Vec<&str> {
        vec!["title"]
    }

    fn input_binding(&self) -> InputBinding {
        InputBinding::References {
            kind: ReferenceKind::BoldTitle,
            limit: Some(SUMMARIZED_TITLES),
        }
    }

    async fn execute(&self, args: &Map<String, Value>) -> anyhow::Result<String> {
        let title = required_arg(args, self.name(), "title")?;
        let url = self.summary_url(&title)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(self.name(), e.to_string()))?;
        if !response.status().is_success() {
            return Err(request_error(
                self.name(),
                format!("Wikipedia returned {} for '{title}'", response.status()),
            )
            .into());
        }

        let page: PageSummary = response.json().await.map_err(|e| ToolError::MalformedResponse {
            name: self.name().to_string(),
            message: e.to_string(),
        })?;
        let page_url = page
            .content_urls
            .and_then(|u| u.desktop)
            .and_then(|d| d.page)
            .unwrap_or_default();

        Ok(format!(
            "**{}**\n{page_url}\n\n{}",
            page.title.unwrap_or(title),
            page.extract
                .unwrap_or_else(|| "No summary available.".to_string())
        ))
    }
}
