//! arXiv Atom API tools: search recent papers, fetch one paper's abstract.

use super::traits::{InputBinding, ReferenceKind, Tool, optional_arg, required_arg};
use crate::error::ToolError;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<entry\b[^>]*>(.*?)</entry>").unwrap());
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title\b[^>]*>(.*?)</title>").unwrap());
static SUMMARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<summary\b[^>]*>(.*?)</summary>").unwrap());
static ESCAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>|&(#[0-9]+|#[xX][0-9a-fA-F]+|lt|gt|quot|apos|amp);").unwrap()
});
static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<id\b[^>]*>(.*?)</id>").unwrap());
static AUTHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<author\b[^>]*>\s*<name\b[^>]*>(.*?)</name>").unwrap());
static CATEGORY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<category\b[^>]*\bterm="([^"]*)""#).unwrap());

const ABSTRACT_PREVIEW_CHARS: usize = 300;
const LISTED_AUTHORS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct AtomEntry {
    title: String,
    summary: String,
    link: String,
    authors: Vec<String>,
    categories: Vec<String>,
}

/// `&#39;` / `&#x2019;` style references; invalid code points yield `None`.
fn char_reference(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}

/// Single pass, so `&amp;lt;` stays `&lt;`. CDATA content is taken verbatim.
fn unescape_xml(text: &str) -> String {
    ESCAPE_RE
        .replace_all(text, |caps: &regex::Captures<'_>| -> String {
            if let Some(cdata) = caps.get(1) {
                return cdata.as_str().to_string();
            }
            match &caps[2] {
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                "amp" => "&".to_string(),
                entity => char_reference(entity).map_or_else(|| caps[0].to_string(), String::from),
            }
        })
        .into_owned()
}

fn clean_text(text: &str) -> String {
    unescape_xml(text.trim()).replace('\n', " ")
}

fn capture(re: &Regex, haystack: &str) -> String {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| clean_text(m.as_str()))
        .unwrap_or_default()
}

fn parse_feed(xml: &str) -> Vec<AtomEntry> {
    ENTRY_RE
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|body| {
            let body = body.as_str();
            AtomEntry {
                title: capture(&TITLE_RE, body),
                summary: capture(&SUMMARY_RE, body),
                link: capture(&ID_RE, body),
                authors: AUTHOR_RE
                    .captures_iter(body)
                    .filter_map(|c| c.get(1))
                    .map(|m| clean_text(m.as_str()))
                    .collect(),
                categories: CATEGORY_RE
                    .captures_iter(body)
                    .filter_map(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
                    .collect(),
            }
        })
        .collect()
}

fn format_search_entry(entry: &AtomEntry) -> String {
    let authors = entry
        .authors
        .iter()
        .take(LISTED_AUTHORS)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    let more = if entry.authors.len() > LISTED_AUTHORS { "..." } else { "" };
    let preview = crate::utils::truncate_chars(&entry.summary, ABSTRACT_PREVIEW_CHARS);
    format!(
        "**{}**\nAuthors: {authors}{more}\nURL: {}\nAbstract: {preview}...",
        entry.title, entry.link
    )
}

/// Shared HTTP access to the arXiv query endpoint.
#[derive(Clone)]
pub struct ArxivClient {
    client: Client,
    api_url: String,
}

impl ArxivClient {
    pub fn new(client: Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }

    async fn fetch(&self, tool: &str, query: &[(&str, String)]) -> Result<Vec<AtomEntry>, ToolError> {
        let request_error = |message: String| ToolError::Request {
            name: tool.to_string(),
            message,
        };

        let response = self
            .client
            .get(&self.api_url)
            .query(query)
            .send()
            .await
            .map_err(|e| request_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(request_error(format!("arXiv returned {}", response.status())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| request_error(e.to_string()))?;
        if !body.contains("<feed") {
            return Err(ToolError::MalformedResponse {
                name: tool.to_string(),
                message: "response is not an Atom feed".into(),
            });
        }
        Ok(parse_feed(&body))
    }
}

pub struct ArxivSearchTool {
    api: ArxivClient,
    default_max_results: u32,
}

impl ArxivSearchTool {
    pub fn new(api: ArxivClient, default_max_results: u32) -> Self {
        Self {
            api,
            default_max_results,
        }
    }
}

#[async_trait]
impl Tool for ArxivSearchTool {
    fn name(&self) -> &str {
        "arxiv_search"
    }

    fn description(&self) -> &str {
        "Search arXiv for recent papers matching a query. Returns titles, authors, and abstracts."
    }

    fn parameter_names(&self) -> Vec<&str> {
        vec!["query", "max_results"]
    }

    async fn execute(&self, args: &Map<String, Value>) -> anyhow::Result<String> {
        let query = required_arg(args, self.name(), "query")?;
        let max_results = optional_arg(args, "max_results")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(self.default_max_results);

        let entries = self
            .api
            .fetch(
                self.name(),
                &[
                    ("search_query", format!("all:{query}")),
                    ("start", "0".into()),
                    ("max_results", max_results.to_string()),
                    ("sortBy", "submittedDate".into()),
                    ("sortOrder", "descending".into()),
                ],
            )
            .await?;

        if entries.is_empty() {
            return Ok(format!("No arXiv papers found for '{query}'."));
        }

        let results: Vec<String> = entries.iter().map(format_search_entry).collect();
        Ok(format!(
            "Found {} recent papers for '{query}':\n\n{}",
            results.len(),
            results.join("\n\n---\n\n")
        ))
    }
}

pub struct ArxivSummarizeTool {
    api: ArxivClient,
}

impl ArxivSummarizeTool {
    pub fn new(api: ArxivClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for ArxivSummarizeTool {
    fn name(&self) -> &str {
        "arxiv_summarize"
    }

    fn description(&self) -> &str {
        "Fetch the abstract and metadata of a specific arXiv paper by its URL or ID."
    }

    fn parameter_names(&self) -> Vec<&str> {
        vec!["paper_url"]
    }

    fn input_binding(&self) -> InputBinding {
        InputBinding::References {
            kind: ReferenceKind::ArxivUrl,
            limit: None,
        }
    }

    async fn execute(&self, args: &Map<String, Value>) -> anyhow::Result<String> {
        let paper_url = required_arg(args, self.name(), "paper_url")?;
        let paper_id = paper_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(paper_url.as_str())
            .to_string();

        let entries = self
            .api
            .fetch(self.name(), &[("id_list", paper_id.clone())])
            .await?;
        let Some(entry) = entries.into_iter().next() else {
            return Ok(format!("Paper {paper_id} not found."));
        };

        Ok(format!(
            "**{}**\nAuthors: {}\nCategories: {}\n\nAbstract:\n{}",
            entry.title,
            entry.authors.join(", "),
            entry.categories.join(", "),
            entry.summary
        ))
    }
}
