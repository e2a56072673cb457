use crate::tools::ReferenceKind;
use crate::utils::truncate_chars;
use regex::Regex;
use std::sync::LazyLock;

/// Upstream text handed to generation tools as `context` is capped at this many chars.
pub const CONTEXT_LIMIT_CHARS: usize = 1000;

static ARXIV_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://arxiv\.org/abs/[\w.]+").unwrap());

static BOLD_TITLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());

/// Dependency results in `dependsOn` order, separated by a blank line.
pub fn upstream_text(upstream: &[(String, String)]) -> String {
    upstream
        .iter()
        .map(|(_, result)| result.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn context_preview(text: &str) -> &str {
    truncate_chars(text, CONTEXT_LIMIT_CHARS)
}

/// References of `kind` in order of appearance, at most `limit` of them.
pub fn extract_references(text: &str, kind: ReferenceKind, limit: Option<usize>) -> Vec<String> {
    let found: Vec<String> = match kind {
        ReferenceKind::ArxivUrl => ARXIV_URL
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect(),
        ReferenceKind::BoldTitle => BOLD_TITLE
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .collect(),
    };

    match limit {
        Some(n) => found.into_iter().take(n).collect(),
        None => found,
    }
}
