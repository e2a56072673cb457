use crate::error::LlmError;
use crate::utils::truncate_with_ellipsis;

const MAX_API_ERROR_CHARS: usize = 200;
const SECRET_PREFIXES: [&str; 3] = ["sk-", "Bearer ", "api_key="];

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Replace anything that looks like a credential with `[REDACTED]`.
pub fn scrub_secret_patterns(input: &str) -> String {
    let mut scrubbed = input.to_string();
    for marker in SECRET_PREFIXES {
        let mut search_from = 0;
        while let Some(rel) = scrubbed[search_from..].find(marker) {
            let start = search_from + rel;
            let value_start = start + marker.len();
            let value_len: usize = scrubbed[value_start..]
                .chars()
                .take_while(|c| is_secret_char(*c))
                .map(char::len_utf8)
                .sum();
            if value_len == 0 {
                search_from = value_start;
                continue;
            }
            scrubbed.replace_range(start..value_start + value_len, "[REDACTED]");
            search_from = start + "[REDACTED]".len();
        }
    }
    scrubbed
}

pub fn sanitize_api_error(input: &str) -> String {
    truncate_with_ellipsis(&scrub_secret_patterns(input), MAX_API_ERROR_CHARS)
}

/// Build a sanitized provider error from a failed HTTP response.
pub async fn api_error(provider: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return LlmError::Auth {
            provider: provider.to_string(),
        }
        .into();
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
    LlmError::Request {
        provider: provider.to_string(),
        message: format!("{status}: {}", sanitize_api_error(&body)),
    }
    .into()
}
