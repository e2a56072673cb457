use super::events::ExecutionEvent;
use anyhow::{Context, Result};

/// Framing of the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// `data: {json}\n\n` frames for `text/event-stream`.
    #[default]
    Sse,
    /// One JSON object per line.
    Ndjson,
}

impl WireFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Sse => "text/event-stream",
            Self::Ndjson => "application/x-ndjson",
        }
    }
}

/// Encode one event as a complete frame. Nothing is buffered between calls.
pub fn encode(event: &ExecutionEvent, format: WireFormat) -> Result<String> {
    let json = serde_json::to_string(event)
        .with_context(|| format!("failed to encode {} event", event.kind()))?;
    Ok(match format {
        WireFormat::Sse => format!("data: {json}\n\n"),
        WireFormat::Ndjson => format!("{json}\n"),
    })
}
