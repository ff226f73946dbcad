//! Wire framing for progress events.

use crate::core::ProgressEvent;

/// Frames an event as one Server-Sent Events message: `data: <json>\n\n`.
pub fn to_sse_frame(event: &ProgressEvent) -> serde_json::Result<String> {
    Ok(format!("data: {}\n\n", event.to_json()?))
}

/// Frames an event as one newline-delimited JSON line.
pub fn to_ndjson_line(event: &ProgressEvent) -> serde_json::Result<String> {
    let mut line = event.to_json()?;
    line.push('\n');
    Ok(line)
}
