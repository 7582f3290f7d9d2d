/// Closing tag of the reasoning section emitted by thinking models
pub const REASONING_END_MARKER: &str = "</think>";

/// Strip a leading reasoning preamble from raw model output.
///
/// Everything up to and including the last `</think>` is dropped; the rest is
/// trimmed. Output without the marker is returned trimmed.
pub fn extract(raw: &str) -> String {
    match raw.rfind(REASONING_END_MARKER) {
        Some(pos) => raw[pos + REASONING_END_MARKER.len()..].trim().to_string(),
        None => raw.trim().to_string(),
    }
}
