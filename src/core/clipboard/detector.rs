use std::sync::Arc;

use super::history::CaptureHistory;
use crate::shared::diagnostics::DiagnosticSink;

/// Text accepted by the detector and forwarded downstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewText {
    pub text: String,
    /// The text was already somewhere in the capture history
    pub already_in_history: bool,
}

/// Filters the raw "new text observed" signal.
///
/// Empty or whitespace-only text and exact repeats of the last accepted text
/// are dropped. The detector is the only writer of the capture history.
pub struct ChangeDetector {
    last_accepted: Option<String>,
    history: CaptureHistory,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl ChangeDetector {
    pub fn new(diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            last_accepted: None,
            history: CaptureHistory::new(),
            diagnostics,
        }
    }

    /// Handle one change notification; `Some` means exactly one new-text event.
    pub fn on_signal(&mut self, candidate: &str) -> Option<NewText> {
        self.diagnostics
            .record(&format!("Clipboard update detected: '{}'", candidate));

        if candidate.trim().is_empty() {
            tracing::debug!("[ChangeDetector] Ignoring empty clipboard text");
            return None;
        }
        if self.last_accepted.as_deref() == Some(candidate) {
            tracing::debug!("[ChangeDetector] Ignoring repeat of last accepted text");
            return None;
        }

        self.last_accepted = Some(candidate.to_string());
        Some(self.record_in_history(candidate))
    }

    /// Accept text from an explicit user request, bypassing the repeat filter.
    ///
    /// Returns `None` only for empty text.
    pub fn accept_manual(&mut self, text: &str) -> Option<NewText> {
        if text.is_empty() {
            return None;
        }
        Some(self.record_in_history(text))
    }

    fn record_in_history(&mut self, text: &str) -> NewText {
        let already_in_history = self.history.append_if_absent(text);
        if !already_in_history {
            self.diagnostics.record(&format!("Added text to list: '{}'", text));
        }
        NewText {
            text: text.to_string(),
            already_in_history,
        }
    }

    pub fn last_accepted(&self) -> Option<&str> {
        self.last_accepted.as_deref()
    }

    pub fn history(&self) -> &CaptureHistory {
        &self.history
    }

    /// Empty the capture history. The last accepted text is kept, so the
    /// clipboard content that is still present is not captured again.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
