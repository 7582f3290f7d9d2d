use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::shared::error::{AppError, AppResult};

/// A captured source text and when it was first seen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub text: String,
    pub captured_at: DateTime<Utc>,
}

/// Ordered, duplicate-free list of captured texts (oldest first)
#[derive(Debug, Default)]
pub struct CaptureHistory {
    entries: Vec<HistoryEntry>,
}

impl CaptureHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` unless an identical entry already exists.
    ///
    /// Returns `true` when the text was already present (nothing changed).
    pub fn append_if_absent(&mut self, text: &str) -> bool {
        if self.contains(text) {
            return true;
        }
        self.entries.push(HistoryEntry {
            text: text.to_string(),
            captured_at: Utc::now(),
        });
        false
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries.iter().any(|entry| entry.text == text)
    }

    /// Entry text at `index` (0 = oldest)
    pub fn get_at(&self, index: usize) -> AppResult<&str> {
        self.entries
            .get(index)
            .map(|entry| entry.text.as_str())
            .ok_or(AppError::OutOfRange {
                index,
                len: self.entries.len(),
            })
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut history = CaptureHistory::new();
        assert!(!history.append_if_absent("First item"));
        assert!(!history.append_if_absent("Second item"));

        assert_eq!(history.len(), 2);
        assert_eq!(history.get_at(0).ok(), Some("First item"));
        assert_eq!(history.get_at(1).ok(), Some("Second item"));
    }

    #[test]
    fn test_append_is_idempotent() {
        let mut history = CaptureHistory::new();
        assert!(!history.append_if_absent("Same content"));
        for _ in 0..5 {
            assert!(history.append_if_absent("Same content"));
        }
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_duplicate_anywhere_is_rejected() {
        let mut history = CaptureHistory::new();
        history.append_if_absent("a");
        history.append_if_absent("b");
        history.append_if_absent("c");

        assert!(history.append_if_absent("a"));
        assert_eq!(history.len(), 3);
        assert_eq!(history.get_at(2).ok(), Some("c"));
    }

    #[test]
    fn test_exact_match_only() {
        let mut history = CaptureHistory::new();
        history.append_if_absent("hello");
        assert!(!history.append_if_absent("Hello"));
        assert!(!history.append_if_absent("hello "));
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_get_at_out_of_range() {
        let mut history = CaptureHistory::new();
        history.append_if_absent("only");

        match history.get_at(1) {
            Err(AppError::OutOfRange { index, len }) => {
                assert_eq!(index, 1);
                assert_eq!(len, 1);
            }
            other => panic!("expected OutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_clear() {
        let mut history = CaptureHistory::new();
        history.append_if_absent("Item 1");
        history.append_if_absent("Item 2");
        assert_eq!(history.len(), 2);

        history.clear();

        assert!(history.is_empty());
        assert!(history.get_at(0).is_err());
        // Cleared text can be captured again
        assert!(!history.append_if_absent("Item 1"));
    }
}
