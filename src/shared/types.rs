use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use regex::Regex;

use super::error::TranslateErrorKind;

/// Target language for translation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Language {
    pub display_name: String,
    pub code: String,
}

impl Language {
    pub fn new(display_name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            code: code.into(),
        }
    }

    /// Resolve an ISO 639-1 or 639-3 code to a language with its English name.
    ///
    /// Unknown codes are kept as-is and used as their own display name; the
    /// backend is the one that rejects unsupported languages.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim();
        let lower = code.to_ascii_lowercase();
        let name = isolang::Language::from_639_1(&lower)
            .or_else(|| isolang::Language::from_639_3(&lower))
            .map(|lang| lang.to_name().to_string());

        match name {
            Some(name) => Self::new(name, lower),
            None => Self::new(code, code),
        }
    }

    /// Parse a catalogue label such as `"Spanish (es)"`.
    pub fn from_label(label: &str) -> Option<Self> {
        static RE: OnceLock<Option<Regex>> = OnceLock::new();
        let re = RE
            .get_or_init(|| Regex::new(r"^\s*(.+?)\s*\(\s*([^()\s]+)\s*\)\s*$").ok())
            .as_ref()?;

        let caps = re.captures(label)?;
        let name = caps.get(1)?.as_str();
        let code = caps.get(2)?.as_str();
        Some(Self::new(name, code))
    }

    /// Catalogue label, e.g. `"Spanish (es)"`
    pub fn label(&self) -> String {
        format!("{} ({})", self.display_name, self.code)
    }

    /// Whether the code looks like an ISO 639 code (2-3 ASCII letters).
    pub fn has_well_formed_code(&self) -> bool {
        (2..=3).contains(&self.code.len()) && self.code.chars().all(|c| c.is_ascii_alphabetic())
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.display_name, self.code)
    }
}

/// Lifecycle of a single translation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RequestState {
    Idle,
    Pending,
    Succeeded,
    Failed,
}

impl RequestState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: RequestState) -> bool {
        matches!(
            (self, next),
            (RequestState::Idle, RequestState::Pending)
                | (RequestState::Pending, RequestState::Succeeded)
                | (RequestState::Pending, RequestState::Failed)
                | (RequestState::Succeeded, RequestState::Idle)
                | (RequestState::Failed, RequestState::Idle)
        )
    }
}

/// Result of a `translate` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum TranslationOutcome {
    Cached(String),
    Fresh(String),
    Error {
        kind: TranslateErrorKind,
        detail: String,
    },
}

impl TranslationOutcome {
    pub fn is_cached(&self) -> bool {
        matches!(self, TranslationOutcome::Cached(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TranslationOutcome::Error { .. })
    }
}

/// An outcome together with the request it answers, as handed to presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationDelivery {
    pub generation: u64,
    pub text: String,
    pub language: Language,
    pub outcome: TranslationOutcome,
}
