use serde::Serialize;
use super::types::{Language, TranslationDelivery};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload")] // Tagged enum for easier frontend parsing
pub enum AppEvent {
    /// Source text became the active text (captured, entered or picked from history)
    #[serde(rename = "source://changed")]
    SourceTextChanged { text: String, added_to_history: bool },

    /// A backend round trip started; presentation shows a placeholder
    #[serde(rename = "translation://started")]
    TranslationStarted { generation: u64, text: String, language: Language },

    #[serde(rename = "translation://delivered")]
    TranslationDelivered(TranslationDelivery),

    #[serde(rename = "language://changed")]
    LanguageChanged { previous: Language, current: Language },

    #[serde(rename = "history://cleared")]
    HistoryCleared,

    /// User-facing message that is not tied to a translation request
    #[serde(rename = "app://notice")]
    Notice(String),
}
