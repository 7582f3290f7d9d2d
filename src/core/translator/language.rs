use crate::shared::types::Language;

/// Currently active target language
#[derive(Debug, Clone)]
pub struct LanguageSelection {
    current: Language,
}

impl LanguageSelection {
    pub fn new(initial: Language) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> &Language {
        &self.current
    }

    /// Replace the current language and return the previous one.
    ///
    /// Codes that do not look like ISO 639 codes are kept as given; an
    /// unsupported language surfaces as a backend failure.
    pub fn select(&mut self, language: Language) -> Language {
        if !language.has_well_formed_code() {
            tracing::warn!("[LanguageSelection] Unusual language code '{}'", language.code);
        }
        std::mem::replace(&mut self.current, language)
    }
}
