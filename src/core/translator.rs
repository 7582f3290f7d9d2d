//! Translator
//!
//! Sends captured text to an LLM backend and caches the answers per
//! (text, target language).

pub mod backend;
pub mod cache;
pub mod extract;
pub mod language;
pub mod orchestrator;

pub use backend::{OllamaBackend, TranslationBackend};
pub use cache::{CacheKey, TranslationCache};
pub use extract::extract;
pub use language::LanguageSelection;
pub use orchestrator::TranslationOrchestrator;
