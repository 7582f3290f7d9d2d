pub mod core;
pub mod shared;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use crate::core::session::TranslatorSession;
use crate::core::translator::{OllamaBackend, TranslationCache, TranslationOrchestrator};
use crate::shared::diagnostics::{DiagnosticSink, FileDiagnosticSink, NullDiagnosticSink};
use crate::shared::emit::EventEmitter;
use crate::shared::error::AppResult;
use crate::shared::settings::AppSettings;

/// Install the global `tracing` subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Diagnostic sink described by the settings, plus the file writer task when
/// one was started. The task ends after the last sink clone is dropped.
pub fn diagnostic_sink(settings: &AppSettings) -> AppResult<(Arc<dyn DiagnosticSink>, Option<JoinHandle<()>>)> {
    Ok(match settings.log_path()? {
        Some(path) => {
            tracing::info!("[Diagnostics] Writing log to {}", path.display());
            let (sink, writer) = FileDiagnosticSink::spawn(path);
            let sink: Arc<dyn DiagnosticSink> = Arc::new(sink);
            (sink, Some(writer))
        }
        None => {
            let sink: Arc<dyn DiagnosticSink> = Arc::new(NullDiagnosticSink);
            (sink, None)
        }
    })
}

/// Wire the Ollama backend, cache and orchestrator into a session that is
/// ready to be spawned.
pub fn build_session(
    settings: &AppSettings,
    emitter: EventEmitter,
    diagnostics: Arc<dyn DiagnosticSink>,
) -> AppResult<TranslatorSession> {
    let backend = OllamaBackend::new(&settings.backend)?;
    tracing::info!(
        "[Translator] Using model {} at {}",
        backend.model(),
        backend.endpoint()
    );

    let cache = TranslationCache::with_capacity_limit(settings.cache.max_entries);
    let orchestrator = Arc::new(TranslationOrchestrator::new(
        Arc::new(backend),
        cache,
        emitter.clone(),
        Arc::clone(&diagnostics),
    ));

    Ok(TranslatorSession::new(
        orchestrator,
        settings.preferences.default_language(),
        emitter,
        diagnostics,
    ))
}
