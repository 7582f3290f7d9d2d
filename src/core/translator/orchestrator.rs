//! Translation request orchestration
//!
//! Cache-first lookup, backend round trip, extraction and the generation
//! rule that keeps a late response from overwriting a newer request.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::backend::{build_prompt, TranslationBackend};
use super::cache::{CacheKey, TranslationCache};
use super::extract::extract;
use crate::shared::diagnostics::DiagnosticSink;
use crate::shared::emit::{emit_event, EventEmitter};
use crate::shared::error::TranslateErrorKind;
use crate::shared::events::AppEvent;
use crate::shared::types::{Language, RequestState, TranslationDelivery, TranslationOutcome};

/// State of one in-flight request
struct RequestTicket {
    generation: u64,
    state: RequestState,
}

impl RequestTicket {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            state: RequestState::Idle,
        }
    }

    fn advance(&mut self, next: RequestState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal request transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::trace!(
            "[Orchestrator] Request #{}: {:?} -> {:?}",
            self.generation,
            self.state,
            next
        );
        self.state = next;
    }
}

pub struct TranslationOrchestrator {
    backend: Arc<dyn TranslationBackend>,
    cache: Mutex<TranslationCache>,
    latest_generation: AtomicU64,
    in_flight: AtomicUsize,
    emitter: EventEmitter,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl TranslationOrchestrator {
    pub fn new(
        backend: Arc<dyn TranslationBackend>,
        cache: TranslationCache,
        emitter: EventEmitter,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            backend,
            cache: Mutex::new(cache),
            latest_generation: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            emitter,
            diagnostics,
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, TranslationCache> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("[Orchestrator] Cache mutex poisoned, recovering...");
                poisoned.into_inner()
            }
        }
    }

    /// Issue the next generation number. Every later `begin` supersedes it.
    pub fn begin(&self) -> u64 {
        self.latest_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest_generation(&self) -> u64 {
        self.latest_generation.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.latest_generation() == generation
    }

    /// Number of backend round trips currently awaited
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Translate `text` under a freshly issued generation
    pub async fn translate(&self, text: &str, language: &Language) -> TranslationOutcome {
        let generation = self.begin();
        self.translate_as(generation, text, language).await
    }

    /// Translate `text` for a generation previously obtained from [`begin`](Self::begin).
    ///
    /// The outcome is always returned to the caller; it is published to the
    /// presentation layer only while `generation` is still the latest one.
    pub async fn translate_as(&self, generation: u64, text: &str, language: &Language) -> TranslationOutcome {
        let outcome = self.resolve(generation, text, language).await;
        self.present(generation, text, language, outcome.clone());
        outcome
    }

    async fn resolve(&self, generation: u64, text: &str, language: &Language) -> TranslationOutcome {
        let mut ticket = RequestTicket::new(generation);
        ticket.advance(RequestState::Pending);

        let key = CacheKey::new(text, &language.code);
        self.diagnostics
            .record(&format!("Starting translation for: '{}' to {}", text, language.display_name));

        let cached = self.lock_cache().get(&key).map(str::to_string);
        if let Some(value) = cached {
            tracing::debug!("[Orchestrator] Cache hit {} ({})", key.fingerprint(), language.code);
            self.diagnostics
                .record(&format!("Found cached translation for: '{}' to {}", text, language.code));
            ticket.advance(RequestState::Succeeded);
            ticket.advance(RequestState::Idle);
            return TranslationOutcome::Cached(value);
        }

        if self.is_current(generation) {
            emit_event(
                &self.emitter,
                AppEvent::TranslationStarted {
                    generation,
                    text: text.to_string(),
                    language: language.clone(),
                },
            );
        }

        let prompt = build_prompt(text, language);
        self.diagnostics.record("Sending request to translation backend...");
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let result = self.backend.generate(&prompt).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let outcome = match result {
            Ok(raw) => {
                self.diagnostics.record(&format!("API Response: {}", raw));
                let translated = extract(&raw);
                if translated.is_empty() {
                    self.diagnostics.record("Backend returned no usable translation");
                    TranslationOutcome::Error {
                        kind: TranslateErrorKind::EmptyResult,
                        detail: String::new(),
                    }
                } else {
                    self.diagnostics.record(&format!("Parsed translation: '{}'", translated));
                    self.lock_cache().put(key.clone(), translated.clone());
                    TranslationOutcome::Fresh(translated)
                }
            }
            Err(e) => {
                tracing::warn!("[Orchestrator] Request #{} failed: {}", generation, e);
                self.diagnostics.record(&e.to_string());
                TranslationOutcome::Error {
                    kind: e.kind(),
                    detail: e.to_string(),
                }
            }
        };

        ticket.advance(if outcome.is_error() {
            RequestState::Failed
        } else {
            RequestState::Succeeded
        });
        ticket.advance(RequestState::Idle);
        outcome
    }

    fn present(&self, generation: u64, text: &str, language: &Language, outcome: TranslationOutcome) {
        if !self.is_current(generation) {
            tracing::debug!(
                "[Orchestrator] Discarding superseded response #{} (latest #{})",
                generation,
                self.latest_generation()
            );
            return;
        }
        emit_event(
            &self.emitter,
            AppEvent::TranslationDelivered(TranslationDelivery {
                generation,
                text: text.to_string(),
                language: language.clone(),
                outcome,
            }),
        );
    }

    /// Cached translation, if any
    pub fn cached(&self, text: &str, language: &Language) -> Option<String> {
        self.lock_cache()
            .get(&CacheKey::new(text, &language.code))
            .map(str::to_string)
    }

    pub fn cache_len(&self) -> usize {
        self.lock_cache().len()
    }

    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::diagnostics::NullDiagnosticSink;
    use crate::shared::error::BackendError;
    use async_trait::async_trait;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::sync::oneshot;

    type Reply = Box<dyn Fn(&str) -> Result<String, BackendError> + Send + Sync>;

    /// Backend answering from a closure; prompts matching a gate wait for it
    struct ScriptedBackend {
        calls: AtomicUsize,
        reply: Reply,
        gates: Mutex<Vec<(String, oneshot::Receiver<()>)>>,
    }

    impl ScriptedBackend {
        fn new(reply: impl Fn(&str) -> Result<String, BackendError> + Send + Sync + 'static) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                reply: Box::new(reply),
                gates: Mutex::new(Vec::new()),
            }
        }

        fn gate(self, needle: &str) -> (Self, oneshot::Sender<()>) {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().expect("gates").push((needle.to_string(), rx));
            (self, tx)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranslationBackend for ScriptedBackend {
        async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let gate = {
                let mut gates = self.gates.lock().expect("gates");
                gates
                    .iter()
                    .position(|(needle, _)| prompt.contains(needle.as_str()))
                    .map(|i| gates.remove(i).1)
            };
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            (self.reply)(prompt)
        }
    }

    fn spanish() -> Language {
        Language::new("Spanish", "es")
    }

    fn french() -> Language {
        Language::new("French", "fr")
    }

    fn english() -> Language {
        Language::new("English", "en")
    }

    fn orchestrator(backend: Arc<ScriptedBackend>) -> (Arc<TranslationOrchestrator>, UnboundedReceiver<AppEvent>) {
        let (emitter, rx) = EventEmitter::channel();
        let orch = TranslationOrchestrator::new(
            backend,
            TranslationCache::new(),
            emitter,
            Arc::new(NullDiagnosticSink),
        );
        (Arc::new(orch), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<AppEvent>) -> Vec<AppEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn delivered_generations(events: &[AppEvent]) -> Vec<u64> {
        events
            .iter()
            .filter_map(|event| match event {
                AppEvent::TranslationDelivered(delivery) => Some(delivery.generation),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let backend = Arc::new(ScriptedBackend::new(|_| Ok("<think>hmm</think> Hola ".to_string())));
        let (orch, _rx) = orchestrator(backend.clone());

        let first = orch.translate("Hello", &spanish()).await;
        assert_eq!(first, TranslationOutcome::Fresh("Hola".to_string()));

        let second = orch.translate("Hello", &spanish()).await;
        assert_eq!(second, TranslationOutcome::Cached("Hola".to_string()));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_languages_are_cached_separately() {
        let backend = Arc::new(ScriptedBackend::new(|prompt| {
            if prompt.contains("to Spanish") {
                Ok("Hola".to_string())
            } else {
                Ok("Bonjour".to_string())
            }
        }));
        let (orch, _rx) = orchestrator(backend.clone());

        orch.translate("Hello", &spanish()).await;
        orch.translate("Hello", &french()).await;

        assert_eq!(orch.cache_len(), 2);
        assert_eq!(orch.cached("Hello", &spanish()).as_deref(), Some("Hola"));
        assert_eq!(orch.cached("Hello", &french()).as_deref(), Some("Bonjour"));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_http_500_is_backend_error_and_not_cached() {
        let backend = Arc::new(ScriptedBackend::new(|_| {
            Err(BackendError::Status {
                status: 500,
                body: "boom".to_string(),
            })
        }));
        let (orch, mut rx) = orchestrator(backend.clone());

        let outcome = orch.translate("Hello", &spanish()).await;
        match &outcome {
            TranslationOutcome::Error { kind, detail } => {
                assert_eq!(*kind, TranslateErrorKind::Backend);
                assert!(detail.contains("500"));
            }
            other => panic!("expected error, got {:?}", other),
        }
        assert_eq!(orch.cache_len(), 0);

        let events = drain(&mut rx);
        let delivered: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                AppEvent::TranslationDelivered(delivery) => Some(delivery),
                _ => None,
            })
            .collect();
        assert_eq!(delivered.len(), 1);
        assert!(!delivered[0].outcome.is_cached());

        // A failure is retried on the next request
        orch.translate("Hello", &spanish()).await;
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_extraction_is_not_cached() {
        let backend = Arc::new(ScriptedBackend::new(|_| Ok("<think>only thoughts</think>  ".to_string())));
        let (orch, _rx) = orchestrator(backend);

        let outcome = orch.translate("Hello", &spanish()).await;
        assert!(matches!(
            outcome,
            TranslationOutcome::Error { kind: TranslateErrorKind::EmptyResult, .. }
        ));
        assert_eq!(orch.cache_len(), 0);
    }

    #[tokio::test]
    async fn test_malformed_response_kind() {
        let backend = Arc::new(ScriptedBackend::new(|_| {
            Err(BackendError::Malformed("missing field `response`".to_string()))
        }));
        let (orch, _rx) = orchestrator(backend);

        let outcome = orch.translate("Hello", &spanish()).await;
        assert!(matches!(
            outcome,
            TranslationOutcome::Error { kind: TranslateErrorKind::MalformedResponse, .. }
        ));
        assert_eq!(orch.cache_len(), 0);
    }

    #[tokio::test]
    async fn test_superseded_response_is_not_presented_but_cached() {
        let backend = ScriptedBackend::new(|prompt| {
            if prompt.contains("to English") {
                Ok("x (en)".to_string())
            } else {
                Ok("x (fr)".to_string())
            }
        });
        let (backend, release_en) = backend.gate("to English");
        let (backend, release_fr) = backend.gate("to French");
        let (orch, mut rx) = orchestrator(Arc::new(backend));

        let gen1 = orch.begin();
        let first = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.translate_as(gen1, "x", &english()).await })
        };
        let gen2 = orch.begin();
        let second = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.translate_as(gen2, "x", &french()).await })
        };

        // Generation 2 finishes first, generation 1 arrives late
        release_fr.send(()).expect("release fr");
        let second = second.await.expect("task 2");
        release_en.send(()).expect("release en");
        let first = first.await.expect("task 1");

        assert_eq!(first, TranslationOutcome::Fresh("x (en)".to_string()));
        assert_eq!(second, TranslationOutcome::Fresh("x (fr)".to_string()));

        let events = drain(&mut rx);
        assert_eq!(delivered_generations(&events), vec![gen2]);

        // The late result is still valid and reusable
        assert_eq!(orch.cached("x", &english()).as_deref(), Some("x (en)"));
        assert_eq!(orch.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_in_order_completion_presents_latest_only() {
        let backend = Arc::new(ScriptedBackend::new(|_| Ok("Hola".to_string())));
        let (orch, mut rx) = orchestrator(backend);

        let gen1 = orch.begin();
        let gen2 = orch.begin();
        orch.translate_as(gen1, "a", &spanish()).await;
        orch.translate_as(gen2, "b", &spanish()).await;

        assert_eq!(delivered_generations(&drain(&mut rx)), vec![gen2]);
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let backend = Arc::new(ScriptedBackend::new(|_| Ok("Hola".to_string())));
        let (orch, _rx) = orchestrator(backend.clone());

        orch.translate("Hello", &spanish()).await;
        orch.clear_cache();
        assert_eq!(orch.cache_len(), 0);

        orch.translate("Hello", &spanish()).await;
        assert_eq!(backend.calls(), 2);
    }
}
