//! Translator session actor
//!
//! Owns the change detector (and through it the capture history), the
//! language selection and the active source text. Commands are handled one
//! at a time; translations run as spawned tasks so the loop keeps accepting
//! commands while a backend call is pending.

use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinHandle, JoinSet};

use super::clipboard::{CaptureHistory, ChangeDetector, NewText};
use super::translator::{LanguageSelection, TranslationOrchestrator};
use crate::shared::diagnostics::DiagnosticSink;
use crate::shared::emit::{emit_event, EventEmitter};
use crate::shared::error::{AppError, AppResult};
use crate::shared::events::AppEvent;
use crate::shared::types::Language;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// The change source observed new text
    Signal(String),
    /// Explicit "translate this" request
    TranslateText(String),
    /// Pick an entry from the capture history
    SelectHistory(usize),
    SelectLanguage(Language),
    ClearAll,
    Shutdown,
}

/// Cloneable handle for sending commands to a running session
#[derive(Clone)]
pub struct SessionHandle {
    tx: UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn send(&self, command: SessionCommand) -> AppResult<()> {
        self.tx
            .send(command)
            .map_err(|_| AppError::Session("Session is no longer running".to_string()))
    }

    /// The change-source entry point: fire-and-forget
    pub fn signal(&self, text: impl Into<String>) {
        if self.send(SessionCommand::Signal(text.into())).is_err() {
            tracing::debug!("[Session] Dropping clipboard signal after shutdown");
        }
    }

    pub fn translate_text(&self, text: impl Into<String>) -> AppResult<()> {
        self.send(SessionCommand::TranslateText(text.into()))
    }

    pub fn select_history(&self, index: usize) -> AppResult<()> {
        self.send(SessionCommand::SelectHistory(index))
    }

    pub fn select_language(&self, language: Language) -> AppResult<()> {
        self.send(SessionCommand::SelectLanguage(language))
    }

    pub fn clear_all(&self) -> AppResult<()> {
        self.send(SessionCommand::ClearAll)
    }

    pub fn shutdown(&self) -> AppResult<()> {
        self.send(SessionCommand::Shutdown)
    }
}

pub struct TranslatorSession {
    detector: ChangeDetector,
    language: LanguageSelection,
    orchestrator: Arc<TranslationOrchestrator>,
    active_text: Option<String>,
    emitter: EventEmitter,
    diagnostics: Arc<dyn DiagnosticSink>,
    tasks: JoinSet<()>,
}

impl TranslatorSession {
    pub fn new(
        orchestrator: Arc<TranslationOrchestrator>,
        initial_language: Language,
        emitter: EventEmitter,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            detector: ChangeDetector::new(Arc::clone(&diagnostics)),
            language: LanguageSelection::new(initial_language),
            orchestrator,
            active_text: None,
            emitter,
            diagnostics,
            tasks: JoinSet::new(),
        }
    }

    /// Spawn the session loop on the current runtime
    pub fn spawn(self) -> (SessionHandle, JoinHandle<TranslatorSession>) {
        let (tx, rx) = unbounded_channel();
        let handle = tokio::spawn(self.run(rx));
        (SessionHandle { tx }, handle)
    }

    /// Process commands until `Shutdown` or until every handle is dropped,
    /// then wait for outstanding translations and hand the session back.
    pub async fn run(mut self, mut rx: UnboundedReceiver<SessionCommand>) -> Self {
        self.diagnostics.record("Application started");
        tracing::info!("[Session] Started with target language {}", self.language.current());

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!("[Session] Translation task failed: {}", e);
                    }
                }
            }
        }

        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("[Session] Translation task failed: {}", e);
            }
        }
        self.diagnostics.record("Application closing");
        tracing::info!("[Session] Stopped");
        self
    }

    /// Apply one command. Never blocks on the backend.
    pub fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Signal(text) => self.on_signal(&text),
            SessionCommand::TranslateText(text) => self.translate_text(&text),
            SessionCommand::SelectHistory(index) => self.select_history(index),
            SessionCommand::SelectLanguage(language) => self.select_language(language),
            SessionCommand::ClearAll => self.clear_all(),
            SessionCommand::Shutdown => {}
        }
    }

    fn on_signal(&mut self, text: &str) {
        if let Some(new_text) = self.detector.on_signal(text) {
            self.activate(new_text);
        }
    }

    fn translate_text(&mut self, text: &str) {
        self.diagnostics.record("Translate requested");
        match self.detector.accept_manual(text) {
            Some(new_text) => self.activate(new_text),
            None => {
                self.diagnostics.record("Clipboard is empty");
                emit_event(
                    &self.emitter,
                    AppEvent::Notice("The clipboard is empty. Please copy some text first.".to_string()),
                );
            }
        }
    }

    fn select_history(&mut self, index: usize) {
        let text = match self.detector.history().get_at(index) {
            Ok(text) => text.to_string(),
            Err(e) => {
                self.diagnostics.record(&format!("History selection failed: {}", e));
                emit_event(&self.emitter, AppEvent::Notice(e.to_string()));
                return;
            }
        };
        self.diagnostics.record(&format!("List item selected: '{}'", text));
        self.activate(NewText {
            text,
            already_in_history: true,
        });
    }

    fn select_language(&mut self, language: Language) {
        let previous = self.language.select(language.clone());
        self.diagnostics.record(&format!(
            "Language changed to: {} ({})",
            language.display_name, language.code
        ));
        emit_event(
            &self.emitter,
            AppEvent::LanguageChanged {
                previous: previous.clone(),
                current: language.clone(),
            },
        );

        if previous.code == language.code {
            return;
        }
        if let Some(text) = self.active_text.clone() {
            self.spawn_translation(text);
        }
    }

    fn clear_all(&mut self) {
        self.diagnostics.record("Clearing history and cached translations");
        self.detector.clear_history();
        self.active_text = None;
        // Nothing on screen may be replaced by a request issued before the clear
        self.orchestrator.begin();
        self.orchestrator.clear_cache();
        emit_event(&self.emitter, AppEvent::HistoryCleared);
    }

    fn activate(&mut self, new_text: NewText) {
        emit_event(
            &self.emitter,
            AppEvent::SourceTextChanged {
                text: new_text.text.clone(),
                added_to_history: !new_text.already_in_history,
            },
        );
        self.active_text = Some(new_text.text.clone());
        self.spawn_translation(new_text.text);
    }

    fn spawn_translation(&mut self, text: String) {
        // Generation is issued here, in command order, not inside the task
        let generation = self.orchestrator.begin();
        let language = self.language.current().clone();
        let orchestrator = Arc::clone(&self.orchestrator);
        self.tasks.spawn(async move {
            orchestrator.translate_as(generation, &text, &language).await;
        });
    }

    pub fn history(&self) -> &CaptureHistory {
        self.detector.history()
    }

    pub fn active_text(&self) -> Option<&str> {
        self.active_text.as_deref()
    }

    pub fn current_language(&self) -> &Language {
        self.language.current()
    }

    pub fn orchestrator(&self) -> &Arc<TranslationOrchestrator> {
        &self.orchestrator
    }
}
