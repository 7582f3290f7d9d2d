//! clip-translate
//!
//! Watches the clipboard (or reads lines from stdin), translates new text
//! through a local Ollama model and prints the results.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};

use clip_translate_lib::core::clipboard::{ClipboardMonitor, SystemClipboard};
use clip_translate_lib::core::session::SessionHandle;
use clip_translate_lib::shared::emit::EventEmitter;
use clip_translate_lib::shared::error::{AppError, AppResult};
use clip_translate_lib::shared::events::AppEvent;
use clip_translate_lib::shared::settings::AppSettings;
use clip_translate_lib::shared::types::Language;
use clip_translate_lib::{build_session, diagnostic_sink, init_tracing};

mod terminal;
use terminal::{language_listing, parse_input, render, InputLine, SessionView, HELP};

#[derive(Debug, Parser)]
#[command(
    name = "clip-translate",
    version,
    about = "Translate copied text with a local LLM",
    long_about = "Watches the clipboard for newly copied text, translates it through an Ollama-compatible backend and caches every result per target language."
)]
struct Args {
    /// Backend generate endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Model name sent with every request
    #[arg(long)]
    model: Option<String>,

    /// Target language code or label, e.g. `fr` or "French (fr)"
    #[arg(short, long)]
    language: Option<String>,

    /// Where new text comes from
    #[arg(long, default_value = "clipboard", value_enum)]
    source: Source,

    /// Clipboard polling interval in milliseconds
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Diagnostic log file
    #[arg(long, conflicts_with = "no_log_file")]
    log_file: Option<PathBuf>,

    /// Disable the diagnostic log file
    #[arg(long)]
    no_log_file: bool,

    /// Settings file (default: platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    /// Verbosity level for logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    /// Poll the system clipboard; typed lines are translated on demand
    Clipboard,
    /// Every stdin line is treated as newly copied text
    Stdin,
}

impl Args {
    /// Apply command-line overrides on top of the loaded settings
    fn apply(&self, settings: &mut AppSettings) {
        if let Some(endpoint) = &self.endpoint {
            settings.backend.endpoint = endpoint.clone();
        }
        if let Some(model) = &self.model {
            settings.backend.model = model.clone();
        }
        if let Some(language) = &self.language {
            settings.preferences.default_target_lang = language.clone();
        }
        if let Some(poll_ms) = self.poll_ms {
            settings.monitor.poll_interval_ms = poll_ms;
        }
        if let Some(path) = &self.log_file {
            settings.diagnostics.enabled = true;
            settings.diagnostics.log_path = Some(path.clone());
        }
        if self.no_log_file {
            settings.diagnostics.enabled = false;
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    });

    if let Err(e) = run(args).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn load_settings(args: &Args) -> AppResult<AppSettings> {
    let mut settings = match &args.config {
        Some(path) => AppSettings::load_from(path).await?,
        None => AppSettings::load().await.unwrap_or_else(|e| {
            warn!("[Settings] Failed to load settings, using defaults: {}", e);
            AppSettings::default()
        }),
    };
    args.apply(&mut settings);
    Ok(settings)
}

async fn run(args: Args) -> AppResult<()> {
    let settings = load_settings(&args).await?;
    let languages = settings.preferences.catalogue();

    let (emitter, events) = EventEmitter::channel();
    let (diagnostics, log_writer) = diagnostic_sink(&settings)?;
    let session = build_session(&settings, emitter, diagnostics)?;
    let view = Arc::new(Mutex::new(SessionView::new(session.current_language().clone())));
    info!(
        "[App] Translating to {} ({} languages configured)",
        session.current_language(),
        languages.len()
    );

    let (handle, session_task) = session.spawn();
    let presenter = tokio::spawn(present(events, Arc::clone(&view), args.json));

    let monitor = match args.source {
        Source::Clipboard => {
            let monitor = ClipboardMonitor::new(settings.monitor.poll_interval_ms);
            let signal_handle = handle.clone();
            let _poller = monitor.start(SystemClipboard::new, move |text| signal_handle.signal(text));
            println!("Watching the clipboard. Type :help for commands.");
            Some(monitor)
        }
        Source::Stdin => None,
    };

    let input = InputLoop {
        handle: handle.clone(),
        view: Arc::clone(&view),
        languages,
        settings: &settings,
        monitor: monitor.as_ref(),
        source: args.source,
    };
    input.run().await?;

    if let Some(monitor) = &monitor {
        monitor.stop();
    }
    handle.shutdown()?;
    drop(handle);

    // Dropping the session releases the last event emitter, which ends the presenter
    let session = session_task
        .await
        .map_err(|e| AppError::Session(format!("Session task failed: {}", e)))?;
    drop(session);
    if let Err(e) = presenter.await {
        warn!("[App] Presenter task failed: {}", e);
    }
    // Every sink clone went away with the session; wait for queued log lines
    if let Some(writer) = log_writer {
        if let Err(e) = writer.await {
            warn!("[App] Log writer task failed: {}", e);
        }
    }
    Ok(())
}

async fn present(mut events: UnboundedReceiver<AppEvent>, view: Arc<Mutex<SessionView>>, json: bool) {
    while let Some(event) = events.recv().await {
        match view.lock() {
            Ok(mut view) => view.observe(&event),
            Err(poisoned) => poisoned.into_inner().observe(&event),
        }
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("[App] Failed to serialize event: {}", e),
            }
        } else {
            println!("{}", render(&event));
        }
    }
}

struct InputLoop<'a> {
    handle: SessionHandle,
    view: Arc<Mutex<SessionView>>,
    languages: Vec<Language>,
    settings: &'a AppSettings,
    monitor: Option<&'a ClipboardMonitor>,
    source: Source,
}

impl InputLoop<'_> {
    /// Read stdin until `:quit`, end of input (stdin source) or Ctrl-C
    async fn run(&self) -> AppResult<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("[App] Interrupted");
                    return Ok(());
                }
                line = lines.next_line(), if stdin_open => match line? {
                    Some(line) => {
                        if !self.dispatch(&line)? {
                            return Ok(());
                        }
                    }
                    None if self.source == Source::Stdin => return Ok(()),
                    // Clipboard mode keeps running without a terminal
                    None => stdin_open = false,
                },
            }
        }
    }

    /// Handle one typed line; `false` ends the input loop
    fn dispatch(&self, line: &str) -> AppResult<bool> {
        let parsed = match parse_input(line) {
            Ok(parsed) => parsed,
            Err(message) => {
                println!("{}", message);
                return Ok(true);
            }
        };

        match parsed {
            InputLine::Blank => {}
            InputLine::Text(text) => match self.source {
                Source::Stdin => self.handle.signal(text),
                Source::Clipboard => self.handle.translate_text(text)?,
            },
            InputLine::Language(wanted) => {
                let language = self.settings.preferences.resolve_language(&wanted);
                self.handle.select_language(language)?;
            }
            InputLine::ListLanguages => {
                let view = self.view.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                println!("{}", language_listing(&self.languages, view.language()));
            }
            InputLine::ListHistory => {
                let view = self.view.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                if view.is_empty() {
                    println!("History is empty");
                } else {
                    println!("History ({} entries):\n{}", view.len(), view.listing());
                }
            }
            InputLine::Pick(number) => self.handle.select_history(number - 1)?,
            InputLine::Clear => self.handle.clear_all()?,
            InputLine::ToggleMonitor => match self.monitor {
                Some(monitor) => {
                    let enabled = monitor.toggle();
                    println!("Clipboard monitoring {}", if enabled { "resumed" } else { "paused" });
                }
                None => println!("Clipboard monitoring is not active"),
            },
            InputLine::Help => println!("{}", HELP),
            InputLine::Quit => return Ok(false),
        }
        Ok(true)
    }
}
