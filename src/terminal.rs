//! Terminal rendering of session events and parsing of typed input

use clip_translate_lib::shared::error::TranslateErrorKind;
use clip_translate_lib::shared::events::AppEvent;
use clip_translate_lib::shared::types::{Language, TranslationOutcome};

/// One line typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    /// Plain text to translate
    Text(String),
    /// `:lang <code or label>`
    Language(String),
    /// `:langs`
    ListLanguages,
    /// `:history`
    ListHistory,
    /// `:pick <n>`, numbered from 1 as listed
    Pick(usize),
    /// `:clear`
    Clear,
    /// `:pause`
    ToggleMonitor,
    /// `:help`
    Help,
    /// `:quit`
    Quit,
    Blank,
}

pub const HELP: &str = "\
Commands:
  :lang <code>   switch target language (e.g. :lang fr, :lang \"German (de)\")
  :langs         list configured languages
  :history       list captured texts
  :pick <n>      translate history entry n again
  :clear         clear history and cached translations
  :pause         pause/resume clipboard monitoring
  :quit          exit
Any other line is translated as-is.";

pub fn parse_input(line: &str) -> Result<InputLine, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(InputLine::Blank);
    }
    let Some(command) = trimmed.strip_prefix(':') else {
        return Ok(InputLine::Text(line.trim_end_matches(['\r', '\n']).to_string()));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim().trim_matches('"')),
        None => (command, ""),
    };
    match name {
        "lang" if arg.is_empty() => Err("Usage: :lang <code>".to_string()),
        "lang" => Ok(InputLine::Language(arg.to_string())),
        "langs" => Ok(InputLine::ListLanguages),
        "history" => Ok(InputLine::ListHistory),
        "pick" => match arg.parse::<usize>() {
            Ok(0) | Err(_) => Err("Usage: :pick <n> (entries are numbered from 1)".to_string()),
            Ok(n) => Ok(InputLine::Pick(n)),
        },
        "clear" => Ok(InputLine::Clear),
        "pause" => Ok(InputLine::ToggleMonitor),
        "help" => Ok(InputLine::Help),
        "quit" | "q" | "exit" => Ok(InputLine::Quit),
        other => Err(format!("Unknown command :{} (try :help)", other)),
    }
}

/// Presentation-side mirror of the history and target language, kept in
/// sync from events
#[derive(Debug)]
pub struct SessionView {
    texts: Vec<String>,
    language: Language,
}

impl SessionView {
    pub fn new(language: Language) -> Self {
        Self {
            texts: Vec::new(),
            language,
        }
    }

    pub fn observe(&mut self, event: &AppEvent) {
        match event {
            AppEvent::SourceTextChanged {
                text,
                added_to_history: true,
            } => self.texts.push(text.clone()),
            AppEvent::HistoryCleared => self.texts.clear(),
            AppEvent::LanguageChanged { current, .. } => self.language = current.clone(),
            _ => {}
        }
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn listing(&self) -> String {
        self.texts
            .iter()
            .enumerate()
            .map(|(i, text)| format!("{:>3}. {}", i + 1, preview(text)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn language_listing(languages: &[Language], current: &Language) -> String {
    languages
        .iter()
        .map(|lang| {
            let marker = if lang.code == current.code { '*' } else { ' ' };
            format!(" {} {}", marker, lang.label())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Single-line preview of possibly multi-line clipboard text
fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 60;
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= MAX_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(MAX_CHARS).collect();
    format!("{}...", cut)
}

/// Human-readable line for an event
pub fn render(event: &AppEvent) -> String {
    match event {
        AppEvent::SourceTextChanged { text, added_to_history } => {
            if *added_to_history {
                format!("> {}", preview(text))
            } else {
                format!("> {} (from history)", preview(text))
            }
        }
        AppEvent::TranslationStarted { .. } => "Translating...".to_string(),
        AppEvent::TranslationDelivered(delivery) => match &delivery.outcome {
            TranslationOutcome::Cached(text) => {
                format!("[{}] {} (cached)", delivery.language.code, text)
            }
            TranslationOutcome::Fresh(text) => format!("[{}] {}", delivery.language.code, text),
            TranslationOutcome::Error { kind, detail } => match kind {
                TranslateErrorKind::EmptyResult => {
                    "Translation error: the backend returned an empty translation".to_string()
                }
                TranslateErrorKind::Backend | TranslateErrorKind::MalformedResponse => detail.clone(),
            },
        },
        AppEvent::LanguageChanged { current, .. } => format!("Target language: {}", current.label()),
        AppEvent::HistoryCleared => "History and cached translations cleared".to_string(),
        AppEvent::Notice(message) => message.clone(),
    }
}
