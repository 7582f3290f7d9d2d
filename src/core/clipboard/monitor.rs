use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use cli_clipboard::{ClipboardContext, ClipboardProvider};

use crate::shared::error::{AppError, AppResult};

const MAX_CONSECUTIVE_ERRORS: u32 = 10;
const MAX_POLL_INTERVAL_MS: u64 = 5000;

/// Source of clipboard text
pub trait ClipboardReader {
    fn read_text(&mut self) -> Result<String, String>;
}

/// System clipboard accessed through `cli-clipboard`
pub struct SystemClipboard {
    ctx: ClipboardContext,
}

impl SystemClipboard {
    pub fn new() -> AppResult<Self> {
        let ctx = ClipboardContext::new().map_err(|e| AppError::Clipboard(e.to_string()))?;
        Ok(Self { ctx })
    }
}

impl ClipboardReader for SystemClipboard {
    fn read_text(&mut self) -> Result<String, String> {
        self.ctx.get_contents().map_err(|e| e.to_string())
    }
}

/// Per-loop polling state: last raw content and error backoff
#[derive(Debug)]
pub struct PollState {
    base_interval_ms: u64,
    last_content: Option<String>,
    consecutive_errors: u32,
}

impl PollState {
    pub fn new(base_interval_ms: u64) -> Self {
        Self {
            base_interval_ms: base_interval_ms.max(1),
            last_content: None,
            consecutive_errors: 0,
        }
    }

    /// Read the clipboard once, forward changed content to `on_change`, and
    /// return how long to sleep before the next read.
    pub fn poll_once<R: ClipboardReader + ?Sized>(
        &mut self,
        reader: &mut R,
        on_change: &mut dyn FnMut(String),
    ) -> Duration {
        match reader.read_text() {
            Ok(current_content) => {
                // Reset error counter on successful read
                self.consecutive_errors = 0;

                if current_content.is_empty() {
                    return Duration::from_millis(self.base_interval_ms);
                }
                let has_changed = self.last_content.as_deref() != Some(current_content.as_str());
                if has_changed {
                    tracing::debug!("[ClipboardMonitor] Detected clipboard change");
                    self.last_content = Some(current_content.clone());
                    on_change(current_content);
                }
                Duration::from_millis(self.base_interval_ms)
            }
            Err(e) => {
                self.consecutive_errors += 1;

                // Only log errors occasionally to avoid spam
                if self.consecutive_errors == 1 || self.consecutive_errors % 10 == 0 {
                    tracing::warn!(
                        "[ClipboardMonitor] Failed to read clipboard (error #{}) : {}",
                        self.consecutive_errors,
                        e
                    );
                }
                Duration::from_millis(self.backoff_interval_ms())
            }
        }
    }

    fn backoff_interval_ms(&self) -> u64 {
        if self.consecutive_errors < MAX_CONSECUTIVE_ERRORS {
            return self.base_interval_ms;
        }
        if self.consecutive_errors == MAX_CONSECUTIVE_ERRORS {
            tracing::warn!("[ClipboardMonitor] Too many consecutive errors. Reducing polling frequency.");
        }
        let exponent = (self.consecutive_errors - MAX_CONSECUTIVE_ERRORS).min(4);
        std::cmp::min(
            self.base_interval_ms.saturating_mul(2_u64.pow(exponent)),
            MAX_POLL_INTERVAL_MS.max(self.base_interval_ms),
        )
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }
}

/// Clipboard monitor that polls for changes on a background thread
#[derive(Clone)]
pub struct ClipboardMonitor {
    enabled: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    poll_interval_ms: u64,
}

impl ClipboardMonitor {
    pub fn new(poll_interval_ms: u64) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(true)),
            shutdown: Arc::new(AtomicBool::new(false)),
            poll_interval_ms,
        }
    }

    /// Start polling. The reader is built on the polling thread, since
    /// platform clipboard handles are not always `Send`.
    pub fn start<R, F, S>(&self, make_reader: F, mut signal: S) -> JoinHandle<()>
    where
        R: ClipboardReader,
        F: FnOnce() -> AppResult<R> + Send + 'static,
        S: FnMut(String) + Send + 'static,
    {
        let enabled = Arc::clone(&self.enabled);
        let shutdown = Arc::clone(&self.shutdown);
        let base_interval = self.poll_interval_ms;

        std::thread::spawn(move || {
            let mut reader = match make_reader() {
                Ok(reader) => reader,
                Err(e) => {
                    tracing::error!("[ClipboardMonitor] Could not open clipboard: {}", e);
                    return;
                }
            };
            tracing::info!("[ClipboardMonitor] Started monitoring");

            let mut state = PollState::new(base_interval);
            while !shutdown.load(Ordering::SeqCst) {
                let sleep_for = if enabled.load(Ordering::SeqCst) {
                    state.poll_once(&mut reader, &mut signal)
                } else {
                    // Reset error count when disabled
                    state.consecutive_errors = 0;
                    Duration::from_millis(state.base_interval_ms)
                };
                std::thread::sleep(sleep_for);
            }
            tracing::info!("[ClipboardMonitor] Stopped monitoring");
        })
    }

    /// Enable clipboard monitoring
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
        tracing::info!("[ClipboardMonitor] Enabled");
    }

    /// Disable clipboard monitoring
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        tracing::info!("[ClipboardMonitor] Disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Toggle monitoring on/off, returning the new state
    pub fn toggle(&self) -> bool {
        let new_state = !self.enabled.fetch_xor(true, Ordering::SeqCst);
        tracing::info!("[ClipboardMonitor] Toggled to {}", new_state);
        new_state
    }

    /// Ask the polling thread to exit after its current sleep
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::mpsc;

    struct ScriptedClipboard {
        reads: VecDeque<Result<String, String>>,
    }

    impl ScriptedClipboard {
        fn new(reads: Vec<Result<&str, &str>>) -> Self {
            Self {
                reads: reads
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            }
        }
    }

    impl ClipboardReader for ScriptedClipboard {
        fn read_text(&mut self) -> Result<String, String> {
            self.reads.pop_front().unwrap_or_else(|| Ok(String::new()))
        }
    }

    #[test]
    fn test_forwards_only_changes() {
        let mut reader = ScriptedClipboard::new(vec![Ok("a"), Ok("a"), Ok(""), Ok("b"), Ok("a")]);
        let mut state = PollState::new(500);
        let mut seen = Vec::new();
        for _ in 0..5 {
            state.poll_once(&mut reader, &mut |text| seen.push(text));
        }
        assert_eq!(seen, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_backoff_after_repeated_errors() {
        let mut reads = vec![Err("locked"); 12];
        reads.push(Ok("back"));
        let mut reader = ScriptedClipboard::new(reads);
        let mut state = PollState::new(500);
        let mut noop = |_: String| {};

        let mut intervals = Vec::new();
        for _ in 0..12 {
            intervals.push(state.poll_once(&mut reader, &mut noop));
        }
        assert_eq!(intervals[0], Duration::from_millis(500));
        assert_eq!(intervals[8], Duration::from_millis(500));
        // 10th error starts the backoff
        assert_eq!(intervals[9], Duration::from_millis(500));
        assert_eq!(intervals[10], Duration::from_millis(1000));
        assert_eq!(intervals[11], Duration::from_millis(2000));
        assert_eq!(state.consecutive_errors(), 12);

        // Successful read resets the counter
        assert_eq!(state.poll_once(&mut reader, &mut noop), Duration::from_millis(500));
        assert_eq!(state.consecutive_errors(), 0);
    }

    #[test]
    fn test_backoff_is_capped() {
        let mut reader = ScriptedClipboard::new(vec![Err("locked"); 30]);
        let mut state = PollState::new(500);
        let mut noop = |_: String| {};
        let mut last = Duration::ZERO;
        for _ in 0..30 {
            last = state.poll_once(&mut reader, &mut noop);
        }
        assert_eq!(last, Duration::from_millis(MAX_POLL_INTERVAL_MS));
    }

    #[test]
    fn test_toggle() {
        let monitor = ClipboardMonitor::new(500);
        assert!(monitor.is_enabled());
        assert!(!monitor.toggle());
        assert!(!monitor.is_enabled());
        assert!(monitor.toggle());
        monitor.disable();
        assert!(!monitor.is_enabled());
        monitor.enable();
        assert!(monitor.is_enabled());
    }

    #[test]
    fn test_background_thread_signals_and_stops() {
        let monitor = ClipboardMonitor::new(1);
        let (tx, rx) = mpsc::channel();
        let handle = monitor.start(
            || Ok(ScriptedClipboard::new(vec![Ok("hello"), Ok("hello"), Ok("world")])),
            move |text| {
                let _ = tx.send(text);
            },
        );

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).ok().as_deref(), Some("hello"));
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).ok().as_deref(), Some("world"));

        monitor.stop();
        assert!(handle.join().is_ok());
    }
}
