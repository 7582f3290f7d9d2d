//! Append-only diagnostic log
//!
//! Every message is recorded as `[timestamp] message`. Recording is
//! fire-and-forget: a sink never reports failure to its caller.

use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// One-way diagnostic recorder
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, message: &str);
}

/// Prefix a message with the local wall-clock time
pub fn timestamped(message: &str) -> String {
    format!("[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), message)
}

/// Sink that appends lines to a text file.
///
/// `record` only queues the line; a writer task on the tokio runtime owns
/// the file, so callers never wait on disk I/O.
pub struct FileDiagnosticSink {
    tx: UnboundedSender<String>,
}

impl FileDiagnosticSink {
    /// Start the writer task. It finishes once the sink is dropped and every
    /// queued line has been written.
    pub fn spawn(path: impl Into<PathBuf>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = unbounded_channel();
        let writer = tokio::spawn(write_lines(path.into(), rx));
        (Self { tx }, writer)
    }
}

impl DiagnosticSink for FileDiagnosticSink {
    fn record(&self, message: &str) {
        // Stamped here so the time reflects the event, not the write
        if self.tx.send(timestamped(message)).is_err() {
            tracing::debug!("[Diagnostics] Log writer stopped, dropping line");
        }
    }
}

async fn open_log(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    OpenOptions::new().create(true).append(true).open(path).await
}

async fn write_lines(path: PathBuf, mut rx: UnboundedReceiver<String>) {
    let mut file: Option<File> = None;

    while let Some(line) = rx.recv().await {
        if file.is_none() {
            match open_log(&path).await {
                Ok(opened) => file = Some(opened),
                Err(e) => {
                    tracing::debug!("[Diagnostics] Error opening log {}: {}", path.display(), e);
                    continue;
                }
            }
        }
        let written = match file.as_mut() {
            Some(handle) => handle.write_all(format!("{}\n", line).as_bytes()).await,
            None => continue,
        };
        if let Err(e) = written {
            tracing::debug!("[Diagnostics] Error writing to log {}: {}", path.display(), e);
            // Reopen on the next line
            file = None;
        }
    }

    if let Some(mut handle) = file {
        if let Err(e) = handle.flush().await {
            tracing::debug!("[Diagnostics] Error flushing log {}: {}", path.display(), e);
        }
    }
}

/// Sink that discards everything
pub struct NullDiagnosticSink;

impl DiagnosticSink for NullDiagnosticSink {
    fn record(&self, _message: &str) {}
}
