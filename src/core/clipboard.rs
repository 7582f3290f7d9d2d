//! Clipboard module
//!
//! Turns raw "new text observed" notifications into captured source text.
//!
//! - `monitor`: background polling of the system clipboard
//! - `detector`: repeat/empty filtering, sole writer of the history
//! - `history`: ordered, duplicate-free capture list

pub mod detector;
pub mod history;
pub mod monitor;

pub use detector::{ChangeDetector, NewText};
pub use history::CaptureHistory;
pub use monitor::{ClipboardMonitor, ClipboardReader, SystemClipboard};
