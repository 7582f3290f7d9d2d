use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use super::events::AppEvent;

/// Sending half of the presentation channel
#[derive(Clone)]
pub struct EventEmitter {
    tx: UnboundedSender<AppEvent>,
}

impl EventEmitter {
    /// Create an emitter and the receiver the presentation layer drains
    pub fn channel() -> (Self, UnboundedReceiver<AppEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }
}

/// Emit an application event to the presentation layer
pub fn emit_event(emitter: &EventEmitter, event: AppEvent) {
    // A closed receiver means the presentation layer is gone; nothing else depends on delivery
    if emitter.tx.send(event).is_err() {
        tracing::debug!("[Emit] Presentation channel closed, dropping event");
    }
}
