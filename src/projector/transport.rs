//! Delivery of projection messages to the popout

use std::sync::mpsc::Sender;
use tracing::{debug, error};

use crate::protocol::{self, ProjectionMessage};

/// Fire-and-forget sink for projection messages
///
/// Posting never blocks. A closed popout is not an error for the
/// projector, so failures are logged and dropped.
pub trait Transport: Send {
    fn post(&self, message: ProjectionMessage);
}

/// Channel into the popout's event loop, carrying encoded wire JSON
pub struct ChannelTransport {
    tx: Sender<String>,
    /// Nudges the receiving event loop awake, e.g. an egui repaint request
    waker: Option<Box<dyn Fn() + Send>>,
}

impl ChannelTransport {
    pub fn new(tx: Sender<String>) -> Self {
        Self { tx, waker: None }
    }

    pub fn with_waker(mut self, waker: impl Fn() + Send + 'static) -> Self {
        self.waker = Some(Box::new(waker));
        self
    }
}

impl Transport for ChannelTransport {
    fn post(&self, message: ProjectionMessage) {
        let kind = message.type_name();
        let raw = match protocol::encode(&message) {
            Ok(raw) => raw,
            Err(e) => {
                error!(kind, error = %e, "Failed to encode projection message");
                return;
            }
        };
        if let Err(e) = self.tx.send(raw) {
            debug!(kind, error = %e, "Popout not listening, dropping message");
            return;
        }
        if let Some(wake) = &self.waker {
            wake();
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[test]
    fn test_channel_transport_delivers_and_wakes() {
        let (tx, rx) = mpsc::channel();
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        let transport = ChannelTransport::new(tx).with_waker(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        transport.post(ProjectionMessage::Next);
        let raw = rx.try_recv().unwrap();
        assert!(raw.contains(r#""plugin":"vtt-card-display""#));
        assert_eq!(protocol::decode(&raw).unwrap(), Some(ProjectionMessage::Next));
        assert_eq!(wakes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_closed_channel_is_tolerated() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let transport = ChannelTransport::new(tx);
        transport.post(ProjectionMessage::Prev);
    }
}
