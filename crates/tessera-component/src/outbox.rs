//! Remote-side hooks for a component hosted behind a bridge.
//!
//! A hosted component's base carries an [`Outbox`]. Every `emit` is
//! copied into the outbox FIFO, and every `expose` registers the handler
//! under a fresh [`ExposedId`] and queues an announcement. The host drains
//! the FIFO on behalf of the local wrapper, one envelope per `listen`.

use crate::Handler;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tessera_event::{EventEnvelope, ExposedId};
use tokio::sync::mpsc;
use tracing::trace;

/// Event FIFO plus exposed-function table of one hosted instance.
///
/// Cloning shares both.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<EventEnvelope>,
    functions: Arc<Mutex<HashMap<ExposedId, Handler>>>,
    next_id: Arc<AtomicU64>,
}

impl Outbox {
    /// Creates an outbox and the receiving end of its FIFO.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EventEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let outbox = Self {
            tx,
            functions: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        };
        (outbox, rx)
    }

    /// Queues an envelope.
    ///
    /// Returns `false` once the receiving end is gone.
    pub fn push(&self, envelope: EventEnvelope) -> bool {
        trace!(kind = %envelope.kind, "outbox push");
        self.tx.send(envelope).is_ok()
    }

    /// Registers `handler` and queues its announcement.
    pub fn expose(&self, name: &str, handler: Handler) -> ExposedId {
        let id = ExposedId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.functions.lock().insert(id, handler);
        self.push(EventEnvelope::announce(id, name));
        id
    }

    /// Looks up an exposed function.
    #[must_use]
    pub fn handler(&self, id: ExposedId) -> Option<Handler> {
        self.functions.lock().get(&id).cloned()
    }

    /// Number of exposed functions.
    #[must_use]
    pub fn exposed_count(&self) -> usize {
        self.functions.lock().len()
    }

    /// Drops every exposed function.
    pub fn clear(&self) {
        self.functions.lock().clear();
    }
}

impl std::fmt::Debug for Outbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbox")
            .field("exposed", &self.exposed_count())
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync_handler;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn fifo_order_preserved() {
        let (outbox, mut rx) = Outbox::new();
        outbox.push(EventEnvelope::new("a", vec![]));
        outbox.push(EventEnvelope::new("b", vec![json!(1)]));

        assert_eq!(rx.recv().await.map(|e| e.kind), Some("a".to_string()));
        assert_eq!(rx.recv().await.map(|e| e.kind), Some("b".to_string()));
    }

    #[tokio::test]
    async fn expose_announces_unique_ids() {
        let (outbox, mut rx) = Outbox::new();
        let first = outbox.expose("pause", sync_handler(|_| Ok(Value::Null)));
        let second = outbox.expose("resume", sync_handler(|_| Ok(json!("ok"))));
        assert_ne!(first, second);

        let ann = rx.recv().await.expect("announcement");
        let (id, name) = ann.as_exposure().expect("reserved").expect("well-formed");
        assert_eq!((id, name), (first, "pause"));

        let h = outbox.handler(second).expect("registered");
        assert_eq!(h(vec![]).await, Ok(json!("ok")));
    }

    #[test]
    fn push_after_receiver_dropped() {
        let (outbox, rx) = Outbox::new();
        drop(rx);
        assert!(!outbox.push(EventEnvelope::new("late", vec![])));
    }
}
