//! Per-instance publish/subscribe and request/response.
//!
//! [`EventHub`] is the mixin every component carries:
//!
//! | API | Semantics |
//! |-----|-----------|
//! | [`on`](EventHub::on) | append a listener for an event type |
//! | [`emit`](EventHub::emit) | start every listener in order, await all |
//! | [`wants`](EventHub::wants) | register the single handler for a wish |
//! | [`want`](EventHub::want) | invoke the wish handler, or fail |
//!
//! Events are not buffered: a listener registered after an `emit` never
//! sees that event.

use crate::{ComponentError, Handler, HandlerResult};
use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

/// Listener and wish tables for one component instance.
#[derive(Default)]
pub struct EventHub {
    callbacks: Mutex<HashMap<String, Vec<Handler>>>,
    wishes: Mutex<HashMap<String, Handler>>,
}

impl EventHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener for `kind`.
    pub fn on(&self, kind: impl Into<String>, callback: Handler) {
        self.callbacks
            .lock()
            .entry(kind.into())
            .or_default()
            .push(callback);
    }

    /// Invokes every listener for `kind` and awaits them all.
    ///
    /// Listeners are started in registration order. Returns `Ok(true)` if
    /// at least one listener existed.
    ///
    /// # Errors
    ///
    /// Returns the first listener error, after every listener finished.
    pub async fn emit(&self, kind: &str, args: Vec<Value>) -> Result<bool, ComponentError> {
        let listeners = self.callbacks.lock().get(kind).cloned().unwrap_or_default();
        if listeners.is_empty() {
            trace!(kind, "emit without listeners");
            return Ok(false);
        }

        let pending = listeners.iter().map(|cb| cb(args.clone()));
        let results = join_all(pending).await;
        results.into_iter().try_for_each(|r| r.map(|_| ()))?;
        Ok(true)
    }

    /// Registers the handler for wish `name`, replacing any previous one.
    pub fn wants(&self, name: impl Into<String>, handler: Handler) {
        self.wishes.lock().insert(name.into(), handler);
    }

    /// Invokes the handler registered for wish `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::WishNotImplemented`] when no handler is
    /// registered, or whatever the handler returns.
    pub async fn want(&self, name: &str, args: Vec<Value>) -> HandlerResult {
        let handler = self
            .wishes
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| ComponentError::WishNotImplemented(name.to_string()))?;
        handler(args).await
    }

    /// Returns whether a wish handler is registered for `name`.
    #[must_use]
    pub fn has_wish(&self, name: &str) -> bool {
        self.wishes.lock().contains_key(name)
    }

    /// Number of listeners registered for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: &str) -> usize {
        self.callbacks.lock().get(kind).map_or(0, Vec::len)
    }

    /// Drops every listener and wish handler.
    pub fn clear(&self) {
        self.callbacks.lock().clear();
        self.wishes.lock().clear();
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let callbacks = self.callbacks.lock();
        let wishes = self.wishes.lock();
        f.debug_struct("EventHub")
            .field("events", &callbacks.keys().collect::<Vec<_>>())
            .field("wishes", &wishes.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{handler, sync_handler};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn emit_reaches_every_listener_in_order() {
        let hub = EventHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            hub.on(
                "track",
                sync_handler(move |args| {
                    seen.lock().push((tag, args[0].clone()));
                    Ok(Value::Null)
                }),
            );
        }

        assert_eq!(hub.emit("track", vec![json!("a")]).await, Ok(true));
        assert_eq!(
            *seen.lock(),
            vec![("first", json!("a")), ("second", json!("a"))]
        );
    }

    #[tokio::test]
    async fn emit_without_listeners_returns_false() {
        let hub = EventHub::new();
        assert_eq!(hub.emit("nobody", vec![]).await, Ok(false));
    }

    #[tokio::test]
    async fn emit_is_not_buffered() {
        let hub = EventHub::new();
        hub.emit("early", vec![json!(1)]).await.expect("emit");

        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        hub.on(
            "early",
            sync_handler(move |_| {
                *counter.lock() += 1;
                Ok(Value::Null)
            }),
        );
        assert_eq!(*seen.lock(), 0);
    }

    #[tokio::test]
    async fn emit_waits_for_every_listener_then_reports_error() {
        let hub = EventHub::new();
        let finished = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&finished);

        hub.on("x", sync_handler(|_| Err(ComponentError::failed("bad"))));
        hub.on(
            "x",
            handler(move |_| {
                let flag = Arc::clone(&flag);
                async move {
                    tokio::task::yield_now().await;
                    *flag.lock() = true;
                    Ok(Value::Null)
                }
            }),
        );

        assert_eq!(
            hub.emit("x", vec![]).await,
            Err(ComponentError::failed("bad"))
        );
        assert!(*finished.lock());
    }

    #[tokio::test]
    async fn want_without_wants_fails() {
        let hub = EventHub::new();
        let err = hub.want("x", vec![]).await.expect_err("no handler");
        assert_eq!(err, ComponentError::WishNotImplemented("x".into()));
    }

    #[tokio::test]
    async fn want_returns_handler_result() {
        let hub = EventHub::new();
        hub.wants(
            "x",
            sync_handler(|args| {
                let a = args[0].as_i64().unwrap_or(0);
                let b = args[1].as_i64().unwrap_or(0);
                Ok(json!(a + b))
            }),
        );
        assert_eq!(hub.want("x", vec![json!(2), json!(3)]).await, Ok(json!(5)));
    }

    #[tokio::test]
    async fn later_wants_replaces_earlier() {
        let hub = EventHub::new();
        hub.wants("v", sync_handler(|_| Ok(json!(1))));
        hub.wants("v", sync_handler(|_| Ok(json!(2))));
        assert_eq!(hub.want("v", vec![]).await, Ok(json!(2)));
    }

    #[tokio::test]
    async fn clear_drops_listeners_and_wishes() {
        let hub = EventHub::new();
        hub.on("e", sync_handler(|_| Ok(Value::Null)));
        hub.wants("w", sync_handler(|_| Ok(Value::Null)));
        hub.clear();
        assert_eq!(hub.listener_count("e"), 0);
        assert!(!hub.has_wish("w"));
    }
}
