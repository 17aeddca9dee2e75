//! Helpers for testing components and applications.
//!
//! - [`init_tracing`]: installs a test subscriber honoring `RUST_LOG`
//! - [`Recorder`]: handler factory that records every invocation
//! - [`Probe`]: minimal component counting its lifecycle calls, with
//!   switchable failures
//!
//! # Example
//!
//! ```
//! use tessera_component::testing::Recorder;
//! use tessera_component::{ComponentBase, ComponentContext};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let base = ComponentBase::new("Player", &ComponentContext::default());
//! let rec = Recorder::new();
//! base.on("track-start", rec.handler("lyrics"));
//!
//! base.emit("track-start", vec![json!("abc")]).await.expect("emit");
//! assert_eq!(rec.labels(), vec!["lyrics"]);
//! # }
//! ```

use crate::{sync_handler, Component, ComponentBase, ComponentContext, ComponentError, Handler};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a `fmt` subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_test_writer())
        .with(filter)
        .try_init();
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Label given to [`Recorder::handler`].
    pub label: String,
    /// Arguments received.
    pub args: Vec<Value>,
}

/// Shared invocation log.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    records: Arc<Mutex<Vec<Record>>>,
}

impl Recorder {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler that records `label` and its arguments, returning `null`.
    #[must_use]
    pub fn handler(&self, label: &str) -> Handler {
        self.returning(label, Value::Null)
    }

    /// Handler that records `label` and its arguments, returning `value`.
    #[must_use]
    pub fn returning(&self, label: &str, value: Value) -> Handler {
        let records = Arc::clone(&self.records);
        let label = label.to_string();
        sync_handler(move |args| {
            records.lock().push(Record {
                label: label.clone(),
                args,
            });
            Ok(value.clone())
        })
    }

    /// Appends a record directly.
    pub fn record(&self, label: &str, args: Vec<Value>) {
        self.records.lock().push(Record {
            label: label.to_string(),
            args,
        });
    }

    /// All records, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().clone()
    }

    /// Labels, oldest first.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.records.lock().iter().map(|r| r.label.clone()).collect()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Forgets every record.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

/// Lifecycle-counting test component.
#[derive(Debug)]
pub struct Probe {
    base: ComponentBase,
    initialized: AtomicUsize,
    closed: AtomicUsize,
    init_args: Mutex<Option<Vec<Value>>>,
    fail_initialize: bool,
    fail_close: bool,
    log: Option<Recorder>,
}

impl Probe {
    /// Creates a probe named `name`.
    pub fn new(name: &str, cx: &ComponentContext) -> Self {
        Self {
            base: ComponentBase::new(name, cx),
            initialized: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            init_args: Mutex::new(None),
            fail_initialize: false,
            fail_close: false,
            log: None,
        }
    }

    /// Makes `initialize` fail.
    #[must_use]
    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    /// Makes `close` fail after closing the base.
    #[must_use]
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Records `"<name>.initialize"` and `"<name>.close"` into `log`.
    #[must_use]
    pub fn logging_to(mut self, log: Recorder) -> Self {
        self.log = Some(log);
        self
    }

    /// Number of `initialize` calls.
    #[must_use]
    pub fn initialize_count(&self) -> usize {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Number of `close` calls.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Arguments of the last `initialize` call.
    #[must_use]
    pub fn init_args(&self) -> Option<Vec<Value>> {
        self.init_args.lock().clone()
    }

    fn log(&self, what: &str, args: Vec<Value>) {
        if let Some(log) = &self.log {
            log.record(&format!("{}.{}", self.base.name(), what), args);
        }
    }
}

#[async_trait]
impl Component for Probe {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    async fn initialize(&self, args: Vec<Value>) -> Result<(), ComponentError> {
        self.initialized.fetch_add(1, Ordering::SeqCst);
        *self.init_args.lock() = Some(args.clone());
        self.log("initialize", args);
        if self.fail_initialize {
            return Err(ComponentError::InitFailed(format!(
                "{} refused to initialize",
                self.base.name()
            )));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), ComponentError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.base.close();
        self.log("close", Vec::new());
        if self.fail_close {
            return Err(ComponentError::failed(format!(
                "{} failed to close",
                self.base.name()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn recorder_keeps_order_and_args() {
        let rec = Recorder::new();
        let a = rec.handler("a");
        let b = rec.returning("b", json!(7));

        assert_eq!(a(vec![json!(1)]).await, Ok(Value::Null));
        assert_eq!(b(vec![]).await, Ok(json!(7)));
        assert_eq!(rec.labels(), vec!["a", "b"]);
        assert_eq!(rec.records()[0].args, vec![json!(1)]);
    }

    #[tokio::test]
    async fn probe_counts_and_fails_on_demand() {
        let log = Recorder::new();
        let probe = Probe::new("P", &ComponentContext::default())
            .failing_initialize()
            .logging_to(log.clone());

        assert!(probe.initialize(vec![json!("x")]).await.is_err());
        assert!(probe.close().await.is_ok());
        assert_eq!(probe.initialize_count(), 1);
        assert_eq!(probe.close_count(), 1);
        assert_eq!(probe.init_args(), Some(vec![json!("x")]));
        assert_eq!(log.labels(), vec!["P.initialize", "P.close"]);
    }

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
