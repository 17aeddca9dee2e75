//! The relation reconciler.

use super::registry::{Registry, Slot};
use super::{ComponentType, Describe, PassReport, PendingRefresh, PostConstruct};
use crate::config::RuntimeConfig;
use crate::RuntimeError;
use futures::future::join_all;
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tessera_component::{
    downcast_arc, Component, ComponentContext, ComponentError, Constructed, Exposer,
    PendingComponent, RefreshHandle,
};
use tessera_types::{Relation, TypeKey};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Per-type initialization arguments for [`Application::initialize`].
#[derive(Debug, Clone, Default)]
pub struct InitArgs {
    args: HashMap<TypeKey, Vec<Value>>,
}

impl InitArgs {
    /// No arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the arguments for `key`.
    #[must_use]
    pub fn with(mut self, key: TypeKey, args: Vec<Value>) -> Self {
        self.args.insert(key, args);
        self
    }

    /// Sets the arguments for component type `T`.
    #[must_use]
    pub fn with_type<T: Component>(self, args: Vec<Value>) -> Self {
        self.with(TypeKey::of::<T>(), args)
    }
}

struct Inner {
    types: Vec<ComponentType>,
    handlers: HashMap<TypeKey, Vec<PostConstruct>>,
    args: Mutex<HashMap<TypeKey, Vec<Value>>>,
    registry: Mutex<Registry>,
    exposer: Exposer,
    config: RuntimeConfig,
    initialized: watch::Sender<bool>,
    /// Serializes `initialize`, refresh passes and `close`.
    pass_lock: tokio::sync::Mutex<()>,
    scheduled: Mutex<Option<PendingRefresh>>,
    /// Construction failures waiting to be reported by `initialize`.
    deferred: Mutex<PassReport>,
    /// Set by `close`; the next `initialize` rebuilds the initial snapshot.
    needs_snapshot: AtomicBool,
}

/// Keeps component instances in sync with their types' relation lists.
///
/// Cloning is cheap and shares the application.
///
/// # Lifecycle
///
/// ```text
/// build() ──► initialize() ──► refresh()* ──► close()
///   │              │               │            │
///   construct      resolve pending  diff lists   close all
///   snapshot       inject handlers  close stale  clear exposer
///                  initialize       create new
/// ```
#[derive(Clone)]
pub struct Application {
    inner: Arc<Inner>,
}

enum Step {
    Ready(Arc<dyn Component>),
    Await(PendingComponent),
}

impl Application {
    pub(crate) fn assemble(
        types: Vec<ComponentType>,
        handlers: HashMap<TypeKey, Vec<PostConstruct>>,
        args: HashMap<TypeKey, Vec<Value>>,
        config: RuntimeConfig,
    ) -> Self {
        let (initialized, _) = watch::channel(false);
        let app = Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry::new(types.len())),
                types,
                handlers,
                args: Mutex::new(args),
                exposer: Exposer::new(),
                config,
                initialized,
                pass_lock: tokio::sync::Mutex::new(()),
                scheduled: Mutex::new(None),
                deferred: Mutex::new(PassReport::default()),
                needs_snapshot: AtomicBool::new(false),
            }),
        };

        let mut report = PassReport::default();
        app.construct_snapshot(&mut report);
        *app.inner.deferred.lock() = report;
        app
    }

    /// The application's exposure scope.
    #[must_use]
    pub fn exposer(&self) -> &Exposer {
        &self.inner.exposer
    }

    /// The configuration the application was built with.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Declared types in construction order.
    #[must_use]
    pub fn types(&self) -> &[ComponentType] {
        &self.inner.types
    }

    /// Returns whether `initialize` completed and `close` has not run since.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        *self.inner.initialized.borrow()
    }

    /// Number of registered instances, pending ones included.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.inner.registry.lock().len()
    }

    /// Resolves, injects and initializes every instance not initialized
    /// yet, one at a time in construction order.
    ///
    /// `args` are merged into the stored per-type arguments. Failures are
    /// isolated and reported; they never abort the pass. Releases refresh
    /// passes waiting for initialization.
    pub async fn initialize(&self, args: InitArgs) -> PassReport {
        let _guard = self.inner.pass_lock.lock().await;
        self.inner.args.lock().extend(args.args);

        let mut report = std::mem::take(&mut *self.inner.deferred.lock());
        if self.inner.needs_snapshot.swap(false, Ordering::SeqCst) {
            self.construct_snapshot(&mut report);
        }

        let pending = self.inner.registry.lock().uninitialized();
        for seq in pending {
            self.activate(seq, &mut report).await;
        }

        self.inner.initialized.send_replace(true);
        self.log_pass("Initialization", &report);
        report
    }

    /// Schedules a reconciliation pass.
    ///
    /// Calls made before the scheduled pass starts share it. The pass
    /// starts after the caller yields (plus the configured debounce) and
    /// waits for [`initialize`](Self::initialize) if needed. Without a
    /// tokio runtime the pass only runs when awaited.
    pub fn refresh(&self) -> PendingRefresh {
        let mut scheduled = self.inner.scheduled.lock();
        if let Some(pending) = scheduled.as_ref() {
            return pending.clone();
        }

        let weak = Arc::downgrade(&self.inner);
        let debounce = self.inner.config.reconciler.refresh_debounce();
        let pass = async move {
            match debounce {
                Some(delay) => tokio::time::sleep(delay).await,
                None => tokio::task::yield_now().await,
            }
            loop {
                let Some(mut ready) = weak.upgrade().map(|inner| inner.initialized.subscribe())
                else {
                    return PassReport::default();
                };
                // Errs once the application is dropped.
                if ready.wait_for(|initialized| *initialized).await.is_err() {
                    return PassReport::default();
                }
                let Some(inner) = weak.upgrade() else {
                    return PassReport::default();
                };
                if let Some(report) = (Application { inner }).run_scheduled().await {
                    return report;
                }
            }
        }
        .boxed()
        .shared();

        let pending = PendingRefresh::new(pass);
        *scheduled = Some(pending.clone());
        drop(scheduled);

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(pending.clone());
                debug!("Refresh scheduled: debounce={:?}", debounce);
            }
            Err(_) => debug!("Refresh scheduled without runtime, runs when awaited"),
        }
        pending
    }

    /// Closes every instance concurrently, clears the exposure scope and
    /// marks the application not initialized.
    pub async fn close(&self) -> PassReport {
        let _guard = self.inner.pass_lock.lock().await;
        self.inner.initialized.send_replace(false);

        let entries = self.inner.registry.lock().drain();
        let mut report = PassReport::default();
        self.close_entries(entries, &mut report).await;

        self.inner.exposer.clear();
        *self.inner.deferred.lock() = PassReport::default();
        self.inner.needs_snapshot.store(true, Ordering::SeqCst);

        self.log_pass("Close", &report);
        report
    }

    /// First live instance of `key` (or a subtype), optionally bound to
    /// `relation`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NotFound`] when nothing matches.
    pub fn get_component(
        &self,
        key: TypeKey,
        relation: Option<&Relation>,
    ) -> Result<Arc<dyn Component>, RuntimeError> {
        self.get_components(key, relation)
            .into_iter()
            .next()
            .ok_or_else(|| RuntimeError::NotFound(key.name().to_string()))
    }

    /// Every live instance of `key` (or a subtype), optionally bound to
    /// `relation`, in construction order.
    #[must_use]
    pub fn get_components(
        &self,
        key: TypeKey,
        relation: Option<&Relation>,
    ) -> Vec<Arc<dyn Component>> {
        let registry = self.inner.registry.lock();
        registry
            .entries()
            .filter(|e| self.inner.types[e.type_idx].is_a(key))
            .filter(|e| relation.map_or(true, |r| e.relation.as_ref() == Some(r)))
            .filter_map(|e| e.live().cloned())
            .collect()
    }

    /// Typed [`get_component`](Self::get_component).
    ///
    /// # Errors
    ///
    /// Same as [`get_component`](Self::get_component).
    pub fn get<T: Component>(&self, relation: Option<&Relation>) -> Result<Arc<T>, RuntimeError> {
        self.get_all::<T>(relation)
            .into_iter()
            .next()
            .ok_or_else(|| RuntimeError::NotFound(TypeKey::of::<T>().name().to_string()))
    }

    /// Typed [`get_components`](Self::get_components).
    #[must_use]
    pub fn get_all<T: Component>(&self, relation: Option<&Relation>) -> Vec<Arc<T>> {
        self.get_components(TypeKey::of::<T>(), relation)
            .into_iter()
            .filter_map(downcast_arc::<T>)
            .collect()
    }

    fn context(&self, relation: Option<Relation>) -> ComponentContext {
        let weak = Arc::downgrade(&self.inner);
        let refresh = RefreshHandle::new(move || {
            if let Some(inner) = weak.upgrade() {
                let _ = Application { inner }.refresh();
            }
        });
        ComponentContext::new(self.inner.exposer.clone(), relation, refresh)
    }

    /// Constructs every instance of the current relation lists that is not
    /// registered yet. Pending constructions stay pending.
    fn construct_snapshot(&self, report: &mut PassReport) {
        for (idx, ty) in self.inner.types.iter().enumerate() {
            match ty.relations() {
                None => {
                    if !self.inner.registry.lock().has_singleton(idx) {
                        self.construct(idx, None, report);
                    }
                }
                Some(listed) => {
                    let diff = self.inner.registry.lock().diff(idx, &listed);
                    for relation in diff.missing {
                        self.construct(idx, Some(relation), report);
                    }
                }
            }
        }
    }

    fn construct(&self, idx: usize, relation: Option<Relation>, report: &mut PassReport) -> Option<u64> {
        let ty = &self.inner.types[idx];
        let slot = match ty.construct(self.context(relation.clone())) {
            Ok(Constructed::Ready(component)) => Slot::Live(component),
            Ok(Constructed::Pending(future)) => Slot::Pending(future),
            Err(e) => {
                warn!("Component {} construction failed: {}", ty.name(), e);
                self.inner
                    .registry
                    .lock()
                    .mark_failed(idx, relation.as_ref());
                report.fail(relation, RuntimeError::construction(ty.name(), e));
                return None;
            }
        };
        debug!("Component {} constructed: relation={:?}", ty.name(), relation);
        Some(self.inner.registry.lock().insert(idx, relation, slot))
    }

    /// Resolves a pending slot, runs post-construct handlers and
    /// `initialize` for one entry.
    async fn activate(&self, seq: u64, report: &mut PassReport) {
        let (idx, relation, step) = {
            let mut registry = self.inner.registry.lock();
            let Some(entry) = registry.get_mut(seq) else {
                return;
            };
            let step = match std::mem::replace(&mut entry.slot, Slot::Resolving) {
                Slot::Live(component) => {
                    entry.slot = Slot::Live(Arc::clone(&component));
                    Step::Ready(component)
                }
                Slot::Pending(future) => Step::Await(future),
                Slot::Resolving => return,
            };
            (entry.type_idx, entry.relation.clone(), step)
        };
        let ty = &self.inner.types[idx];

        let component = match step {
            Step::Ready(component) => component,
            Step::Await(future) => match future.await {
                Ok(component) => {
                    if let Some(entry) = self.inner.registry.lock().get_mut(seq) {
                        entry.slot = Slot::Live(Arc::clone(&component));
                    }
                    debug!("Component {} resolved: relation={:?}", ty.name(), relation);
                    component
                }
                Err(e) => {
                    warn!("Component {} pending construction failed: {}", ty.name(), e);
                    {
                        let mut registry = self.inner.registry.lock();
                        registry.remove(seq);
                        registry.mark_failed(idx, relation.as_ref());
                    }
                    report.fail(relation, RuntimeError::construction(ty.name(), e));
                    return;
                }
            },
        };
        report.created += 1;

        match self.inject(ty, &component) {
            Ok(()) => {
                let args = self
                    .inner
                    .args
                    .lock()
                    .get(&ty.key())
                    .cloned()
                    .unwrap_or_default();
                if let Err(e) = component.initialize(args).await {
                    warn!("Component {} initialize failed: {}", ty.name(), e);
                    report.fail(relation, RuntimeError::initialization(ty.name(), e));
                } else {
                    debug!("Component {} initialized", ty.name());
                }
            }
            Err(e) => {
                warn!("Component {} post-construct handler failed: {}", ty.name(), e);
                report.fail(relation, RuntimeError::initialization(ty.name(), e));
            }
        }

        if let Some(entry) = self.inner.registry.lock().get_mut(seq) {
            entry.initialized = true;
        }
    }

    /// Runs post-construct handlers for the type, then for each ancestor.
    fn inject(&self, ty: &ComponentType, component: &Arc<dyn Component>) -> Result<(), ComponentError> {
        for key in ty.lineage() {
            for handler in self.inner.handlers.get(&key).into_iter().flatten() {
                handler(self, component)?;
            }
        }
        Ok(())
    }

    /// Runs the scheduled pass. `None` when `close` took the lock first;
    /// the caller then waits for the next `initialize`.
    async fn run_scheduled(&self) -> Option<PassReport> {
        // From here on, refresh() schedules a new pass.
        self.inner.scheduled.lock().take();

        let _guard = self.inner.pass_lock.lock().await;
        if !self.is_initialized() {
            return None;
        }
        Some(self.refresh_pass().await)
    }

    async fn refresh_pass(&self) -> PassReport {
        let mut report = PassReport::default();
        let mut stale = Vec::new();
        let mut missing = Vec::new();

        for (idx, ty) in self.inner.types.iter().enumerate() {
            let Some(listed) = ty.relations() else {
                continue;
            };
            let diff = self.inner.registry.lock().diff(idx, &listed);
            stale.extend(diff.stale);
            missing.extend(diff.missing.into_iter().map(|r| (idx, r)));
        }

        self.close_entries(stale, &mut report).await;

        for (idx, relation) in missing {
            if let Some(seq) = self.construct(idx, Some(relation), &mut report) {
                self.activate(seq, &mut report).await;
            }
        }

        self.log_pass("Refresh", &report);
        report
    }

    async fn close_entries(&self, entries: Vec<super::registry::Entry>, report: &mut PassReport) {
        let live: Vec<(usize, Option<Relation>, Arc<dyn Component>)> = entries
            .into_iter()
            .filter_map(|e| match e.slot {
                Slot::Live(component) => Some((e.type_idx, e.relation, component)),
                Slot::Pending(_) | Slot::Resolving => None,
            })
            .collect();

        let results = join_all(live.iter().map(|(_, _, component)| component.close())).await;

        for ((idx, relation, _), result) in live.into_iter().zip(results) {
            let name = self.inner.types[idx].name();
            report.closed += 1;
            match result {
                Ok(()) => debug!("Component {} closed: relation={:?}", name, relation),
                Err(e) => {
                    warn!("Component {} close failed: {}", name, e);
                    report.fail(relation, RuntimeError::close(name, e));
                }
            }
        }
    }

    fn log_pass(&self, pass: &str, report: &PassReport) {
        info!(
            "{} pass completed with {} exceptions: created={}, closed={}",
            pass,
            report.exceptions(),
            report.created,
            report.closed
        );
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("types", &self.inner.types.len())
            .field("instances", &self.instance_count())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
