//! Local stand-in for a hosted component.

use super::host::ConstructInfo;
use super::{BridgeError, RemoteHandle};
use parking_lot::Mutex;
use serde_json::Value;
use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};
use tessera_component::{handler, Component, ComponentBase, ComponentContext, ComponentError};
use tessera_event::EventEnvelope;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Lifecycle of a [`BridgedComponent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Created; the remote constructor has not run.
    Unconstructed,
    /// Waiting for the remote constructor.
    Constructing,
    /// Remote instance live; events are being drained.
    Wrapped,
    /// Closed.
    Closed,
}

impl BridgeState {
    /// Lowercase state name, as reported by the `state` property.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unconstructed => "unconstructed",
            Self::Constructing => "constructing",
            Self::Wrapped => "wrapped",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presents a component hosted in another execution context as a local
/// component.
///
/// ```text
/// Unconstructed ──construct()──► Constructing ──ok──► Wrapped ──close()──► Closed
///                                      └──err──► Closed
/// ```
///
/// The wrapper's base is named after the remote component, so its
/// exposures live under `lowercase(remote name)`. Until the remote
/// constructor reports, only the local type name is known.
///
/// While wrapped, a drain task pulls one envelope at a time from the
/// host. Exposure announcements become forwarding stubs in the local
/// exposer; every other event is delivered to local `on` listeners and
/// awaited before the next envelope is pulled.
pub struct BridgedComponent {
    label: String,
    cx: ComponentContext,
    base: OnceLock<ComponentBase>,
    remote: RemoteHandle,
    remote_relation: Option<Value>,
    state: Mutex<BridgeState>,
    remote_info: Mutex<Option<ConstructInfo>>,
    drain: Mutex<Option<JoinHandle<()>>>,
}

impl BridgedComponent {
    /// Wraps `remote` for the local type `label`.
    ///
    /// `remote_relation` is the encoded relation sent to the remote
    /// constructor.
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        cx: &ComponentContext,
        remote: RemoteHandle,
        remote_relation: Option<Value>,
    ) -> Self {
        Self {
            label: label.into(),
            cx: cx.clone(),
            base: OnceLock::new(),
            remote,
            remote_relation,
            state: Mutex::new(BridgeState::Unconstructed),
            remote_info: Mutex::new(None),
            drain: Mutex::new(None),
        }
    }

    /// Local type name the wrapper was created for.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> BridgeState {
        *self.state.lock()
    }

    /// The handle to the host.
    #[must_use]
    pub fn remote(&self) -> &RemoteHandle {
        &self.remote
    }

    /// Name reported by the remote constructor.
    #[must_use]
    pub fn remote_name(&self) -> Option<String> {
        self.remote_info.lock().as_ref().map(|info| info.name.clone())
    }

    /// Runs the remote constructor and starts draining events.
    ///
    /// # Errors
    ///
    /// Fails if the wrapper is not [`BridgeState::Unconstructed`], or
    /// with the remote construction error. A failed construction closes
    /// the bridge.
    pub async fn construct(self: &Arc<Self>) -> Result<(), BridgeError> {
        {
            let mut state = self.state.lock();
            if *state != BridgeState::Unconstructed {
                return Err(BridgeError::Remote(ComponentError::ConstructFailed(format!(
                    "bridge already {}",
                    *state
                ))));
            }
            *state = BridgeState::Constructing;
        }
        debug!("Bridge constructing: {}", self.label);

        let info = match self.remote.construct(self.remote_relation.clone()).await {
            Ok(info) => info,
            Err(e) => {
                *self.state.lock() = BridgeState::Closed;
                let _ = self.remote.close().await;
                return Err(e);
            }
        };

        {
            let mut state = self.state.lock();
            if *state != BridgeState::Constructing {
                // Closed while the remote constructor ran.
                return Err(BridgeError::Closed);
            }
            if self
                .base
                .set(ComponentBase::new(info.name.clone(), &self.cx))
                .is_err()
            {
                warn!("Bridge base bound before construction: {}", self.label);
            }
            *state = BridgeState::Wrapped;
        }

        info!(
            "Bridge wrapped: local={}, remote={}, uuid={}",
            self.label, info.name, info.uuid
        );
        *self.remote_info.lock() = Some(info);

        let task = tokio::spawn(drain(Arc::downgrade(self), self.remote.clone()));
        *self.drain.lock() = Some(task);
        Ok(())
    }

    async fn deliver(&self, envelope: EventEnvelope) {
        let exposure = envelope
            .as_exposure()
            .map(|parsed| parsed.map(|(id, name)| (id, name.to_string())));
        match exposure {
            Some(Ok((id, name))) => {
                let remote = self.remote.clone();
                let stub = handler(move |args| {
                    let remote = remote.clone();
                    async move { remote.call(id, args).await.map_err(ComponentError::from) }
                });
                let base = self.base();
                base.exposer()
                    .expose(base.module(), &name, stub, base.relation().cloned());
                debug!("Bridge exposed: {}.{} -> {}", base.module(), name, id);
            }
            Some(Err(e)) => warn!("Bridge dropped announcement: {}", e),
            None => {
                if let Err(e) = self.base().hub().emit(&envelope.kind, envelope.args).await {
                    warn!("Bridge listener failed: kind={}, error={}", envelope.kind, e);
                }
            }
        }
    }
}

async fn drain(wrapper: Weak<BridgedComponent>, remote: RemoteHandle) {
    while let Some(envelope) = remote.listen().await {
        let Some(wrapper) = wrapper.upgrade() else {
            break;
        };
        wrapper.deliver(envelope).await;
    }
    debug!("Bridge drain loop exited");
}

#[async_trait]
impl Component for BridgedComponent {
    fn base(&self) -> &ComponentBase {
        self.base
            .get_or_init(|| ComponentBase::new(self.label.clone(), &self.cx))
    }

    async fn initialize(&self, args: Vec<Value>) -> Result<(), ComponentError> {
        self.remote.initialize(args).await.map_err(ComponentError::from)
    }

    async fn close(&self) -> Result<(), ComponentError> {
        let previous = std::mem::replace(&mut *self.state.lock(), BridgeState::Closed);
        if previous == BridgeState::Closed {
            return Ok(());
        }

        let result = self.remote.close().await;
        if let Some(base) = self.base.get() {
            base.close();
        }
        if let Some(task) = self.drain.lock().take() {
            task.abort();
        }
        info!("Bridge closed: {}", self.label);
        result.map_err(ComponentError::from)
    }

    async fn property(&self, name: &str) -> Result<Option<Value>, ComponentError> {
        match name {
            "name" | "uuid" => Ok(self.base().property(name)),
            "state" => Ok(Some(Value::from(self.state().as_str()))),
            _ => self.remote.property(name).await.map_err(ComponentError::from),
        }
    }
}

impl fmt::Debug for BridgedComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgedComponent")
            .field("label", &self.label)
            .field("remote_name", &self.remote_name())
            .field("state", &self.state())
            .field("remote", &self.remote)
            .finish()
    }
}
