//! Remote side of a bridge.
//!
//! A host owns one component instance on a dedicated OS thread running a
//! current-thread tokio runtime. It shares no state with the local side:
//! every interaction is a [`HostRequest`] carrying its own reply channel.
//!
//! ```text
//! local runtime                           host thread
//! ┌──────────────┐   mpsc<HostRequest>   ┌───────────────────────────┐
//! │ RemoteHandle │ ────────────────────► │ run() loop                │
//! │              │                       │   Construct  (inline)     │
//! │              │ ◄──────────────────── │   Listen/Call/... (tasks) │
//! └──────────────┘   oneshot replies     │   Close → abort, break    │
//!                                        └───────────────────────────┘
//! ```
//!
//! Every request other than `Construct` and `Close` runs in its own task,
//! so a suspended `Listen` never blocks a `Call`.

use super::{BridgeError, RemoteHandle};
use crate::config::BridgeConfig;
use serde_json::Value;
use std::sync::Arc;
use tessera_component::{
    Component, ComponentContext, ComponentError, Constructed, Exposer, HandlerResult, Outbox,
    RefreshHandle,
};
use tessera_event::{EventEnvelope, ExposedId};
use tessera_types::Relation;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Capacity of the request channel.
const REQUEST_BUFFER: usize = 64;

/// What the host reports after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructInfo {
    /// Name of the remote instance.
    pub name: String,
    /// UUID of the remote instance.
    pub uuid: String,
}

/// Requests sent from the local side to a host.
#[derive(Debug)]
pub enum HostRequest {
    /// Run the remote constructor.
    ///
    /// The relation crosses as an encoded value and becomes a fresh
    /// remote-side relation.
    Construct {
        /// Encoded relation of the local instance.
        relation: Option<Value>,
        /// Reply with the remote instance's identity.
        reply: oneshot::Sender<Result<ConstructInfo, ComponentError>>,
    },

    /// Take the next queued envelope, waiting while the queue is empty.
    Listen {
        /// Reply with the envelope. Dropped when the host stops.
        reply: oneshot::Sender<Option<EventEnvelope>>,
    },

    /// Invoke an exposed function.
    Call {
        /// Id from the exposure announcement.
        id: ExposedId,
        /// Call arguments.
        args: Vec<Value>,
        /// Reply with the function's result.
        reply: oneshot::Sender<HandlerResult>,
    },

    /// Read a property of the remote instance.
    Property {
        /// Property name.
        name: String,
        /// Reply with the value, `None` if unknown.
        reply: oneshot::Sender<Result<Option<Value>, ComponentError>>,
    },

    /// Call `initialize` on the remote instance.
    Initialize {
        /// Initialization arguments.
        args: Vec<Value>,
        /// Reply with the result.
        reply: oneshot::Sender<Result<(), ComponentError>>,
    },

    /// Close the remote instance and stop the host.
    Close {
        /// Reply with the result of the remote `close`.
        reply: oneshot::Sender<Result<(), ComponentError>>,
    },
}

/// Starts hosts.
///
/// # Example
///
/// ```
/// use tessera_component::{testing::Probe, Constructed};
/// use tessera_runtime::bridge::RemoteContext;
/// use tessera_runtime::config::BridgeConfig;
///
/// # #[tokio::main]
/// # async fn main() {
/// let remote = RemoteContext::spawn(&BridgeConfig::default(), |cx| {
///     Ok(Constructed::ready(Probe::new("Lyrics", &cx)))
/// })
/// .expect("spawn");
///
/// let info = remote.construct(None).await.expect("construct");
/// assert_eq!(info.name, "Lyrics");
/// remote.close().await.expect("close");
/// assert!(remote.is_closed());
/// # }
/// ```
#[derive(Debug)]
pub struct RemoteContext;

impl RemoteContext {
    /// Spawns a host thread that will build its instance with `factory`.
    ///
    /// The factory runs on the host thread when the first `construct`
    /// request arrives.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::SpawnFailed`] if the runtime or the thread
    /// cannot be created.
    pub fn spawn<F>(config: &BridgeConfig, factory: F) -> Result<RemoteHandle, BridgeError>
    where
        F: FnOnce(ComponentContext) -> Result<Constructed, ComponentError> + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_BUFFER);
        let (closed_tx, closed_rx) = watch::channel(false);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BridgeError::SpawnFailed(e.to_string()))?;

        std::thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || {
                runtime.block_on(Host::new(factory, request_rx).run());
                closed_tx.send_replace(true);
            })
            .map_err(|e| BridgeError::SpawnFailed(e.to_string()))?;

        debug!("Bridge host spawned: thread={}", config.thread_name);
        Ok(RemoteHandle::new(request_tx, closed_rx, config.call_timeout()))
    }
}

struct Host<F> {
    factory: Option<F>,
    requests: mpsc::Receiver<HostRequest>,
    component: Option<Arc<dyn Component>>,
    outbox: Outbox,
    events: Arc<Mutex<mpsc::UnboundedReceiver<EventEnvelope>>>,
    tasks: JoinSet<()>,
}

impl<F> Host<F>
where
    F: FnOnce(ComponentContext) -> Result<Constructed, ComponentError> + Send + 'static,
{
    fn new(factory: F, requests: mpsc::Receiver<HostRequest>) -> Self {
        let (outbox, events) = Outbox::new();
        Self {
            factory: Some(factory),
            requests,
            component: None,
            outbox,
            events: Arc::new(Mutex::new(events)),
            tasks: JoinSet::new(),
        }
    }

    async fn run(mut self) {
        info!("Bridge host started");

        loop {
            let request = tokio::select! {
                request = self.requests.recv() => request,
                Some(joined) = self.tasks.join_next() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            warn!("Bridge host task panicked: {}", e);
                        }
                    }
                    continue;
                }
            };

            match request {
                Some(HostRequest::Close { reply }) => {
                    let result = self.shutdown().await;
                    let _ = reply.send(result);
                    break;
                }
                Some(request) => self.dispatch(request).await,
                None => {
                    info!("Bridge host received shutdown");
                    let _ = self.shutdown().await;
                    break;
                }
            }
        }

        info!("Bridge host stopped");
    }

    async fn dispatch(&mut self, request: HostRequest) {
        match request {
            HostRequest::Construct { relation, reply } => {
                let result = self.construct(relation).await;
                debug!("Construct request: ok={}", result.is_ok());
                let _ = reply.send(result);
            }
            HostRequest::Listen { reply } => {
                let events = Arc::clone(&self.events);
                self.tasks.spawn(async move {
                    let next = events.lock().await.recv().await;
                    let _ = reply.send(next);
                });
            }
            HostRequest::Call { id, args, reply } => match self.outbox.handler(id) {
                Some(handler) => {
                    self.tasks.spawn(async move {
                        let _ = reply.send(handler(args).await);
                    });
                }
                None => {
                    let module = self.module();
                    let _ = reply.send(Err(ComponentError::NotExposed {
                        module,
                        name: id.to_string(),
                    }));
                }
            },
            HostRequest::Property { name, reply } => match self.component.clone() {
                Some(component) => {
                    self.tasks.spawn(async move {
                        let _ = reply.send(component.property(&name).await);
                    });
                }
                None => {
                    let _ = reply.send(Err(not_constructed()));
                }
            },
            HostRequest::Initialize { args, reply } => match self.component.clone() {
                Some(component) => {
                    self.tasks.spawn(async move {
                        let _ = reply.send(component.initialize(args).await);
                    });
                }
                None => {
                    let _ = reply.send(Err(not_constructed()));
                }
            },
            HostRequest::Close { reply } => {
                // Handled in run() loop
                let _ = reply.send(Ok(()));
            }
        }
    }

    async fn construct(&mut self, relation: Option<Value>) -> Result<ConstructInfo, ComponentError> {
        let factory = self.factory.take().ok_or_else(|| {
            ComponentError::ConstructFailed("remote instance already constructed".into())
        })?;

        let cx = ComponentContext::new(
            Exposer::new(),
            relation.map(Relation::new),
            RefreshHandle::noop(),
        )
        .with_outbox(self.outbox.clone());

        let component = factory(cx)?.resolve().await?;
        let info = ConstructInfo {
            name: component.base().name().to_string(),
            uuid: component.base().uuid().to_string(),
        };
        self.component = Some(component);
        Ok(info)
    }

    async fn shutdown(&mut self) -> Result<(), ComponentError> {
        self.tasks.abort_all();
        let result = match self.component.take() {
            Some(component) => component.close().await,
            None => Ok(()),
        };
        self.outbox.clear();
        debug!("Bridge host closed instance: ok={}", result.is_ok());
        result
    }

    fn module(&self) -> String {
        self.component
            .as_ref()
            .map(|c| c.base().module().to_string())
            .unwrap_or_default()
    }
}

fn not_constructed() -> ComponentError {
    ComponentError::ConstructFailed("remote instance not constructed".into())
}
