//! Local side of a bridge.

use super::host::{ConstructInfo, HostRequest};
use super::BridgeError;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tessera_event::{EventEnvelope, ExposedId};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

/// Sends requests to a host and awaits its replies.
///
/// Cloning shares the connection. Once the host stops, every pending and
/// future request fails with [`BridgeError::Closed`]; `listen` returns
/// `None`.
#[derive(Clone)]
pub struct RemoteHandle {
    tx: mpsc::Sender<HostRequest>,
    stopped: watch::Receiver<bool>,
    closing: Arc<AtomicBool>,
    timeout: Option<Duration>,
}

impl RemoteHandle {
    pub(crate) fn new(
        tx: mpsc::Sender<HostRequest>,
        stopped: watch::Receiver<bool>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            tx,
            stopped,
            closing: Arc::new(AtomicBool::new(false)),
            timeout,
        }
    }

    /// Returns whether `close` was called or the host stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closing.load(Ordering::SeqCst) || *self.stopped.borrow() || self.tx.is_closed()
    }

    /// Runs the remote constructor. `relation` is the encoded relation
    /// of the local instance.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Remote`] if construction failed remotely,
    /// [`BridgeError::Closed`] if the host is gone.
    pub async fn construct(&self, relation: Option<Value>) -> Result<ConstructInfo, BridgeError> {
        self.request(None, |reply| HostRequest::Construct { relation, reply })
            .await?
            .map_err(BridgeError::Remote)
    }

    /// Takes the next queued envelope in FIFO order, waiting while the
    /// queue is empty. Returns `None` once the bridge is closed.
    pub async fn listen(&self) -> Option<EventEnvelope> {
        self.request(None, |reply| HostRequest::Listen { reply })
            .await
            .ok()
            .flatten()
    }

    /// Invokes the exposed function announced under `id`.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Remote`] with the function's error,
    /// [`BridgeError::Closed`] after close (also for calls in flight),
    /// [`BridgeError::Timeout`] when the configured timeout elapses.
    pub async fn call(&self, id: ExposedId, args: Vec<Value>) -> Result<Value, BridgeError> {
        self.request(self.timeout, |reply| HostRequest::Call { id, args, reply })
            .await?
            .map_err(BridgeError::Remote)
    }

    /// Reads a property of the remote instance.
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call).
    pub async fn property(&self, name: &str) -> Result<Option<Value>, BridgeError> {
        let name = name.to_string();
        self.request(self.timeout, |reply| HostRequest::Property { name, reply })
            .await?
            .map_err(BridgeError::Remote)
    }

    /// Calls `initialize` on the remote instance.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Remote`] with the instance's error, or
    /// [`BridgeError::Closed`].
    pub async fn initialize(&self, args: Vec<Value>) -> Result<(), BridgeError> {
        self.request(None, |reply| HostRequest::Initialize { args, reply })
            .await?
            .map_err(BridgeError::Remote)
    }

    /// Closes the remote instance and stops the host.
    ///
    /// Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Remote`] if the remote `close` failed.
    pub async fn close(&self) -> Result<(), BridgeError> {
        if self.closing.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!("Bridge close requested");

        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(HostRequest::Close { reply: reply_tx }).await.is_err() {
            return Ok(());
        }
        match reply_rx.await {
            Ok(result) => result.map_err(BridgeError::Remote),
            Err(_) => Ok(()),
        }
    }

    /// Sends one request and waits for its reply, the host stopping, or
    /// the timeout, whichever comes first.
    async fn request<T>(
        &self,
        timeout: Option<Duration>,
        build: impl FnOnce(oneshot::Sender<T>) -> HostRequest,
    ) -> Result<T, BridgeError> {
        if self.is_closed() {
            return Err(BridgeError::Closed);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| BridgeError::Closed)?;

        let mut stopped = self.stopped.clone();
        let reply = async {
            tokio::select! {
                biased;
                reply = reply_rx => reply.map_err(|_| BridgeError::Closed),
                () = async {
                    let _ = stopped.wait_for(|stopped| *stopped).await;
                } => Err(BridgeError::Closed),
            }
        };

        match timeout {
            Some(limit) => match tokio::time::timeout(limit, reply).await {
                Ok(result) => result,
                Err(_) => Err(BridgeError::Timeout(
                    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                )),
            },
            None => reply.await,
        }
    }
}

impl std::fmt::Debug for RemoteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteHandle")
            .field("closed", &self.is_closed())
            .field("timeout", &self.timeout)
            .finish()
    }
}
