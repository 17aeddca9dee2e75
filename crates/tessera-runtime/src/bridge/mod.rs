//! Cross-context RPC bridge.
//!
//! Runs a component in an isolated execution context (its own OS thread
//! and current-thread runtime) while the application treats it as a
//! local component.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────── application runtime ──────────────────────┐
//! │  Application ── Arc<dyn Component> ── BridgedComponent           │
//! │                                          │  drain task           │
//! │                                          ▼                       │
//! │                                      RemoteHandle                │
//! └──────────────────────────────────────────┼───────────────────────┘
//!                     HostRequest + oneshot  │  serde_json::Value
//! ┌──────────────────────── host thread ─────▼───────────────────────┐
//! │  Host ── Arc<dyn Component> (base with Outbox)                   │
//! │            emit   ──► outbox FIFO ──► Listen replies             │
//! │            expose ──► ExposedId table + announcement             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The remote instance's events arrive through `listen`, one at a time,
//! and are delivered to local listeners. Its exposures are announced the
//! same way and installed locally as stubs that call back across the
//! bridge. Once closed, every call fails with [`BridgeError::Closed`].

mod describe;
mod error;
mod handle;
mod host;
mod wrapper;

pub use describe::{encode_relation, BridgedType, RelationEncoder, RemoteFactory};
pub use error::BridgeError;
pub use handle::RemoteHandle;
pub use host::{ConstructInfo, HostRequest, RemoteContext};
pub use wrapper::{BridgeState, BridgedComponent};
