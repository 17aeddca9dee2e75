//! Tessera runtime layer.
//!
//! Reconciles component instances against external relation lists and
//! hosts components in isolated execution contexts.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Runtime Layer                        │
//! │  tessera-runtime : Application, bridge, config     ◄── HERE │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     Component SDK Layer                     │
//! │  tessera-component : Component, EventHub, Exposer           │
//! │  tessera-event     : EventEnvelope, Caller                  │
//! │  tessera-types     : Relation, TypeKey, ErrorCode           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`app`]: the reconciler ([`Application`], [`ApplicationBuilder`])
//! - [`bridge`]: remote hosts and their local wrappers
//! - [`config`]: TOML configuration
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use tessera_component::{testing::Probe, Constructed};
//! use tessera_runtime::{ApplicationBuilder, ComponentType, InitArgs};
//! use tessera_types::{Category, Relation};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let chats = Arc::new(Mutex::new(vec![Relation::new("chat-1")]));
//! let listed = Arc::clone(&chats);
//!
//! let app = ApplicationBuilder::new()
//!     .component(
//!         ComponentType::of::<Probe>(Category::Controllers, |cx| {
//!             Ok(Constructed::ready(Probe::new("Chat", &cx)))
//!         })
//!         .with_relations(move || Some(listed.lock().clone())),
//!     )
//!     .build();
//! app.initialize(InitArgs::new()).await;
//!
//! chats.lock().push(Relation::new("chat-2"));
//! let report = app.refresh().await;
//! assert_eq!(report.created, 1);
//! assert_eq!(app.get_all::<Probe>(None).len(), 2);
//! # }
//! ```

pub mod app;
pub mod bridge;
pub mod config;
mod error;

pub use app::{
    Application, ApplicationBuilder, ComponentType, Describe, InitArgs, PassReport,
    PendingRefresh,
};
pub use bridge::{BridgeError, BridgedComponent, BridgedType, RemoteContext, RemoteHandle};
pub use config::{ConfigError, ConfigLoader, RuntimeConfig};
pub use error::RuntimeError;
