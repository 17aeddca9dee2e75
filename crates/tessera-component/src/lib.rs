//! Component layer for the Tessera runtime.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Component SDK Layer                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  tessera-types     : Relation, TypeKey, ErrorCode           │
//! │  tessera-event     : EventEnvelope, Caller                  │
//! │  tessera-component : EventHub, Exposer, Component  ◄── HERE │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Anatomy of a component
//!
//! ```text
//! Arc<dyn Component>
//!   └── ComponentBase
//!         ├── uuid, name, relation
//!         ├── EventHub      on / emit / wants / want
//!         ├── Exposer       expose → module.name (shared per application)
//!         └── Outbox?       only when hosted behind a bridge
//! ```
//!
//! Components talk to each other in three ways:
//!
//! | Mechanism | Direction | Result |
//! |-----------|-----------|--------|
//! | events (`on`/`emit`) | one to many | none, errors surface to the emitter |
//! | wishes (`wants`/`want`) | one to one | the handler's value |
//! | exposures (`expose`/[`Exposer::call`]) | by name, scoped by relation | [`Dispatch`] |
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//! use tessera_component::{
//!     sync_handler, Component, ComponentBase, ComponentContext, ComponentError, Dispatch,
//!     Exposer, RefreshHandle,
//! };
//! use tessera_event::Caller;
//!
//! struct Player {
//!     base: ComponentBase,
//! }
//!
//! #[async_trait]
//! impl Component for Player {
//!     fn base(&self) -> &ComponentBase {
//!         &self.base
//!     }
//!
//!     async fn initialize(&self, _args: Vec<Value>) -> Result<(), ComponentError> {
//!         self.base.expose("volume", sync_handler(|_| Ok(json!(30))));
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let exposer = Exposer::new();
//! let cx = ComponentContext::new(exposer.clone(), None, RefreshHandle::noop());
//! let player: Arc<dyn Component> = Arc::new(Player { base: ComponentBase::new("Player", &cx) });
//!
//! player.initialize(vec![]).await.expect("initialize");
//! let volume = exposer.call("player", "volume", &Caller::Broadcast, vec![]).await;
//! assert_eq!(volume, Ok(Dispatch::One(json!(30))));
//! # }
//! ```

mod base;
mod component;
mod error;
mod exposer;
mod handler;
mod hub;
mod outbox;
pub mod pull;
pub mod testing;

pub use base::{ComponentBase, ComponentContext, RefreshHandle};
pub use component::{downcast_arc, downcast_ref, AsAny, Component, Constructed, PendingComponent};
pub use error::ComponentError;
pub use exposer::{Dispatch, Dispatcher, Exposer};
pub use handler::{handler, sync_handler, Handler, HandlerResult};
pub use hub::EventHub;
pub use outbox::Outbox;

// Re-export for implementors of `Component` and `Pull`.
pub use async_trait::async_trait;
