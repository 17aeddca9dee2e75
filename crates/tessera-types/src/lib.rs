//! Core types for the Tessera component runtime.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Component SDK Layer                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  tessera-types     : Relation, TypeKey, ErrorCode  ◄── HERE │
//! │  tessera-event     : EventEnvelope, Caller                  │
//! │  tessera-component : EventHub, Exposer, Component trait     │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Runtime Layer                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  tessera-runtime   : Application reconciler, bridge, config │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Identity
//!
//! - [`Relation`]: opaque object compared by identity; scopes an instance
//! - [`TypeKey`]: runtime identity of a component type
//! - [`ComponentUuid`]: identity of one instance
//!
//! # Example
//!
//! ```
//! use tessera_types::{Category, Relation, TypeKey};
//!
//! struct Player;
//!
//! let key = TypeKey::of::<Player>();
//! let guild = Relation::new(1234_u64);
//!
//! assert_eq!(key.name(), "Player");
//! assert_eq!(guild, guild.clone());
//! assert!(Category::Services < Category::Controllers);
//! ```

mod error;
mod id;
mod kind;
mod relation;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::ComponentUuid;
pub use kind::{Category, TypeKey};
pub use relation::{same_relation, Relation};
