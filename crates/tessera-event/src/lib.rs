//! Event types for the Tessera component runtime.
//!
//! Components never call each other directly. They talk through two
//! channels that the runtime can carry across an execution-context
//! boundary:
//!
//! | Channel | API | Shape |
//! |---------|-----|-------|
//! | Events | `on` / `emit` | [`EventEnvelope`] `{type, args}` |
//! | Exposures | `expose` / exposer `call` | named function + [`Caller`] context |
//!
//! When a component runs in another execution context its events are
//! queued as envelopes, and its exposures are announced with the reserved
//! [`EXPOSE_EVENT`] type so the local side can install forwarding stubs.

mod caller;
mod envelope;
mod error;

pub use caller::Caller;
pub use envelope::{is_reserved, EventEnvelope, ExposedId, EXPOSE_EVENT};
pub use error::EventError;
