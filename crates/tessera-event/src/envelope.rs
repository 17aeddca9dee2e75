//! The `{type, args}` envelope that crosses execution contexts.

use crate::EventError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Reserved event type announcing a function exposed by a hosted
/// component. Arguments: `[id, name]`.
pub const EXPOSE_EVENT: &str = "@expose";

/// Returns whether `kind` is reserved for runtime use.
#[must_use]
pub fn is_reserved(kind: &str) -> bool {
    kind.starts_with('@')
}

/// Identifier of a function exposed by a hosted component.
///
/// Unique within one hosted instance's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExposedId(pub u64);

impl fmt::Display for ExposedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn#{}", self.0)
    }
}

/// One queued event.
///
/// Payloads are plain JSON values so the envelope can be handed to
/// another thread or process without sharing memory.
///
/// # Example
///
/// ```
/// use tessera_event::{EventEnvelope, ExposedId};
/// use serde_json::json;
///
/// let evt = EventEnvelope::new("track-start", vec![json!("abc")]);
/// assert!(evt.as_exposure().is_none());
///
/// let ann = EventEnvelope::announce(ExposedId(3), "pause");
/// let (id, name) = ann.as_exposure().expect("announcement").expect("well-formed");
/// assert_eq!(id, ExposedId(3));
/// assert_eq!(name, "pause");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Event type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Event arguments.
    pub args: Vec<Value>,
}

impl EventEnvelope {
    /// Creates an ordinary event envelope.
    #[must_use]
    pub fn new(kind: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            kind: kind.into(),
            args,
        }
    }

    /// Creates an exposure announcement.
    #[must_use]
    pub fn announce(id: ExposedId, name: &str) -> Self {
        Self {
            kind: EXPOSE_EVENT.to_string(),
            args: vec![Value::from(id.0), Value::from(name)],
        }
    }

    /// Decodes an exposure announcement.
    ///
    /// Returns `None` for ordinary events.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::MalformedAnnouncement`] when the envelope has
    /// the reserved type but not the `[id, name]` arguments.
    pub fn as_exposure(&self) -> Option<Result<(ExposedId, &str), EventError>> {
        if self.kind != EXPOSE_EVENT {
            return None;
        }
        let id = self.args.first().and_then(Value::as_u64);
        let name = self.args.get(1).and_then(Value::as_str);
        Some(match (id, name) {
            (Some(id), Some(name)) => Ok((ExposedId(id), name)),
            _ => Err(EventError::MalformedAnnouncement(format!("{:?}", self.args))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reserved_prefix() {
        assert!(is_reserved(EXPOSE_EVENT));
        assert!(!is_reserved("track-start"));
    }

    #[test]
    fn malformed_announcement() {
        let evt = EventEnvelope::new(EXPOSE_EVENT, vec![json!("not-an-id")]);
        let decoded = evt.as_exposure().expect("reserved type");
        assert!(matches!(decoded, Err(EventError::MalformedAnnouncement(_))));
    }

    #[test]
    fn wire_shape_uses_type_field() {
        let evt = EventEnvelope::new("volume", vec![json!(30)]);
        let wire = serde_json::to_value(&evt).expect("serialize");
        assert_eq!(wire, json!({"type": "volume", "args": [30]}));
    }
}
