//! Component layer errors.
//!
//! All component errors use the `COMPONENT_` prefix and are serializable,
//! so an error raised inside a hosted component can be sent back across
//! the bridge unchanged.
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`WishNotImplemented`](ComponentError::WishNotImplemented) | `COMPONENT_WISH_NOT_IMPLEMENTED` | No |
//! | [`NotExposed`](ComponentError::NotExposed) | `COMPONENT_NOT_EXPOSED` | No |
//! | [`ExecutionFailed`](ComponentError::ExecutionFailed) | `COMPONENT_EXECUTION_FAILED` | Yes |
//! | [`InvalidPayload`](ComponentError::InvalidPayload) | `COMPONENT_INVALID_PAYLOAD` | No |
//! | [`ConstructFailed`](ComponentError::ConstructFailed) | `COMPONENT_CONSTRUCT_FAILED` | Yes |
//! | [`InitFailed`](ComponentError::InitFailed) | `COMPONENT_INIT_FAILED` | Yes |
//! | [`BridgeClosed`](ComponentError::BridgeClosed) | `COMPONENT_BRIDGE_CLOSED` | No |
//!
//! # Example
//!
//! ```
//! use tessera_component::ComponentError;
//! use tessera_types::ErrorCode;
//!
//! let err = ComponentError::WishNotImplemented("current-track".into());
//! assert_eq!(err.code(), "COMPONENT_WISH_NOT_IMPLEMENTED");
//! assert!(!err.is_recoverable());
//! ```

use serde::{Deserialize, Serialize};
use tessera_event::EventError;
use tessera_types::ErrorCode;
use thiserror::Error;

/// Component layer error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ComponentError {
    /// `want` was called for a wish nobody registered with `wants`.
    #[error("wish not implemented: {0}")]
    WishNotImplemented(String),

    /// No function is exposed under `module.name`.
    #[error("not exposed: {module}.{name}")]
    NotExposed {
        /// Exposure module.
        module: String,
        /// Function name.
        name: String,
    },

    /// A handler or lifecycle hook failed while running.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Arguments did not have the expected shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The component could not be constructed.
    #[error("construction failed: {0}")]
    ConstructFailed(String),

    /// `initialize` failed.
    #[error("initialization failed: {0}")]
    InitFailed(String),

    /// The bridge to the hosting execution context is closed.
    #[error("bridge closed")]
    BridgeClosed,
}

impl ComponentError {
    /// Shorthand for [`ComponentError::ExecutionFailed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::ExecutionFailed(message.into())
    }
}

impl From<EventError> for ComponentError {
    fn from(err: EventError) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}

impl ErrorCode for ComponentError {
    fn code(&self) -> &'static str {
        match self {
            Self::WishNotImplemented(_) => "COMPONENT_WISH_NOT_IMPLEMENTED",
            Self::NotExposed { .. } => "COMPONENT_NOT_EXPOSED",
            Self::ExecutionFailed(_) => "COMPONENT_EXECUTION_FAILED",
            Self::InvalidPayload(_) => "COMPONENT_INVALID_PAYLOAD",
            Self::ConstructFailed(_) => "COMPONENT_CONSTRUCT_FAILED",
            Self::InitFailed(_) => "COMPONENT_INIT_FAILED",
            Self::BridgeClosed => "COMPONENT_BRIDGE_CLOSED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ExecutionFailed(_) | Self::ConstructFailed(_) | Self::InitFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::assert_error_codes;

    fn all_variants() -> Vec<ComponentError> {
        vec![
            ComponentError::WishNotImplemented("x".into()),
            ComponentError::NotExposed {
                module: "m".into(),
                name: "n".into(),
            },
            ComponentError::ExecutionFailed("x".into()),
            ComponentError::InvalidPayload("x".into()),
            ComponentError::ConstructFailed("x".into()),
            ComponentError::InitFailed("x".into()),
            ComponentError::BridgeClosed,
        ]
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(&all_variants(), "COMPONENT_");
    }

    #[test]
    fn not_exposed_message() {
        let err = ComponentError::NotExposed {
            module: "player".into(),
            name: "pause".into(),
        };
        assert_eq!(err.to_string(), "not exposed: player.pause");
    }

    #[test]
    fn serde_roundtrip_preserves_variant() {
        let err = ComponentError::InitFailed("no token".into());
        let json = serde_json::to_string(&err).expect("serialize");
        let back: ComponentError = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, err);
    }

    #[test]
    fn event_errors_become_invalid_payload() {
        let err: ComponentError = EventError::ReservedType("@expose".into()).into();
        assert_eq!(err.code(), "COMPONENT_INVALID_PAYLOAD");
    }
}
