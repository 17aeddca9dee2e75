//! Runtime Layer Errors.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`RuntimeError::NotFound`] | `RUNTIME_NOT_FOUND` | No |
//! | [`RuntimeError::Construction`] | `RUNTIME_CONSTRUCTION` | Yes |
//! | [`RuntimeError::Initialization`] | `RUNTIME_INITIALIZATION` | Yes |
//! | [`RuntimeError::Close`] | `RUNTIME_CLOSE` | No |
//!
//! # Recoverability
//!
//! - `Construction`: retried once the relation leaves and re-enters its list
//! - `Initialization`: a fresh instance for the same relation may succeed

use tessera_component::ComponentError;
use tessera_types::ErrorCode;
use thiserror::Error;

/// Runtime layer error.
///
/// # Example
///
/// ```
/// use tessera_runtime::RuntimeError;
/// use tessera_types::ErrorCode;
///
/// let err = RuntimeError::NotFound("Player".into());
/// assert_eq!(err.code(), "RUNTIME_NOT_FOUND");
/// assert!(!err.is_recoverable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// No live instance matched a lookup.
    #[error("component not found: {0}")]
    NotFound(String),

    /// A constructor, or the pending construction it returned, failed.
    #[error("failed to construct {component}: {source}")]
    Construction {
        /// Component type name.
        component: String,
        #[source]
        source: ComponentError,
    },

    /// A post-construct handler or `initialize` failed.
    #[error("failed to initialize {component}: {source}")]
    Initialization {
        /// Component type name.
        component: String,
        #[source]
        source: ComponentError,
    },

    /// `close` failed. The instance is dropped regardless.
    #[error("failed to close {component}: {source}")]
    Close {
        /// Component type name.
        component: String,
        #[source]
        source: ComponentError,
    },
}

impl RuntimeError {
    /// Creates a construction error.
    pub fn construction(component: impl Into<String>, source: ComponentError) -> Self {
        Self::Construction {
            component: component.into(),
            source,
        }
    }

    /// Creates an initialization error.
    pub fn initialization(component: impl Into<String>, source: ComponentError) -> Self {
        Self::Initialization {
            component: component.into(),
            source,
        }
    }

    /// Creates a close error.
    pub fn close(component: impl Into<String>, source: ComponentError) -> Self {
        Self::Close {
            component: component.into(),
            source,
        }
    }
}

impl ErrorCode for RuntimeError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "RUNTIME_NOT_FOUND",
            Self::Construction { .. } => "RUNTIME_CONSTRUCTION",
            Self::Initialization { .. } => "RUNTIME_INITIALIZATION",
            Self::Close { .. } => "RUNTIME_CLOSE",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Construction { .. } | Self::Initialization { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::assert_error_codes;

    fn all_variants() -> Vec<RuntimeError> {
        let cause = ComponentError::failed("x");
        vec![
            RuntimeError::NotFound("x".into()),
            RuntimeError::construction("x", cause.clone()),
            RuntimeError::initialization("x", cause.clone()),
            RuntimeError::close("x", cause),
        ]
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(&all_variants(), "RUNTIME_");
    }

    #[test]
    fn source_is_chained() {
        use std::error::Error as _;
        let err = RuntimeError::initialization("Player", ComponentError::InitFailed("no token".into()));
        assert_eq!(err.to_string(), "failed to initialize Player: initialization failed: no token");
        assert!(err.source().is_some());
    }

    #[test]
    fn recoverability() {
        assert!(RuntimeError::construction("x", ComponentError::failed("x")).is_recoverable());
        assert!(!RuntimeError::NotFound("x".into()).is_recoverable());
        assert!(!RuntimeError::close("x", ComponentError::BridgeClosed).is_recoverable());
    }
}
