//! Bridge errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`BridgeError::Closed`] | `BRIDGE_CLOSED` | No |
//! | [`BridgeError::Remote`] | `BRIDGE_REMOTE` | per inner error |
//! | [`BridgeError::SpawnFailed`] | `BRIDGE_SPAWN_FAILED` | No |
//! | [`BridgeError::Timeout`] | `BRIDGE_TIMEOUT` | Yes |

use tessera_component::ComponentError;
use tessera_types::ErrorCode;
use thiserror::Error;

/// Error on the local side of a bridge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The host stopped, or `close` was called.
    #[error("bridge closed")]
    Closed,

    /// The remote instance answered with an error.
    #[error("remote error: {0}")]
    Remote(ComponentError),

    /// The host thread or its runtime could not be started.
    #[error("failed to spawn host: {0}")]
    SpawnFailed(String),

    /// No reply within the configured call timeout.
    #[error("remote call timed out ({0}ms)")]
    Timeout(u64),
}

impl ErrorCode for BridgeError {
    fn code(&self) -> &'static str {
        match self {
            Self::Closed => "BRIDGE_CLOSED",
            Self::Remote(_) => "BRIDGE_REMOTE",
            Self::SpawnFailed(_) => "BRIDGE_SPAWN_FAILED",
            Self::Timeout(_) => "BRIDGE_TIMEOUT",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Remote(inner) => inner.is_recoverable(),
            Self::Timeout(_) => true,
            Self::Closed | Self::SpawnFailed(_) => false,
        }
    }
}

impl From<BridgeError> for ComponentError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Closed => Self::BridgeClosed,
            BridgeError::Remote(inner) => inner,
            BridgeError::SpawnFailed(msg) => Self::ConstructFailed(msg),
            BridgeError::Timeout(_) => Self::ExecutionFailed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::assert_error_codes;

    #[test]
    fn all_codes_prefixed() {
        assert_error_codes(
            &[
                BridgeError::Closed,
                BridgeError::Remote(ComponentError::failed("x")),
                BridgeError::SpawnFailed("no threads".into()),
                BridgeError::Timeout(10),
            ],
            "BRIDGE_",
        );
    }

    #[test]
    fn remote_recoverability_follows_inner() {
        assert!(BridgeError::Remote(ComponentError::failed("busy")).is_recoverable());
        assert!(!BridgeError::Remote(ComponentError::BridgeClosed).is_recoverable());
    }

    #[test]
    fn into_component_error() {
        assert_eq!(
            ComponentError::from(BridgeError::Closed),
            ComponentError::BridgeClosed
        );
        let inner = ComponentError::WishNotImplemented("track".into());
        assert_eq!(ComponentError::from(BridgeError::Remote(inner.clone())), inner);
    }
}
