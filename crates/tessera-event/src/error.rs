//! Event layer errors.
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`ReservedType`](EventError::ReservedType) | `EVENT_RESERVED_TYPE` | No |
//! | [`MalformedAnnouncement`](EventError::MalformedAnnouncement) | `EVENT_MALFORMED_ANNOUNCEMENT` | No |

use tessera_types::ErrorCode;
use thiserror::Error;

/// Event layer error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// A component tried to emit a runtime-reserved event type.
    #[error("event type is reserved: {0}")]
    ReservedType(String),

    /// An exposure announcement did not carry `[id, name]`.
    #[error("malformed exposure announcement: {0}")]
    MalformedAnnouncement(String),
}

impl ErrorCode for EventError {
    fn code(&self) -> &'static str {
        match self {
            Self::ReservedType(_) => "EVENT_RESERVED_TYPE",
            Self::MalformedAnnouncement(_) => "EVENT_MALFORMED_ANNOUNCEMENT",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::assert_error_codes;

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(
            &[
                EventError::ReservedType("x".into()),
                EventError::MalformedAnnouncement("x".into()),
            ],
            "EVENT_",
        );
    }
}
