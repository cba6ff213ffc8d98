//! Error types for nvkit.
//!
//! All errors are strongly typed using thiserror. Container operations
//! surface them synchronously; the event watcher hands them to its error
//! callback exactly once and then terminates.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::value::NvType;

/// Top-level error type for nvkit.
#[derive(Debug, Error)]
pub enum NvError {
    /// Duplicating or growing backing storage failed.
    #[error("Allocation failed while {context}")]
    Allocation {
        /// What was being allocated.
        context: String,
    },

    /// A typed accessor was invoked against a differently-tagged entry.
    #[error("Entry '{key}' holds {actual}, not {expected}")]
    TypeMismatch {
        /// Key of the offending entry.
        key: String,
        /// Tag the accessor asked for.
        expected: NvType,
        /// Tag the entry actually carries.
        actual: NvType,
    },

    /// A required lookup found no matching key.
    #[error("No entry named '{key}'")]
    NotFound {
        /// Key that was looked up.
        key: String,
    },

    /// The encoded key or value was rejected.
    #[error("Invalid value for '{key}': {reason}")]
    InvalidArgument {
        /// Key that was being inserted.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An operation of the storage subsystem failed.
    #[error("Storage subsystem error (code {code}): {message}")]
    System {
        /// Native error code reported by the subsystem.
        code: i32,
        /// Diagnostic text.
        message: String,
    },

    /// A blocking retrieval was interrupted on request. Never fatal.
    #[error("Blocking wait interrupted")]
    Interrupted,

    /// `start()` was called on a watcher whose task is still running.
    #[error("Event watcher is already running")]
    AlreadyRunning,

    /// The call is not valid in the current state.
    #[error("Invalid state: {reason}")]
    InvalidState {
        /// What went wrong.
        reason: String,
    },
}

impl NvError {
    /// Creates an allocation error. `context` completes "Allocation failed while ...".
    #[must_use]
    pub fn allocation(context: impl Into<String>) -> Self {
        Self::Allocation {
            context: context.into(),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates an invalid-argument error.
    #[must_use]
    pub fn invalid_argument(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a subsystem failure carrying the native error code.
    #[must_use]
    pub fn system(code: i32, message: impl Into<String>) -> Self {
        Self::System {
            code,
            message: message.into(),
        }
    }

    /// Creates an invalid-state error.
    #[must_use]
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    /// Returns true for the benign interruption outcome.
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }

    /// Returns true if a lookup failed.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if a typed accessor hit the wrong tag.
    #[must_use]
    pub const fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }

    /// Returns the native code of a subsystem failure.
    #[must_use]
    pub const fn system_code(&self) -> Option<i32> {
        match self {
            Self::System { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<TryReserveError> for NvError {
    fn from(_: TryReserveError) -> Self {
        Self::allocation("reserving storage")
    }
}

/// Result type alias for nvkit operations.
pub type NvResult<T> = Result<T, NvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_message() {
        let err = NvError::TypeMismatch {
            key: "eid".to_string(),
            expected: NvType::Uint64,
            actual: NvType::String,
        };
        let msg = format!("{err}");
        assert!(msg.contains("eid"));
        assert!(msg.contains("uint64"));
        assert!(msg.contains("string"));
        assert!(err.is_type_mismatch());
    }

    #[test]
    fn test_not_found() {
        let err = NvError::not_found("time");
        assert!(err.is_not_found());
        assert!(format!("{err}").contains("time"));
    }

    #[test]
    fn test_system_carries_code() {
        let err = NvError::system(2009, "pool is busy");
        assert_eq!(err.system_code(), Some(2009));
        let msg = format!("{err}");
        assert!(msg.contains("2009"));
        assert!(msg.contains("pool is busy"));
    }

    #[test]
    fn test_interrupted_is_benign() {
        assert!(NvError::Interrupted.is_interrupted());
        assert!(!NvError::AlreadyRunning.is_interrupted());
        assert_eq!(NvError::Interrupted.system_code(), None);
    }

    #[test]
    fn test_from_try_reserve() {
        let mut v: Vec<u8> = Vec::new();
        let err = v.try_reserve(usize::MAX).unwrap_err();
        let err: NvError = err.into();
        assert!(matches!(err, NvError::Allocation { .. }));
        assert_eq!(err.to_string(), "Allocation failed while reserving storage");
    }
}
