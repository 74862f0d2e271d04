//! Error types for the notify-policy crate.

use notify_validation::{ErrorCode, ValidationError};
use thiserror::Error;

/// Errors that can occur while shaping or checking notification policies.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A route path does not address a node in the tree.
    #[error("route not found at path '{path}'")]
    PathNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Neither the defaults nor the receiver list provide a root receiver.
    #[error("no receiver available for the root route")]
    MissingReceiver,

    /// A field value failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A route references a receiver or mute timing that does not exist.
    #[error("route '{path}' references unknown {kind} '{name}'")]
    UnknownReference {
        /// What kind of object is referenced (`receiver`, `mute timing`).
        kind: &'static str,
        /// The referenced name.
        name: String,
        /// Path of the referencing route.
        path: String,
    },

    /// Two objects of the same kind share a name.
    #[error("duplicate {kind} name '{name}'")]
    DuplicateName {
        /// What kind of object is duplicated.
        kind: &'static str,
        /// The duplicated name.
        name: String,
    },

    /// A silence cannot be created as specified.
    #[error("invalid silence: {reason}")]
    InvalidSilence {
        /// Why the silence is invalid.
        reason: String,
    },

    /// A configuration document could not be decoded or encoded.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Reading a configuration document failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PolicyError {
    /// Returns the stable error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::PathNotFound { .. } => ErrorCode::PathNotFound,
            Self::MissingReceiver => ErrorCode::MissingReceiver,
            Self::Validation(e) => e.code(),
            Self::UnknownReference { .. } => ErrorCode::UnknownReference,
            Self::DuplicateName { .. } => ErrorCode::InvalidName,
            Self::InvalidSilence { .. } => ErrorCode::InvalidSilence,
            Self::InvalidDocument(_) | Self::Io(_) => ErrorCode::InvalidDocument,
        }
    }

    pub(crate) fn path_not_found(path: impl ToString) -> Self {
        Self::PathNotFound {
            path: path.to_string(),
        }
    }

    pub(crate) fn invalid_silence(reason: impl Into<String>) -> Self {
        Self::InvalidSilence {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for PolicyError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidDocument(err.to_string())
    }
}

/// Result type for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_path_not_found() {
        let err = PolicyError::path_not_found("0.3");
        assert_eq!(err.to_string(), "route not found at path '0.3'");
        assert_eq!(err.code(), ErrorCode::PathNotFound);
    }

    #[test]
    fn error_display_unknown_reference() {
        let err = PolicyError::UnknownReference {
            kind: "receiver",
            name: "pager".to_string(),
            path: "0".to_string(),
        };
        assert_eq!(err.to_string(), "route '0' references unknown receiver 'pager'");
        assert_eq!(err.code(), ErrorCode::UnknownReference);
    }

    #[test]
    fn error_validation_keeps_code() {
        let err: PolicyError = ValidationError::invalid_month("months", "smarch").into();
        assert_eq!(err.code(), ErrorCode::InvalidMonth);
        assert_eq!(
            err.to_string(),
            "validation failed for 'months': invalid month 'smarch'"
        );
    }

    #[test]
    fn error_from_serde_json() {
        let json_err = serde_json::from_str::<String>("invalid json").unwrap_err();
        let err: PolicyError = json_err.into();
        assert!(matches!(err, PolicyError::InvalidDocument(_)));
        assert_eq!(err.code(), ErrorCode::InvalidDocument);
    }

    #[test]
    fn error_codes_for_missing_receiver_and_silence() {
        assert_eq!(PolicyError::MissingReceiver.code(), ErrorCode::MissingReceiver);
        assert_eq!(
            PolicyError::invalid_silence("no matchers").code(),
            ErrorCode::InvalidSilence
        );
    }
}
