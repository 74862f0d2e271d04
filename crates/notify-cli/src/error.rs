//! CLI error types.

use std::fmt;

use notify_policy::PolicyError;
use notify_validation::ValidationError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Input failed validation.
    Validation(ValidationError),
    /// A policy operation failed.
    Policy(PolicyError),
    /// A check found problems; the report was already printed.
    CheckFailed {
        /// Number of problems found.
        problems: usize,
    },
    /// Invalid configuration.
    Config(String),
    /// Output formatting error.
    Format(String),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "[{}] {e}", e.code()),
            Self::Policy(e) => write!(f, "[{}] {e}", e.code()),
            Self::CheckFailed { problems } => write!(f, "check failed: {problems} problem(s) found"),
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Format(msg) => write!(f, "format error: {msg}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(e) => Some(e),
            Self::Policy(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<PolicyError> for CliError {
    fn from(err: PolicyError) -> Self {
        Self::Policy(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_error_display_validation_has_code() {
        let err = CliError::from(ValidationError::invalid_duration("duration", "5x", "unknown unit"));
        assert_eq!(
            err.to_string(),
            "[InvalidDuration] validation failed for 'duration': invalid duration '5x': unknown unit"
        );
    }

    #[test]
    fn cli_error_display_policy_has_code() {
        let err = CliError::from(PolicyError::MissingReceiver);
        assert_eq!(
            err.to_string(),
            "[MissingReceiver] no receiver available for the root route"
        );
    }

    #[test]
    fn cli_error_display_check_failed() {
        let err = CliError::CheckFailed { problems: 3 };
        assert_eq!(err.to_string(), "check failed: 3 problem(s) found");
    }

    #[test]
    fn cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err = CliError::from(io_err);
        assert!(matches!(cli_err, CliError::Io(_)));
    }
}
