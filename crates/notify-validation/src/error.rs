//! Validation error types with stable, field-scoped error codes.

use std::fmt;
use thiserror::Error;

/// Stable error codes shown next to the offending form field.
///
/// The string form of each code never changes; callers may match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A duration string could not be parsed.
    InvalidDuration,
    /// A weekday list contained an unknown day.
    InvalidWeekday,
    /// A day-of-month list contained an out-of-range day.
    InvalidDayOfMonth,
    /// A month list contained an unknown month.
    InvalidMonth,
    /// A year list contained something other than four-digit years.
    InvalidYear,
    /// A time range endpoint was malformed or out of range.
    InvalidTime,
    /// A label matcher expression could not be parsed.
    InvalidMatcherSyntax,
    /// A route path does not address an existing node.
    PathNotFound,
    /// No receiver is available for the root route.
    MissingReceiver,
    /// A name was empty or already taken.
    InvalidName,
    /// A route references a receiver or mute timing that does not exist.
    UnknownReference,
    /// A silence window or matcher set is unusable.
    InvalidSilence,
    /// A configuration document could not be decoded.
    InvalidDocument,
}

impl ErrorCode {
    /// Returns the stable string form of the code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidDuration => "InvalidDuration",
            Self::InvalidWeekday => "InvalidWeekday",
            Self::InvalidDayOfMonth => "InvalidDayOfMonth",
            Self::InvalidMonth => "InvalidMonth",
            Self::InvalidYear => "InvalidYear",
            Self::InvalidTime => "InvalidTime",
            Self::InvalidMatcherSyntax => "InvalidMatcherSyntax",
            Self::PathNotFound => "PathNotFound",
            Self::MissingReceiver => "MissingReceiver",
            Self::InvalidName => "InvalidName",
            Self::UnknownReference => "UnknownReference",
            Self::InvalidSilence => "InvalidSilence",
            Self::InvalidDocument => "InvalidDocument",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of validation error that occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Duration text did not follow the `<integer><unit>` grammar.
    InvalidDuration {
        /// The text that was rejected.
        input: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Unknown weekday token.
    InvalidWeekday {
        /// The offending token.
        token: String,
    },
    /// Day of month outside `[-31,-1] ∪ [1,31]`.
    InvalidDayOfMonth {
        /// The offending token.
        token: String,
    },
    /// Unknown month token.
    InvalidMonth {
        /// The offending token.
        token: String,
    },
    /// Year token that is not exactly four digits.
    InvalidYear {
        /// The offending token.
        token: String,
    },
    /// Time of day that is not a valid `HH:MM` endpoint.
    InvalidTime {
        /// The text that was rejected.
        input: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Label matcher expression with bad syntax.
    InvalidMatcherSyntax {
        /// The text that was rejected.
        input: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Name that is empty or collides with an existing one.
    InvalidName {
        /// Why the name was rejected.
        reason: String,
    },
}

impl ValidationErrorKind {
    /// Returns the stable error code for this kind.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidDuration { .. } => ErrorCode::InvalidDuration,
            Self::InvalidWeekday { .. } => ErrorCode::InvalidWeekday,
            Self::InvalidDayOfMonth { .. } => ErrorCode::InvalidDayOfMonth,
            Self::InvalidMonth { .. } => ErrorCode::InvalidMonth,
            Self::InvalidYear { .. } => ErrorCode::InvalidYear,
            Self::InvalidTime { .. } => ErrorCode::InvalidTime,
            Self::InvalidMatcherSyntax { .. } => ErrorCode::InvalidMatcherSyntax,
            Self::InvalidName { .. } => ErrorCode::InvalidName,
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDuration { input, reason } => {
                write!(f, "invalid duration '{input}': {reason}")
            }
            Self::InvalidWeekday { token } => write!(f, "invalid day of the week '{token}'"),
            Self::InvalidDayOfMonth { token } => write!(f, "invalid day of month '{token}'"),
            Self::InvalidMonth { token } => write!(f, "invalid month '{token}'"),
            Self::InvalidYear { token } => write!(f, "invalid year '{token}'"),
            Self::InvalidTime { input, reason } => write!(f, "invalid time '{input}': {reason}"),
            Self::InvalidMatcherSyntax { input, reason } => {
                write!(f, "invalid matcher '{input}': {reason}")
            }
            Self::InvalidName { reason } => write!(f, "invalid name: {reason}"),
        }
    }
}

/// Error returned when validation fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed for '{field}': {kind}")]
pub struct ValidationError {
    /// The name of the field that failed validation.
    pub field: String,
    /// The kind of validation error.
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(field: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }

    /// Create an "invalid duration" validation error.
    #[must_use]
    pub fn invalid_duration(
        field: impl Into<String>,
        input: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(
            field,
            ValidationErrorKind::InvalidDuration {
                input: input.into(),
                reason: reason.into(),
            },
        )
    }

    /// Create an "invalid weekday" validation error.
    #[must_use]
    pub fn invalid_weekday(field: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(
            field,
            ValidationErrorKind::InvalidWeekday {
                token: token.into(),
            },
        )
    }

    /// Create an "invalid day of month" validation error.
    #[must_use]
    pub fn invalid_day_of_month(field: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(
            field,
            ValidationErrorKind::InvalidDayOfMonth {
                token: token.into(),
            },
        )
    }

    /// Create an "invalid month" validation error.
    #[must_use]
    pub fn invalid_month(field: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(
            field,
            ValidationErrorKind::InvalidMonth {
                token: token.into(),
            },
        )
    }

    /// Create an "invalid year" validation error.
    #[must_use]
    pub fn invalid_year(field: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(
            field,
            ValidationErrorKind::InvalidYear {
                token: token.into(),
            },
        )
    }

    /// Create an "invalid time" validation error.
    #[must_use]
    pub fn invalid_time(
        field: impl Into<String>,
        input: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(
            field,
            ValidationErrorKind::InvalidTime {
                input: input.into(),
                reason: reason.into(),
            },
        )
    }

    /// Create an "invalid matcher syntax" validation error.
    #[must_use]
    pub fn invalid_matcher(
        field: impl Into<String>,
        input: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(
            field,
            ValidationErrorKind::InvalidMatcherSyntax {
                input: input.into(),
                reason: reason.into(),
            },
        )
    }

    /// Create an "invalid name" validation error.
    #[must_use]
    pub fn invalid_name(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            field,
            ValidationErrorKind::InvalidName {
                reason: reason.into(),
            },
        )
    }

    /// Replace the field name, keeping the kind.
    ///
    /// Used when a validator shared by several inputs reports under the
    /// caller's field path (e.g. `time_intervals.0.weekdays`).
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// Returns the stable error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.kind.code()
    }

    /// Message suitable for display beside the field, without the field name.
    #[must_use]
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorCode::InvalidDuration.as_str(), "InvalidDuration");
        assert_eq!(ErrorCode::InvalidDayOfMonth.to_string(), "InvalidDayOfMonth");
        assert_eq!(ErrorCode::PathNotFound.as_str(), "PathNotFound");
        assert_eq!(ErrorCode::MissingReceiver.as_str(), "MissingReceiver");
    }

    #[test]
    fn test_kind_maps_to_code() {
        let err = ValidationError::invalid_weekday("weekdays", "funday");
        assert_eq!(err.code(), ErrorCode::InvalidWeekday);

        let err = ValidationError::invalid_time("start_time", "25:00", "hour out of range");
        assert_eq!(err.code(), ErrorCode::InvalidTime);
    }

    #[test]
    fn test_display_includes_field_and_token() {
        let err = ValidationError::invalid_month("months", "smarch");
        assert_eq!(
            err.to_string(),
            "validation failed for 'months': invalid month 'smarch'"
        );
        assert_eq!(err.message(), "invalid month 'smarch'");
    }

    #[test]
    fn test_with_field() {
        let err = ValidationError::invalid_year("years", "21").with_field("time_intervals.1.years");
        assert_eq!(err.field, "time_intervals.1.years");
        assert_eq!(err.code(), ErrorCode::InvalidYear);
    }
}
