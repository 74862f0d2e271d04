//! Validation builder for collecting every field error of a form.

use crate::error::ValidationError;

/// A builder for performing multiple validations with error collection.
///
/// Forms report all invalid fields at once, so validators are run through
/// the builder instead of short-circuiting on the first `?`.
///
/// # Example
///
/// ```
/// use notify_validation::{ValidationBuilder, parse_duration};
///
/// let mut builder = ValidationBuilder::new().validate_not_empty("name", "weekends");
/// let wait = builder.record(parse_duration("30s"));
/// assert_eq!(wait, Some(30_000));
/// assert!(builder.finish().is_ok());
/// ```
#[derive(Debug, Default)]
pub struct ValidationBuilder {
    errors: Vec<ValidationError>,
}

impl ValidationBuilder {
    /// Create a new validation builder.
    #[must_use]
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Add a validation check.
    ///
    /// The closure should return `Ok(())` if validation passes,
    /// or `Err(ValidationError)` if it fails.
    #[must_use]
    pub fn validate<F>(mut self, check: F) -> Self
    where
        F: FnOnce() -> Result<(), ValidationError>,
    {
        if let Err(e) = check() {
            self.errors.push(e);
        }
        self
    }

    /// Record the outcome of a parsing validator, keeping the value on
    /// success and the error otherwise.
    pub fn record<T>(&mut self, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.errors.push(e);
                None
            }
        }
    }

    /// Push an error directly.
    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Validate that a value is not empty.
    #[must_use]
    pub fn validate_not_empty(mut self, field: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.errors
                .push(ValidationError::invalid_name(field, "field is required"));
        }
        self
    }

    /// Validate that a value is within a maximum length.
    #[must_use]
    pub fn validate_max_length(mut self, field: &str, value: &str, max: usize) -> Self {
        if value.len() > max {
            self.errors.push(ValidationError::invalid_name(
                field,
                format!("must be at most {max} characters, got {}", value.len()),
            ));
        }
        self
    }

    /// Check if any errors have been collected.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Get the number of errors collected.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Finish validation, returning all collected errors if any.
    ///
    /// # Errors
    ///
    /// Returns the collected errors when at least one check failed.
    pub fn finish(self) -> Result<(), Vec<ValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    /// Finish validation, returning `value` only if every check passed.
    ///
    /// # Errors
    ///
    /// Returns the collected errors when at least one check failed.
    pub fn finish_with<T>(self, value: T) -> Result<T, Vec<ValidationError>> {
        self.finish().map(|()| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_empty_builder_succeeds() {
        assert!(ValidationBuilder::new().finish().is_ok());
    }

    #[test]
    fn test_not_empty() {
        let result = ValidationBuilder::new()
            .validate_not_empty("name", "   ")
            .finish();
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), ErrorCode::InvalidName);
    }

    #[test]
    fn test_collects_multiple_errors() {
        let mut builder = ValidationBuilder::new()
            .validate_not_empty("name", "")
            .validate_max_length("comment", "abcdef", 3);
        let parsed: Option<u8> = builder.record(Err(ValidationError::invalid_year("years", "99")));

        assert!(parsed.is_none());
        assert!(builder.has_errors());
        assert_eq!(builder.error_count(), 3);
    }

    #[test]
    fn test_validate_closure() {
        let result = ValidationBuilder::new()
            .validate(|| Err(ValidationError::invalid_month("months", "13")))
            .validate(|| Ok(()))
            .finish();
        assert_eq!(result.unwrap_err().len(), 1);
    }

    #[test]
    fn test_finish_with_value() {
        let mut builder = ValidationBuilder::new();
        let value = builder.record(Ok::<_, ValidationError>(7));
        assert_eq!(builder.finish_with(value), Ok(Some(7)));
    }
}
