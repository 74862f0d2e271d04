//! # notify-cli
//!
//! `notifyctl`, an offline companion for notification policy documents.
//!
//! Provides commands for:
//! - Converting duration text such as `1d4h30m`
//! - Parsing label matcher lists and testing them against labels
//! - Validating mute timings as typed into an editor
//! - Checking configuration documents, resolving inherited route
//!   settings, searching routes, and simulating alert routing and muting
//!
//! Every command writes either a table or JSON (`--format json`). Logs go
//! to stderr and are filtered through `RUST_LOG`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format};
pub use error::CliError;
pub use output::OutputFormat;

use std::path::Path;

use notify_validation::{TimeIntervalValidator, ValidatorConfig};
use tracing::debug;

/// Loads the validator configuration from a JSON file, or the default
/// (full weekday and month names only) when no file is given.
///
/// # Errors
///
/// Returns `Io` if the file cannot be read and `Config` if it does not
/// decode.
pub fn load_validator(path: Option<&Path>) -> Result<TimeIntervalValidator, CliError> {
    let config = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            let config: ValidatorConfig = serde_json::from_str(&json)
                .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;
            debug!(path = %path.display(), "loaded validator configuration");
            config
        }
        None => ValidatorConfig::default(),
    };
    Ok(TimeIntervalValidator::new(config.vocabulary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify_validation::ListVocabulary;

    #[test]
    fn default_validator_uses_full_names() {
        let validator = load_validator(None).unwrap();
        assert_eq!(validator.vocabulary(), ListVocabulary::full_names());
    }

    #[test]
    fn validator_config_enables_abbreviations() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("validator.json");
        std::fs::write(
            &path,
            r#"{"vocabulary": {"weekday_abbreviations": true, "month_abbreviations": true}}"#,
        )
        .unwrap();

        let validator = load_validator(Some(&path)).unwrap();
        assert_eq!(validator.vocabulary(), ListVocabulary::with_abbreviations());
    }

    #[test]
    fn bad_validator_config_is_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("validator.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(matches!(load_validator(Some(&path)), Err(CliError::Config(_))));
    }
}
