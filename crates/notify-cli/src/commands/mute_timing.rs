//! Mute timing command implementation.
//!
//! Validates a mute timing as typed into the editor: a `name` plus raw
//! weekday, day-of-month, month and year list text per interval.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use notify_policy::MuteTimingForm;
use notify_validation::TimeIntervalValidator;
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::MuteTimingCommands;
use crate::error::CliError;
use crate::output::{write_problems, OutputFormat, Problem, TableDisplay};

/// Handler for mute timing subcommands.
#[derive(Debug, Clone, Copy)]
pub struct MuteTimingCommand {
    validator: TimeIntervalValidator,
}

impl MuteTimingCommand {
    /// Creates a handler that parses lists with `validator`.
    #[must_use]
    pub const fn new(validator: TimeIntervalValidator) -> Self {
        Self { validator }
    }

    /// Executes the mute timing subcommand.
    ///
    /// # Errors
    ///
    /// Returns `CheckFailed` after printing the report when the form has
    /// invalid fields, `Config` when the file is not a form.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &MuteTimingCommands,
    ) -> Result<(), CliError> {
        match command {
            MuteTimingCommands::Check { file, at } => self.check(out, format, file, *at),
        }
    }

    fn check<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        file: &Path,
        at: Option<DateTime<Utc>>,
    ) -> Result<(), CliError> {
        let json = std::fs::read_to_string(file)?;
        let form: MuteTimingForm = serde_json::from_str(&json)
            .map_err(|e| CliError::Config(format!("{}: {e}", file.display())))?;

        let report = match form.to_mute_timing(&self.validator, &[], None) {
            Ok(timing) => {
                info!(
                    name = %timing.name,
                    intervals = timing.time_intervals.len(),
                    "mute timing is valid"
                );
                MuteTimingReport {
                    name: timing.name.clone(),
                    valid: true,
                    intervals: timing.summary(),
                    active: at.map(|instant| timing.is_active_at(instant)),
                    problems: Vec::new(),
                }
            }
            Err(errors) => {
                debug!(name = %form.name, errors = errors.len(), "mute timing is invalid");
                MuteTimingReport {
                    name: form.name.trim().to_string(),
                    valid: false,
                    intervals: Vec::new(),
                    active: None,
                    problems: errors.iter().map(Problem::from).collect(),
                }
            }
        };

        format.write(out, &report)?;
        if report.valid {
            Ok(())
        } else {
            Err(CliError::CheckFailed {
                problems: report.problems.len(),
            })
        }
    }
}

/// Outcome of checking a mute timing form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MuteTimingReport {
    /// Trimmed name.
    pub name: String,
    /// True if every field is valid.
    pub valid: bool,
    /// One summary line per interval.
    pub intervals: Vec<String>,
    /// Whether the timing is active at the requested instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Invalid fields.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<Problem>,
}

impl TableDisplay for MuteTimingReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Mute timing: {}", self.name)?;
        writeln!(writer, "Valid:       {}", if self.valid { "yes" } else { "no" })?;
        if let Some(active) = self.active {
            writeln!(writer, "Active:      {}", if active { "yes" } else { "no" })?;
        }
        if !self.intervals.is_empty() {
            writeln!(writer)?;
            for line in &self.intervals {
                writeln!(writer, "  {line}")?;
            }
        }
        if !self.problems.is_empty() {
            writeln!(writer)?;
            write_problems(writer, &self.problems)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;
    use notify_validation::ListVocabulary;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_form(dir: &TempDir, json: &str) -> PathBuf {
        let path = dir.path().join("timing.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    fn run(
        vocabulary: ListVocabulary,
        file: PathBuf,
        at: Option<DateTime<Utc>>,
        format: Format,
    ) -> (Result<(), CliError>, String) {
        let mut buf = Vec::new();
        let result = MuteTimingCommand::new(TimeIntervalValidator::new(vocabulary)).execute(
            &mut buf,
            &OutputFormat::new(format),
            &MuteTimingCommands::Check { file, at },
        );
        (result, String::from_utf8(buf).unwrap())
    }

    const WEEKDAY_FORM: &str = r#"{
        "name": "weekends",
        "time_intervals": [
            {"times": [{"start_time": "", "end_time": ""}], "weekdays": "saturday, sunday"}
        ]
    }"#;

    #[test]
    fn valid_form_prints_summary_and_activity() {
        let dir = TempDir::new().unwrap();
        let file = write_form(&dir, WEEKDAY_FORM);
        // 2024-03-09 is a Saturday.
        let at = "2024-03-09T12:00:00Z".parse().ok();

        let (result, output) = run(ListVocabulary::default(), file, at, Format::Table);
        result.unwrap();
        assert!(output.contains("Mute timing: weekends"));
        assert!(output.contains("Active:      yes"));
        assert!(output.contains("Weekdays: saturday, sunday"));
    }

    #[test]
    fn invalid_form_reports_every_field() {
        let dir = TempDir::new().unwrap();
        let file = write_form(
            &dir,
            r#"{"name": " ", "time_intervals": [{"weekdays": "funday", "months": "smarch"}]}"#,
        );

        let (result, output) = run(ListVocabulary::default(), file, None, Format::Json);
        assert!(matches!(result, Err(CliError::CheckFailed { problems: 3 })));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["valid"], false);
        assert_eq!(value["problems"][1]["code"], "InvalidWeekday");
        assert_eq!(value["problems"][1]["field"], "time_intervals.0.weekdays");
    }

    #[test]
    fn abbreviations_follow_vocabulary() {
        let dir = TempDir::new().unwrap();
        let file = write_form(
            &dir,
            r#"{"name": "short", "time_intervals": [{"weekdays": "sat"}]}"#,
        );

        let (result, _) = run(ListVocabulary::default(), file.clone(), None, Format::Table);
        assert!(result.is_err());

        let (result, _) = run(ListVocabulary::with_abbreviations(), file, None, Format::Table);
        result.unwrap();
    }

    #[test]
    fn malformed_json_is_config_error() {
        let dir = TempDir::new().unwrap();
        let file = write_form(&dir, "not json");
        let (result, _) = run(ListVocabulary::default(), file, None, Format::Table);
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
