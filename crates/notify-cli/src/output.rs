//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use notify_policy::PolicyError;
use notify_validation::ValidationError;
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// One problem found by a check, with its stable error code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    /// Stable error code.
    pub code: String,
    /// Offending field, if the problem is field-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl From<&ValidationError> for Problem {
    fn from(err: &ValidationError) -> Self {
        Self {
            code: err.code().to_string(),
            field: Some(err.field.clone()),
            message: err.message(),
        }
    }
}

impl From<&PolicyError> for Problem {
    fn from(err: &PolicyError) -> Self {
        match err {
            PolicyError::Validation(e) => Self::from(e),
            other => Self {
                code: other.code().to_string(),
                field: None,
                message: other.to_string(),
            },
        }
    }
}

/// Writes a problem table, or nothing if there are none.
pub(crate) fn write_problems<W: Write>(
    writer: &mut W,
    problems: &[Problem],
) -> Result<(), CliError> {
    if problems.is_empty() {
        return Ok(());
    }

    writeln!(writer, "{:<22}  {:<36}  MESSAGE", "CODE", "FIELD")?;
    writeln!(writer, "{}", "─".repeat(96))?;
    for problem in problems {
        writeln!(
            writer,
            "{:<22}  {:<36}  {}",
            problem.code,
            truncate(problem.field.as_deref().unwrap_or("-"), 36),
            problem.message
        )?;
    }
    writeln!(writer)?;
    writeln!(writer, "Total: {} problem(s)", problems.len())?;
    Ok(())
}

pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
