//! Duration command implementation.
//!
//! Converts between duration text and milliseconds.

use std::io::Write;

use notify_validation::{format_duration, parse_duration};
use serde::Serialize;
use tracing::debug;

use crate::cli::DurationCommands;
use crate::error::CliError;
use crate::output::{OutputFormat, TableDisplay};

/// Handler for duration subcommands.
#[derive(Debug, Default, Clone, Copy)]
pub struct DurationCommand;

impl DurationCommand {
    /// Creates a new duration command handler.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Executes the duration subcommand.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for malformed duration text.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &DurationCommands,
    ) -> Result<(), CliError> {
        let report = match command {
            DurationCommands::Parse { text } => {
                let millis = parse_duration(text)?;
                debug!(text = %text, millis, "parsed duration");
                DurationReport::new(text.clone(), millis)
            }
            DurationCommands::Format { millis } => {
                DurationReport::new(format_duration(*millis), *millis)
            }
        };
        format.write(out, &report)
    }
}

/// A duration in both forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DurationReport {
    /// Text as given, or formatted.
    pub input: String,
    /// Milliseconds.
    pub millis: u64,
    /// Canonical text.
    pub canonical: String,
}

impl DurationReport {
    fn new(input: String, millis: u64) -> Self {
        Self {
            input,
            millis,
            canonical: format_duration(millis),
        }
    }
}

impl TableDisplay for DurationReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Input:     {}", self.input)?;
        writeln!(writer, "Millis:    {}", self.millis)?;
        writeln!(writer, "Canonical: {}", self.canonical)?;
        Ok(())
    }
}
