//! Matcher command implementation.

use std::io::Write;

use notify_validation::{
    matchers_match, matchers_to_display_string, parse_matcher_list, Labels, Matcher,
};
use serde::Serialize;

use crate::cli::MatcherCommands;
use crate::error::CliError;
use crate::output::{truncate, OutputFormat, TableDisplay};

/// Handler for matcher subcommands.
#[derive(Debug, Default, Clone, Copy)]
pub struct MatcherCommand;

impl MatcherCommand {
    /// Creates a new matcher command handler.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Executes the matcher subcommand.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the matcher list does not parse.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &MatcherCommands,
    ) -> Result<(), CliError> {
        match command {
            MatcherCommands::Parse { text, labels } => {
                let matchers = parse_matcher_list(text)?;
                let labels: Option<Labels> =
                    (!labels.is_empty()).then(|| labels.iter().cloned().collect());
                let report = MatcherReport {
                    display: matchers_to_display_string(&matchers),
                    matches: labels.as_ref().map(|l| matchers_match(&matchers, l)),
                    matchers,
                };
                format.write(out, &report)
            }
        }
    }
}

/// Parsed matchers, with the result of testing them against a label set
/// when one was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatcherReport {
    /// Parsed matchers in input order.
    pub matchers: Vec<Matcher>,
    /// Canonical text.
    pub display: String,
    /// Whether the given labels satisfy every matcher.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<bool>,
}

impl TableDisplay for MatcherReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.matchers.is_empty() {
            writeln!(writer, "No matchers (matches every alert).")?;
        } else {
            writeln!(writer, "{:<24}  {:<4}  VALUE", "NAME", "OP")?;
            writeln!(writer, "{}", "─".repeat(60))?;
            for matcher in &self.matchers {
                writeln!(
                    writer,
                    "{:<24}  {:<4}  {}",
                    truncate(&matcher.name, 24),
                    matcher.operator,
                    matcher.value
                )?;
            }
            writeln!(writer)?;
        }
        writeln!(writer, "Display: {}", self.display)?;
        if let Some(matches) = self.matches {
            writeln!(writer, "Matches: {}", if matches { "yes" } else { "no" })?;
        }
        Ok(())
    }
}
