//! Command-line argument parsing with clap.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};

/// notifyctl - offline checks for notification policies.
#[derive(Parser, Debug, Clone)]
#[command(name = "notifyctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table, global = true)]
    pub format: Format,

    /// JSON validator configuration (accepted weekday/month spellings).
    #[arg(long, env = "NOTIFYCTL_VALIDATOR_CONFIG", global = true)]
    pub validator_config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Parse and format durations.
    Duration {
        /// Duration subcommand to execute.
        #[command(subcommand)]
        command: DurationCommands,
    },

    /// Parse label matcher lists.
    Matchers {
        /// Matcher subcommand to execute.
        #[command(subcommand)]
        command: MatcherCommands,
    },

    /// Validate mute timings.
    MuteTiming {
        /// Mute timing subcommand to execute.
        #[command(subcommand)]
        command: MuteTimingCommands,
    },

    /// Inspect configuration documents.
    Config {
        /// Config subcommand to execute.
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Duration subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum DurationCommands {
    /// Parse duration text such as `1d4h30m` into milliseconds.
    Parse {
        /// Duration text.
        text: String,
    },

    /// Format milliseconds as duration text.
    Format {
        /// Milliseconds.
        millis: u64,
    },
}

/// Matcher subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum MatcherCommands {
    /// Parse a comma-separated matcher list.
    Parse {
        /// Matcher list, e.g. `severity="critical, urgent",team=~db.*`.
        text: String,

        /// Label to test the matchers against (repeatable).
        #[arg(short, long = "label", value_name = "NAME=VALUE", value_parser = parse_label)]
        labels: Vec<(String, String)>,
    },
}

/// Mute timing subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum MuteTimingCommands {
    /// Validate a mute timing form given as JSON.
    Check {
        /// JSON file with `name` and raw `time_intervals` fields.
        file: PathBuf,

        /// Also report whether the timing is active at this RFC 3339 instant.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Check a configuration document for problems.
    Check {
        /// Configuration document (JSON).
        file: PathBuf,
    },

    /// Show the effective grouping and timing of one route.
    Timing {
        /// Configuration document (JSON).
        file: PathBuf,

        /// Route path, e.g. `0.2`; `root` for the root route.
        #[arg(default_value = "root")]
        path: String,
    },

    /// Show which routes handle an alert.
    Route {
        /// Configuration document (JSON).
        file: PathBuf,

        /// Alert label (repeatable).
        #[arg(short, long = "label", value_name = "NAME=VALUE", value_parser = parse_label)]
        labels: Vec<(String, String)>,
    },

    /// Show whether an alert's routes are muted at an instant.
    Muted {
        /// Configuration document (JSON).
        file: PathBuf,

        /// Alert label (repeatable).
        #[arg(short, long = "label", value_name = "NAME=VALUE", value_parser = parse_label)]
        labels: Vec<(String, String)>,

        /// RFC 3339 instant; defaults to now.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// List the routes that carry given matchers or contact point.
    Find {
        /// Configuration document (JSON).
        file: PathBuf,

        /// Matchers every listed route must carry, e.g. `team=db`.
        #[arg(short, long, default_value = "")]
        matchers: String,

        /// Case-insensitive part of the route's own contact point.
        #[arg(short, long)]
        contact_point: Option<String>,
    },
}

/// Parses a `NAME=VALUE` label argument.
///
/// # Errors
///
/// Returns a message when there is no `=` or the name is empty.
pub fn parse_label(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{arg}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_label_splits_on_first_equals() {
        assert_eq!(
            parse_label("query=a=b"),
            Ok(("query".to_string(), "a=b".to_string()))
        );
        assert_eq!(parse_label("empty="), Ok(("empty".to_string(), String::new())));
        assert!(parse_label("novalue").is_err());
        assert!(parse_label("=x").is_err());
    }

    #[test]
    fn cli_parses_duration_parse() {
        let cli = Cli::parse_from(["notifyctl", "duration", "parse", "1d4h"]);
        match cli.command {
            Commands::Duration {
                command: DurationCommands::Parse { text },
            } => assert_eq!(text, "1d4h"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_respects_global_format_flag() {
        let cli = Cli::parse_from(["notifyctl", "duration", "format", "90000", "--format", "json"]);
        assert_eq!(cli.format, Format::Json);
    }

    #[test]
    fn cli_parses_labels_and_instant() {
        let cli = Cli::parse_from([
            "notifyctl",
            "config",
            "muted",
            "am.json",
            "-l",
            "team=db",
            "--label",
            "severity=critical",
            "--at",
            "2024-03-09T12:00:00Z",
        ]);
        match cli.command {
            Commands::Config {
                command: ConfigCommands::Muted { labels, at, .. },
            } => {
                assert_eq!(labels.len(), 2);
                assert_eq!(labels[0], ("team".to_string(), "db".to_string()));
                assert!(at.is_some());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_timing_path_defaults_to_root() {
        let cli = Cli::parse_from(["notifyctl", "config", "timing", "am.json"]);
        match cli.command {
            Commands::Config {
                command: ConfigCommands::Timing { path, .. },
            } => assert_eq!(path, "root"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_find_filters_are_optional() {
        let cli = Cli::parse_from(["notifyctl", "config", "find", "am.json", "-c", "ops"]);
        match cli.command {
            Commands::Config {
                command:
                    ConfigCommands::Find {
                        matchers,
                        contact_point,
                        ..
                    },
            } => {
                assert_eq!(matchers, "");
                assert_eq!(contact_point.as_deref(), Some("ops"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
