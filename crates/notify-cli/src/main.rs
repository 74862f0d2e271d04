//! notifyctl binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use notify_cli::cli::{Cli, Commands};
use notify_cli::commands::{ConfigCommand, DurationCommand, MatcherCommand, MuteTimingCommand};
use notify_cli::output::OutputFormat;
use notify_cli::{load_validator, CliError};

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Duration { command } => {
            DurationCommand::new().execute(&mut stdout, &format, &command)?;
        }
        Commands::Matchers { command } => {
            MatcherCommand::new().execute(&mut stdout, &format, &command)?;
        }
        Commands::MuteTiming { command } => {
            let validator = load_validator(cli.validator_config.as_deref())?;
            MuteTimingCommand::new(validator).execute(&mut stdout, &format, &command)?;
        }
        Commands::Config { command } => {
            let validator = load_validator(cli.validator_config.as_deref())?;
            ConfigCommand::new(validator).execute(&mut stdout, &format, &command)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_duration_format() {
        let cli = Cli::parse_from(["notifyctl", "duration", "format", "3600000"]);
        assert!(run(cli).is_ok());
    }

    #[test]
    fn run_reports_validation_error() {
        let cli = Cli::parse_from(["notifyctl", "duration", "parse", "1h1h"]);
        assert!(matches!(run(cli), Err(CliError::Validation(_))));
    }
}
