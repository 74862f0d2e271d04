//! Config command implementation.
//!
//! Loads a notification policy document and checks it, resolves inherited
//! route settings, searches routes and simulates routing of an alert.
//! Mute timing lists in the document are read with the configured
//! vocabulary.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use notify_policy::{AlertmanagerConfig, EffectiveTiming, MuteCheck, RouteMatch, RoutePath};
use notify_validation::{
    matchers_to_display_string, parse_matcher_list, Labels, TimeIntervalValidator,
};
use serde::Serialize;
use tracing::info;

use crate::cli::ConfigCommands;
use crate::error::CliError;
use crate::output::{truncate, write_problems, OutputFormat, Problem, TableDisplay};

/// Handler for config subcommands.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigCommand {
    validator: TimeIntervalValidator,
}

impl ConfigCommand {
    /// Creates a handler that reads mute timing lists with `validator`.
    #[must_use]
    pub const fn new(validator: TimeIntervalValidator) -> Self {
        Self { validator }
    }

    fn load(&self, file: &Path) -> Result<AlertmanagerConfig, CliError> {
        Ok(AlertmanagerConfig::from_path_with(file, &self.validator)?)
    }

    /// Executes the config subcommand.
    ///
    /// # Errors
    ///
    /// Returns `Policy` when the document cannot be loaded or a path does
    /// not exist, `Validation` for a bad search matcher, and `CheckFailed` after printing the report when a check
    /// finds problems.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &ConfigCommands,
    ) -> Result<(), CliError> {
        match command {
            ConfigCommands::Check { file } => self.check(out, format, file),
            ConfigCommands::Timing { file, path } => self.timing(out, format, file, path),
            ConfigCommands::Route { file, labels } => {
                self.route(out, format, file, &collect_labels(labels))
            }
            ConfigCommands::Muted { file, labels, at } => self.muted(
                out,
                format,
                file,
                &collect_labels(labels),
                at.unwrap_or_else(Utc::now),
            ),
            ConfigCommands::Find {
                file,
                matchers,
                contact_point,
            } => self.find(out, format, file, matchers, contact_point.as_deref()),
        }
    }

    fn check<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        file: &Path,
    ) -> Result<(), CliError> {
        let config = self.load(file)?;
        let problems: Vec<Problem> = config.problems().iter().map(Problem::from).collect();
        let report = CheckReport {
            routes: config.route.node_count(),
            receivers: config.receivers.len(),
            mute_timings: config.mute_time_intervals.len(),
            problems,
        };

        format.write(out, &report)?;
        if report.problems.is_empty() {
            Ok(())
        } else {
            Err(CliError::CheckFailed {
                problems: report.problems.len(),
            })
        }
    }

    fn timing<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        file: &Path,
        path: &str,
    ) -> Result<(), CliError> {
        let config = self.load(file)?;
        let path: RoutePath = path.parse()?;
        let tree = config.tree();
        let report = TimingReport {
            receiver: tree.resolve_receiver(&path)?,
            timing: tree.resolve_effective_timing(&path)?,
            path,
        };
        format.write(out, &report)
    }

    fn route<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        file: &Path,
        labels: &Labels,
    ) -> Result<(), CliError> {
        let config = self.load(file)?;
        let routes = config.tree().route_alert(labels);
        info!(routes = routes.len(), "routed alert");
        format.write(out, &RouteReport { routes })
    }

    fn muted<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        file: &Path,
        labels: &Labels,
        at: DateTime<Utc>,
    ) -> Result<(), CliError> {
        let config = self.load(file)?;
        let routes = config.check_muted(labels, at);
        let report = MutedReport {
            at,
            muted: !routes.is_empty() && routes.iter().all(MuteCheck::is_muted),
            routes,
        };
        format.write(out, &report)
    }

    fn find<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        file: &Path,
        matchers: &str,
        contact_point: Option<&str>,
    ) -> Result<(), CliError> {
        let query = parse_matcher_list(matchers)?;
        let config = self.load(file)?;
        let tree = config.tree();

        let mut routes = Vec::new();
        for path in tree.find_routes(&query, contact_point) {
            let node = tree.node(&path)?;
            routes.push(FoundRoute {
                receiver: node.receiver.clone(),
                matchers: matchers_to_display_string(&node.matchers),
                path,
            });
        }
        info!(routes = routes.len(), "found routes");
        format.write(out, &FindReport { routes })
    }
}

fn collect_labels(labels: &[(String, String)]) -> Labels {
    labels.iter().cloned().collect()
}

fn join_or_dash(items: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    let joined = items
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(",");
    if joined.is_empty() {
        "-".to_string()
    } else {
        joined
    }
}

/// Result of checking a configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Number of routes including the root.
    pub routes: usize,
    /// Number of receivers.
    pub receivers: usize,
    /// Number of mute timings.
    pub mute_timings: usize,
    /// Every problem found.
    pub problems: Vec<Problem>,
}

impl TableDisplay for CheckReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Routes:       {}", self.routes)?;
        writeln!(writer, "Receivers:    {}", self.receivers)?;
        writeln!(writer, "Mute timings: {}", self.mute_timings)?;
        writeln!(writer)?;
        if self.problems.is_empty() {
            writeln!(writer, "No problems found.")?;
        } else {
            write_problems(writer, &self.problems)?;
        }
        Ok(())
    }
}

/// Inherited settings in force at one route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimingReport {
    /// Route path.
    pub path: RoutePath,
    /// Effective receiver.
    pub receiver: Option<String>,
    /// Effective grouping and timing.
    #[serde(flatten)]
    pub timing: EffectiveTiming,
}

impl TableDisplay for TimingReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Route:           {}", self.path)?;
        writeln!(
            writer,
            "Receiver:        {}",
            self.receiver.as_deref().unwrap_or("-")
        )?;
        writeln!(writer, "Group by:        {}", join_or_dash(&self.timing.group_by))?;
        writeln!(writer, "Group wait:      {}", self.timing.group_wait)?;
        writeln!(writer, "Group interval:  {}", self.timing.group_interval)?;
        writeln!(writer, "Repeat interval: {}", self.timing.repeat_interval)?;
        Ok(())
    }
}

fn write_route_header<W: Write>(writer: &mut W, extra: &str) -> Result<(), CliError> {
    writeln!(
        writer,
        "{:<10}  {:<20}  {:<20}  {:<6}  {:<8}  {:<8}  {}",
        "PATH", "RECEIVER", "GROUP BY", "WAIT", "INTERVAL", "REPEAT", extra
    )?;
    writeln!(writer, "{}", "─".repeat(100))?;
    Ok(())
}

fn write_route_row<W: Write>(
    writer: &mut W,
    route: &RouteMatch,
    extra: &str,
) -> Result<(), CliError> {
    writeln!(
        writer,
        "{:<10}  {:<20}  {:<20}  {:<6}  {:<8}  {:<8}  {}",
        route.path.to_string(),
        truncate(route.receiver.as_deref().unwrap_or("-"), 20),
        truncate(&join_or_dash(&route.timing.group_by), 20),
        route.timing.group_wait.to_string(),
        route.timing.group_interval.to_string(),
        route.timing.repeat_interval.to_string(),
        extra
    )?;
    Ok(())
}

/// Routes that handle an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteReport {
    /// Handling routes in routing order.
    pub routes: Vec<RouteMatch>,
}

impl TableDisplay for RouteReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        write_route_header(writer, "MUTE TIMINGS")?;
        for route in &self.routes {
            write_route_row(writer, route, &join_or_dash(&route.mute_time_intervals))?;
        }
        writeln!(writer)?;
        writeln!(writer, "Total: {} route(s)", self.routes.len())?;
        Ok(())
    }
}

/// Mute state of the routes handling an alert at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutedReport {
    /// Evaluation instant.
    pub at: DateTime<Utc>,
    /// True if every handling route is muted.
    pub muted: bool,
    /// Handling routes with their active mute timings.
    pub routes: Vec<MuteCheck>,
}

impl TableDisplay for MutedReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "At:    {}", self.at.to_rfc3339())?;
        writeln!(writer, "Muted: {}", if self.muted { "yes" } else { "no" })?;
        writeln!(writer)?;
        write_route_header(writer, "ACTIVE MUTE TIMINGS")?;
        for check in &self.routes {
            write_route_row(writer, &check.route, &join_or_dash(&check.active_mute_timings))?;
        }
        Ok(())
    }
}

/// One route found by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoundRoute {
    /// Route path.
    pub path: RoutePath,
    /// The route's own receiver, if it sets one.
    pub receiver: Option<String>,
    /// The route's matchers as text.
    pub matchers: String,
}

/// Routes found by a search, in tree order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FindReport {
    /// Matching routes.
    pub routes: Vec<FoundRoute>,
}

impl TableDisplay for FindReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.routes.is_empty() {
            writeln!(writer, "No matching routes.")?;
            return Ok(());
        }
        writeln!(writer, "{:<10}  {:<20}  MATCHERS", "PATH", "RECEIVER")?;
        writeln!(writer, "{}", "─".repeat(72))?;
        for route in &self.routes {
            writeln!(
                writer,
                "{:<10}  {:<20}  {}",
                route.path.to_string(),
                truncate(route.receiver.as_deref().unwrap_or("-"), 20),
                route.matchers
            )?;
        }
        writeln!(writer)?;
        writeln!(writer, "Total: {} route(s)", self.routes.len())?;
        Ok(())
    }
}
