//! Notification policy model for Alertmanager-style alerting.
//!
//! `notify-policy` holds the route tree that decides which contact point
//! receives an alert, and the objects routes refer to:
//!
//! - **Route tree**: build, edit and inspect nested routes, resolving
//!   grouping and timing inherited from ancestors ([`PolicyTree`])
//! - **Route forms**: editable values of one route and a read-only summary
//!   ([`RouteForm`], [`RouteSummary`])
//! - **Mute timings**: named time intervals that silence routes
//!   ([`MuteTiming`])
//! - **Silences**: time-boxed matchers ([`Silence`], [`SilenceDraft`])
//! - **Documents**: the JSON configuration document ([`AlertmanagerConfig`])
//!
//! Every edit returns a new tree; nothing here performs network I/O.
//!
//! # Example
//!
//! ```rust
//! use notify_policy::{PolicyDefaults, PolicyTree, RouteNode, RoutePath};
//! use notify_validation::{parse_matcher_list, HumanDuration};
//!
//! let defaults = PolicyDefaults {
//!     receiver: Some("ops".to_string()),
//!     ..PolicyDefaults::default()
//! };
//! let tree = PolicyTree::build_root_route(defaults, &["ops".to_string()])?;
//!
//! let db = RouteNode::new()
//!     .with_matchers(parse_matcher_list("team=db")?)
//!     .with_group_wait(HumanDuration::from_secs(10));
//! let tree = tree.insert_child_route(&RoutePath::root(), db)?;
//!
//! let timing = tree.resolve_effective_timing(&"0".parse()?)?;
//! assert_eq!(timing.group_wait, HumanDuration::from_secs(10));
//! assert_eq!(timing.repeat_interval.to_string(), "4h");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod form;
pub mod mute_timing;
pub mod route;
pub mod silence;
pub mod tree;

pub use config::{AlertmanagerConfig, MuteCheck, Receiver};
pub use error::{PolicyError, Result};
pub use form::{DurationField, MatcherField, RouteForm, RouteSummary};
pub use mute_timing::{validate_mute_timing_name, MuteTiming, MuteTimingForm};
pub use route::{RouteNode, RoutePath};
pub use silence::{Silence, SilenceDraft};
pub use tree::{EffectiveTiming, PolicyDefaults, PolicyTree, RouteMatch};

#[cfg(test)]
mod tests;
