//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`duration`] - Duration text conversion
//! - [`matchers`] - Label matcher parsing
//! - [`mute_timing`] - Mute timing form validation
//! - [`config`] - Configuration document checks and routing

pub mod config;
pub mod duration;
pub mod matchers;
pub mod mute_timing;

pub use config::ConfigCommand;
pub use duration::DurationCommand;
pub use matchers::MatcherCommand;
pub use mute_timing::MuteTimingCommand;
