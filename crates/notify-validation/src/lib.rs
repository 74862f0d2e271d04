//! Input validation for notification policy configuration.
//!
//! Every value a user types into a notification policy, mute timing or
//! silence form passes through one of these validators before it is
//! assembled into a configuration document:
//!
//! - **Durations**: `1d4h30m` style text to milliseconds and back
//!   ([`parse_duration`], [`format_duration`], [`HumanDuration`])
//! - **Mute timing intervals**: weekday, day-of-month, month, year and
//!   time-of-day lists ([`TimeIntervalValidator`], [`TimeInterval`])
//! - **Label matchers**: `name=value` lists ([`parse_matcher_list`])
//!
//! Errors are field-scoped and carry a stable [`ErrorCode`] so they can be
//! shown next to the offending input.
//!
//! # Durations
//!
//! ```
//! use notify_validation::{format_duration, parse_duration};
//!
//! let ms = parse_duration("1d4h30m")?;
//! assert_eq!(format_duration(ms), "1d4h30m");
//! # Ok::<(), notify_validation::ValidationError>(())
//! ```
//!
//! # Time intervals
//!
//! ```
//! use notify_validation::{validate_day_of_month_list, ErrorCode};
//!
//! assert!(validate_day_of_month_list("1,14:16,-1").is_ok());
//! let err = validate_day_of_month_list("0").unwrap_err();
//! assert_eq!(err.code(), ErrorCode::InvalidDayOfMonth);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod duration;
mod error;
mod matchers;
mod time_interval;

pub use builder::ValidationBuilder;
pub use config::{
    ListVocabulary, ValidatorConfig, MONTH_ABBREVIATIONS, MONTH_NAMES, WEEKDAY_ABBREVIATIONS,
    WEEKDAY_NAMES,
};
pub use duration::{
    format_duration, parse_duration, parse_duration_value, DurationUnit, HumanDuration,
};
pub use error::{ErrorCode, ValidationError, ValidationErrorKind};
pub use matchers::{
    find_matching, matcher_to_display_string, matchers_match, matchers_to_display_string,
    parse_matcher, parse_matcher_list, MatchOperator, Matcher,
};
pub use time_interval::{
    validate_day_of_month_list, validate_month_list, validate_time_range, validate_weekday_list,
    validate_year_list, DayOfMonthRange, MonthRange, TimeInterval, TimeIntervalForm,
    TimeIntervalValidator, TimeRange, WeekdayRange, YearRange, MINUTES_PER_DAY,
};

/// Label set of an alert, ordered by name.
pub type Labels = std::collections::BTreeMap<String, String>;

#[cfg(test)]
mod tests;
