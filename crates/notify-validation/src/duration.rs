//! Human-entered duration parsing and formatting.
//!
//! Durations are written as a run of `<integer><unit>` tokens such as
//! `1d4h30m`. The canonical value is a millisecond count.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

const SECOND_MS: u64 = 1000;
const MINUTE_MS: u64 = 60 * SECOND_MS;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;
const WEEK_MS: u64 = 7 * DAY_MS;
const MONTH_MS: u64 = 30 * DAY_MS;
const YEAR_MS: u64 = 365 * DAY_MS;

/// Whole-input shape: one or more tokens, optionally space separated.
static DURATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9]+[yMwdhms]\s*)+$").unwrap_or_else(|_| unreachable!())
});

/// A single `<integer><unit>` token.
static TOKEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+)([yMwdhms])").unwrap_or_else(|_| unreachable!()));

static POSITIVE_INTEGER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap_or_else(|_| unreachable!()));

/// Units accepted in duration text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DurationUnit {
    /// `y`, 365 days.
    #[serde(rename = "y")]
    Year,
    /// `M`, 30 days.
    #[serde(rename = "M")]
    Month,
    /// `w`, 7 days.
    #[serde(rename = "w")]
    Week,
    /// `d`, 24 hours.
    #[serde(rename = "d")]
    Day,
    /// `h`.
    #[serde(rename = "h")]
    Hour,
    /// `m`.
    #[serde(rename = "m")]
    Minute,
    /// `s`.
    #[serde(rename = "s")]
    Second,
}

impl DurationUnit {
    /// Units offered by timing selectors in route forms, smallest first.
    pub const FORM_UNITS: [Self; 5] = [
        Self::Second,
        Self::Minute,
        Self::Hour,
        Self::Day,
        Self::Week,
    ];

    /// Units used when formatting, largest first. Months are never emitted.
    const FORMAT_ORDER: [Self; 6] = [
        Self::Year,
        Self::Week,
        Self::Day,
        Self::Hour,
        Self::Minute,
        Self::Second,
    ];

    /// Returns the unit symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Year => "y",
            Self::Month => "M",
            Self::Week => "w",
            Self::Day => "d",
            Self::Hour => "h",
            Self::Minute => "m",
            Self::Second => "s",
        }
    }

    /// Length of one unit in milliseconds.
    #[must_use]
    pub const fn millis(&self) -> u64 {
        match self {
            Self::Year => YEAR_MS,
            Self::Month => MONTH_MS,
            Self::Week => WEEK_MS,
            Self::Day => DAY_MS,
            Self::Hour => HOUR_MS,
            Self::Minute => MINUTE_MS,
            Self::Second => SECOND_MS,
        }
    }

    /// Looks up a unit by its symbol. Symbols are case sensitive (`m` vs `M`).
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "y" => Some(Self::Year),
            "M" => Some(Self::Month),
            "w" => Some(Self::Week),
            "d" => Some(Self::Day),
            "h" => Some(Self::Hour),
            "m" => Some(Self::Minute),
            "s" => Some(Self::Second),
            _ => None,
        }
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for DurationUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_symbol(s.trim()).ok_or_else(|| {
            ValidationError::invalid_duration("duration_unit", s, "unknown unit")
        })
    }
}

/// Parse duration text into milliseconds.
///
/// Accepts `<integer><unit>` tokens with units `y`, `M`, `w`, `d`, `h`,
/// `m` and `s`, e.g. `1d4h30m` or `1d 4h`. Each unit may appear once.
/// The literal `0` is zero.
///
/// # Errors
///
/// Returns an `InvalidDuration` error for empty text, unknown or missing
/// units, repeated units, and values that overflow.
///
/// # Example
///
/// ```
/// use notify_validation::parse_duration;
///
/// assert_eq!(parse_duration("1m30s")?, 90_000);
/// assert_eq!(parse_duration("0")?, 0);
/// assert!(parse_duration("5x").is_err());
/// # Ok::<(), notify_validation::ValidationError>(())
/// ```
pub fn parse_duration(text: &str) -> Result<u64, ValidationError> {
    let field = "duration";
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::invalid_duration(
            field,
            text,
            "duration cannot be empty",
        ));
    }

    if trimmed == "0" {
        return Ok(0);
    }

    if !DURATION_REGEX.is_match(trimmed) {
        return Err(ValidationError::invalid_duration(
            field,
            text,
            "expected <integer><unit> tokens such as 1d4h30m",
        ));
    }

    let mut seen: Vec<DurationUnit> = Vec::with_capacity(7);
    let mut total: u64 = 0;

    for caps in TOKEN_REGEX.captures_iter(trimmed) {
        let unit = DurationUnit::from_symbol(&caps[2])
            .ok_or_else(|| ValidationError::invalid_duration(field, text, "unknown unit"))?;

        if seen.contains(&unit) {
            return Err(ValidationError::invalid_duration(
                field,
                text,
                format!("unit '{unit}' appears more than once"),
            ));
        }
        seen.push(unit);

        let overflow = || ValidationError::invalid_duration(field, text, "duration is too large");
        let value: u64 = caps[1].parse().map_err(|_| overflow())?;
        let part = value.checked_mul(unit.millis()).ok_or_else(overflow)?;
        total = total.checked_add(part).ok_or_else(overflow)?;
    }

    Ok(total)
}

/// Format milliseconds as duration text.
///
/// Greedy from years down to seconds with zero components omitted, so
/// `parse_duration(&format_duration(ms)) == ms` for whole seconds.
/// Sub-second remainders are dropped and zero formats as `0s`.
#[must_use]
pub fn format_duration(millis: u64) -> String {
    let mut remaining = millis - millis % SECOND_MS;
    if remaining == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    for unit in DurationUnit::FORMAT_ORDER {
        let count = remaining / unit.millis();
        if count > 0 {
            out.push_str(&count.to_string());
            out.push_str(unit.symbol());
            remaining -= count * unit.millis();
        }
    }
    out
}

/// Validate a timing value entered as a separate number box plus unit
/// selector.
///
/// An empty value means "inherit from the parent policy" and yields `None`.
///
/// # Errors
///
/// Returns `InvalidDuration` unless the value is made only of digits.
pub fn parse_duration_value(
    value: &str,
    unit: DurationUnit,
) -> Result<Option<HumanDuration>, ValidationError> {
    let field = "duration_value";
    let value = value.trim();

    if value.is_empty() {
        return Ok(None);
    }

    if !POSITIVE_INTEGER_REGEX.is_match(value) {
        return Err(ValidationError::invalid_duration(
            field,
            value,
            "must be a positive integer",
        ));
    }

    let count: u64 = value
        .parse()
        .map_err(|_| ValidationError::invalid_duration(field, value, "duration is too large"))?;
    let millis = count
        .checked_mul(unit.millis())
        .ok_or_else(|| ValidationError::invalid_duration(field, value, "duration is too large"))?;

    Ok(Some(HumanDuration::from_millis(millis)))
}

/// A duration parsed from human text, stored as milliseconds.
///
/// Serializes as its formatted text (`"5m"`), the way notification policy
/// documents store timings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HumanDuration(u64);

impl HumanDuration {
    /// The zero duration.
    pub const ZERO: Self = Self(0);

    /// Creates a duration from milliseconds.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Creates a duration from seconds.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(SECOND_MS))
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Returns true for the zero duration.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Converts to a [`std::time::Duration`].
    #[must_use]
    pub const fn to_std(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.0)
    }

    /// Converts to a chrono delta, saturating at `i64::MAX` milliseconds.
    #[must_use]
    pub fn to_chrono(&self) -> chrono::TimeDelta {
        let millis = i64::try_from(self.0).unwrap_or(i64::MAX);
        chrono::TimeDelta::try_milliseconds(millis).unwrap_or(chrono::TimeDelta::MAX)
    }

    /// Splits the duration into the largest form unit that divides it
    /// evenly, e.g. 300000 ms becomes `(5, Minute)`.
    #[must_use]
    pub fn split(&self) -> (u64, DurationUnit) {
        let secs_aligned = self.0 - self.0 % SECOND_MS;
        if secs_aligned == 0 {
            return (0, DurationUnit::Second);
        }
        DurationUnit::FORM_UNITS
            .iter()
            .rev()
            .find(|unit| secs_aligned % unit.millis() == 0)
            .map_or((secs_aligned / SECOND_MS, DurationUnit::Second), |unit| {
                (secs_aligned / unit.millis(), *unit)
            })
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_duration(self.0))
    }
}

impl FromStr for HumanDuration {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration(s).map(Self)
    }
}

impl From<HumanDuration> for std::time::Duration {
    fn from(value: HumanDuration) -> Self {
        value.to_std()
    }
}

impl Serialize for HumanDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use test_case::test_case;

    #[test_case("30s", 30_000 ; "seconds")]
    #[test_case("5m", 300_000 ; "minutes")]
    #[test_case("4h", 14_400_000 ; "hours")]
    #[test_case("1d4h30m", 102_600_000 ; "compound")]
    #[test_case("1w", 604_800_000 ; "week")]
    #[test_case("1y", 31_536_000_000 ; "year")]
    #[test_case("1M", 2_592_000_000 ; "month")]
    #[test_case("1d 2h", 93_600_000 ; "space separated")]
    #[test_case("  10m ", 600_000 ; "surrounding whitespace")]
    #[test_case("0s", 0 ; "zero with unit")]
    fn test_parse_valid(input: &str, expected: u64) {
        assert_eq!(parse_duration(input), Ok(expected));
    }

    #[test]
    fn test_parse_literal_zero() {
        assert_eq!(parse_duration("0"), Ok(0));
    }

    #[test_case("" ; "empty")]
    #[test_case("   " ; "blank")]
    #[test_case("5x" ; "unknown unit")]
    #[test_case("5" ; "missing unit")]
    #[test_case("h" ; "missing value")]
    #[test_case("-5m" ; "negative")]
    #[test_case("1.5h" ; "fraction")]
    #[test_case("1h1h" ; "repeated unit")]
    #[test_case("1 h" ; "space inside token")]
    #[test_case("99999999999999999999s" ; "overflow")]
    fn test_parse_invalid(input: &str) {
        let err = parse_duration(input).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidDuration);
    }

    #[test]
    fn test_format() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(999), "0s");
        assert_eq!(format_duration(90_000), "1m30s");
        assert_eq!(format_duration(102_600_000), "1d4h30m");
        assert_eq!(format_duration(8 * DAY_MS), "1w1d");
        assert_eq!(format_duration(YEAR_MS + HOUR_MS), "1y1h");
        assert_eq!(format_duration(3_600_500), "1h");
    }

    #[test]
    fn test_month_input_formats_without_month_unit() {
        let ms = parse_duration("1M").unwrap();
        assert_eq!(format_duration(ms), "4w2d");
    }

    #[test]
    fn test_unit_symbols_are_case_sensitive() {
        assert_eq!(DurationUnit::from_symbol("m"), Some(DurationUnit::Minute));
        assert_eq!(DurationUnit::from_symbol("M"), Some(DurationUnit::Month));
        assert_eq!(DurationUnit::from_symbol("H"), None);
    }

    #[test]
    fn test_parse_duration_value() {
        assert_eq!(parse_duration_value("", DurationUnit::Minute), Ok(None));
        assert_eq!(
            parse_duration_value("5", DurationUnit::Minute),
            Ok(Some(HumanDuration::from_millis(300_000)))
        );
        assert!(parse_duration_value("-5", DurationUnit::Minute).is_err());
        assert!(parse_duration_value("5m", DurationUnit::Minute).is_err());
        assert!(parse_duration_value("1.5", DurationUnit::Hour).is_err());
    }

    #[test]
    fn test_split() {
        assert_eq!(HumanDuration::ZERO.split(), (0, DurationUnit::Second));
        assert_eq!(HumanDuration::from_secs(300).split(), (5, DurationUnit::Minute));
        assert_eq!(HumanDuration::from_secs(90).split(), (90, DurationUnit::Second));
        assert_eq!(HumanDuration::from_secs(4 * 3600).split(), (4, DurationUnit::Hour));
        assert_eq!(HumanDuration::from_secs(14 * 86_400).split(), (2, DurationUnit::Week));
    }

    #[test]
    fn test_human_duration_serde() {
        let d: HumanDuration = serde_json::from_str("\"1h30m\"").unwrap();
        assert_eq!(d.as_millis(), 5_400_000);
        assert_eq!(serde_json::to_string(&d).unwrap(), "\"1h30m\"");
        assert!(serde_json::from_str::<HumanDuration>("\"soon\"").is_err());
    }

    #[test]
    fn test_human_duration_conversions() {
        let d = HumanDuration::from_secs(90);
        assert_eq!(d.to_std(), std::time::Duration::from_secs(90));
        assert_eq!(d.to_chrono(), chrono::TimeDelta::seconds(90));
        assert!(HumanDuration::ZERO.is_zero());
    }
}
