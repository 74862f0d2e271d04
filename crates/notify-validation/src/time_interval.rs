//! Mute-timing time interval validation and evaluation.
//!
//! A time interval is a set of optional lists (times of day, weekdays, days
//! of month, months, years). Every list entry is a single value or an
//! inclusive `start:end` range. An empty list matches any instant; an
//! instant matches the interval only if every non-empty list matches it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::builder::ValidationBuilder;
use crate::config::{ListVocabulary, MONTH_NAMES, WEEKDAY_NAMES};
use crate::error::ValidationError;

/// Minutes in a day; `24:00` maps here.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

static TIME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{1,2}):([0-9]{2})$").unwrap_or_else(|_| unreachable!()));

static DAY_OF_MONTH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?[0-9]{1,2}$").unwrap_or_else(|_| unreachable!()));

static MONTH_NUMBER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{1,2}$").unwrap_or_else(|_| unreachable!()));

static YEAR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}$").unwrap_or_else(|_| unreachable!()));

/// Split a comma-separated list into `(start, end)` pairs.
///
/// Single values yield `start == end`. Empty text is an empty list; empty
/// entries and ranges with more than two endpoints are rejected.
fn parse_list<T: Copy>(
    text: &str,
    parse_token: impl Fn(&str) -> Option<T>,
    invalid: impl Fn(&str) -> ValidationError,
) -> Result<Vec<(T, T)>, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    text.split(',')
        .map(|entry| {
            let entry = entry.trim();
            let mut bounds = entry.split(':');
            match (bounds.next(), bounds.next(), bounds.next()) {
                (Some(single), None, None) => {
                    let value = parse_token(single.trim()).ok_or_else(|| invalid(entry))?;
                    Ok((value, value))
                }
                (Some(start), Some(end), None) => {
                    let start = parse_token(start.trim()).ok_or_else(|| invalid(entry))?;
                    let end = parse_token(end.trim()).ok_or_else(|| invalid(entry))?;
                    Ok((start, end))
                }
                _ => Err(invalid(entry)),
            }
        })
        .collect()
}

fn parse_day_of_month(token: &str) -> Option<i32> {
    if !DAY_OF_MONTH_REGEX.is_match(token) {
        return None;
    }
    let day: i32 = token.parse().ok()?;
    ((-31..=-1).contains(&day) || (1..=31).contains(&day)).then_some(day)
}

fn parse_year(token: &str) -> Option<i32> {
    if !YEAR_REGEX.is_match(token) {
        return None;
    }
    token.parse().ok()
}

/// Inclusive range test that wraps around when `start > end`
/// (e.g. `saturday:monday` or `november:february`).
fn cyclic_contains(start: u32, end: u32, value: u32) -> bool {
    if start <= end {
        start <= value && value <= end
    } else {
        value >= start || value <= end
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map_or(31, |last| last.day())
}

fn write_range<T: PartialEq>(
    f: &mut fmt::Formatter<'_>,
    start: T,
    end: T,
    name: impl Fn(T) -> String,
) -> fmt::Result {
    if start == end {
        f.write_str(&name(start))
    } else {
        write!(f, "{}:{}", name(start), name(end))
    }
}

/// Implements serde for range types through their text form, the way
/// configuration documents store them (`"monday:friday"`).
macro_rules! text_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                text.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Weekday range, days counted from Sunday (0) to Saturday (6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekdayRange {
    /// First day, days since Sunday.
    pub start: u32,
    /// Last day (inclusive), days since Sunday.
    pub end: u32,
}

impl WeekdayRange {
    /// Returns true if the weekday (days since Sunday) is in range.
    #[must_use]
    pub fn contains(&self, days_from_sunday: u32) -> bool {
        cyclic_contains(self.start, self.end, days_from_sunday)
    }
}

impl fmt::Display for WeekdayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_range(f, self.start, self.end, |day| {
            WEEKDAY_NAMES
                .get(day as usize)
                .map_or_else(|| day.to_string(), |name| (*name).to_string())
        })
    }
}

impl FromStr for WeekdayRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        single_entry(TimeIntervalValidator::default().parse_weekdays(s)?, "weekdays", s)
    }
}

text_serde!(WeekdayRange);

/// Day-of-month range. Negative days count back from the end of the month
/// (`-1` is the last day).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayOfMonthRange {
    /// First day.
    pub start: i32,
    /// Last day (inclusive).
    pub end: i32,
}

impl DayOfMonthRange {
    /// Returns true if `day` falls in range for a month of `month_length` days.
    #[must_use]
    pub fn contains(&self, day: u32, month_length: u32) -> bool {
        let length = i64::from(month_length);
        let resolve = |d: i32| {
            let d = i64::from(d);
            if d < 0 { length + d + 1 } else { d }
        };
        let day = i64::from(day);
        resolve(self.start) <= day && day <= resolve(self.end)
    }
}

impl fmt::Display for DayOfMonthRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_range(f, self.start, self.end, |day| day.to_string())
    }
}

impl FromStr for DayOfMonthRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        single_entry(
            TimeIntervalValidator::default().parse_days_of_month(s)?,
            "days_of_month",
            s,
        )
    }
}

text_serde!(DayOfMonthRange);

/// Month range, months numbered 1-12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthRange {
    /// First month.
    pub start: u32,
    /// Last month (inclusive).
    pub end: u32,
}

impl MonthRange {
    /// Returns true if the month number is in range.
    #[must_use]
    pub fn contains(&self, month: u32) -> bool {
        cyclic_contains(self.start, self.end, month)
    }
}

impl fmt::Display for MonthRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_range(f, self.start, self.end, |month| {
            month
                .checked_sub(1)
                .and_then(|index| MONTH_NAMES.get(index as usize))
                .map_or_else(|| month.to_string(), |name| (*name).to_string())
        })
    }
}

impl FromStr for MonthRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        single_entry(TimeIntervalValidator::default().parse_months(s)?, "months", s)
    }
}

text_serde!(MonthRange);

/// Year range of four-digit years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct YearRange {
    /// First year.
    pub start: i32,
    /// Last year (inclusive).
    pub end: i32,
}

impl YearRange {
    /// Returns true if the year is in range.
    #[must_use]
    pub fn contains(&self, year: i32) -> bool {
        self.start <= year && year <= self.end
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_range(f, self.start, self.end, |year| format!("{year:04}"))
    }
}

impl FromStr for YearRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        single_entry(TimeIntervalValidator::default().parse_years(s)?, "years", s)
    }
}

text_serde!(YearRange);

fn single_entry<T>(mut entries: Vec<T>, field: &str, text: &str) -> Result<T, ValidationError> {
    if entries.len() == 1 {
        if let Some(entry) = entries.pop() {
            return Ok(entry);
        }
    }
    Err(ValidationError::new(
        field,
        crate::error::ValidationErrorKind::InvalidName {
            reason: format!("expected a single list entry, got '{text}'"),
        },
    ))
}

/// A time-of-day range, `[start_time, end_time)` in UTC.
///
/// Both sides are `HH:MM` text as entered; either may be empty. An empty
/// start reads as `00:00` and an empty end as `24:00`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive start, `HH:MM`.
    #[serde(default)]
    pub start_time: String,
    /// Exclusive end, `HH:MM`; `24:00` marks the end of the day.
    #[serde(default)]
    pub end_time: String,
}

impl TimeRange {
    /// Creates a time range from its two endpoints.
    pub fn new(start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self {
            start_time: start_time.into(),
            end_time: end_time.into(),
        }
    }

    /// Returns true if both endpoints are blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.start_time.trim().is_empty() && self.end_time.trim().is_empty()
    }

    /// Returns the range as minutes of the day, `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTime` when the range does not pass
    /// [`validate_time_range`].
    pub fn minutes(&self) -> Result<(u32, u32), ValidationError> {
        let start = parse_time_of_day("start_time", &self.start_time, false)?;
        let end = parse_time_of_day("end_time", &self.end_time, true)?;
        let start = start.unwrap_or(0);
        let end = end.unwrap_or(MINUTES_PER_DAY);

        if start >= end {
            return Err(ValidationError::invalid_time(
                "end_time",
                self.end_time.as_str(),
                "end time must be after start time",
            ));
        }
        Ok((start, end))
    }

    /// Returns true if the minute of the day falls in the range.
    /// Invalid ranges match nothing.
    #[must_use]
    pub fn contains_minute(&self, minute_of_day: u32) -> bool {
        self.minutes()
            .is_ok_and(|(start, end)| start <= minute_of_day && minute_of_day < end)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = if self.start_time.trim().is_empty() {
            "00:00"
        } else {
            self.start_time.trim()
        };
        let end = if self.end_time.trim().is_empty() {
            "24:00"
        } else {
            self.end_time.trim()
        };
        write!(f, "{start} - {end}")
    }
}

/// Parse one `HH:MM` endpoint into minutes of the day.
fn parse_time_of_day(field: &str, text: &str, is_end: bool) -> Result<Option<u32>, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let caps = TIME_REGEX
        .captures(text)
        .ok_or_else(|| ValidationError::invalid_time(field, text, "expected HH:MM"))?;
    let hour: u32 = caps[1]
        .parse()
        .map_err(|_| ValidationError::invalid_time(field, text, "expected HH:MM"))?;
    let minute: u32 = caps[2]
        .parse()
        .map_err(|_| ValidationError::invalid_time(field, text, "expected HH:MM"))?;

    if hour > 24 {
        return Err(ValidationError::invalid_time(field, text, "hour must be between 00 and 24"));
    }
    if minute > 59 {
        return Err(ValidationError::invalid_time(field, text, "minute must be between 00 and 59"));
    }
    if hour == 24 {
        if minute != 0 {
            return Err(ValidationError::invalid_time(field, text, "24:00 is the latest time"));
        }
        if !is_end {
            return Err(ValidationError::invalid_time(
                field,
                text,
                "24:00 is only valid as an end time",
            ));
        }
    }

    Ok(Some(hour * 60 + minute))
}

/// Validate a time range.
///
/// Each endpoint is empty or `HH:MM` with hour 0-24 and minute 0-59. Hour
/// 24 is only allowed as `24:00` and only as the end. When both endpoints
/// are set the start must come before the end.
///
/// # Errors
///
/// Returns `InvalidTime` describing the first bad endpoint.
///
/// # Example
///
/// ```
/// use notify_validation::{validate_time_range, TimeRange};
///
/// assert!(validate_time_range(&TimeRange::new("23:59", "24:00")).is_ok());
/// assert!(validate_time_range(&TimeRange::new("24:00", "00:00")).is_err());
/// ```
pub fn validate_time_range(range: &TimeRange) -> Result<(), ValidationError> {
    let start = parse_time_of_day("start_time", &range.start_time, false)?;
    let end = parse_time_of_day("end_time", &range.end_time, true)?;

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(ValidationError::invalid_time(
                "end_time",
                range.end_time.trim(),
                "end time must be after start time",
            ));
        }
    }
    Ok(())
}

/// Validate a weekday list with the default vocabulary.
///
/// # Errors
///
/// Returns `InvalidWeekday` naming the first bad entry.
pub fn validate_weekday_list(text: &str) -> Result<(), ValidationError> {
    TimeIntervalValidator::default().parse_weekdays(text).map(|_| ())
}

/// Validate a day-of-month list (`1, 14:16, -1`).
///
/// # Errors
///
/// Returns `InvalidDayOfMonth` naming the first bad entry.
pub fn validate_day_of_month_list(text: &str) -> Result<(), ValidationError> {
    TimeIntervalValidator::default()
        .parse_days_of_month(text)
        .map(|_| ())
}

/// Validate a month list with the default vocabulary.
///
/// # Errors
///
/// Returns `InvalidMonth` naming the first bad entry.
pub fn validate_month_list(text: &str) -> Result<(), ValidationError> {
    TimeIntervalValidator::default().parse_months(text).map(|_| ())
}

/// Validate a year list (`2021:2022, 2030`).
///
/// # Errors
///
/// Returns `InvalidYear` naming the first bad entry.
pub fn validate_year_list(text: &str) -> Result<(), ValidationError> {
    TimeIntervalValidator::default().parse_years(text).map(|_| ())
}

/// List validators bound to a token vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeIntervalValidator {
    vocabulary: ListVocabulary,
}

impl TimeIntervalValidator {
    /// Creates a validator with the given vocabulary.
    #[must_use]
    pub const fn new(vocabulary: ListVocabulary) -> Self {
        Self { vocabulary }
    }

    /// Returns the vocabulary in use.
    #[must_use]
    pub const fn vocabulary(&self) -> ListVocabulary {
        self.vocabulary
    }

    /// Parse a weekday list such as `monday:friday, sunday`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidWeekday` naming the first bad entry.
    pub fn parse_weekdays(&self, text: &str) -> Result<Vec<WeekdayRange>, ValidationError> {
        let ranges = parse_list(
            text,
            |token| self.vocabulary.weekday_index(&token.to_lowercase()),
            |entry| ValidationError::invalid_weekday("weekdays", entry),
        )?;
        Ok(ranges
            .into_iter()
            .map(|(start, end)| WeekdayRange { start, end })
            .collect())
    }

    /// Parse a day-of-month list.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDayOfMonth` naming the first bad entry.
    pub fn parse_days_of_month(&self, text: &str) -> Result<Vec<DayOfMonthRange>, ValidationError> {
        let ranges = parse_list(text, parse_day_of_month, |entry| {
            ValidationError::invalid_day_of_month("days_of_month", entry)
        })?;
        Ok(ranges
            .into_iter()
            .map(|(start, end)| DayOfMonthRange { start, end })
            .collect())
    }

    /// Parse a month list of names or numbers (`1:3, may:august`).
    ///
    /// # Errors
    ///
    /// Returns `InvalidMonth` naming the first bad entry.
    pub fn parse_months(&self, text: &str) -> Result<Vec<MonthRange>, ValidationError> {
        let ranges = parse_list(
            text,
            |token| {
                if MONTH_NUMBER_REGEX.is_match(token) {
                    token
                        .parse::<u32>()
                        .ok()
                        .filter(|month| (1..=12).contains(month))
                } else {
                    self.vocabulary.month_number(&token.to_lowercase())
                }
            },
            |entry| ValidationError::invalid_month("months", entry),
        )?;
        Ok(ranges
            .into_iter()
            .map(|(start, end)| MonthRange { start, end })
            .collect())
    }

    /// Parse a year list.
    ///
    /// # Errors
    ///
    /// Returns `InvalidYear` naming the first bad entry.
    pub fn parse_years(&self, text: &str) -> Result<Vec<YearRange>, ValidationError> {
        let ranges = parse_list(text, parse_year, |entry| {
            ValidationError::invalid_year("years", entry)
        })?;
        Ok(ranges
            .into_iter()
            .map(|(start, end)| YearRange { start, end })
            .collect())
    }

    /// Build a [`TimeInterval`] from raw form input, reporting every invalid
    /// field under `time_intervals.<index>.<field>`.
    ///
    /// Time ranges with both endpoints blank are dropped.
    ///
    /// # Errors
    ///
    /// Returns all collected field errors.
    pub fn parse_form(
        &self,
        form: &TimeIntervalForm,
        index: usize,
    ) -> Result<TimeInterval, Vec<ValidationError>> {
        let prefix = format!("time_intervals.{index}");
        let mut builder = ValidationBuilder::new();

        let mut times = Vec::with_capacity(form.times.len());
        for (range_index, range) in form.times.iter().enumerate() {
            if range.is_blank() {
                continue;
            }
            match validate_time_range(range) {
                Ok(()) => times.push(TimeRange::new(range.start_time.trim(), range.end_time.trim())),
                Err(e) => {
                    let field = format!("{prefix}.times.{range_index}.{}", e.field);
                    builder.push(e.with_field(field));
                }
            }
        }

        let weekdays = builder.record(
            self.parse_weekdays(&form.weekdays)
                .map_err(|e| e.with_field(format!("{prefix}.weekdays"))),
        );
        let days_of_month = builder.record(
            self.parse_days_of_month(&form.days_of_month)
                .map_err(|e| e.with_field(format!("{prefix}.days_of_month"))),
        );
        let months = builder.record(
            self.parse_months(&form.months)
                .map_err(|e| e.with_field(format!("{prefix}.months"))),
        );
        let years = builder.record(
            self.parse_years(&form.years)
                .map_err(|e| e.with_field(format!("{prefix}.years"))),
        );

        let interval = TimeInterval {
            times,
            weekdays: weekdays.unwrap_or_default(),
            days_of_month: days_of_month.unwrap_or_default(),
            months: months.unwrap_or_default(),
            years: years.unwrap_or_default(),
        };
        builder.finish_with(interval)
    }
}

/// Raw, unvalidated input for one time interval, as typed into a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeIntervalForm {
    /// Time ranges.
    pub times: Vec<TimeRange>,
    /// Weekday list text.
    pub weekdays: String,
    /// Day-of-month list text.
    pub days_of_month: String,
    /// Month list text.
    pub months: String,
    /// Year list text.
    pub years: String,
}

impl From<&TimeInterval> for TimeIntervalForm {
    fn from(interval: &TimeInterval) -> Self {
        fn join<T: fmt::Display>(items: &[T]) -> String {
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        }

        Self {
            times: interval.times.clone(),
            weekdays: join(&interval.weekdays),
            days_of_month: join(&interval.days_of_month),
            months: join(&interval.months),
            years: join(&interval.years),
        }
    }
}

/// A validated time interval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeInterval {
    /// Times of day, any of which may match.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub times: Vec<TimeRange>,
    /// Weekdays.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub weekdays: Vec<WeekdayRange>,
    /// Days of the month.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub days_of_month: Vec<DayOfMonthRange>,
    /// Months.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub months: Vec<MonthRange>,
    /// Years.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub years: Vec<YearRange>,
}

impl TimeInterval {
    /// Returns true if no field is set, i.e. the interval matches always.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.times.is_empty()
            && self.weekdays.is_empty()
            && self.days_of_month.is_empty()
            && self.months.is_empty()
            && self.years.is_empty()
    }

    /// Validate the time ranges. List fields are typed and always valid.
    ///
    /// # Errors
    ///
    /// Returns the first `InvalidTime` error.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.times.iter().try_for_each(validate_time_range)
    }

    /// Returns true if the instant falls inside this interval.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let minute = instant.hour() * 60 + instant.minute();
        let weekday = instant.weekday().num_days_from_sunday();
        let month_length = days_in_month(instant.year(), instant.month());

        let times = self.times.is_empty() || self.times.iter().any(|r| r.contains_minute(minute));
        let weekdays =
            self.weekdays.is_empty() || self.weekdays.iter().any(|r| r.contains(weekday));
        let days = self.days_of_month.is_empty()
            || self
                .days_of_month
                .iter()
                .any(|r| r.contains(instant.day(), month_length));
        let months =
            self.months.is_empty() || self.months.iter().any(|r| r.contains(instant.month()));
        let years = self.years.is_empty() || self.years.iter().any(|r| r.contains(instant.year()));

        times && weekdays && days && months && years
    }
}
