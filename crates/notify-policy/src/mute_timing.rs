//! Named mute timings referenced from routes.

use chrono::{DateTime, Utc};
use notify_validation::{
    TimeInterval, TimeIntervalForm, TimeIntervalValidator, ValidationBuilder, ValidationError,
};
use serde::{Deserialize, Serialize};

/// Longest accepted mute timing name.
pub const MAX_MUTE_TIMING_NAME_LENGTH: usize = 256;

const ALL: &str = "All";

/// A named set of time intervals during which routes referencing it stay
/// silent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuteTiming {
    /// Unique name.
    pub name: String,
    /// Intervals, any of which activates the timing.
    #[serde(default)]
    pub time_intervals: Vec<TimeInterval>,
}

impl MuteTiming {
    /// Creates a mute timing.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` for an empty name and `InvalidTime` for a bad
    /// time range.
    pub fn new(
        name: impl Into<String>,
        time_intervals: Vec<TimeInterval>,
    ) -> Result<Self, ValidationError> {
        let timing = Self {
            name: name.into(),
            time_intervals,
        };
        timing.validate()?;
        Ok(timing)
    }

    /// Checks the name and every interval.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::invalid_name("name", "field is required"));
        }
        for (index, interval) in self.time_intervals.iter().enumerate() {
            interval.validate().map_err(|e| {
                let field = format!("time_intervals.{index}.{}", e.field);
                e.with_field(field)
            })?;
        }
        Ok(())
    }

    /// Returns true if any interval contains `instant`.
    #[must_use]
    pub fn is_active_at(&self, instant: DateTime<Utc>) -> bool {
        self.time_intervals.iter().any(|i| i.contains(instant))
    }

    /// One display line per interval, e.g.
    /// `Times: 09:00 - 17:00 Weekdays: monday:friday Days of month: All Months: All Years: All`.
    #[must_use]
    pub fn summary(&self) -> Vec<String> {
        self.time_intervals.iter().map(interval_summary).collect()
    }
}

fn join_or_all<T: ToString>(items: &[T]) -> String {
    if items.is_empty() {
        ALL.to_string()
    } else {
        items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn interval_summary(interval: &TimeInterval) -> String {
    format!(
        "Times: {} Weekdays: {} Days of month: {} Months: {} Years: {}",
        join_or_all(&interval.times),
        join_or_all(&interval.weekdays),
        join_or_all(&interval.days_of_month),
        join_or_all(&interval.months),
        join_or_all(&interval.years),
    )
}

/// Validate a mute timing name.
///
/// The name must be non-empty, at most [`MAX_MUTE_TIMING_NAME_LENGTH`]
/// bytes, and not used by another timing in `existing`. When `editing` names
/// the timing being edited, keeping that name is allowed.
///
/// # Errors
///
/// Returns `InvalidName` describing the problem.
pub fn validate_mute_timing_name<'a>(
    name: &str,
    existing: impl IntoIterator<Item = &'a MuteTiming>,
    editing: Option<&str>,
) -> Result<(), ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::invalid_name("name", "field is required"));
    }
    if name.len() > MAX_MUTE_TIMING_NAME_LENGTH {
        return Err(ValidationError::invalid_name(
            "name",
            format!("must be at most {MAX_MUTE_TIMING_NAME_LENGTH} characters"),
        ));
    }
    if editing == Some(name) {
        return Ok(());
    }
    if existing.into_iter().any(|timing| timing.name == name) {
        return Err(ValidationError::invalid_name(
            "name",
            format!("a mute timing named '{name}' already exists"),
        ));
    }
    Ok(())
}

/// Raw input of the mute timing editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MuteTimingForm {
    /// Name as typed.
    pub name: String,
    /// One entry per interval.
    pub time_intervals: Vec<TimeIntervalForm>,
}

impl From<&MuteTiming> for MuteTimingForm {
    fn from(timing: &MuteTiming) -> Self {
        Self {
            name: timing.name.clone(),
            time_intervals: timing
                .time_intervals
                .iter()
                .map(TimeIntervalForm::from)
                .collect(),
        }
    }
}

impl MuteTimingForm {
    /// Converts the form into a mute timing, reporting every invalid field.
    ///
    /// # Errors
    ///
    /// Returns all collected field errors.
    pub fn to_mute_timing(
        &self,
        validator: &TimeIntervalValidator,
        existing: &[MuteTiming],
        editing: Option<&str>,
    ) -> Result<MuteTiming, Vec<ValidationError>> {
        let mut builder = ValidationBuilder::new();
        builder.record(validate_mute_timing_name(&self.name, existing, editing));

        let mut time_intervals = Vec::with_capacity(self.time_intervals.len());
        for (index, form) in self.time_intervals.iter().enumerate() {
            match validator.parse_form(form, index) {
                Ok(interval) => time_intervals.push(interval),
                Err(errors) => errors.into_iter().for_each(|e| builder.push(e)),
            }
        }

        builder.finish_with(MuteTiming {
            name: self.name.trim().to_string(),
            time_intervals,
        })
    }
}
