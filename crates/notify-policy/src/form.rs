//! Editable form values for a single route, and a read-only summary.

use std::collections::BTreeSet;

use notify_validation::{
    matchers_to_display_string, parse_duration_value, DurationUnit, HumanDuration, MatchOperator,
    Matcher, ValidationBuilder, ValidationError,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::route::RouteNode;

/// Shown for values a route does not set.
pub const UNSET: &str = "-";

/// One matcher row of a route form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherField {
    /// Label name.
    pub name: String,
    /// Operator symbol (`=`, `!=`, `=~`, `!~`).
    pub operator: String,
    /// Value or regular expression.
    pub value: String,
}

impl From<&Matcher> for MatcherField {
    fn from(matcher: &Matcher) -> Self {
        Self {
            name: matcher.name.clone(),
            operator: matcher.operator.symbol().to_string(),
            value: matcher.value.clone(),
        }
    }
}

/// A timing input split into a number box and a unit selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationField {
    /// Digits as typed; empty means inherited.
    pub value: String,
    /// Selected unit.
    pub unit: DurationUnit,
}

impl DurationField {
    /// An empty field with the given unit preselected.
    #[must_use]
    pub fn empty(unit: DurationUnit) -> Self {
        Self {
            value: String::new(),
            unit,
        }
    }

    fn from_duration(duration: Option<HumanDuration>, default_unit: DurationUnit) -> Self {
        match duration {
            Some(d) => {
                let (count, unit) = d.split();
                Self {
                    value: count.to_string(),
                    unit,
                }
            }
            None => Self::empty(default_unit),
        }
    }

    fn parse(&self, field: &str) -> Result<Option<HumanDuration>, ValidationError> {
        parse_duration_value(&self.value, self.unit).map_err(|e| e.with_field(field))
    }
}

/// Editable values of one route.
///
/// Grouping and timing only apply when their override toggle is on;
/// otherwise the route inherits them from its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteForm {
    /// Contact point; empty inherits.
    pub receiver: String,
    /// Matcher rows.
    pub matchers: Vec<MatcherField>,
    /// Keep matching later siblings.
    pub continue_matching: bool,
    /// Whether `group_by` is set on this route.
    pub override_grouping: bool,
    /// Grouping labels, used when `override_grouping` is on.
    pub group_by: Vec<String>,
    /// Whether timings are set on this route.
    pub override_timings: bool,
    /// `group_wait` input.
    pub group_wait: DurationField,
    /// `group_interval` input.
    pub group_interval: DurationField,
    /// `repeat_interval` input.
    pub repeat_interval: DurationField,
    /// Selected mute timing names.
    pub mute_time_intervals: Vec<String>,
}

impl Default for RouteForm {
    fn default() -> Self {
        Self {
            receiver: String::new(),
            matchers: Vec::new(),
            continue_matching: false,
            override_grouping: false,
            group_by: Vec::new(),
            override_timings: false,
            group_wait: DurationField::empty(DurationUnit::Second),
            group_interval: DurationField::empty(DurationUnit::Minute),
            repeat_interval: DurationField::empty(DurationUnit::Hour),
            mute_time_intervals: Vec::new(),
        }
    }
}

impl From<&RouteNode> for RouteForm {
    fn from(node: &RouteNode) -> Self {
        Self {
            receiver: node.receiver.clone().unwrap_or_default(),
            matchers: node.matchers.iter().map(MatcherField::from).collect(),
            continue_matching: node.continue_matching,
            override_grouping: node.group_by.is_some(),
            group_by: node.group_by.clone().unwrap_or_default(),
            override_timings: node.overrides_timings(),
            group_wait: DurationField::from_duration(node.group_wait, DurationUnit::Second),
            group_interval: DurationField::from_duration(node.group_interval, DurationUnit::Minute),
            repeat_interval: DurationField::from_duration(node.repeat_interval, DurationUnit::Hour),
            mute_time_intervals: node.mute_time_intervals.iter().cloned().collect(),
        }
    }
}

impl RouteForm {
    /// Converts the form into a route without children, reporting every
    /// invalid field.
    ///
    /// Matcher errors are reported under `object_matchers.<index>`.
    ///
    /// # Errors
    ///
    /// Returns all collected field errors.
    pub fn to_route(&self) -> Result<RouteNode, Vec<ValidationError>> {
        let mut builder = ValidationBuilder::new();

        let mut matchers = Vec::with_capacity(self.matchers.len());
        for (index, row) in self.matchers.iter().enumerate() {
            let field = format!("object_matchers.{index}");
            let parsed = row
                .operator
                .parse::<MatchOperator>()
                .and_then(|op| {
                    if row.value.trim().is_empty() {
                        return Err(ValidationError::invalid_name(&field, "field is required"));
                    }
                    Matcher::new(row.name.trim(), op, row.value.as_str())
                })
                .map_err(|e| e.with_field(field));
            if let Some(matcher) = builder.record(parsed) {
                matchers.push(matcher);
            }
        }

        let group_by = self.override_grouping.then(|| {
            self.group_by
                .iter()
                .map(|label| label.trim().to_string())
                .filter(|label| !label.is_empty())
                .collect::<Vec<_>>()
        });

        let (group_wait, group_interval, repeat_interval) = if self.override_timings {
            (
                builder.record(self.group_wait.parse("group_wait")).flatten(),
                builder.record(self.group_interval.parse("group_interval")).flatten(),
                builder.record(self.repeat_interval.parse("repeat_interval")).flatten(),
            )
        } else {
            (None, None, None)
        };

        let receiver = Some(self.receiver.trim())
            .filter(|r| !r.is_empty())
            .map(ToString::to_string);

        let route = RouteNode {
            receiver,
            matchers,
            continue_matching: self.continue_matching,
            group_by,
            group_wait,
            group_interval,
            repeat_interval,
            mute_time_intervals: self
                .mute_time_intervals
                .iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect::<BTreeSet<_>>(),
            ..RouteNode::default()
        };

        if builder.has_errors() {
            debug!(errors = builder.error_count(), "route form has invalid fields");
        }
        builder.finish_with(route)
    }
}

/// Read-only rendering of a route's own settings, `-` for unset values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSummary {
    /// Receiver name.
    pub receiver: String,
    /// Matchers as list text.
    pub matchers: String,
    /// Grouping labels, comma separated.
    pub group_by: String,
    /// `group_wait` text.
    pub group_wait: String,
    /// `group_interval` text.
    pub group_interval: String,
    /// `repeat_interval` text.
    pub repeat_interval: String,
    /// Mute timing names, comma separated.
    pub mute_timings: String,
    /// `continue` flag.
    pub continue_matching: bool,
}

fn or_unset(text: String) -> String {
    if text.is_empty() { UNSET.to_string() } else { text }
}

impl From<&RouteNode> for RouteSummary {
    fn from(node: &RouteNode) -> Self {
        let duration = |d: Option<HumanDuration>| d.map_or_else(|| UNSET.to_string(), |d| d.to_string());
        Self {
            receiver: or_unset(node.receiver.clone().unwrap_or_default()),
            matchers: or_unset(matchers_to_display_string(&node.matchers)),
            group_by: or_unset(node.group_by.as_deref().unwrap_or_default().join(", ")),
            group_wait: duration(node.group_wait),
            group_interval: duration(node.group_interval),
            repeat_interval: duration(node.repeat_interval),
            mute_timings: or_unset(
                node.mute_time_intervals
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            continue_matching: node.continue_matching,
        }
    }
}
