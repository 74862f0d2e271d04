//! The Alertmanager configuration document.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use notify_validation::{Labels, TimeIntervalValidator, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{PolicyError, Result};
use crate::mute_timing::{validate_mute_timing_name, MuteTiming};
use crate::route::RouteNode;
use crate::tree::{PolicyTree, RouteMatch};

/// Key some backends wrap the document in.
const WRAPPER_KEY: &str = "alertmanager_config";

/// A contact point. Integration settings are kept as opaque JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receiver {
    /// Unique name referenced by routes.
    pub name: String,
    /// Integration-specific settings.
    #[serde(flatten)]
    pub settings: BTreeMap<String, Value>,
}

impl Receiver {
    /// Creates a receiver with no integrations.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: BTreeMap::new(),
        }
    }
}

/// The notification policy document: root route, mute timings and
/// receivers. Unknown top-level keys are preserved, and so are the keys
/// next to an `alertmanager_config` wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertmanagerConfig {
    /// Root route.
    pub route: RouteNode,
    /// Named mute timings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mute_time_intervals: Vec<MuteTiming>,
    /// Contact points.
    #[serde(default)]
    pub receivers: Vec<Receiver>,
    /// Keys this model does not interpret (templates, inhibit rules, ...).
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
    /// Keys next to the `alertmanager_config` wrapper (`template_files`,
    /// ...) when the document was read wrapped.
    #[serde(skip)]
    pub wrapper: Option<BTreeMap<String, Value>>,
}

/// A route handling an alert, with the mute timings active at the
/// evaluation instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuteCheck {
    /// The handling route.
    #[serde(flatten)]
    pub route: RouteMatch,
    /// Names of the route's mute timings active at the instant.
    pub active_mute_timings: Vec<String>,
}

impl MuteCheck {
    /// Returns true if notifications from this route are muted.
    #[must_use]
    pub fn is_muted(&self) -> bool {
        !self.active_mute_timings.is_empty()
    }
}

impl AlertmanagerConfig {
    /// Creates a document around a root route.
    #[must_use]
    pub fn new(route: RouteNode) -> Self {
        Self {
            route,
            mute_time_intervals: Vec::new(),
            receivers: Vec::new(),
            other: BTreeMap::new(),
            wrapper: None,
        }
    }

    /// Parses a JSON document, bare or wrapped in `alertmanager_config`,
    /// with the default list vocabulary.
    ///
    /// # Errors
    ///
    /// As [`AlertmanagerConfig::from_json_str_with`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_json_str_with(json, &TimeIntervalValidator::default())
    }

    /// Parses a JSON document, bare or wrapped in `alertmanager_config`.
    ///
    /// Weekday and month lists in mute timings are read with `validator`,
    /// so a vocabulary that accepts abbreviations accepts them here too.
    /// They are stored in canonical form.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a weekday or month entry the vocabulary
    /// rejects, and `InvalidDocument` when the JSON does not decode;
    /// durations, matchers and the other time interval fields are validated
    /// while decoding.
    pub fn from_json_str_with(json: &str, validator: &TimeIntervalValidator) -> Result<Self> {
        let (mut value, wrapper) = unwrap_document(serde_json::from_str(json)?);
        canonicalize_mute_timings(&mut value, validator)?;

        let mut config: Self = serde_json::from_value(value)?;
        config.wrapper = wrapper;
        debug!(
            routes = config.route.node_count(),
            mute_timings = config.mute_time_intervals.len(),
            receivers = config.receivers.len(),
            wrapped = config.wrapper.is_some(),
            "decoded configuration document"
        );
        Ok(config)
    }

    /// Reads and parses a JSON document from disk with the default list
    /// vocabulary.
    ///
    /// # Errors
    ///
    /// As [`AlertmanagerConfig::from_path_with`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_path_with(path, &TimeIntervalValidator::default())
    }

    /// Reads and parses a JSON document from disk.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, otherwise as
    /// [`AlertmanagerConfig::from_json_str_with`].
    pub fn from_path_with(path: impl AsRef<Path>, validator: &TimeIntervalValidator) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str_with(&json, validator)?;
        info!(path = %path.display(), "loaded configuration document");
        Ok(config)
    }

    /// Serializes the document as pretty-printed JSON, wrapped again if it
    /// was read wrapped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDocument` if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        let Some(siblings) = &self.wrapper else {
            return Ok(serde_json::to_string_pretty(self)?);
        };
        let mut document: serde_json::Map<String, Value> = siblings
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        document.insert(WRAPPER_KEY.to_string(), serde_json::to_value(self)?);
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Returns the route tree.
    #[must_use]
    pub fn tree(&self) -> PolicyTree {
        PolicyTree::new(self.route.clone())
    }

    /// Looks up a mute timing by name.
    #[must_use]
    pub fn mute_timing(&self, name: &str) -> Option<&MuteTiming> {
        self.mute_time_intervals.iter().find(|t| t.name == name)
    }

    /// Adds a mute timing, or replaces the one named `editing`.
    ///
    /// A renamed timing has its references in the route tree renamed too.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the timing is invalid, its name is taken,
    /// or no timing is named `editing`. The document is unchanged on error.
    pub fn upsert_mute_timing(&mut self, timing: MuteTiming, editing: Option<&str>) -> Result<()> {
        timing.validate()?;
        validate_mute_timing_name(&timing.name, &self.mute_time_intervals, editing)?;

        let Some(old) = editing else {
            info!(name = %timing.name, "added mute timing");
            self.mute_time_intervals.push(timing);
            return Ok(());
        };

        let slot = self
            .mute_time_intervals
            .iter_mut()
            .find(|t| t.name == old)
            .ok_or_else(|| {
                ValidationError::invalid_name("name", format!("no mute timing named '{old}'"))
            })?;
        let renamed = if timing.name == old {
            0
        } else {
            self.route.rename_mute_timing(old, &timing.name)
        };
        info!(name = %timing.name, previous = %old, routes = renamed, "updated mute timing");
        *slot = timing;
        Ok(())
    }

    /// Lists every problem in the document.
    ///
    /// Checks that the root has a receiver, that receiver and mute timing
    /// names are unique, that every mute timing is valid, and that every
    /// route references existing receivers and mute timings.
    #[must_use]
    pub fn problems(&self) -> Vec<PolicyError> {
        let mut problems = Vec::new();

        if self.route.receiver.as_deref().is_none_or(|r| r.trim().is_empty()) {
            problems.push(PolicyError::MissingReceiver);
        }

        let receiver_names = unique_names(
            self.receivers.iter().map(|r| r.name.as_str()),
            "receiver",
            &mut problems,
        );
        let timing_names = unique_names(
            self.mute_time_intervals.iter().map(|t| t.name.as_str()),
            "mute timing",
            &mut problems,
        );

        for timing in &self.mute_time_intervals {
            if let Err(e) = timing.validate() {
                let field = format!("mute_time_intervals.{}.{}", timing.name, e.field);
                problems.push(e.with_field(field).into());
            }
        }

        self.route.walk(&mut |path, node| {
            if let Some(receiver) = &node.receiver {
                if !receiver_names.contains(receiver.as_str()) {
                    problems.push(PolicyError::UnknownReference {
                        kind: "receiver",
                        name: receiver.clone(),
                        path: path.to_string(),
                    });
                }
            }
            for timing in &node.mute_time_intervals {
                if !timing_names.contains(timing.as_str()) {
                    problems.push(PolicyError::UnknownReference {
                        kind: "mute timing",
                        name: timing.clone(),
                        path: path.to_string(),
                    });
                }
            }
        });

        if !problems.is_empty() {
            debug!(problems = problems.len(), "configuration document has problems");
        }
        problems
    }

    /// Checks the document.
    ///
    /// # Errors
    ///
    /// Returns the first problem reported by [`AlertmanagerConfig::problems`].
    pub fn validate(&self) -> Result<()> {
        match self.problems().into_iter().next() {
            Some(problem) => Err(problem),
            None => Ok(()),
        }
    }

    /// Routes an alert and reports which handling routes are muted at
    /// `instant`. Unknown mute timing names are ignored.
    #[must_use]
    pub fn check_muted(&self, labels: &Labels, instant: DateTime<Utc>) -> Vec<MuteCheck> {
        self.tree()
            .route_alert(labels)
            .into_iter()
            .map(|route| {
                let active_mute_timings = route
                    .mute_time_intervals
                    .iter()
                    .filter(|name| {
                        self.mute_timing(name)
                            .is_some_and(|timing| timing.is_active_at(instant))
                    })
                    .cloned()
                    .collect();
                MuteCheck {
                    route,
                    active_mute_timings,
                }
            })
            .collect()
    }
}

/// Splits a wrapped document into its inner document and the wrapper's
/// other keys.
fn unwrap_document(value: Value) -> (Value, Option<BTreeMap<String, Value>>) {
    match value {
        Value::Object(mut map) => match map.remove(WRAPPER_KEY) {
            Some(inner) => (inner, Some(map.into_iter().collect())),
            None => (Value::Object(map), None),
        },
        other => (other, None),
    }
}

/// Rewrites the weekday and month entries of every mute timing in a raw
/// document to canonical text, parsing them with `validator`.
fn canonicalize_mute_timings(document: &mut Value, validator: &TimeIntervalValidator) -> Result<()> {
    let Some(timings) = document
        .get_mut("mute_time_intervals")
        .and_then(Value::as_array_mut)
    else {
        return Ok(());
    };

    for (t, timing) in timings.iter_mut().enumerate() {
        let Some(intervals) = timing.get_mut("time_intervals").and_then(Value::as_array_mut) else {
            continue;
        };
        for (i, interval) in intervals.iter_mut().enumerate() {
            let field = |name: &str| format!("mute_time_intervals.{t}.time_intervals.{i}.{name}");
            canonicalize_list(interval, "weekdays", |text| {
                validator
                    .parse_weekdays(text)
                    .map(|ranges| ranges.iter().map(ToString::to_string).collect())
                    .map_err(|e| e.with_field(field("weekdays")))
            })?;
            canonicalize_list(interval, "months", |text| {
                validator
                    .parse_months(text)
                    .map(|ranges| ranges.iter().map(ToString::to_string).collect())
                    .map_err(|e| e.with_field(field("months")))
            })?;
        }
    }
    Ok(())
}

/// Replaces each string entry of `interval[key]` with its parsed ranges.
/// Anything that is not a list of strings is left for the decoder.
fn canonicalize_list(
    interval: &mut Value,
    key: &str,
    parse: impl Fn(&str) -> std::result::Result<Vec<String>, ValidationError>,
) -> Result<()> {
    let Some(entries) = interval.get_mut(key).and_then(Value::as_array_mut) else {
        return Ok(());
    };
    let mut canonical = Vec::with_capacity(entries.len());
    for entry in entries.iter() {
        match entry.as_str() {
            Some(text) => canonical.extend(parse(text)?.into_iter().map(Value::String)),
            None => canonical.push(entry.clone()),
        }
    }
    *entries = canonical;
    Ok(())
}

/// Collects names, reporting duplicates.
fn unique_names<'a>(
    names: impl Iterator<Item = &'a str>,
    kind: &'static str,
    problems: &mut Vec<PolicyError>,
) -> BTreeSet<&'a str> {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            problems.push(PolicyError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use notify_validation::{ErrorCode, HumanDuration, ListVocabulary, TimeIntervalForm};
    use crate::mute_timing::MuteTimingForm;
    use std::io::Write;

    const DOCUMENT: &str = r#"{
        "route": {
            "receiver": "default",
            "group_by": ["alertname"],
            "group_wait": "30s",
            "group_interval": "5m",
            "repeat_interval": "4h",
            "routes": [
                {
                    "receiver": "db-team",
                    "object_matchers": [["team", "=", "db"]],
                    "mute_time_intervals": ["weekends"],
                    "continue": true
                },
                {
                    "object_matchers": [["severity", "=~", "critical|page"]],
                    "repeat_interval": "1h"
                }
            ]
        },
        "mute_time_intervals": [
            {
                "name": "weekends",
                "time_intervals": [{"weekdays": ["saturday:sunday"]}]
            }
        ],
        "receivers": [
            {"name": "default", "email_configs": [{"to": "ops@example.com"}]},
            {"name": "db-team"}
        ],
        "templates": []
    }"#;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn parse_document() {
        let config = AlertmanagerConfig::from_json_str(DOCUMENT).unwrap();
        assert_eq!(config.route.routes.len(), 2);
        assert_eq!(
            config.route.routes[1].repeat_interval,
            Some(HumanDuration::from_secs(3600))
        );
        assert!(config.route.routes[0].continue_matching);
        assert_eq!(config.receivers[0].settings.len(), 1);
        assert!(config.other.contains_key("templates"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_wrapped_document() {
        let wrapped = format!(r#"{{"template_files": {{}}, "alertmanager_config": {DOCUMENT}}}"#);
        let config = AlertmanagerConfig::from_json_str(&wrapped).unwrap();
        assert_eq!(config.route.receiver.as_deref(), Some("default"));
        assert!(!config.other.contains_key("template_files"));
    }

    #[test]
    fn wrapped_document_keeps_its_siblings() {
        let wrapped = format!(
            r#"{{"template_files": {{"slack.tmpl": "{{{{ define \"x\" }}}}"}}, "alertmanager_config": {DOCUMENT}}}"#
        );
        let config = AlertmanagerConfig::from_json_str(&wrapped).unwrap();
        let json = config.to_json_string().unwrap();

        let value: Value = serde_json::from_str(&json).unwrap();
        assert!(value["template_files"]["slack.tmpl"].is_string());
        assert_eq!(value[WRAPPER_KEY]["route"]["receiver"], "default");
        assert!(value.get("route").is_none());

        let back = AlertmanagerConfig::from_json_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn bare_document_stays_bare() {
        let config = AlertmanagerConfig::from_json_str(DOCUMENT).unwrap();
        assert!(config.wrapper.is_none());
        let value: Value = serde_json::from_str(&config.to_json_string().unwrap()).unwrap();
        assert!(value.get(WRAPPER_KEY).is_none());
        assert_eq!(value["route"]["receiver"], "default");
    }

    #[test]
    fn abbreviated_lists_follow_vocabulary() {
        let json = r#"{
            "route": {"receiver": "default"},
            "mute_time_intervals": [
                {"name": "weekends", "time_intervals": [{"weekdays": ["sat:sun"], "months": ["jan, dec"]}]}
            ],
            "receivers": [{"name": "default"}]
        }"#;

        let err = AlertmanagerConfig::from_json_str(json).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidWeekday);
        match err {
            PolicyError::Validation(e) => {
                assert_eq!(e.field, "mute_time_intervals.0.time_intervals.0.weekdays");
            }
            other => panic!("unexpected error: {other}"),
        }

        let validator = TimeIntervalValidator::new(ListVocabulary::with_abbreviations());
        let config = AlertmanagerConfig::from_json_str_with(json, &validator).unwrap();
        let interval = &config.mute_time_intervals[0].time_intervals[0];
        assert_eq!(interval.weekdays.len(), 1);
        assert_eq!(interval.weekdays[0].to_string(), "saturday:sunday");
        assert_eq!(interval.months.len(), 2);
        assert_eq!(interval.months[1].to_string(), "december");

        // Canonical text reads back under the default vocabulary.
        let back = AlertmanagerConfig::from_json_str(&config.to_json_string().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn round_trip_preserves_document() {
        let config = AlertmanagerConfig::from_json_str(DOCUMENT).unwrap();
        let json = config.to_json_string().unwrap();
        let back = AlertmanagerConfig::from_json_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn bad_values_fail_to_decode() {
        for bad in [
            r#"{"route": {"group_wait": "5x"}}"#,
            r#"{"route": {"object_matchers": [["a", "=~", "("]]}}"#,
            r#"{"route": {}, "mute_time_intervals": [{"name": "m", "time_intervals": [{"days_of_month": ["0"]}]}]}"#,
            "not json",
        ] {
            let err = AlertmanagerConfig::from_json_str(bad).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidDocument, "{bad}");
        }
    }

    #[test]
    fn problems_lists_everything() {
        let json = r#"{
            "route": {
                "routes": [
                    {"receiver": "ghost", "mute_time_intervals": ["never"]}
                ]
            },
            "mute_time_intervals": [
                {"name": "dup"},
                {"name": "dup"},
                {"name": "bad", "time_intervals": [{"times": [{"start_time": "18:00", "end_time": "09:00"}]}]}
            ],
            "receivers": [{"name": "a"}, {"name": "a"}]
        }"#;
        let config = AlertmanagerConfig::from_json_str(json).unwrap();
        let codes: Vec<_> = config.problems().iter().map(PolicyError::code).collect();
        assert_eq!(
            codes,
            vec![
                ErrorCode::MissingReceiver,
                ErrorCode::InvalidName,
                ErrorCode::InvalidName,
                ErrorCode::InvalidTime,
                ErrorCode::UnknownReference,
                ErrorCode::UnknownReference,
            ]
        );
        assert!(matches!(config.validate(), Err(PolicyError::MissingReceiver)));
    }

    #[test]
    fn check_muted_on_weekend() {
        let config = AlertmanagerConfig::from_json_str(DOCUMENT).unwrap();
        let alert = labels(&[("team", "db"), ("severity", "critical")]);

        // 2024-03-09 is a Saturday.
        let saturday = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let checks = config.check_muted(&alert, saturday);
        assert_eq!(checks.len(), 2);
        assert!(checks[0].is_muted());
        assert_eq!(checks[0].active_mute_timings, vec!["weekends".to_string()]);
        assert!(!checks[1].is_muted());
        assert_eq!(
            checks[1].route.timing.repeat_interval,
            HumanDuration::from_secs(3600)
        );

        let monday = Utc.with_ymd_and_hms(2024, 3, 11, 12, 0, 0).unwrap();
        assert!(config.check_muted(&alert, monday).iter().all(|c| !c.is_muted()));
    }

    fn timing(name: &str, weekdays: &str) -> MuteTiming {
        MuteTimingForm {
            name: name.to_string(),
            time_intervals: vec![TimeIntervalForm {
                weekdays: weekdays.to_string(),
                ..TimeIntervalForm::default()
            }],
        }
        .to_mute_timing(&TimeIntervalValidator::default(), &[], None)
        .unwrap()
    }

    #[test]
    fn upsert_adds_new_timing() {
        let mut config = AlertmanagerConfig::from_json_str(DOCUMENT).unwrap();
        config.upsert_mute_timing(timing("nights", "monday"), None).unwrap();
        assert!(config.mute_timing("nights").is_some());
        assert!(config.validate().is_ok());

        let err = config
            .upsert_mute_timing(timing("nights", "tuesday"), None)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidName);
        assert_eq!(config.mute_time_intervals.len(), 2);
    }

    #[test]
    fn renaming_timing_renames_route_references() {
        let mut config = AlertmanagerConfig::from_json_str(DOCUMENT).unwrap();
        config
            .upsert_mute_timing(timing("weekend-days", "saturday:sunday"), Some("weekends"))
            .unwrap();

        assert!(config.mute_timing("weekends").is_none());
        assert_eq!(config.mute_time_intervals.len(), 1);
        assert!(config.route.routes[0].mute_time_intervals.contains("weekend-days"));
        assert!(!config.route.routes[0].mute_time_intervals.contains("weekends"));
        assert!(config.problems().is_empty());
    }

    #[test]
    fn editing_in_place_keeps_references() {
        let mut config = AlertmanagerConfig::from_json_str(DOCUMENT).unwrap();
        config
            .upsert_mute_timing(timing("weekends", "sunday"), Some("weekends"))
            .unwrap();
        assert_eq!(config.mute_time_intervals.len(), 1);
        assert_eq!(
            config.mute_time_intervals[0].summary(),
            timing("weekends", "sunday").summary()
        );
        assert!(config.route.routes[0].mute_time_intervals.contains("weekends"));
    }

    #[test]
    fn editing_unknown_timing_fails() {
        let mut config = AlertmanagerConfig::from_json_str(DOCUMENT).unwrap();
        let before = config.clone();
        let err = config
            .upsert_mute_timing(timing("other", "monday"), Some("missing"))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidName);
        assert_eq!(config, before);
    }

    #[test]
    fn from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOCUMENT.as_bytes()).unwrap();
        let config = AlertmanagerConfig::from_path(file.path()).unwrap();
        assert_eq!(config.receivers.len(), 2);

        let missing = AlertmanagerConfig::from_path("/nonexistent/notify-policy.json");
        assert!(matches!(missing, Err(PolicyError::Io(_))));
    }
}
