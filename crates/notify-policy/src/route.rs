//! Route nodes and the paths that address them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use notify_validation::{parse_matcher, HumanDuration, MatchOperator, Matcher, ValidationError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::PolicyError;

/// Index path from the root to a route node.
///
/// The root is the empty path. `[0, 2]` is the third child of the first
/// child; its text form is `0.2`. The root's text form is `root`, and the
/// empty string also parses as the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutePath(Vec<usize>);

impl RoutePath {
    /// The path of the root route.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Creates a path from child indices.
    #[must_use]
    pub fn new(indices: impl Into<Vec<usize>>) -> Self {
        Self(indices.into())
    }

    /// Returns true for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the child indices.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Number of edges from the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Returns the path of this node's `index`-th child.
    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Splits off the last index, returning the parent path and the index
    /// of this node among its siblings. The root has no parent.
    #[must_use]
    pub fn split_last(&self) -> Option<(Self, usize)> {
        self.0
            .split_last()
            .map(|(last, parent)| (Self(parent.to_vec()), *last))
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("root");
        }
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

impl FromStr for RoutePath {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "root" {
            return Ok(Self::root());
        }
        s.split('.')
            .map(|part| part.parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
            .map_err(|_| PolicyError::path_not_found(s))
    }
}

impl From<Vec<usize>> for RoutePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl Serialize for RoutePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RoutePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// A node of the notification policy tree.
///
/// `None` in an optional field means "inherited from the parent policy".
/// Field names match the Alertmanager configuration document. When
/// decoding, `object_matchers`, `matchers` (`["team=\"db\""]`) and the
/// legacy `match` / `match_re` maps are merged into [`RouteNode::matchers`];
/// they are written back as `object_matchers`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RouteDocument")]
pub struct RouteNode {
    /// Contact point notified for alerts handled by this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,

    /// Label constraints an alert must satisfy to enter this node.
    #[serde(
        default,
        rename = "object_matchers",
        with = "object_matchers",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub matchers: Vec<Matcher>,

    /// Keep evaluating later siblings after this node matched.
    #[serde(default, rename = "continue", skip_serializing_if = "is_false")]
    pub continue_matching: bool,

    /// Labels used to group alerts into notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,

    /// Wait before the first notification of a new group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_wait: Option<HumanDuration>,

    /// Wait before notifying about alerts added to an existing group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_interval: Option<HumanDuration>,

    /// Wait before re-sending a notification that already succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_interval: Option<HumanDuration>,

    /// Names of mute timings that silence this node while active.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub mute_time_intervals: BTreeSet<String>,

    /// Child routes, evaluated in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<RouteNode>,

    /// Keys this model does not interpret (`active_time_intervals`, ...).
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// A route as it appears in a document, before its matcher encodings are
/// merged.
#[derive(Deserialize)]
struct RouteDocument {
    #[serde(default)]
    receiver: Option<String>,
    #[serde(default, deserialize_with = "object_matchers::deserialize")]
    object_matchers: Vec<Matcher>,
    #[serde(default)]
    matchers: Vec<String>,
    #[serde(default, rename = "match")]
    match_equal: BTreeMap<String, String>,
    #[serde(default)]
    match_re: BTreeMap<String, String>,
    #[serde(default, rename = "continue")]
    continue_matching: bool,
    #[serde(default)]
    group_by: Option<Vec<String>>,
    #[serde(default)]
    group_wait: Option<HumanDuration>,
    #[serde(default)]
    group_interval: Option<HumanDuration>,
    #[serde(default)]
    repeat_interval: Option<HumanDuration>,
    #[serde(default)]
    mute_time_intervals: BTreeSet<String>,
    #[serde(default)]
    routes: Vec<RouteNode>,
    #[serde(flatten)]
    other: BTreeMap<String, Value>,
}

impl TryFrom<RouteDocument> for RouteNode {
    type Error = ValidationError;

    fn try_from(doc: RouteDocument) -> Result<Self, Self::Error> {
        let mut matchers = doc.object_matchers;
        for term in &doc.matchers {
            matchers.push(parse_matcher(term)?);
        }
        for (name, value) in doc.match_equal {
            matchers.push(Matcher::new(name, MatchOperator::Equal, value)?);
        }
        for (name, value) in doc.match_re {
            matchers.push(Matcher::new(name, MatchOperator::Regex, value)?);
        }

        Ok(Self {
            receiver: doc.receiver,
            matchers,
            continue_matching: doc.continue_matching,
            group_by: doc.group_by,
            group_wait: doc.group_wait,
            group_interval: doc.group_interval,
            repeat_interval: doc.repeat_interval,
            mute_time_intervals: doc.mute_time_intervals,
            routes: doc.routes,
            other: doc.other,
        })
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

impl RouteNode {
    /// Creates a node that inherits everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the receiver.
    #[must_use]
    pub fn with_receiver(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = Some(receiver.into());
        self
    }

    /// Sets the matchers.
    #[must_use]
    pub fn with_matchers(mut self, matchers: Vec<Matcher>) -> Self {
        self.matchers = matchers;
        self
    }

    /// Sets the `continue` flag.
    #[must_use]
    pub fn with_continue(mut self, continue_matching: bool) -> Self {
        self.continue_matching = continue_matching;
        self
    }

    /// Overrides the grouping labels.
    #[must_use]
    pub fn with_group_by<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Overrides `group_wait`.
    #[must_use]
    pub fn with_group_wait(mut self, duration: HumanDuration) -> Self {
        self.group_wait = Some(duration);
        self
    }

    /// Overrides `group_interval`.
    #[must_use]
    pub fn with_group_interval(mut self, duration: HumanDuration) -> Self {
        self.group_interval = Some(duration);
        self
    }

    /// Overrides `repeat_interval`.
    #[must_use]
    pub fn with_repeat_interval(mut self, duration: HumanDuration) -> Self {
        self.repeat_interval = Some(duration);
        self
    }

    /// Adds a mute timing reference.
    #[must_use]
    pub fn with_mute_timing(mut self, name: impl Into<String>) -> Self {
        self.mute_time_intervals.insert(name.into());
        self
    }

    /// Appends a child route.
    #[must_use]
    pub fn with_child(mut self, child: RouteNode) -> Self {
        self.routes.push(child);
        self
    }

    /// Returns true if any timing field is set on this node.
    #[must_use]
    pub fn overrides_timings(&self) -> bool {
        self.group_wait.is_some() || self.group_interval.is_some() || self.repeat_interval.is_some()
    }

    /// Visits this node and every descendant in depth-first pre-order,
    /// passing each node's path relative to this node.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&RoutePath, &'a RouteNode)) {
        fn go<'a>(
            node: &'a RouteNode,
            path: &RoutePath,
            visit: &mut impl FnMut(&RoutePath, &'a RouteNode),
        ) {
            visit(path, node);
            for (index, child) in node.routes.iter().enumerate() {
                go(child, &path.child(index), visit);
            }
        }
        go(self, &RoutePath::root(), visit);
    }

    /// Counts this node and all descendants.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.routes.iter().map(RouteNode::node_count).sum::<usize>()
    }

    /// Replaces the mute timing reference `old` with `new` in this node and
    /// every descendant, returning how many nodes changed.
    pub fn rename_mute_timing(&mut self, old: &str, new: &str) -> usize {
        let mut renamed = 0;
        if self.mute_time_intervals.remove(old) {
            self.mute_time_intervals.insert(new.to_string());
            renamed += 1;
        }
        for child in &mut self.routes {
            renamed += child.rename_mute_timing(old, new);
        }
        renamed
    }
}

/// Serde adapter for Alertmanager's `object_matchers` encoding, a list of
/// `[name, operator, value]` triples.
pub mod object_matchers {
    use notify_validation::{MatchOperator, Matcher};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serializes matchers as triples.
    pub fn serialize<S: Serializer>(matchers: &[Matcher], serializer: S) -> Result<S::Ok, S::Error> {
        matchers
            .iter()
            .map(|m| [m.name.as_str(), m.operator.symbol(), m.value.as_str()])
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    /// Deserializes triples, validating each matcher.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Matcher>, D::Error> {
        let triples = Vec::<(String, String, String)>::deserialize(deserializer)?;
        triples
            .into_iter()
            .map(|(name, operator, value)| {
                let operator: MatchOperator = operator.parse().map_err(serde::de::Error::custom)?;
                Matcher::new(name, operator, value).map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
