//! Notification policy tree shaping.
//!
//! The tree is treated as an immutable value: every edit returns a new
//! [`PolicyTree`] and leaves the original untouched, so a form can discard
//! an edit by dropping the result.

use std::collections::BTreeSet;

use notify_validation::{matchers_match, HumanDuration, Labels, Matcher};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PolicyError, Result};
use crate::route::{RouteNode, RoutePath};

/// Default `group_wait` for a new root policy.
pub const DEFAULT_GROUP_WAIT: HumanDuration = HumanDuration::from_secs(30);

/// Default `group_interval` for a new root policy.
pub const DEFAULT_GROUP_INTERVAL: HumanDuration = HumanDuration::from_secs(5 * 60);

/// Default `repeat_interval` for a new root policy.
pub const DEFAULT_REPEAT_INTERVAL: HumanDuration = HumanDuration::from_secs(4 * 60 * 60);

/// Settings for a freshly built root policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyDefaults {
    /// Default contact point, if one was chosen.
    pub receiver: Option<String>,
    /// Grouping labels.
    pub group_by: Vec<String>,
    /// Wait before the first notification of a group.
    pub group_wait: HumanDuration,
    /// Wait between notifications for a changed group.
    pub group_interval: HumanDuration,
    /// Wait before repeating a notification.
    pub repeat_interval: HumanDuration,
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self {
            receiver: None,
            group_by: Vec::new(),
            group_wait: DEFAULT_GROUP_WAIT,
            group_interval: DEFAULT_GROUP_INTERVAL,
            repeat_interval: DEFAULT_REPEAT_INTERVAL,
        }
    }
}

/// Grouping and timing values in force at a node after inheritance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveTiming {
    /// Grouping labels.
    pub group_by: Vec<String>,
    /// Effective `group_wait`.
    pub group_wait: HumanDuration,
    /// Effective `group_interval`.
    pub group_interval: HumanDuration,
    /// Effective `repeat_interval`.
    pub repeat_interval: HumanDuration,
}

impl EffectiveTiming {
    fn from_defaults(defaults: &PolicyDefaults) -> Self {
        Self {
            group_by: defaults.group_by.clone(),
            group_wait: defaults.group_wait,
            group_interval: defaults.group_interval,
            repeat_interval: defaults.repeat_interval,
        }
    }

    /// Applies the explicit values of `node` over these.
    fn apply(&mut self, node: &RouteNode) {
        if let Some(group_by) = &node.group_by {
            self.group_by.clone_from(group_by);
        }
        if let Some(wait) = node.group_wait {
            self.group_wait = wait;
        }
        if let Some(interval) = node.group_interval {
            self.group_interval = interval;
        }
        if let Some(repeat) = node.repeat_interval {
            self.repeat_interval = repeat;
        }
    }
}

/// A route that handles an alert, with its inherited settings resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMatch {
    /// Path of the handling route.
    pub path: RoutePath,
    /// Effective receiver.
    pub receiver: Option<String>,
    /// Effective grouping and timing.
    pub timing: EffectiveTiming,
    /// Mute timings attached to the handling route itself.
    pub mute_time_intervals: BTreeSet<String>,
}

/// A notification policy tree: the root route plus the defaults used for
/// any value the root leaves unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTree {
    root: RouteNode,
    defaults: PolicyDefaults,
}

impl PolicyTree {
    /// Wraps an existing root route, e.g. one loaded from a document.
    #[must_use]
    pub fn new(root: RouteNode) -> Self {
        Self {
            root,
            defaults: PolicyDefaults::default(),
        }
    }

    /// Wraps an existing root route with explicit fallback defaults.
    #[must_use]
    pub fn with_defaults(root: RouteNode, defaults: PolicyDefaults) -> Self {
        Self { root, defaults }
    }

    /// Builds the root policy from defaults.
    ///
    /// The root always carries concrete grouping and timing. Its receiver
    /// comes from `defaults.receiver`; when none was chosen but receivers
    /// exist, the receiver is left unset until the policy is first saved.
    ///
    /// # Errors
    ///
    /// Returns `MissingReceiver` when no receiver is chosen and `receivers`
    /// is empty, and `UnknownReference` when the chosen receiver is not in a
    /// non-empty `receivers` list.
    pub fn build_root_route(defaults: PolicyDefaults, receivers: &[String]) -> Result<Self> {
        let receiver = defaults
            .receiver
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(ToString::to_string);

        match &receiver {
            None if receivers.is_empty() => {
                debug!("no receiver available for root route");
                return Err(PolicyError::MissingReceiver);
            }
            Some(name) if !receivers.is_empty() && !receivers.contains(name) => {
                debug!(receiver = %name, "root receiver is not a known receiver");
                return Err(PolicyError::UnknownReference {
                    kind: "receiver",
                    name: name.clone(),
                    path: RoutePath::root().to_string(),
                });
            }
            _ => {}
        }

        let root = RouteNode {
            receiver,
            group_by: Some(defaults.group_by.clone()),
            group_wait: Some(defaults.group_wait),
            group_interval: Some(defaults.group_interval),
            repeat_interval: Some(defaults.repeat_interval),
            ..RouteNode::default()
        };

        info!(
            receiver = root.receiver.as_deref().unwrap_or("<unset>"),
            group_wait = %defaults.group_wait,
            group_interval = %defaults.group_interval,
            repeat_interval = %defaults.repeat_interval,
            "built root route"
        );

        Ok(Self { root, defaults })
    }

    /// Returns the root route.
    #[must_use]
    pub fn root(&self) -> &RouteNode {
        &self.root
    }

    /// Returns the fallback defaults.
    #[must_use]
    pub fn defaults(&self) -> &PolicyDefaults {
        &self.defaults
    }

    /// Consumes the tree, returning the root route.
    #[must_use]
    pub fn into_root(self) -> RouteNode {
        self.root
    }

    /// Returns the node at `path`.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` if any index is out of range.
    pub fn node(&self, path: &RoutePath) -> Result<&RouteNode> {
        path.indices()
            .iter()
            .try_fold(&self.root, |node, &index| node.routes.get(index))
            .ok_or_else(|| not_found(path))
    }

    fn node_mut(&mut self, path: &RoutePath) -> Result<&mut RouteNode> {
        let mut node = &mut self.root;
        for &index in path.indices() {
            node = node.routes.get_mut(index).ok_or_else(|| not_found(path))?;
        }
        Ok(node)
    }

    /// Returns a tree with `route` appended as the last child of the node
    /// at `parent_path`. Existing siblings keep their order.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` if `parent_path` does not exist.
    pub fn insert_child_route(&self, parent_path: &RoutePath, route: RouteNode) -> Result<Self> {
        let mut tree = self.clone();
        let parent = tree.node_mut(parent_path)?;
        parent.routes.push(route);
        let child_path = parent_path.child(parent.routes.len() - 1);

        info!(parent_path = %parent_path, route_path = %child_path, "inserted child route");
        Ok(tree)
    }

    /// Returns a tree without the node at `path`. The node's descendants
    /// are removed with it; later siblings shift down by one.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` if `path` does not exist or is the root.
    pub fn remove_child_route(&self, path: &RoutePath) -> Result<Self> {
        let Some((parent_path, index)) = path.split_last() else {
            warn!(route_path = %path, "attempted to remove the root route");
            return Err(PolicyError::path_not_found(path));
        };

        let mut tree = self.clone();
        let parent = tree.node_mut(&parent_path)?;
        if index >= parent.routes.len() {
            return Err(not_found(path));
        }
        let removed = parent.routes.remove(index);

        info!(
            route_path = %path,
            removed_nodes = removed.node_count(),
            "removed child route"
        );
        Ok(tree)
    }

    /// Returns a tree where the node at `path` takes the settings of
    /// `route` but keeps its existing children. Uninterpreted document keys
    /// are kept too unless `route` carries its own.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` if `path` does not exist.
    pub fn update_route(&self, path: &RoutePath, mut route: RouteNode) -> Result<Self> {
        let mut tree = self.clone();
        let node = tree.node_mut(path)?;
        route.routes = std::mem::take(&mut node.routes);
        if route.other.is_empty() {
            route.other = std::mem::take(&mut node.other);
        }
        *node = route;

        info!(route_path = %path, "updated route");
        Ok(tree)
    }

    /// Resolves grouping and timing for the node at `path`.
    ///
    /// Each field takes the value of the nearest node on the way from the
    /// root that sets it. Values the root leaves unset fall back to the
    /// tree's defaults.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` if `path` does not exist.
    pub fn resolve_effective_timing(&self, path: &RoutePath) -> Result<EffectiveTiming> {
        let mut timing = EffectiveTiming::from_defaults(&self.defaults);
        self.visit_lineage(path, |node| timing.apply(node))?;
        Ok(timing)
    }

    /// Resolves the receiver for the node at `path`, walking up to the
    /// nearest ancestor that sets one.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` if `path` does not exist.
    pub fn resolve_receiver(&self, path: &RoutePath) -> Result<Option<String>> {
        let mut receiver = self.defaults.receiver.clone();
        self.visit_lineage(path, |node| {
            if node.receiver.is_some() {
                receiver.clone_from(&node.receiver);
            }
        })?;
        Ok(receiver)
    }

    /// Calls `visit` on every node from the root down to `path`.
    fn visit_lineage(&self, path: &RoutePath, mut visit: impl FnMut(&RouteNode)) -> Result<()> {
        let mut node = &self.root;
        visit(node);
        for &index in path.indices() {
            node = node.routes.get(index).ok_or_else(|| not_found(path))?;
            visit(node);
        }
        Ok(())
    }

    /// Finds the routes that handle an alert with `labels`.
    ///
    /// Routing is depth-first from the root, which matches every alert.
    /// Children are tried in order; the first matching child handles the
    /// alert unless it sets `continue`, in which case later siblings are
    /// tried as well. A node whose children all fail to match handles the
    /// alert itself.
    #[must_use]
    pub fn route_alert(&self, labels: &Labels) -> Vec<RouteMatch> {
        let mut timing = EffectiveTiming::from_defaults(&self.defaults);
        timing.apply(&self.root);
        let receiver = self
            .root
            .receiver
            .clone()
            .or_else(|| self.defaults.receiver.clone());

        let mut matches = Vec::new();
        route_node(
            &self.root,
            RoutePath::root(),
            receiver,
            timing,
            labels,
            &mut matches,
        );

        debug!(
            labels = ?labels,
            matched = matches.len(),
            "routed alert"
        );
        matches
    }

    /// Finds the routes below the root that fit a search, in tree order.
    ///
    /// A route fits when it carries every matcher in `query` and its own
    /// receiver contains `contact_point`, ignoring case. Empty criteria
    /// accept every route.
    #[must_use]
    pub fn find_routes(&self, query: &[Matcher], contact_point: Option<&str>) -> Vec<RoutePath> {
        let contact_point = contact_point
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_lowercase);

        let mut found = Vec::new();
        self.root.walk(&mut |path, node| {
            if path.is_root() {
                return;
            }
            let has_matchers = query.iter().all(|m| node.matchers.contains(m));
            let has_receiver = contact_point.as_deref().is_none_or(|needle| {
                node.receiver
                    .as_deref()
                    .is_some_and(|r| r.to_lowercase().contains(needle))
            });
            if has_matchers && has_receiver {
                found.push(path.clone());
            }
        });

        debug!(query = query.len(), found = found.len(), "searched routes");
        found
    }
}

fn route_node(
    node: &RouteNode,
    path: RoutePath,
    receiver: Option<String>,
    timing: EffectiveTiming,
    labels: &Labels,
    out: &mut Vec<RouteMatch>,
) {
    let mut handled_by_child = false;

    for (index, child) in node.routes.iter().enumerate() {
        if !matchers_match(&child.matchers, labels) {
            continue;
        }
        handled_by_child = true;

        let mut child_timing = timing.clone();
        child_timing.apply(child);
        let child_receiver = child.receiver.clone().or_else(|| receiver.clone());
        route_node(
            child,
            path.child(index),
            child_receiver,
            child_timing,
            labels,
            out,
        );

        if !child.continue_matching {
            break;
        }
    }

    if !handled_by_child {
        out.push(RouteMatch {
            path,
            receiver,
            timing,
            mute_time_intervals: node.mute_time_intervals.clone(),
        });
    }
}

fn not_found(path: &RoutePath) -> PolicyError {
    warn!(route_path = %path, "route path not found");
    PolicyError::path_not_found(path)
}
