//! BK-tree (Burkhard-Keller tree) implementation
//!
//! A metric tree structure that enables fast fuzzy searching.
//! Works with any edit distance metric that satisfies triangle inequality.
//!
//! Nodes live in an arena owned by the tree. Each node links to at most one
//! child per distance, and a flat value map gives O(1) access to any node.
//! Nodes are never removed: deleting a value only marks it inactive, because
//! physically unlinking a node would mean re-inserting its whole subtree.

use crate::algorithms::levenshtein::WeightedLevenshtein;
use crate::algorithms::EditDistance;
use crate::error::{IndexError, Result};
use ahash::{AHashMap, AHashSet};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maximum tree depth to prevent infinite loops from buggy distance functions.
const MAX_TREE_DEPTH: usize = 1000;

/// A distance function type
pub type DistanceFn = Arc<dyn Fn(&str, &str) -> usize + Send + Sync>;

/// A metric shared between trees
pub type SharedMetric = Arc<dyn EditDistance>;

/// Range query result: matching values bucketed by their distance to the query
pub type Neighbors = BTreeMap<usize, BTreeSet<String>>;

/// Handle of a node inside its tree's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// A node in the BK-tree
#[derive(Debug, Clone)]
pub struct BkNode {
    /// The string stored at this node
    value: String,
    /// Soft-delete flag; inactive nodes are skipped by queries
    active: bool,
    /// Children indexed by their distance to this node
    children: AHashMap<usize, NodeId>,
}

impl BkNode {
    pub(crate) fn new(value: String, active: bool) -> Self {
        Self {
            value,
            active,
            children: AHashMap::new(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn has_distance(&self, distance: usize) -> bool {
        self.children.contains_key(&distance)
    }

    /// Child at `distance`, if any
    pub fn link(&self, distance: usize) -> Option<NodeId> {
        self.children.get(&distance).copied()
    }

    /// All links sorted by distance
    pub fn links(&self) -> Vec<(usize, NodeId)> {
        let mut links: Vec<_> = self.children.iter().map(|(&d, &id)| (d, id)).collect();
        links.sort_unstable();
        links
    }

    pub fn num_links(&self) -> usize {
        self.children.len()
    }

    /// Attach a child. Callers guarantee the distance slot is free.
    pub(crate) fn attach(&mut self, distance: usize, child: NodeId) {
        let previous = self.children.insert(distance, child);
        debug_assert!(
            previous.is_none(),
            "node `{}` already has a link at distance {distance}",
            self.value
        );
    }
}

/// BK-tree over strings.
///
/// A tree always holds at least its root. The root is fixed at construction
/// and values can only be added, deactivated and reactivated afterwards.
///
/// # Custom Distance Functions
///
/// When providing a custom metric, ensure it:
/// - Returns 0 for identical strings
/// - Is symmetric and satisfies the triangle inequality
///
/// The tree stores the distance of every edge as computed at insertion time,
/// so a tree must always be queried with the metric it was built with.
#[derive(Clone)]
pub struct BkTree {
    nodes: Vec<BkNode>,
    lookup: AHashMap<String, NodeId>,
    root: NodeId,
    metric: SharedMetric,
    /// Number of inactive nodes
    deleted_count: usize,
}

struct ClosureMetric(DistanceFn);

impl EditDistance for ClosureMetric {
    fn distance(&self, a: &str, b: &str) -> usize {
        (self.0)(a, b)
    }

    fn name(&self) -> &'static str {
        "custom"
    }
}

/// The metric used when none is given: case-sensitive, unweighted Levenshtein
pub fn default_metric() -> SharedMetric {
    Arc::new(WeightedLevenshtein::new())
}

impl BkTree {
    /// Create a tree holding `root`, using Levenshtein distance
    pub fn new(root: impl Into<String>) -> Self {
        Self::with_metric_arc(root, default_metric())
    }

    /// Create a tree with any EditDistance implementation
    ///
    /// # Example
    /// ```
    /// use bkindex::algorithms::WeightedLevenshtein;
    /// use bkindex::indexing::BkTree;
    ///
    /// let tree = BkTree::with_metric("book", WeightedLevenshtein::new().case_insensitive());
    /// assert!(tree.contains("book"));
    /// ```
    pub fn with_metric<T: EditDistance + 'static>(root: impl Into<String>, metric: T) -> Self {
        Self::with_metric_arc(root, Arc::new(metric))
    }

    /// Create a tree with a custom distance function
    pub fn with_distance(root: impl Into<String>, distance_fn: DistanceFn) -> Self {
        Self::with_metric_arc(root, Arc::new(ClosureMetric(distance_fn)))
    }

    /// Create a tree with an Arc-wrapped metric, shareable between trees
    pub fn with_metric_arc(root: impl Into<String>, metric: SharedMetric) -> Self {
        let root = root.into();
        let mut lookup = AHashMap::new();
        lookup.insert(root.clone(), NodeId(0));
        Self {
            nodes: vec![BkNode::new(root, true)],
            lookup,
            root: NodeId(0),
            metric,
            deleted_count: 0,
        }
    }

    /// Build a tree from a collection of strings.
    ///
    /// Duplicates are ignored. The first value becomes the root.
    /// Fails with [`IndexError::EmptyInput`] when `values` is empty.
    pub fn from_values<I, S>(values: I, metric: SharedMetric) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values = values.into_iter().map(Into::into);
        let root = values
            .next()
            .ok_or(IndexError::EmptyInput("cannot build a tree from an empty set"))?;

        let mut tree = Self::with_metric_arc(root, metric);
        for value in values {
            match tree.insert(value) {
                Ok(()) | Err(IndexError::AlreadyExists(_)) => {}
                Err(e) => return Err(e),
            }
        }

        debug!(
            nodes = tree.len(),
            metric = tree.metric.name(),
            "built BK-tree from values"
        );
        Ok(tree)
    }

    /// Assemble a tree from parts that were already validated.
    pub(crate) fn from_parts(
        nodes: Vec<BkNode>,
        lookup: AHashMap<String, NodeId>,
        root: NodeId,
        metric: SharedMetric,
    ) -> Self {
        let deleted_count = nodes.iter().filter(|node| !node.active).count();
        Self {
            nodes,
            lookup,
            root,
            metric,
            deleted_count,
        }
    }

    /// Add a string to the tree.
    ///
    /// Walks down from the root computing the exact distance to each node
    /// and attaches the new node at the first free edge.
    ///
    /// Fails with [`IndexError::AlreadyExists`] if the value is already indexed,
    /// active or not. The tree is unchanged on failure.
    pub fn insert(&mut self, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        if self.lookup.contains_key(&value) {
            return Err(IndexError::AlreadyExists(value));
        }

        let mut current = self.root;
        for _ in 0..MAX_TREE_DEPTH {
            let node = &self.nodes[current.0];
            let distance = self.metric.distance(&node.value, &value);

            match node.link(distance) {
                Some(child) => current = child,
                None => {
                    let id = NodeId(self.nodes.len());
                    self.nodes.push(BkNode::new(value.clone(), true));
                    self.nodes[current.0].attach(distance, id);
                    self.lookup.insert(value, id);
                    return Ok(());
                }
            }
        }

        warn!(
            max_depth = MAX_TREE_DEPTH,
            value = %value,
            metric = self.metric.name(),
            "BK-tree exceeded maximum depth; the distance function likely violates metric properties"
        );
        Err(IndexError::InvalidArgument(format!(
            "inserting `{value}` exceeded the maximum tree depth of {MAX_TREE_DEPTH}"
        )))
    }

    /// Add multiple strings, failing on the first rejected one.
    ///
    /// Values inserted before the failure stay in the tree.
    pub fn insert_all<I, S>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        values.into_iter().try_for_each(|value| self.insert(value))
    }

    /// Check whether the value is indexed, active or not
    pub fn contains(&self, value: &str) -> bool {
        self.lookup.contains_key(value)
    }

    /// Node holding `value`
    pub fn lookup(&self, value: &str) -> Result<&BkNode> {
        self.lookup
            .get(value)
            .map(|id| &self.nodes[id.0])
            .ok_or_else(|| IndexError::NotFound(value.to_string()))
    }

    /// Child of the node holding `value` at the given edge distance
    pub fn child(&self, value: &str, distance: usize) -> Result<&BkNode> {
        let node = self.lookup(value)?;
        node.link(distance)
            .map(|id| &self.nodes[id.0])
            .ok_or_else(|| IndexError::EdgeNotFound {
                value: value.to_string(),
                distance,
            })
    }

    /// Resolve a node handle obtained from [`BkNode::link`]
    pub fn node(&self, id: NodeId) -> Option<&BkNode> {
        self.nodes.get(id.0)
    }

    pub fn root(&self) -> &BkNode {
        &self.nodes[self.root.0]
    }

    pub(crate) fn nodes(&self) -> &[BkNode] {
        &self.nodes
    }

    pub fn metric(&self) -> &dyn EditDistance {
        self.metric.as_ref()
    }

    /// Find every active value within `max_distance` of `value`.
    ///
    /// Children are only visited when their edge distance lies within
    /// `max_distance` of the current node's distance to the query; by the
    /// triangle inequality nothing outside that band can match.
    pub fn range_query(&self, value: &str, max_distance: usize) -> Neighbors {
        let mut neighbors = Neighbors::new();
        let mut stack = vec![self.root];

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            let distance = self.probe(node, value, max_distance);

            if distance <= max_distance && node.active {
                neighbors
                    .entry(distance)
                    .or_default()
                    .insert(node.value.clone());
            }

            let min_dist = distance.saturating_sub(max_distance);
            let max_dist = distance.saturating_add(max_distance);
            stack.extend(
                node.children
                    .iter()
                    .filter(|(edge, _)| (min_dist..=max_dist).contains(*edge))
                    .map(|(_, &child)| child),
            );
        }

        neighbors
    }

    /// Distance from `node` to the query, exact whenever it can still matter.
    ///
    /// Past `max_distance + furthest edge` the node cannot match and no child
    /// falls in the search band, so a lower bound is enough there.
    fn probe(&self, node: &BkNode, value: &str, max_distance: usize) -> usize {
        let furthest_edge = node.children.keys().max().copied().unwrap_or(0);
        let bound = max_distance
            .saturating_add(furthest_edge)
            .saturating_add(1);
        self.metric.distance_lower_bound(&node.value, value, bound)
    }

    /// Best single correction for `value`.
    ///
    /// Returns `None` when `value` is indexed and active, or when nothing is
    /// within [`suggestion_radius`]. Otherwise returns the lexicographically
    /// smallest value among the closest matches.
    pub fn suggest_correction(&self, value: &str) -> Option<String> {
        if self
            .lookup
            .get(value)
            .is_some_and(|id| self.nodes[id.0].active)
        {
            return None;
        }

        let (_, closest) = self
            .range_query(value, suggestion_radius(value))
            .pop_first()?;
        closest.into_iter().next()
    }

    /// Mark a value as active again
    pub fn activate(&mut self, value: &str) -> Result<()> {
        self.set_active(value, true)
    }

    /// Soft-delete a value: it stays in the tree but no query returns it
    pub fn deactivate(&mut self, value: &str) -> Result<()> {
        self.set_active(value, false)
    }

    fn set_active(&mut self, value: &str, active: bool) -> Result<()> {
        let id = *self
            .lookup
            .get(value)
            .ok_or_else(|| IndexError::NotFound(value.to_string()))?;
        let node = &mut self.nodes[id.0];
        if node.active != active {
            node.active = active;
            if active {
                self.deleted_count -= 1;
            } else {
                self.deleted_count += 1;
            }
        }
        Ok(())
    }

    /// Get the number of nodes, including inactive ones
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a tree holds at least its root
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get the number of inactive nodes
    pub fn deleted_count(&self) -> usize {
        self.deleted_count
    }

    /// Get the number of active nodes
    pub fn active_count(&self) -> usize {
        self.nodes.len() - self.deleted_count
    }

    /// Every indexed value, active or not
    pub fn values(&self) -> AHashSet<&str> {
        self.lookup.keys().map(String::as_str).collect()
    }

    /// Iterate over active values in no particular order
    pub fn iter_active(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|node| node.active)
            .map(|node| node.value.as_str())
    }
}

impl fmt::Debug for BkTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BkTree")
            .field("root", &self.root().value)
            .field("len", &self.len())
            .field("deleted_count", &self.deleted_count)
            .field("metric", &self.metric.name())
            .finish()
    }
}

/// Indented rendering, children in ascending edge distance:
///
/// ```text
/// book
/// |-- (1) books
/// | |-- (2) boo
/// |-- (4) cake [inactive]
/// ```
impl fmt::Display for BkTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![(self.root, 0usize, 0usize)];
        let mut first = true;

        while let Some((id, depth, distance)) = stack.pop() {
            let node = &self.nodes[id.0];
            for (edge, child) in node.links().into_iter().rev() {
                stack.push((child, depth + 1, edge));
            }

            if !first {
                writeln!(f)?;
            }
            first = false;

            if depth > 0 {
                write!(f, "{}|-- ({distance}) ", "| ".repeat(depth - 1))?;
            }
            write!(f, "{}", node.value)?;
            if !node.active {
                write!(f, " [inactive]")?;
            }
        }
        Ok(())
    }
}

/// Search radius used by [`BkTree::suggest_correction`]: `max(round(len / 5) + 1, 2)`
pub fn suggestion_radius(value: &str) -> usize {
    let len = value.chars().count();
    // integer form of round(len / 5); len / 5 never ends in exactly .5
    ((len + 2) / 5 + 1).max(2)
}

/// Run the same range query for many values in parallel
pub fn batch_range_query(tree: &BkTree, queries: &[String], max_distance: usize) -> Vec<Neighbors> {
    queries
        .par_iter()
        .map(|query| tree.range_query(query, max_distance))
        .collect()
}
