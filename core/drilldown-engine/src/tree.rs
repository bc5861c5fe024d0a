//! FILENAME: core/drilldown-engine/src/tree.rs
//! Tree Store - the in-memory forest a drilldown table renders.
//!
//! A forest is built once per API response, either directly from an
//! already-hierarchical payload or by bucketing flat records that carry
//! denormalized ancestor fields (`category`, `brand`, ...). It is never
//! mutated while rows are being derived from it; new data replaces it.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::definition::{DrilldownConfig, Level, MetricColumn, MetricKey, Rollup, UNCLASSIFIED_LABEL};
use crate::error::{DrilldownError, Result};

// ============================================================================
// METRICS
// ============================================================================

/// A partially populated metric record. Absent keys mean "no data".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metrics(BTreeMap<MetricKey, f64>);

impl Metrics {
    pub fn new() -> Self {
        Metrics(BTreeMap::new())
    }

    pub fn get(&self, metric: MetricKey) -> Option<f64> {
        self.0.get(&metric).copied()
    }

    /// Stores a value. Non-finite values are treated as missing.
    pub fn set(&mut self, metric: MetricKey, value: f64) {
        if value.is_finite() {
            self.0.insert(metric, value);
        } else {
            self.0.remove(&metric);
        }
    }

    pub fn with(mut self, metric: MetricKey, value: f64) -> Self {
        self.set(metric, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricKey, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    /// Combines several records key by key using each metric's rollup rule.
    /// Missing values are skipped, never counted as zero.
    pub fn rollup<'a>(records: impl IntoIterator<Item = &'a Metrics>) -> Metrics {
        let mut acc: BTreeMap<MetricKey, (f64, usize)> = BTreeMap::new();
        for record in records {
            for (metric, value) in record.iter() {
                let entry = acc.entry(metric).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }
        acc.into_iter()
            .map(|(metric, (sum, count))| {
                let value = match metric.rollup() {
                    Rollup::Sum => sum,
                    Rollup::Mean => sum / count as f64,
                };
                (metric, value)
            })
            .collect()
    }
}

impl FromIterator<(MetricKey, f64)> for Metrics {
    fn from_iter<I: IntoIterator<Item = (MetricKey, f64)>>(iter: I) -> Self {
        let mut metrics = Metrics::new();
        for (metric, value) in iter {
            metrics.set(metric, value);
        }
        metrics
    }
}

impl<'de> Deserialize<'de> for Metrics {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // Unknown metric keys fail here, at the ingestion boundary.
        let raw = BTreeMap::<MetricKey, Value>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .filter_map(|(metric, value)| coerce_metric(&value).map(|v| (metric, v)))
            .collect())
    }
}

/// Reads a JSON metric value. Numbers and numeric strings (`"12.5"`,
/// `"12.5%"`, `"1,204"`) are accepted; anything else is "no data".
pub fn coerce_metric(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .replace(',', "")
            .trim()
            .parse::<f64>()
            .ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// ============================================================================
// NODE
// ============================================================================

/// One entity of the business hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = ""))]
pub struct Node<L: Level> {
    /// Unique among siblings, not necessarily across the forest.
    #[serde(default)]
    pub id: String,

    pub label: String,

    pub level: L,

    #[serde(default, deserialize_with = "nullable")]
    pub metrics: Metrics,

    /// Metrics split by a secondary dimension (e.g. per platform).
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "BTreeMap::is_empty")]
    pub breakdowns: BTreeMap<String, Metrics>,

    #[serde(default, deserialize_with = "nullable")]
    pub children: Vec<Node<L>>,
}

impl<L: Level> Node<L> {
    pub fn new(id: impl Into<String>, label: impl Into<String>, level: L) -> Self {
        Node {
            id: id.into(),
            label: label.into(),
            level,
            metrics: Metrics::new(),
            breakdowns: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_metric(mut self, metric: MetricKey, value: f64) -> Self {
        self.metrics.set(metric, value);
        self
    }

    pub fn with_breakdown(mut self, dimension: impl Into<String>, metrics: Metrics) -> Self {
        self.breakdowns.insert(dimension.into(), metrics);
        self
    }

    pub fn with_child(mut self, child: Node<L>) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: Vec<Node<L>>) -> Self {
        self.children = children;
        self
    }

    pub fn metric(&self, metric: MetricKey) -> Option<f64> {
        self.metrics.get(metric)
    }

    /// Value shown in `column`: the node's own metric, or the breakdown's.
    pub fn column_value(&self, column: &MetricColumn) -> Option<f64> {
        match &column.breakdown {
            Some(dim) => self.breakdowns.get(dim).and_then(|m| m.get(column.metric)),
            None => self.metrics.get(column.metric),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Total number of nodes in a forest.
pub fn count_nodes<L: Level>(forest: &[Node<L>]) -> usize {
    forest.iter().map(|n| 1 + count_nodes(&n.children)).sum()
}

// ============================================================================
// NODE KEY
// ============================================================================

const KEY_SEPARATOR: char = '/';

/// Path-qualified node identity (`"c1"`, `"c1/b1"`).
///
/// Node ids are only unique among siblings, so the path is what identifies
/// a node across the whole forest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

fn escape_segment(id: &str) -> String {
    id.replace('%', "%25").replace(KEY_SEPARATOR, "%2F")
}

impl NodeKey {
    pub fn root(id: &str) -> Self {
        NodeKey(escape_segment(id))
    }

    pub fn child(&self, id: &str) -> Self {
        NodeKey(format!("{}{}{}", self.0, KEY_SEPARATOR, escape_segment(id)))
    }

    /// Key of `id` under an optional parent.
    pub fn under(parent: Option<&NodeKey>, id: &str) -> Self {
        match parent {
            Some(parent) => parent.child(id),
            None => NodeKey::root(id),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 0 for a root key.
    pub fn depth(&self) -> usize {
        self.0.matches(KEY_SEPARATOR).count()
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.0
            .rfind(KEY_SEPARATOR)
            .map(|idx| NodeKey(self.0[..idx].to_string()))
    }

    /// True when `other` lies strictly below `self`.
    pub fn is_ancestor_of(&self, other: &NodeKey) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0[self.0.len()..].starts_with(KEY_SEPARATOR)
    }
}

impl From<&str> for NodeKey {
    fn from(key: &str) -> Self {
        NodeKey(key.to_string())
    }
}

impl From<String> for NodeKey {
    fn from(key: String) -> Self {
        NodeKey(key)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Finds the node addressed by `key`.
pub fn find_node<'a, L: Level>(forest: &'a [Node<L>], key: &NodeKey) -> Option<&'a Node<L>> {
    find_in(forest, None, key)
}

fn find_in<'a, L: Level>(
    nodes: &'a [Node<L>],
    parent: Option<&NodeKey>,
    key: &NodeKey,
) -> Option<&'a Node<L>> {
    for node in nodes {
        let node_key = NodeKey::under(parent, &node.id);
        if &node_key == key {
            return Some(node);
        }
        if node_key.is_ancestor_of(key) {
            return find_in(&node.children, Some(&node_key), key);
        }
    }
    None
}

pub fn find_node_mut<'a, L: Level>(
    forest: &'a mut [Node<L>],
    key: &NodeKey,
) -> Option<&'a mut Node<L>> {
    find_in_mut(forest, None, key)
}

fn find_in_mut<'a, L: Level>(
    nodes: &'a mut [Node<L>],
    parent: Option<&NodeKey>,
    key: &NodeKey,
) -> Option<&'a mut Node<L>> {
    for node in nodes.iter_mut() {
        let node_key = NodeKey::under(parent, &node.id);
        if &node_key == key {
            return Some(node);
        }
        if node_key.is_ancestor_of(key) {
            return find_in_mut(&mut node.children, Some(&node_key), key);
        }
    }
    None
}

/// Replaces the children of the node at `key` (used for lazily fetched levels).
pub fn attach_children<L: Level>(
    forest: &mut [Node<L>],
    key: &NodeKey,
    children: Vec<Node<L>>,
) -> Result<()> {
    let node = find_node_mut(forest, key)
        .ok_or_else(|| DrilldownError::NodeNotFound(key.to_string()))?;
    node.children = children;
    Ok(())
}

// ============================================================================
// HIERARCHICAL PAYLOADS
// ============================================================================

/// Builds a forest from a payload already shaped as nested nodes.
/// Nodes without an `id` use their label.
pub fn forest_from_json<L: Level>(payload: Value) -> Result<Vec<Node<L>>> {
    let mut forest: Vec<Node<L>> = serde_json::from_value(payload)?;
    fill_missing_ids(&mut forest);
    Ok(forest)
}

pub fn forest_from_str<L: Level>(payload: &str) -> Result<Vec<Node<L>>> {
    let mut forest: Vec<Node<L>> = serde_json::from_str(payload)?;
    fill_missing_ids(&mut forest);
    Ok(forest)
}

fn fill_missing_ids<L: Level>(nodes: &mut [Node<L>]) {
    for node in nodes {
        if node.id.is_empty() {
            node.id = node.label.clone();
        }
        fill_missing_ids(&mut node.children);
    }
}

// ============================================================================
// FLAT RECORDS
// ============================================================================

const DEFAULT_PASSTHROUGH: [&str; 4] = ["id", "name", "date", "updatedAt"];

/// Groups flat leaf records into a forest by repeated key bucketing.
///
/// Each record names its ancestors through level fields. A record that lacks
/// one of them lands in the `"Other"` bucket for that level.
pub struct TreeBuilder<'a, L: Level> {
    levels: &'a [L],
    breakdown_field: Option<&'a str>,
    passthrough: FxHashSet<String>,
}

/// Grouping scratch space: first-seen ordered children with a label index.
struct Bucket<L: Level> {
    label: String,
    level: L,
    children: Vec<Bucket<L>>,
    index: FxHashMap<String, usize>,
    samples: Vec<Metrics>,
    breakdown_samples: BTreeMap<String, Vec<Metrics>>,
}

impl<L: Level> Bucket<L> {
    fn new(label: String, level: L) -> Self {
        Bucket {
            label,
            level,
            children: Vec::new(),
            index: FxHashMap::default(),
            samples: Vec::new(),
            breakdown_samples: BTreeMap::new(),
        }
    }

    fn child_mut(&mut self, label: &str, level: L) -> &mut Bucket<L> {
        let idx = match self.index.get(label) {
            Some(idx) => *idx,
            None => {
                self.children.push(Bucket::new(label.to_string(), level));
                let idx = self.children.len() - 1;
                self.index.insert(label.to_string(), idx);
                idx
            }
        };
        &mut self.children[idx]
    }

    /// Records that stopped at this bucket while others went deeper are
    /// moved into an "Other" child so their metrics are not lost.
    fn settle_own_samples(&mut self) {
        let Some(child_level) = self.children.first().map(|c| c.level) else {
            return;
        };
        if self.samples.is_empty() {
            return;
        }
        let samples = std::mem::take(&mut self.samples);
        let breakdowns = std::mem::take(&mut self.breakdown_samples);
        let other = self.child_mut(UNCLASSIFIED_LABEL, child_level);
        other.samples.extend(samples);
        for (dim, list) in breakdowns {
            other.breakdown_samples.entry(dim).or_default().extend(list);
        }
    }

    fn into_node(mut self) -> Node<L> {
        self.settle_own_samples();
        let children: Vec<Node<L>> = self.children.into_iter().map(Bucket::into_node).collect();

        let (metrics, breakdowns) = if children.is_empty() {
            let breakdowns = self
                .breakdown_samples
                .iter()
                .map(|(dim, samples)| (dim.clone(), Metrics::rollup(samples)))
                .collect();
            (Metrics::rollup(&self.samples), breakdowns)
        } else {
            let mut dims: BTreeMap<String, Vec<&Metrics>> = BTreeMap::new();
            for child in &children {
                for (dim, metrics) in &child.breakdowns {
                    dims.entry(dim.clone()).or_default().push(metrics);
                }
            }
            let breakdowns = dims
                .into_iter()
                .map(|(dim, list)| (dim, Metrics::rollup(list)))
                .collect();
            (Metrics::rollup(children.iter().map(|c| &c.metrics)), breakdowns)
        };

        Node {
            id: self.label.clone(),
            label: self.label,
            level: self.level,
            metrics,
            breakdowns,
            children,
        }
    }
}

impl<'a, L: Level> TreeBuilder<'a, L> {
    pub fn new(levels: &'a [L]) -> Self {
        TreeBuilder {
            levels,
            breakdown_field: None,
            passthrough: DEFAULT_PASSTHROUGH.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_config(config: &'a DrilldownConfig<L>) -> Self {
        let mut builder = TreeBuilder::new(&config.levels);
        builder.breakdown_field = config.breakdown_field.as_deref();
        builder
    }

    pub fn with_breakdown_field(mut self, field: &'a str) -> Self {
        self.breakdown_field = Some(field);
        self
    }

    /// Allows an extra non-metric field on records.
    pub fn with_passthrough(mut self, field: impl Into<String>) -> Self {
        self.passthrough.insert(field.into());
        self
    }

    pub fn build(&self, records: &[Value]) -> Result<Vec<Node<L>>> {
        let Some(&first_level) = self.levels.first() else {
            return Ok(Vec::new());
        };
        let mut root = Bucket::new(String::new(), first_level);

        for (idx, record) in records.iter().enumerate() {
            let object = record.as_object().ok_or(DrilldownError::NotAnObject(idx))?;
            let (metrics, breakdown) = self.read_record(idx, object)?;

            // A record is as deep as its deepest populated level; only the
            // gaps above that fall back to "Other".
            let depth = self
                .levels
                .iter()
                .rposition(|level| object.get(level.field_name()).and_then(label_of).is_some())
                .map_or(1, |pos| pos + 1);

            let mut bucket = &mut root;
            for level in &self.levels[..depth] {
                let label = match object.get(level.field_name()).and_then(label_of) {
                    Some(label) => label,
                    None => {
                        log::debug!(
                            "record {} has no '{}'; grouped under '{}'",
                            idx,
                            level.field_name(),
                            UNCLASSIFIED_LABEL
                        );
                        UNCLASSIFIED_LABEL.to_string()
                    }
                };
                bucket = bucket.child_mut(&label, *level);
            }

            if let Some(dim) = breakdown {
                bucket
                    .breakdown_samples
                    .entry(dim)
                    .or_default()
                    .push(metrics.clone());
            }
            bucket.samples.push(metrics);
        }

        Ok(root.children.into_iter().map(Bucket::into_node).collect())
    }

    fn read_record(
        &self,
        idx: usize,
        object: &serde_json::Map<String, Value>,
    ) -> Result<(Metrics, Option<String>)> {
        let mut metrics = Metrics::new();
        let mut breakdown = None;

        for (field, value) in object {
            if Some(field.as_str()) == self.breakdown_field {
                breakdown = label_of(value);
                continue;
            }
            if L::from_field(field).is_some() || self.passthrough.contains(field) {
                continue;
            }
            match MetricKey::from_key(field) {
                Some(metric) => {
                    if let Some(v) = coerce_metric(value) {
                        metrics.set(metric, v);
                    }
                }
                None => {
                    return Err(DrilldownError::UnknownField {
                        field: field.clone(),
                        record: idx,
                    })
                }
            }
        }

        Ok((metrics, breakdown))
    }
}

fn label_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
