//! FILENAME: core/drilldown-engine/src/engine.rs
//! Drilldown Engine - turns a (filtered) forest into an ordered row list.
//!
//! Algorithm:
//! 1. Walk each root depth-first, siblings in source order (or sorted)
//! 2. Emit a row per node with its ancestor path, metric cells and average
//! 3. Descend only into expanded nodes, and only into children at the level
//!    the view expects next

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::definition::{DrilldownConfig, HeatmapBucket, Level, MetricColumn, MetricKey, MetricKind};
use crate::expansion::ExpansionState;
use crate::tree::{Node, NodeKey};
use crate::view::{AncestorPath, MetricCell, Row};

// ============================================================================
// SORTING
// ============================================================================

/// Orders siblings by one metric column. Missing values always sort last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: MetricColumn,
    pub descending: bool,
}

impl SortSpec {
    pub fn ascending(column: MetricColumn) -> Self {
        SortSpec { column, descending: false }
    }

    pub fn descending(column: MetricColumn) -> Self {
        SortSpec { column, descending: true }
    }

    fn compare<L: Level>(&self, a: &Node<L>, b: &Node<L>) -> Ordering {
        match (a.column_value(&self.column), b.column_value(&self.column)) {
            (Some(x), Some(y)) => {
                if self.descending {
                    y.total_cmp(&x)
                } else {
                    x.total_cmp(&y)
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

// ============================================================================
// FLATTENER
// ============================================================================

pub struct Flattener<'a, L: Level> {
    config: &'a DrilldownConfig<L>,
    expansion: &'a ExpansionState,
    sort: Option<&'a SortSpec>,
    average_metrics: Vec<MetricKey>,
}

impl<'a, L: Level> Flattener<'a, L> {
    pub fn new(config: &'a DrilldownConfig<L>, expansion: &'a ExpansionState) -> Self {
        Flattener {
            config,
            expansion,
            sort: None,
            average_metrics: config.average_allow_list(),
        }
    }

    pub fn with_sort(mut self, sort: Option<&'a SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    /// Produces every visible row, in display order.
    pub fn flatten(&self, forest: &[Node<L>]) -> Vec<Row<L>> {
        let mut rows = Vec::new();
        self.walk(forest.iter().collect(), None, &AncestorPath::new(), 0, &mut rows);
        rows
    }

    fn walk<'n>(
        &self,
        nodes: Vec<&'n Node<L>>,
        parent: Option<&NodeKey>,
        path: &AncestorPath,
        depth: usize,
        rows: &mut Vec<Row<L>>,
    ) {
        for node in self.ordered(nodes) {
            let key = NodeKey::under(parent, &node.id);
            let node_path = path.with(node.level, &node.label);

            let has_visible_children = node
                .children
                .iter()
                .any(|c| self.config.accepts_child(node.level, c.level));
            let is_expanded = has_visible_children && self.expansion.is_expanded(&key);

            rows.push(self.build_row(node, key.clone(), node_path.clone(), depth, has_visible_children, is_expanded));

            if is_expanded {
                let visible: Vec<&Node<L>> = node
                    .children
                    .iter()
                    .filter(|c| self.config.accepts_child(node.level, c.level))
                    .collect();
                self.walk(visible, Some(&key), &node_path, depth + 1, rows);
            }
        }
    }

    fn ordered<'n>(&self, mut nodes: Vec<&'n Node<L>>) -> Vec<&'n Node<L>> {
        if let Some(sort) = self.sort {
            nodes.sort_by(|a, b| sort.compare(a, b));
        }
        nodes
    }

    fn build_row(
        &self,
        node: &Node<L>,
        key: NodeKey,
        path: AncestorPath,
        depth: usize,
        has_visible_children: bool,
        is_expanded: bool,
    ) -> Row<L> {
        let cells: Vec<MetricCell> = self
            .config
            .metric_columns
            .iter()
            .map(|column| {
                let value = node.column_value(column);
                MetricCell {
                    column: column.clone(),
                    value,
                    bucket: heatmap_bucket(self.config, column.metric, value),
                    display: format_metric(column.metric, value, &self.config.placeholder),
                }
            })
            .collect();

        let average = row_average(
            cells.iter().map(|c| (c.column.metric, c.value)),
            &self.average_metrics,
        );

        Row {
            key,
            node_id: node.id.clone(),
            label: node.label.clone(),
            level: node.level,
            depth,
            path,
            metrics: node.metrics.clone(),
            breakdowns: node.breakdowns.clone(),
            cells,
            average,
            has_visible_children,
            is_expanded,
        }
    }
}

/// Flattens `forest` with no sorting.
pub fn flatten<L: Level>(
    forest: &[Node<L>],
    expansion: &ExpansionState,
    config: &DrilldownConfig<L>,
) -> Vec<Row<L>> {
    Flattener::new(config, expansion).flatten(forest)
}

// ============================================================================
// DERIVED FIELDS
// ============================================================================

/// Rounds to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Mean of the allow-listed values that are present, one decimal place.
/// Missing values are left out of the denominator.
pub fn row_average(
    values: impl IntoIterator<Item = (MetricKey, Option<f64>)>,
    allow_list: &[MetricKey],
) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .filter(|(metric, _)| allow_list.contains(metric) && metric.kind() != MetricKind::Position)
        .filter_map(|(_, value)| value)
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    (count > 0).then(|| round1(sum / count as f64))
}

/// Heatmap bucket for a cell; missing values are never bucketed.
pub fn heatmap_bucket<L: Level>(
    config: &DrilldownConfig<L>,
    metric: MetricKey,
    value: Option<f64>,
) -> Option<HeatmapBucket> {
    let value = value?;
    config.heatmap_rule(metric).map(|rule| rule.classify(value))
}

pub fn format_metric(metric: MetricKey, value: Option<f64>, placeholder: &str) -> String {
    let Some(v) = value else {
        return placeholder.to_string();
    };
    match metric.kind() {
        MetricKind::Percent => format!("{:.1}%", v),
        MetricKind::Position => format!("{:.1}", v),
        MetricKind::Currency => format!("₹{:.2}", v),
        MetricKind::Count => format!("{:.0}", v),
        MetricKind::Ratio => format!("{:.2}", v),
    }
}
