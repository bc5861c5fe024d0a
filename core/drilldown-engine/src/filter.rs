//! FILENAME: core/drilldown-engine/src/filter.rs
//! Filter Predicate - decides which nodes stay reachable.
//!
//! A node is kept when it matches every active predicate itself, or when any
//! of its descendants is kept (so a matching SKU keeps its brand and category
//! on screen). Filtering never touches the source forest; it returns a pruned
//! copy.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::definition::{DrilldownConfig, Level, MetricColumn};
use crate::tree::Node;

// ============================================================================
// FILTER STATE
// ============================================================================

/// Minimum value a node must reach in one metric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricThreshold {
    pub column: MetricColumn,
    pub min: f64,
}

impl MetricThreshold {
    pub fn new(column: MetricColumn, min: f64) -> Self {
        MetricThreshold { column, min }
    }
}

/// Everything the user has narrowed the table down by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = ""))]
pub struct FilterState<L: Level> {
    /// Case-insensitive substring matched against labels.
    #[serde(default)]
    pub search: Option<String>,

    #[serde(default)]
    pub threshold: Option<MetricThreshold>,

    /// Per-level allow lists ("only these SKUs"), matched by label or id.
    #[serde(default)]
    pub selections: BTreeMap<L, BTreeSet<String>>,
}

impl<L: Level> Default for FilterState<L> {
    fn default() -> Self {
        FilterState {
            search: None,
            threshold: None,
            selections: BTreeMap::new(),
        }
    }
}

impl<L: Level> FilterState<L> {
    pub fn new() -> Self {
        FilterState::default()
    }

    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn with_threshold(mut self, threshold: MetricThreshold) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_selection<I, S>(mut self, level: L, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections
            .insert(level, items.into_iter().map(Into::into).collect());
        self
    }

    /// Trimmed, lower-cased search text; blank search is no search.
    pub fn search_needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn is_active(&self) -> bool {
        self.search_needle().is_some() || self.threshold.is_some() || !self.selections.is_empty()
    }
}

// ============================================================================
// PRUNING
// ============================================================================

/// Returns the filtered copy of `forest`.
pub fn filter_forest<L: Level>(
    forest: &[Node<L>],
    filter: &FilterState<L>,
    config: &DrilldownConfig<L>,
) -> Vec<Node<L>> {
    if !filter.is_active() {
        return forest.to_vec();
    }
    let matcher = Matcher {
        filter,
        needle: filter.search_needle(),
        search_descendants: config.search_descendants,
    };
    forest
        .iter()
        .filter_map(|node| matcher.prune(node, &[]))
        .collect()
}

struct Matcher<'a, L: Level> {
    filter: &'a FilterState<L>,
    needle: Option<String>,
    search_descendants: bool,
}

impl<'a, L: Level> Matcher<'a, L> {
    /// `selected` lists the levels whose selection an ancestor already satisfied.
    fn prune(&self, node: &Node<L>, selected: &[L]) -> Option<Node<L>> {
        let direct = self.matches_directly(node, selected);

        let mut child_selected = selected.to_vec();
        if self.is_selected_item(node) {
            child_selected.push(node.level);
        }

        let children: Vec<Node<L>> = node
            .children
            .iter()
            .filter_map(|child| self.prune(child, &child_selected))
            .collect();

        if direct || !children.is_empty() {
            Some(Node {
                id: node.id.clone(),
                label: node.label.clone(),
                level: node.level,
                metrics: node.metrics.clone(),
                breakdowns: node.breakdowns.clone(),
                children,
            })
        } else {
            None
        }
    }

    fn matches_directly(&self, node: &Node<L>, selected: &[L]) -> bool {
        self.matches_search(node) && self.meets_threshold(node) && self.matches_selections(node, selected)
    }

    fn matches_search(&self, node: &Node<L>) -> bool {
        let Some(needle) = &self.needle else {
            return true;
        };
        if self.search_descendants {
            subtree_mentions(node, needle)
        } else {
            node.label.to_lowercase().contains(needle.as_str())
        }
    }

    /// A missing value never passes a threshold.
    fn meets_threshold(&self, node: &Node<L>) -> bool {
        match &self.filter.threshold {
            Some(threshold) => node
                .column_value(&threshold.column)
                .map_or(false, |v| v >= threshold.min),
            None => true,
        }
    }

    fn matches_selections(&self, node: &Node<L>, selected: &[L]) -> bool {
        self.filter.selections.iter().all(|(level, items)| {
            if node.level == *level {
                items.contains(&node.label) || items.contains(&node.id)
            } else if node.level > *level {
                selected.contains(level)
            } else {
                // Above the selected level: reachable only through a descendant.
                false
            }
        })
    }

    fn is_selected_item(&self, node: &Node<L>) -> bool {
        self.filter
            .selections
            .get(&node.level)
            .map_or(false, |items| items.contains(&node.label) || items.contains(&node.id))
    }
}

fn subtree_mentions<L: Level>(node: &Node<L>, needle: &str) -> bool {
    node.label.to_lowercase().contains(needle)
        || node.children.iter().any(|c| subtree_mentions(c, needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{MetricKey, PricingLevel};

    fn forest() -> Vec<Node<PricingLevel>> {
        vec![
            Node::new("c1", "Snacks", PricingLevel::Category)
                .with_metric(MetricKey::Discount, 20.0)
                .with_child(
                    Node::new("b1", "Acme", PricingLevel::Brand)
                        .with_metric(MetricKey::Discount, 5.0)
                        .with_child(Node::new("s1", "Acme Chips", PricingLevel::Sku)),
                )
                .with_child(
                    Node::new("b2", "Zed", PricingLevel::Brand).with_metric(MetricKey::Discount, 40.0),
                ),
            Node::new("c2", "Dairy", PricingLevel::Category).with_metric(MetricKey::Discount, 8.0),
        ]
    }

    fn config() -> DrilldownConfig<PricingLevel> {
        DrilldownConfig::new(
            vec![PricingLevel::Category, PricingLevel::Brand, PricingLevel::Sku],
            vec![MetricColumn::new(MetricKey::Discount)],
        )
    }

    fn labels(nodes: &[Node<PricingLevel>]) -> Vec<&str> {
        nodes.iter().map(|n| n.label.as_str()).collect()
    }

    #[test]
    fn test_inactive_filter_returns_copy() {
        let source = forest();
        let filtered = filter_forest(&source, &FilterState::new(), &config());
        assert_eq!(filtered, source);
    }

    #[test]
    fn test_search_keeps_ancestors_of_match() {
        let filter = FilterState::new().with_search("  CHIPS ");
        let filtered = filter_forest(&forest(), &filter, &config());

        assert_eq!(labels(&filtered), vec!["Snacks"]);
        assert_eq!(labels(&filtered[0].children), vec!["Acme"]);
        assert_eq!(labels(&filtered[0].children[0].children), vec!["Acme Chips"]);
    }

    #[test]
    fn test_search_prunes_non_matching_children_of_match() {
        let filter = FilterState::new().with_search("snacks");
        let filtered = filter_forest(&forest(), &filter, &config());
        assert_eq!(labels(&filtered), vec!["Snacks"]);
        assert!(filtered[0].children.is_empty());
    }

    #[test]
    fn test_search_descendants_option() {
        let filter = FilterState::new().with_search("zed");
        let config = config().with_search_descendants(true);
        let filtered = filter_forest(&forest(), &filter, &config);
        assert_eq!(labels(&filtered), vec!["Snacks"]);
        assert_eq!(labels(&filtered[0].children), vec!["Zed"]);
    }

    #[test]
    fn test_threshold_treats_missing_as_failing() {
        let threshold = MetricThreshold::new(MetricColumn::new(MetricKey::Discount), 10.0);
        let filter = FilterState::new().with_threshold(threshold);
        let filtered = filter_forest(&forest(), &filter, &config());

        assert_eq!(labels(&filtered), vec!["Snacks"]);
        // Acme (5.0) and its SKU (no data) are gone; Zed (40.0) stays.
        assert_eq!(labels(&filtered[0].children), vec!["Zed"]);
    }

    #[test]
    fn test_selection_keeps_path_and_subtree() {
        let filter = FilterState::new().with_selection(PricingLevel::Brand, ["Acme"]);
        let filtered = filter_forest(&forest(), &filter, &config());

        assert_eq!(labels(&filtered), vec!["Snacks"]);
        assert_eq!(labels(&filtered[0].children), vec!["Acme"]);
        assert_eq!(labels(&filtered[0].children[0].children), vec!["Acme Chips"]);
    }

    #[test]
    fn test_filter_state_from_json() {
        let filter: FilterState<PricingLevel> = serde_json::from_str(
            r#"{"search": "chips", "selections": {"brand": ["Acme"]}}"#,
        )
        .unwrap();
        assert_eq!(filter.search_needle().as_deref(), Some("chips"));
        assert_eq!(filter.threshold, None);
        assert!(filter.selections[&PricingLevel::Brand].contains("Acme"));

        let filtered = filter_forest(&forest(), &filter, &config());
        assert_eq!(labels(&filtered[0].children[0].children), vec!["Acme Chips"]);
    }

    #[test]
    fn test_source_forest_is_untouched() {
        let source = forest();
        let before = source.clone();
        let _ = filter_forest(&source, &FilterState::new().with_search("zed"), &config());
        assert_eq!(source, before);
    }
}
