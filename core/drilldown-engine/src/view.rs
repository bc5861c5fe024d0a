//! FILENAME: core/drilldown-engine/src/view.rs
//! Drilldown View - Renderable output for the frontend.
//!
//! Rows are derived, throwaway projections of visible nodes. They are rebuilt
//! from scratch whenever the forest, filter, expansion or page changes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::definition::{HeatmapBucket, Level, MetricColumn};
use crate::tree::{Metrics, NodeKey};

pub const EMPTY_MESSAGE: &str = "No records found";

// ============================================================================
// ANCESTOR PATH
// ============================================================================

/// One optional label per hierarchy level, indexed by `Level::index`.
///
/// Lets a SKU row fill the Keyword column with its keyword ancestor's label
/// even though the SKU node does not carry that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AncestorPath(SmallVec<[Option<String>; 6]>);

impl AncestorPath {
    pub fn new() -> Self {
        AncestorPath::default()
    }

    pub fn get<L: Level>(&self, level: L) -> Option<&str> {
        self.0.get(level.index()).and_then(|l| l.as_deref())
    }

    /// Copy of this path with `level` set to `label`.
    pub fn with<L: Level>(&self, level: L, label: &str) -> Self {
        let mut path = self.clone();
        let idx = level.index();
        if path.0.len() <= idx {
            path.0.resize(idx + 1, None);
        }
        path.0[idx] = Some(label.to_string());
        path
    }
}

// ============================================================================
// ROWS
// ============================================================================

/// One metric value as rendered in a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricCell {
    pub column: MetricColumn,

    /// `None` when the source had no data; never zero-filled.
    pub value: Option<f64>,

    pub bucket: Option<HeatmapBucket>,

    /// Pre-formatted display string (placeholder when missing).
    pub display: String,
}

/// The render-ready projection of one visible node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Row<L: Level> {
    /// Path-qualified identity, used for expand/collapse.
    pub key: NodeKey,

    pub node_id: String,

    pub label: String,

    pub level: L,

    /// 0-based distance from the root.
    pub depth: usize,

    /// Labels of this node and its ancestors, per level.
    pub path: AncestorPath,

    pub metrics: Metrics,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub breakdowns: BTreeMap<String, Metrics>,

    pub cells: Vec<MetricCell>,

    /// Mean of the percent-typed cells, one decimal place.
    pub average: Option<f64>,

    /// Has children at the level this view drills into next.
    pub has_visible_children: bool,

    pub is_expanded: bool,
}

impl<L: Level> Row<L> {
    /// Label for a hierarchy column, taken from the row's own path.
    pub fn hierarchy_label(&self, level: L) -> Option<&str> {
        self.path.get(level)
    }

    pub fn cell(&self, column: &MetricColumn) -> Option<&MetricCell> {
        self.cells.iter().find(|c| &c.column == column)
    }
}

// ============================================================================
// TABLE VIEW
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyColumn<L: Level> {
    pub level: L,
    pub title: &'static str,
}

impl<L: Level> HierarchyColumn<L> {
    pub fn new(level: L) -> Self {
        HierarchyColumn {
            level,
            title: level.title(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// 1-indexed, already clamped.
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_rows: usize,
}

impl PageInfo {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// 1-based index of the first row on the page, 0 when there are no rows.
    pub fn first_row(&self) -> usize {
        if self.total_rows == 0 {
            0
        } else {
            (self.page - 1) * self.page_size + 1
        }
    }

    pub fn last_row(&self) -> usize {
        (self.page * self.page_size).min(self.total_rows)
    }
}

/// A page of rows plus the columns needed to render it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView<L: Level> {
    pub rows: Vec<Row<L>>,
    pub hierarchy_columns: Vec<HierarchyColumn<L>>,
    pub metric_columns: Vec<MetricColumn>,
    pub show_average: bool,
    pub page: PageInfo,
}

impl<L: Level> TableView<L> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn empty_message(&self) -> Option<&'static str> {
        self.is_empty().then_some(EMPTY_MESSAGE)
    }

    pub fn shows_level(&self, level: L) -> bool {
        self.hierarchy_columns.iter().any(|c| c.level == level)
    }
}
