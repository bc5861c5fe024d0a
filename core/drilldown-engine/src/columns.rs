//! FILENAME: core/drilldown-engine/src/columns.rs
//! Column Visibility Resolver.
//!
//! A hierarchy column is rendered only when a row on the current page sits
//! at that level. This is evaluated against the paginated rows, not the full
//! dataset, so columns can appear and disappear while paging.

use crate::definition::{DrilldownConfig, Level};
use crate::view::{HierarchyColumn, Row};

/// Hierarchy columns to render for `page_rows`, in view-level order.
pub fn visible_hierarchy_columns<L: Level>(
    config: &DrilldownConfig<L>,
    page_rows: &[Row<L>],
) -> Vec<HierarchyColumn<L>> {
    config
        .levels
        .iter()
        .copied()
        .filter(|level| page_rows.iter().any(|row| row.level == *level))
        .map(HierarchyColumn::new)
        .collect()
}
