//! FILENAME: core/drilldown-engine/src/lib.rs
//! Hierarchical drilldown tables for the insights dashboards.
//!
//! One generic engine serves every drill-down table (visibility, pricing,
//! keyword analysis, RCA insights). It is parameterized by the hierarchy
//! level enum, the metric columns, the averaged metrics and the heatmap
//! thresholds.
//!
//! Layers:
//! - `definition`: Serializable configuration (what a view IS)
//! - `tree`: The node forest built from API payloads
//! - `filter` / `expansion`: User intent applied to the forest
//! - `engine`: Flattening into rows (HOW we compute)
//! - `paginate` / `columns`: Page slicing and column visibility
//! - `view`: Renderable output (WHAT we display)
//! - `export`: CSV of the visible table
//! - `table`: The state container tying it together

pub mod error;
pub mod definition;
pub mod tree;
pub mod filter;
pub mod expansion;
pub mod engine;
pub mod paginate;
pub mod columns;
pub mod view;
pub mod export;
pub mod table;

pub use error::{DrilldownError, Result};
pub use definition::*;
pub use tree::{
    attach_children, count_nodes, find_node, forest_from_json, forest_from_str, Metrics, Node,
    NodeKey, TreeBuilder,
};
pub use filter::{filter_forest, FilterState, MetricThreshold};
pub use expansion::ExpansionState;
pub use engine::{flatten, format_metric, heatmap_bucket, round1, row_average, Flattener, SortSpec};
pub use paginate::Paginator;
pub use columns::visible_hierarchy_columns;
pub use view::*;
pub use export::CsvLayout;
pub use table::DrilldownTable;
