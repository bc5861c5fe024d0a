//! FILENAME: core/drilldown-engine/src/table.rs
//! Drilldown Table - the state container behind one table component.
//!
//! Owns the forest, expansion state, filter, sort and paginator, and derives
//! the visible page on demand. Every derivation recomputes from scratch:
//! filter -> flatten -> paginate -> resolve columns.

use std::io;

use crate::columns::visible_hierarchy_columns;
use crate::definition::{DrilldownConfig, Level};
use crate::engine::{Flattener, SortSpec};
use crate::error::Result;
use crate::expansion::ExpansionState;
use crate::export::CsvLayout;
use crate::filter::{filter_forest, FilterState, MetricThreshold};
use crate::paginate::Paginator;
use crate::tree::{self, Node, NodeKey};
use crate::view::{HierarchyColumn, Row, TableView};

#[derive(Debug, Clone)]
pub struct DrilldownTable<L: Level> {
    config: DrilldownConfig<L>,
    forest: Vec<Node<L>>,
    expansion: ExpansionState,
    filter: FilterState<L>,
    sort: Option<SortSpec>,
    paginator: Paginator,
}

impl<L: Level> DrilldownTable<L> {
    pub fn new(config: DrilldownConfig<L>) -> Result<Self> {
        config.validate()?;
        let paginator = Paginator::new(config.default_page_size);
        Ok(DrilldownTable {
            config,
            forest: Vec::new(),
            expansion: ExpansionState::new(),
            filter: FilterState::new(),
            sort: None,
            paginator,
        })
    }

    pub fn with_forest(mut self, forest: Vec<Node<L>>) -> Self {
        self.forest = forest;
        self
    }

    pub fn config(&self) -> &DrilldownConfig<L> {
        &self.config
    }

    pub fn forest(&self) -> &[Node<L>] {
        &self.forest
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    pub fn filter(&self) -> &FilterState<L> {
        &self.filter
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    // ========================================================================
    // DATA
    // ========================================================================

    /// Swaps in a freshly loaded forest. Expansion state is kept; the current
    /// page is clamped on the next read.
    pub fn replace_forest(&mut self, forest: Vec<Node<L>>) {
        log::debug!("replacing forest: {} nodes", tree::count_nodes(&forest));
        self.forest = forest;
    }

    /// Grafts lazily loaded children under an existing node.
    pub fn attach_children(&mut self, key: &NodeKey, children: Vec<Node<L>>) -> Result<()> {
        tree::attach_children(&mut self.forest, key, children)
    }

    // ========================================================================
    // FILTERS (each resets to the first page)
    // ========================================================================

    pub fn set_filter(&mut self, filter: FilterState<L>) {
        self.filter = filter;
        self.paginator.reset();
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.filter.search = Some(text.into());
        self.paginator.reset();
    }

    pub fn set_threshold(&mut self, threshold: Option<MetricThreshold>) {
        self.filter.threshold = threshold;
        self.paginator.reset();
    }

    pub fn select_items<I, S>(&mut self, level: L, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter
            .selections
            .insert(level, items.into_iter().map(Into::into).collect());
        self.paginator.reset();
    }

    pub fn clear_selection(&mut self, level: L) {
        self.filter.selections.remove(&level);
        self.paginator.reset();
    }

    pub fn clear_filters(&mut self) {
        self.filter = FilterState::new();
        self.paginator.reset();
    }

    pub fn set_sort(&mut self, sort: Option<SortSpec>) {
        self.sort = sort;
        self.paginator.reset();
    }

    // ========================================================================
    // EXPANSION
    // ========================================================================

    /// Returns whether the node is now expanded.
    pub fn toggle(&mut self, key: impl Into<NodeKey>) -> bool {
        self.expansion.toggle(key)
    }

    pub fn expand(&mut self, key: impl Into<NodeKey>) {
        self.expansion.expand(key);
    }

    pub fn collapse(&mut self, key: &NodeKey) {
        self.expansion.collapse(key);
    }

    pub fn expand_all(&mut self) {
        self.expansion.expand_all(&self.forest);
    }

    pub fn collapse_all(&mut self) {
        self.expansion.collapse_all();
    }

    // ========================================================================
    // PAGING
    // ========================================================================

    pub fn set_page(&mut self, page: usize) {
        self.paginator.set_page(page);
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        if !self.config.page_size_options.contains(&page_size) {
            log::debug!("page size {} is not one of the offered options", page_size);
        }
        self.paginator.set_page_size(page_size);
    }

    pub fn next_page(&mut self) {
        let total = self.rows().len();
        self.paginator.next(total);
    }

    pub fn prev_page(&mut self) {
        let total = self.rows().len();
        self.paginator.prev(total);
    }

    // ========================================================================
    // DERIVED OUTPUT
    // ========================================================================

    /// Every visible row across all pages.
    pub fn rows(&self) -> Vec<Row<L>> {
        let filtered = filter_forest(&self.forest, &self.filter, &self.config);
        Flattener::new(&self.config, &self.expansion)
            .with_sort(self.sort.as_ref())
            .flatten(&filtered)
    }

    /// The current page, ready to render.
    pub fn view(&self) -> TableView<L> {
        let rows = self.rows();
        let (page_rows, page) = self.paginator.slice(&rows);
        TableView {
            hierarchy_columns: visible_hierarchy_columns(&self.config, page_rows),
            rows: page_rows.to_vec(),
            metric_columns: self.config.metric_columns.clone(),
            show_average: self.config.show_average,
            page,
        }
    }

    /// Writes every visible row across all pages. Hierarchy columns are
    /// resolved over the exported rows, so each row keeps its own level.
    pub fn export_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let rows = self.rows();
        let hierarchy = visible_hierarchy_columns(&self.config, &rows);
        self.csv_layout(&hierarchy).write(writer, &rows)
    }

    pub fn export_csv_string(&self) -> Result<String> {
        let rows = self.rows();
        let hierarchy = visible_hierarchy_columns(&self.config, &rows);
        self.csv_layout(&hierarchy).to_csv_string(&rows)
    }

    fn csv_layout<'a>(&'a self, hierarchy: &'a [HierarchyColumn<L>]) -> CsvLayout<'a, L> {
        CsvLayout {
            hierarchy,
            metrics: &self.config.metric_columns,
            show_average: self.config.show_average,
            placeholder: &self.config.placeholder,
        }
    }
}
