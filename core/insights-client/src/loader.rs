//! FILENAME: core/insights-client/src/loader.rs
//! Dataset Loader - fetches one table's dataset and applies it.
//!
//! Loading is split in two so a fetch never holds the table:
//! 1. `begin` issues a ticket and fetches (async, `&self`)
//! 2. `apply` installs the result if its ticket is still current
//!
//! Failures never reach the renderer as errors: the table falls back to an
//! empty forest and the loader records `LoadState::Failed`, which callers can
//! tell apart from a successful empty result.

use std::sync::{Arc, Mutex, PoisonError};

use drilldown_engine::{forest_from_json, DrilldownConfig, DrilldownTable, Level, Node, TreeBuilder};
use serde::{Deserialize, Serialize};

use crate::config::GlobalFilters;
use crate::envelope::FilterOption;
use crate::error::Result;
use crate::query::{QueryParam, QueryParams};
use crate::sequencer::{RequestSequencer, RequestTicket};
use crate::source::DataSource;

// ============================================================================
// DATASET DESCRIPTION
// ============================================================================

/// How the endpoint lays out its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatasetShape {
    /// Pre-nested node forest.
    Hierarchical,
    /// One record per leaf, grouped client-side by the view's levels.
    Flat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSpec {
    pub path: String,
    pub shape: DatasetShape,

    /// Sent as `filterType` when present.
    #[serde(default)]
    pub filter_type: Option<String>,

    /// Dropdown options endpoint; defaults to `filter-options` next to `path`.
    #[serde(default)]
    pub options_path: Option<String>,
}

impl DatasetSpec {
    pub fn hierarchical(path: impl Into<String>) -> Self {
        DatasetSpec {
            path: path.into(),
            shape: DatasetShape::Hierarchical,
            filter_type: None,
            options_path: None,
        }
    }

    pub fn flat(path: impl Into<String>) -> Self {
        DatasetSpec {
            path: path.into(),
            shape: DatasetShape::Flat,
            filter_type: None,
            options_path: None,
        }
    }

    pub fn with_filter_type(mut self, filter_type: impl Into<String>) -> Self {
        self.filter_type = Some(filter_type.into());
        self
    }

    pub fn with_options_path(mut self, path: impl Into<String>) -> Self {
        self.options_path = Some(path.into());
        self
    }

    /// `pricing/categories` -> `pricing/filter-options`.
    pub fn filter_options_path(&self) -> String {
        if let Some(path) = &self.options_path {
            return path.clone();
        }
        match self.path.trim_end_matches('/').rsplit_once('/') {
            Some((parent, _)) => format!("{}/filter-options", parent),
            None => "filter-options".to_string(),
        }
    }
}

// ============================================================================
// LOAD STATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready { rows: usize },
    /// The request succeeded and returned nothing.
    Empty,
    /// The request failed; the table shows no rows.
    Failed(String),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

/// What `apply` did with a fetch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied { rows: usize },
    Empty,
    Failed(String),
    /// A newer request was issued before this one resolved.
    Discarded,
}

/// A resolved fetch waiting to be applied.
#[derive(Debug)]
pub struct Fetched<L: Level> {
    ticket: RequestTicket,
    result: Result<Vec<Node<L>>>,
}

impl<L: Level> Fetched<L> {
    pub fn ticket(&self) -> &RequestTicket {
        &self.ticket
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

// ============================================================================
// LOADER
// ============================================================================

pub struct DrilldownLoader<L: Level> {
    source: Arc<dyn DataSource>,
    spec: DatasetSpec,
    filters: GlobalFilters,
    levels: Vec<L>,
    breakdown_field: Option<String>,
    sequencer: RequestSequencer,
    state: Mutex<LoadState>,
}

impl<L: Level> DrilldownLoader<L> {
    pub fn new(
        source: Arc<dyn DataSource>,
        spec: DatasetSpec,
        filters: GlobalFilters,
        config: &DrilldownConfig<L>,
    ) -> Self {
        DrilldownLoader {
            source,
            spec,
            filters,
            levels: config.levels.clone(),
            breakdown_field: config.breakdown_field.clone(),
            sequencer: RequestSequencer::new(),
            state: Mutex::new(LoadState::Idle),
        }
    }

    pub fn spec(&self) -> &DatasetSpec {
        &self.spec
    }

    pub fn filters(&self) -> &GlobalFilters {
        &self.filters
    }

    /// New global filters; the next `begin` uses them.
    pub fn set_filters(&mut self, filters: GlobalFilters) {
        self.filters = filters;
    }

    pub fn state(&self) -> LoadState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_state(&self, state: LoadState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn params(&self) -> QueryParams {
        let mut params = QueryParams::from_filters(&self.filters);
        params.set_opt(QueryParam::FilterType, self.spec.filter_type.as_deref());
        params
    }

    /// Starts a fetch. Any fetch begun earlier becomes stale.
    pub async fn begin(&self) -> Fetched<L> {
        let ticket = self.sequencer.issue(&self.spec.path);
        self.set_state(LoadState::Loading);
        let result = self.fetch_forest().await;
        Fetched { ticket, result }
    }

    async fn fetch_forest(&self) -> Result<Vec<Node<L>>> {
        let envelope = self.source.fetch(&self.spec.path, &self.params()).await?;
        match self.spec.shape {
            DatasetShape::Hierarchical => Ok(forest_from_json(envelope.into_data()?)?),
            DatasetShape::Flat => {
                let records = envelope.into_records()?;
                let mut builder = TreeBuilder::new(&self.levels);
                if let Some(field) = self.breakdown_field.as_deref() {
                    builder = builder.with_breakdown_field(field);
                }
                Ok(builder.build(&records)?)
            }
        }
    }

    /// Installs a fetch result into `table` unless a newer fetch was begun.
    pub fn apply(&self, table: &mut DrilldownTable<L>, fetched: Fetched<L>) -> LoadOutcome {
        if !self.sequencer.is_current(&fetched.ticket) {
            log::debug!(
                "discarding stale response #{} for {}",
                fetched.ticket.seq(),
                fetched.ticket.query()
            );
            return LoadOutcome::Discarded;
        }

        match fetched.result {
            Ok(forest) if forest.is_empty() => {
                table.replace_forest(forest);
                self.set_state(LoadState::Empty);
                LoadOutcome::Empty
            }
            Ok(forest) => {
                table.replace_forest(forest);
                let rows = table.rows().len();
                self.set_state(LoadState::Ready { rows });
                LoadOutcome::Applied { rows }
            }
            Err(err) => {
                log::warn!("loading {} failed: {}", self.spec.path, err);
                let message = err.to_string();
                table.replace_forest(Vec::new());
                self.set_state(LoadState::Failed(message.clone()));
                LoadOutcome::Failed(message)
            }
        }
    }

    /// `begin` then `apply`, for callers with no overlapping requests.
    pub async fn load(&self, table: &mut DrilldownTable<L>) -> LoadOutcome {
        let fetched = self.begin().await;
        self.apply(table, fetched)
    }

    /// Dropdown options for one filter, under the current global filters.
    pub async fn filter_options(&self, filter_type: &str) -> Result<Vec<FilterOption>> {
        let params = QueryParams::from_filters(&self.filters).with(QueryParam::FilterType, filter_type);
        let path = self.spec.filter_options_path();
        let records = self.source.fetch(&path, &params).await?.into_records()?;
        if records.is_empty() {
            log::debug!("no '{}' options at {}", filter_type, path);
        }
        Ok(FilterOption::from_records(&records))
    }
}
