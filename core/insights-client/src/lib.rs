//! FILENAME: core/insights-client/src/lib.rs
//! Async loading of drill-down datasets from the insights REST API.
//!
//! - `config`: Client settings and the global dashboard filters
//! - `query`: Ordered query-string construction
//! - `envelope`: `{success, data, message}` decoding and filter options
//! - `source`: The `DataSource` seam (HTTP, static, fallback)
//! - `sequencer`: Stale-response suppression
//! - `loader`: Fetch-then-apply into a `DrilldownTable`
//! - `memo`: Lazily fetched category children

pub mod error;
pub mod config;
pub mod query;
pub mod envelope;
pub mod source;
pub mod sequencer;
pub mod loader;
pub mod memo;

pub use error::{ClientError, Result};
pub use config::{ClientConfig, GlobalFilters};
pub use query::{QueryParam, QueryParams};
pub use envelope::{ApiEnvelope, FilterOption};
pub use source::{DataSource, FallbackDataSource, HttpDataSource, StaticDataSource};
pub use sequencer::{RequestSequencer, RequestTicket};
pub use loader::{DatasetShape, DatasetSpec, DrilldownLoader, Fetched, LoadOutcome, LoadState};
pub use memo::CategoryMemo;
