//! FILENAME: core/insights-client/src/error.rs

use drilldown_engine::DrilldownError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error(transparent)]
    Engine(#[from] DrilldownError),

    #[error("Invalid base URL '{0}'")]
    InvalidUrl(String),

    #[error("No dataset registered for '{0}'")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
