//! FILENAME: core/drilldown-engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DrilldownError {
    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Unknown field '{field}' in record {record}")]
    UnknownField { field: String, record: usize },

    #[error("Record {0} is not a JSON object")]
    NotAnObject(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DrilldownError>;
