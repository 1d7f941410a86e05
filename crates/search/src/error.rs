use tc_core::{QueryParseError, SortParseError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("Invalid query: {0}")]
    Query(#[from] QueryParseError),
    #[error("Invalid sort: {0}")]
    Sort(#[from] SortParseError),
    #[error("Invalid value '{value}' for parameter {param}")]
    InvalidParam { param: String, value: String },
    #[error("Unknown parameter {0}")]
    UnknownParam(String),
}
