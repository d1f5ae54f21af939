use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Malformed filter intent: {0}")]
    MalformedIntent(String),

    #[error("Invalid column selected: {0}")]
    InvalidColumn(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Invalid operator: {0}")]
    InvalidOperator(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Subject not found: {0}")]
    SubjectNotFound(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl QueryError {
    /// True for the errors a malformed question or schema violation produces,
    /// as opposed to infrastructure failures.
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            QueryError::MalformedIntent(_)
                | QueryError::InvalidColumn(_)
                | QueryError::InvalidValue(_)
                | QueryError::InvalidOperator(_)
        )
    }
}

impl From<polars::error::PolarsError> for QueryError {
    fn from(err: polars::error::PolarsError) -> Self {
        QueryError::Polars(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
