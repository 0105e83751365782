use chrono::NaiveDate;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source unavailable ({url}): {reason}")]
    SourceUnavailable { url: String, reason: String },

    #[error("source unavailable/schema mismatch: expected table at index {expected_index}, {found}")]
    SchemaMismatch { expected_index: usize, found: String },

    #[error("data format error: {0}")]
    DataFormat(String),

    #[error("invalid request date '{requested}': {reason}")]
    InvalidRequestDate {
        requested: String,
        last_observed: Option<NaiveDate>,
        reason: String,
    },

    #[error("model error: {0}")]
    Model(String),
}

impl PipelineError {
    pub fn source_unavailable(url: &str, reason: impl ToString) -> Self {
        PipelineError::SourceUnavailable {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
