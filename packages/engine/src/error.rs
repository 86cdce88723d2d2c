use thiserror::Error;

use crate::recorder::RecordError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Session has ended")]
    SessionClosed,
}

pub type Result<T> = std::result::Result<T, EngineError>;
