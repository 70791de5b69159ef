use thiserror::Error;

pub type YatriResult<T> = Result<T, YatriError>;

#[derive(Error, Debug)]
pub enum YatriError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Event store error: {0}")]
    Store(String),

    #[error("Aggregation error: {0}")]
    Aggregation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
