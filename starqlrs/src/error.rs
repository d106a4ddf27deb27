use thiserror::Error;

pub type Result<T> = std::result::Result<T, StarqlError>;

/// Build-time failures are deterministic and are never retried; execution-time
/// failures belong to whatever layer runs the statement.
#[derive(Debug, Error)]
pub enum StarqlError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("date resolution error: {0}")]
    Date(String),
    #[error("sql generation error: {0}")]
    Sql(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
