use thiserror::Error;

/// Failures from the persistent store. Kept apart from "no data" so callers
/// can tell an outage from an empty history.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid stored value in {column}: {value:?}")]
    Corrupt { column: &'static str, value: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
