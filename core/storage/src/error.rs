// Path and File Name : /home/sensor/home-sensor-core/core/storage/src/error.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Typed storage errors mapped from sqlx failures per the fail-closed error kinds

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transient storage failure: {0}")]
    Transient(String),

    #[error("storage state corruption: {0}")]
    StateCorruption(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StorageError::NotFound(err.to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    StorageError::Conflict(db_err.to_string())
                } else {
                    StorageError::Transient(db_err.to_string())
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                StorageError::Transient(err.to_string())
            }
            _ => StorageError::StateCorruption(err.to_string()),
        }
    }
}
