// Path and File Name : /home/sensor/home-sensor-core/core/deception/src/error.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Typed errors for decoy lifecycle, credential planting, and DNS canary monitoring

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeceptionError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transient decoy store failure: {0}")]
    Transient(String),

    #[error("decoy state corruption: {0}")]
    StateCorruption(String),

    #[error("decoy io failure: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sensor_storage::StorageError> for DeceptionError {
    fn from(err: sensor_storage::StorageError) -> Self {
        match err {
            sensor_storage::StorageError::Transient(m) => DeceptionError::Transient(m),
            sensor_storage::StorageError::Validation(m) => DeceptionError::Validation(m),
            sensor_storage::StorageError::NotFound(m) => DeceptionError::StateCorruption(format!("expected row missing: {m}")),
            other => DeceptionError::StateCorruption(other.to_string()),
        }
    }
}

impl From<sensor_event_bus::EventBusError> for DeceptionError {
    fn from(err: sensor_event_bus::EventBusError) -> Self {
        DeceptionError::Transient(err.to_string())
    }
}
