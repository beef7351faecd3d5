// Path and File Name : /home/sensor/home-sensor-core/core/scout/src/error.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Typed errors for the scout probing engine and scheduler

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transient scout failure: {0}")]
    Transient(String),

    #[error("scout state corruption: {0}")]
    StateCorruption(String),
}

impl From<sensor_storage::StorageError> for ScoutError {
    fn from(err: sensor_storage::StorageError) -> Self {
        match err {
            sensor_storage::StorageError::Transient(m) => ScoutError::Transient(m),
            sensor_storage::StorageError::Validation(m) => ScoutError::Validation(m),
            sensor_storage::StorageError::NotFound(m) => ScoutError::StateCorruption(format!("expected row missing: {m}")),
            other => ScoutError::StateCorruption(other.to_string()),
        }
    }
}

impl From<sensor_event_bus::EventBusError> for ScoutError {
    fn from(err: sensor_event_bus::EventBusError) -> Self {
        ScoutError::Transient(err.to_string())
    }
}
