// Path and File Name : /home/sensor/home-sensor-core/core/event_bus/src/error.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Typed errors for the event bus crate

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transient event bus failure: {0}")]
    Transient(String),

    #[error("event bus state corruption: {0}")]
    StateCorruption(String),
}

impl From<sensor_storage::StorageError> for EventBusError {
    fn from(err: sensor_storage::StorageError) -> Self {
        match err {
            sensor_storage::StorageError::Transient(m) => EventBusError::Transient(m),
            sensor_storage::StorageError::Validation(m) => EventBusError::Validation(m),
            other => EventBusError::StateCorruption(other.to_string()),
        }
    }
}
