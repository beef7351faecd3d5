// Path and File Name : /home/sensor/home-sensor-core/core/incident/src/error.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Typed errors for incident aggregation, retention, and security insight analysis

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IncidentError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transient incident store failure: {0}")]
    Transient(String),

    #[error("incident state corruption: {0}")]
    StateCorruption(String),
}

impl From<sensor_storage::StorageError> for IncidentError {
    fn from(err: sensor_storage::StorageError) -> Self {
        match err {
            sensor_storage::StorageError::Transient(m) => IncidentError::Transient(m),
            sensor_storage::StorageError::Validation(m) => IncidentError::Validation(m),
            sensor_storage::StorageError::NotFound(m) => IncidentError::StateCorruption(format!("expected row missing: {m}")),
            other => IncidentError::StateCorruption(other.to_string()),
        }
    }
}

impl From<sensor_event_bus::EventBusError> for IncidentError {
    fn from(err: sensor_event_bus::EventBusError) -> Self {
        IncidentError::Transient(err.to_string())
    }
}
