// Path and File Name : /home/sensor/home-sensor-core/core/device_manager/src/error.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Typed errors for device lifecycle management and behavioral baselining

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceManagerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transient device store failure: {0}")]
    Transient(String),

    #[error("device state corruption: {0}")]
    StateCorruption(String),
}

impl From<sensor_storage::StorageError> for DeviceManagerError {
    fn from(err: sensor_storage::StorageError) -> Self {
        match err {
            sensor_storage::StorageError::Transient(m) => DeviceManagerError::Transient(m),
            sensor_storage::StorageError::Validation(m) => DeviceManagerError::Validation(m),
            sensor_storage::StorageError::NotFound(m) => DeviceManagerError::StateCorruption(format!("expected row missing: {m}")),
            other => DeviceManagerError::StateCorruption(other.to_string()),
        }
    }
}

impl From<sensor_event_bus::EventBusError> for DeviceManagerError {
    fn from(err: sensor_event_bus::EventBusError) -> Self {
        DeviceManagerError::Transient(err.to_string())
    }
}

impl From<sensor_fingerprint::FingerprintError> for DeviceManagerError {
    fn from(err: sensor_fingerprint::FingerprintError) -> Self {
        DeviceManagerError::Validation(err.to_string())
    }
}

impl From<sensor_incident::IncidentError> for DeviceManagerError {
    fn from(err: sensor_incident::IncidentError) -> Self {
        match err {
            sensor_incident::IncidentError::Validation(m) => DeviceManagerError::Validation(m),
            sensor_incident::IncidentError::Transient(m) => DeviceManagerError::Transient(m),
            sensor_incident::IncidentError::StateCorruption(m) => DeviceManagerError::StateCorruption(m),
        }
    }
}
