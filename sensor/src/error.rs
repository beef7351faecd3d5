// Path and File Name : /home/sensor/home-sensor-core/sensor/src/error.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Top-level fail-closed error type aggregating every subsystem's error kind

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("environment validation failed: {0}")]
    EnvironmentValidationFailed(String),

    #[error("storage initialization failed: {0}")]
    StorageInitFailed(String),

    #[error("subsystem failure: {0}")]
    SubsystemFailed(String),

    #[error("fatal state corruption: {0}")]
    StateCorruption(String),
}

impl From<sensor_storage::StorageError> for SensorError {
    fn from(err: sensor_storage::StorageError) -> Self {
        match err {
            sensor_storage::StorageError::StateCorruption(m) => SensorError::StateCorruption(m),
            other => SensorError::SubsystemFailed(other.to_string()),
        }
    }
}

impl From<sensor_event_bus::EventBusError> for SensorError {
    fn from(err: sensor_event_bus::EventBusError) -> Self {
        SensorError::SubsystemFailed(err.to_string())
    }
}

impl From<sensor_device_manager::DeviceManagerError> for SensorError {
    fn from(err: sensor_device_manager::DeviceManagerError) -> Self {
        SensorError::SubsystemFailed(err.to_string())
    }
}

impl From<sensor_deception::DeceptionError> for SensorError {
    fn from(err: sensor_deception::DeceptionError) -> Self {
        SensorError::SubsystemFailed(err.to_string())
    }
}

impl From<sensor_mimic::MimicError> for SensorError {
    fn from(err: sensor_mimic::MimicError) -> Self {
        SensorError::SubsystemFailed(err.to_string())
    }
}

impl From<sensor_incident::IncidentError> for SensorError {
    fn from(err: sensor_incident::IncidentError) -> Self {
        SensorError::SubsystemFailed(err.to_string())
    }
}

impl From<sensor_scout::ScoutError> for SensorError {
    fn from(err: sensor_scout::ScoutError) -> Self {
        SensorError::SubsystemFailed(err.to_string())
    }
}

impl From<sensor_privileged_client::PrivilegedClientError> for SensorError {
    fn from(err: sensor_privileged_client::PrivilegedClientError) -> Self {
        SensorError::SubsystemFailed(err.to_string())
    }
}
