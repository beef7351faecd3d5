// Path and File Name : /home/sensor/home-sensor-core/core/mimic/src/error.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Typed errors for mimic template generation, virtual-IP allocation, and deployment

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MimicError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transient mimic failure: {0}")]
    Transient(String),

    #[error("mimic state corruption: {0}")]
    StateCorruption(String),

    #[error("virtual ip pool exhausted")]
    IpPoolExhausted,
}

impl From<sensor_storage::StorageError> for MimicError {
    fn from(err: sensor_storage::StorageError) -> Self {
        match err {
            sensor_storage::StorageError::Transient(m) => MimicError::Transient(m),
            sensor_storage::StorageError::Validation(m) => MimicError::Validation(m),
            sensor_storage::StorageError::NotFound(m) => MimicError::StateCorruption(format!("expected row missing: {m}")),
            other => MimicError::StateCorruption(other.to_string()),
        }
    }
}

impl From<sensor_event_bus::EventBusError> for MimicError {
    fn from(err: sensor_event_bus::EventBusError) -> Self {
        MimicError::Transient(err.to_string())
    }
}

impl From<sensor_deception::DeceptionError> for MimicError {
    fn from(err: sensor_deception::DeceptionError) -> Self {
        MimicError::Transient(err.to_string())
    }
}

impl From<sensor_privileged_client::PrivilegedClientError> for MimicError {
    fn from(err: sensor_privileged_client::PrivilegedClientError) -> Self {
        MimicError::Transient(err.to_string())
    }
}
