// Path and File Name : /home/sensor/home-sensor-core/core/privileged_client/src/error.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Typed errors for privileged collaborator RPC calls

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrivilegedClientError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transient rpc failure: {0}")]
    Transient(String),

    #[error("rpc call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("privileged collaborator io failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("rpc response malformed: {0}")]
    Protocol(String),
}
