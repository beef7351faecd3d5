// Path and File Name : /home/sensor/home-sensor-core/core/fingerprint/src/error.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Typed errors for signal normalization failures

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("invalid MAC address: {0:?}")]
    InvalidMac(String),
}
