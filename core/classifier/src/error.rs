// Path and File Name : /home/sensor/home-sensor-core/core/classifier/src/error.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Typed errors for the classification chain

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("llm classification failed: {0}")]
    Transient(String),
}
