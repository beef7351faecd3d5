// Path and File Name : /home/sensor/home-sensor-core/core/scout/src/lib.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Scout service-fingerprinting engine: scheduled bounded probing of online devices' open ports

pub mod error;
pub mod probes;
pub mod scheduler;

pub use error::ScoutError;
pub use probes::ProbeResult;
pub use scheduler::{ScoutEngine, ScoutStatus, DEFAULT_INITIAL_DELAY_SECONDS, DEFAULT_INTERVAL_MINUTES, DEFAULT_MAX_CONCURRENT_PROBES};
