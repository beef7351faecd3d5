// Path and File Name : /home/sensor/home-sensor-core/sensor/src/lib.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Library root re-exporting the sensor binary's configuration, error, and orchestrator modules

pub mod config;
pub mod dns_source;
pub mod error;
pub mod orchestrator;

pub use config::SensorConfig;
pub use error::SensorError;
pub use orchestrator::{SensorOrchestrator, SensorState};
