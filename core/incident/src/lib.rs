// Path and File Name : /home/sensor/home-sensor-core/core/incident/src/lib.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Incident aggregation, alert retention, and security insight analysis

pub mod aggregator;
pub mod alert_types;
pub mod analyzer;
pub mod error;
pub mod port_risks;
pub mod retention;

pub use aggregator::{IncidentAggregator, SubmittedAlert};
pub use alert_types::{AlertType, Severity};
pub use analyzer::SecurityInsightAnalyzer;
pub use error::IncidentError;
pub use port_risks::{evaluate_device_ports, PortRisk};
pub use retention::{AlertRetentionService, PurgeResult};
