// Path and File Name : /home/sensor/home-sensor-core/core/mimic/src/lib.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Mimic template generation, virtual-IP allocation, and mimic decoy lifecycle

pub mod error;
pub mod ipalloc;
pub mod orchestrator;
pub mod template;

pub use error::MimicError;
pub use ipalloc::{IpAllocator, VirtualIpManager, DEFAULT_RANGE_END, DEFAULT_RANGE_START};
pub use orchestrator::{MimicOrchestrator, DEFAULT_MAX_MIMIC_DECOYS, PORT_FORWARD_OFFSET};
pub use template::{build_template, mdns_name_for, MimicCategory, MimicTemplate};
