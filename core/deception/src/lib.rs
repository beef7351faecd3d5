// Path and File Name : /home/sensor/home-sensor-core/core/deception/src/lib.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Decoy deployment, HTTP emulation, credential planting, and DNS canary monitoring

pub mod archetypes;
pub mod credentials;
pub mod dns_canary;
pub mod error;
pub mod http_emulator;
pub mod orchestrator;
pub mod registry;

#[cfg(test)]
mod tests;

pub use archetypes::{build_blueprint, DecoyArchetype, DecoyBlueprint, Route, RouteResponse};
pub use credentials::{generate_for_strategy, CredentialType, GeneratedCredential};
pub use dns_canary::{DnsCanaryMonitor, DnsQuerySource, ObservedDnsQuery};
pub use error::DeceptionError;
pub use http_emulator::{start_http_decoy, DecoyConnectionEvent};
pub use orchestrator::{DecoyOrchestrator, ObservedService};
pub use registry::{DecoyRegistry, RunningDecoy};
