// Path and File Name : /home/sensor/home-sensor-core/core/privileged_client/src/lib.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: RPC contract and client for the privileged operations collaborator process

pub mod client;
pub mod error;
pub mod types;
pub mod uds;

pub use client::PrivilegedOperations;
pub use error::PrivilegedClientError;
pub use types::{ArpScanEntry, DnsQueryRecord, ListenerHandle, PortForwardRule, ServiceScanEntry};
pub use uds::{UnixSocketPrivilegedClient, DEFAULT_RPC_TIMEOUT};
