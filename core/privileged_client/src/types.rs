// Path and File Name : /home/sensor/home-sensor-core/core/privileged_client/src/types.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Wire types exchanged with the privileged operations collaborator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArpScanEntry {
    pub ip: String,
    pub mac: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceScanEntry {
    pub ip: String,
    pub port: u16,
    pub banner: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsQueryRecord {
    pub query_name: String,
    pub source_ip: String,
    pub timestamp: DateTime<Utc>,
    pub source_mac: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortForwardRule {
    pub from_ip: String,
    pub from_port: u16,
    pub to_ip: String,
    pub to_port: u16,
}

/// Opaque handle for a privileged-port listener bound by the collaborator
/// on the core's behalf. The core never dereferences the underlying file
/// descriptor directly; it only tracks the handle to request a close later.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListenerHandle(pub i64);
