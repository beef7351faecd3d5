// Path and File Name : /home/sensor/home-sensor-core/core/privileged_client/src/client.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Typed RPC trait describing the privileged operations collaborator contract

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::PrivilegedClientError;
use crate::types::{ArpScanEntry, DnsQueryRecord, ListenerHandle, PortForwardRule, ServiceScanEntry};

/// Everything the core needs from the unprivileged/privileged split: raw
/// ARP scanning, privileged-port binding, DNS sniffing, IP aliasing, and
/// packet-filter redirects. The core holds this as `Arc<dyn PrivilegedOperations>`
/// so tests can substitute a fake without touching the real collaborator
/// process or requiring elevated capabilities.
#[async_trait]
pub trait PrivilegedOperations: Send + Sync {
    async fn arp_scan(&self, subnet: &str) -> Result<Vec<ArpScanEntry>, PrivilegedClientError>;

    async fn service_scan(&self, targets: &[String], ports: &[u16]) -> Result<Vec<ServiceScanEntry>, PrivilegedClientError>;

    async fn bind_listener(&self, addr: &str, port: u16) -> Result<ListenerHandle, PrivilegedClientError>;

    async fn start_dns_sniff(&self, interface: &str) -> Result<(), PrivilegedClientError>;

    async fn stop_dns_sniff(&self, interface: &str) -> Result<(), PrivilegedClientError>;

    async fn get_dns_queries(&self, since: DateTime<Utc>) -> Result<Vec<DnsQueryRecord>, PrivilegedClientError>;

    async fn add_ip_alias(&self, ip: &str, interface: &str, mask: &str) -> Result<bool, PrivilegedClientError>;

    async fn remove_ip_alias(&self, ip: &str, interface: &str) -> Result<bool, PrivilegedClientError>;

    async fn setup_port_forwards(&self, rules: &[PortForwardRule], interface: &str) -> Result<bool, PrivilegedClientError>;

    async fn clear_port_forwards(&self) -> Result<bool, PrivilegedClientError>;
}
