// Path and File Name : /home/sensor/home-sensor-core/core/fingerprint/src/composite.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Composite fingerprint assembly from individual normalized signals

use sha2::{Digest, Sha256};

use crate::error::FingerprintError;
use crate::signals::{hash_connection_pattern, hash_dhcp_options, hash_open_ports, normalize_mac, normalize_mdns};

/// Aggregated device fingerprint. Every field is optional: a fingerprint
/// is valid with any non-empty subset of signals present.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompositeFingerprint {
    pub mac_address: Option<String>,
    pub mdns_hostname: Option<String>,
    pub dhcp_fingerprint_hash: Option<String>,
    pub connection_pattern_hash: Option<String>,
    pub open_ports_hash: Option<String>,
}

impl CompositeFingerprint {
    pub fn signal_count(&self) -> usize {
        [
            &self.mac_address,
            &self.mdns_hostname,
            &self.dhcp_fingerprint_hash,
            &self.connection_pattern_hash,
            &self.open_ports_hash,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count()
    }

    /// SHA-256 over all present signals concatenated in fixed field order.
    /// `None` if no signals are present.
    pub fn composite_hash(&self) -> Option<String> {
        let parts: Vec<&str> = [
            &self.mac_address,
            &self.mdns_hostname,
            &self.dhcp_fingerprint_hash,
            &self.connection_pattern_hash,
            &self.open_ports_hash,
        ]
        .iter()
        .filter_map(|v| v.as_deref())
        .collect();

        if parts.is_empty() {
            return None;
        }
        let mut hasher = Sha256::new();
        hasher.update(parts.concat().as_bytes());
        Some(format!("{:x}", hasher.finalize()))
    }
}

/// Raw signal inputs for fingerprint computation, collected from a scan.
#[derive(Debug, Clone, Default)]
pub struct RawSignals {
    pub mac: Option<String>,
    pub mdns_hostname: Option<String>,
    pub dhcp_options: Option<Vec<u16>>,
    pub connections: Option<Vec<(String, u16)>>,
    pub open_ports: Option<Vec<u16>>,
}

/// Normalizes raw signal data into a composite fingerprint.
pub fn compute_fingerprint(raw: RawSignals) -> Result<CompositeFingerprint, FingerprintError> {
    let mac_address = raw.mac.as_deref().map(normalize_mac).transpose()?;
    let mdns_hostname = raw.mdns_hostname.as_deref().map(normalize_mdns);
    let dhcp_fingerprint_hash = raw.dhcp_options.as_deref().map(hash_dhcp_options);
    let connection_pattern_hash = raw.connections.as_deref().map(hash_connection_pattern);
    let open_ports_hash = raw.open_ports.as_deref().map(hash_open_ports);

    Ok(CompositeFingerprint {
        mac_address,
        mdns_hostname,
        dhcp_fingerprint_hash,
        connection_pattern_hash,
        open_ports_hash,
    })
}
