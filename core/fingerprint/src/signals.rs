// Path and File Name : /home/sensor/home-sensor-core/core/fingerprint/src/signals.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Pure signal extractors that normalize raw network scan data into fingerprint-comparable forms

use sha2::{Digest, Sha256};

use crate::error::FingerprintError;

/// Normalizes a MAC address to uppercase colon-separated form.
///
/// Accepts colon-, dash-, dot- (Cisco triplet), or bare-separated input.
pub fn normalize_mac(mac: &str) -> Result<String, FingerprintError> {
    let mac = mac.trim();
    let invalid = || FingerprintError::InvalidMac(mac.to_string());

    if mac.contains(':') {
        return normalize_parts(&mac.split(':').collect::<Vec<_>>(), invalid);
    }
    if mac.contains('-') {
        return normalize_parts(&mac.split('-').collect::<Vec<_>>(), invalid);
    }
    if mac.contains('.') {
        let groups: Vec<&str> = mac.split('.').collect();
        if groups.len() == 3 && groups.iter().all(|g| g.len() == 4) {
            let flat: String = groups.concat().to_uppercase();
            if flat.len() == 12 && flat.chars().all(|c| c.is_ascii_hexdigit()) {
                return Ok(colonize(&flat));
            }
        }
        return Err(invalid());
    }

    let flat = mac.to_uppercase();
    if flat.len() != 12 || !flat.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    Ok(colonize(&flat))
}

fn colonize(flat: &str) -> String {
    flat.as_bytes()
        .chunks(2)
        .map(|c| std::str::from_utf8(c).unwrap())
        .collect::<Vec<_>>()
        .join(":")
}

fn normalize_parts(
    parts: &[&str],
    invalid: impl Fn() -> FingerprintError,
) -> Result<String, FingerprintError> {
    if parts.len() != 6 {
        return Err(invalid());
    }
    let mut padded = Vec::with_capacity(6);
    for part in parts {
        if part.is_empty() || part.len() > 2 || !part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        padded.push(format!("{:0>2}", part.to_uppercase()));
    }
    Ok(padded.join(":"))
}

/// Normalizes an mDNS hostname: trims, lowercases, strips a `.local`/`.local.`
/// suffix, and collapses runs of hyphens.
pub fn normalize_mdns(hostname: &str) -> String {
    let mut hostname = hostname.trim().to_lowercase();
    if let Some(stripped) = hostname.strip_suffix(".local.") {
        hostname = stripped.to_string();
    } else if let Some(stripped) = hostname.strip_suffix(".local") {
        hostname = stripped.to_string();
    }

    let mut collapsed = String::with_capacity(hostname.len());
    let mut prev_hyphen = false;
    for c in hostname.chars() {
        if c == '-' {
            if !prev_hyphen {
                collapsed.push(c);
            }
            prev_hyphen = true;
        } else {
            collapsed.push(c);
            prev_hyphen = false;
        }
    }
    collapsed
}

fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// SHA-256 of the sorted, comma-joined DHCP option numbers.
pub fn hash_dhcp_options(options: &[u16]) -> String {
    let mut sorted = options.to_vec();
    sorted.sort_unstable();
    let data = sorted.iter().map(u16::to_string).collect::<Vec<_>>().join(",");
    sha256_hex(&data)
}

/// SHA-256 of the sorted, comma-joined `ip:port` connection destinations.
pub fn hash_connection_pattern(connections: &[(String, u16)]) -> String {
    let mut formatted: Vec<String> = connections.iter().map(|(ip, port)| format!("{ip}:{port}")).collect();
    formatted.sort();
    sha256_hex(&formatted.join(","))
}

/// SHA-256 of the sorted, comma-joined open port numbers.
pub fn hash_open_ports(ports: &[u16]) -> String {
    let mut sorted = ports.to_vec();
    sorted.sort_unstable();
    let data = sorted.iter().map(u16::to_string).collect::<Vec<_>>().join(",");
    sha256_hex(&data)
}
