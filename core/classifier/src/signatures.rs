// Path and File Name : /home/sensor/home-sensor-core/core/classifier/src/signatures.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Local device signature database: two-tier OUI lookup, DHCP fingerprint hash table, mDNS regex bank

use std::collections::HashMap;

use regex::Regex;

use crate::classification::{ClassificationSource, DeviceClassification};
use crate::oui_db::{CURATED_OUI, MANUFACTURER_TYPES, OUI_DB, BULK_KNOWN_TYPE_CONFIDENCE, BULK_UNKNOWN_TYPE_CONFIDENCE};

pub struct DhcpFingerprintEntry {
    pub manufacturer: String,
    pub device_type: String,
    pub model: Option<String>,
    pub confidence: f64,
}

pub struct MdnsPatternEntry {
    pub pattern: Regex,
    pub manufacturer: String,
    pub device_type: String,
    pub model: Option<String>,
    pub confidence: f64,
}

/// Local signature database. Built once at startup from a curated mDNS
/// pattern bank and an operator-extensible DHCP fingerprint table; OUI
/// tables are compiled in via [`crate::oui_db`].
pub struct SignatureDB {
    dhcp_fingerprints: HashMap<String, DhcpFingerprintEntry>,
    mdns_patterns: Vec<MdnsPatternEntry>,
}

impl SignatureDB {
    pub fn new(dhcp_fingerprints: HashMap<String, DhcpFingerprintEntry>, mdns_patterns: Vec<MdnsPatternEntry>) -> Self {
        Self { dhcp_fingerprints, mdns_patterns }
    }

    /// The default signature bank compiled into the sensor binary.
    pub fn with_defaults() -> Self {
        let mut mdns = Vec::new();
        let bank: &[(&str, &str, &str, Option<&str>, f64)] = &[
            (r"(?i)^sonos-.*$", "Sonos", "smart_speaker", None, 0.75),
            (r"(?i)^amazon-[a-f0-9]+$", "Amazon Technologies", "smart_speaker", Some("Echo"), 0.70),
            (r"(?i)^chromecast.*$", "Google", "smart_tv", Some("Chromecast"), 0.78),
            (r"(?i)^philips-hue$", "Philips", "iot_sensor", Some("Hue Bridge"), 0.80),
            (r"(?i)^hp[a-f0-9]{6}$", "Hewlett Packard", "printer", None, 0.65),
            (r"(?i)^epson[a-f0-9]+$", "Epson", "printer", None, 0.65),
            (r"(?i)^.*-nvr$", "Unknown", "camera", None, 0.55),
            (r"(?i)^synology[a-z0-9_-]*$", "Synology", "nas", None, 0.75),
            (r"(?i)^roku-?[a-f0-9]*$", "Roku", "smart_tv", None, 0.70),
            (r"(?i)^android-[a-f0-9]+$", "Unknown", "smartphone", None, 0.55),
        ];
        for (pattern, manufacturer, device_type, model, confidence) in bank {
            mdns.push(MdnsPatternEntry {
                pattern: Regex::new(pattern).expect("built-in mdns pattern must compile"),
                manufacturer: manufacturer.to_string(),
                device_type: device_type.to_string(),
                model: model.map(str::to_string),
                confidence: *confidence,
            });
        }
        Self::new(HashMap::new(), mdns)
    }

    /// Inserts or replaces a DHCP fingerprint hash entry, e.g. learned
    /// manually from an operator-confirmed device.
    pub fn add_dhcp_fingerprint(&mut self, hash: String, entry: DhcpFingerprintEntry) {
        self.dhcp_fingerprints.insert(hash, entry);
    }

    /// Two-layer OUI lookup: the curated table wins outright; otherwise the
    /// bulk IEEE table yields a manufacturer-only hit at reduced confidence.
    pub fn lookup_oui(&self, mac_address: &str) -> Option<DeviceClassification> {
        let flat: String = mac_address
            .chars()
            .filter(|c| *c != ':' && *c != '-' && *c != '.')
            .collect::<String>()
            .to_uppercase();
        if flat.len() != 12 {
            return None;
        }
        let prefix = format!("{}:{}:{}", &flat[0..2], &flat[2..4], &flat[4..6]);

        if let Some(entry) = CURATED_OUI.get(prefix.as_str()) {
            return Some(DeviceClassification {
                manufacturer: entry.manufacturer.to_string(),
                device_type: entry.device_type.to_string(),
                model: entry.model.map(str::to_string),
                confidence: entry.confidence,
                source: ClassificationSource::Oui,
            });
        }

        if let Some(manufacturer) = OUI_DB.get(prefix.as_str()) {
            let device_type = MANUFACTURER_TYPES.get(manufacturer).copied().unwrap_or("unknown");
            let confidence = if device_type != "unknown" {
                BULK_KNOWN_TYPE_CONFIDENCE
            } else {
                BULK_UNKNOWN_TYPE_CONFIDENCE
            };
            return Some(DeviceClassification {
                manufacturer: manufacturer.to_string(),
                device_type: device_type.to_string(),
                model: None,
                confidence,
                source: ClassificationSource::Oui,
            });
        }

        None
    }

    pub fn match_dhcp(&self, dhcp_hash: &str) -> Option<DeviceClassification> {
        self.dhcp_fingerprints.get(dhcp_hash).map(|entry| DeviceClassification {
            manufacturer: entry.manufacturer.clone(),
            device_type: entry.device_type.clone(),
            model: entry.model.clone(),
            confidence: entry.confidence,
            source: ClassificationSource::Dhcp,
        })
    }

    /// First fullmatch wins, in declaration order.
    pub fn match_mdns(&self, hostname: &str) -> Option<DeviceClassification> {
        for entry in &self.mdns_patterns {
            if entry.pattern.is_match(hostname) && full_match(&entry.pattern, hostname) {
                return Some(DeviceClassification {
                    manufacturer: entry.manufacturer.clone(),
                    device_type: entry.device_type.clone(),
                    model: entry.model.clone(),
                    confidence: entry.confidence,
                    source: ClassificationSource::Mdns,
                });
            }
        }
        None
    }
}

/// `regex` has no native fullmatch; anchor-checks the match spans the whole string.
fn full_match(re: &Regex, haystack: &str) -> bool {
    re.find(haystack).map(|m| m.start() == 0 && m.end() == haystack.len()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curated_oui_wins_over_bulk_table() {
        let db = SignatureDB::with_defaults();
        let result = db.lookup_oui("B8:27:EB:11:22:33").unwrap();
        assert_eq!(result.manufacturer, "Raspberry Pi Foundation");
        assert_eq!(result.source, ClassificationSource::Oui);
    }

    #[test]
    fn bulk_oui_known_type_outranks_unknown_type_confidence() {
        let db = SignatureDB::with_defaults();
        let known_type = db.lookup_oui("18:F0:E4:00:00:01").unwrap();
        assert_eq!(known_type.confidence, BULK_KNOWN_TYPE_CONFIDENCE);
    }

    #[test]
    fn unknown_mac_prefix_returns_none() {
        let db = SignatureDB::with_defaults();
        assert!(db.lookup_oui("00:00:00:00:00:00").is_none());
    }

    #[test]
    fn mdns_pattern_requires_fullmatch() {
        let db = SignatureDB::with_defaults();
        assert!(db.match_mdns("sonos-living-room").is_some());
        assert!(db.match_mdns("not-sonos-but-contains-it-somewhere").is_none());
    }
}
