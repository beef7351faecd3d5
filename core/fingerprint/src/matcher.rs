// Path and File Name : /home/sensor/home-sensor-core/core/fingerprint/src/matcher.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Tiered fingerprint matcher: min 2 non-MAC signal agreement for a strong match, 1-signal match capped at 0.50, MAC shortcut floored at the auto-approve threshold

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::composite::CompositeFingerprint;

/// Minimum similarity for a signal to count as a "strong match".
pub const SIGNAL_THRESHOLD: f64 = 0.70;

/// MAC-shortcut confidence floor.
const MAC_SHORTCUT_FLOOR: f64 = 0.75;

/// Cap applied when only a single non-MAC signal agrees.
const SINGLE_SIGNAL_CAP: f64 = 0.50;

pub fn default_weights() -> IndexMap<&'static str, f64> {
    IndexMap::from([
        ("mdns", 0.30),
        ("dhcp", 0.25),
        ("connections", 0.25),
        ("mac", 0.10),
        ("ports", 0.10),
    ])
}

/// A previously-identified device with its latest fingerprint, held for matching.
#[derive(Debug, Clone)]
pub struct KnownDevice {
    pub device_id: i64,
    pub fingerprint: CompositeFingerprint,
    pub connection_destinations: HashSet<String>,
    pub open_ports: HashSet<u16>,
}

/// Normalized Levenshtein similarity: 1.0 for identical strings, 0.0 if either is empty.
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (len_a, len_b) = (a.len(), b.len());

    let mut prev: Vec<usize> = (0..=len_b).collect();
    let mut curr = vec![0usize; len_b + 1];

    for i in 1..=len_a {
        curr[0] = i;
        for j in 1..=len_b {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[len_b];
    let max_len = len_a.max(len_b) as f64;
    1.0 - (distance as f64 / max_len)
}

/// `|A ∩ B| / |A ∪ B|`, or 0.0 if both sets are empty.
pub fn jaccard_similarity<T: std::hash::Hash + Eq>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

fn weighted_average(scores: &IndexMap<&'static str, f64>, weights: &IndexMap<&'static str, f64>) -> f64 {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for (signal, score) in scores {
        let w = *weights.get(signal).unwrap_or(&0.0);
        weighted_sum += score * w;
        total_weight += w;
    }
    if total_weight == 0.0 {
        0.0
    } else {
        weighted_sum / total_weight
    }
}

/// Matches a new fingerprint against known devices. Returns `(device_id, confidence)`,
/// or `(None, 0.0)` if nothing matches.
pub fn match_device(
    new_fp: &CompositeFingerprint,
    known_devices: &[KnownDevice],
    connection_destinations: &HashSet<String>,
    open_ports: &HashSet<u16>,
    weights: &IndexMap<&'static str, f64>,
    signal_threshold: f64,
) -> (Option<i64>, f64) {
    if known_devices.is_empty() {
        return (None, 0.0);
    }

    let mut candidates: Vec<(i64, f64)> = Vec::new();

    for known in known_devices {
        let kfp = &known.fingerprint;
        let mut signal_scores: IndexMap<&'static str, f64> = IndexMap::new();

        if let (Some(a), Some(b)) = (&new_fp.mac_address, &kfp.mac_address) {
            signal_scores.insert("mac", if a == b { 1.0 } else { 0.0 });
        }
        if let (Some(a), Some(b)) = (&new_fp.mdns_hostname, &kfp.mdns_hostname) {
            signal_scores.insert("mdns", levenshtein_similarity(a, b));
        }
        if let (Some(a), Some(b)) = (&new_fp.dhcp_fingerprint_hash, &kfp.dhcp_fingerprint_hash) {
            signal_scores.insert("dhcp", if a == b { 1.0 } else { 0.0 });
        }
        if new_fp.connection_pattern_hash.is_some() && kfp.connection_pattern_hash.is_some() {
            signal_scores.insert(
                "connections",
                jaccard_similarity(connection_destinations, &known.connection_destinations),
            );
        }
        if new_fp.open_ports_hash.is_some() && kfp.open_ports_hash.is_some() {
            signal_scores.insert("ports", jaccard_similarity(open_ports, &known.open_ports));
        }

        if signal_scores.is_empty() {
            continue;
        }

        let strong_non_mac = signal_scores
            .iter()
            .filter(|(signal, score)| **signal != "mac" && **score >= signal_threshold)
            .count();

        let mac_exact = signal_scores.get("mac").copied().unwrap_or(0.0) == 1.0;

        if mac_exact && strong_non_mac >= 1 {
            let confidence = weighted_average(&signal_scores, weights).max(MAC_SHORTCUT_FLOOR);
            candidates.push((known.device_id, confidence));
        } else if strong_non_mac >= 2 {
            candidates.push((known.device_id, weighted_average(&signal_scores, weights)));
        } else if strong_non_mac == 1 {
            let confidence = weighted_average(&signal_scores, weights).min(SINGLE_SIGNAL_CAP);
            candidates.push((known.device_id, confidence));
        }
    }

    // known_devices is walked in ascending device_id order, so candidates are
    // appended in that same order; a strict `>` keeps the first (lowest
    // device_id) entry on a confidence tie instead of the last.
    let mut best: Option<(i64, f64)> = None;
    for candidate in candidates {
        match best {
            Some((_, best_conf)) if candidate.1 > best_conf => best = Some(candidate),
            None => best = Some(candidate),
            _ => {}
        }
    }
    best.map_or((None, 0.0), |(id, conf)| (Some(id), conf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_identical_strings_is_one() {
        assert_eq!(levenshtein_similarity("kitchen-cam", "kitchen-cam"), 1.0);
    }

    #[test]
    fn levenshtein_empty_string_is_zero() {
        assert_eq!(levenshtein_similarity("", "kitchen-cam"), 0.0);
    }

    #[test]
    fn jaccard_both_empty_is_zero() {
        let a: HashSet<u16> = HashSet::new();
        let b: HashSet<u16> = HashSet::new();
        assert_eq!(jaccard_similarity(&a, &b), 0.0);
    }

    #[test]
    fn mac_shortcut_floors_confidence_at_point_seven_five() {
        let known = KnownDevice {
            device_id: 1,
            fingerprint: CompositeFingerprint {
                mac_address: Some("AA:BB:CC:DD:EE:FF".into()),
                mdns_hostname: Some("kitchen-cam".into()),
                ..Default::default()
            },
            connection_destinations: HashSet::new(),
            open_ports: HashSet::new(),
        };
        let new_fp = CompositeFingerprint {
            mac_address: Some("AA:BB:CC:DD:EE:FF".into()),
            mdns_hostname: Some("kitchen-camx".into()),
            ..Default::default()
        };
        let (id, confidence) = match_device(
            &new_fp,
            &[known],
            &HashSet::new(),
            &HashSet::new(),
            &default_weights(),
            SIGNAL_THRESHOLD,
        );
        assert_eq!(id, Some(1));
        assert!(confidence >= 0.75);
    }

    #[test]
    fn single_weak_signal_is_capped_at_point_five() {
        let known = KnownDevice {
            device_id: 2,
            fingerprint: CompositeFingerprint {
                mdns_hostname: Some("living-room-tv".into()),
                ..Default::default()
            },
            connection_destinations: HashSet::new(),
            open_ports: HashSet::new(),
        };
        let new_fp = CompositeFingerprint {
            mdns_hostname: Some("living-room-tv".into()),
            ..Default::default()
        };
        let (id, confidence) = match_device(
            &new_fp,
            &[known],
            &HashSet::new(),
            &HashSet::new(),
            &default_weights(),
            SIGNAL_THRESHOLD,
        );
        assert_eq!(id, Some(2));
        assert!(confidence <= SINGLE_SIGNAL_CAP + f64::EPSILON);
    }

    #[test]
    fn no_known_devices_returns_no_match() {
        let new_fp = CompositeFingerprint::default();
        let (id, confidence) = match_device(
            &new_fp,
            &[],
            &HashSet::new(),
            &HashSet::new(),
            &default_weights(),
            SIGNAL_THRESHOLD,
        );
        assert_eq!(id, None);
        assert_eq!(confidence, 0.0);
    }
}
