// Path and File Name : /home/sensor/home-sensor-core/core/fingerprint/src/tests/property_tests.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Property tests for fingerprint invariants: similarity scores always in [0,1], hashing is order-independent, confidence never exceeds 1.0

use std::collections::HashSet;

use proptest::prelude::*;

use crate::matcher::{default_weights, jaccard_similarity, levenshtein_similarity, match_device, KnownDevice, SIGNAL_THRESHOLD};
use crate::signals::hash_open_ports;
use crate::CompositeFingerprint;

proptest! {
    #[test]
    fn levenshtein_similarity_is_bounded(a in "[a-z0-9-]{0,20}", b in "[a-z0-9-]{0,20}") {
        let sim = levenshtein_similarity(&a, &b);
        prop_assert!((0.0..=1.0).contains(&sim));
    }

    #[test]
    fn jaccard_similarity_is_bounded(a in prop::collection::hash_set(0u16..1000, 0..10), b in prop::collection::hash_set(0u16..1000, 0..10)) {
        let sim = jaccard_similarity(&a, &b);
        prop_assert!((0.0..=1.0).contains(&sim));
    }

    #[test]
    fn hash_open_ports_is_permutation_invariant(mut ports in prop::collection::vec(0u16..65535, 0..20)) {
        let original = hash_open_ports(&ports);
        ports.reverse();
        prop_assert_eq!(hash_open_ports(&ports), original);
    }

    #[test]
    fn match_device_confidence_never_exceeds_one(
        mdns_a in "[a-z-]{1,12}",
        mdns_b in "[a-z-]{1,12}",
    ) {
        let known = KnownDevice {
            device_id: 1,
            fingerprint: CompositeFingerprint { mdns_hostname: Some(mdns_a), ..Default::default() },
            connection_destinations: HashSet::new(),
            open_ports: HashSet::new(),
        };
        let new_fp = CompositeFingerprint { mdns_hostname: Some(mdns_b), ..Default::default() };
        let (_id, confidence) = match_device(
            &new_fp,
            &[known],
            &HashSet::new(),
            &HashSet::new(),
            &default_weights(),
            SIGNAL_THRESHOLD,
        );
        prop_assert!((0.0..=1.0).contains(&confidence));
    }
}
