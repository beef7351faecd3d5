// Path and File Name : /home/sensor/home-sensor-core/core/fingerprint/src/tests/signal_tests.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Signal normalization edge cases across MAC formats and mDNS hostnames

use crate::signals::{hash_connection_pattern, hash_dhcp_options, hash_open_ports, normalize_mac, normalize_mdns};

#[test]
fn normalize_mac_accepts_colon_dash_cisco_and_bare_forms() {
    let expected = "AA:BB:CC:DD:EE:FF";
    assert_eq!(normalize_mac("aa:bb:cc:dd:ee:ff").unwrap(), expected);
    assert_eq!(normalize_mac("AA-BB-CC-DD-EE-FF").unwrap(), expected);
    assert_eq!(normalize_mac("aabb.ccdd.eeff").unwrap(), expected);
    assert_eq!(normalize_mac("AABBCCDDEEFF").unwrap(), expected);
}

#[test]
fn normalize_mac_pads_single_hex_digit_octets() {
    assert_eq!(normalize_mac("a:b:c:d:e:f").unwrap(), "0A:0B:0C:0D:0E:0F");
}

#[test]
fn normalize_mac_rejects_malformed_input() {
    assert!(normalize_mac("not-a-mac").is_err());
    assert!(normalize_mac("aa:bb:cc:dd:ee").is_err());
    assert!(normalize_mac("zz:bb:cc:dd:ee:ff").is_err());
}

#[test]
fn normalize_mdns_strips_local_suffix_and_collapses_hyphens() {
    assert_eq!(normalize_mdns("Kitchen--Cam.local."), "kitchen-cam");
    assert_eq!(normalize_mdns("Kitchen-Cam.local"), "kitchen-cam");
}

#[test]
fn hash_functions_are_order_independent() {
    assert_eq!(hash_dhcp_options(&[53, 1, 3]), hash_dhcp_options(&[1, 3, 53]));
    assert_eq!(hash_open_ports(&[80, 22, 443]), hash_open_ports(&[443, 22, 80]));
    let a = vec![("10.0.0.1".to_string(), 443u16), ("10.0.0.2".to_string(), 80)];
    let b = vec![("10.0.0.2".to_string(), 80u16), ("10.0.0.1".to_string(), 443)];
    assert_eq!(hash_connection_pattern(&a), hash_connection_pattern(&b));
}
