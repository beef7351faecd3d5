// Path and File Name : /home/sensor/home-sensor-core/core/fingerprint/src/tests/mod.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Test module tree for the fingerprinting crate

mod property_tests;
mod signal_tests;
