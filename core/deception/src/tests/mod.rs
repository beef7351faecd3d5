// Path and File Name : /home/sensor/home-sensor-core/core/deception/src/tests/mod.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Integration tests spanning decoy deployment, connection handling, and DNS canaries

#[cfg(test)]
mod integration_tests;
