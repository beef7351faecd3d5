// Path and File Name : /home/sensor/home-sensor-core/core/fingerprint/src/lib.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Device fingerprinting: signal normalization, composite hashing, and tiered similarity matching

pub mod composite;
pub mod error;
pub mod matcher;
pub mod signals;

pub use composite::{compute_fingerprint, CompositeFingerprint, RawSignals};
pub use error::FingerprintError;
pub use matcher::{default_weights, jaccard_similarity, levenshtein_similarity, match_device, KnownDevice, SIGNAL_THRESHOLD};

#[cfg(test)]
mod tests;
