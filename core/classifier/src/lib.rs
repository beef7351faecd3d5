// Path and File Name : /home/sensor/home-sensor-core/core/classifier/src/lib.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Device classification: local signature DB (OUI/mDNS/DHCP) with optional LLM fallback

pub mod classification;
pub mod classifier;
pub mod error;
pub mod llm_classifier;
pub mod oui_db;
pub mod signatures;

pub use classification::{ClassificationSource, DeviceClassification};
pub use classifier::{DeviceClassifier, LlmClassifier};
pub use error::ClassifierError;
pub use llm_classifier::OpenAICompatibleClassifier;
pub use signatures::{DhcpFingerprintEntry, MdnsPatternEntry, SignatureDB};
