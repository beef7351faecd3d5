// Path and File Name : /home/sensor/home-sensor-core/core/classifier/src/classification.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Result type shared by every stage of the classification chain

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceClassification {
    pub manufacturer: String,
    pub device_type: String,
    pub model: Option<String>,
    pub confidence: f64,
    pub source: ClassificationSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationSource {
    Oui,
    Dhcp,
    Mdns,
    Llm,
    Fallback,
}

impl ClassificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationSource::Oui => "oui",
            ClassificationSource::Dhcp => "dhcp",
            ClassificationSource::Mdns => "mdns",
            ClassificationSource::Llm => "llm",
            ClassificationSource::Fallback => "fallback",
        }
    }
}

impl DeviceClassification {
    pub fn fallback() -> Self {
        Self {
            manufacturer: "Unknown".to_string(),
            device_type: "unknown".to_string(),
            model: None,
            confidence: 0.10,
            source: ClassificationSource::Fallback,
        }
    }
}
