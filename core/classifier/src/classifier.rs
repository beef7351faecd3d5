// Path and File Name : /home/sensor/home-sensor-core/core/classifier/src/classifier.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Three-stage device classification chain: local signature DB, optional LLM fallback, graceful unknown degradation

use async_trait::async_trait;
use sensor_fingerprint::CompositeFingerprint;
use tracing::warn;

use crate::classification::DeviceClassification;
use crate::error::ClassifierError;
use crate::signatures::SignatureDB;

/// Pluggable LLM-backed classifier. The one extension seam this crate names;
/// implementations may target a cloud API or a local OpenAI-compatible server.
#[async_trait]
pub trait LlmClassifier: Send + Sync {
    async fn classify(&self, fingerprint: &CompositeFingerprint) -> Result<DeviceClassification, ClassifierError>;
}

/// Local signature DB → LLM fallback → graceful unknown.
pub struct DeviceClassifier {
    signature_db: SignatureDB,
    llm: Option<Box<dyn LlmClassifier>>,
}

impl DeviceClassifier {
    pub fn new(signature_db: SignatureDB, llm: Option<Box<dyn LlmClassifier>>) -> Self {
        Self { signature_db, llm }
    }

    pub async fn classify(&self, fingerprint: &CompositeFingerprint) -> DeviceClassification {
        if let Some(local) = self.classify_local(fingerprint) {
            return local;
        }

        if let Some(llm) = &self.llm {
            match llm.classify(fingerprint).await {
                Ok(result) => return result,
                Err(e) => warn!("LLM classification failed, falling back to unknown: {e}"),
            }
        }

        DeviceClassification::fallback()
    }

    /// Tries OUI, mDNS, and DHCP matching and returns the highest-confidence hit.
    fn classify_local(&self, fingerprint: &CompositeFingerprint) -> Option<DeviceClassification> {
        let mut candidates = Vec::new();

        if let Some(mac) = &fingerprint.mac_address {
            if let Some(result) = self.signature_db.lookup_oui(mac) {
                candidates.push(result);
            }
        }
        if let Some(hostname) = &fingerprint.mdns_hostname {
            if let Some(result) = self.signature_db.match_mdns(hostname) {
                candidates.push(result);
            }
        }
        if let Some(dhcp_hash) = &fingerprint.dhcp_fingerprint_hash {
            if let Some(result) = self.signature_db.match_dhcp(dhcp_hash) {
                candidates.push(result);
            }
        }

        candidates.into_iter().max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::ClassificationSource;

    struct AlwaysFailsLlm;

    #[async_trait]
    impl LlmClassifier for AlwaysFailsLlm {
        async fn classify(&self, _fingerprint: &CompositeFingerprint) -> Result<DeviceClassification, ClassifierError> {
            Err(ClassifierError::Transient("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn local_match_short_circuits_llm() {
        let classifier = DeviceClassifier::new(SignatureDB::with_defaults(), Some(Box::new(AlwaysFailsLlm)));
        let fp = CompositeFingerprint {
            mac_address: Some("B8:27:EB:11:22:33".to_string()),
            ..Default::default()
        };
        let result = classifier.classify(&fp).await;
        assert_eq!(result.source, ClassificationSource::Oui);
    }

    #[tokio::test]
    async fn llm_failure_degrades_to_fallback() {
        let classifier = DeviceClassifier::new(SignatureDB::new(Default::default(), Vec::new()), Some(Box::new(AlwaysFailsLlm)));
        let fp = CompositeFingerprint::default();
        let result = classifier.classify(&fp).await;
        assert_eq!(result.source, ClassificationSource::Fallback);
        assert_eq!(result.confidence, 0.10);
    }

    #[tokio::test]
    async fn no_llm_configured_degrades_to_fallback() {
        let classifier = DeviceClassifier::new(SignatureDB::new(Default::default(), Vec::new()), None);
        let fp = CompositeFingerprint::default();
        let result = classifier.classify(&fp).await;
        assert_eq!(result.source, ClassificationSource::Fallback);
    }
}
