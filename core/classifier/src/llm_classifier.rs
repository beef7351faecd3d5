// Path and File Name : /home/sensor/home-sensor-core/core/classifier/src/llm_classifier.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: OpenAI-compatible chat-completions classifier, usable against cloud APIs or a local LM Studio/Ollama server

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use sensor_fingerprint::CompositeFingerprint;
use serde::Deserialize;
use serde_json::json;

use crate::classification::{ClassificationSource, DeviceClassification};
use crate::classifier::LlmClassifier;
use crate::error::ClassifierError;

const SYSTEM_PROMPT: &str = "You are a network device classifier. Given network fingerprint signals, \
identify the device manufacturer, type, and model. Respond with ONLY a JSON object containing: \
manufacturer (string), device_type (string, e.g. smartphone, laptop, smart_speaker, nas, router, \
printer, camera, smart_tv, game_console, iot_sensor, unknown), model (string or null), confidence \
(float 0.0-1.0).";

static THINK_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());
static JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{[^{}]*\}").unwrap());

fn build_user_prompt(fingerprint: &CompositeFingerprint) -> String {
    let mut lines = vec!["Classify this network device based on the following signals:".to_string()];
    if let Some(mac) = &fingerprint.mac_address {
        let oui = &mac[..mac.len().min(8)];
        lines.push(format!("- MAC OUI prefix: {oui}"));
    }
    if let Some(hostname) = &fingerprint.mdns_hostname {
        lines.push(format!("- mDNS hostname: {hostname}"));
    }
    if let Some(hash) = &fingerprint.dhcp_fingerprint_hash {
        lines.push(format!("- DHCP fingerprint hash: {hash}"));
    }
    if let Some(hash) = &fingerprint.open_ports_hash {
        lines.push(format!("- Open ports hash: {hash}"));
    }
    if let Some(hash) = &fingerprint.connection_pattern_hash {
        lines.push(format!("- Connection pattern hash: {hash}"));
    }
    lines.join("\n")
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct ParsedClassification {
    manufacturer: String,
    device_type: String,
    model: Option<String>,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

fn default_confidence() -> f64 {
    0.5
}

/// Classifies device fingerprints via any endpoint exposing the OpenAI
/// `/v1/chat/completions` contract: the OpenAI API itself, LM Studio, or
/// Ollama in OpenAI-compatible mode.
pub struct OpenAICompatibleClassifier {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAICompatibleClassifier {
    pub fn new(endpoint: &str, model: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, ClassifierError> {
        let mut base = endpoint.trim_end_matches('/').to_string();
        if !base.ends_with("/v1") {
            base = format!("{base}/v1");
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierError::Validation(format!("failed to build http client: {e}")))?;
        Ok(Self {
            endpoint: base,
            model: model.to_string(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl LlmClassifier for OpenAICompatibleClassifier {
    async fn classify(&self, fingerprint: &CompositeFingerprint) -> Result<DeviceClassification, ClassifierError> {
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .json(&json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": SYSTEM_PROMPT},
                    {"role": "user", "content": build_user_prompt(fingerprint)},
                ],
                "temperature": 0.1,
            }));

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClassifierError::Transient(format!("llm request failed: {e}")))?
            .error_for_status()
            .map_err(|e| ClassifierError::Transient(format!("llm returned error status: {e}")))?;

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Transient(format!("llm response not valid json: {e}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ClassifierError::Transient("llm response had no choices".into()))?
            .message
            .content;

        let stripped = THINK_BLOCK.replace_all(&content, "");
        let trimmed = stripped.trim();
        let json_text = JSON_OBJECT.find(trimmed).map(|m| m.as_str()).unwrap_or(trimmed);

        let parsed: ParsedClassification = serde_json::from_str(json_text)
            .map_err(|e| ClassifierError::Transient(format!("llm response not parseable as classification json: {e}")))?;

        Ok(DeviceClassification {
            manufacturer: parsed.manufacturer,
            device_type: parsed.device_type,
            model: parsed.model,
            confidence: parsed.confidence,
            source: ClassificationSource::Llm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_think_blocks_and_extracts_json_object() {
        let raw = "<think>reasoning about the device</think>Here you go: {\"manufacturer\": \"Sonos\", \"device_type\": \"smart_speaker\", \"model\": null, \"confidence\": 0.8}";
        let stripped = THINK_BLOCK.replace_all(raw, "");
        let json_text = JSON_OBJECT.find(stripped.trim()).map(|m| m.as_str()).unwrap();
        let parsed: ParsedClassification = serde_json::from_str(json_text).unwrap();
        assert_eq!(parsed.manufacturer, "Sonos");
        assert_eq!(parsed.confidence, 0.8);
    }

    #[test]
    fn missing_confidence_defaults_to_half() {
        let json_text = r#"{"manufacturer": "Acme", "device_type": "unknown", "model": null}"#;
        let parsed: ParsedClassification = serde_json::from_str(json_text).unwrap();
        assert_eq!(parsed.confidence, 0.5);
    }
}
