// Path and File Name : /home/sensor/home-sensor-core/core/deception/src/dns_canary.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: DNS canary monitoring, detecting lookups of hostnames embedded in planted credentials

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sensor_event_bus::EventBus;
use sensor_storage::Storage;
use serde_json::json;
use tracing::debug;

use crate::error::DeceptionError;

/// A single DNS query as observed by whatever is actually sniffing traffic.
/// The deception crate has no opinion on how queries are captured; it only
/// consumes them through [`DnsQuerySource`].
#[derive(Debug, Clone)]
pub struct ObservedDnsQuery {
    pub query_name: String,
    pub source_ip: String,
    pub source_mac: Option<String>,
    pub observed_at: DateTime<Utc>,
}

/// Implemented by whatever component owns the raw packet capture (normally
/// the privileged collaborator process reached over its RPC boundary). Kept
/// as a trait here so this crate never depends on that transport directly.
#[async_trait]
pub trait DnsQuerySource: Send + Sync {
    async fn queries_since(&self, cursor: DateTime<Utc>) -> Result<Vec<ObservedDnsQuery>, DeceptionError>;
}

fn normalize_hostname(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

pub struct DnsCanaryMonitor {
    storage: Arc<Storage>,
    event_bus: Arc<EventBus>,
    source: Arc<dyn DnsQuerySource>,
    last_poll: DateTime<Utc>,
}

impl DnsCanaryMonitor {
    pub fn new(storage: Arc<Storage>, event_bus: Arc<EventBus>, source: Arc<dyn DnsQuerySource>) -> Self {
        Self { storage, event_bus, source, last_poll: Utc::now() }
    }

    /// Polls for queries observed since the last call and records any that
    /// match a planted canary hostname. Returns the number of canary hits.
    pub async fn poll(&mut self) -> Result<u32, DeceptionError> {
        let since = self.last_poll;
        let now = Utc::now();
        let queries = self.source.queries_since(since).await?;
        self.last_poll = now;

        let mut hits = 0u32;
        for query in queries {
            let normalized = normalize_hostname(&query.query_name);
            let Some(credential) = self.storage.find_credential_by_canary_hostname(&normalized).await? else {
                continue;
            };

            self.storage
                .insert_canary_observation(credential.id, &normalized, &query.source_ip, query.source_mac.as_deref(), query.observed_at)
                .await?;
            self.storage.mark_credential_tripped(credential.id, query.observed_at).await?;
            if let Some(decoy_id) = credential.decoy_id {
                self.storage.increment_decoy_credential_trip_count(decoy_id).await?;
            }

            self.event_bus
                .publish(
                    "decoy.credential_trip",
                    json!({
                        "credential_id": credential.id,
                        "canary_hostname": normalized,
                        "source_ip": query.source_ip,
                        "detection_method": "dns_canary",
                    }),
                    None,
                )
                .await?;
            hits += 1;
        }

        if hits > 0 {
            debug!(hits, "dns canary poll recorded hits");
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_trailing_dot_and_lowercases() {
        assert_eq!(normalize_hostname("AWS-ab12cd34.Canary.Home-Sensor.Internal."), "aws-ab12cd34.canary.home-sensor.internal");
    }

    #[test]
    fn normalize_is_idempotent_without_trailing_dot() {
        let once = normalize_hostname("ghp-deadbeef.canary.home-sensor.internal");
        assert_eq!(normalize_hostname(&once), once);
    }
}
