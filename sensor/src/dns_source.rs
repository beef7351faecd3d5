// Path and File Name : /home/sensor/home-sensor-core/sensor/src/dns_source.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Adapts the privileged RPC client's DNS query feed to the deception crate's DnsQuerySource trait

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sensor_deception::{DeceptionError, DnsQuerySource, ObservedDnsQuery};
use sensor_privileged_client::PrivilegedOperations;

/// Bridges `PrivilegedOperations::get_dns_queries` to the deception crate's
/// `DnsQuerySource`, so `DnsCanaryMonitor` never needs to know it's talking
/// to a Unix socket RPC client.
pub struct PrivilegedDnsQuerySource {
    privileged: Arc<dyn PrivilegedOperations>,
}

impl PrivilegedDnsQuerySource {
    pub fn new(privileged: Arc<dyn PrivilegedOperations>) -> Self {
        Self { privileged }
    }
}

#[async_trait]
impl DnsQuerySource for PrivilegedDnsQuerySource {
    async fn queries_since(&self, cursor: DateTime<Utc>) -> Result<Vec<ObservedDnsQuery>, DeceptionError> {
        let records = self
            .privileged
            .get_dns_queries(cursor)
            .await
            .map_err(|e| DeceptionError::Transient(e.to_string()))?;

        Ok(records
            .into_iter()
            .map(|record| ObservedDnsQuery {
                query_name: record.query_name,
                source_ip: record.source_ip,
                source_mac: record.source_mac,
                observed_at: record.timestamp,
            })
            .collect())
    }
}
