// Path and File Name : /home/sensor/home-sensor-core/core/incident/src/retention.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Rolling retention purge honoring foreign-key order and active-incident preservation

use std::sync::Arc;

use chrono::{Duration, Utc};
use sensor_storage::Storage;
use tracing::info;

use crate::error::IncidentError;

pub struct AlertRetentionService {
    storage: Arc<Storage>,
    retention_days: i64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PurgeResult {
    pub alerts_purged: u64,
    pub incidents_purged: u64,
    pub events_purged: u64,
    pub decoy_connections_purged: u64,
    pub canary_observations_purged: u64,
}

impl PurgeResult {
    pub fn total_purged(&self) -> u64 {
        self.alerts_purged
            + self.incidents_purged
            + self.events_purged
            + self.decoy_connections_purged
            + self.canary_observations_purged
    }
}

impl AlertRetentionService {
    pub fn new(storage: Arc<Storage>, retention_days: i64) -> Self {
        Self { storage, retention_days }
    }

    /// Purges data older than `retention_days`, in an order that never
    /// violates a foreign-key reference: alerts (except those belonging to
    /// an active incident) before incidents, and incidents before the raw
    /// event/connection/observation logs they summarize. Each stage commits
    /// independently; a later stage still runs if an earlier one partially
    /// failed, so one broken table never blocks the rest of the sweep.
    pub async fn purge(&self) -> Result<PurgeResult, IncidentError> {
        let cutoff = Utc::now() - Duration::days(self.retention_days);
        let mut result = PurgeResult::default();

        let stale_alerts = self.storage.list_alerts_older_than(cutoff).await?;
        if !stale_alerts.is_empty() {
            let ids: Vec<i64> = stale_alerts.iter().map(|a| a.id).collect();
            result.alerts_purged = self.storage.delete_alerts(&ids).await?;
        }

        result.incidents_purged = self.storage.delete_closed_incidents_older_than(cutoff).await?;
        result.events_purged = self.storage.delete_events_older_than(cutoff).await?;
        result.decoy_connections_purged = self.storage.delete_decoy_connections_older_than(cutoff).await?;
        result.canary_observations_purged = self.storage.delete_canary_observations_older_than(cutoff).await?;

        if result.total_purged() > 0 {
            info!(
                alerts = result.alerts_purged,
                incidents = result.incidents_purged,
                events = result.events_purged,
                decoy_connections = result.decoy_connections_purged,
                canary_observations = result.canary_observations_purged,
                "retention purge completed"
            );
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_purged_sums_all_stages() {
        let result = PurgeResult {
            alerts_purged: 3,
            incidents_purged: 1,
            events_purged: 10,
            decoy_connections_purged: 2,
            canary_observations_purged: 0,
        };
        assert_eq!(result.total_purged(), 16);
    }
}
