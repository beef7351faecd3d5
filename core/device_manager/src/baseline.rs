// Path and File Name : /home/sensor/home-sensor-core/core/device_manager/src/baseline.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Connection baseline collection during learning mode and behavioral anomaly detection afterward

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sensor_incident::{AlertType, IncidentAggregator};
use sensor_storage::Storage;

use crate::error::DeviceManagerError;

const LEARNING_STARTED_AT_KEY: &str = "learning_started_at";

/// Tracks the sensor-wide learning window. Learning start is a single global
/// timestamp (not per device), persisted in `schema_meta` so a restart never
/// silently restarts the clock.
pub struct LearningClock {
    storage: Arc<Storage>,
    learning_duration_hours: i64,
}

impl LearningClock {
    pub fn new(storage: Arc<Storage>, learning_duration_hours: i64) -> Self {
        Self {
            storage,
            learning_duration_hours,
        }
    }

    /// Returns the learning start timestamp, initializing it to now on first
    /// call (e.g. the sensor's first ever boot).
    pub async fn started_at(&self) -> Result<DateTime<Utc>, DeviceManagerError> {
        if let Some(raw) = self.storage.get_meta(LEARNING_STARTED_AT_KEY).await? {
            return DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| DeviceManagerError::StateCorruption(format!("corrupt learning_started_at: {e}")));
        }
        let now = Utc::now();
        self.storage.set_meta(LEARNING_STARTED_AT_KEY, &now.to_rfc3339()).await?;
        Ok(now)
    }

    pub async fn is_learning_active(&self) -> Result<bool, DeviceManagerError> {
        let started = self.started_at().await?;
        Ok(Utc::now() < started + Duration::hours(self.learning_duration_hours))
    }
}

/// Records observed connection destinations into the baseline while the
/// sensor is in learning mode. Only approved devices should be fed here.
pub struct BaselineCollector {
    storage: Arc<Storage>,
}

impl BaselineCollector {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub async fn record_connections(&self, device_id: i64, destinations: &[(String, u16)]) -> Result<u32, DeviceManagerError> {
        let now = Utc::now();
        for (dest_ip, dest_port) in destinations {
            self.storage
                .upsert_connection_baseline(device_id, dest_ip, *dest_port as i64, now)
                .await?;
        }
        Ok(destinations.len() as u32)
    }
}

#[derive(Debug, Clone)]
pub struct Anomaly {
    pub alert_id: i64,
    pub device_id: i64,
    pub dest_ip: String,
    pub dest_port: u16,
}

/// Flags connections to destinations never observed during learning. Devices
/// that never accumulated a baseline are skipped outright, never flagged.
pub struct AnomalyDetector {
    storage: Arc<Storage>,
    aggregator: Arc<IncidentAggregator>,
}

impl AnomalyDetector {
    pub fn new(storage: Arc<Storage>, aggregator: Arc<IncidentAggregator>) -> Self {
        Self { storage, aggregator }
    }

    pub async fn check_device(
        &self,
        device_id: i64,
        destinations: &[(String, u16)],
        source_ip: &str,
        source_mac: Option<&str>,
    ) -> Result<Vec<Anomaly>, DeviceManagerError> {
        let baseline = self.storage.list_baselines_for_device(device_id).await?;
        if baseline.is_empty() {
            return Ok(Vec::new());
        }

        let mut anomalies = Vec::new();
        for (dest_ip, dest_port) in destinations {
            let seen = self.storage.baseline_exists(device_id, dest_ip, *dest_port as i64).await?;
            if seen {
                continue;
            }

            let title = format!("New connection destination: {dest_ip}:{dest_port}");
            let detail = format!("Device contacted {dest_ip}:{dest_port} which was not observed during the learning period.");
            let submitted = self
                .aggregator
                .submit_alert(AlertType::BehavioralAnomaly, &title, &detail, source_ip, source_mac, Some(device_id))
                .await?;

            anomalies.push(Anomaly {
                alert_id: submitted.alert_id,
                device_id,
                dest_ip: dest_ip.clone(),
                dest_port: *dest_port,
            });
        }

        Ok(anomalies)
    }
}
