// Path and File Name : /home/sensor/home-sensor-core/core/incident/src/aggregator.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Groups alerts into time-windowed incidents per source, escalating severity and closing stale incidents

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sensor_event_bus::EventBus;
use sensor_storage::Storage;
use serde_json::json;
use tracing::info;

use crate::alert_types::{AlertType, Severity};
use crate::error::IncidentError;

pub struct IncidentAggregator {
    storage: Arc<Storage>,
    event_bus: Arc<EventBus>,
    incident_window_minutes: i64,
    incident_close_window_minutes: i64,
}

pub struct SubmittedAlert {
    pub alert_id: i64,
    pub incident_id: i64,
}

impl IncidentAggregator {
    pub fn new(
        storage: Arc<Storage>,
        event_bus: Arc<EventBus>,
        incident_window_minutes: i64,
        incident_close_window_minutes: i64,
    ) -> Self {
        Self {
            storage,
            event_bus,
            incident_window_minutes,
            incident_close_window_minutes,
        }
    }

    /// Raises an alert, linking it to an existing active incident for the
    /// same source within the incident window, or opening a new one.
    #[allow(clippy::too_many_arguments)]
    pub async fn submit_alert(
        &self,
        alert_type: AlertType,
        title: &str,
        detail: &str,
        source_ip: &str,
        source_mac: Option<&str>,
        device_id: Option<i64>,
    ) -> Result<SubmittedAlert, IncidentError> {
        let now = Utc::now();
        let severity = alert_type.severity();

        let incident_id = match self.storage.find_active_incident(source_ip).await? {
            Some(incident) => {
                let window_expired = now - incident.last_alert_at
                    > Duration::minutes(self.incident_window_minutes);
                if window_expired {
                    self.close_incident_with_summary(incident.id, incident.last_alert_at).await?;
                    self.open_new_incident(source_ip, source_mac, severity, now).await?
                } else {
                    let current_severity = parse_severity(&incident.severity);
                    let escalated = current_severity.max(severity);
                    self.storage
                        .escalate_incident(incident.id, escalated.as_str(), now)
                        .await?;
                    self.event_bus
                        .publish(
                            "incident.updated",
                            json!({"incident_id": incident.id, "severity": escalated.as_str()}),
                            Some("incident.aggregator"),
                        )
                        .await
                        .ok();
                    incident.id
                }
            }
            None => self.open_new_incident(source_ip, source_mac, severity, now).await?,
        };

        let alert_id = self
            .storage
            .insert_alert(
                Some(incident_id),
                alert_type.as_str(),
                severity.as_str(),
                title,
                detail,
                Some(source_ip),
                source_mac,
                device_id,
                now,
            )
            .await?;

        self.event_bus
            .publish(
                "alert.new",
                json!({"alert_id": alert_id, "incident_id": incident_id, "alert_type": alert_type.as_str()}),
                Some("incident.aggregator"),
            )
            .await
            .ok();

        Ok(SubmittedAlert { alert_id, incident_id })
    }

    async fn open_new_incident(
        &self,
        source_ip: &str,
        source_mac: Option<&str>,
        severity: Severity,
        now: DateTime<Utc>,
    ) -> Result<i64, IncidentError> {
        let incident_id = self
            .storage
            .open_incident(source_ip, source_mac, severity.as_str(), now)
            .await?;
        self.event_bus
            .publish(
                "incident.new",
                json!({"incident_id": incident_id, "source_ip": source_ip, "severity": severity.as_str()}),
                Some("incident.aggregator"),
            )
            .await
            .ok();
        Ok(incident_id)
    }

    async fn close_incident_with_summary(&self, incident_id: i64, at: DateTime<Utc>) -> Result<(), IncidentError> {
        let alerts = self.storage.list_alerts_for_incident(incident_id).await?;
        let summary = format!("{} alert(s), closed after window expiry", alerts.len());
        self.storage.close_incident(incident_id, at, &summary).await?;
        self.event_bus
            .publish("incident.updated", json!({"incident_id": incident_id, "status": "closed"}), Some("incident.aggregator"))
            .await
            .ok();
        Ok(())
    }

    /// Closes any active incident whose last alert is older than the close
    /// window. Intended to run on a periodic sweep.
    pub async fn sweep_stale_incidents(&self) -> Result<u32, IncidentError> {
        let cutoff = Utc::now() - Duration::minutes(self.incident_close_window_minutes);
        let stale = self.storage.list_stale_active_incidents(cutoff).await?;
        let count = stale.len() as u32;
        for incident in stale {
            self.close_incident_with_summary(incident.id, Utc::now()).await?;
        }
        if count > 0 {
            info!(closed = count, "incident close-sweep ran");
        }
        Ok(count)
    }
}

fn parse_severity(raw: &str) -> Severity {
    match raw {
        "critical" => Severity::Critical,
        "high" => Severity::High,
        "medium" => Severity::Medium,
        _ => Severity::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_severity_round_trips_known_strings() {
        assert_eq!(parse_severity("critical"), Severity::Critical);
        assert_eq!(parse_severity("low"), Severity::Low);
        assert_eq!(parse_severity("garbage"), Severity::Low);
    }
}
