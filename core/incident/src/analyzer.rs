// Path and File Name : /home/sensor/home-sensor-core/core/incident/src/analyzer.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Security insight analyzer: turns open-port risk findings into deduplicated, re-activatable alerts

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use sensor_event_bus::EventBus;
use sensor_storage::Storage;
use tracing::info;

use crate::alert_types::AlertType;
use crate::error::IncidentError;
use crate::port_risks::evaluate_device_ports;

pub struct SecurityInsightAnalyzer {
    storage: Arc<Storage>,
    event_bus: Arc<EventBus>,
}

impl SecurityInsightAnalyzer {
    pub fn new(storage: Arc<Storage>, event_bus: Arc<EventBus>) -> Self {
        Self { storage, event_bus }
    }

    /// Evaluates one device's open ports, creating new alerts for newly
    /// observed risky ports, reactivating insights whose port reopened, and
    /// resolving insights whose port has since closed. Returns the number of
    /// new alerts raised.
    pub async fn analyze_device(&self, device_id: i64) -> Result<u32, IncidentError> {
        let device = self.storage.get_device(device_id).await?;

        let open_ports: HashSet<u16> = self
            .storage
            .list_open_ports_for_device(device_id)
            .await?
            .into_iter()
            .filter_map(|row| u16::try_from(row.port).ok())
            .collect();

        let findings = evaluate_device_ports(&open_ports, &device.device_type);
        let mut active_keys = HashSet::new();
        let mut new_alert_count = 0u32;
        let now = Utc::now();

        for finding in &findings {
            let insight_key = format!("risky_port:{}", finding.port);
            active_keys.insert(insight_key.clone());

            match self.storage.find_insight_state(device_id, &insight_key).await? {
                Some(existing) if existing.resolved_at.is_none() => {
                    // Already active, already alerted. Nothing to do.
                    continue;
                }
                Some(existing) => {
                    // Port reopened after having been resolved; reactivate silently.
                    self.storage.resolve_insight_state(existing.id, now).await.ok();
                    self.storage
                        .open_insight_state(device_id, &insight_key, existing.alert_id, now)
                        .await?;
                    continue;
                }
                None => {}
            }

            let display_name = device
                .custom_name
                .clone()
                .or_else(|| device.hostname.clone())
                .unwrap_or_else(|| device.ip_address.clone());
            let title = format!("{} open on {}", finding.service_name, display_name);
            let detail = json!({
                "device_id": device_id,
                "port": finding.port,
                "service_name": finding.service_name,
                "risk_description": finding.risk_description,
                "remediation_steps": finding.remediation,
            })
            .to_string();

            let alert_id = self
                .storage
                .insert_alert(
                    None,
                    AlertType::SecurityPortRisk.as_str(),
                    finding.severity.as_str(),
                    &title,
                    &detail,
                    Some(&device.ip_address),
                    device.mac_address.as_deref(),
                    Some(device_id),
                    now,
                )
                .await?;

            self.storage.open_insight_state(device_id, &insight_key, alert_id, now).await?;
            new_alert_count += 1;

            self.event_bus
                .publish("alert.new", json!({"alert_id": alert_id, "alert_type": AlertType::SecurityPortRisk.as_str()}), Some("incident.analyzer"))
                .await
                .ok();
        }

        for existing in self.storage.list_active_insight_states_for_device(device_id).await? {
            if !active_keys.contains(&existing.insight_key) {
                self.storage.resolve_insight_state(existing.id, now).await?;
            }
        }

        Ok(new_alert_count)
    }

    pub async fn analyze_all_devices(&self) -> Result<u32, IncidentError> {
        let devices = self.storage.list_devices().await?;
        let mut total_new = 0u32;
        for device in devices {
            total_new += self.analyze_device(device.id).await?;
        }
        if total_new > 0 {
            info!(new_alerts = total_new, "security insight sweep raised new alerts");
        }
        Ok(total_new)
    }
}
