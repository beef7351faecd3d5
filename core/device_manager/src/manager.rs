// Path and File Name : /home/sensor/home-sensor-core/core/device_manager/src/manager.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Device lifecycle: scan ingestion, tiered fingerprint matching, external-registry enrichment

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sensor_classifier::DeviceClassifier;
use sensor_event_bus::EventBus;
use sensor_fingerprint::{compute_fingerprint, default_weights, match_device, CompositeFingerprint, KnownDevice, RawSignals, SIGNAL_THRESHOLD};
use sensor_storage::{DeviceRow, Storage};
use serde_json::json;
use tokio::sync::Mutex;

use crate::error::DeviceManagerError;

/// Confidence at or above which a matched device is updated in place with no
/// human confirmation required.
pub const AUTO_APPROVE_THRESHOLD: f64 = 0.75;

/// Confidence at or above which a matched device needs human verification
/// rather than being treated as a fresh device.
pub const VERIFY_THRESHOLD: f64 = 0.50;

/// One scan observation of a device on the LAN, already collected by the
/// upstream discovery path (ARP, mDNS browse, DHCP lease, connection log).
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub ip_address: String,
    pub mac: Option<String>,
    pub mdns_hostname: Option<String>,
    pub dhcp_options: Option<Vec<u16>>,
    pub connections: Option<Vec<(String, u16)>>,
    pub open_ports: Option<Vec<u16>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Updated { device_id: i64 },
    NeedsVerification { device_id: i64 },
    Discovered { device_id: i64 },
}

/// Rows used to resolve `(hostname, model, vendor, area)` for MAC-keyed
/// enrichment from an external home-automation registry.
#[derive(Debug, Clone, Default)]
pub struct ExternalDeviceRecord {
    pub mac: String,
    pub hostname: Option<String>,
    pub model_name: Option<String>,
    pub vendor: Option<String>,
    pub area_id: Option<String>,
}

pub struct DeviceManager {
    storage: Arc<Storage>,
    event_bus: Arc<EventBus>,
    classifier: Arc<Mutex<DeviceClassifier>>,
}

impl DeviceManager {
    pub fn new(storage: Arc<Storage>, event_bus: Arc<EventBus>, classifier: DeviceClassifier) -> Self {
        Self {
            storage,
            event_bus,
            classifier: Arc::new(Mutex::new(classifier)),
        }
    }

    /// Normalizes signals, computes a fingerprint, matches against every
    /// known device, then either updates an approved match in place, flags a
    /// weaker match for human verification, or creates a brand-new device
    /// row. `custom_name` is never touched by any branch of this path.
    pub async fn process_scan_result(&self, scan: ScanResult) -> Result<ScanOutcome, DeviceManagerError> {
        let now = Utc::now();

        let raw = RawSignals {
            mac: scan.mac.clone(),
            mdns_hostname: scan.mdns_hostname.clone(),
            dhcp_options: scan.dhcp_options.clone(),
            connections: scan.connections.clone(),
            open_ports: scan.open_ports.clone(),
        };
        let fingerprint = compute_fingerprint(raw)?;

        let connection_destinations: HashSet<String> = scan
            .connections
            .as_ref()
            .map(|conns| conns.iter().map(|(ip, _)| ip.clone()).collect())
            .unwrap_or_default();
        let open_ports: HashSet<u16> = scan.open_ports.clone().unwrap_or_default().into_iter().collect();

        let known_devices = self.load_known_devices().await?;
        let weights = default_weights();
        let (matched_id, confidence) = match_device(
            &fingerprint,
            &known_devices,
            &connection_destinations,
            &open_ports,
            &weights,
            SIGNAL_THRESHOLD,
        );

        if let Some(device_id) = matched_id {
            let trust = self.storage.get_device_trust(device_id).await?;
            let approved = trust.map(|t| t.status == "approved").unwrap_or(false);

            if confidence >= AUTO_APPROVE_THRESHOLD && approved {
                self.reanchor_device(device_id, &scan, &fingerprint, now).await?;
                return Ok(ScanOutcome::Updated { device_id });
            }

            if confidence >= VERIFY_THRESHOLD {
                self.reanchor_device(device_id, &scan, &fingerprint, now).await?;
                self.storage.set_device_trust(device_id, "needs_verification", None, now).await?;
                self.event_bus
                    .publish("device.verification_needed", json!({"device_id": device_id}), Some("device_manager"))
                    .await
                    .ok();
                return Ok(ScanOutcome::NeedsVerification { device_id });
            }
        }

        let device = self
            .storage
            .upsert_device_by_ip(&scan.ip_address, scan.mac.as_deref(), scan.mdns_hostname.as_deref(), now)
            .await?;
        self.storage.set_device_trust(device.id, "unknown", None, now).await?;
        self.store_fingerprint(device.id, &scan, &fingerprint, now).await?;
        self.classify_and_enrich(device.id, &fingerprint).await?;
        self.event_bus
            .publish("device.discovered", json!({"device_id": device.id, "ip_address": device.ip_address}), Some("device_manager"))
            .await
            .ok();
        Ok(ScanOutcome::Discovered { device_id: device.id })
    }

    async fn reanchor_device(
        &self,
        device_id: i64,
        scan: &ScanResult,
        fingerprint: &CompositeFingerprint,
        now: DateTime<Utc>,
    ) -> Result<(), DeviceManagerError> {
        self.storage
            .update_device_network(device_id, &scan.ip_address, scan.mac.as_deref(), scan.mdns_hostname.as_deref(), now)
            .await?;
        self.store_fingerprint(device_id, scan, fingerprint, now).await?;
        Ok(())
    }

    async fn store_fingerprint(
        &self,
        device_id: i64,
        scan: &ScanResult,
        fingerprint: &CompositeFingerprint,
        now: DateTime<Utc>,
    ) -> Result<(), DeviceManagerError> {
        self.storage
            .upsert_fingerprint(
                device_id,
                fingerprint.mac_address.as_deref(),
                fingerprint.mdns_hostname.as_deref(),
                fingerprint.dhcp_fingerprint_hash.as_deref(),
                fingerprint.connection_pattern_hash.as_deref(),
                fingerprint.open_ports_hash.as_deref(),
                fingerprint.composite_hash().as_deref(),
                fingerprint.signal_count() as i64,
                1.0,
                now,
            )
            .await?;

        if let Some(ports) = &scan.open_ports {
            for port in ports {
                self.storage.upsert_open_port(device_id, *port as i64, "tcp", None, None, now).await?;
            }
        }
        Ok(())
    }

    async fn classify_and_enrich(&self, device_id: i64, fingerprint: &CompositeFingerprint) -> Result<(), DeviceManagerError> {
        let classification = self.classifier.lock().await.classify(fingerprint).await;
        self.storage
            .set_device_enrichment(
                device_id,
                Some(&classification.manufacturer),
                &classification.device_type,
                classification.model.as_deref(),
            )
            .await?;
        Ok(())
    }

    async fn load_known_devices(&self) -> Result<Vec<KnownDevice>, DeviceManagerError> {
        let fingerprints = self.storage.list_fingerprints().await?;
        let mut known = Vec::with_capacity(fingerprints.len());
        for fp in fingerprints {
            let baselines = self.storage.list_baselines_for_device(fp.device_id).await?;
            let open_ports_rows = self.storage.list_open_ports_for_device(fp.device_id).await?;
            known.push(KnownDevice {
                device_id: fp.device_id,
                fingerprint: CompositeFingerprint {
                    mac_address: fp.mac,
                    mdns_hostname: fp.mdns_hostname,
                    dhcp_fingerprint_hash: fp.dhcp_hash,
                    connection_pattern_hash: fp.connection_pattern_hash,
                    open_ports_hash: fp.open_ports_hash,
                },
                connection_destinations: baselines.into_iter().map(|b| b.dest_ip).collect(),
                open_ports: open_ports_rows.into_iter().filter_map(|p| u16::try_from(p.port).ok()).collect(),
            });
        }
        Ok(known)
    }

    /// Joins external registry rows onto devices by normalized MAC. Only
    /// fills `vendor` when the current value is `Unknown`; `custom_name` is
    /// never written here.
    pub async fn enrich_device(&self, records: &[ExternalDeviceRecord], area_table: &[(String, String)]) -> Result<u32, DeviceManagerError> {
        let devices = self.storage.list_devices().await?;
        let mut updated = 0u32;

        for record in records {
            let Some(device) = find_by_mac(&devices, &record.mac) else { continue };

            let vendor = if device.vendor.as_deref().unwrap_or("Unknown") == "Unknown" {
                record.vendor.clone().or_else(|| device.vendor.clone())
            } else {
                device.vendor.clone()
            };

            self.storage
                .set_device_enrichment(
                    device.id,
                    vendor.as_deref(),
                    &device.device_type,
                    record.model_name.as_deref().or(device.model_name.as_deref()),
                )
                .await?;

            let area = record
                .area_id
                .as_ref()
                .and_then(|id| area_table.iter().find(|(aid, _)| aid == id))
                .map(|(_, name)| name.clone());

            self.event_bus
                .publish(
                    "device.updated",
                    json!({"device_id": device.id, "area": area, "hostname": record.hostname}),
                    Some("device_manager"),
                )
                .await
                .ok();
            updated += 1;
        }

        Ok(updated)
    }
}

fn find_by_mac<'a>(devices: &'a [DeviceRow], mac: &str) -> Option<&'a DeviceRow> {
    let normalized = mac.to_uppercase();
    devices.iter().find(|d| d.mac_address.as_deref().map(|m| m.to_uppercase()) == Some(normalized.clone()))
}
