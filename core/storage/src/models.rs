// Path and File Name : /home/sensor/home-sensor-core/core/storage/src/models.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Typed row structs for every table in the embedded sensor schema

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRow {
    pub seq: i64,
    pub event_type: String,
    pub payload: String,
    pub source_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceRow {
    pub id: i64,
    pub ip_address: String,
    pub mac_address: Option<String>,
    pub hostname: Option<String>,
    pub vendor: Option<String>,
    pub device_type: String,
    pub model_name: Option<String>,
    pub area: Option<String>,
    pub custom_name: Option<String>,
    pub notes: Option<String>,
    pub is_online: bool,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceFingerprintRow {
    pub id: i64,
    pub device_id: i64,
    pub mac: Option<String>,
    pub mdns_hostname: Option<String>,
    pub dhcp_hash: Option<String>,
    pub connection_pattern_hash: Option<String>,
    pub open_ports_hash: Option<String>,
    pub composite_hash: Option<String>,
    pub signal_count: i64,
    pub confidence: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceTrustRow {
    pub device_id: i64,
    pub status: String,
    pub approved_by: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IncidentRow {
    pub id: i64,
    pub source_ip: String,
    pub source_mac: Option<String>,
    pub status: String,
    pub severity: String,
    pub alert_count: i64,
    pub first_alert_at: DateTime<Utc>,
    pub last_alert_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HomeAlertRow {
    pub id: i64,
    pub incident_id: Option<i64>,
    pub alert_type: String,
    pub severity: String,
    pub title: String,
    pub detail: String,
    pub source_ip: Option<String>,
    pub source_mac: Option<String>,
    pub device_id: Option<i64>,
    pub decoy_id: Option<i64>,
    pub event_seq: Option<i64>,
    pub read_at: Option<DateTime<Utc>>,
    pub actioned_at: Option<DateTime<Utc>>,
    pub action_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DecoyRow {
    pub id: i64,
    pub name: String,
    pub decoy_type: String,
    pub bind_address: String,
    pub port: i64,
    pub status: String,
    pub config: String,
    pub connection_count: i64,
    pub credential_trip_count: i64,
    pub failure_count: i64,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlantedCredentialRow {
    pub id: i64,
    pub credential_type: String,
    pub credential_value: String,
    pub canary_hostname: Option<String>,
    pub planted_location: String,
    pub decoy_id: Option<i64>,
    pub tripped: bool,
    pub first_tripped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DecoyConnectionRow {
    pub id: i64,
    pub decoy_id: i64,
    pub source_ip: String,
    pub source_mac: Option<String>,
    pub port: i64,
    pub protocol: Option<String>,
    pub request_path: Option<String>,
    pub credential_used: Option<String>,
    pub credential_id: Option<i64>,
    pub event_seq: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CanaryObservationRow {
    pub id: i64,
    pub credential_id: i64,
    pub canary_hostname: String,
    pub queried_by_ip: String,
    pub queried_by_mac: Option<String>,
    pub event_seq: Option<i64>,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConnectionBaselineRow {
    pub id: i64,
    pub device_id: i64,
    pub dest_ip: String,
    pub dest_port: i64,
    pub hit_count: i64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceOpenPortRow {
    pub id: i64,
    pub device_id: i64,
    pub port: i64,
    pub protocol: String,
    pub service_name: Option<String>,
    pub banner: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SecurityInsightStateRow {
    pub id: i64,
    pub device_id: i64,
    pub insight_key: String,
    pub alert_id: i64,
    pub dismissed: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ServiceProfileRow {
    pub id: i64,
    pub device_id: i64,
    pub port: i64,
    pub protocol: String,
    pub http_status: Option<i64>,
    pub headers: Option<String>,
    pub body_snippet: Option<String>,
    pub favicon_hash: Option<String>,
    pub tls_common_name: Option<String>,
    pub tls_issuer: Option<String>,
    pub tls_not_after: Option<DateTime<Utc>>,
    pub banner: Option<String>,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VirtualIpRow {
    pub id: i64,
    pub ip_address: String,
    pub interface: String,
    pub decoy_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MimicTemplateRow {
    pub id: i64,
    pub device_id: i64,
    pub category: String,
    pub route_table: String,
    pub server_header: Option<String>,
    pub credential_strategy: String,
    pub mdns_service_type: String,
    pub mdns_name: String,
    pub ports: String,
    pub created_at: DateTime<Utc>,
}
