// Path and File Name : /home/sensor/home-sensor-core/core/storage/src/lib.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Embedded SQLite storage layer: pool wiring, migrations, and typed repository access for every sensor subsystem

pub mod error;
pub mod migrations;
pub mod models;

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{info, warn};

pub use error::StorageError;
pub use models::*;

/// Wraps the single sensor-wide SQLite connection pool.
///
/// `max_connections(1)` is deliberate: the sensor data model assumes one
/// writer, and SQLite's own locking makes a larger pool pure contention
/// without any throughput gain for this workload.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn connect(database_path: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_path)
            .map_err(|e| StorageError::Validation(format!("invalid database path: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::StateCorruption(format!("failed to open database: {e}")))?;

        migrations::apply_all(&pool).await?;
        info!("storage layer ready at {}", database_path);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ---- events -------------------------------------------------------

    pub async fn insert_event(
        &self,
        event_type: &str,
        payload: &str,
        source_id: Option<&str>,
    ) -> Result<i64, StorageError> {
        let rec = sqlx::query_as::<_, (i64,)>(
            "INSERT INTO events (event_type, payload, source_id) VALUES (?1, ?2, ?3) RETURNING seq",
        )
        .bind(event_type)
        .bind(payload)
        .bind(source_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec.0)
    }

    pub async fn fetch_events_since(&self, since_seq: i64, limit: i64) -> Result<Vec<EventRow>, StorageError> {
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT seq, event_type, payload, source_id, created_at FROM events WHERE seq > ?1 ORDER BY seq ASC LIMIT ?2",
        )
        .bind(since_seq)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn max_event_seq(&self) -> Result<i64, StorageError> {
        let rec = sqlx::query_as::<_, (Option<i64>,)>("SELECT MAX(seq) FROM events")
            .fetch_one(&self.pool)
            .await?;
        Ok(rec.0.unwrap_or(0))
    }

    // ---- devices --------------------------------------------------------

    pub async fn upsert_device_by_ip(
        &self,
        ip_address: &str,
        mac_address: Option<&str>,
        hostname: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DeviceRow, StorageError> {
        sqlx::query(
            "INSERT INTO devices (ip_address, mac_address, hostname, device_type, first_seen, last_seen)
             VALUES (?1, ?2, ?3, 'unknown', ?4, ?4)
             ON CONFLICT(ip_address) DO UPDATE SET
                mac_address = COALESCE(excluded.mac_address, devices.mac_address),
                hostname = COALESCE(excluded.hostname, devices.hostname),
                is_online = 1,
                last_seen = excluded.last_seen",
        )
        .bind(ip_address)
        .bind(mac_address)
        .bind(hostname)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_device_by_ip(ip_address)
            .await?
            .ok_or_else(|| StorageError::StateCorruption("device vanished after upsert".into()))
    }

    pub async fn get_device_by_ip(&self, ip_address: &str) -> Result<Option<DeviceRow>, StorageError> {
        let row = sqlx::query_as::<_, DeviceRow>("SELECT * FROM devices WHERE ip_address = ?1")
            .bind(ip_address)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn get_device(&self, device_id: i64) -> Result<DeviceRow, StorageError> {
        sqlx::query_as::<_, DeviceRow>("SELECT * FROM devices WHERE id = ?1")
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("device {device_id}")))
    }

    pub async fn list_devices(&self) -> Result<Vec<DeviceRow>, StorageError> {
        Ok(sqlx::query_as::<_, DeviceRow>("SELECT * FROM devices ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?)
    }

    /// `custom_name` is inviolate: classifier/enrichment paths must never pass
    /// through this method to clear a name a person set.
    pub async fn set_device_enrichment(
        &self,
        device_id: i64,
        vendor: Option<&str>,
        device_type: &str,
        model_name: Option<&str>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "UPDATE devices SET vendor = ?2, device_type = ?3, model_name = ?4 WHERE id = ?1",
        )
        .bind(device_id)
        .bind(vendor)
        .bind(device_type)
        .bind(model_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_device_custom_name(&self, device_id: i64, custom_name: &str) -> Result<(), StorageError> {
        sqlx::query("UPDATE devices SET custom_name = ?2 WHERE id = ?1")
            .bind(device_id)
            .bind(custom_name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Updates a device's network identity (IP/MAC/hostname) and `last_seen`,
    /// keyed by id rather than IP. Used to re-anchor a device that the
    /// fingerprint matcher re-identified under a new IP (DHCP lease churn).
    pub async fn update_device_network(
        &self,
        device_id: i64,
        ip_address: &str,
        mac_address: Option<&str>,
        hostname: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "UPDATE devices SET ip_address = ?2, mac_address = COALESCE(?3, mac_address),
             hostname = COALESCE(?4, hostname), is_online = 1, last_seen = ?5 WHERE id = ?1",
        )
        .bind(device_id)
        .bind(ip_address)
        .bind(mac_address)
        .bind(hostname)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_device_offline(&self, device_id: i64) -> Result<(), StorageError> {
        sqlx::query("UPDATE devices SET is_online = 0 WHERE id = ?1")
            .bind(device_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ---- fingerprints ---------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_fingerprint(
        &self,
        device_id: i64,
        mac: Option<&str>,
        mdns_hostname: Option<&str>,
        dhcp_hash: Option<&str>,
        connection_pattern_hash: Option<&str>,
        open_ports_hash: Option<&str>,
        composite_hash: Option<&str>,
        signal_count: i64,
        confidence: f64,
        now: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        let existing = sqlx::query_as::<_, (i64,)>(
            "SELECT id FROM device_fingerprints WHERE device_id = ?1",
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((id,)) = existing {
            sqlx::query(
                "UPDATE device_fingerprints SET mac = ?2, mdns_hostname = ?3, dhcp_hash = ?4,
                 connection_pattern_hash = ?5, open_ports_hash = ?6, composite_hash = ?7,
                 signal_count = ?8, confidence = ?9, last_seen = ?10 WHERE id = ?1",
            )
            .bind(id)
            .bind(mac)
            .bind(mdns_hostname)
            .bind(dhcp_hash)
            .bind(connection_pattern_hash)
            .bind(open_ports_hash)
            .bind(composite_hash)
            .bind(signal_count)
            .bind(confidence)
            .bind(now)
            .execute(&self.pool)
            .await?;
            Ok(id)
        } else {
            let rec = sqlx::query_as::<_, (i64,)>(
                "INSERT INTO device_fingerprints
                 (device_id, mac, mdns_hostname, dhcp_hash, connection_pattern_hash, open_ports_hash,
                  composite_hash, signal_count, confidence, first_seen, last_seen)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10) RETURNING id",
            )
            .bind(device_id)
            .bind(mac)
            .bind(mdns_hostname)
            .bind(dhcp_hash)
            .bind(connection_pattern_hash)
            .bind(open_ports_hash)
            .bind(composite_hash)
            .bind(signal_count)
            .bind(confidence)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
            Ok(rec.0)
        }
    }

    pub async fn list_fingerprints(&self) -> Result<Vec<DeviceFingerprintRow>, StorageError> {
        Ok(sqlx::query_as::<_, DeviceFingerprintRow>("SELECT * FROM device_fingerprints ORDER BY device_id ASC")
            .fetch_all(&self.pool)
            .await?)
    }

    // ---- trust ------------------------------------------------------------

    pub async fn set_device_trust(
        &self,
        device_id: i64,
        status: &str,
        approved_by: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO device_trust (device_id, status, approved_by, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(device_id) DO UPDATE SET status = excluded.status, approved_by = excluded.approved_by,
             updated_at = excluded.updated_at",
        )
        .bind(device_id)
        .bind(status)
        .bind(approved_by)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_device_trust(&self, device_id: i64) -> Result<Option<DeviceTrustRow>, StorageError> {
        Ok(sqlx::query_as::<_, DeviceTrustRow>("SELECT * FROM device_trust WHERE device_id = ?1")
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    // ---- incidents & alerts -------------------------------------------

    pub async fn find_active_incident(&self, source_ip: &str) -> Result<Option<IncidentRow>, StorageError> {
        Ok(sqlx::query_as::<_, IncidentRow>(
            "SELECT * FROM incidents WHERE source_ip = ?1 AND status = 'active' ORDER BY id DESC LIMIT 1",
        )
        .bind(source_ip)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn open_incident(
        &self,
        source_ip: &str,
        source_mac: Option<&str>,
        severity: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        let rec = sqlx::query_as::<_, (i64,)>(
            "INSERT INTO incidents (source_ip, source_mac, status, severity, alert_count, first_alert_at, last_alert_at)
             VALUES (?1, ?2, 'active', ?3, 0, ?4, ?4) RETURNING id",
        )
        .bind(source_ip)
        .bind(source_mac)
        .bind(severity)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec.0)
    }

    pub async fn escalate_incident(
        &self,
        incident_id: i64,
        severity: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "UPDATE incidents SET severity = ?2, alert_count = alert_count + 1, last_alert_at = ?3 WHERE id = ?1",
        )
        .bind(incident_id)
        .bind(severity)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn close_incident(&self, incident_id: i64, now: DateTime<Utc>, summary: &str) -> Result<(), StorageError> {
        sqlx::query("UPDATE incidents SET status = 'closed', closed_at = ?2, summary = ?3 WHERE id = ?1")
            .bind(incident_id)
            .bind(now)
            .bind(summary)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_stale_active_incidents(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<IncidentRow>, StorageError> {
        Ok(sqlx::query_as::<_, IncidentRow>(
            "SELECT * FROM incidents WHERE status = 'active' AND last_alert_at < ?1",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_alert(
        &self,
        incident_id: Option<i64>,
        alert_type: &str,
        severity: &str,
        title: &str,
        detail: &str,
        source_ip: Option<&str>,
        source_mac: Option<&str>,
        device_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        let rec = sqlx::query_as::<_, (i64,)>(
            "INSERT INTO home_alerts
             (incident_id, alert_type, severity, title, detail, source_ip, source_mac, device_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) RETURNING id",
        )
        .bind(incident_id)
        .bind(alert_type)
        .bind(severity)
        .bind(title)
        .bind(detail)
        .bind(source_ip)
        .bind(source_mac)
        .bind(device_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec.0)
    }

    pub async fn list_alerts_for_incident(&self, incident_id: i64) -> Result<Vec<HomeAlertRow>, StorageError> {
        Ok(sqlx::query_as::<_, HomeAlertRow>(
            "SELECT * FROM home_alerts WHERE incident_id = ?1 ORDER BY created_at ASC",
        )
        .bind(incident_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn list_alerts_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<HomeAlertRow>, StorageError> {
        Ok(sqlx::query_as::<_, HomeAlertRow>(
            "SELECT a.* FROM home_alerts a
             LEFT JOIN incidents i ON a.incident_id = i.id
             WHERE a.created_at < ?1 AND (i.id IS NULL OR i.status != 'active')",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn delete_alerts(&self, ids: &[i64]) -> Result<u64, StorageError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut affected = 0u64;
        for id in ids {
            let res = sqlx::query("DELETE FROM home_alerts WHERE id = ?1").bind(id).execute(&self.pool).await?;
            affected += res.rows_affected();
        }
        Ok(affected)
    }

    pub async fn delete_closed_incidents_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM incidents WHERE status = 'closed' AND closed_at < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    pub async fn delete_events_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM events WHERE created_at < ?1").bind(cutoff).execute(&self.pool).await?;
        Ok(res.rows_affected())
    }

    pub async fn delete_decoy_connections_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM decoy_connections WHERE timestamp < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    pub async fn delete_canary_observations_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM canary_observations WHERE observed_at < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    // ---- decoys ------------------------------------------------------------

    pub async fn insert_decoy(
        &self,
        name: &str,
        decoy_type: &str,
        bind_address: &str,
        port: i64,
        config: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        let rec = sqlx::query_as::<_, (i64,)>(
            "INSERT INTO decoys (name, decoy_type, bind_address, port, status, config, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 'stopped', ?5, ?6, ?6) RETURNING id",
        )
        .bind(name)
        .bind(decoy_type)
        .bind(bind_address)
        .bind(port)
        .bind(config)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec.0)
    }

    /// Rewrites the persisted port once a `port=0` decoy has actually bound
    /// to an OS-assigned one, so the stored row reflects where it's really
    /// listening rather than the caller's "pick one for me" sentinel.
    pub async fn update_decoy_port(&self, decoy_id: i64, port: i64, now: DateTime<Utc>) -> Result<(), StorageError> {
        sqlx::query("UPDATE decoys SET port = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(decoy_id)
            .bind(port)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_decoy_status(&self, decoy_id: i64, status: &str, now: DateTime<Utc>) -> Result<(), StorageError> {
        sqlx::query("UPDATE decoys SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(decoy_id)
            .bind(status)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn record_decoy_failure(&self, decoy_id: i64, now: DateTime<Utc>) -> Result<i64, StorageError> {
        sqlx::query("UPDATE decoys SET failure_count = failure_count + 1, last_failure_at = ?2 WHERE id = ?1")
            .bind(decoy_id)
            .bind(now)
            .execute(&self.pool)
            .await?;
        let rec = sqlx::query_as::<_, (i64,)>("SELECT failure_count FROM decoys WHERE id = ?1")
            .bind(decoy_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(rec.0)
    }

    pub async fn reset_decoy_failures(&self, decoy_id: i64) -> Result<(), StorageError> {
        sqlx::query("UPDATE decoys SET failure_count = 0, last_failure_at = NULL WHERE id = ?1")
            .bind(decoy_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_decoys(&self) -> Result<Vec<DecoyRow>, StorageError> {
        Ok(sqlx::query_as::<_, DecoyRow>("SELECT * FROM decoys ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get_decoy(&self, decoy_id: i64) -> Result<DecoyRow, StorageError> {
        sqlx::query_as::<_, DecoyRow>("SELECT * FROM decoys WHERE id = ?1")
            .bind(decoy_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("decoy {decoy_id}")))
    }

    pub async fn increment_decoy_connection_count(&self, decoy_id: i64) -> Result<(), StorageError> {
        sqlx::query("UPDATE decoys SET connection_count = connection_count + 1 WHERE id = ?1")
            .bind(decoy_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn increment_decoy_credential_trip_count(&self, decoy_id: i64) -> Result<(), StorageError> {
        sqlx::query("UPDATE decoys SET credential_trip_count = credential_trip_count + 1 WHERE id = ?1")
            .bind(decoy_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ---- planted credentials & canaries ---------------------------------

    pub async fn insert_credential(
        &self,
        credential_type: &str,
        credential_value: &str,
        canary_hostname: Option<&str>,
        planted_location: &str,
        decoy_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        let rec = sqlx::query_as::<_, (i64,)>(
            "INSERT INTO planted_credentials
             (credential_type, credential_value, canary_hostname, planted_location, decoy_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING id",
        )
        .bind(credential_type)
        .bind(credential_value)
        .bind(canary_hostname)
        .bind(planted_location)
        .bind(decoy_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec.0)
    }

    pub async fn find_credential_by_value(&self, value: &str) -> Result<Option<PlantedCredentialRow>, StorageError> {
        Ok(sqlx::query_as::<_, PlantedCredentialRow>(
            "SELECT * FROM planted_credentials WHERE credential_value = ?1",
        )
        .bind(value)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn find_credential_by_canary_hostname(
        &self,
        hostname: &str,
    ) -> Result<Option<PlantedCredentialRow>, StorageError> {
        Ok(sqlx::query_as::<_, PlantedCredentialRow>(
            "SELECT * FROM planted_credentials WHERE canary_hostname = ?1",
        )
        .bind(hostname)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn mark_credential_tripped(&self, credential_id: i64, now: DateTime<Utc>) -> Result<(), StorageError> {
        sqlx::query(
            "UPDATE planted_credentials SET tripped = 1, first_tripped_at = COALESCE(first_tripped_at, ?2) WHERE id = ?1",
        )
        .bind(credential_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_decoy_connection(
        &self,
        decoy_id: i64,
        source_ip: &str,
        source_mac: Option<&str>,
        port: i64,
        protocol: Option<&str>,
        request_path: Option<&str>,
        credential_used: Option<&str>,
        credential_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        let rec = sqlx::query_as::<_, (i64,)>(
            "INSERT INTO decoy_connections
             (decoy_id, source_ip, source_mac, port, protocol, request_path, credential_used, credential_id, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) RETURNING id",
        )
        .bind(decoy_id)
        .bind(source_ip)
        .bind(source_mac)
        .bind(port)
        .bind(protocol)
        .bind(request_path)
        .bind(credential_used)
        .bind(credential_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec.0)
    }

    pub async fn insert_canary_observation(
        &self,
        credential_id: i64,
        canary_hostname: &str,
        queried_by_ip: &str,
        queried_by_mac: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        let rec = sqlx::query_as::<_, (i64,)>(
            "INSERT INTO canary_observations
             (credential_id, canary_hostname, queried_by_ip, queried_by_mac, observed_at)
             VALUES (?1, ?2, ?3, ?4, ?5) RETURNING id",
        )
        .bind(credential_id)
        .bind(canary_hostname)
        .bind(queried_by_ip)
        .bind(queried_by_mac)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec.0)
    }

    // ---- connection baselines & open ports ------------------------------

    pub async fn upsert_connection_baseline(
        &self,
        device_id: i64,
        dest_ip: &str,
        dest_port: i64,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO connection_baselines (device_id, dest_ip, dest_port, hit_count, first_seen, last_seen)
             VALUES (?1, ?2, ?3, 1, ?4, ?4)
             ON CONFLICT(device_id, dest_ip, dest_port) DO UPDATE SET
                hit_count = connection_baselines.hit_count + 1,
                last_seen = excluded.last_seen",
        )
        .bind(device_id)
        .bind(dest_ip)
        .bind(dest_port)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn baseline_exists(&self, device_id: i64, dest_ip: &str, dest_port: i64) -> Result<bool, StorageError> {
        let rec = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM connection_baselines WHERE device_id = ?1 AND dest_ip = ?2 AND dest_port = ?3",
        )
        .bind(device_id)
        .bind(dest_ip)
        .bind(dest_port)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec.0 > 0)
    }

    pub async fn list_baselines_for_device(&self, device_id: i64) -> Result<Vec<ConnectionBaselineRow>, StorageError> {
        Ok(sqlx::query_as::<_, ConnectionBaselineRow>(
            "SELECT * FROM connection_baselines WHERE device_id = ?1",
        )
        .bind(device_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn upsert_open_port(
        &self,
        device_id: i64,
        port: i64,
        protocol: &str,
        service_name: Option<&str>,
        banner: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO device_open_ports (device_id, port, protocol, service_name, banner, first_seen, last_seen)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(device_id, port, protocol) DO UPDATE SET
                service_name = excluded.service_name, banner = excluded.banner, last_seen = excluded.last_seen",
        )
        .bind(device_id)
        .bind(port)
        .bind(protocol)
        .bind(service_name)
        .bind(banner)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_open_ports_for_device(&self, device_id: i64) -> Result<Vec<DeviceOpenPortRow>, StorageError> {
        Ok(sqlx::query_as::<_, DeviceOpenPortRow>(
            "SELECT * FROM device_open_ports WHERE device_id = ?1",
        )
        .bind(device_id)
        .fetch_all(&self.pool)
        .await?)
    }

    // ---- security insights ------------------------------------------------

    pub async fn find_insight_state(
        &self,
        device_id: i64,
        insight_key: &str,
    ) -> Result<Option<SecurityInsightStateRow>, StorageError> {
        Ok(sqlx::query_as::<_, SecurityInsightStateRow>(
            "SELECT * FROM security_insight_state WHERE device_id = ?1 AND insight_key = ?2",
        )
        .bind(device_id)
        .bind(insight_key)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn open_insight_state(
        &self,
        device_id: i64,
        insight_key: &str,
        alert_id: i64,
        now: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        let rec = sqlx::query_as::<_, (i64,)>(
            "INSERT INTO security_insight_state (device_id, insight_key, alert_id, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(device_id, insight_key) DO UPDATE SET
                alert_id = excluded.alert_id, dismissed = 0, resolved_at = NULL
             RETURNING id",
        )
        .bind(device_id)
        .bind(insight_key)
        .bind(alert_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec.0)
    }

    pub async fn list_active_insight_states_for_device(
        &self,
        device_id: i64,
    ) -> Result<Vec<SecurityInsightStateRow>, StorageError> {
        Ok(sqlx::query_as::<_, SecurityInsightStateRow>(
            "SELECT * FROM security_insight_state WHERE device_id = ?1 AND resolved_at IS NULL",
        )
        .bind(device_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn resolve_insight_state(&self, id: i64, now: DateTime<Utc>) -> Result<(), StorageError> {
        sqlx::query("UPDATE security_insight_state SET resolved_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ---- service profiles -------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_service_profile(
        &self,
        device_id: i64,
        port: i64,
        protocol: &str,
        http_status: Option<i64>,
        headers: Option<&str>,
        body_snippet: Option<&str>,
        favicon_hash: Option<&str>,
        tls_common_name: Option<&str>,
        tls_issuer: Option<&str>,
        tls_not_after: Option<DateTime<Utc>>,
        banner: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO service_profiles
             (device_id, port, protocol, http_status, headers, body_snippet, favicon_hash,
              tls_common_name, tls_issuer, tls_not_after, banner, observed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(device_id, port, protocol) DO UPDATE SET
                http_status = excluded.http_status, headers = excluded.headers,
                body_snippet = excluded.body_snippet, favicon_hash = excluded.favicon_hash,
                tls_common_name = excluded.tls_common_name, tls_issuer = excluded.tls_issuer,
                tls_not_after = excluded.tls_not_after, banner = excluded.banner,
                observed_at = excluded.observed_at",
        )
        .bind(device_id)
        .bind(port)
        .bind(protocol)
        .bind(http_status)
        .bind(headers)
        .bind(body_snippet)
        .bind(favicon_hash)
        .bind(tls_common_name)
        .bind(tls_issuer)
        .bind(tls_not_after)
        .bind(banner)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_service_profiles_for_device(&self, device_id: i64) -> Result<Vec<ServiceProfileRow>, StorageError> {
        Ok(sqlx::query_as::<_, ServiceProfileRow>(
            "SELECT * FROM service_profiles WHERE device_id = ?1",
        )
        .bind(device_id)
        .fetch_all(&self.pool)
        .await?)
    }

    // ---- virtual IPs -------------------------------------------------------

    pub async fn list_allocated_virtual_ips(&self) -> Result<Vec<VirtualIpRow>, StorageError> {
        Ok(sqlx::query_as::<_, VirtualIpRow>(
            "SELECT * FROM virtual_ips WHERE released_at IS NULL",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn allocate_virtual_ip(
        &self,
        ip_address: &str,
        interface: &str,
        decoy_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        let rec = sqlx::query_as::<_, (i64,)>(
            "INSERT INTO virtual_ips (ip_address, interface, decoy_id, created_at) VALUES (?1, ?2, ?3, ?4) RETURNING id",
        )
        .bind(ip_address)
        .bind(interface)
        .bind(decoy_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec.0)
    }

    pub async fn release_virtual_ip(&self, ip_address: &str, now: DateTime<Utc>) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE virtual_ips SET released_at = ?2 WHERE ip_address = ?1 AND released_at IS NULL")
            .bind(ip_address)
            .bind(now)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            warn!("release_virtual_ip: {} was not allocated", ip_address);
        }
        Ok(())
    }

    // ---- mimic templates ---------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_mimic_template(
        &self,
        device_id: i64,
        category: &str,
        route_table: &str,
        server_header: Option<&str>,
        credential_strategy: &str,
        mdns_service_type: &str,
        mdns_name: &str,
        ports: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        let rec = sqlx::query_as::<_, (i64,)>(
            "INSERT INTO mimic_templates
             (device_id, category, route_table, server_header, credential_strategy, mdns_service_type, mdns_name, ports, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) RETURNING id",
        )
        .bind(device_id)
        .bind(category)
        .bind(route_table)
        .bind(server_header)
        .bind(credential_strategy)
        .bind(mdns_service_type)
        .bind(mdns_name)
        .bind(ports)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(rec.0)
    }

    pub async fn get_mimic_template_for_device(&self, device_id: i64) -> Result<Option<MimicTemplateRow>, StorageError> {
        Ok(sqlx::query_as::<_, MimicTemplateRow>(
            "SELECT * FROM mimic_templates WHERE device_id = ?1 ORDER BY id DESC LIMIT 1",
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn schema_version(&self) -> Result<i64, StorageError> {
        let rec = sqlx::query_as::<_, (String,)>("SELECT value FROM schema_meta WHERE key = 'schema_version'")
            .fetch_optional(&self.pool)
            .await?;
        match rec {
            Some((v,)) => v
                .parse::<i64>()
                .map_err(|e| StorageError::StateCorruption(format!("corrupt schema_version: {e}"))),
            None => Err(StorageError::StateCorruption("schema_meta missing schema_version".into())),
        }
    }

    /// Reads an arbitrary sensor-wide metadata value, used for state that
    /// must survive a restart (e.g. the global learning-mode start time).
    pub async fn get_meta(&self, key: &str) -> Result<Option<String>, StorageError> {
        let rec = sqlx::query_as::<_, (String,)>("SELECT value FROM schema_meta WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(rec.map(|(v,)| v))
    }

    pub async fn set_meta(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO schema_meta (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET value = excluded.value")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_storage() -> Storage {
        Storage::connect("sqlite::memory:").await.expect("in-memory db should open")
    }

    #[tokio::test]
    async fn connect_applies_migrations_and_records_version() {
        let storage = memory_storage().await;
        assert_eq!(storage.schema_version().await.unwrap(), migrations::SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn event_seq_is_monotonic_and_never_reused() {
        let storage = memory_storage().await;
        let s1 = storage.insert_event("test.one", "{}", None).await.unwrap();
        let s2 = storage.insert_event("test.two", "{}", None).await.unwrap();
        assert!(s2 > s1);
        let events = storage.fetch_events_since(0, 10).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].seq, s1);
        assert_eq!(events[1].seq, s2);
    }

    #[tokio::test]
    async fn upsert_device_preserves_custom_name() {
        let storage = memory_storage().await;
        let now = Utc::now();
        let device = storage.upsert_device_by_ip("192.168.1.50", Some("AA:BB:CC:DD:EE:FF"), None, now).await.unwrap();
        storage.set_device_custom_name(device.id, "Living Room TV").await.unwrap();
        storage.upsert_device_by_ip("192.168.1.50", Some("AA:BB:CC:DD:EE:FF"), Some("newhostname"), now).await.unwrap();
        let refreshed = storage.get_device_by_ip("192.168.1.50").await.unwrap().unwrap();
        assert_eq!(refreshed.custom_name.as_deref(), Some("Living Room TV"));
    }

    #[tokio::test]
    async fn connection_baseline_upsert_increments_hit_count() {
        let storage = memory_storage().await;
        let now = Utc::now();
        let device = storage.upsert_device_by_ip("192.168.1.60", None, None, now).await.unwrap();
        storage.upsert_connection_baseline(device.id, "8.8.8.8", 443, now).await.unwrap();
        storage.upsert_connection_baseline(device.id, "8.8.8.8", 443, now).await.unwrap();
        let baselines = storage.list_baselines_for_device(device.id).await.unwrap();
        assert_eq!(baselines.len(), 1);
        assert_eq!(baselines[0].hit_count, 2);
    }

    #[tokio::test]
    async fn virtual_ip_release_is_idempotent_safe() {
        let storage = memory_storage().await;
        let now = Utc::now();
        storage.allocate_virtual_ip("192.168.1.200", "eth0", None, now).await.unwrap();
        storage.release_virtual_ip("192.168.1.200", now).await.unwrap();
        let active = storage.list_allocated_virtual_ips().await.unwrap();
        assert!(active.is_empty());
        storage.release_virtual_ip("192.168.1.200", now).await.unwrap();
    }
}
