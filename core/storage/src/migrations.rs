// Path and File Name : /home/sensor/home-sensor-core/core/storage/src/migrations.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Idempotent, additive schema migrations for the embedded sensor database (schema v6)

use sqlx::SqlitePool;
use tracing::info;

use crate::error::StorageError;

/// Current schema version. Bump and append a migration when adding columns/tables;
/// never remove or rewrite an already-applied migration.
pub const SCHEMA_VERSION: i64 = 6;

/// All migrations, applied in order. Every statement must be safe to re-run:
/// `CREATE TABLE IF NOT EXISTS` or `ALTER TABLE ... ADD COLUMN` only.
const MIGRATIONS: &[&str] = &[
    // v1: event log
    r#"
    CREATE TABLE IF NOT EXISTS events (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        event_type TEXT NOT NULL,
        payload TEXT NOT NULL,
        source_id TEXT,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
    );
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_events_type ON events(event_type);"#,
    // v2: devices, fingerprints, trust
    r#"
    CREATE TABLE IF NOT EXISTS devices (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ip_address TEXT NOT NULL,
        mac_address TEXT,
        hostname TEXT,
        vendor TEXT,
        device_type TEXT NOT NULL DEFAULT 'unknown',
        model_name TEXT,
        area TEXT,
        custom_name TEXT,
        notes TEXT,
        is_online INTEGER NOT NULL DEFAULT 1,
        first_seen TEXT NOT NULL,
        last_seen TEXT NOT NULL
    );
    "#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_devices_ip ON devices(ip_address);"#,
    r#"
    CREATE TABLE IF NOT EXISTS device_fingerprints (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        device_id INTEGER NOT NULL REFERENCES devices(id),
        mac TEXT,
        mdns_hostname TEXT,
        dhcp_hash TEXT,
        connection_pattern_hash TEXT,
        open_ports_hash TEXT,
        composite_hash TEXT,
        signal_count INTEGER NOT NULL DEFAULT 0,
        confidence REAL NOT NULL DEFAULT 0.0,
        first_seen TEXT NOT NULL,
        last_seen TEXT NOT NULL
    );
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_fingerprints_device ON device_fingerprints(device_id);"#,
    r#"
    CREATE TABLE IF NOT EXISTS device_trust (
        device_id INTEGER PRIMARY KEY REFERENCES devices(id),
        status TEXT NOT NULL DEFAULT 'unknown',
        approved_by TEXT,
        updated_at TEXT NOT NULL
    );
    "#,
    // v3: incidents, alerts
    r#"
    CREATE TABLE IF NOT EXISTS incidents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source_ip TEXT NOT NULL,
        source_mac TEXT,
        status TEXT NOT NULL DEFAULT 'active',
        severity TEXT NOT NULL,
        alert_count INTEGER NOT NULL DEFAULT 0,
        first_alert_at TEXT NOT NULL,
        last_alert_at TEXT NOT NULL,
        closed_at TEXT,
        summary TEXT
    );
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_incidents_source_status ON incidents(source_ip, status);"#,
    r#"
    CREATE TABLE IF NOT EXISTS home_alerts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        incident_id INTEGER REFERENCES incidents(id),
        alert_type TEXT NOT NULL,
        severity TEXT NOT NULL,
        title TEXT NOT NULL,
        detail TEXT NOT NULL,
        source_ip TEXT,
        source_mac TEXT,
        device_id INTEGER REFERENCES devices(id),
        decoy_id INTEGER,
        event_seq INTEGER,
        read_at TEXT,
        actioned_at TEXT,
        action_note TEXT,
        created_at TEXT NOT NULL
    );
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_alerts_incident ON home_alerts(incident_id);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_alerts_created ON home_alerts(created_at);"#,
    // v4: decoys, credentials, connections, canaries
    r#"
    CREATE TABLE IF NOT EXISTS decoys (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        decoy_type TEXT NOT NULL,
        bind_address TEXT NOT NULL,
        port INTEGER NOT NULL,
        status TEXT NOT NULL DEFAULT 'stopped',
        config TEXT NOT NULL DEFAULT '{}',
        connection_count INTEGER NOT NULL DEFAULT 0,
        credential_trip_count INTEGER NOT NULL DEFAULT 0,
        failure_count INTEGER NOT NULL DEFAULT 0,
        last_failure_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS planted_credentials (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        credential_type TEXT NOT NULL,
        credential_value TEXT NOT NULL,
        canary_hostname TEXT,
        planted_location TEXT NOT NULL,
        decoy_id INTEGER REFERENCES decoys(id),
        tripped INTEGER NOT NULL DEFAULT 0,
        first_tripped_at TEXT,
        created_at TEXT NOT NULL
    );
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_credentials_decoy ON planted_credentials(decoy_id);"#,
    r#"
    CREATE TABLE IF NOT EXISTS decoy_connections (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        decoy_id INTEGER NOT NULL REFERENCES decoys(id),
        source_ip TEXT NOT NULL,
        source_mac TEXT,
        port INTEGER NOT NULL,
        protocol TEXT,
        request_path TEXT,
        credential_used TEXT,
        credential_id INTEGER REFERENCES planted_credentials(id),
        event_seq INTEGER,
        timestamp TEXT NOT NULL
    );
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_connections_decoy ON decoy_connections(decoy_id);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_connections_timestamp ON decoy_connections(timestamp);"#,
    r#"
    CREATE TABLE IF NOT EXISTS canary_observations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        credential_id INTEGER NOT NULL REFERENCES planted_credentials(id),
        canary_hostname TEXT NOT NULL,
        queried_by_ip TEXT NOT NULL,
        queried_by_mac TEXT,
        event_seq INTEGER,
        observed_at TEXT NOT NULL
    );
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_canary_observed ON canary_observations(observed_at);"#,
    // v5: baselines, open ports, insights, service profiles
    r#"
    CREATE TABLE IF NOT EXISTS connection_baselines (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        device_id INTEGER NOT NULL REFERENCES devices(id),
        dest_ip TEXT NOT NULL,
        dest_port INTEGER NOT NULL,
        hit_count INTEGER NOT NULL DEFAULT 0,
        first_seen TEXT NOT NULL,
        last_seen TEXT NOT NULL,
        UNIQUE(device_id, dest_ip, dest_port)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS device_open_ports (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        device_id INTEGER NOT NULL REFERENCES devices(id),
        port INTEGER NOT NULL,
        protocol TEXT NOT NULL,
        service_name TEXT,
        banner TEXT,
        first_seen TEXT NOT NULL,
        last_seen TEXT NOT NULL,
        UNIQUE(device_id, port, protocol)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS security_insight_state (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        device_id INTEGER NOT NULL REFERENCES devices(id),
        insight_key TEXT NOT NULL,
        alert_id INTEGER NOT NULL REFERENCES home_alerts(id),
        dismissed INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        resolved_at TEXT,
        UNIQUE(device_id, insight_key)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS service_profiles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        device_id INTEGER NOT NULL REFERENCES devices(id),
        port INTEGER NOT NULL,
        protocol TEXT NOT NULL,
        http_status INTEGER,
        headers TEXT,
        body_snippet TEXT,
        favicon_hash TEXT,
        tls_common_name TEXT,
        tls_issuer TEXT,
        tls_not_after TEXT,
        banner TEXT,
        observed_at TEXT NOT NULL,
        UNIQUE(device_id, port, protocol)
    );
    "#,
    // v6: virtual IPs, mimic templates
    r#"
    CREATE TABLE IF NOT EXISTS virtual_ips (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ip_address TEXT NOT NULL,
        interface TEXT NOT NULL,
        decoy_id INTEGER REFERENCES decoys(id),
        created_at TEXT NOT NULL,
        released_at TEXT
    );
    "#,
    // Partial: only currently-live rows must be unique per address. A released
    // address leaves its old row in place for history and is free to be
    // re-allocated in a brand-new row once returned to the pool.
    r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_virtual_ips_addr ON virtual_ips(ip_address) WHERE released_at IS NULL;"#,
    r#"
    CREATE TABLE IF NOT EXISTS mimic_templates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        device_id INTEGER NOT NULL REFERENCES devices(id),
        category TEXT NOT NULL,
        route_table TEXT NOT NULL,
        server_header TEXT,
        credential_strategy TEXT NOT NULL,
        mdns_service_type TEXT NOT NULL,
        mdns_name TEXT NOT NULL,
        ports TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS schema_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
    "#,
];

/// Applies every migration idempotently and records the schema version.
/// FAIL-CLOSED: any DDL failure aborts startup rather than running against a
/// half-applied schema.
pub async fn apply_all(pool: &SqlitePool) -> Result<(), StorageError> {
    for stmt in MIGRATIONS {
        sqlx::query(stmt)
            .execute(pool)
            .await
            .map_err(|e| StorageError::StateCorruption(format!("migration failed: {e}")))?;
    }

    sqlx::query(
        "INSERT INTO schema_meta (key, value) VALUES ('schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(SCHEMA_VERSION.to_string())
    .execute(pool)
    .await
    .map_err(|e| StorageError::StateCorruption(format!("failed to record schema version: {e}")))?;

    info!("applied schema migrations, schema_version={}", SCHEMA_VERSION);
    Ok(())
}
