// Path and File Name : /home/sensor/home-sensor-core/sensor/src/config.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Fail-closed SensorConfig loaded and validated from environment variables at startup

use crate::error::SensorError;

fn env_var(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T, SensorError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| SensorError::EnvironmentValidationFailed(format!("{key} is not a valid value: '{raw}'"))),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, Clone)]
pub struct FingerprintWeights {
    pub mac: f64,
    pub mdns: f64,
    pub dhcp: f64,
    pub connections: f64,
    pub open_ports: f64,
}

impl FingerprintWeights {
    fn validate(&self) -> Result<(), SensorError> {
        let sum = self.mac + self.mdns + self.dhcp + self.connections + self.open_ports;
        if (sum - 1.0).abs() > 0.001 {
            return Err(SensorError::EnvironmentValidationFailed(format!(
                "fingerprint signal weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierMode {
    Local,
    Cloud,
    LocalLlm,
}

impl std::str::FromStr for ClassifierMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(ClassifierMode::Local),
            "cloud" => Ok(ClassifierMode::Cloud),
            "local_llm" => Ok(ClassifierMode::LocalLlm),
            other => Err(format!("unrecognized classifier mode: {other}")),
        }
    }
}

/// Every tunable the sensor needs at boot, validated up front so a
/// misconfigured deployment fails before touching storage or the network
/// rather than misbehaving at an arbitrary point later.
#[derive(Debug, Clone)]
pub struct SensorConfig {
    pub storage_path: String,
    pub privileged_socket_path: String,
    pub lan_subnet: String,
    pub interface: String,
    pub scan_interval_secs: i64,
    pub retention_days: i64,
    pub incident_window_minutes: i64,
    pub incident_close_window_minutes: i64,
    pub max_decoys: usize,
    pub max_mimic_decoys: usize,
    pub max_virtual_ips: usize,
    pub learning_duration_hours: i64,
    pub classifier_mode: ClassifierMode,
    pub llm_endpoint: Option<String>,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub fingerprint_weights: FingerprintWeights,
    pub fingerprint_auto_approve_threshold: f64,
    pub fingerprint_verify_threshold: f64,
    pub scout_interval_minutes: u64,
    pub scout_max_concurrent_probes: usize,
    pub virtual_ip_range_start: u8,
    pub virtual_ip_range_end: u8,
    pub health_check_interval_secs: u64,
    pub restart_max_attempts: u32,
    pub restart_window_seconds: i64,
    pub privileged_rpc_timeout_secs: u64,
    pub external_http_timeout_secs: u64,
}

impl SensorConfig {
    /// Loads and validates configuration from the environment. FAIL-CLOSED:
    /// any out-of-range value is a startup error, never silently clamped.
    pub fn from_env_strict() -> Result<Self, SensorError> {
        let scan_interval_secs = env_parse("SENSOR_SCAN_INTERVAL_SECS", 60i64)?;
        if scan_interval_secs < 15 {
            return Err(SensorError::EnvironmentValidationFailed("SENSOR_SCAN_INTERVAL_SECS must be >= 15".into()));
        }

        let retention_days = env_parse("SENSOR_RETENTION_DAYS", 90i64)?;
        if retention_days < 1 {
            return Err(SensorError::EnvironmentValidationFailed("SENSOR_RETENTION_DAYS must be >= 1".into()));
        }

        let incident_window_minutes = env_parse("SENSOR_INCIDENT_WINDOW_MINUTES", 5i64)?;
        if incident_window_minutes < 1 {
            return Err(SensorError::EnvironmentValidationFailed("SENSOR_INCIDENT_WINDOW_MINUTES must be >= 1".into()));
        }

        let incident_close_window_minutes = env_parse("SENSOR_INCIDENT_CLOSE_WINDOW_MINUTES", 30i64)?;
        if incident_close_window_minutes < incident_window_minutes {
            return Err(SensorError::EnvironmentValidationFailed(
                "SENSOR_INCIDENT_CLOSE_WINDOW_MINUTES must be >= SENSOR_INCIDENT_WINDOW_MINUTES".into(),
            ));
        }

        let learning_duration_hours = env_parse("SENSOR_LEARNING_DURATION_HOURS", 168i64)?;
        if learning_duration_hours < 1 {
            return Err(SensorError::EnvironmentValidationFailed("SENSOR_LEARNING_DURATION_HOURS must be >= 1".into()));
        }

        let classifier_mode_raw = env_var("SENSOR_CLASSIFIER_MODE", "local");
        let classifier_mode: ClassifierMode = classifier_mode_raw
            .parse()
            .map_err(SensorError::EnvironmentValidationFailed)?;

        let llm_endpoint = std::env::var("SENSOR_LLM_ENDPOINT").ok();
        let llm_model = env_var("SENSOR_LLM_MODEL", "gpt-4o-mini");
        let llm_api_key = std::env::var("SENSOR_LLM_API_KEY").ok();
        if classifier_mode == ClassifierMode::LocalLlm && llm_endpoint.is_none() {
            return Err(SensorError::EnvironmentValidationFailed(
                "SENSOR_LLM_ENDPOINT is required when SENSOR_CLASSIFIER_MODE=local_llm".into(),
            ));
        }

        let fingerprint_weights = FingerprintWeights {
            mac: env_parse("SENSOR_WEIGHT_MAC", 0.35f64)?,
            mdns: env_parse("SENSOR_WEIGHT_MDNS", 0.25f64)?,
            dhcp: env_parse("SENSOR_WEIGHT_DHCP", 0.15f64)?,
            connections: env_parse("SENSOR_WEIGHT_CONNECTIONS", 0.15f64)?,
            open_ports: env_parse("SENSOR_WEIGHT_OPEN_PORTS", 0.10f64)?,
        };
        fingerprint_weights.validate()?;

        let fingerprint_auto_approve_threshold = env_parse("SENSOR_AUTO_APPROVE_THRESHOLD", 0.75f64)?;
        let fingerprint_verify_threshold = env_parse("SENSOR_VERIFY_THRESHOLD", 0.50f64)?;
        if !(0.0..=1.0).contains(&fingerprint_auto_approve_threshold) || !(0.0..=1.0).contains(&fingerprint_verify_threshold) {
            return Err(SensorError::EnvironmentValidationFailed(
                "fingerprint thresholds must be within [0, 1]".into(),
            ));
        }
        if fingerprint_verify_threshold > fingerprint_auto_approve_threshold {
            return Err(SensorError::EnvironmentValidationFailed(
                "SENSOR_VERIFY_THRESHOLD must be <= SENSOR_AUTO_APPROVE_THRESHOLD".into(),
            ));
        }

        let virtual_ip_range_start = env_parse("SENSOR_VIRTUAL_IP_RANGE_START", 200u8)?;
        let virtual_ip_range_end = env_parse("SENSOR_VIRTUAL_IP_RANGE_END", 250u8)?;
        if virtual_ip_range_start >= virtual_ip_range_end {
            return Err(SensorError::EnvironmentValidationFailed(
                "SENSOR_VIRTUAL_IP_RANGE_START must be < SENSOR_VIRTUAL_IP_RANGE_END".into(),
            ));
        }

        Ok(Self {
            storage_path: env_var("SENSOR_STORAGE_PATH", "/var/lib/home-sensor/sensor.db"),
            privileged_socket_path: env_var("SENSOR_PRIVILEGED_SOCKET_PATH", "/run/home-sensor/privileged.sock"),
            lan_subnet: env_var("SENSOR_LAN_SUBNET", "192.168.1.0/24"),
            interface: env_var("SENSOR_INTERFACE", "eth0"),
            scan_interval_secs,
            retention_days,
            incident_window_minutes,
            incident_close_window_minutes,
            max_decoys: env_parse("SENSOR_MAX_DECOYS", 16usize)?,
            max_mimic_decoys: env_parse("SENSOR_MAX_MIMIC_DECOYS", 8usize)?,
            max_virtual_ips: env_parse("SENSOR_MAX_VIRTUAL_IPS", 50usize)?,
            learning_duration_hours,
            classifier_mode,
            llm_endpoint,
            llm_model,
            llm_api_key,
            fingerprint_weights,
            fingerprint_auto_approve_threshold,
            fingerprint_verify_threshold,
            scout_interval_minutes: env_parse("SENSOR_SCOUT_INTERVAL_MINUTES", 60u64)?,
            scout_max_concurrent_probes: env_parse("SENSOR_SCOUT_MAX_CONCURRENT_PROBES", 8usize)?,
            virtual_ip_range_start,
            virtual_ip_range_end,
            health_check_interval_secs: env_parse("SENSOR_HEALTH_CHECK_INTERVAL_SECS", 30u64)?,
            restart_max_attempts: env_parse("SENSOR_RESTART_MAX_ATTEMPTS", 5u32)?,
            restart_window_seconds: env_parse("SENSOR_RESTART_WINDOW_SECONDS", 600i64)?,
            privileged_rpc_timeout_secs: env_parse("SENSOR_PRIVILEGED_RPC_TIMEOUT_SECS", 30u64)?,
            external_http_timeout_secs: env_parse("SENSOR_EXTERNAL_HTTP_TIMEOUT_SECS", 5u64)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_weights_must_sum_to_one() {
        let weights = FingerprintWeights { mac: 0.5, mdns: 0.5, dhcp: 0.5, connections: 0.0, open_ports: 0.0 };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn fingerprint_weights_within_tolerance_pass() {
        let weights = FingerprintWeights { mac: 0.35, mdns: 0.25, dhcp: 0.15, connections: 0.15, open_ports: 0.10 };
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn classifier_mode_rejects_unknown_value() {
        assert!("nonsense".parse::<ClassifierMode>().is_err());
        assert_eq!("local_llm".parse::<ClassifierMode>().unwrap(), ClassifierMode::LocalLlm);
    }
}
