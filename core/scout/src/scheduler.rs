// Path and File Name : /home/sensor/home-sensor-core/core/scout/src/scheduler.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Scout cycle scheduling, bounded concurrent probing, and service profile persistence

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use sensor_event_bus::EventBus;
use sensor_storage::Storage;
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::error::ScoutError;
use crate::probes::{self, ProbeResult, KNOWN_HTTPS_PORTS, KNOWN_HTTP_PORTS};

pub const DEFAULT_INITIAL_DELAY_SECONDS: u64 = 60;
pub const DEFAULT_INTERVAL_MINUTES: u64 = 60;
pub const DEFAULT_MAX_CONCURRENT_PROBES: usize = 8;

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoutStatus {
    pub last_cycle_duration_ms: u64,
    pub last_cycle_profile_count: u32,
    pub cycles_completed: u64,
}

async fn probe_one_port(ip: String, port: u16) -> (u16, ProbeResult) {
    let mut result = ProbeResult::default();

    if KNOWN_HTTPS_PORTS.contains(&port) {
        result.protocol = "https".into();
        if let Some((status, headers)) = probes::probe_http_head(&ip, port, true).await {
            result.http_status = Some(status);
            result.headers_json = Some(headers);
        }
        result.favicon_hash = probes::probe_favicon_hash(&ip, port, true).await;
        if let Some((cn, issuer, not_after)) = probes::probe_tls_certificate(&ip, port).await {
            result.tls_common_name = cn;
            result.tls_issuer = issuer;
            result.tls_not_after = not_after;
        }
    } else if KNOWN_HTTP_PORTS.contains(&port) {
        result.protocol = "http".into();
        if let Some((status, headers)) = probes::probe_http_head(&ip, port, false).await {
            result.http_status = Some(status);
            result.headers_json = Some(headers);
        }
        result.favicon_hash = probes::probe_favicon_hash(&ip, port, false).await;
    } else {
        result.protocol = "tcp".into();
        result.banner = probes::probe_tcp_banner(&ip, port).await;
    }

    (port, result)
}

/// Runs on its own timer, independent of the active scan loop: after the
/// first scan completes, waits `initial_delay_seconds`, then probes every
/// online device's open ports every `interval_minutes`, bounded to
/// `max_concurrent_probes` probes in flight at once.
pub struct ScoutEngine {
    storage: Arc<Storage>,
    event_bus: Arc<EventBus>,
    semaphore: Arc<Semaphore>,
    running: AtomicBool,
    status: std::sync::Mutex<ScoutStatus>,
}

impl ScoutEngine {
    pub fn new(storage: Arc<Storage>, event_bus: Arc<EventBus>) -> Self {
        Self::with_concurrency(storage, event_bus, DEFAULT_MAX_CONCURRENT_PROBES)
    }

    pub fn with_concurrency(storage: Arc<Storage>, event_bus: Arc<EventBus>, max_concurrent_probes: usize) -> Self {
        Self {
            storage,
            event_bus,
            semaphore: Arc::new(Semaphore::new(max_concurrent_probes)),
            running: AtomicBool::new(false),
            status: std::sync::Mutex::new(ScoutStatus::default()),
        }
    }

    pub fn status(&self) -> ScoutStatus {
        *self.status.lock().unwrap()
    }

    /// Runs one probing cycle over every online device's known open ports.
    /// A run already in progress causes a subsequent call to coalesce into
    /// a no-op rather than overlap.
    pub async fn run_now(&self) -> Result<u32, ScoutError> {
        if self.running.swap(true, Ordering::SeqCst) {
            info!("scout cycle already in progress, coalescing");
            return Ok(0);
        }
        let result = self.run_cycle().await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn run_cycle(&self) -> Result<u32, ScoutError> {
        let start = std::time::Instant::now();
        let devices = self.storage.list_devices().await?;

        let mut handles = Vec::new();
        for device in devices.into_iter().filter(|d| d.is_online) {
            let open_ports = self.storage.list_open_ports_for_device(device.id).await?;
            for open_port in open_ports {
                let semaphore = self.semaphore.clone();
                let ip = device.ip_address.clone();
                let device_id = device.id;
                let port = open_port.port as u16;
                handles.push(tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok()?;
                    Some((device_id, probe_one_port(ip, port).await))
                }));
            }
        }

        let mut profile_count = 0u32;
        for handle in handles {
            let Ok(Some((device_id, (port, probe)))) = handle.await else { continue };
            let now = Utc::now();
            self.storage
                .upsert_service_profile(
                    device_id,
                    port as i64,
                    &probe.protocol,
                    probe.http_status,
                    probe.headers_json.as_deref(),
                    probe.body_snippet.as_deref(),
                    probe.favicon_hash.as_deref(),
                    probe.tls_common_name.as_deref(),
                    probe.tls_issuer.as_deref(),
                    probe.tls_not_after,
                    probe.banner.as_deref(),
                    now,
                )
                .await?;
            profile_count += 1;
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        {
            let mut status = self.status.lock().unwrap();
            status.last_cycle_duration_ms = elapsed_ms;
            status.last_cycle_profile_count = profile_count;
            status.cycles_completed += 1;
        }

        self.event_bus
            .publish("scout.cycle_complete", json!({"profile_count": profile_count, "duration_ms": elapsed_ms}), None)
            .await?;
        Ok(profile_count)
    }

    /// Drives the recurring schedule: call once after the first
    /// `system.scan_complete` event and let it run until the process exits
    /// or `shutdown` is notified.
    pub async fn run_scheduled(self: Arc<Self>, initial_delay_seconds: u64, interval_minutes: u64, shutdown: Arc<tokio::sync::Notify>) {
        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_secs(initial_delay_seconds)) => {}
            _ = shutdown.notified() => return,
        }

        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_minutes * 60));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_now().await {
                        warn!(%e, "scout cycle failed");
                    }
                }
                _ = shutdown.notified() => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensor_event_bus::EventBus;
    use sensor_storage::Storage;

    async fn memory_storage() -> Arc<Storage> {
        Arc::new(Storage::connect("sqlite::memory:").await.unwrap())
    }

    #[tokio::test]
    async fn run_now_coalesces_with_a_cycle_in_progress() {
        let storage = memory_storage().await;
        let bus = Arc::new(EventBus::new(storage.clone()));
        let engine = Arc::new(ScoutEngine::new(storage, bus));

        engine.running.store(true, Ordering::SeqCst);
        let result = engine.run_now().await.unwrap();
        assert_eq!(result, 0);
    }

    #[tokio::test]
    async fn run_now_on_empty_device_set_completes_with_zero_profiles() {
        let storage = memory_storage().await;
        let bus = Arc::new(EventBus::new(storage.clone()));
        let engine = Arc::new(ScoutEngine::new(storage, bus));

        let result = engine.run_now().await.unwrap();
        assert_eq!(result, 0);
        assert_eq!(engine.status().cycles_completed, 1);
    }
}
