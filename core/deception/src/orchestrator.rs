// Path and File Name : /home/sensor/home-sensor-core/core/deception/src/orchestrator.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Decoy lifecycle management: deployment, health supervision, and connection handling

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use sensor_event_bus::EventBus;
use sensor_storage::Storage;
use serde_json::json;
use tracing::{info, warn};

use crate::archetypes::{build_blueprint, DecoyArchetype, DecoyBlueprint};
use crate::error::DeceptionError;
use crate::http_emulator::{start_http_decoy, DecoyConnectionEvent};
use crate::registry::{DecoyRegistry, RunningDecoy};

pub const DEFAULT_RESTART_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_RESTART_WINDOW_SECONDS: i64 = 600;
pub const DEFAULT_MAX_DECOYS: usize = 16;

/// An observed service worth shadowing with a decoy: the port it was seen
/// on and the address to bind the decoy to (normally the sensor's own host,
/// or a virtual IP allocated for the device being mimicked).
#[derive(Debug, Clone)]
pub struct ObservedService {
    pub bind_address: String,
    pub port: u16,
}

/// Tracks restart attempts for one decoy inside a sliding time window. The
/// window slides rather than resets: each restart evicts attempts older
/// than `restart_window_seconds`, then the budget is re-checked against
/// what remains. A decoy that fails once every ten minutes never
/// permanently exhausts its budget; a decoy crash-looping within the
/// window does.
struct RestartBudget {
    attempts: VecDeque<DateTime<Utc>>,
}

impl RestartBudget {
    fn new() -> Self {
        Self { attempts: VecDeque::new() }
    }

    fn record_and_check(&mut self, now: DateTime<Utc>, window_seconds: i64, max_attempts: u32) -> bool {
        let cutoff = now - Duration::seconds(window_seconds);
        while matches!(self.attempts.front(), Some(ts) if *ts < cutoff) {
            self.attempts.pop_front();
        }
        self.attempts.push_back(now);
        self.attempts.len() as u32 <= max_attempts
    }
}

pub struct DecoyOrchestrator {
    storage: Arc<Storage>,
    event_bus: Arc<EventBus>,
    registry: Arc<DecoyRegistry>,
    restart_budgets: Mutex<std::collections::HashMap<i64, RestartBudget>>,
    restart_max_attempts: u32,
    restart_window_seconds: i64,
    max_decoys: usize,
}

impl DecoyOrchestrator {
    pub fn new(storage: Arc<Storage>, event_bus: Arc<EventBus>) -> Self {
        Self {
            storage,
            event_bus,
            registry: Arc::new(DecoyRegistry::new()),
            restart_budgets: Mutex::new(std::collections::HashMap::new()),
            restart_max_attempts: DEFAULT_RESTART_MAX_ATTEMPTS,
            restart_window_seconds: DEFAULT_RESTART_WINDOW_SECONDS,
            max_decoys: DEFAULT_MAX_DECOYS,
        }
    }

    pub fn registry(&self) -> Arc<DecoyRegistry> {
        self.registry.clone()
    }

    /// Deploys one decoy per observed service, but only the first time:
    /// if any decoy row already exists, this is a no-op so a sensor restart
    /// never duplicates decoys alongside `resume_active`.
    pub async fn auto_deploy(&self, observed: &[ObservedService]) -> Result<u32, DeceptionError> {
        if !self.storage.list_decoys().await?.is_empty() {
            info!("decoys already provisioned, skipping auto_deploy");
            return Ok(0);
        }

        let mut deployed = 0u32;
        for service in observed.iter().take(self.max_decoys) {
            let archetype = DecoyArchetype::for_observed_port(service.port);
            let blueprint = build_blueprint(archetype);
            self.deploy(archetype, &service.bind_address, service.port, blueprint).await?;
            deployed += 1;
        }
        Ok(deployed)
    }

    async fn deploy(
        &self,
        archetype: DecoyArchetype,
        bind_address: &str,
        port: u16,
        blueprint: DecoyBlueprint,
    ) -> Result<i64, DeceptionError> {
        let now = Utc::now();
        let config = serde_json::to_string(&blueprint)
            .map_err(|e| DeceptionError::Validation(format!("blueprint not serializable: {e}")))?;
        let name = format!("{}-{}", archetype.as_str(), port);
        let decoy_id = self.storage.insert_decoy(&name, archetype.as_str(), bind_address, port as i64, &config, now).await?;

        for cred in &blueprint.planted_credentials {
            self.storage
                .insert_credential(
                    cred.credential_type.as_str(),
                    &cred.credential_value,
                    cred.canary_hostname.as_deref(),
                    archetype.as_str(),
                    Some(decoy_id),
                    now,
                )
                .await?;
        }

        let bound_port = self.start(decoy_id, bind_address, port, blueprint).await?;
        if bound_port != port {
            self.storage.update_decoy_port(decoy_id, bound_port as i64, Utc::now()).await?;
        }
        self.storage.set_decoy_status(decoy_id, "active", Utc::now()).await?;
        self.event_bus
            .publish("decoy.deployed", json!({"decoy_id": decoy_id, "decoy_type": archetype.as_str(), "port": bound_port}), None)
            .await?;
        Ok(decoy_id)
    }

    async fn start(&self, decoy_id: i64, bind_address: &str, port: u16, blueprint: DecoyBlueprint) -> Result<u16, DeceptionError> {
        let (bound_addr, shutdown, rx) = start_http_decoy(decoy_id, bind_address, port, blueprint.clone()).await?;
        let bound_port = bound_addr.port();
        self.registry.insert(Arc::new(RunningDecoy { decoy_id, blueprint, bound_addr, shutdown }));
        self.spawn_connection_consumer(rx);
        Ok(bound_port)
    }

    fn spawn_connection_consumer(&self, mut rx: tokio::sync::mpsc::UnboundedReceiver<DecoyConnectionEvent>) {
        let storage = self.storage.clone();
        let event_bus = self.event_bus.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(err) = handle_connection_event(&storage, &event_bus, event).await {
                    warn!(%err, "failed to record decoy connection");
                }
            }
        });
    }

    /// Restarts every decoy whose last known status was `active` or
    /// `degraded`, used when the sensor process restarts. Decoys left
    /// `stopped` by an operator stay stopped.
    pub async fn resume_active(&self) -> Result<u32, DeceptionError> {
        let mut resumed = 0u32;
        for row in self.storage.list_decoys().await? {
            if row.status != "active" && row.status != "degraded" {
                continue;
            }
            let blueprint: DecoyBlueprint = serde_json::from_str(&row.config)
                .map_err(|e| DeceptionError::StateCorruption(format!("decoy {} has unreadable config: {e}", row.id)))?;
            let _ = self.start(row.id, &row.bind_address, row.port as u16, blueprint).await?;
            resumed += 1;
        }
        Ok(resumed)
    }

    /// Restarts a single decoy in place, reusing its stored blueprint and
    /// bind address. Used both for operator-triggered restarts and by
    /// health supervision once a failure budget check passes.
    pub async fn restart_decoy(&self, decoy_id: i64) -> Result<(), DeceptionError> {
        if let Some(running) = self.registry.remove(decoy_id) {
            running.shutdown.notify_one();
        }
        let row = self.storage.get_decoy(decoy_id).await?;
        let blueprint: DecoyBlueprint = serde_json::from_str(&row.config)
            .map_err(|e| DeceptionError::StateCorruption(format!("decoy {decoy_id} has unreadable config: {e}")))?;
        let _ = self.start(decoy_id, &row.bind_address, row.port as u16, blueprint).await?;
        self.storage.reset_decoy_failures(decoy_id).await?;
        self.storage.set_decoy_status(decoy_id, "active", Utc::now()).await?;
        self.event_bus.publish("decoy.restarted", json!({"decoy_id": decoy_id}), None).await?;
        Ok(())
    }

    /// Called when health supervision observes a decoy is no longer
    /// responding. Records the failure, then either restarts it or marks
    /// it `degraded` if the restart budget for the configured window is
    /// exhausted.
    pub async fn handle_failure(&self, decoy_id: i64) -> Result<bool, DeceptionError> {
        let now = Utc::now();
        self.storage.record_decoy_failure(decoy_id, now).await?;
        self.storage.set_decoy_status(decoy_id, "degraded", now).await?;

        let within_budget = {
            let mut budgets = self.restart_budgets.lock();
            let budget = budgets.entry(decoy_id).or_insert_with(RestartBudget::new);
            budget.record_and_check(now, self.restart_window_seconds, self.restart_max_attempts)
        };

        if within_budget {
            self.restart_decoy(decoy_id).await?;
            Ok(true)
        } else {
            self.storage.set_decoy_status(decoy_id, "stopped", now).await?;
            self.event_bus
                .publish("system.sensor_offline", json!({"decoy_id": decoy_id, "reason": "restart_budget_exhausted"}), None)
                .await?;
            Ok(false)
        }
    }

    /// Probes a running decoy's bound address with a raw TCP connect. A
    /// decoy that isn't registered in memory (never started, or already
    /// torn down) is unhealthy by definition.
    pub async fn health_check(&self, decoy_id: i64) -> bool {
        let Some(running) = self.registry.get(decoy_id) else { return false };
        tokio::net::TcpStream::connect(running.bound_addr).await.is_ok()
    }

    pub async fn stop_decoy(&self, decoy_id: i64) -> Result<(), DeceptionError> {
        if let Some(running) = self.registry.remove(decoy_id) {
            running.shutdown.notify_one();
        }
        self.storage.set_decoy_status(decoy_id, "stopped", Utc::now()).await?;
        Ok(())
    }

    /// Polls every currently-registered decoy's health on a fixed interval
    /// until `shutdown` is notified, routing failures through
    /// [`Self::handle_failure`]. Decoys already stopped (not registered)
    /// are skipped, since `handle_failure` only makes sense for something
    /// that was supposed to be running.
    pub async fn run_health_supervision(self: Arc<Self>, interval_seconds: u64, shutdown: Arc<tokio::sync::Notify>) {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_seconds));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for decoy_id in self.registry.running_ids() {
                        if !self.health_check(decoy_id).await {
                            if let Err(err) = self.handle_failure(decoy_id).await {
                                warn!(decoy_id, %err, "failed to handle decoy health failure");
                            }
                        }
                    }
                }
                _ = shutdown.notified() => {
                    info!("decoy health supervision loop shutting down");
                    return;
                }
            }
        }
    }
}

async fn handle_connection_event(storage: &Storage, event_bus: &EventBus, event: DecoyConnectionEvent) -> Result<(), DeceptionError> {
    let now = Utc::now();
    let credential_id = if let Some(value) = &event.credential_used {
        match storage.find_credential_by_value(value).await? {
            Some(row) => {
                storage.mark_credential_tripped(row.id, now).await?;
                Some(row.id)
            }
            None => None,
        }
    } else {
        None
    };

    storage
        .insert_decoy_connection(
            event.decoy_id,
            &event.source_ip,
            None,
            event.port as i64,
            Some(event.protocol),
            Some(&event.request_path),
            event.credential_used.as_deref(),
            credential_id,
            now,
        )
        .await?;
    storage.increment_decoy_connection_count(event.decoy_id).await?;

    event_bus
        .publish(
            "decoy.trip",
            json!({
                "decoy_id": event.decoy_id,
                "source_ip": event.source_ip,
                "request_path": event.request_path,
            }),
            None,
        )
        .await?;

    if let Some(credential_id) = credential_id {
        storage.increment_decoy_credential_trip_count(event.decoy_id).await?;
        event_bus
            .publish(
                "decoy.credential_trip",
                json!({
                    "decoy_id": event.decoy_id,
                    "source_ip": event.source_ip,
                    "credential_id": credential_id,
                    "detection_method": "http_request",
                }),
                None,
            )
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_budget_allows_attempts_up_to_the_limit() {
        let mut budget = RestartBudget::new();
        let now = Utc::now();
        for _ in 0..5 {
            assert!(budget.record_and_check(now, 600, 5));
        }
        assert!(!budget.record_and_check(now, 600, 5));
    }

    #[test]
    fn restart_budget_slides_the_window_forward() {
        let mut budget = RestartBudget::new();
        let t0 = Utc::now();
        for _ in 0..5 {
            assert!(budget.record_and_check(t0, 600, 5));
        }
        assert!(!budget.record_and_check(t0, 600, 5));

        let t1 = t0 + Duration::seconds(601);
        assert!(budget.record_and_check(t1, 600, 5));
    }
}
