// Path and File Name : /home/sensor/home-sensor-core/sensor/src/orchestrator.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Fail-closed startup/shutdown lifecycle wiring every core subsystem together

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ipnetwork::Ipv4Network;
use sensor_classifier::{DeviceClassifier, LlmClassifier, OpenAICompatibleClassifier, SignatureDB};
use sensor_deception::{DecoyOrchestrator, DnsCanaryMonitor, ObservedService};
use sensor_device_manager::{AnomalyDetector, BaselineCollector, DeviceManager, LearningClock, ScanResult};
use sensor_event_bus::EventBus;
use sensor_incident::{AlertRetentionService, IncidentAggregator, SecurityInsightAnalyzer};
use sensor_mimic::MimicOrchestrator;
use sensor_privileged_client::{PrivilegedOperations, UnixSocketPrivilegedClient};
use sensor_scout::ScoutEngine;
use sensor_storage::Storage;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::config::SensorConfig;
use crate::dns_source::PrivilegedDnsQuerySource;
use crate::error::SensorError;

/// Ports probed via the privileged collaborator's `service_scan` RPC on
/// every ARP-discovered host each scan tick: the risky/admin ports
/// `sensor_incident::port_risks` already watches for, plus the common HTTP
/// alt-ports `sensor_scout::probes` knows how to fingerprint.
const COMMON_SCAN_PORTS: &[u16] = &[
    21, 22, 23, 80, 443, 445, 554, 3306, 3389, 5432, 5900, 3000, 5000, 8000, 8008, 8080, 8443, 8888, 9090,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorState {
    Initializing,
    StorageReady,
    SubsystemsReady,
    Running,
    ShuttingDown,
    Failed,
}

/// Owns every long-lived subsystem handle and drives the fail-closed
/// startup sequence: storage, then the event bus, then every subsystem
/// that depends on it, in dependency order, with nothing started until
/// everything before it has succeeded.
pub struct SensorOrchestrator {
    config: SensorConfig,
    state: std::sync::RwLock<SensorState>,
    shutdown: Arc<Notify>,

    storage: Option<Arc<Storage>>,
    event_bus: Option<Arc<EventBus>>,
    device_manager: Option<Arc<DeviceManager>>,
    incident_aggregator: Option<Arc<IncidentAggregator>>,
    anomaly_detector: Option<Arc<AnomalyDetector>>,
    baseline_collector: Option<Arc<BaselineCollector>>,
    learning_clock: Option<Arc<LearningClock>>,
    decoy_orchestrator: Option<Arc<DecoyOrchestrator>>,
    dns_canary: Option<Arc<tokio::sync::Mutex<DnsCanaryMonitor>>>,
    scout_engine: Option<Arc<ScoutEngine>>,
    mimic_orchestrator: Option<Arc<MimicOrchestrator>>,
    retention_service: Option<Arc<AlertRetentionService>>,
    insight_analyzer: Option<Arc<SecurityInsightAnalyzer>>,
    privileged: Option<Arc<dyn PrivilegedOperations>>,

    scan_running: Arc<AtomicBool>,
}

impl SensorOrchestrator {
    pub fn new(config: SensorConfig) -> Self {
        Self {
            config,
            state: std::sync::RwLock::new(SensorState::Initializing),
            shutdown: Arc::new(Notify::new()),
            storage: None,
            event_bus: None,
            device_manager: None,
            incident_aggregator: None,
            anomaly_detector: None,
            baseline_collector: None,
            learning_clock: None,
            decoy_orchestrator: None,
            dns_canary: None,
            scout_engine: None,
            mimic_orchestrator: None,
            retention_service: None,
            insight_analyzer: None,
            privileged: None,
            scan_running: Arc::new(AtomicBool::new(false)),
        }
    }

    fn set_state(&self, new_state: SensorState) {
        let mut state = self.state.write().expect("state lock poisoned");
        info!(?new_state, previous = ?*state, "sensor state transition");
        *state = new_state;
    }

    pub fn get_state(&self) -> SensorState {
        *self.state.read().expect("state lock poisoned")
    }

    /// Runs the full staged startup: storage, event bus, classifier, device
    /// manager, incident pipeline, deception, scout, mimic. Any failure
    /// leaves the orchestrator in `Failed` and propagates, never leaving a
    /// half-wired set of subsystems behind for `run_forever` to trip over.
    pub async fn startup(&mut self) -> Result<(), SensorError> {
        let storage = Arc::new(Storage::connect(&self.config.storage_path).await.map_err(|e| {
            SensorError::StorageInitFailed(e.to_string())
        })?);
        self.storage = Some(storage.clone());
        self.set_state(SensorState::StorageReady);

        let event_bus = Arc::new(EventBus::new(storage.clone()));
        self.event_bus = Some(event_bus.clone());

        let privileged: Arc<dyn PrivilegedOperations> = Arc::new(UnixSocketPrivilegedClient::with_timeout(
            self.config.privileged_socket_path.clone(),
            Duration::from_secs(self.config.privileged_rpc_timeout_secs),
        ));
        self.privileged = Some(privileged.clone());

        let signature_db = SignatureDB::with_defaults();
        let llm: Option<Box<dyn LlmClassifier>> = if self.config.classifier_mode == crate::config::ClassifierMode::LocalLlm {
            let endpoint = self
                .config
                .llm_endpoint
                .as_deref()
                .ok_or_else(|| SensorError::EnvironmentValidationFailed("SENSOR_LLM_ENDPOINT missing".into()))?;
            let client = OpenAICompatibleClassifier::new(
                endpoint,
                &self.config.llm_model,
                self.config.llm_api_key.clone(),
                Duration::from_secs(self.config.external_http_timeout_secs),
            )
            .map_err(|e| SensorError::SubsystemFailed(format!("failed to construct LLM classifier: {e}")))?;
            Some(Box::new(client))
        } else {
            None
        };
        let classifier = DeviceClassifier::new(signature_db, llm);
        let device_manager = Arc::new(DeviceManager::new(storage.clone(), event_bus.clone(), classifier));
        self.device_manager = Some(device_manager);

        let incident_aggregator = Arc::new(IncidentAggregator::new(
            storage.clone(),
            event_bus.clone(),
            self.config.incident_window_minutes,
            self.config.incident_close_window_minutes,
        ));
        self.incident_aggregator = Some(incident_aggregator.clone());

        self.anomaly_detector = Some(Arc::new(AnomalyDetector::new(storage.clone(), incident_aggregator.clone())));
        self.baseline_collector = Some(Arc::new(BaselineCollector::new(storage.clone())));
        self.learning_clock = Some(Arc::new(LearningClock::new(storage.clone(), self.config.learning_duration_hours)));

        self.retention_service = Some(Arc::new(AlertRetentionService::new(storage.clone(), self.config.retention_days)));
        self.insight_analyzer = Some(Arc::new(SecurityInsightAnalyzer::new(storage.clone(), event_bus.clone())));

        let decoy_orchestrator = Arc::new(DecoyOrchestrator::new(storage.clone(), event_bus.clone()));
        let resumed = decoy_orchestrator.resume_active().await.map_err(SensorError::from)?;
        info!(resumed, "decoy orchestrator resumed active decoys");
        self.decoy_orchestrator = Some(decoy_orchestrator);

        let dns_source: Arc<dyn sensor_deception::DnsQuerySource> = Arc::new(PrivilegedDnsQuerySource::new(privileged.clone()));
        self.dns_canary = Some(Arc::new(tokio::sync::Mutex::new(DnsCanaryMonitor::new(
            storage.clone(),
            event_bus.clone(),
            dns_source,
        ))));

        self.scout_engine = Some(Arc::new(ScoutEngine::with_concurrency(
            storage.clone(),
            event_bus.clone(),
            self.config.scout_max_concurrent_probes,
        )));

        let network = Ipv4Network::from_str(&self.config.lan_subnet)
            .map_err(|e| SensorError::EnvironmentValidationFailed(format!("SENSOR_LAN_SUBNET invalid: {e}")))?;
        let mimic_orchestrator = MimicOrchestrator::load(
            storage.clone(),
            event_bus.clone(),
            privileged.clone(),
            network,
            self.config.interface.clone(),
        )
        .await
        .map_err(SensorError::from)?;
        let restored = mimic_orchestrator.load_from_db().await.map_err(SensorError::from)?;
        info!(restored, "mimic orchestrator restored virtual-ip aliases");
        self.mimic_orchestrator = Some(Arc::new(mimic_orchestrator));

        self.set_state(SensorState::SubsystemsReady);
        Ok(())
    }

    /// Spawns the background loops (scan, scout, health supervision, DNS
    /// canary polling, retention purge) and blocks until a shutdown signal
    /// arrives.
    pub async fn run_forever(&self) -> Result<(), SensorError> {
        self.set_state(SensorState::Running);

        let scan_handle = self.spawn_scan_loop();
        let scout_handle = self.spawn_scout_loop();
        let health_handle = self.spawn_health_supervision();
        let dns_handle = self.spawn_dns_canary_loop();
        let retention_handle = self.spawn_retention_loop();

        info!("sensor running - waiting for shutdown signal");
        signal::ctrl_c().await.map_err(|e| SensorError::SubsystemFailed(format!("failed to wait for ctrl_c: {e}")))?;

        self.set_state(SensorState::ShuttingDown);
        self.shutdown.notify_waiters();
        for handle in [scan_handle, scout_handle, health_handle, dns_handle, retention_handle] {
            handle.abort();
        }
        info!("sensor shut down cleanly");
        Ok(())
    }

    fn spawn_scan_loop(&self) -> tokio::task::JoinHandle<()> {
        let privileged = self.privileged.clone().expect("startup must run before run_forever");
        let device_manager = self.device_manager.clone().expect("startup must run before run_forever");
        let decoy_orchestrator = self.decoy_orchestrator.clone().expect("startup must run before run_forever");
        let event_bus = self.event_bus.clone().expect("startup must run before run_forever");
        let storage = self.storage.clone().expect("startup must run before run_forever");
        let insight_analyzer = self.insight_analyzer.clone().expect("startup must run before run_forever");
        let learning_clock = self.learning_clock.clone().expect("startup must run before run_forever");
        let baseline_collector = self.baseline_collector.clone().expect("startup must run before run_forever");
        let anomaly_detector = self.anomaly_detector.clone().expect("startup must run before run_forever");
        let subnet = self.config.lan_subnet.clone();
        let interval_secs = self.config.scan_interval_secs as u64;
        let scan_running = self.scan_running.clone();
        let first_scan = Arc::new(AtomicBool::new(true));
        let learning_complete_announced = Arc::new(AtomicBool::new(false));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
            loop {
                ticker.tick().await;
                if scan_running.swap(true, Ordering::SeqCst) {
                    warn!("previous scan still running, skipping this tick");
                    continue;
                }

                match privileged.arp_scan(&subnet).await {
                    Ok(entries) => {
                        let targets: Vec<String> = entries.iter().map(|e| e.ip.clone()).collect();
                        let mut ports_by_ip: HashMap<String, Vec<u16>> = HashMap::new();
                        if !targets.is_empty() {
                            match privileged.service_scan(&targets, COMMON_SCAN_PORTS).await {
                                Ok(found) => {
                                    for entry in found {
                                        ports_by_ip.entry(entry.ip).or_default().push(entry.port);
                                    }
                                }
                                Err(err) => warn!(%err, "service_scan failed"),
                            }
                        }

                        for entry in entries {
                            let open_ports = ports_by_ip.remove(&entry.ip);
                            // mdns_hostname/dhcp_options/connections are left unset: the
                            // privileged collaborator exposes no RPC that surfaces mDNS
                            // advertisements, DHCP option fingerprints, or outbound
                            // connection tracking, so those signals never populate here.
                            let scan = ScanResult {
                                ip_address: entry.ip.clone(),
                                mac: Some(entry.mac.clone()),
                                open_ports: open_ports.clone(),
                                ..Default::default()
                            };
                            if let Err(err) = device_manager.process_scan_result(scan).await {
                                warn!(%err, "failed to process scan result");
                                continue;
                            }

                            let Some(ports) = open_ports.filter(|p| !p.is_empty()) else { continue };
                            feed_baseline_or_anomaly(
                                &storage,
                                &baseline_collector,
                                &anomaly_detector,
                                &learning_clock,
                                &entry.ip,
                                &entry.mac,
                                &ports,
                            )
                            .await;
                        }

                        if let Err(err) = insight_analyzer.analyze_all_devices().await {
                            warn!(%err, "security insight sweep failed");
                        }

                        match learning_clock.is_learning_active().await {
                            Ok(true) => {
                                if let Err(err) = event_bus.publish("system.learning_progress", serde_json::json!({}), None).await {
                                    warn!(%err, "failed to publish system.learning_progress");
                                }
                            }
                            Ok(false) => {
                                if !learning_complete_announced.swap(true, Ordering::SeqCst) {
                                    if let Err(err) = event_bus.publish("system.learning_complete", serde_json::json!({}), None).await {
                                        warn!(%err, "failed to publish system.learning_complete");
                                    }
                                }
                            }
                            Err(err) => warn!(%err, "failed to read learning clock"),
                        }

                        if first_scan.swap(false, Ordering::SeqCst) {
                            if let Err(err) = event_bus.publish("system.scan_complete", serde_json::json!({}), None).await {
                                warn!(%err, "failed to publish system.scan_complete");
                            }

                            let observed = collect_observed_services(&storage).await;
                            if let Err(err) = decoy_orchestrator.auto_deploy(&observed).await {
                                warn!(%err, "auto_deploy failed on first scan");
                            }
                        }
                    }
                    Err(err) => warn!(%err, "arp_scan failed"),
                }

                scan_running.store(false, Ordering::SeqCst);
            }
        })
    }

    fn spawn_scout_loop(&self) -> tokio::task::JoinHandle<()> {
        let scout = self.scout_engine.clone().expect("startup must run before run_forever");
        let initial_delay = sensor_scout::DEFAULT_INITIAL_DELAY_SECONDS;
        let interval_minutes = self.config.scout_interval_minutes;
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            scout.run_scheduled(initial_delay, interval_minutes, shutdown).await;
        })
    }

    fn spawn_health_supervision(&self) -> tokio::task::JoinHandle<()> {
        let decoy_orchestrator = self.decoy_orchestrator.clone().expect("startup must run before run_forever");
        let interval_secs = self.config.health_check_interval_secs;
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            decoy_orchestrator.run_health_supervision(interval_secs, shutdown).await;
        })
    }

    fn spawn_dns_canary_loop(&self) -> tokio::task::JoinHandle<()> {
        let dns_canary = self.dns_canary.clone().expect("startup must run before run_forever");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(30));
            loop {
                ticker.tick().await;
                let mut monitor = dns_canary.lock().await;
                if let Err(err) = monitor.poll().await {
                    warn!(%err, "dns canary poll failed");
                }
            }
        })
    }

    fn spawn_retention_loop(&self) -> tokio::task::JoinHandle<()> {
        let retention = self.retention_service.clone().expect("startup must run before run_forever");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(3600));
            loop {
                ticker.tick().await;
                match retention.purge().await {
                    Ok(result) => info!(?result, "retention purge complete"),
                    Err(err) => warn!(%err, "retention purge failed"),
                }
            }
        })
    }

    /// Best-effort: publishes a sensor-offline notice so downstream
    /// consumers of the event log see why the process stopped. Never
    /// masks the original error that triggered the fatal path.
    pub async fn record_fatal_error(&self, error_text: &str) {
        self.set_state(SensorState::Failed);
        let Some(event_bus) = &self.event_bus else { return };
        if let Err(err) = event_bus
            .publish("system.sensor_offline", serde_json::json!({"reason": error_text}), None)
            .await
        {
            error!(%err, "failed to publish sensor_offline for fatal error");
        }
    }
}

/// Feeds this tick's open-ports signal into the learning/anomaly pipeline
/// for an approved device at `ip`. The collaborator exposes no outbound
/// connection tracking, so the "destination" a device's own newly-opened
/// listening port is treated as the behavioral signal: during learning it
/// is recorded into the baseline, afterward a port never seen before on
/// this device raises a behavioral anomaly.
async fn feed_baseline_or_anomaly(
    storage: &Storage,
    baseline_collector: &BaselineCollector,
    anomaly_detector: &AnomalyDetector,
    learning_clock: &LearningClock,
    ip: &str,
    mac: &str,
    ports: &[u16],
) {
    let device = match storage.get_device_by_ip(ip).await {
        Ok(Some(device)) => device,
        Ok(None) => return,
        Err(err) => {
            warn!(%err, ip, "failed to look up device for baseline/anomaly feed");
            return;
        }
    };

    let trust = match storage.get_device_trust(device.id).await {
        Ok(trust) => trust,
        Err(err) => {
            warn!(%err, device_id = device.id, "failed to look up device trust");
            return;
        }
    };
    if trust.map(|t| t.status) != Some("approved".to_string()) {
        return;
    }

    let destinations: Vec<(String, u16)> = ports.iter().map(|port| (ip.to_string(), *port)).collect();

    match learning_clock.is_learning_active().await {
        Ok(true) => {
            if let Err(err) = baseline_collector.record_connections(device.id, &destinations).await {
                warn!(%err, device_id = device.id, "failed to record connection baseline");
            }
        }
        Ok(false) => match anomaly_detector.check_device(device.id, &destinations, ip, Some(mac)).await {
            Ok(anomalies) if !anomalies.is_empty() => {
                info!(device_id = device.id, count = anomalies.len(), "behavioral anomalies detected");
            }
            Ok(_) => {}
            Err(err) => warn!(%err, device_id = device.id, "anomaly detection failed"),
        },
        Err(err) => warn!(%err, device_id = device.id, "failed to read learning clock"),
    }
}

/// Builds the decoy-deployment candidate list from ports already recorded
/// against known devices. `auto_deploy` binds each decoy to the sensor's
/// own host rather than the device's address, since the sensor has no
/// standing claim on another host's IP until `sensor_mimic` allocates one.
async fn collect_observed_services(storage: &Storage) -> Vec<ObservedService> {
    let devices = match storage.list_devices().await {
        Ok(devices) => devices,
        Err(err) => {
            warn!(%err, "failed to list devices for auto_deploy");
            return Vec::new();
        }
    };

    let mut observed = Vec::new();
    let mut seen_ports = std::collections::HashSet::new();
    for device in devices {
        let ports = match storage.list_open_ports_for_device(device.id).await {
            Ok(ports) => ports,
            Err(err) => {
                warn!(%err, device_id = device.id, "failed to list open ports for device");
                continue;
            }
        };
        for port_row in ports {
            let port = port_row.port as u16;
            if seen_ports.insert(port) {
                observed.push(ObservedService { bind_address: "0.0.0.0".to_string(), port });
            }
        }
    }
    observed
}
