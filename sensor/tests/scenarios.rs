// Path and File Name : /home/sensor/home-sensor-core/sensor/tests/scenarios.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: End-to-end coverage of the wired subsystem pipeline: device discovery, credential trips, incident correlation, behavioral anomalies, decoy health, and virtual IP exclusion

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::Arc;

use base64::Engine;
use ipnetwork::Ipv4Network;
use sensor_classifier::{DeviceClassifier, SignatureDB};
use sensor_deception::{DecoyOrchestrator, ObservedService};
use sensor_device_manager::{DeviceManager, ScanOutcome, ScanResult};
use sensor_event_bus::EventBus;
use sensor_incident::{AlertType, IncidentAggregator};
use sensor_mimic::IpAllocator;
use sensor_storage::Storage;

async fn memory_storage() -> Arc<Storage> {
    Arc::new(Storage::connect("sqlite::memory:").await.unwrap())
}

fn fresh_device_manager(storage: Arc<Storage>, bus: Arc<EventBus>) -> DeviceManager {
    let classifier = DeviceClassifier::new(SignatureDB::with_defaults(), None);
    DeviceManager::new(storage, bus, classifier)
}

#[tokio::test]
async fn s1_arp_scan_discovers_device_with_oui_vendor_and_one_event() {
    let storage = memory_storage().await;
    let bus = Arc::new(EventBus::new(storage.clone()));
    let manager = fresh_device_manager(storage.clone(), bus.clone());

    let scan = ScanResult {
        ip_address: "192.168.1.50".to_string(),
        mac: Some("A4:83:E7:11:22:33".to_string()),
        ..Default::default()
    };

    let outcome = manager.process_scan_result(scan).await.unwrap();
    let device_id = match outcome {
        ScanOutcome::Discovered { device_id } => device_id,
        other => panic!("expected Discovered outcome on a first sighting, got {other:?}"),
    };

    let device = storage
        .list_devices()
        .await
        .unwrap()
        .into_iter()
        .find(|d| d.id == device_id)
        .expect("discovered device must be persisted");
    assert_eq!(device.ip_address, "192.168.1.50");
    assert!(
        device.vendor.as_deref().unwrap_or("").contains("Apple"),
        "expected an Apple OUI hit, got {:?}",
        device.vendor
    );

    let events = bus.replay(0).await.unwrap();
    let discovered: Vec<_> = events.iter().filter(|e| e.event_type == "device.discovered").collect();
    assert_eq!(discovered.len(), 1);
    assert_eq!(discovered[0].seq, 1);
}

#[tokio::test]
async fn s2_credential_trip_records_connection_and_trips_planted_credential() {
    let storage = memory_storage().await;
    let bus = Arc::new(EventBus::new(storage.clone()));
    let orchestrator = DecoyOrchestrator::new(storage.clone(), bus.clone());

    orchestrator
        .auto_deploy(&[ObservedService { bind_address: "127.0.0.1".into(), port: 0 }])
        .await
        .unwrap();

    let decoy = &storage.list_decoys().await.unwrap()[0];
    let running = orchestrator.registry().get(decoy.id).expect("decoy should be registered after deploy");
    let planted = running.blueprint.planted_credentials[0].clone();

    let route = running
        .blueprint
        .routes
        .first()
        .expect("a file-share decoy must serve at least one route")
        .clone();

    let basic = base64::engine::general_purpose::STANDARD.encode(format!("admin:{}", planted.credential_value));
    let url = format!("http://{}{}", running.bound_addr, route.path);
    let client = reqwest::Client::new();
    let resp = client
        .get(&url)
        .header("Authorization", format!("Basic {basic}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let refreshed = storage.get_decoy(decoy.id).await.unwrap();
    assert_eq!(refreshed.connection_count, 1);

    let tripped = storage
        .find_credential_by_value(&planted.credential_value)
        .await
        .unwrap()
        .expect("planted credential row must exist");
    assert!(tripped.tripped);
    assert!(tripped.first_tripped_at.is_some());
}

#[tokio::test]
async fn s3_three_alerts_within_window_correlate_into_one_critical_incident() {
    let storage = memory_storage().await;
    let bus = Arc::new(EventBus::new(storage.clone()));
    let aggregator = IncidentAggregator::new(storage.clone(), bus.clone(), 5, 30);

    let source_ip = "192.168.1.99";

    aggregator
        .submit_alert(AlertType::DeviceNew, "new device", "first sighting", source_ip, None, None)
        .await
        .unwrap();
    aggregator
        .submit_alert(AlertType::DeviceMacChanged, "mac changed", "mac mismatch", source_ip, None, None)
        .await
        .unwrap();
    let third = aggregator
        .submit_alert(AlertType::DecoyCredentialTrip, "credential tripped", "planted credential used", source_ip, None, None)
        .await
        .unwrap();

    let incident = storage.find_active_incident(source_ip).await.unwrap().expect("incident must exist");
    assert_eq!(incident.id, third.incident_id);
    assert_eq!(incident.alert_count, 3);
    assert_eq!(incident.severity, "critical");
    assert!(incident.first_alert_at <= incident.last_alert_at);
}

#[tokio::test]
async fn s4_unseen_destination_triggers_anomaly_seen_destination_does_not() {
    let storage = memory_storage().await;
    let bus = Arc::new(EventBus::new(storage.clone()));
    let aggregator = Arc::new(IncidentAggregator::new(storage.clone(), bus.clone(), 5, 30));
    let detector = sensor_device_manager::AnomalyDetector::new(storage.clone(), aggregator);

    let now = chrono::Utc::now();
    let device = storage.upsert_device_by_ip("192.168.1.10", None, None, now).await.unwrap();
    storage.upsert_connection_baseline(device.id, "10.0.0.1", 443, now).await.unwrap();

    let seen = detector
        .check_device(device.id, &[("10.0.0.1".to_string(), 443)], "192.168.1.10", None)
        .await
        .unwrap();
    assert!(seen.is_empty(), "a previously baselined destination must never alert");

    let unseen = detector
        .check_device(device.id, &[("10.0.0.99".to_string(), 8080)], "192.168.1.10", None)
        .await
        .unwrap();
    assert_eq!(unseen.len(), 1);
    assert_eq!(unseen[0].dest_ip, "10.0.0.99");
    assert_eq!(unseen[0].dest_port, 8080);
}

#[tokio::test]
async fn s5_zero_port_decoy_gets_assigned_port_and_reports_healthy() {
    let storage = memory_storage().await;
    let bus = Arc::new(EventBus::new(storage.clone()));
    let orchestrator = DecoyOrchestrator::new(storage.clone(), bus.clone());

    orchestrator
        .auto_deploy(&[ObservedService { bind_address: "127.0.0.1".into(), port: 0 }])
        .await
        .unwrap();

    let decoy = &storage.list_decoys().await.unwrap()[0];
    assert_ne!(decoy.port, 0, "a port=0 decoy must be persisted with its OS-assigned port");

    let healthy = orchestrator.health_check(decoy.id).await;
    assert!(healthy, "a freshly started decoy must report healthy");
}

#[tokio::test]
async fn s6_virtual_ip_allocator_excludes_reserved_and_observed_addresses() {
    let network = Ipv4Network::from_str("192.168.1.0/24").unwrap();
    let allocator = IpAllocator::new(network);

    let mut excluded: HashSet<Ipv4Addr> = HashSet::new();
    excluded.insert(Ipv4Addr::new(192, 168, 1, 0)); // network
    excluded.insert(Ipv4Addr::new(192, 168, 1, 255)); // broadcast
    excluded.insert(Ipv4Addr::new(192, 168, 1, 1)); // gateway
    excluded.insert(Ipv4Addr::new(192, 168, 1, 50)); // sensor
    excluded.insert(Ipv4Addr::new(192, 168, 1, 200)); // observed via ARP
    excluded.insert(Ipv4Addr::new(192, 168, 1, 201)); // observed via ARP

    let mut allocated = Vec::new();
    for _ in 0..3 {
        allocated.push(allocator.allocate(&excluded).unwrap());
    }

    assert_eq!(allocated.len(), 3);
    for ip in &allocated {
        assert!(!excluded.contains(ip), "allocator must never hand out an excluded address");
        assert!(ip.octets()[3] >= 202 && ip.octets()[3] <= 250);
    }
    let unique: HashSet<_> = allocated.iter().collect();
    assert_eq!(unique.len(), 3, "allocator must never double-allocate an octet");
}
