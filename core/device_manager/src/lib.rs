// Path and File Name : /home/sensor/home-sensor-core/core/device_manager/src/lib.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Device lifecycle management plus learning-mode connection baselining and anomaly detection

pub mod baseline;
pub mod error;
pub mod manager;

pub use baseline::{Anomaly, AnomalyDetector, BaselineCollector, LearningClock};
pub use error::DeviceManagerError;
pub use manager::{DeviceManager, ExternalDeviceRecord, ScanOutcome, ScanResult, AUTO_APPROVE_THRESHOLD, VERIFY_THRESHOLD};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sensor_classifier::{DeviceClassifier, SignatureDB};
    use sensor_event_bus::EventBus;
    use sensor_storage::Storage;

    use super::*;

    async fn memory_storage() -> Arc<Storage> {
        Arc::new(Storage::connect("sqlite::memory:").await.unwrap())
    }

    fn test_classifier() -> DeviceClassifier {
        DeviceClassifier::new(SignatureDB::with_defaults(), None)
    }

    #[tokio::test]
    async fn new_device_is_discovered_with_unknown_trust() {
        let storage = memory_storage().await;
        let bus = Arc::new(EventBus::new(storage.clone()));
        let manager = DeviceManager::new(storage.clone(), bus, test_classifier());

        let scan = ScanResult {
            ip_address: "192.168.1.50".into(),
            mac: Some("AA:BB:CC:DD:EE:FF".into()),
            ..Default::default()
        };

        let outcome = manager.process_scan_result(scan).await.unwrap();
        match outcome {
            ScanOutcome::Discovered { device_id } => {
                let trust = storage.get_device_trust(device_id).await.unwrap().unwrap();
                assert_eq!(trust.status, "unknown");
            }
            other => panic!("expected Discovered, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn custom_name_survives_repeated_scans() {
        let storage = memory_storage().await;
        let bus = Arc::new(EventBus::new(storage.clone()));
        let manager = DeviceManager::new(storage.clone(), bus, test_classifier());

        let scan = ScanResult {
            ip_address: "192.168.1.60".into(),
            mac: Some("11:22:33:44:55:66".into()),
            ..Default::default()
        };
        let ScanOutcome::Discovered { device_id } = manager.process_scan_result(scan.clone()).await.unwrap() else {
            panic!("expected Discovered");
        };
        storage.set_device_custom_name(device_id, "Kitchen Pi").await.unwrap();

        manager.process_scan_result(scan).await.unwrap();

        let device = storage.get_device(device_id).await.unwrap();
        assert_eq!(device.custom_name.as_deref(), Some("Kitchen Pi"));
    }

    #[tokio::test]
    async fn anomaly_detector_skips_devices_without_baseline() {
        let storage = memory_storage().await;
        let bus = Arc::new(EventBus::new(storage.clone()));
        let incident_bus = Arc::new(EventBus::new(storage.clone()));
        let aggregator = Arc::new(sensor_incident::IncidentAggregator::new(storage.clone(), incident_bus, 15, 30));
        let detector = AnomalyDetector::new(storage.clone(), aggregator);
        let _ = bus;

        let device = storage.upsert_device_by_ip("192.168.1.70", None, None, chrono::Utc::now()).await.unwrap();
        let anomalies = detector
            .check_device(device.id, &[("8.8.8.8".into(), 443)], "192.168.1.70", None)
            .await
            .unwrap();
        assert!(anomalies.is_empty());
    }

    #[tokio::test]
    async fn anomaly_detector_flags_unseen_destination_after_baseline_exists() {
        let storage = memory_storage().await;
        let bus = Arc::new(EventBus::new(storage.clone()));
        let aggregator = Arc::new(sensor_incident::IncidentAggregator::new(storage.clone(), bus, 15, 30));
        let detector = AnomalyDetector::new(storage.clone(), aggregator);

        let device = storage.upsert_device_by_ip("192.168.1.71", None, None, chrono::Utc::now()).await.unwrap();
        storage
            .upsert_connection_baseline(device.id, "1.1.1.1", 443, chrono::Utc::now())
            .await
            .unwrap();

        let anomalies = detector
            .check_device(device.id, &[("9.9.9.9".into(), 8080)], "192.168.1.71", None)
            .await
            .unwrap();
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].dest_ip, "9.9.9.9");
    }
}
