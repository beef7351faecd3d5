// Path and File Name : /home/sensor/home-sensor-core/core/incident/src/alert_types.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Alert type and severity definitions shared across the sensor's alerting paths

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn max(self, other: Severity) -> Severity {
        std::cmp::max(self, other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertType {
    DecoyCredentialTrip,
    DecoyTrip,
    DeviceNew,
    DeviceVerificationNeeded,
    DeviceMacChanged,
    SystemSensorOffline,
    SystemLearningComplete,
    DeviceReviewReminder,
    BehavioralAnomaly,
    SecurityPortRisk,
    SecurityVendorAdvisory,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::DecoyCredentialTrip => "decoy.credential_trip",
            AlertType::DecoyTrip => "decoy.trip",
            AlertType::DeviceNew => "device.new",
            AlertType::DeviceVerificationNeeded => "device.verification_needed",
            AlertType::DeviceMacChanged => "device.mac_changed",
            AlertType::SystemSensorOffline => "system.sensor_offline",
            AlertType::SystemLearningComplete => "system.learning_complete",
            AlertType::DeviceReviewReminder => "device.review_reminder",
            AlertType::BehavioralAnomaly => "behavioral.anomaly",
            AlertType::SecurityPortRisk => "security.port_risk",
            AlertType::SecurityVendorAdvisory => "security.vendor_advisory",
        }
    }

    /// Every alert type has a fixed severity; this mapping must stay total.
    pub fn severity(&self) -> Severity {
        match self {
            AlertType::DecoyCredentialTrip => Severity::Critical,
            AlertType::DecoyTrip => Severity::High,
            AlertType::DeviceNew => Severity::Medium,
            AlertType::DeviceVerificationNeeded => Severity::Medium,
            AlertType::DeviceMacChanged => Severity::High,
            AlertType::SystemSensorOffline => Severity::Low,
            AlertType::SystemLearningComplete => Severity::Low,
            AlertType::DeviceReviewReminder => Severity::Low,
            AlertType::BehavioralAnomaly => Severity::Medium,
            AlertType::SecurityPortRisk => Severity::Medium,
            AlertType::SecurityVendorAdvisory => Severity::Medium,
        }
    }

    pub fn is_decoy_alert(&self) -> bool {
        self.as_str().starts_with("decoy.")
    }

    pub fn is_device_alert(&self) -> bool {
        self.as_str().starts_with("device.")
    }

    pub fn is_system_alert(&self) -> bool {
        self.as_str().starts_with("system.")
    }

    pub fn is_security_alert(&self) -> bool {
        self.as_str().starts_with("security.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_is_critical_high_medium_low() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn category_helpers_match_prefix() {
        assert!(AlertType::DecoyTrip.is_decoy_alert());
        assert!(AlertType::DeviceNew.is_device_alert());
        assert!(AlertType::SystemSensorOffline.is_system_alert());
        assert!(AlertType::SecurityPortRisk.is_security_alert());
    }
}
