// Path and File Name : /home/sensor/home-sensor-core/core/incident/src/port_risks.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Port risk knowledge base: maps open ports to risk assessments, varying by device type

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::alert_types::Severity;

#[derive(Debug, Clone)]
pub struct PortRisk {
    pub port: u16,
    pub service_name: String,
    pub risk_description: String,
    pub remediation: String,
    pub severity: Severity,
    /// Device types where this port is expected; no alert is generated for them.
    pub expected_on: &'static [&'static str],
}

static ALWAYS_RISKY: Lazy<Vec<PortRisk>> = Lazy::new(|| {
    vec![
        PortRisk {
            port: 23,
            service_name: "Telnet".into(),
            risk_description: "Telnet transmits all data including passwords in plaintext. Any device running Telnet is vulnerable to credential interception.".into(),
            remediation: "Disable Telnet and use SSH instead. Check your device's admin panel for a 'Remote Access' or 'Management' setting.".into(),
            severity: Severity::High,
            expected_on: &[],
        },
        PortRisk {
            port: 21,
            service_name: "FTP".into(),
            risk_description: "FTP transmits files and credentials in plaintext. It can be intercepted by anyone on your network.".into(),
            remediation: "Disable FTP and use SFTP or SCP instead. If the device requires FTP for firmware updates, disable it after updating.".into(),
            severity: Severity::Medium,
            expected_on: &[],
        },
    ]
});

static CONTEXT_RISKY: Lazy<Vec<PortRisk>> = Lazy::new(|| {
    vec![
        PortRisk {
            port: 22,
            service_name: "SSH".into(),
            risk_description: "SSH access is open. While encrypted, SSH on IoT devices often uses default credentials that are easy to guess.".into(),
            remediation: "If you don't need remote terminal access, disable SSH in the device settings. If you do need it, change the default password.".into(),
            severity: Severity::Medium,
            expected_on: &["computer", "network_equipment", "nas", "sbc"],
        },
        PortRisk {
            port: 445,
            service_name: "SMB file sharing".into(),
            risk_description: "Windows file sharing (SMB) is open. SMB has a long history of critical vulnerabilities including WannaCry and EternalBlue.".into(),
            remediation: "Disable file sharing on this device unless you specifically use it. Ensure the device firmware is up to date.".into(),
            severity: Severity::High,
            expected_on: &["computer", "nas"],
        },
        PortRisk {
            port: 3389,
            service_name: "Remote Desktop (RDP)".into(),
            risk_description: "Remote Desktop is open. RDP is a frequent target for brute-force attacks and has had critical vulnerabilities.".into(),
            remediation: "Disable Remote Desktop if you don't use it. If you need it, ensure strong passwords and Network Level Authentication are enabled.".into(),
            severity: Severity::High,
            expected_on: &["computer"],
        },
        PortRisk {
            port: 5900,
            service_name: "VNC".into(),
            risk_description: "VNC remote desktop is open. Many VNC implementations use weak or no authentication.".into(),
            remediation: "Disable VNC if you don't need remote desktop access. If you do, set a strong password and consider using SSH tunneling.".into(),
            severity: Severity::Medium,
            expected_on: &["computer"],
        },
        PortRisk {
            port: 3306,
            service_name: "MySQL".into(),
            risk_description: "A MySQL database port is exposed on the network. Databases should not be directly accessible from other devices.".into(),
            remediation: "Configure MySQL to listen only on localhost (127.0.0.1). Check the bind-address setting in the MySQL configuration.".into(),
            severity: Severity::High,
            expected_on: &["computer", "nas"],
        },
        PortRisk {
            port: 5432,
            service_name: "PostgreSQL".into(),
            risk_description: "A PostgreSQL database port is exposed on the network. Databases should not be directly accessible from other devices.".into(),
            remediation: "Configure PostgreSQL to listen only on localhost. Check pg_hba.conf and the listen_addresses setting.".into(),
            severity: Severity::High,
            expected_on: &["computer", "nas"],
        },
        PortRisk {
            port: 554,
            service_name: "RTSP video streaming".into(),
            risk_description: "RTSP video streaming is open. This could allow unauthorized viewing of camera feeds if authentication is weak or missing.".into(),
            remediation: "Ensure your camera requires authentication for RTSP streams. Change the default password if you haven't already.".into(),
            severity: Severity::Medium,
            expected_on: &["camera"],
        },
    ]
});

const UNENCRYPTED_ADMIN_PORTS: [u16; 5] = [80, 8080, 8000, 8888, 9090];
const ENCRYPTED_ADMIN_PORTS: [u16; 2] = [443, 8443];
const ADMIN_EXPECTED_DEVICES: [&str; 5] = ["computer", "network_equipment", "nas", "sbc", "streaming"];

/// Evaluates a device's open ports against the risk knowledge base. Returns
/// an empty vec if nothing is risky given the device's type.
pub fn evaluate_device_ports(open_ports: &HashSet<u16>, device_type: &str) -> Vec<PortRisk> {
    let mut findings = Vec::new();

    for rule in ALWAYS_RISKY.iter() {
        if open_ports.contains(&rule.port) {
            findings.push(rule.clone());
        }
    }

    for rule in CONTEXT_RISKY.iter() {
        if open_ports.contains(&rule.port) && !rule.expected_on.contains(&device_type) {
            findings.push(rule.clone());
        }
    }

    if !ADMIN_EXPECTED_DEVICES.contains(&device_type) {
        let http_ports: Vec<u16> = UNENCRYPTED_ADMIN_PORTS.iter().copied().filter(|p| open_ports.contains(p)).collect();
        let has_https = ENCRYPTED_ADMIN_PORTS.iter().any(|p| open_ports.contains(p));
        if !http_ports.is_empty() && !has_https {
            let mut sorted = http_ports;
            sorted.sort_unstable();
            for port in sorted {
                findings.push(PortRisk {
                    port,
                    service_name: format!("Unencrypted admin (port {port})"),
                    risk_description: format!(
                        "An unencrypted web interface is running on port {port} with no HTTPS alternative. Credentials and data sent to this interface can be intercepted on your network."
                    ),
                    remediation: "Check if the device supports HTTPS and enable it. If not, avoid entering sensitive information through this interface.".into(),
                    severity: Severity::Medium,
                    expected_on: &[],
                });
            }
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telnet_is_always_risky_regardless_of_device_type() {
        let ports = HashSet::from([23]);
        let findings = evaluate_device_ports(&ports, "computer");
        assert!(findings.iter().any(|f| f.port == 23));
    }

    #[test]
    fn ssh_is_not_risky_on_expected_device_types() {
        let ports = HashSet::from([22]);
        assert!(evaluate_device_ports(&ports, "computer").is_empty());
        assert!(!evaluate_device_ports(&ports, "camera").is_empty());
    }

    #[test]
    fn unencrypted_admin_suppressed_when_https_also_present() {
        let ports = HashSet::from([80, 443]);
        assert!(evaluate_device_ports(&ports, "camera").is_empty());
    }

    #[test]
    fn unencrypted_admin_flagged_on_iot_without_https() {
        let ports = HashSet::from([8080]);
        let findings = evaluate_device_ports(&ports, "camera");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].port, 8080);
    }
}
