// Path and File Name : /home/sensor/home-sensor-core/core/mimic/src/template.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Mimic template generation: category mapping, route-table replay, and mDNS naming

use std::collections::HashMap;
use std::net::Ipv4Addr;

use sensor_deception::{Route, RouteResponse};
use sensor_storage::models::ServiceProfileRow;
use sha2::{Digest, Sha256};

/// Response headers that are specific to one TCP connection and must never
/// be replayed verbatim, since the mimic serves a different connection
/// each time it's hit.
const HOP_BY_HOP_HEADERS: &[&str] = &["transfer-encoding", "connection", "keep-alive", "content-length", "content-encoding"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimicCategory {
    SmartHome,
    Camera,
    Nas,
    Media,
    Printer,
    Router,
    DevServer,
    Generic,
}

impl MimicCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MimicCategory::SmartHome => "smart_home",
            MimicCategory::Camera => "camera",
            MimicCategory::Nas => "nas",
            MimicCategory::Media => "media",
            MimicCategory::Printer => "printer",
            MimicCategory::Router => "router",
            MimicCategory::DevServer => "dev_server",
            MimicCategory::Generic => "generic",
        }
    }

    pub fn from_device_type(device_type: &str) -> MimicCategory {
        match device_type {
            "smart_home" | "smart_plug" | "smart_bulb" | "thermostat" | "sensor_hub" => MimicCategory::SmartHome,
            "camera" | "doorbell" => MimicCategory::Camera,
            "nas" => MimicCategory::Nas,
            "media" | "streaming" | "tv" => MimicCategory::Media,
            "printer" => MimicCategory::Printer,
            "router" | "network_equipment" => MimicCategory::Router,
            "computer" | "sbc" | "server" => MimicCategory::DevServer,
            _ => MimicCategory::Generic,
        }
    }

    /// The credential type string a deployed mimic decoy should plant,
    /// matched to what a real device of this category would plausibly
    /// expose.
    pub fn credential_strategy(&self) -> &'static str {
        match self {
            MimicCategory::SmartHome => "bearer_token",
            MimicCategory::Camera => "user_pass",
            MimicCategory::Nas => "user_pass",
            MimicCategory::Media => "user_pass",
            MimicCategory::Printer => "user_pass",
            MimicCategory::Router => "user_pass",
            MimicCategory::DevServer => "env_file",
            MimicCategory::Generic => "user_pass",
        }
    }

    pub fn mdns_service_type(&self) -> &'static str {
        match self {
            MimicCategory::SmartHome => "_hap._tcp.local.",
            MimicCategory::Camera => "_rtsp._tcp.local.",
            MimicCategory::Nas => "_smb._tcp.local.",
            MimicCategory::Media => "_airplay._tcp.local.",
            MimicCategory::Printer => "_ipp._tcp.local.",
            MimicCategory::Router => "_http._tcp.local.",
            MimicCategory::DevServer => "_http._tcp.local.",
            MimicCategory::Generic => "_http._tcp.local.",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MimicTemplate {
    pub category: MimicCategory,
    pub routes: Vec<Route>,
    pub server_header: Option<String>,
    pub credential_strategy: String,
    pub mdns_service_type: String,
    pub mdns_name: String,
    pub ports: Vec<u16>,
}

fn strip_hop_by_hop(headers_json: &str) -> Vec<(String, String)> {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(headers_json) else {
        return Vec::new();
    };
    map.into_iter()
        .filter(|(k, _)| !HOP_BY_HOP_HEADERS.contains(&k.to_ascii_lowercase().as_str()))
        .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
        .collect()
}

fn most_common_server_header(profiles: &[ServiceProfileRow]) -> Option<String> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for profile in profiles {
        let Some(headers_json) = &profile.headers else { continue };
        for (key, value) in strip_hop_by_hop(headers_json) {
            if key.eq_ignore_ascii_case("server") {
                *counts.entry(value).or_insert(0) += 1;
            }
        }
    }
    counts.into_iter().max_by_key(|(_, count)| *count).map(|(value, _)| value)
}

/// Derives a deterministic mDNS hostname from the category and the
/// virtual IP so repeated deployments of the same template don't collide
/// on the local network, and an operator can recognize the pattern.
pub fn mdns_name_for(category: MimicCategory, virtual_ip: Ipv4Addr) -> String {
    let mut hasher = Sha256::new();
    hasher.update(category.as_str().as_bytes());
    hasher.update(virtual_ip.octets());
    let digest = hasher.finalize();
    format!("{}-{:x}{:x}{:x}{:x}", category.as_str(), digest[0], digest[1], digest[2], digest[3])
}

/// Builds a route table by replaying each profiled port's HTTP response
/// verbatim (minus hop-by-hop headers), falling back to a generic 404 for
/// ports that were only ever seen as raw TCP banners.
pub fn build_template(device_type: &str, profiles: &[ServiceProfileRow], virtual_ip: Ipv4Addr) -> MimicTemplate {
    let category = MimicCategory::from_device_type(device_type);
    let server_header = most_common_server_header(profiles);

    let mut routes = Vec::new();
    let mut ports = Vec::new();
    for profile in profiles {
        ports.push(profile.port as u16);
        if profile.protocol != "http" && profile.protocol != "https" {
            continue;
        }
        let status = profile.http_status.unwrap_or(200) as u16;
        let mut headers = profile.headers.as_deref().map(strip_hop_by_hop).unwrap_or_default();
        if let Some(server) = &server_header {
            headers.retain(|(k, _)| !k.eq_ignore_ascii_case("server"));
            headers.push(("Server".to_string(), server.clone()));
        }
        let body = profile.body_snippet.clone().unwrap_or_default();
        routes.push(Route { path: "/".into(), method: "GET".into(), response: RouteResponse { status, headers, body } });
    }

    let mdns_name = mdns_name_for(category, virtual_ip);

    MimicTemplate {
        category,
        routes,
        server_header,
        credential_strategy: category.credential_strategy().to_string(),
        mdns_service_type: category.mdns_service_type().to_string(),
        mdns_name,
        ports,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(port: i64, protocol: &str, headers: Option<&str>) -> ServiceProfileRow {
        ServiceProfileRow {
            id: 1,
            device_id: 1,
            port,
            protocol: protocol.into(),
            http_status: Some(200),
            headers: headers.map(String::from),
            body_snippet: Some("<html></html>".into()),
            favicon_hash: None,
            tls_common_name: None,
            tls_issuer: None,
            tls_not_after: None,
            banner: None,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn category_maps_camera_device_types() {
        assert_eq!(MimicCategory::from_device_type("camera").as_str(), "camera");
        assert_eq!(MimicCategory::from_device_type("doorbell").as_str(), "camera");
    }

    #[test]
    fn strip_hop_by_hop_removes_connection_header() {
        let headers = r#"{"Connection":"keep-alive","Server":"lighttpd"}"#;
        let stripped = strip_hop_by_hop(headers);
        assert_eq!(stripped.len(), 1);
        assert_eq!(stripped[0].0, "Server");
    }

    #[test]
    fn build_template_selects_most_common_server_header() {
        let profiles = vec![
            profile(80, "http", Some(r#"{"Server":"lighttpd/1.4"}"#)),
            profile(8080, "http", Some(r#"{"Server":"lighttpd/1.4"}"#)),
            profile(443, "https", Some(r#"{"Server":"nginx/1.2"}"#)),
        ];
        let template = build_template("camera", &profiles, Ipv4Addr::new(192, 168, 1, 200));
        assert_eq!(template.server_header, Some("lighttpd/1.4".to_string()));
        assert_eq!(template.ports.len(), 3);
    }

    #[test]
    fn mdns_name_is_deterministic_for_same_inputs() {
        let ip = Ipv4Addr::new(192, 168, 1, 201);
        assert_eq!(mdns_name_for(MimicCategory::Nas, ip), mdns_name_for(MimicCategory::Nas, ip));
    }
}
