// Path and File Name : /home/sensor/home-sensor-core/core/deception/src/registry.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: In-memory tracking of running decoy handles, mirrored against durable storage

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Notify;

use crate::archetypes::DecoyBlueprint;

/// A live decoy instance. The http server task listens until `shutdown` is
/// notified; `bound_addr` reflects the OS-assigned port when the decoy was
/// started on port 0.
pub struct RunningDecoy {
    pub decoy_id: i64,
    pub blueprint: DecoyBlueprint,
    pub bound_addr: SocketAddr,
    pub shutdown: Arc<Notify>,
}

#[derive(Default)]
pub struct DecoyRegistry {
    running: RwLock<HashMap<i64, Arc<RunningDecoy>>>,
}

impl DecoyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, decoy: Arc<RunningDecoy>) {
        self.running.write().insert(decoy.decoy_id, decoy);
    }

    pub fn get(&self, decoy_id: i64) -> Option<Arc<RunningDecoy>> {
        self.running.read().get(&decoy_id).cloned()
    }

    pub fn remove(&self, decoy_id: i64) -> Option<Arc<RunningDecoy>> {
        self.running.write().remove(&decoy_id)
    }

    pub fn is_running(&self, decoy_id: i64) -> bool {
        self.running.read().contains_key(&decoy_id)
    }

    pub fn running_ids(&self) -> Vec<i64> {
        self.running.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.running.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_decoy(id: i64) -> Arc<RunningDecoy> {
        Arc::new(RunningDecoy {
            decoy_id: id,
            blueprint: crate::archetypes::build_blueprint(crate::archetypes::DecoyArchetype::FileShare),
            bound_addr: "127.0.0.1:0".parse().unwrap(),
            shutdown: Arc::new(Notify::new()),
        })
    }

    #[test]
    fn insert_get_remove_round_trips() {
        let registry = DecoyRegistry::new();
        registry.insert(fake_decoy(1));
        assert!(registry.is_running(1));
        assert_eq!(registry.len(), 1);
        let removed = registry.remove(1);
        assert!(removed.is_some());
        assert!(!registry.is_running(1));
    }

    #[test]
    fn running_ids_reflects_contents() {
        let registry = DecoyRegistry::new();
        registry.insert(fake_decoy(1));
        registry.insert(fake_decoy(2));
        let mut ids = registry.running_ids();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
    }
}
