// Path and File Name : /home/sensor/home-sensor-core/core/mimic/src/ipalloc.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Virtual-IP allocator scoped to a host-octet range within the local subnet

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use ipnetwork::Ipv4Network;
use parking_lot::Mutex;
use sensor_storage::Storage;

use crate::error::MimicError;

pub const DEFAULT_RANGE_START: u8 = 200;
pub const DEFAULT_RANGE_END: u8 = 250;

/// Tracks which host-octet values in `[range_start, range_end]` are
/// currently handed out. Exclusions (network/broadcast/gateway/sensor IP,
/// ARP-seen IPs) are supplied fresh on every allocation call rather than
/// cached, since they can change between calls.
pub struct IpAllocator {
    network: Ipv4Network,
    range_start: u8,
    range_end: u8,
    allocated: Mutex<HashSet<u8>>,
}

impl IpAllocator {
    pub fn new(network: Ipv4Network) -> Self {
        Self::with_range(network, DEFAULT_RANGE_START, DEFAULT_RANGE_END)
    }

    pub fn with_range(network: Ipv4Network, range_start: u8, range_end: u8) -> Self {
        Self { network, range_start, range_end, allocated: Mutex::new(HashSet::new()) }
    }

    fn host_octet(&self, ip: Ipv4Addr) -> u8 {
        ip.octets()[3]
    }

    fn candidate_ip(&self, octet: u8) -> Ipv4Addr {
        let base = self.network.network().octets();
        Ipv4Addr::new(base[0], base[1], base[2], octet)
    }

    /// Picks the lowest free octet in range not present in `excluded`,
    /// marking it allocated. `excluded` carries the network address,
    /// broadcast, gateway, sensor IP, and any IP seen in the most recent
    /// ARP scan, in addition to whatever this allocator already tracks.
    pub fn allocate(&self, excluded: &HashSet<Ipv4Addr>) -> Result<Ipv4Addr, MimicError> {
        let mut allocated = self.allocated.lock();
        for octet in self.range_start..=self.range_end {
            if allocated.contains(&octet) {
                continue;
            }
            let candidate = self.candidate_ip(octet);
            if excluded.contains(&candidate) {
                continue;
            }
            allocated.insert(octet);
            return Ok(candidate);
        }
        Err(MimicError::IpPoolExhausted)
    }

    pub fn release(&self, ip: Ipv4Addr) {
        self.allocated.lock().remove(&self.host_octet(ip));
    }

    /// Seeds allocator state from storage so a restart doesn't immediately
    /// hand out IPs that are still aliased.
    pub fn mark_allocated(&self, ip: Ipv4Addr) {
        self.allocated.lock().insert(self.host_octet(ip));
    }

    pub fn allocated_count(&self) -> usize {
        self.allocated.lock().len()
    }
}

/// Persists allocation/release against the virtual_ips table on top of the
/// in-memory [`IpAllocator`], and reconstructs allocator state at boot.
pub struct VirtualIpManager {
    storage: Arc<Storage>,
    allocator: IpAllocator,
}

impl VirtualIpManager {
    pub async fn load(storage: Arc<Storage>, network: Ipv4Network) -> Result<Self, MimicError> {
        let allocator = IpAllocator::new(network);
        for row in storage.list_allocated_virtual_ips().await? {
            if let Ok(ip) = Ipv4Addr::from_str(&row.ip_address) {
                allocator.mark_allocated(ip);
            }
        }
        Ok(Self { storage, allocator })
    }

    pub async fn allocate(&self, interface: &str, excluded: &HashSet<Ipv4Addr>, decoy_id: Option<i64>) -> Result<Ipv4Addr, MimicError> {
        let ip = self.allocator.allocate(excluded)?;
        if let Err(e) = self.storage.allocate_virtual_ip(&ip.to_string(), interface, decoy_id, Utc::now()).await {
            self.allocator.release(ip);
            return Err(e.into());
        }
        Ok(ip)
    }

    pub async fn release(&self, ip: Ipv4Addr) -> Result<(), MimicError> {
        self.storage.release_virtual_ip(&ip.to_string(), Utc::now()).await?;
        self.allocator.release(ip);
        Ok(())
    }

    pub fn allocated_count(&self) -> usize {
        self.allocator.allocated_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_network() -> Ipv4Network {
        Ipv4Network::new(Ipv4Addr::new(192, 168, 1, 0), 24).unwrap()
    }

    #[test]
    fn allocate_skips_excluded_addresses() {
        let allocator = IpAllocator::with_range(test_network(), 200, 202);
        let mut excluded = HashSet::new();
        excluded.insert(Ipv4Addr::new(192, 168, 1, 200));

        let ip = allocator.allocate(&excluded).unwrap();
        assert_eq!(ip, Ipv4Addr::new(192, 168, 1, 201));
    }

    #[test]
    fn allocate_exhausts_and_release_frees_slot() {
        let allocator = IpAllocator::with_range(test_network(), 200, 201);
        let excluded = HashSet::new();

        let first = allocator.allocate(&excluded).unwrap();
        let _second = allocator.allocate(&excluded).unwrap();
        assert!(allocator.allocate(&excluded).is_err());

        allocator.release(first);
        assert!(allocator.allocate(&excluded).is_ok());
    }
}
