use std::collections::VecDeque;

use crate::core::repr::{
    EthernetAddress,
    Ipv4Address,
};

/// Default number of mappings held before the oldest is overwritten.
pub const DEFAULT_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug)]
struct Entry {
    ipv4_addr: Ipv4Address,
    eth_addr: EthernetAddress,
}

/// Maintains a bounded log of IPv4 -> ethernet address mappings.
///
/// Inserts append to the log, evicting the oldest entry when full. Lookups
/// scan the whole log and take the newest match, so older entries for the
/// same address are shadowed until they age out.
#[derive(Debug)]
pub struct ArpCache {
    entries: VecDeque<Entry>,
    capacity: usize,
}

impl ArpCache {
    /// Creates an ARP cache holding at most capacity mappings.
    pub fn new(capacity: usize) -> ArpCache {
        ArpCache {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Lookup the ethernet address for an IPv4 address.
    pub fn eth_addr_for_ip(&self, ipv4_addr: Ipv4Address) -> Option<EthernetAddress> {
        self.entries
            .iter()
            .filter(|entry| entry.ipv4_addr == ipv4_addr)
            .last()
            .map(|entry| entry.eth_addr)
    }

    /// Record the ethernet address mapping for an IPv4 address.
    pub fn set_eth_addr_for_ip(&mut self, ipv4_addr: Ipv4Address, eth_addr: EthernetAddress) {
        if self.capacity == 0 {
            return;
        }

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }

        self.entries.push_back(Entry {
            ipv4_addr,
            eth_addr,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for ArpCache {
    fn default() -> ArpCache {
        ArpCache::new(DEFAULT_CAPACITY)
    }
}
