//! Packet processing services for different network layers.
//!
//! The `service` module deals with packet transmission and reception logic at
//! different layers of the network stack. Each layer is a set of functions
//! over a shared `Interface`.

pub mod arp;
pub mod ethernet;
pub mod icmpv4;
pub mod ipv4;
pub mod tcp;
pub mod udp;

use crate::core::dev::Device;
use crate::core::repr::{
    EthernetAddress,
    Ipv4Address,
};

/// An interface for sending and receiving network packets.
pub struct Interface {
    /// Device for sending and receiving raw Ethernet frames.
    pub dev: Box<dyn Device>,
    /// Ethernet address for the interface.
    pub ethernet_addr: EthernetAddress,
    /// IPv4 address for the interface.
    pub ipv4_addr: Ipv4Address,
    /// Subnet mask for ipv4_addr.
    pub netmask: Ipv4Address,
    /// Default gateway for IPv4 packets not on the interface subnet. This
    /// should be on the same subnet as ipv4_addr!
    pub default_gateway: Ipv4Address,
    /// Address translations and outstanding lookups.
    pub arp: arp::ArpState,
    /// Reassembly and holding buffers.
    pub ipv4: ipv4::Ipv4State,
}

impl Interface {
    /// Creates an unconfigured interface over a device.
    pub fn new(dev: Box<dyn Device>) -> Interface {
        Interface {
            dev,
            ethernet_addr: EthernetAddress::WILDCARD,
            ipv4_addr: Ipv4Address::UNSPECIFIED,
            netmask: Ipv4Address::BROADCAST,
            default_gateway: Ipv4Address::UNSPECIFIED,
            arp: arp::ArpState::default(),
            ipv4: ipv4::Ipv4State::default(),
        }
    }
}
