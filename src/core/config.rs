//! Interface configuration supplied once at startup.

use crate::core::repr::{
    EthernetAddress,
    Ipv4Address,
};

lazy_static! {
    /// Default interface MAC address.
    pub static ref DEFAULT_ETH_ADDR: EthernetAddress = {
        EthernetAddress::new([0x06, 0x11, 0x22, 0x33, 0x44, 0x55])
    };

    /// Default interface IPv4 address.
    pub static ref DEFAULT_IPV4_ADDR: Ipv4Address = {
        Ipv4Address::new([10, 0, 0, 102])
    };

    /// Default interface subnet mask.
    pub static ref DEFAULT_NETMASK: Ipv4Address = {
        Ipv4Address::new([255, 255, 255, 0])
    };

    /// Default interface IPv4 gateway.
    pub static ref DEFAULT_IPV4_GATEWAY: Ipv4Address = {
        Ipv4Address::new([10, 0, 0, 101])
    };
}

/// Addresses of the interface a stack runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub ethernet_addr: EthernetAddress,
    pub ipv4_addr: Ipv4Address,
    pub netmask: Ipv4Address,
    /// Next hop for destinations outside the subnet. This should be on the
    /// same subnet as ipv4_addr!
    pub default_gateway: Ipv4Address,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            ethernet_addr: *DEFAULT_ETH_ADDR,
            ipv4_addr: *DEFAULT_IPV4_ADDR,
            netmask: *DEFAULT_NETMASK,
            default_gateway: *DEFAULT_IPV4_GATEWAY,
        }
    }
}

impl Config {
    /// Returns the broadcast address of the configured subnet.
    pub fn subnet_broadcast(&self) -> Ipv4Address {
        self.ipv4_addr.subnet_broadcast(self.netmask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_gateway_on_subnet() {
        let config = Config::default();
        assert!(
            config
                .ipv4_addr
                .is_same_subnet(config.default_gateway, config.netmask)
        );
        assert_eq!(config.subnet_broadcast(), Ipv4Address::new([10, 0, 0, 255]));
    }
}
