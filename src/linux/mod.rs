//! Linux specific devices and helpers.

pub mod dev;
mod libc;

use std::net::IpAddr;

use crate::core::repr::Ipv4Address;
use crate::{
    Error,
    Result,
};

/// Gets the IPv4 address the host assigned to an interface.
pub fn ifr_addr(ifr_name: &str) -> Result<Ipv4Address> {
    for interface in get_if_addrs::get_if_addrs()? {
        if interface.name == ifr_name {
            if let IpAddr::V4(ipv4_addr) = interface.ip() {
                return Ok(Ipv4Address::new(ipv4_addr.octets()));
            }
        }
    }

    debug!("No IPv4 address found for interface {}.", ifr_name);
    Err(Error::Address)
}
