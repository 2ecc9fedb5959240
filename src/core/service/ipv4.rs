use crate::core::repr::{
    eth_types,
    ipv4_flags,
    ipv4_protocols,
    EthernetAddress,
    EthernetFrame,
    Ipv4Address,
    Ipv4Packet,
    Ipv4Repr,
};
use crate::core::service::{
    arp,
    ethernet,
    Interface,
};
use crate::core::storage::{
    FlipBuffer,
    FragBuffer,
    Slab,
};
use crate::{
    Error,
    Result,
};

/// Lifetime of an incomplete datagram.
pub const REASSEMBLY_TTL_MS: i64 = 20_000;

/// Largest datagram which can be reassembled.
pub const REASSEMBLY_CAPACITY: usize = 10_000;

/// Maximum number of datagrams being reassembled at once.
pub const MAX_REASSEMBLIES: usize = 16;

/// Space for payloads held while their next hop is resolved.
pub const HOLDING_CAPACITY: usize = 8_192;

/// Consumer of validated (and reassembled) datagrams.
pub trait Handler {
    fn recv_tcp(
        &mut self,
        interface: &mut Interface,
        ipv4_repr: &Ipv4Repr,
        payload: &[u8],
    ) -> Result<()>;

    fn recv_udp(
        &mut self,
        interface: &mut Interface,
        ipv4_repr: &Ipv4Repr,
        payload: &[u8],
    ) -> Result<()>;

    fn recv_icmp(
        &mut self,
        interface: &mut Interface,
        ipv4_repr: &Ipv4Repr,
        payload: &[u8],
    ) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ReassemblyKey {
    dst_addr: Ipv4Address,
    src_addr: Ipv4Address,
    identification: u16,
    protocol: u8,
}

struct Reassembly {
    key: ReassemblyKey,
    ttl: i64,
    received_last: bool,
    buffer: FragBuffer,
}

/// Reassembly and holding buffers of an interface.
pub struct Ipv4State {
    next_identification: u16,
    reassemblies: Slab<Reassembly>,
    holding: FlipBuffer,
}

impl Ipv4State {
    /// Returns the number of datagrams being reassembled.
    pub fn reassemblies(&self) -> usize {
        self.reassemblies.len()
    }
}

impl Default for Ipv4State {
    fn default() -> Ipv4State {
        Ipv4State {
            next_identification: 0,
            reassemblies: Slab::new(MAX_REASSEMBLIES),
            holding: FlipBuffer::new(HOLDING_CAPACITY),
        }
    }
}

/// Assigns the interface addresses and starts resolving the gateway.
pub fn configure(
    interface: &mut Interface,
    ipv4_addr: Ipv4Address,
    netmask: Ipv4Address,
    default_gateway: Ipv4Address,
) {
    info!(
        "Configured IPv4 address {} with netmask {} and gateway {}.",
        ipv4_addr, netmask, default_gateway
    );

    if !ipv4_addr.is_same_subnet(default_gateway, netmask) {
        warn!(
            "Gateway {} is not on the subnet of {}.",
            default_gateway, ipv4_addr
        );
    }

    interface.ipv4_addr = ipv4_addr;
    interface.netmask = netmask;
    interface.default_gateway = default_gateway;

    let waiter = Box::new(move |_: &mut Interface, eth_addr: Option<EthernetAddress>| {
        match eth_addr {
            Some(eth_addr) => info!("Gateway {} is at {}.", default_gateway, eth_addr),
            None => warn!("Gateway {} did not answer ARP.", default_gateway),
        }
    });
    if let Err(err) = arp::fetch_network(interface, default_gateway, waiter) {
        warn!("Unable to resolve gateway {}: {:?}.", default_gateway, err);
    }
}

/// Returns the address whose hardware address a packet for dst_addr is sent
/// to: dst_addr itself when on the subnet, otherwise the gateway.
pub fn next_hop(
    dst_addr: Ipv4Address,
    ipv4_addr: Ipv4Address,
    netmask: Ipv4Address,
    default_gateway: Ipv4Address,
) -> Ipv4Address {
    if dst_addr.is_same_subnet(ipv4_addr, netmask) {
        dst_addr
    } else {
        default_gateway
    }
}

/// Returns the next hop for dst_addr with the interface configuration.
pub fn route(interface: &Interface, dst_addr: Ipv4Address) -> Ipv4Address {
    next_hop(
        dst_addr,
        interface.ipv4_addr,
        interface.netmask,
        interface.default_gateway,
    )
}

/// Checks if a datagram for dst_addr should be accepted by the interface.
pub fn is_local_destination(
    dst_addr: Ipv4Address,
    ipv4_addr: Ipv4Address,
    netmask: Ipv4Address,
) -> bool {
    dst_addr == ipv4_addr || dst_addr == ipv4_addr.subnet_broadcast(netmask)
}

/// Sends an IPv4 payload to dst_addr.
///
/// When the next hop is not cached the payload is copied into the holding
/// buffer and sent once ARP resolves, so the caller's buffer may be reused
/// right away.
pub fn send_packet(
    interface: &mut Interface,
    protocol: u8,
    dst_addr: Ipv4Address,
    payload: &[u8],
) -> Result<()> {
    let next_hop = route(interface, dst_addr);

    if let Some(eth_addr) = arp::fetch_cached(interface, next_hop) {
        return send_datagram(interface, protocol, dst_addr, eth_addr, payload);
    }

    if payload.len() > interface.ipv4.holding.capacity() {
        warn!(
            "Dropping {} byte IPv4 payload for {}, too large to hold during ARP lookup.",
            payload.len(),
            dst_addr
        );
        arp::fetch_network(interface, next_hop, Box::new(|_, _| {}))?;
        return Err(Error::Exhausted);
    }

    let handle = match interface.ipv4.holding.alloc(payload.len()) {
        Some(handle) => handle,
        None => return Err(Error::Exhausted),
    };
    if let Some(held) = interface.ipv4.holding.data_mut(handle) {
        held.copy_from_slice(payload);
    }

    debug!(
        "Holding IPv4 payload for {} while resolving {}.",
        dst_addr, next_hop
    );

    arp::fetch_network(
        interface,
        next_hop,
        Box::new(move |interface, eth_addr| {
            let eth_addr = match eth_addr {
                Some(eth_addr) => eth_addr,
                None => {
                    info!(
                        "Dropping IPv4 payload for {}, ARP lookup failure for {}.",
                        dst_addr, next_hop
                    );
                    return;
                }
            };

            let payload = match interface.ipv4.holding.data(handle) {
                Some(payload) => payload.to_vec(),
                None => {
                    info!(
                        "Dropping IPv4 payload for {}, overwritten while resolving {}.",
                        dst_addr, next_hop
                    );
                    return;
                }
            };

            if let Err(err) = send_datagram(interface, protocol, dst_addr, eth_addr, &payload) {
                debug!("Error sending held IPv4 payload to {}: {:?}.", dst_addr, err);
            }
        }),
    )
}

/// Sends a single unfragmented datagram to a resolved hardware address.
fn send_datagram(
    interface: &mut Interface,
    protocol: u8,
    dst_addr: Ipv4Address,
    eth_addr: EthernetAddress,
    payload: &[u8],
) -> Result<()> {
    let ipv4_repr = Ipv4Repr {
        src_addr: interface.ipv4_addr,
        dst_addr,
        protocol,
        payload_len: payload.len(),
    };

    let mtu = interface.dev.max_transmission_unit();
    if ipv4_repr.buffer_len() > mtu {
        info!(
            "Dropping IPv4 packet of {} bytes for {}, larger than MTU {}.",
            ipv4_repr.buffer_len(),
            dst_addr,
            mtu
        );
        return Err(Error::Exhausted);
    }

    let identification = interface.ipv4.next_identification;
    interface.ipv4.next_identification = identification.wrapping_add(1);

    ethernet::send_frame(
        interface,
        eth_addr,
        eth_types::IPV4,
        ipv4_repr.buffer_len(),
        |eth_payload| {
            let mut ipv4_packet = Ipv4Packet::try_new(eth_payload)?;
            ipv4_repr.serialize(&mut ipv4_packet, identification);
            ipv4_packet.payload_mut().copy_from_slice(payload);
            Ok(())
        },
    )
}

/// Receives an IPv4 packet from an interface.
///
/// Valid packets for the interface are passed to handler, with fragments held
/// back until their datagram is complete.
pub fn recv_packet(
    interface: &mut Interface,
    eth_frame: &EthernetFrame<&[u8]>,
    handler: &mut dyn Handler,
) -> Result<()> {
    let ipv4_packet = Ipv4Packet::try_new(eth_frame.payload())?;
    ipv4_packet.check_encoding()?;

    let dst_addr = ipv4_packet.dst_addr();
    if !is_local_destination(dst_addr, interface.ipv4_addr, interface.netmask) {
        debug!(
            "Ignoring IPv4 packet from {} with destination {}.",
            ipv4_packet.src_addr(),
            dst_addr
        );
        return Err(Error::Ignored);
    }

    if ipv4_packet.is_fragment() {
        reassemble(interface, &ipv4_packet, handler)
    } else {
        let ipv4_repr = Ipv4Repr::deserialize(&ipv4_packet);
        forward(interface, &ipv4_repr, ipv4_packet.payload(), handler)
    }
}

fn forward(
    interface: &mut Interface,
    ipv4_repr: &Ipv4Repr,
    payload: &[u8],
    handler: &mut dyn Handler,
) -> Result<()> {
    match ipv4_repr.protocol {
        ipv4_protocols::TCP => handler.recv_tcp(interface, ipv4_repr, payload),
        ipv4_protocols::UDP => handler.recv_udp(interface, ipv4_repr, payload),
        ipv4_protocols::ICMP => handler.recv_icmp(interface, ipv4_repr, payload),
        i => {
            debug!(
                "Ignoring IPv4 packet from {} with protocol {}.",
                ipv4_repr.src_addr, i
            );
            Err(Error::Unsupported)
        }
    }
}

fn reassemble(
    interface: &mut Interface,
    ipv4_packet: &Ipv4Packet<&[u8]>,
    handler: &mut dyn Handler,
) -> Result<()> {
    let key = ReassemblyKey {
        dst_addr: ipv4_packet.dst_addr(),
        src_addr: ipv4_packet.src_addr(),
        identification: ipv4_packet.identification(),
        protocol: ipv4_packet.protocol(),
    };

    let handle = match interface.ipv4.reassemblies.find(|r| r.key == key) {
        Some(handle) => handle,
        None => {
            let reassembly = Reassembly {
                key,
                ttl: REASSEMBLY_TTL_MS,
                received_last: false,
                buffer: FragBuffer::new(REASSEMBLY_CAPACITY),
            };
            match interface.ipv4.reassemblies.insert(reassembly) {
                Ok(handle) => handle,
                Err(_) => {
                    warn!(
                        "Dropping fragment of datagram {} from {}, too many reassemblies.",
                        key.identification, key.src_addr
                    );
                    return Err(Error::Exhausted);
                }
            }
        }
    };

    let offset = ipv4_packet.fragment_offset() as usize * 8;
    if offset + ipv4_packet.payload().len() > REASSEMBLY_CAPACITY {
        interface.ipv4.reassemblies.remove(handle);
        warn!(
            "Dropping datagram {} from {}, larger than {} bytes.",
            key.identification, key.src_addr, REASSEMBLY_CAPACITY
        );
        return Err(Error::Exhausted);
    }

    let complete_len = match interface.ipv4.reassemblies.get_mut(handle) {
        Some(reassembly) => {
            if !reassembly.buffer.insert(offset, ipv4_packet.payload()) {
                debug!(
                    "Fragment at offset {} of datagram {} from {} added nothing.",
                    offset, key.identification, key.src_addr
                );
            }

            if ipv4_packet.flags() & ipv4_flags::MORE_FRAGMENTS == 0 {
                reassembly.received_last = true;
            }

            if reassembly.received_last {
                reassembly.buffer.continuous_size()
            } else {
                0
            }
        }
        None => return Err(Error::Exhausted),
    };

    if complete_len == 0 {
        return Ok(());
    }

    let reassembly = match interface.ipv4.reassemblies.remove(handle) {
        Some(reassembly) => reassembly,
        None => return Err(Error::Exhausted),
    };

    debug!(
        "Reassembled datagram {} from {} with {} bytes.",
        key.identification, key.src_addr, complete_len
    );

    let ipv4_repr = Ipv4Repr {
        src_addr: key.src_addr,
        dst_addr: key.dst_addr,
        protocol: key.protocol,
        payload_len: complete_len,
    };
    forward(
        interface,
        &ipv4_repr,
        &reassembly.buffer.data()[.. complete_len],
        handler,
    )
}

/// Ages incomplete datagrams, dropping those which expired.
pub fn tick(interface: &mut Interface, delta_ms: u32) {
    let expired: Vec<_> = interface
        .ipv4
        .reassemblies
        .iter_mut()
        .filter_map(|(handle, reassembly)| {
            reassembly.ttl -= delta_ms as i64;
            if reassembly.ttl <= 0 {
                Some(handle)
            } else {
                None
            }
        })
        .collect();

    for handle in expired {
        if let Some(reassembly) = interface.ipv4.reassemblies.remove(handle) {
            info!(
                "Dropping datagram {} from {}, reassembly timed out.",
                reassembly.key.identification, reassembly.key.src_addr
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(i: u8) -> Ipv4Address {
        Ipv4Address::new([10, 0, 0, i])
    }

    #[test]
    fn test_next_hop_on_subnet() {
        let netmask = Ipv4Address::new([255, 255, 255, 0]);
        assert_eq!(next_hop(addr(7), addr(5), netmask, addr(1)), addr(7));
    }

    #[test]
    fn test_next_hop_off_subnet() {
        let netmask = Ipv4Address::new([255, 255, 255, 0]);
        let dst_addr = Ipv4Address::new([8, 8, 8, 8]);
        assert_eq!(next_hop(dst_addr, addr(5), netmask, addr(1)), addr(1));
    }

    #[test]
    fn test_local_destination() {
        let netmask = Ipv4Address::new([255, 255, 255, 0]);
        assert!(is_local_destination(addr(5), addr(5), netmask));
        assert!(is_local_destination(addr(255), addr(5), netmask));
        assert!(!is_local_destination(addr(6), addr(5), netmask));
        assert!(!is_local_destination(Ipv4Address::BROADCAST, addr(5), netmask));
    }
}
