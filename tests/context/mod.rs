#![allow(dead_code)]

use netstack::core::config::Config;
use netstack::core::dev::MockDevice;
use netstack::core::repr::{
    eth_types,
    ipv4_protocols,
    Arp,
    ArpOp,
    EthernetAddress,
    EthernetFrame,
    Icmpv4Packet,
    Icmpv4Repr,
    Ipv4Address,
    Ipv4Packet,
    Ipv4Repr,
    TcpPacket,
    TcpRepr,
};
use netstack::core::stack::ProtocolStack;
use netstack::core::time::MockEnv;

lazy_static! {
    pub static ref ETH_ADDR: EthernetAddress = {
        EthernetAddress::new([0x06, 0x11, 0x22, 0x33, 0x44, 0x55])
    };

    pub static ref IPV4_ADDR: Ipv4Address = Ipv4Address::new([1, 1, 0, 5]);

    pub static ref NETMASK: Ipv4Address = Ipv4Address::new([255, 255, 255, 0]);

    pub static ref GATEWAY_IPV4_ADDR: Ipv4Address = Ipv4Address::new([1, 1, 0, 1]);

    pub static ref GATEWAY_ETH_ADDR: EthernetAddress = {
        EthernetAddress::new([0x06, 0x00, 0x00, 0x00, 0x00, 0x01])
    };

    pub static ref PEER_IPV4_ADDR: Ipv4Address = Ipv4Address::new([1, 1, 0, 4]);

    pub static ref PEER_ETH_ADDR: EthernetAddress = {
        EthernetAddress::new([0x06, 0x00, 0x00, 0x00, 0x00, 0x04])
    };

    pub static ref CONFIG: Config = Config {
        ethernet_addr: *ETH_ADDR,
        ipv4_addr: *IPV4_ADDR,
        netmask: *NETMASK,
        default_gateway: *GATEWAY_IPV4_ADDR,
    };
}

/// A stack over an in memory device, plus a handle on the device queues.
pub struct Context {
    pub stack: ProtocolStack<MockEnv>,
    pub dev: MockDevice,
}

impl Context {
    /// Feeds a frame to the stack and returns the frames it sent in response.
    pub fn recv(&mut self, frame: &[u8]) -> Vec<Vec<u8>> {
        self.stack.on_receive(frame);
        self.dev.drain_sent()
    }

    /// Advances the stack timers and returns the frames it sent.
    pub fn tick(&mut self, delta_ms: u32) -> Vec<Vec<u8>> {
        self.stack.tick(delta_ms);
        self.dev.drain_sent()
    }
}

/// A stack which has not been configured yet.
pub fn unconfigured() -> Context {
    unconfigured_on(MockDevice::new())
}

pub fn unconfigured_on(dev: MockDevice) -> Context {
    let stack = ProtocolStack::with_env(Box::new(dev.clone()), MockEnv::new());
    Context { stack, dev }
}

/// A configured stack whose gateway has been resolved.
pub fn configured() -> Context {
    configured_on(MockDevice::new())
}

pub fn configured_on(dev: MockDevice) -> Context {
    let mut context = unconfigured_on(dev);
    context.stack.configure(&CONFIG);
    context.recv(&arp_reply(*GATEWAY_ETH_ADDR, *GATEWAY_IPV4_ADDR));
    context.dev.drain_sent();
    context
}

/// A configured stack which has also resolved the peer.
pub fn with_peer() -> Context {
    with_peer_on(MockDevice::new())
}

pub fn with_peer_on(dev: MockDevice) -> Context {
    let mut context = configured_on(dev);
    context.recv(&arp_reply(*PEER_ETH_ADDR, *PEER_IPV4_ADDR));
    context
}

/// Builds an Ethernet frame for the stack, with f writing the payload.
pub fn eth_frame<F>(src_addr: EthernetAddress, payload_type: u16, payload_len: usize, f: F) -> Vec<u8>
where
    F: FnOnce(&mut [u8]),
{
    let mut buffer = vec![0; EthernetFrame::<&[u8]>::buffer_len(payload_len)];
    {
        let mut eth_frame = EthernetFrame::try_new(&mut buffer[..]).unwrap();
        eth_frame.set_dst_addr(*ETH_ADDR);
        eth_frame.set_src_addr(src_addr);
        eth_frame.set_payload_type(payload_type);
        f(eth_frame.payload_mut());
    }
    buffer
}

pub fn arp_frame(arp: &Arp) -> Vec<u8> {
    eth_frame(arp.source_hw_addr, eth_types::ARP, arp.buffer_len(), |payload| {
        arp.serialize(payload).unwrap();
    })
}

/// An ARP reply addressed to the stack.
pub fn arp_reply(eth_addr: EthernetAddress, ipv4_addr: Ipv4Address) -> Vec<u8> {
    arp_frame(&Arp {
        op: ArpOp::Reply,
        source_hw_addr: eth_addr,
        source_proto_addr: ipv4_addr,
        target_hw_addr: *ETH_ADDR,
        target_proto_addr: *IPV4_ADDR,
    })
}

/// An ARP request from the peer for target_addr.
pub fn arp_request(target_addr: Ipv4Address) -> Vec<u8> {
    arp_frame(&Arp {
        op: ArpOp::Request,
        source_hw_addr: *PEER_ETH_ADDR,
        source_proto_addr: *PEER_IPV4_ADDR,
        target_hw_addr: EthernetAddress::WILDCARD,
        target_proto_addr: target_addr,
    })
}

/// An IPv4 packet from the peer, optionally a fragment.
pub fn ipv4_frame(
    dst_addr: Ipv4Address,
    protocol: u8,
    identification: u16,
    flags: u8,
    fragment_offset: u16,
    payload: &[u8],
) -> Vec<u8> {
    let ipv4_repr = Ipv4Repr {
        src_addr: *PEER_IPV4_ADDR,
        dst_addr,
        protocol,
        payload_len: payload.len(),
    };

    eth_frame(
        *PEER_ETH_ADDR,
        eth_types::IPV4,
        ipv4_repr.buffer_len(),
        |eth_payload| {
            let mut ipv4_packet = Ipv4Packet::try_new(eth_payload).unwrap();
            ipv4_repr.serialize(&mut ipv4_packet, identification);
            ipv4_packet.set_flags_and_fragment_offset(flags, fragment_offset);
            ipv4_packet.payload_mut().copy_from_slice(payload);
            ipv4_packet.fill_checksum();
        },
    )
}

/// An ICMP echo request, without the IPv4 header.
pub fn echo_request(id: u16, seq: u16, payload: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0; Icmpv4Packet::<&[u8]>::buffer_len(payload.len())];
    {
        let mut icmp_packet = Icmpv4Packet::try_new(&mut buffer[..]).unwrap();
        Icmpv4Repr::EchoRequest { id, seq }.serialize(&mut icmp_packet);
        icmp_packet.payload_mut().copy_from_slice(payload);
        icmp_packet.fill_checksum();
    }
    buffer
}

/// A TCP segment from the peer to the stack.
pub fn tcp_frame(
    src_port: u16,
    dst_port: u16,
    seq_num: u32,
    ack_num: u32,
    flags: u16,
    payload: &[u8],
) -> Vec<u8> {
    tcp_frame_with_window(src_port, dst_port, seq_num, ack_num, flags, 10_000, payload)
}

pub fn tcp_frame_with_window(
    src_port: u16,
    dst_port: u16,
    seq_num: u32,
    ack_num: u32,
    flags: u16,
    window_size: u16,
    payload: &[u8],
) -> Vec<u8> {
    let tcp_repr = TcpRepr {
        src_port,
        dst_port,
        seq_num,
        ack_num,
        flags,
        window_size,
        urgent_pointer: 0,
    };

    let mut buffer = vec![0; TcpPacket::<&[u8]>::buffer_len(payload.len())];
    let ipv4_repr = Ipv4Repr {
        src_addr: *PEER_IPV4_ADDR,
        dst_addr: *IPV4_ADDR,
        protocol: ipv4_protocols::TCP,
        payload_len: buffer.len(),
    };

    {
        let mut tcp_packet = TcpPacket::try_new(&mut buffer[..]).unwrap();
        tcp_repr.serialize(&mut tcp_packet);
        tcp_packet.payload_mut().copy_from_slice(payload);
        tcp_packet.fill_checksum(&ipv4_repr);
    }

    ipv4_frame(*IPV4_ADDR, ipv4_protocols::TCP, 0, 0, 0, &buffer)
}

/// Parses a frame sent by the stack as an ARP packet, returning the frame
/// destination too.
pub fn parse_arp(frame: &[u8]) -> (EthernetAddress, Arp) {
    let eth_frame = EthernetFrame::try_new(frame).unwrap();
    assert_eq!(eth_frame.src_addr(), *ETH_ADDR);
    assert_eq!(eth_frame.payload_type(), eth_types::ARP);
    (
        eth_frame.dst_addr(),
        Arp::deserialize(eth_frame.payload()).unwrap(),
    )
}

/// Parses a frame sent by the stack as an IPv4 packet, checking its encoding.
pub fn parse_ipv4(frame: &[u8]) -> (EthernetAddress, Ipv4Repr, Vec<u8>) {
    let eth_frame = EthernetFrame::try_new(frame).unwrap();
    assert_eq!(eth_frame.src_addr(), *ETH_ADDR);
    assert_eq!(eth_frame.payload_type(), eth_types::IPV4);

    let ipv4_packet = Ipv4Packet::try_new(eth_frame.payload()).unwrap();
    ipv4_packet.check_encoding().unwrap();
    assert_eq!(ipv4_packet.src_addr(), *IPV4_ADDR);
    (
        eth_frame.dst_addr(),
        Ipv4Repr::deserialize(&ipv4_packet),
        ipv4_packet.payload().to_vec(),
    )
}

/// Parses a frame sent by the stack as an ICMP packet.
pub fn parse_icmp(frame: &[u8]) -> (Icmpv4Repr, Vec<u8>) {
    let (_, ipv4_repr, ipv4_payload) = parse_ipv4(frame);
    assert_eq!(ipv4_repr.protocol, ipv4_protocols::ICMP);

    let icmp_packet = Icmpv4Packet::try_new(&ipv4_payload[..]).unwrap();
    icmp_packet.check_encoding().unwrap();
    (
        Icmpv4Repr::deserialize(&icmp_packet).unwrap(),
        icmp_packet.payload().to_vec(),
    )
}

/// Parses a frame sent by the stack as a TCP segment, checking its checksum.
pub fn parse_tcp(frame: &[u8]) -> (TcpRepr, Vec<u8>) {
    let (_, ipv4_repr, ipv4_payload) = parse_ipv4(frame);
    assert_eq!(ipv4_repr.protocol, ipv4_protocols::TCP);

    let tcp_packet = TcpPacket::try_new(&ipv4_payload[..]).unwrap();
    tcp_packet.check_encoding(&ipv4_repr).unwrap();
    (TcpRepr::deserialize(&tcp_packet), tcp_packet.payload().to_vec())
}
