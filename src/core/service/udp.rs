use crate::core::repr::{
    Ipv4Repr,
    UdpPacket,
    UdpRepr,
};
use crate::Result;

/// Parses a UDP datagram, returning its header and payload.
///
/// There are no UDP sockets, so nothing is delivered anywhere.
pub fn recv_packet<'a>(ipv4_repr: &Ipv4Repr, udp_buffer: &'a [u8]) -> Result<(UdpRepr, &'a [u8])> {
    let udp_packet = UdpPacket::try_new(udp_buffer)?;
    if let Err(err) = udp_packet.check_encoding() {
        debug!(
            "Ignoring UDP packet from {} with {:?}.",
            ipv4_repr.src_addr, err
        );
        return Err(err);
    }

    let udp_repr = UdpRepr::deserialize(&udp_packet);
    debug!(
        "Received UDP datagram from {}:{} for port {} with {} bytes.",
        ipv4_repr.src_addr,
        udp_repr.src_port,
        udp_repr.dst_port,
        udp_packet.payload().len()
    );

    let payload_len = udp_packet.payload().len();
    let start = UdpPacket::<&[u8]>::HEADER_LEN;
    Ok((udp_repr, &udp_buffer[start .. start + payload_len]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::repr::{
        ipv4_protocols,
        Ipv4Address,
    };
    use crate::Error;

    fn ipv4_repr() -> Ipv4Repr {
        Ipv4Repr {
            src_addr: Ipv4Address::new([10, 0, 0, 1]),
            dst_addr: Ipv4Address::new([10, 0, 0, 2]),
            protocol: ipv4_protocols::UDP,
            payload_len: 11,
        }
    }

    #[test]
    fn test_recv_packet_extracts_payload() {
        let buffer = [0x04, 0x00, 0x00, 0x35, 0x00, 0x0A, 0x00, 0x00, 0xAA, 0xBB, 0xCC];
        let (udp_repr, payload) = recv_packet(&ipv4_repr(), &buffer).unwrap();
        assert_eq!(udp_repr.dst_port, 53);
        assert_eq!(payload, &[0xAA, 0xBB]);
    }

    #[test]
    fn test_recv_packet_too_short() {
        let buffer = [0x04, 0x00, 0x00, 0x35];
        assert_matches!(recv_packet(&ipv4_repr(), &buffer), Err(Error::Exhausted));
    }
}
