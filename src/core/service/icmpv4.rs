use crate::core::repr::{
    ipv4_protocols,
    Icmpv4Packet,
    Icmpv4Repr,
    Ipv4Repr,
};
use crate::core::service::{
    ipv4,
    Interface,
};
use crate::{
    Error,
    Result,
};

/// Receives an ICMP packet from an interface, answering echo requests.
pub fn recv_packet(
    interface: &mut Interface,
    ipv4_repr: &Ipv4Repr,
    icmp_buffer: &[u8],
) -> Result<()> {
    let icmp_packet = Icmpv4Packet::try_new(icmp_buffer)?;
    if let Err(err) = icmp_packet.check_encoding() {
        debug!(
            "Ignoring ICMP packet from {} with {:?}.",
            ipv4_repr.src_addr, err
        );
        return Err(err);
    }

    match Icmpv4Repr::deserialize(&icmp_packet) {
        Ok(Icmpv4Repr::EchoRequest { id, seq }) => {
            if ipv4_repr.dst_addr != interface.ipv4_addr {
                debug!("Ignoring broadcast ping from {}.", ipv4_repr.src_addr);
                return Err(Error::Ignored);
            }

            debug!(
                "Replying to ping from {} with id {} and seq {}.",
                ipv4_repr.src_addr, id, seq
            );

            let mut reply_buffer = vec![0; icmp_buffer.len()];
            {
                let mut reply_packet = Icmpv4Packet::try_new(&mut reply_buffer[..])?;
                Icmpv4Repr::EchoReply { id, seq }.serialize(&mut reply_packet);
                reply_packet
                    .payload_mut()
                    .copy_from_slice(icmp_packet.payload());
                reply_packet.fill_checksum();
            }

            ipv4::send_packet(
                interface,
                ipv4_protocols::ICMP,
                ipv4_repr.src_addr,
                &reply_buffer,
            )
        }
        Ok(Icmpv4Repr::EchoReply { id, seq }) => {
            debug!(
                "Ignoring echo reply from {} with id {} and seq {}.",
                ipv4_repr.src_addr, id, seq
            );
            Err(Error::Ignored)
        }
        Err(err) => {
            debug!(
                "Ignoring ICMP packet from {} with type {}.",
                ipv4_repr.src_addr,
                icmp_packet._type()
            );
            Err(err)
        }
    }
}
