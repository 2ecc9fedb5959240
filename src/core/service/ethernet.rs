use crate::core::repr::{
    eth_types,
    EthernetAddress,
    EthernetFrame,
};
use crate::core::service::{
    arp,
    ipv4,
    Interface,
};
use crate::{
    Error,
    Result,
};

/// Assigns the hardware address used as the source of outgoing frames.
pub fn configure(interface: &mut Interface, ethernet_addr: EthernetAddress) {
    info!("Configured Ethernet address {}.", ethernet_addr);
    interface.ethernet_addr = ethernet_addr;
}

/// Send an Ethernet frame via an interface.
///
/// The frame header is filled in with the interface address as the source and
/// f writes the payload_len byte payload.
pub fn send_frame<F>(
    interface: &mut Interface,
    dst_addr: EthernetAddress,
    payload_type: u16,
    payload_len: usize,
    f: F,
) -> Result<()>
where
    F: FnOnce(&mut [u8]) -> Result<()>,
{
    let mut eth_buffer = vec![0; EthernetFrame::<&[u8]>::buffer_len(payload_len)];
    let mut eth_frame = EthernetFrame::try_new(&mut eth_buffer[..])?;
    eth_frame.set_dst_addr(dst_addr);
    eth_frame.set_src_addr(interface.ethernet_addr);
    eth_frame.set_payload_type(payload_type);
    f(eth_frame.payload_mut())?;
    interface.dev.send(eth_frame.as_ref())
}

/// Receives an Ethernet frame from an interface.
///
/// The Ethernet frame is parsed and propagated up the network stack, with
/// IPv4 payloads eventually landing in handler.
pub fn recv_frame(
    interface: &mut Interface,
    eth_buffer: &[u8],
    handler: &mut dyn ipv4::Handler,
) -> Result<()> {
    let eth_frame = match EthernetFrame::try_new(eth_buffer) {
        Ok(eth_frame) => eth_frame,
        Err(err) => {
            debug!("Ignoring Ethernet frame with {} bytes.", eth_buffer.len());
            return Err(err);
        }
    };

    match eth_frame.payload_type() {
        eth_types::ARP => arp::recv_packet(interface, &eth_frame),
        eth_types::IPV4 => ipv4::recv_packet(interface, &eth_frame, handler),
        eth_types::IPV6 => {
            debug!("Ignoring IPv6 Ethernet frame from {}.", eth_frame.src_addr());
            Err(Error::Unsupported)
        }
        eth_types::FLOW_CONTROL => {
            debug!(
                "Ignoring flow control Ethernet frame from {}.",
                eth_frame.src_addr()
            );
            Err(Error::Unsupported)
        }
        i => {
            debug!("Ignoring Ethernet frame with type {:#06x}.", i);
            Err(Error::Unsupported)
        }
    }
}
