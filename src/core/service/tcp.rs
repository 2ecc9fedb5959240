use crate::core::repr::{
    Ipv4Address,
    Ipv4Repr,
    TcpPacket,
    TcpRepr,
};
use crate::core::service::Interface;
use crate::core::tcp::{
    ConnectionHandle,
    ConnectionTable,
    Endpoint,
    State,
};
use crate::{
    Error,
    Result,
};

/// TCP layer of an interface, owning every connection.
pub struct Tcp {
    pub connections: ConnectionTable,
}

impl Tcp {
    pub fn new() -> Tcp {
        Tcp {
            connections: ConnectionTable::new(),
        }
    }

    /// Opens a listening connection on a local port of any address.
    pub fn listen(&mut self, port: u16) -> Result<ConnectionHandle> {
        let local = Endpoint::new(Ipv4Address::UNSPECIFIED, port);
        self.connections
            .create_connection(Endpoint::WILDCARD, local, State::Listen)
    }

    /// Receives a TCP packet from an interface.
    ///
    /// The segment is dispatched to the most specific matching connection,
    /// after which any connections it spawned are stepped and any it
    /// finished are removed.
    pub fn recv_packet(
        &mut self,
        interface: &mut Interface,
        ipv4_repr: &Ipv4Repr,
        tcp_buffer: &[u8],
    ) -> Result<()> {
        let tcp_packet = match TcpPacket::try_new(tcp_buffer) {
            Ok(tcp_packet) => tcp_packet,
            Err(err) => {
                debug!(
                    "Ignoring TCP packet from {} with {} bytes.",
                    ipv4_repr.src_addr,
                    tcp_buffer.len()
                );
                return Err(err);
            }
        };

        if let Err(err) = tcp_packet.check_encoding(ipv4_repr) {
            debug!(
                "Ignoring TCP packet from {} with {:?}.",
                ipv4_repr.src_addr, err
            );
            return Err(err);
        }

        let tcp_repr = TcpRepr::deserialize(&tcp_packet);
        debug!(
            "Received segment from {}:{} for port {} with flags {:#05x}, seq {}, ack {} and {} bytes.",
            ipv4_repr.src_addr,
            tcp_repr.src_port,
            tcp_repr.dst_port,
            tcp_repr.flags,
            tcp_repr.seq_num,
            tcp_repr.ack_num,
            tcp_packet.payload().len()
        );

        let remote = Endpoint::new(ipv4_repr.src_addr, tcp_repr.src_port);
        let local = Endpoint::new(ipv4_repr.dst_addr, tcp_repr.dst_port);

        let handle = match self.connections.find_best_match(&remote, &local) {
            Some(handle) => handle,
            None => {
                debug!("Ignoring TCP segment for {}, no connections matched.", local);
                return Err(Error::Ignored);
            }
        };

        let result = self.connections.on_receive(
            interface,
            handle,
            ipv4_repr,
            &tcp_repr,
            tcp_packet.payload(),
        );
        self.connections.step_new_connections(interface);
        self.connections.destroy_finished_connections();
        result
    }

    /// Queues data on a connection and sends what the window allows.
    pub fn send(
        &mut self,
        interface: &mut Interface,
        handle: ConnectionHandle,
        data: &[u8],
    ) -> Result<()> {
        self.connections.send(handle, data)?;
        self.connections.step(interface, handle);
        Ok(())
    }

    /// Starts closing a connection, sending its FIN.
    pub fn close(&mut self, interface: &mut Interface, handle: ConnectionHandle) -> Result<()> {
        self.connections.close(handle)?;
        self.connections.step(interface, handle);
        Ok(())
    }
}

impl Default for Tcp {
    fn default() -> Tcp {
        Tcp::new()
    }
}
