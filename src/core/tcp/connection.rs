use std::fmt;

use crate::core::repr::{
    ipv4_protocols,
    tcp_flags,
    Ipv4Address,
    Ipv4Repr,
    TcpPacket,
    TcpRepr,
};
use crate::core::service::{
    ipv4,
    Interface,
};
use crate::core::tcp::{
    RecvQueue,
    SendQueue,
    State,
};
use crate::Result;

/// Window advertised to the remote.
pub const ADVERTISED_WINDOW: u16 = 10_000;

/// Payload given to SYN and FIN so they occupy one sequence number.
pub const PHANTOM: [u8; 1] = [b'!'];

/// An address and port, where zero fields act as wildcards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub addr: Ipv4Address,
    pub port: u16,
}

impl Endpoint {
    pub const WILDCARD: Endpoint = Endpoint {
        addr: Ipv4Address::UNSPECIFIED,
        port: 0,
    };

    pub fn new(addr: Ipv4Address, port: u16) -> Endpoint {
        Endpoint { addr, port }
    }

    /// Counts the non-wildcard fields of self which match endpoint, or
    /// returns -1 if any of them differ.
    fn count_specific_matches(&self, endpoint: &Endpoint) -> i32 {
        let mut matching_fields = 0;

        if !self.addr.is_unspecified() {
            if self.addr != endpoint.addr {
                return -1;
            }
            matching_fields += 1;
        }

        if self.port != 0 {
            if self.port != endpoint.port {
                return -1;
            }
            matching_fields += 1;
        }

        matching_fields
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

/// Connects a local endpoint to a remote one.
///
/// The connection sequences, acknowledges and transmits segments but what it
/// does with them is up to its state.
#[derive(Debug)]
pub struct Connection {
    remote: Endpoint,
    local: Endpoint,
    state: State,
    rx: RecvQueue,
    tx: SendQueue,
    next_seq_num: u32,
}

impl Connection {
    pub fn new(remote: Endpoint, local: Endpoint, state: State) -> Connection {
        Connection {
            remote,
            local,
            state,
            rx: RecvQueue::new(),
            tx: SendQueue::new(),
            next_seq_num: 0,
        }
    }

    pub fn remote(&self) -> Endpoint {
        self.remote
    }

    pub fn local(&self) -> Endpoint {
        self.local
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn rx(&self) -> &RecvQueue {
        &self.rx
    }

    pub fn rx_mut(&mut self) -> &mut RecvQueue {
        &mut self.rx
    }

    pub fn tx(&self) -> &SendQueue {
        &self.tx
    }

    pub fn tx_mut(&mut self) -> &mut SendQueue {
        &mut self.tx
    }

    /// Returns the sequence number following the last segment sent.
    pub fn next_seq_num(&self) -> u32 {
        self.next_seq_num
    }

    /// Scores how well remote and local match the connection, -1 if they do
    /// not match at all.
    pub fn compare(&self, remote: &Endpoint, local: &Endpoint) -> i32 {
        let remote_match = self.remote.count_specific_matches(remote);
        let local_match = self.local.count_specific_matches(local);

        if remote_match >= 0 && local_match >= 0 {
            remote_match + local_match
        } else {
            -1
        }
    }

    /// Clears the send queue and starts sequencing at seq_num.
    pub fn reset_tx(&mut self, seq_num: u32) {
        self.tx.reset(seq_num);
        self.next_seq_num = seq_num;
    }

    /// Clears the receive queue and expects seq_num next.
    pub fn reset_rx(&mut self, seq_num: u32) {
        self.rx.reset(seq_num);
    }

    /// Queues a received segment to be handed back in sequence.
    ///
    /// Empty segments can't be sequenced, so a bare ACK never is.
    pub fn sequence(&mut self, flags: u16, seq_num: u32, data: &[u8]) -> bool {
        if self.rx.insert(flags, seq_num, data) {
            return true;
        }

        if !data.is_empty() {
            warn!(
                "Dropping segment {} with {} bytes from {}, receive queue is full.",
                seq_num,
                data.len(),
                self.remote
            );
        }
        false
    }

    /// Queues a segment at the end of the send queue.
    pub fn transmit(&mut self, flags: u16, data: &[u8], send_len: usize) -> bool {
        if data.is_empty() {
            return false;
        }

        let seq_num = self.tx.write_cursor();
        if self.tx.write_back(flags, seq_num, data, send_len) {
            return true;
        }

        warn!(
            "Dropping {} bytes for {}, send queue is full.",
            data.len(),
            self.remote
        );
        false
    }

    /// Queues a SYN or FIN which occupies a sequence number but carries no
    /// data.
    pub fn transmit_phantom(&mut self, flags: u16) -> bool {
        self.transmit(flags, &PHANTOM, 0)
    }

    pub fn transition(&mut self, state: State) {
        debug!(
            "Connection {} transitioning from {} to {}.",
            self.remote, self.state, state
        );
        self.state = state;
    }

    /// Sends a segment to the remote, acknowledging everything received in
    /// sequence so far.
    pub fn send_segment(
        &mut self,
        interface: &mut Interface,
        flags: u16,
        seq_num: u32,
        data: &[u8],
    ) -> Result<()> {
        let flags = flags | tcp_flags::ACK;
        let is_phantom = (flags & (tcp_flags::SYN | tcp_flags::FIN)) != 0 && data.len() == 1;
        let payload = if is_phantom { &[][..] } else { data };

        let tcp_repr = TcpRepr {
            src_port: self.local.port,
            dst_port: self.remote.port,
            seq_num,
            ack_num: self.rx.read_cursor(),
            flags,
            window_size: ADVERTISED_WINDOW,
            urgent_pointer: 0,
        };

        let mut buffer = vec![0; TcpPacket::<&[u8]>::buffer_len(payload.len())];
        let ipv4_repr = Ipv4Repr {
            src_addr: interface.ipv4_addr,
            dst_addr: self.remote.addr,
            protocol: ipv4_protocols::TCP,
            payload_len: buffer.len(),
        };

        {
            let mut tcp_packet = TcpPacket::try_new(&mut buffer[..])?;
            tcp_repr.serialize(&mut tcp_packet);
            tcp_packet.payload_mut().copy_from_slice(payload);
            tcp_packet.fill_checksum(&ipv4_repr);
        }

        debug!(
            "Sending segment to {} with flags {:#05x}, seq {}, ack {} and {} bytes.",
            self.remote,
            flags,
            seq_num,
            tcp_repr.ack_num,
            payload.len()
        );

        self.next_seq_num = seq_num.wrapping_add(data.len() as u32);
        ipv4::send_packet(interface, ipv4_protocols::TCP, self.remote.addr, &buffer)
    }
}
