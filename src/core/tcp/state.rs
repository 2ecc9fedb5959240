//! Per state reactions of a connection to segments and local requests.
//!
//! Each function looks up the current state of the connection and applies
//! the transition for it, leaving states without one untouched.

use std::fmt;

use crate::core::repr::{
    tcp_flags,
    Ipv4Repr,
    TcpRepr,
};
use crate::core::tcp::connection::PHANTOM;
use crate::core::tcp::{
    ConnectionHandle,
    ConnectionTable,
    Endpoint,
    RecvSegment,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// Waiting for SYN segments.
    Listen,
    /// Received a SYN and answered with our own.
    SynRcvd,
    /// Handshake done, data flows both ways.
    Established,
    /// Remote closed and we sent our FIN.
    LastAck,
    /// We closed and wait for our FIN to be acknowledged.
    FinWait1,
    /// Our FIN was acknowledged, waiting for the remote FIN.
    FinWait2,
    /// Both endpoints closed at the same time.
    Closing,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match *self {
            State::Listen => "LISTEN",
            State::SynRcvd => "SYN-RCVD",
            State::Established => "ESTABLISHED",
            State::LastAck => "LAST-ACK",
            State::FinWait1 => "FIN-WAIT-1",
            State::FinWait2 => "FIN-WAIT-2",
            State::Closing => "CLOSING",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn is_fin(flags: u16) -> bool {
    flags & tcp_flags::FIN != 0
}

/// Reacts to any arriving segment before it is sequenced.
pub fn early_recv(
    table: &mut ConnectionTable,
    handle: ConnectionHandle,
    ipv4_repr: &Ipv4Repr,
    tcp_repr: &TcpRepr,
    payload: &[u8],
) {
    let state = match table.get(handle) {
        Some(connection) => connection.state(),
        None => return,
    };

    match state {
        State::Listen => {
            if tcp_repr.flags & tcp_flags::SYN == 0 {
                info!(
                    "LISTEN: Ignoring segment from {} without SYN.",
                    ipv4_repr.src_addr
                );
                return;
            }

            let remote = Endpoint::new(ipv4_repr.src_addr, tcp_repr.src_port);
            let local = Endpoint::new(ipv4_repr.dst_addr, tcp_repr.dst_port);
            let child = match table.create_connection(remote, local, State::SynRcvd) {
                Ok(child) => child,
                Err(_) => return,
            };

            if let Some(connection) = table.get_mut(child) {
                connection.reset_rx(tcp_repr.seq_num);
                connection.reset_tx(rand::random::<u32>());
                connection.sequence(tcp_repr.flags, tcp_repr.seq_num, &PHANTOM);
            }
        }
        State::SynRcvd => {
            if let Some(connection) = table.get_mut(handle) {
                if tcp_repr.flags & tcp_flags::ACK != 0 {
                    connection.transition(State::Established);
                } else {
                    info!(
                        "SYN-RCVD: Ignoring segment without ACK, flags {:#05x}.",
                        tcp_repr.flags
                    );
                }
            }
        }
        State::Established => {
            if let Some(connection) = table.get_mut(handle) {
                if !payload.is_empty() {
                    connection.sequence(tcp_repr.flags & !tcp_flags::FIN, tcp_repr.seq_num, payload);
                }
                if is_fin(tcp_repr.flags) {
                    let fin_seq_num = tcp_repr.seq_num.wrapping_add(payload.len() as u32);
                    connection.sequence(tcp_repr.flags, fin_seq_num, &PHANTOM);
                }
            }
        }
        State::FinWait1 => {
            if let Some(connection) = table.get_mut(handle) {
                if is_fin(tcp_repr.flags) && payload.is_empty() {
                    debug!("FIN-WAIT-1: Remote is closing at the same time.");
                    connection.sequence(tcp_repr.flags, tcp_repr.seq_num, &PHANTOM);
                    connection.transition(State::Closing);
                } else {
                    debug!("FIN-WAIT-1: Ignoring segment without FIN.");
                }
            }
        }
        State::FinWait2 => {
            if let Some(connection) = table.get_mut(handle) {
                if is_fin(tcp_repr.flags) && payload.is_empty() {
                    connection.sequence(tcp_repr.flags, tcp_repr.seq_num, &PHANTOM);
                } else {
                    debug!("FIN-WAIT-2: Ignoring segment without FIN.");
                }
            }
        }
        State::LastAck | State::Closing => {}
    }
}

/// Reacts to a segment read from the receive queue in sequence.
pub fn sequenced_recv(
    table: &mut ConnectionTable,
    handle: ConnectionHandle,
    segment: &RecvSegment,
    data: &[u8],
) {
    let state = match table.get(handle) {
        Some(connection) => connection.state(),
        None => return,
    };

    match state {
        State::Listen => info!("LISTEN: Sequenced a segment, which should not happen."),
        State::SynRcvd => {
            if segment.flags & tcp_flags::SYN == 0 {
                info!("SYN-RCVD: Sequenced a segment without SYN.");
                return;
            }

            if let Some(connection) = table.get_mut(handle) {
                debug!("SYN-RCVD: Sequenced SYN, answering with our own.");
                connection.transmit_phantom(tcp_flags::SYN);
            }
        }
        State::Established => {
            if is_fin(segment.flags) {
                if let Some(connection) = table.get_mut(handle) {
                    connection.transmit_phantom(tcp_flags::FIN);
                    connection.transition(State::LastAck);
                }
            } else {
                table.deliver(handle, data);
            }
        }
        State::FinWait2 => {
            if is_fin(segment.flags) {
                debug!("FIN-WAIT-2: Received remote FIN, shutting down.");
                table.finish_connection(handle);
            } else {
                debug!("FIN-WAIT-2: Ignoring sequenced segment without FIN.");
            }
        }
        State::LastAck | State::FinWait1 | State::Closing => {}
    }
}

/// Reacts to the remote acknowledging everything we sent.
pub fn remote_consumed_all(table: &mut ConnectionTable, handle: ConnectionHandle) {
    let state = match table.get(handle) {
        Some(connection) => connection.state(),
        None => return,
    };

    match state {
        State::LastAck | State::Closing => {
            debug!("{}: Remote acknowledged everything, closing.", state);
            table.finish_connection(handle);
        }
        State::FinWait1 => {
            if let Some(connection) = table.get_mut(handle) {
                debug!("FIN-WAIT-1: Remote acknowledged our FIN.");
                connection.transition(State::FinWait2);
            }
        }
        State::Listen | State::SynRcvd | State::Established | State::FinWait2 => {}
    }
}

/// Reacts to a local request to close, returning false if the state has no
/// way to close.
pub fn active_close(table: &mut ConnectionTable, handle: ConnectionHandle) -> bool {
    let connection = match table.get_mut(handle) {
        Some(connection) => connection,
        None => return false,
    };

    match connection.state() {
        State::Established => {
            connection.transmit_phantom(tcp_flags::FIN);
            connection.transition(State::FinWait1);
            true
        }
        state => {
            debug!("{}: Ignoring close.", state);
            false
        }
    }
}
