use crate::core::repr::{
    tcp_flags,
    Ipv4Repr,
    TcpRepr,
};
use crate::core::service::Interface;
use crate::core::storage::{
    Slab,
    SlabHandle,
};
use crate::core::tcp::{
    seq,
    state,
    Connection,
    Endpoint,
    State,
};
use crate::{
    Error,
    Result,
};

/// Maximum number of open connections, listeners included.
pub const MAX_CONNECTIONS: usize = 40;

/// Maximum number of connections created or finished during one dispatch.
pub const MAX_PENDING: usize = 10;

/// Largest payload put in a single outgoing segment.
pub const MAX_SEGMENT_LEN: usize = 1460;

/// Scratch space for moving segments out of the queues.
const STEP_BUFFER_LEN: usize = 20 * 1024;

pub type ConnectionHandle = SlabHandle;

/// Receives in order payloads of established connections.
///
/// The table is handed to the callback so it can respond with
/// `ConnectionTable::send(...)` or `ConnectionTable::close(...)`.
pub trait Callback {
    fn on_receive(&mut self, connections: &mut ConnectionTable, handle: ConnectionHandle, data: &[u8]);
}

impl<F> Callback for F
where
    F: FnMut(&mut ConnectionTable, ConnectionHandle, &[u8]),
{
    fn on_receive(&mut self, connections: &mut ConnectionTable, handle: ConnectionHandle, data: &[u8]) {
        (*self)(connections, handle, data)
    }
}

/// A fixed capacity set of connections.
pub struct ConnectionTable {
    connections: Slab<Connection>,
    new_connections: Vec<ConnectionHandle>,
    finished_connections: Vec<ConnectionHandle>,
    callback: Option<Box<dyn Callback>>,
}

impl ConnectionTable {
    pub fn new() -> ConnectionTable {
        ConnectionTable {
            connections: Slab::new(MAX_CONNECTIONS),
            new_connections: Vec::with_capacity(MAX_PENDING),
            finished_connections: Vec::with_capacity(MAX_PENDING),
            callback: None,
        }
    }

    pub fn set_callback(&mut self, callback: Box<dyn Callback>) {
        self.callback = Some(callback);
    }

    pub fn get(&self, handle: ConnectionHandle) -> Option<&Connection> {
        self.connections.get(handle)
    }

    pub fn get_mut(&mut self, handle: ConnectionHandle) -> Option<&mut Connection> {
        self.connections.get_mut(handle)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn handles(&self) -> Vec<ConnectionHandle> {
        self.connections.handles()
    }

    /// Returns the connection matching remote and local most specifically.
    /// The first of equally specific matches wins.
    pub fn find_best_match(&self, remote: &Endpoint, local: &Endpoint) -> Option<ConnectionHandle> {
        let mut most_specific_match = -1;
        let mut most_specific_handle = None;

        for (handle, connection) in self.connections.iter() {
            let score = connection.compare(remote, local);
            if score > most_specific_match {
                most_specific_match = score;
                most_specific_handle = Some(handle);
            }
        }

        most_specific_handle
    }

    /// Adds a connection which is stepped once the current segment has been
    /// dispatched.
    pub fn create_connection(
        &mut self,
        remote: Endpoint,
        local: Endpoint,
        state: State,
    ) -> Result<ConnectionHandle> {
        info!(
            "Creating {} connection with remote {} and local {}.",
            state, remote, local
        );

        let handle = match self.connections.insert(Connection::new(remote, local, state)) {
            Ok(handle) => handle,
            Err(_) => {
                warn!("Dropping connection from {}, connection table is full.", remote);
                return Err(Error::Exhausted);
            }
        };

        if self.new_connections.len() < MAX_PENDING {
            self.new_connections.push(handle);
        } else {
            warn!("Too many new connections, {} won't be stepped.", remote);
        }

        Ok(handle)
    }

    /// Marks a connection for removal once the current segment has been
    /// dispatched.
    pub fn finish_connection(&mut self, handle: ConnectionHandle) {
        if self.finished_connections.contains(&handle) {
            return;
        }

        if self.finished_connections.len() < MAX_PENDING {
            self.finished_connections.push(handle);
        } else {
            warn!("Too many finished connections, removing connection right away.");
            self.connections.remove(handle);
        }
    }

    /// Checks if a connection is waiting to be destroyed.
    pub fn is_finished(&self, handle: ConnectionHandle) -> bool {
        self.finished_connections.contains(&handle)
    }

    /// Hands an in order payload to the callback.
    pub fn deliver(&mut self, handle: ConnectionHandle, data: &[u8]) {
        match self.callback.take() {
            Some(mut callback) => {
                callback.on_receive(self, handle, data);
                if self.callback.is_none() {
                    self.callback = Some(callback);
                }
            }
            None => debug!("Dropping {} bytes received without a callback.", data.len()),
        }
    }

    /// Dispatches a segment to a connection.
    pub fn on_receive(
        &mut self,
        interface: &mut Interface,
        handle: ConnectionHandle,
        ipv4_repr: &Ipv4Repr,
        tcp_repr: &TcpRepr,
        payload: &[u8],
    ) -> Result<()> {
        if !self.connections.contains(handle) {
            return Err(Error::Ignored);
        }

        state::early_recv(self, handle, ipv4_repr, tcp_repr, payload);

        if tcp_repr.flags & tcp_flags::ACK != 0 {
            let consumed_all = match self.connections.get_mut(handle) {
                Some(connection) => {
                    connection.tx_mut().set_window(tcp_repr.window_size as usize);
                    connection.tx_mut().ack(tcp_repr.ack_num);
                    seq::ge(tcp_repr.ack_num, connection.tx().write_cursor())
                }
                None => false,
            };

            if consumed_all {
                state::remote_consumed_all(self, handle);
            }
        }

        self.step(interface, handle);
        Ok(())
    }

    /// Feeds in order segments to the connection state then sends whatever
    /// the window allows.
    pub fn step(&mut self, interface: &mut Interface, handle: ConnectionHandle) {
        let mut buffer = vec![0; STEP_BUFFER_LEN];

        let received_sequenced = match self.connections.get(handle) {
            Some(connection) => connection.rx().has_readable(),
            None => return,
        };

        loop {
            let segment = match self.connections.get_mut(handle) {
                Some(connection) => connection.rx_mut().read_one_segment(&mut buffer),
                None => return,
            };

            match segment {
                Some(segment) => {
                    state::sequenced_recv(self, handle, &segment, &buffer[.. segment.len])
                }
                None => break,
            }
        }

        let connection = match self.connections.get_mut(handle) {
            Some(connection) => connection,
            None => return,
        };

        if received_sequenced && !connection.tx().has_readable() {
            let seq_num = connection.next_seq_num();
            debug!("Sending empty ACK with seq {}.", seq_num);
            if let Err(err) = connection.send_segment(interface, 0, seq_num, &[]) {
                debug!("Error sending empty ACK: {:?}.", err);
            }
        }

        while let Some(segment) = connection.tx_mut().read_one_segment(&mut buffer) {
            let data = &buffer[.. segment.data_len];
            if let Err(err) = connection.send_segment(interface, segment.flags, segment.seq_num, data) {
                debug!("Error sending segment {}: {:?}.", segment.seq_num, err);
            }
        }
    }

    /// Steps the connections created while dispatching a segment.
    pub fn step_new_connections(&mut self, interface: &mut Interface) {
        let new_connections: Vec<_> = self.new_connections.drain(..).collect();

        for handle in new_connections {
            if self.connections.contains(handle) {
                self.step(interface, handle);
            }
        }
    }

    /// Removes the connections finished while dispatching a segment.
    pub fn destroy_finished_connections(&mut self) {
        for handle in self.finished_connections.drain(..) {
            match self.connections.remove(handle) {
                Some(connection) => info!(
                    "Removing connection with remote {} in state {}.",
                    connection.remote(),
                    connection.state()
                ),
                None => debug!("Ignoring double finish of a connection."),
            }
        }
    }

    /// Queues data to be sent on a connection, split into segments.
    ///
    /// Nothing is sent until the connection is stepped.
    pub fn send(&mut self, handle: ConnectionHandle, data: &[u8]) -> Result<()> {
        let connection = match self.connections.get_mut(handle) {
            Some(connection) => connection,
            None => return Err(Error::Ignored),
        };

        if connection.state() != State::Established {
            debug!(
                "Ignoring send on connection with remote {} in state {}.",
                connection.remote(),
                connection.state()
            );
            return Err(Error::Ignored);
        }

        for chunk in data.chunks(MAX_SEGMENT_LEN) {
            if !connection.transmit(0, chunk, chunk.len()) {
                return Err(Error::Exhausted);
            }
        }

        Ok(())
    }

    /// Starts closing a connection. The FIN is sent when the connection is
    /// stepped.
    pub fn close(&mut self, handle: ConnectionHandle) -> Result<()> {
        if state::active_close(self, handle) {
            Ok(())
        } else {
            Err(Error::Ignored)
        }
    }
}

impl Default for ConnectionTable {
    fn default() -> ConnectionTable {
        ConnectionTable::new()
    }
}
