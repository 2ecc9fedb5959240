//! The protocol stack, driven by a loop which alternates between reading a
//! frame and advancing the protocol timers.

use std::time::Duration;

use crate::core::config::Config;
use crate::core::dev::Device;
use crate::core::repr::{
    EthernetFrame,
    Ipv4Repr,
};
use crate::core::service::{
    arp,
    ethernet,
    icmpv4,
    ipv4,
    tcp::Tcp,
    udp,
    Interface,
};
use crate::core::tcp::{
    Callback,
    ConnectionHandle,
    ConnectionTable,
};
use crate::core::time::{
    Env,
    SystemEnv,
    Ticker,
};
use crate::{
    Error,
    Result,
};

/// Protocols carried by IPv4.
struct UpperLayers {
    tcp: Tcp,
}

impl ipv4::Handler for UpperLayers {
    fn recv_tcp(
        &mut self,
        interface: &mut Interface,
        ipv4_repr: &Ipv4Repr,
        payload: &[u8],
    ) -> Result<()> {
        self.tcp.recv_packet(interface, ipv4_repr, payload)
    }

    fn recv_udp(&mut self, _: &mut Interface, ipv4_repr: &Ipv4Repr, payload: &[u8]) -> Result<()> {
        udp::recv_packet(ipv4_repr, payload).map(|_| ())
    }

    fn recv_icmp(
        &mut self,
        interface: &mut Interface,
        ipv4_repr: &Ipv4Repr,
        payload: &[u8],
    ) -> Result<()> {
        icmpv4::recv_packet(interface, ipv4_repr, payload)
    }
}

/// Owns all protocol state of one interface.
pub struct ProtocolStack<T: Env = SystemEnv> {
    interface: Interface,
    upper: UpperLayers,
    ticker: Ticker<T>,
}

impl ProtocolStack<SystemEnv> {
    /// Creates an unconfigured stack over a device.
    pub fn new(dev: Box<dyn Device>) -> ProtocolStack<SystemEnv> {
        ProtocolStack::with_env(dev, SystemEnv::new())
    }
}

impl<T: Env> ProtocolStack<T> {
    /// Creates an unconfigured stack measuring time with env.
    pub fn with_env(dev: Box<dyn Device>, env: T) -> ProtocolStack<T> {
        ProtocolStack {
            interface: Interface::new(dev),
            upper: UpperLayers { tcp: Tcp::new() },
            ticker: Ticker::new(env),
        }
    }

    /// Assigns the interface addresses and starts resolving the gateway.
    pub fn configure(&mut self, config: &Config) {
        ethernet::configure(&mut self.interface, config.ethernet_addr);
        ipv4::configure(
            &mut self.interface,
            config.ipv4_addr,
            config.netmask,
            config.default_gateway,
        );
    }

    /// Advances the ARP retry and IPv4 reassembly timers.
    pub fn tick(&mut self, delta_ms: u32) {
        arp::tick(&mut self.interface, delta_ms);
        ipv4::tick(&mut self.interface, delta_ms);
    }

    /// Processes a frame read from the device. Frames which can't be
    /// processed are logged and dropped.
    pub fn on_receive(&mut self, frame: &[u8]) {
        if let Err(err) = ethernet::recv_frame(&mut self.interface, frame, &mut self.upper) {
            debug!("Dropped frame with {} bytes: {:?}.", frame.len(), err);
        }
    }

    /// Waits at most timeout for a frame, advances the timers by the time
    /// passed since the previous poll, then processes the frame.
    ///
    /// Returns whether a frame was received.
    pub fn poll(&mut self, timeout: Duration) -> Result<bool> {
        let mtu = self.interface.dev.max_transmission_unit();
        let mut buffer = vec![0; EthernetFrame::<&[u8]>::HEADER_LEN + mtu];
        let received = self.interface.dev.recv(&mut buffer, timeout);

        let delta_ms = self.ticker.elapsed_ms();
        self.tick(delta_ms);

        match received {
            Ok(len) => {
                self.on_receive(&buffer[.. len]);
                Ok(true)
            }
            Err(Error::Timeout) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Accepts connections on a local port.
    pub fn listen(&mut self, port: u16) -> Result<ConnectionHandle> {
        self.upper.tcp.listen(port)
    }

    /// Sets the receiver of data on all connections.
    pub fn set_callback(&mut self, callback: Box<dyn Callback>) {
        self.upper.tcp.connections.set_callback(callback);
    }

    /// Sends data on an established connection.
    pub fn send(&mut self, handle: ConnectionHandle, data: &[u8]) -> Result<()> {
        self.upper.tcp.send(&mut self.interface, handle, data)
    }

    /// Closes an established connection.
    pub fn close(&mut self, handle: ConnectionHandle) -> Result<()> {
        self.upper.tcp.close(&mut self.interface, handle)
    }

    pub fn connections(&self) -> &ConnectionTable {
        &self.upper.tcp.connections
    }

    pub fn interface(&self) -> &Interface {
        &self.interface
    }

    pub fn interface_mut(&mut self) -> &mut Interface {
        &mut self.interface
    }

    pub fn env_mut(&mut self) -> &mut T {
        self.ticker.env_mut()
    }
}
