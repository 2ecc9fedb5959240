use crate::core::arp_cache::ArpCache;
use crate::core::repr::{
    eth_types,
    Arp,
    ArpOp,
    EthernetAddress,
    EthernetFrame,
    Ipv4Address,
};
use crate::core::service::{
    ethernet,
    Interface,
};
use crate::{
    Error,
    Result,
};

/// Maximum number of addresses being resolved at once.
pub const MAX_PROBES: usize = 16;

/// Maximum number of callers waiting on a single address.
pub const MAX_WAITERS: usize = 32;

/// Delay before the first retransmission of a request.
pub const RETRY_DELAY_MS: i64 = 200;

/// Number of requests sent before a lookup fails.
pub const MAX_ATTEMPTS: u32 = 5;

/// Invoked exactly once when a lookup resolves, with None on failure.
pub type Waiter = Box<dyn FnOnce(&mut Interface, Option<EthernetAddress>)>;

enum ProbeStatus {
    Waiting,
    Retry,
    Expired,
}

/// An outstanding lookup for a single IPv4 address.
struct Probe {
    ipv4_addr: Ipv4Address,
    retry_timer: i64,
    retry_delta: i64,
    attempts: u32,
    waiters: Vec<Waiter>,
}

impl Probe {
    fn new(ipv4_addr: Ipv4Address, waiter: Waiter) -> Probe {
        Probe {
            ipv4_addr,
            retry_timer: RETRY_DELAY_MS,
            retry_delta: RETRY_DELAY_MS,
            attempts: 1,
            waiters: vec![waiter],
        }
    }

    /// Speeds up retransmission and extends the life of the probe for a new
    /// waiter.
    fn reset(&mut self) {
        self.retry_timer = (self.retry_timer / 2).max(1);
        self.retry_delta = (self.retry_delta / 2).max(1);
        self.attempts = 0;
    }

    fn tick(&mut self, delta_ms: u32) -> ProbeStatus {
        self.retry_timer -= delta_ms as i64;
        if self.retry_timer > 0 {
            return ProbeStatus::Waiting;
        }

        if self.attempts >= MAX_ATTEMPTS {
            return ProbeStatus::Expired;
        }

        self.attempts += 1;
        self.retry_delta *= 2;
        self.retry_timer = self.retry_delta;
        ProbeStatus::Retry
    }

    fn notify_all(self, interface: &mut Interface, eth_addr: Option<EthernetAddress>) {
        for waiter in self.waiters {
            waiter(interface, eth_addr);
        }
    }
}

/// Address translations and in flight lookups of an interface.
pub struct ArpState {
    pub cache: ArpCache,
    probes: Vec<Probe>,
}

impl ArpState {
    /// Returns the number of addresses currently being resolved.
    pub fn pending(&self) -> usize {
        self.probes.len()
    }
}

impl Default for ArpState {
    fn default() -> ArpState {
        ArpState {
            cache: ArpCache::default(),
            probes: Vec::with_capacity(MAX_PROBES),
        }
    }
}

/// Sends an ARP packet via an interface.
pub fn send_packet(
    interface: &mut Interface,
    arp_repr: &Arp,
    dst_addr: EthernetAddress,
) -> Result<()> {
    ethernet::send_frame(
        interface,
        dst_addr,
        eth_types::ARP,
        arp_repr.buffer_len(),
        |eth_payload| arp_repr.serialize(eth_payload),
    )
}

/// Broadcasts a request for the hardware address of ipv4_addr.
pub fn send_request(interface: &mut Interface, ipv4_addr: Ipv4Address) -> Result<()> {
    let arp_repr = Arp {
        op: ArpOp::Request,
        source_hw_addr: interface.ethernet_addr,
        source_proto_addr: interface.ipv4_addr,
        target_hw_addr: EthernetAddress::WILDCARD,
        target_proto_addr: ipv4_addr,
    };

    debug!("Sending ARP request for {}.", ipv4_addr);
    send_packet(interface, &arp_repr, EthernetAddress::BROADCAST)
}

/// Receives an ARP packet from an interface.
///
/// Requests for our address are answered, replies are recorded and complete
/// any lookup for the sender.
pub fn recv_packet(interface: &mut Interface, eth_frame: &EthernetFrame<&[u8]>) -> Result<()> {
    let arp_repr = match Arp::deserialize(eth_frame.payload()) {
        Ok(arp_repr) => arp_repr,
        Err(err) => {
            debug!("Ignoring malformed ARP packet with {:?}.", err);
            return Err(err);
        }
    };

    if arp_repr.source_hw_addr == interface.ethernet_addr {
        debug!("Ignoring ARP packet sent by ourselves.");
        return Err(Error::Ignored);
    }

    match arp_repr.op {
        ArpOp::Request => {
            if arp_repr.target_proto_addr != interface.ipv4_addr {
                debug!(
                    "Ignoring ARP request for {} from {}.",
                    arp_repr.target_proto_addr, arp_repr.source_proto_addr
                );
                return Err(Error::Ignored);
            }

            info!(
                "Replying to ARP request from {} ({}).",
                arp_repr.source_proto_addr, arp_repr.source_hw_addr
            );

            let arp_reply = Arp {
                op: ArpOp::Reply,
                source_hw_addr: interface.ethernet_addr,
                source_proto_addr: interface.ipv4_addr,
                target_hw_addr: arp_repr.source_hw_addr,
                target_proto_addr: arp_repr.source_proto_addr,
            };
            send_packet(interface, &arp_reply, eth_frame.src_addr())
        }
        ArpOp::Reply => {
            info!(
                "ARP {} is at {}.",
                arp_repr.source_proto_addr, arp_repr.source_hw_addr
            );

            interface
                .arp
                .cache
                .set_eth_addr_for_ip(arp_repr.source_proto_addr, arp_repr.source_hw_addr);

            if let Some(i) = interface
                .arp
                .probes
                .iter()
                .position(|probe| probe.ipv4_addr == arp_repr.source_proto_addr)
            {
                let probe = interface.arp.probes.remove(i);
                probe.notify_all(interface, Some(arp_repr.source_hw_addr));
            }

            Ok(())
        }
    }
}

/// Looks up an address in the mapping table without touching the network.
pub fn fetch_cached(interface: &Interface, ipv4_addr: Ipv4Address) -> Option<EthernetAddress> {
    interface.arp.cache.eth_addr_for_ip(ipv4_addr)
}

/// Resolves an address, invoking waiter once with the result.
///
/// Cached addresses resolve immediately. Otherwise the waiter joins the
/// probe for the address, broadcasting a request if there is none yet.
pub fn fetch_network(
    interface: &mut Interface,
    ipv4_addr: Ipv4Address,
    waiter: Waiter,
) -> Result<()> {
    if let Some(eth_addr) = fetch_cached(interface, ipv4_addr) {
        waiter(interface, Some(eth_addr));
        return Ok(());
    }

    if let Some(probe) = interface
        .arp
        .probes
        .iter_mut()
        .find(|probe| probe.ipv4_addr == ipv4_addr)
    {
        if probe.waiters.len() >= MAX_WAITERS {
            warn!("Too many callers waiting on ARP lookup for {}.", ipv4_addr);
            return Err(Error::Exhausted);
        }

        probe.reset();
        probe.waiters.push(waiter);
        return Ok(());
    }

    if interface.arp.probes.len() >= MAX_PROBES {
        warn!(
            "Too many ARP lookups in flight, dropping lookup for {}.",
            ipv4_addr
        );
        return Err(Error::Exhausted);
    }

    interface.arp.probes.push(Probe::new(ipv4_addr, waiter));
    if let Err(err) = send_request(interface, ipv4_addr) {
        debug!("Error sending ARP request for {}: {:?}.", ipv4_addr, err);
    }

    Ok(())
}

/// Advances retransmission timers, failing lookups which ran out of attempts.
pub fn tick(interface: &mut Interface, delta_ms: u32) {
    let mut retries = Vec::new();
    let mut expired = Vec::new();

    let mut i = 0;
    while i < interface.arp.probes.len() {
        match interface.arp.probes[i].tick(delta_ms) {
            ProbeStatus::Waiting => i += 1,
            ProbeStatus::Retry => {
                retries.push(interface.arp.probes[i].ipv4_addr);
                i += 1;
            }
            ProbeStatus::Expired => expired.push(interface.arp.probes.remove(i)),
        }
    }

    for ipv4_addr in retries {
        if let Err(err) = send_request(interface, ipv4_addr) {
            debug!("Error resending ARP request for {}: {:?}.", ipv4_addr, err);
        }
    }

    for probe in expired {
        info!("ARP lookup for {} timed out.", probe.ipv4_addr);
        probe.notify_all(interface, None);
    }
}
