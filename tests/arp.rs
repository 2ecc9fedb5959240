#[macro_use]
extern crate assert_matches;
#[macro_use]
extern crate lazy_static;
extern crate netstack;

mod context;

use std::cell::RefCell;
use std::rc::Rc;

use netstack::core::repr::{
    Arp,
    ArpOp,
    EthernetAddress,
    Ipv4Address,
};
use netstack::core::service::arp;

type Results = Rc<RefCell<Vec<Option<EthernetAddress>>>>;

fn waiter(results: &Results) -> arp::Waiter {
    let results = results.clone();
    Box::new(move |_, eth_addr| results.borrow_mut().push(eth_addr))
}

fn assert_request_for(frame: &[u8], ipv4_addr: Ipv4Address) {
    let (dst_addr, arp) = context::parse_arp(frame);
    assert_eq!(dst_addr, EthernetAddress::BROADCAST);
    assert_eq!(
        arp,
        Arp {
            op: ArpOp::Request,
            source_hw_addr: *context::ETH_ADDR,
            source_proto_addr: *context::IPV4_ADDR,
            target_hw_addr: EthernetAddress::WILDCARD,
            target_proto_addr: ipv4_addr,
        }
    );
}

#[test]
fn configure_resolves_gateway() {
    let mut context = context::unconfigured();
    context.stack.configure(&context::CONFIG);

    let sent = context.dev.drain_sent();
    assert_eq!(sent.len(), 1);
    assert_request_for(&sent[0], *context::GATEWAY_IPV4_ADDR);

    let sent = context.recv(&context::arp_reply(
        *context::GATEWAY_ETH_ADDR,
        *context::GATEWAY_IPV4_ADDR,
    ));
    assert!(sent.is_empty());
    assert_eq!(context.stack.interface().arp.pending(), 0);
    assert_eq!(
        arp::fetch_cached(context.stack.interface(), *context::GATEWAY_IPV4_ADDR),
        Some(*context::GATEWAY_ETH_ADDR)
    );
}

#[test]
fn reply_to_request_for_us() {
    let mut context = context::configured();

    let sent = context.recv(&context::arp_request(*context::IPV4_ADDR));
    assert_eq!(sent.len(), 1);

    let (dst_addr, arp) = context::parse_arp(&sent[0]);
    assert_eq!(dst_addr, *context::PEER_ETH_ADDR);
    assert_eq!(
        arp,
        Arp {
            op: ArpOp::Reply,
            source_hw_addr: *context::ETH_ADDR,
            source_proto_addr: *context::IPV4_ADDR,
            target_hw_addr: *context::PEER_ETH_ADDR,
            target_proto_addr: *context::PEER_IPV4_ADDR,
        }
    );
}

#[test]
fn ignore_request_for_others() {
    let mut context = context::configured();
    let sent = context.recv(&context::arp_request(Ipv4Address::new([1, 1, 0, 9])));
    assert!(sent.is_empty());
}

#[test]
fn ignore_own_packets() {
    let mut context = context::configured();
    let frame = context::arp_frame(&Arp {
        op: ArpOp::Request,
        source_hw_addr: *context::ETH_ADDR,
        source_proto_addr: *context::PEER_IPV4_ADDR,
        target_hw_addr: EthernetAddress::WILDCARD,
        target_proto_addr: *context::IPV4_ADDR,
    });

    assert!(context.recv(&frame).is_empty());
}

#[test]
fn retry_then_fail_lookup() {
    let mut context = context::configured();
    let results = Results::default();

    arp::fetch_network(
        context.stack.interface_mut(),
        *context::PEER_IPV4_ADDR,
        waiter(&results),
    ).unwrap();

    let sent = context.dev.drain_sent();
    assert_eq!(sent.len(), 1);
    assert_request_for(&sent[0], *context::PEER_IPV4_ADDR);

    // Retries double the delay, starting at 200ms.
    for &delta_ms in &[200, 400, 800, 1600] {
        assert!(context.tick(delta_ms - 1).is_empty());
        let sent = context.tick(1);
        assert_eq!(sent.len(), 1);
        assert_request_for(&sent[0], *context::PEER_IPV4_ADDR);
    }

    assert!(context.tick(3199).is_empty());
    assert!(results.borrow().is_empty());
    assert_eq!(context.stack.interface().arp.pending(), 1);

    assert!(context.tick(1).is_empty());
    assert_eq!(*results.borrow(), vec![None]);
    assert_eq!(context.stack.interface().arp.pending(), 0);
}

#[test]
fn waiters_share_a_lookup() {
    let mut context = context::configured();
    let results = Results::default();

    for _ in 0 .. 3 {
        arp::fetch_network(
            context.stack.interface_mut(),
            *context::PEER_IPV4_ADDR,
            waiter(&results),
        ).unwrap();
    }

    assert_eq!(context.dev.drain_sent().len(), 1);
    assert_eq!(context.stack.interface().arp.pending(), 1);

    context.recv(&context::arp_reply(
        *context::PEER_ETH_ADDR,
        *context::PEER_IPV4_ADDR,
    ));
    assert_eq!(*results.borrow(), vec![Some(*context::PEER_ETH_ADDR); 3]);
    assert_eq!(context.stack.interface().arp.pending(), 0);
}

#[test]
fn cached_lookup_resolves_immediately() {
    let mut context = context::with_peer();
    let results = Results::default();

    arp::fetch_network(
        context.stack.interface_mut(),
        *context::PEER_IPV4_ADDR,
        waiter(&results),
    ).unwrap();

    assert!(context.dev.drain_sent().is_empty());
    assert_eq!(*results.borrow(), vec![Some(*context::PEER_ETH_ADDR)]);
}

#[test]
fn too_many_lookups() {
    let mut context = context::configured();
    let results = Results::default();

    for i in 0 .. arp::MAX_PROBES {
        let ipv4_addr = Ipv4Address::new([1, 1, 0, 100 + i as u8]);
        assert_matches!(
            arp::fetch_network(context.stack.interface_mut(), ipv4_addr, waiter(&results)),
            Ok(())
        );
    }

    assert_matches!(
        arp::fetch_network(
            context.stack.interface_mut(),
            *context::PEER_IPV4_ADDR,
            waiter(&results)
        ),
        Err(netstack::Error::Exhausted)
    );
}

#[test]
fn joined_lookup_speeds_up_and_extends_retries() {
    let mut context = context::configured();
    let results = Results::default();

    arp::fetch_network(
        context.stack.interface_mut(),
        *context::PEER_IPV4_ADDR,
        waiter(&results),
    ).unwrap();
    assert_eq!(context.dev.drain_sent().len(), 1);

    assert!(context.tick(150).is_empty());

    // Halves the remaining 50ms and the 200ms delay.
    arp::fetch_network(
        context.stack.interface_mut(),
        *context::PEER_IPV4_ADDR,
        waiter(&results),
    ).unwrap();
    assert!(context.dev.drain_sent().is_empty());

    assert!(context.tick(24).is_empty());
    let sent = context.tick(1);
    assert_eq!(sent.len(), 1);
    assert_request_for(&sent[0], *context::PEER_IPV4_ADDR);

    for &delta_ms in &[200, 400, 800, 1600] {
        assert!(context.tick(delta_ms - 1).is_empty());
        let sent = context.tick(1);
        assert_eq!(sent.len(), 1);
        assert_request_for(&sent[0], *context::PEER_IPV4_ADDR);
    }

    assert!(context.tick(3199).is_empty());
    assert!(results.borrow().is_empty());
    assert_eq!(context.stack.interface().arp.pending(), 1);

    assert!(context.tick(1).is_empty());
    assert_eq!(*results.borrow(), vec![None, None]);
    assert_eq!(context.stack.interface().arp.pending(), 0);
}
