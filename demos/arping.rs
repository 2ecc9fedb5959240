#[macro_use]
extern crate clap;
extern crate env_logger;
extern crate netstack;

mod cli;

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use netstack::core::repr::{
    EthernetAddress,
    Ipv4Address,
};
use netstack::core::service::arp;
use netstack::core::stack::ProtocolStack;
use netstack::linux::dev::Tap;

use cli::App;

/// Resolves the MAC address of an IPv4 address via ARP.
fn main() {
    env_logger::init();

    let matches = clap_app!(app =>
        (@arg ADDRESS: +takes_value +required "IPv4 address to resolve")
    ).with_defaults()
        .get_matches();

    let ipv4_addr = matches
        .value_of("ADDRESS")
        .and_then(|addr| addr.parse::<Ipv4Address>().ok())
        .expect("Bad IPv4 address!");

    let config = cli::config(&matches);
    let tap = Tap::new(matches.value_of("tap").unwrap_or("tap0")).expect("Can't open TAP!");

    let mut stack = ProtocolStack::new(Box::new(tap));
    stack.configure(&config);

    // None until resolved, Some(None) on failure.
    let result: Rc<Cell<Option<Option<EthernetAddress>>>> = Rc::new(Cell::new(None));
    let waiter_result = result.clone();
    arp::fetch_network(
        stack.interface_mut(),
        ipv4_addr,
        Box::new(move |_, eth_addr| waiter_result.set(Some(eth_addr))),
    ).expect("Too many ARP lookups!");

    println!("ARP request sent. Use tshark or tcpdump to observe.");

    loop {
        match result.get() {
            Some(Some(eth_addr)) => {
                println!("{} has MAC {}!", ipv4_addr, eth_addr);
                break;
            }
            Some(None) => {
                println!("No reply from {}.", ipv4_addr);
                std::process::exit(1);
            }
            None => {}
        }

        stack
            .poll(Duration::from_millis(10))
            .expect("Device error!");
    }
}
