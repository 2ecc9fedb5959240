#[macro_use]
extern crate clap;
extern crate env_logger;
extern crate netstack;

mod cli;

use std::time::Duration;

use netstack::core::stack::ProtocolStack;
use netstack::core::tcp::{
    ConnectionHandle,
    ConnectionTable,
};
use netstack::linux::dev::Tap;

use cli::App;

/// Starts a TCP server that echo's an incoming stream to the sender.
fn main() {
    env_logger::init();

    let matches = clap_app!(app =>
        (@arg PORT: +takes_value +required "TCP port to bind")
    ).with_defaults()
        .get_matches();

    let port = matches
        .value_of("PORT")
        .and_then(|port| port.parse::<u16>().ok())
        .expect("Bad TCP port!");

    let config = cli::config(&matches);
    let tap = Tap::new(matches.value_of("tap").unwrap_or("tap0")).expect("Can't open TAP!");

    let mut stack = ProtocolStack::new(Box::new(tap));
    stack.configure(&config);
    stack.listen(port).expect("Can't listen!");
    stack.set_callback(Box::new(
        |connections: &mut ConnectionTable, handle: ConnectionHandle, data: &[u8]| {
            println!("Echoing {} bytes.", data.len());
            if let Err(err) = connections.send(handle, data) {
                println!("Echo failed with {:?}.", err);
            }
        },
    ));

    println!(
        "Running TCP echo server; Use 'ncat {} {}' to send messages.",
        config.ipv4_addr, port
    );

    loop {
        if let Err(err) = stack.poll(Duration::from_millis(10)) {
            println!("Device error: {:?}.", err);
            break;
        }
    }
}
