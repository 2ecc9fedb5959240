use std::str::FromStr;

use netstack::core::config::Config;
use netstack::core::repr::{
    EthernetAddress,
    Ipv4Address,
};

pub trait App {
    fn with_defaults(self) -> Self;
}

impl<'a, 'b> App for clap::App<'a, 'b> {
    fn with_defaults(self) -> Self {
        self.arg(
            clap::Arg::with_name("tap")
                .long("tap")
                .value_name("TAP")
                .help("Linux TAP interface")
                .default_value("tap0")
                .takes_value(true),
        )
        .arg(
            clap::Arg::with_name("dev-mac")
                .long("dev-mac")
                .value_name("MAC")
                .help("MAC address of the stack")
                .default_value("06:11:22:33:44:55")
                .takes_value(true),
        )
        .arg(
            clap::Arg::with_name("dev-ipv4")
                .long("dev-ipv4")
                .value_name("IPV4")
                .help("IPv4 address of the stack")
                .default_value("10.0.0.102")
                .takes_value(true),
        )
        .arg(
            clap::Arg::with_name("netmask")
                .long("netmask")
                .value_name("IPV4")
                .help("Subnet mask of the stack")
                .default_value("255.255.255.0")
                .takes_value(true),
        )
        .arg(
            clap::Arg::with_name("gateway")
                .long("gateway")
                .value_name("IPV4")
                .help("Default gateway, defaults to the address of the TAP interface")
                .takes_value(true),
        )
    }
}

fn parse<T: FromStr>(matches: &clap::ArgMatches, name: &str) -> T {
    match matches.value_of(name).map(T::from_str) {
        Some(Ok(value)) => value,
        _ => panic!("Bad value for --{}!", name),
    }
}

/// Builds the stack configuration from parsed arguments.
pub fn config(matches: &clap::ArgMatches) -> Config {
    let default_gateway = match matches.value_of("gateway") {
        Some(_) => parse::<Ipv4Address>(matches, "gateway"),
        None => gateway_from_tap(matches.value_of("tap").unwrap_or("tap0")),
    };

    Config {
        ethernet_addr: parse::<EthernetAddress>(matches, "dev-mac"),
        ipv4_addr: parse::<Ipv4Address>(matches, "dev-ipv4"),
        netmask: parse::<Ipv4Address>(matches, "netmask"),
        default_gateway,
    }
}

#[cfg(target_os = "linux")]
fn gateway_from_tap(tap: &str) -> Ipv4Address {
    netstack::linux::ifr_addr(tap).expect("TAP interface has no IPv4 address!")
}

#[cfg(not(target_os = "linux"))]
fn gateway_from_tap(_: &str) -> Ipv4Address {
    panic!("--gateway is required on this platform!")
}
