#[cfg(test)]
#[macro_use]
extern crate assert_matches;
extern crate byteorder;
#[cfg(target_os = "linux")]
extern crate get_if_addrs;
#[macro_use]
extern crate lazy_static;
extern crate libc;
#[macro_use]
extern crate log;
extern crate rand;

pub mod core;

#[cfg(target_os = "linux")]
pub mod linux;

#[derive(Debug)]
pub enum Error {
    /// Indicates an error where an address could not be resolved.
    Address,
    /// Indicates an error where a buffer, device, table, etc. is full or empty.
    Exhausted,
    /// Indicates an error where a packet or frame is malformed.
    Malformed,
    /// Indicates an error where a checksum is invalid.
    Checksum,
    /// Indicates a packet type, protocol or address format that is not handled.
    Unsupported,
    /// Indicates a valid packet that was not meant for us.
    Ignored,
    /// Indicates an operation which did not complete in time.
    Timeout,
    /// Indicates a generic IO error.
    IO(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IO(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
