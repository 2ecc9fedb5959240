use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use crate::{
    Error,
    Result,
};

/// Safe representation of a UDP header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Repr {
    pub src_port: u16,
    pub dst_port: u16,
    /// Length of the header and payload in bytes.
    pub length: u16,
}

impl Repr {
    /// Deserializes a packet into a UDP header.
    pub fn deserialize<T>(packet: &Packet<T>) -> Repr
    where
        T: AsRef<[u8]>,
    {
        Repr {
            src_port: packet.src_port(),
            dst_port: packet.dst_port(),
            length: packet.length(),
        }
    }
}

/// [https://en.wikipedia.org/wiki/User_Datagram_Protocol](https://en.wikipedia.org/wiki/User_Datagram_Protocol)
mod fields {
    use std::ops::Range;

    pub const SRC_PORT: Range<usize> = 0 .. 2;

    pub const DST_PORT: Range<usize> = 2 .. 4;

    pub const LENGTH: Range<usize> = 4 .. 6;

    pub const CHECKSUM: Range<usize> = 6 .. 8;
}

/// View of a byte buffer as a UDP packet.
#[derive(Debug)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> AsRef<[u8]> for Packet<T> {
    fn as_ref(&self) -> &[u8] {
        self.buffer.as_ref()
    }
}

impl<T: AsRef<[u8]>> Packet<T> {
    pub const HEADER_LEN: usize = 8;

    /// Tries to create a UDP packet view over a byte buffer.
    pub fn try_new(buffer: T) -> Result<Packet<T>> {
        if buffer.as_ref().len() < Self::HEADER_LEN {
            Err(Error::Exhausted)
        } else {
            Ok(Packet { buffer })
        }
    }

    /// Checks that the length field covers the header and fits the buffer.
    pub fn check_encoding(&self) -> Result<()> {
        let length = self.length() as usize;

        if length < Self::HEADER_LEN || length > self.buffer.as_ref().len() {
            Err(Error::Malformed)
        } else {
            Ok(())
        }
    }

    pub fn src_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::SRC_PORT])
    }

    pub fn dst_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::DST_PORT])
    }

    pub fn length(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::LENGTH])
    }

    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::CHECKSUM])
    }

    pub fn payload(&self) -> &[u8] {
        let buffer = self.buffer.as_ref();
        let end = (self.length() as usize).max(Self::HEADER_LEN).min(buffer.len());
        &buffer[Self::HEADER_LEN .. end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_with_buffer_less_than_header() {
        let buffer = [0; 7];
        assert_matches!(Packet::try_new(&buffer[..]), Err(Error::Exhausted));
    }

    #[test]
    fn test_packet_getters() {
        let buffer = [0x04, 0x00, 0x00, 0x35, 0x00, 0x0A, 0x12, 0x34, 0xAA, 0xBB, 0xCC];
        let packet = Packet::try_new(&buffer[..]).unwrap();
        assert_matches!(packet.check_encoding(), Ok(()));
        assert_eq!(
            Repr::deserialize(&packet),
            Repr {
                src_port: 1024,
                dst_port: 53,
                length: 10,
            }
        );
        assert_eq!(packet.checksum(), 0x1234);
        assert_eq!(packet.payload(), &[0xAA, 0xBB]);
    }

    #[test]
    fn test_check_encoding_with_bad_length() {
        let buffer = [0x04, 0x00, 0x00, 0x35, 0x00, 0x07, 0x00, 0x00];
        let packet = Packet::try_new(&buffer[..]).unwrap();
        assert_matches!(packet.check_encoding(), Err(Error::Malformed));

        let buffer = [0x04, 0x00, 0x00, 0x35, 0x00, 0x09, 0x00, 0x00];
        let packet = Packet::try_new(&buffer[..]).unwrap();
        assert_matches!(packet.check_encoding(), Err(Error::Malformed));
    }
}
