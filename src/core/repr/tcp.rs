use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use crate::core::repr::Ipv4Repr;
use crate::{
    Error,
    Result,
};

/// TCP control bits, from the least significant bit of the 9 bit flags field.
pub mod flags {
    pub const FIN: u16 = 0x001;

    pub const SYN: u16 = 0x002;

    pub const RST: u16 = 0x004;

    pub const PSH: u16 = 0x008;

    pub const ACK: u16 = 0x010;

    pub const URG: u16 = 0x020;

    pub const ECE: u16 = 0x040;

    pub const CWR: u16 = 0x080;

    pub const NS: u16 = 0x100;
}

/// A TCP header.
///
/// Options are currently not supported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Repr {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq_num: u32,
    pub ack_num: u32,
    /// Access using the constants in `flags`.
    pub flags: u16,
    pub window_size: u16,
    pub urgent_pointer: u16,
}

impl Repr {
    pub const HEADER_LEN: usize = 20;

    /// Returns the length of the TCP header when serialized to a buffer.
    pub fn header_len(&self) -> usize {
        Self::HEADER_LEN
    }

    /// Deserializes a packet into a TCP header.
    pub fn deserialize<T>(packet: &Packet<T>) -> Repr
    where
        T: AsRef<[u8]>,
    {
        Repr {
            src_port: packet.src_port(),
            dst_port: packet.dst_port(),
            seq_num: packet.seq_num(),
            ack_num: packet.ack_num(),
            flags: packet.flags(),
            window_size: packet.window_size(),
            urgent_pointer: packet.urgent_pointer(),
        }
    }

    /// Serializes the TCP header into a packet with a zero checksum.
    ///
    /// Write the payload then call `Packet::fill_checksum(...)`.
    pub fn serialize<T>(&self, packet: &mut Packet<T>)
    where
        T: AsRef<[u8]> + AsMut<[u8]>,
    {
        packet.set_src_port(self.src_port);
        packet.set_dst_port(self.dst_port);
        packet.set_seq_num(self.seq_num);
        packet.set_ack_num(self.ack_num);
        packet.set_data_offset_and_flags((Self::HEADER_LEN / 4) as u8, self.flags);
        packet.set_window_size(self.window_size);
        packet.set_checksum(0);
        packet.set_urgent_pointer(self.urgent_pointer);
    }
}

/// [https://en.wikipedia.org/wiki/Transmission_Control_Protocol#TCP_segment_structure](https://en.wikipedia.org/wiki/Transmission_Control_Protocol#TCP_segment_structure)
mod fields {
    use std::ops::Range;

    pub const SRC_PORT: Range<usize> = 0 .. 2;

    pub const DST_PORT: Range<usize> = 2 .. 4;

    pub const SEQ_NUM: Range<usize> = 4 .. 8;

    pub const ACK_NUM: Range<usize> = 8 .. 12;

    pub const DATA_OFFSET_AND_FLAGS: Range<usize> = 12 .. 14;

    pub const WINDOW_SIZE: Range<usize> = 14 .. 16;

    pub const CHECKSUM: Range<usize> = 16 .. 18;

    pub const URGENT_POINTER: Range<usize> = 18 .. 20;
}

/// View of a byte buffer as a TCP packet.
#[derive(Debug)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> AsRef<[u8]> for Packet<T> {
    fn as_ref(&self) -> &[u8] {
        self.buffer.as_ref()
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> AsMut<[u8]> for Packet<T> {
    fn as_mut(&mut self) -> &mut [u8] {
        self.buffer.as_mut()
    }
}

impl<T: AsRef<[u8]>> Packet<T> {
    pub const MIN_HEADER_LEN: usize = 20;

    /// Tries to create an TCP packet from a byte buffer.
    ///
    /// NOTE: Use check_encoding() before operating on the packet if constructing
    /// a packet via a buffer originating from an untrusted source like a link.
    pub fn try_new(buffer: T) -> Result<Packet<T>> {
        if buffer.as_ref().len() < Self::MIN_HEADER_LEN {
            Err(Error::Exhausted)
        } else {
            Ok(Packet { buffer })
        }
    }

    /// Returns the length of a TCP packet with no options and the specified
    /// payload size.
    pub fn buffer_len(payload_len: usize) -> usize {
        Self::MIN_HEADER_LEN + payload_len
    }

    /// Checks if the packet has a valid encoding. This may include checksum, field
    /// consistency, etc. checks.
    pub fn check_encoding(&self, ipv4_repr: &Ipv4Repr) -> Result<()> {
        if self.header_len() < Self::MIN_HEADER_LEN || self.header_len() > self.buffer.as_ref().len()
        {
            Err(Error::Malformed)
        } else if self.gen_packet_checksum(ipv4_repr) != 0 {
            Err(Error::Checksum)
        } else {
            Ok(())
        }
    }

    /// Calculates the packet checksum over the pseudo header, header and
    /// payload. Yields 0 for a packet with a valid checksum.
    pub fn gen_packet_checksum(&self, ipv4_repr: &Ipv4Repr) -> u16 {
        ipv4_repr.gen_checksum_with_pseudo_header(self.buffer.as_ref())
    }

    pub fn src_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::SRC_PORT])
    }

    pub fn dst_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::DST_PORT])
    }

    pub fn seq_num(&self) -> u32 {
        NetworkEndian::read_u32(&self.buffer.as_ref()[fields::SEQ_NUM])
    }

    pub fn ack_num(&self) -> u32 {
        NetworkEndian::read_u32(&self.buffer.as_ref()[fields::ACK_NUM])
    }

    /// Returns the header length in bytes as given by the data offset.
    pub fn header_len(&self) -> usize {
        ((self.buffer.as_ref()[fields::DATA_OFFSET_AND_FLAGS.start] >> 4) as usize) * 4
    }

    pub fn flags(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::DATA_OFFSET_AND_FLAGS]) & 0x01FF
    }

    pub fn window_size(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::WINDOW_SIZE])
    }

    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::CHECKSUM])
    }

    pub fn urgent_pointer(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::URGENT_POINTER])
    }

    pub fn payload(&self) -> &[u8] {
        let buffer = self.buffer.as_ref();
        &buffer[self.header_len().min(buffer.len()) ..]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    pub fn set_src_port(&mut self, port: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[fields::SRC_PORT], port)
    }

    pub fn set_dst_port(&mut self, port: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[fields::DST_PORT], port)
    }

    pub fn set_seq_num(&mut self, seq_num: u32) {
        NetworkEndian::write_u32(&mut self.buffer.as_mut()[fields::SEQ_NUM], seq_num)
    }

    pub fn set_ack_num(&mut self, ack_num: u32) {
        NetworkEndian::write_u32(&mut self.buffer.as_mut()[fields::ACK_NUM], ack_num)
    }

    /// Sets the data offset (in 32 bit words) and the 9 flag bits.
    pub fn set_data_offset_and_flags(&mut self, data_offset: u8, flags: u16) {
        let value = ((data_offset as u16) << 12) | (flags & 0x01FF);
        NetworkEndian::write_u16(
            &mut self.buffer.as_mut()[fields::DATA_OFFSET_AND_FLAGS],
            value,
        )
    }

    pub fn set_window_size(&mut self, window_size: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[fields::WINDOW_SIZE], window_size)
    }

    pub fn set_checksum(&mut self, checksum: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[fields::CHECKSUM], checksum)
    }

    pub fn set_urgent_pointer(&mut self, urgent_pointer: u16) {
        NetworkEndian::write_u16(
            &mut self.buffer.as_mut()[fields::URGENT_POINTER],
            urgent_pointer,
        )
    }

    /// Zeroes then recalculates the checksum. Should be the last write to the
    /// packet.
    pub fn fill_checksum(&mut self, ipv4_repr: &Ipv4Repr) {
        self.set_checksum(0);
        let checksum = self.gen_packet_checksum(ipv4_repr);
        self.set_checksum(checksum);
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        let header_len = self.header_len();
        &mut self.buffer.as_mut()[header_len ..]
    }
}
