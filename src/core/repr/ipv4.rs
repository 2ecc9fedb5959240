use std::fmt::{
    Display,
    Formatter,
    Result as FmtResult,
};
use std::result::Result as StdResult;
use std::str::FromStr;

use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use crate::core::check::internet_checksum;
use crate::{
    Error,
    Result,
};

/// [IPv4 address](https://en.wikipedia.org/wiki/IPv4) in network byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address([u8; 4]);

impl Address {
    /// 0.0.0.0, used as a wildcard when matching endpoints.
    pub const UNSPECIFIED: Address = Address([0; 4]);

    pub const BROADCAST: Address = Address([0xFF; 4]);

    /// Creates an IPv4 address from a network byte order buffer.
    pub const fn new(addr: [u8; 4]) -> Address {
        Address(addr)
    }

    /// Tries to create an IPv4 address from a network byte order slice.
    pub fn try_new(addr: &[u8]) -> Result<Address> {
        if addr.len() != 4 {
            return Err(Error::Exhausted);
        }

        let mut _addr: [u8; 4] = [0; 4];
        _addr.clone_from_slice(addr);
        Ok(Address(_addr))
    }

    /// Returns a reference to the network byte order representation of the address.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the address as a host order integer, ie. 10.0.0.1 => 0x0A000001.
    pub fn as_u32(&self) -> u32 {
        NetworkEndian::read_u32(&self.0)
    }

    /// Creates an address from a host order integer.
    pub fn from_u32(addr: u32) -> Address {
        let mut bytes = [0; 4];
        NetworkEndian::write_u32(&mut bytes, addr);
        Address(bytes)
    }

    pub fn is_unspecified(&self) -> bool {
        *self == Self::UNSPECIFIED
    }

    /// Returns the network part of the address under a netmask.
    pub fn network(&self, netmask: Address) -> Address {
        Address::from_u32(self.as_u32() & netmask.as_u32())
    }

    /// Returns the subnet broadcast address, ie. `address | !netmask`.
    pub fn subnet_broadcast(&self, netmask: Address) -> Address {
        Address::from_u32(self.as_u32() | !netmask.as_u32())
    }

    /// Checks if two addresses are on the same subnet under a netmask.
    pub fn is_same_subnet(&self, other: Address, netmask: Address) -> bool {
        self.network(netmask) == other.network(netmask)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl FromStr for Address {
    type Err = ();

    /// Parses an Ipv4 address from an A.B.C.D style string.
    fn from_str(addr: &str) -> StdResult<Address, Self::Err> {
        let bytes = addr.split(".")
            .map(|token| token.parse::<u8>())
            .collect::<StdResult<Vec<_>, _>>()
            .map_err(|_| ())?;

        if bytes.len() != 4 {
            return Err(());
        }

        let mut ipv4: [u8; 4] = [0; 4];
        ipv4.clone_from_slice(&bytes);

        Ok(Address::new(ipv4))
    }
}

/// [https://en.wikipedia.org/wiki/List_of_IP_protocol_numbers](https://en.wikipedia.org/wiki/List_of_IP_protocol_numbers)
pub mod protocols {
    pub const ICMP: u8 = 1;

    pub const TCP: u8 = 6;

    pub const UDP: u8 = 17;
}

/// Values of the 3 bit flags field.
pub mod flags {
    pub const DONT_FRAGMENT: u8 = 0b010;

    pub const MORE_FRAGMENTS: u8 = 0b001;
}

/// TTL for outgoing packets.
pub const DEFAULT_TTL: u8 = 65;

/// [https://en.wikipedia.org/wiki/IPv4#Header](https://en.wikipedia.org/wiki/IPv4#Header)
mod fields {
    use std::ops::Range;

    pub const VERSION_AND_HEADER_LEN: usize = 0;

    pub const DSCP_AND_ECN: usize = 1;

    pub const TOTAL_LEN: Range<usize> = 2 .. 4;

    pub const IDENTIFICATION: Range<usize> = 4 .. 6;

    pub const FLAGS_AND_FRAG_OFFSET: Range<usize> = 6 .. 8;

    pub const TTL: usize = 8;

    pub const PROTOCOL: usize = 9;

    pub const CHECKSUM: Range<usize> = 10 .. 12;

    pub const SRC_ADDR: Range<usize> = 12 .. 16;

    pub const DST_ADDR: Range<usize> = 16 .. 20;
}

/// View of a byte buffer as an IPv4 packet.
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

    pub const MAX_HEADER_LEN: usize = 60;

    /// Tries to create an IPv4 packet view over a byte buffer.
    ///
    /// NOTE: Use check_encoding() before operating on the packet if the buffer
    /// originates from an untrusted source like a link.
    pub fn try_new(buffer: T) -> Result<Packet<T>> {
        if buffer.as_ref().len() < Self::MIN_HEADER_LEN {
            Err(Error::Exhausted)
        } else {
            Ok(Packet { buffer })
        }
    }

    /// Returns the length of an IPv4 packet with no options and the specified
    /// payload size.
    pub fn buffer_len(payload_len: usize) -> usize {
        Self::MIN_HEADER_LEN + payload_len
    }

    /// Checks the version, lengths, TTL and header checksum of the packet.
    pub fn check_encoding(&self) -> Result<()> {
        let buffer_len = self.buffer.as_ref().len();
        let header_len = self.header_len();
        let total_len = self.total_len() as usize;

        if self.ip_version() != 4 {
            debug!("Ignoring IPv4 packet with version {}.", self.ip_version());
            Err(Error::Malformed)
        } else if header_len < Self::MIN_HEADER_LEN || header_len > Self::MAX_HEADER_LEN
            || header_len > buffer_len
        {
            debug!("Ignoring IPv4 packet with header length {}.", header_len);
            Err(Error::Malformed)
        } else if total_len < header_len || total_len > buffer_len {
            debug!(
                "Ignoring IPv4 packet with total length {} for {} bytes.",
                total_len, buffer_len
            );
            Err(Error::Malformed)
        } else if self.ttl() == 0 {
            debug!("Ignoring IPv4 packet with TTL 0.");
            Err(Error::Malformed)
        } else if self.gen_header_checksum() != self.header_checksum() {
            debug!(
                "Ignoring IPv4 packet with checksum {:#06x}, expected {:#06x}.",
                self.header_checksum(),
                self.gen_header_checksum()
            );
            Err(Error::Checksum)
        } else {
            Ok(())
        }
    }

    /// Calculates the header checksum (including options) as if the checksum
    /// field were zero.
    pub fn gen_header_checksum(&self) -> u16 {
        let header_len = self.header_len()
            .max(Self::MIN_HEADER_LEN)
            .min(self.buffer.as_ref().len());
        let header = &self.buffer.as_ref()[.. header_len];
        internet_checksum(
            header[.. fields::CHECKSUM.start]
                .iter()
                .chain(&[0, 0])
                .chain(&header[fields::CHECKSUM.end ..]),
        )
    }

    pub fn ip_version(&self) -> u8 {
        self.buffer.as_ref()[fields::VERSION_AND_HEADER_LEN] >> 4
    }

    /// Returns the header length in bytes, including any options.
    pub fn header_len(&self) -> usize {
        ((self.buffer.as_ref()[fields::VERSION_AND_HEADER_LEN] & 0x0F) as usize) * 4
    }

    pub fn dscp_ecn(&self) -> u8 {
        self.buffer.as_ref()[fields::DSCP_AND_ECN]
    }

    pub fn total_len(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::TOTAL_LEN])
    }

    pub fn identification(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::IDENTIFICATION])
    }

    /// Returns the 3 bit flags field, see `flags`.
    pub fn flags(&self) -> u8 {
        (NetworkEndian::read_u16(&self.buffer.as_ref()[fields::FLAGS_AND_FRAG_OFFSET]) >> 13) as u8
    }

    /// Returns the fragment offset in 8 byte units.
    pub fn fragment_offset(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::FLAGS_AND_FRAG_OFFSET]) & 0x1FFF
    }

    /// Checks if the packet is a fragment of a larger datagram.
    pub fn is_fragment(&self) -> bool {
        (self.flags() & flags::MORE_FRAGMENTS) != 0 || self.fragment_offset() != 0
    }

    pub fn ttl(&self) -> u8 {
        self.buffer.as_ref()[fields::TTL]
    }

    pub fn protocol(&self) -> u8 {
        self.buffer.as_ref()[fields::PROTOCOL]
    }

    pub fn header_checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::CHECKSUM])
    }

    pub fn src_addr(&self) -> Address {
        let mut addr = [0; 4];
        addr.copy_from_slice(&self.buffer.as_ref()[fields::SRC_ADDR]);
        Address::new(addr)
    }

    pub fn dst_addr(&self) -> Address {
        let mut addr = [0; 4];
        addr.copy_from_slice(&self.buffer.as_ref()[fields::DST_ADDR]);
        Address::new(addr)
    }

    /// Returns the payload, excluding any options and trailing link padding.
    pub fn payload(&self) -> &[u8] {
        let buffer = self.buffer.as_ref();
        let end = (self.total_len() as usize).min(buffer.len());
        let start = self.header_len().min(end);
        &buffer[start .. end]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    pub fn set_ip_version(&mut self, version: u8) {
        let byte = &mut self.buffer.as_mut()[fields::VERSION_AND_HEADER_LEN];
        *byte = (*byte & 0x0F) | (version << 4);
    }

    /// Sets the header length in bytes, which must be a multiple of 4.
    pub fn set_header_len(&mut self, header_len: usize) {
        let byte = &mut self.buffer.as_mut()[fields::VERSION_AND_HEADER_LEN];
        *byte = (*byte & 0xF0) | (((header_len / 4) as u8) & 0x0F);
    }

    pub fn set_dscp_ecn(&mut self, dscp_ecn: u8) {
        self.buffer.as_mut()[fields::DSCP_AND_ECN] = dscp_ecn;
    }

    pub fn set_total_len(&mut self, total_len: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[fields::TOTAL_LEN], total_len);
    }

    pub fn set_identification(&mut self, identification: u16) {
        NetworkEndian::write_u16(
            &mut self.buffer.as_mut()[fields::IDENTIFICATION],
            identification,
        );
    }

    /// Sets the flags and fragment offset (in 8 byte units).
    pub fn set_flags_and_fragment_offset(&mut self, flags: u8, fragment_offset: u16) {
        let value = ((flags as u16) << 13) | (fragment_offset & 0x1FFF);
        NetworkEndian::write_u16(
            &mut self.buffer.as_mut()[fields::FLAGS_AND_FRAG_OFFSET],
            value,
        );
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        self.buffer.as_mut()[fields::TTL] = ttl;
    }

    pub fn set_protocol(&mut self, protocol: u8) {
        self.buffer.as_mut()[fields::PROTOCOL] = protocol;
    }

    pub fn set_header_checksum(&mut self, checksum: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[fields::CHECKSUM], checksum);
    }

    pub fn set_src_addr(&mut self, addr: Address) {
        self.buffer.as_mut()[fields::SRC_ADDR].copy_from_slice(addr.as_bytes());
    }

    pub fn set_dst_addr(&mut self, addr: Address) {
        self.buffer.as_mut()[fields::DST_ADDR].copy_from_slice(addr.as_bytes());
    }

    /// Zeroes then recalculates the header checksum. Should be the last write
    /// to the header.
    pub fn fill_checksum(&mut self) {
        self.set_header_checksum(0);
        let checksum = self.gen_header_checksum();
        self.set_header_checksum(checksum);
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        let header_len = self.header_len();
        let end = (self.total_len() as usize).min(self.buffer.as_ref().len());
        &mut self.buffer.as_mut()[header_len .. end]
    }
}

/// An IPv4 header without options, also used as the metadata of a received
/// datagram once it has been validated (and possibly reassembled).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Repr {
    pub src_addr: Address,
    pub dst_addr: Address,
    pub protocol: u8,
    pub payload_len: usize,
}

impl Repr {
    /// Returns the size of a packet holding this header and its payload.
    pub fn buffer_len(&self) -> usize {
        Packet::<&[u8]>::buffer_len(self.payload_len)
    }

    /// Deserializes the header of a packet, which should have passed
    /// check_encoding().
    pub fn deserialize<T>(packet: &Packet<T>) -> Repr
    where
        T: AsRef<[u8]>,
    {
        Repr {
            src_addr: packet.src_addr(),
            dst_addr: packet.dst_addr(),
            protocol: packet.protocol(),
            payload_len: packet.payload().len(),
        }
    }

    /// Serializes the header into a packet with DEFAULT_TTL, no fragmentation
    /// and a freshly computed checksum.
    pub fn serialize<T>(&self, packet: &mut Packet<T>, identification: u16)
    where
        T: AsRef<[u8]> + AsMut<[u8]>,
    {
        packet.set_ip_version(4);
        packet.set_header_len(Packet::<&[u8]>::MIN_HEADER_LEN);
        packet.set_dscp_ecn(0);
        packet.set_total_len(self.buffer_len() as u16);
        packet.set_identification(identification);
        packet.set_flags_and_fragment_offset(0, 0);
        packet.set_ttl(DEFAULT_TTL);
        packet.set_protocol(self.protocol);
        packet.set_src_addr(self.src_addr);
        packet.set_dst_addr(self.dst_addr);
        packet.fill_checksum();
    }

    /// Calculates a checksum over an upper layer buffer prefixed with the
    /// TCP/UDP pseudo header for this datagram.
    pub fn gen_checksum_with_pseudo_header(&self, buffer: &[u8]) -> u16 {
        let mut pseudo_header = [0; 12];
        pseudo_header[0 .. 4].copy_from_slice(self.src_addr.as_bytes());
        pseudo_header[4 .. 8].copy_from_slice(self.dst_addr.as_bytes());
        pseudo_header[9] = self.protocol;
        NetworkEndian::write_u16(&mut pseudo_header[10 .. 12], buffer.len() as u16);

        internet_checksum(pseudo_header.iter().chain(buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<u8> {
        vec![
            0x45, 0x00, 0x00, 0x18, 0x00, 0x01, 0x20, 0x02, 0x41, 0x11, 0x00, 0x00, 0x01, 0x01,
            0x00, 0x04, 0x01, 0x01, 0x00, 0x05, 0xAA, 0xBB, 0xCC, 0xDD,
        ]
    }

    fn filled_header() -> Vec<u8> {
        let mut buffer = header();
        Packet::try_new(&mut buffer[..]).unwrap().fill_checksum();
        buffer
    }

    #[test]
    fn test_address_from_str() {
        assert_matches!("10.0.0.1".parse::<Address>(), Ok(Address([10, 0, 0, 1])));
        assert_matches!("10.0.0".parse::<Address>(), Err(()));
        assert_matches!("10.0.0.256".parse::<Address>(), Err(()));
        assert_matches!("10.0.a.1".parse::<Address>(), Err(()));
    }

    #[test]
    fn test_address_u32_conversions() {
        let addr = Address::new([10, 0, 0, 1]);
        assert_eq!(addr.as_u32(), 0x0A000001);
        assert_eq!(Address::from_u32(0x0A000001), addr);
    }

    #[test]
    fn test_subnet_broadcast() {
        let netmask = Address::new([255, 255, 255, 0]);
        assert_eq!(
            Address::new([1, 1, 0, 5]).subnet_broadcast(netmask),
            Address::new([1, 1, 0, 255])
        );
        assert_eq!(
            Address::new([10, 0, 0, 1]).subnet_broadcast(Address::new([255, 0, 0, 0])),
            Address::new([10, 255, 255, 255])
        );
        assert_eq!(
            Address::new([10, 0, 0, 1]).subnet_broadcast(Address::BROADCAST),
            Address::new([10, 0, 0, 1])
        );
    }

    #[test]
    fn test_is_same_subnet() {
        let netmask = Address::new([255, 255, 255, 0]);
        let addr = Address::new([1, 1, 0, 5]);
        assert!(addr.is_same_subnet(Address::new([1, 1, 0, 200]), netmask));
        assert!(!addr.is_same_subnet(Address::new([1, 1, 1, 5]), netmask));
        assert!(addr.is_same_subnet(Address::new([8, 8, 8, 8]), Address::UNSPECIFIED));
    }

    #[test]
    fn test_packet_getters() {
        let buffer = filled_header();
        let packet = Packet::try_new(&buffer[..]).unwrap();
        assert_matches!(packet.check_encoding(), Ok(()));
        assert_eq!(packet.ip_version(), 4);
        assert_eq!(packet.header_len(), 20);
        assert_eq!(packet.total_len(), 24);
        assert_eq!(packet.identification(), 1);
        assert_eq!(packet.flags(), flags::MORE_FRAGMENTS);
        assert_eq!(packet.fragment_offset(), 2);
        assert!(packet.is_fragment());
        assert_eq!(packet.ttl(), 0x41);
        assert_eq!(packet.protocol(), protocols::UDP);
        assert_eq!(packet.src_addr(), Address::new([1, 1, 0, 4]));
        assert_eq!(packet.dst_addr(), Address::new([1, 1, 0, 5]));
        assert_eq!(packet.payload(), &[0xAA, 0xBB, 0xCC, 0xDD]);
    }

    #[test]
    fn test_packet_with_buffer_less_than_min_header() {
        let buffer = [0; 19];
        assert_matches!(Packet::try_new(&buffer[..]), Err(Error::Exhausted));
    }

    #[test]
    fn test_check_encoding_with_bad_version() {
        let mut buffer = header();
        buffer[0] = 0x65;
        Packet::try_new(&mut buffer[..]).unwrap().fill_checksum();
        let packet = Packet::try_new(&buffer[..]).unwrap();
        assert_matches!(packet.check_encoding(), Err(Error::Malformed));
    }

    #[test]
    fn test_check_encoding_with_short_header_len() {
        let mut buffer = header();
        buffer[0] = 0x44;
        let packet = Packet::try_new(&buffer[..]).unwrap();
        assert_matches!(packet.check_encoding(), Err(Error::Malformed));
    }

    #[test]
    fn test_check_encoding_with_total_len_less_than_header() {
        let mut buffer = header();
        buffer[3] = 19;
        Packet::try_new(&mut buffer[..]).unwrap().fill_checksum();
        let packet = Packet::try_new(&buffer[..]).unwrap();
        assert_matches!(packet.check_encoding(), Err(Error::Malformed));
    }

    #[test]
    fn test_check_encoding_with_total_len_more_than_buffer() {
        let mut buffer = header();
        buffer[3] = 25;
        Packet::try_new(&mut buffer[..]).unwrap().fill_checksum();
        let packet = Packet::try_new(&buffer[..]).unwrap();
        assert_matches!(packet.check_encoding(), Err(Error::Malformed));
    }

    #[test]
    fn test_check_encoding_with_zero_ttl() {
        let mut buffer = header();
        buffer[8] = 0;
        Packet::try_new(&mut buffer[..]).unwrap().fill_checksum();
        let packet = Packet::try_new(&buffer[..]).unwrap();
        assert_matches!(packet.check_encoding(), Err(Error::Malformed));
    }

    #[test]
    fn test_check_encoding_with_bad_checksum() {
        let mut buffer = filled_header();
        buffer[11] ^= 0x01;
        let packet = Packet::try_new(&buffer[..]).unwrap();
        assert_matches!(packet.check_encoding(), Err(Error::Checksum));
    }

    #[test]
    fn test_payload_excludes_options_and_padding() {
        let mut buffer = vec![0; 32];
        buffer[0] = 0x46;
        buffer[3] = 26;
        buffer[8] = 1;
        buffer[24] = 0x11;
        buffer[25] = 0x22;
        Packet::try_new(&mut buffer[..]).unwrap().fill_checksum();

        let packet = Packet::try_new(&buffer[..]).unwrap();
        assert_matches!(packet.check_encoding(), Ok(()));
        assert_eq!(packet.header_len(), 24);
        assert_eq!(packet.payload(), &[0x11, 0x22]);
    }

    #[test]
    fn test_repr_serialize() {
        let repr = Repr {
            src_addr: Address::new([10, 14, 0, 3]),
            dst_addr: Address::new([83, 248, 217, 4]),
            protocol: protocols::TCP,
            payload_len: 20,
        };

        let mut buffer = vec![0; repr.buffer_len()];
        {
            let mut packet = Packet::try_new(&mut buffer[..]).unwrap();
            repr.serialize(&mut packet, 1);
        }

        assert_eq!(
            &buffer[.. 20],
            &[
                0x45, 0x00, 0x00, 0x28, 0x00, 0x01, 0x00, 0x00, 0x41, 0x06, 0x42, 0xC2, 0x0A,
                0x0E, 0x00, 0x03, 0x53, 0xF8, 0xD9, 0x04,
            ]
        );

        let packet = Packet::try_new(&buffer[..]).unwrap();
        assert_matches!(packet.check_encoding(), Ok(()));
        assert_eq!(Repr::deserialize(&packet), repr);
    }
}
