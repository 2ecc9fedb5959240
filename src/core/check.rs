/// Calculates the Internet Checksum from [RFC1071](https://tools.ietf.org/html/rfc1071).
///
/// The bytes are summed as big endian 16 bit words, padding an odd trailing
/// byte with zero. Accepts any byte iterator so pseudo headers can be chained
/// in front of a packet without copying.
///
/// See [IPv4 header checksum](https://en.wikipedia.org/wiki/IPv4_header_checksum) for an example.
pub fn internet_checksum<'a, I>(bytes: I) -> u16
where
    I: IntoIterator<Item = &'a u8>,
{
    let mut acc = 0 as u32;
    let mut bytes = bytes.into_iter();

    loop {
        let word = match (bytes.next(), bytes.next()) {
            (Some(hi), Some(lo)) => ((*hi as u32) << 8) | (*lo as u32),
            (Some(hi), None) => (*hi as u32) << 8,
            _ => break,
        };

        acc += word;
        if acc > 0xFFFF {
            acc = (acc & 0xFFFF) + (acc >> 16);
        }
    }

    !acc as u16
}
