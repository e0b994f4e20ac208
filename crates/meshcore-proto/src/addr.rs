//! Destination address encoding shared by `StreamOpen`/`UDPOpen`/`UDPDatagram`
//! and the route-family prefixes (`spec.md` §3.3, §4.2).

use bytes::BufMut;

use crate::{
    buffer::BufferReader,
    errors::{ProtocolError, Result},
};

/// Address-type byte carried inline in stream/UDP open and datagram payloads.
///
/// Distinct from [`crate::payloads::routing::AddressFamily`]: the two
/// enumerations share a domain but assign different numeric values, so they
/// are kept as separate types rather than merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AddressType {
    /// 4-byte IPv4 address.
    Ipv4 = 0x01,
    /// Length-prefixed domain name.
    Domain = 0x03,
    /// 16-byte IPv6 address.
    Ipv6 = 0x04,
}

impl AddressType {
    /// Raw wire byte.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse the wire byte, `None` if unrecognized.
    #[must_use]
    pub const fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0x01 => Self::Ipv4,
            0x03 => Self::Domain,
            0x04 => Self::Ipv6,
            _ => return None,
        })
    }
}

/// A destination address as carried inline after an [`AddressType`] byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// 4-byte IPv4 address.
    Ipv4([u8; 4]),
    /// Length-prefixed domain name.
    Domain(String),
    /// 16-byte IPv6 address.
    Ipv6([u8; 16]),
}

impl Address {
    /// The [`AddressType`] discriminant for this address.
    #[must_use]
    pub const fn address_type(&self) -> AddressType {
        match self {
            Self::Ipv4(_) => AddressType::Ipv4,
            Self::Domain(_) => AddressType::Domain,
            Self::Ipv6(_) => AddressType::Ipv6,
        }
    }

    /// Encode `type_byte ‖ addr` into `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] if a domain name is longer than
    /// 255 bytes.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        buf.put_u8(self.address_type().to_u8());
        match self {
            Self::Ipv4(octets) => buf.put_slice(octets),
            Self::Ipv6(octets) => buf.put_slice(octets),
            Self::Domain(name) => {
                crate::buffer::put_len_u8_string(buf, "address.domain", name)?;
            }
        }
        Ok(())
    }

    /// Decode `type_byte ‖ addr` from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownAddressType`] for an unrecognized type
    /// byte, or [`ProtocolError::InvalidFrame`] on truncated input.
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        let type_byte = reader.read_u8("address.type")?;
        match AddressType::from_u8(type_byte) {
            Some(AddressType::Ipv4) => Ok(Self::Ipv4(reader.read_array::<4>("address.ipv4")?)),
            Some(AddressType::Ipv6) => Ok(Self::Ipv6(reader.read_array::<16>("address.ipv6")?)),
            Some(AddressType::Domain) => {
                Ok(Self::Domain(reader.read_len_u8_string("address.domain")?))
            }
            None => Err(ProtocolError::UnknownAddressType(type_byte)),
        }
    }

    /// Wire size of this address, including its leading type byte.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        1 + match self {
            Self::Ipv4(_) => 4,
            Self::Ipv6(_) => 16,
            Self::Domain(name) => 1 + name.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(addr: &Address) {
        let mut buf = Vec::new();
        addr.encode(&mut buf).expect("encode");
        assert_eq!(buf.len(), addr.encoded_len());
        let mut reader = BufferReader::new(&buf);
        let decoded = Address::decode(&mut reader).expect("decode");
        assert_eq!(&decoded, addr);
        assert!(reader.is_empty());
    }

    #[test]
    fn ipv4_round_trips() {
        round_trip(&Address::Ipv4([10, 0, 0, 1]));
    }

    #[test]
    fn ipv6_round_trips() {
        round_trip(&Address::Ipv6([0xAB; 16]));
    }

    #[test]
    fn domain_round_trips() {
        round_trip(&Address::Domain("example.mesh".to_owned()));
    }

    #[test]
    fn unknown_type_byte_is_rejected() {
        let bytes = [0x02u8, 0, 0, 0, 0];
        let mut reader = BufferReader::new(&bytes);
        assert_eq!(Address::decode(&mut reader), Err(ProtocolError::UnknownAddressType(0x02)));
    }
}
