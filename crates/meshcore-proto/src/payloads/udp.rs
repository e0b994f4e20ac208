//! UDP-family payloads (`spec.md` §3.3, §6.2).
//!
//! `UDPOpen`/`UDPOpenAck`/`UDPOpenErr` follow "the same structural discipline
//! as their stream equivalents" per the wire layout table, so they reuse
//! [`crate::payloads::stream`]'s types under this family's frame types.
//! `UDPClose` carries no fields, like `StreamClose`.

use bytes::BufMut;

use crate::{
    addr::Address,
    buffer::BufferReader,
    errors::{ProtocolError, Result},
};

pub use crate::payloads::stream::{StreamOpen as UdpOpen, StreamOpenAck as UdpOpenAck, StreamOpenErr as UdpOpenErr};

/// Maximum UDP datagram payload (`spec.md` §6.2).
pub const MAX_DATAGRAM_SIZE: usize = 1472;

/// A forwarded UDP datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpDatagram {
    /// Destination address.
    pub addr: Address,
    /// Destination port.
    pub port: u16,
    /// Datagram payload, at most [`MAX_DATAGRAM_SIZE`] bytes.
    pub data: Vec<u8>,
}

impl UdpDatagram {
    /// Encode onto `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] if `data` exceeds
    /// [`MAX_DATAGRAM_SIZE`] or the address fails to encode.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        if self.data.len() > MAX_DATAGRAM_SIZE {
            return Err(ProtocolError::invalid(
                "udp_datagram.data",
                format!("{} bytes exceeds the {MAX_DATAGRAM_SIZE}-byte datagram limit", self.data.len()),
            ));
        }
        self.addr.encode(buf)?;
        buf.put_u16(self.port);
        #[allow(clippy::cast_possible_truncation, reason = "length checked above")]
        buf.put_u16(self.data.len() as u16);
        buf.put_slice(&self.data);
        Ok(())
    }

    /// Decode from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownAddressType`] for an unrecognized
    /// address-type byte, or [`ProtocolError::InvalidFrame`] on truncation.
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        let addr = Address::decode(reader)?;
        let port = reader.read_u16("udp_datagram.port")?;
        let data = reader.read_len_u16_bytes("udp_datagram.data")?.to_vec();
        Ok(Self { addr, port, data })
    }
}
