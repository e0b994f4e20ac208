//! Stream-family payloads (`spec.md` §3.3, §6.2).
//!
//! `StreamData` and `StreamClose` carry no fields beyond the frame header
//! (the former is the raw payload bytes themselves, the latter is empty) and
//! so have no dedicated struct here; see [`crate::payloads::Payload`].

use bytes::BufMut;

use crate::{
    addr::Address,
    agent_id::AgentId,
    buffer::{put_len_u8_string, BufferReader},
    error_code::ErrorCode,
    errors::{ProtocolError, Result},
};

/// Ephemeral X25519 public key size, appended to open/ack payloads.
pub const EPHEMERAL_KEY_SIZE: usize = 32;

fn encode_path(buf: &mut impl BufMut, path: &[AgentId], field: &'static str) -> Result<()> {
    if path.len() > u8::MAX as usize {
        return Err(ProtocolError::invalid(field, format!("{} hops exceeds the 1-byte length prefix", path.len())));
    }
    #[allow(clippy::cast_possible_truncation, reason = "length checked above")]
    buf.put_u8(path.len() as u8);
    for hop in path {
        buf.put_slice(hop.as_bytes());
    }
    Ok(())
}

/// Request to open a new stream to a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOpen {
    /// Request correlation id.
    pub request_id: u64,
    /// Destination address.
    pub addr: Address,
    /// Destination port.
    pub port: u16,
    /// Remaining hop budget.
    pub ttl: u8,
    /// Remaining path to traverse.
    pub path: Vec<AgentId>,
    /// Initiator's ephemeral X25519 public key.
    pub ephemeral_pub: [u8; EPHEMERAL_KEY_SIZE],
}

impl StreamOpen {
    /// Encode onto `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] if `path` exceeds 255 entries
    /// or the address fails to encode.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        buf.put_u64(self.request_id);
        self.addr.encode(buf)?;
        buf.put_u16(self.port);
        buf.put_u8(self.ttl);
        encode_path(buf, &self.path, "stream_open.path")?;
        buf.put_slice(&self.ephemeral_pub);
        Ok(())
    }

    /// Decode from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownAddressType`] for an unrecognized
    /// address-type byte, or [`ProtocolError::InvalidFrame`] on truncation.
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        let request_id = reader.read_u64("stream_open.request_id")?;
        let addr = Address::decode(reader)?;
        let port = reader.read_u16("stream_open.port")?;
        let ttl = reader.read_u8("stream_open.ttl")?;
        let path = reader.read_agent_id_list("stream_open.path")?;
        let ephemeral_pub = reader.read_array::<EPHEMERAL_KEY_SIZE>("stream_open.ephemeral_pub")?;
        Ok(Self { request_id, addr, port, ttl, path, ephemeral_pub })
    }
}

/// Acknowledgment of a successful [`StreamOpen`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOpenAck {
    /// Request correlation id this acknowledges.
    pub request_id: u64,
    /// Address the destination bound to.
    pub bound_addr: Address,
    /// Port the destination bound to.
    pub bound_port: u16,
    /// Responder's ephemeral X25519 public key.
    pub ephemeral_pub: [u8; EPHEMERAL_KEY_SIZE],
}

impl StreamOpenAck {
    /// Encode onto `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] if the address fails to
    /// encode.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        buf.put_u64(self.request_id);
        self.bound_addr.encode(buf)?;
        buf.put_u16(self.bound_port);
        buf.put_slice(&self.ephemeral_pub);
        Ok(())
    }

    /// Decode from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownAddressType`] for an unrecognized
    /// address-type byte, or [`ProtocolError::InvalidFrame`] on truncation.
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        let request_id = reader.read_u64("stream_open_ack.request_id")?;
        let bound_addr = Address::decode(reader)?;
        let bound_port = reader.read_u16("stream_open_ack.bound_port")?;
        let ephemeral_pub = reader.read_array::<EPHEMERAL_KEY_SIZE>("stream_open_ack.ephemeral_pub")?;
        Ok(Self { request_id, bound_addr, bound_port, ephemeral_pub })
    }
}

/// Rejection of a [`StreamOpen`] request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOpenErr {
    /// Request correlation id this rejects.
    pub request_id: u64,
    /// Raw wire error code.
    pub error_code: u16,
    /// Human-readable reason, truncated to 255 bytes at encode time.
    pub message: String,
}

impl StreamOpenErr {
    /// Build an error response from a typed [`ErrorCode`].
    #[must_use]
    pub fn new(request_id: u64, error_code: ErrorCode, message: impl Into<String>) -> Self {
        Self { request_id, error_code: error_code.to_u16(), message: message.into() }
    }

    /// Encode onto `buf`, truncating `message` to 255 bytes.
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u64(self.request_id);
        buf.put_u16(self.error_code);
        let truncated = crate::buffer::truncate_to_u8_len(&self.message);
        #[allow(clippy::expect_used, reason = "truncate_to_u8_len guarantees a fitting length")]
        put_len_u8_string(buf, "stream_open_err.message", truncated).expect("message fits after truncation");
    }

    /// Decode from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] on truncated input.
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        let request_id = reader.read_u64("stream_open_err.request_id")?;
        let error_code = reader.read_u16("stream_open_err.error_code")?;
        let message = reader.read_len_u8_string("stream_open_err.message")?;
        Ok(Self { request_id, error_code, message })
    }
}

/// Abrupt stream reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamReset {
    /// Raw wire error code describing the reset reason.
    pub error_code: u16,
}

impl StreamReset {
    /// Encode onto `buf`.
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u16(self.error_code);
    }

    /// Decode from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] on truncated input.
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        Ok(Self { error_code: reader.read_u16("stream_reset.error_code")? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_id(byte: u8) -> AgentId {
        AgentId::from_bytes([byte; 16])
    }

    #[test]
    fn stream_open_round_trips_and_matches_scenario_b_length() {
        // scenario B
        let open = StreamOpen {
            request_id: 12_345_678,
            addr: Address::Ipv4([10, 0, 0, 1]),
            port: 8080,
            ttl: 15,
            path: vec![sample_id(0xAA), sample_id(0xBB)],
            ephemeral_pub: [0xFF; 32],
        };
        let mut buf = Vec::new();
        open.encode(&mut buf).expect("encode");
        assert_eq!(buf.len(), 8 + 1 + 4 + 2 + 1 + 1 + 32 + 32);
        let mut reader = BufferReader::new(&buf);
        assert_eq!(StreamOpen::decode(&mut reader).expect("decode"), open);
    }

    #[test]
    fn stream_open_ack_round_trips() {
        let ack = StreamOpenAck {
            request_id: 1,
            bound_addr: Address::Domain("relay.mesh".to_owned()),
            bound_port: 443,
            ephemeral_pub: [7; 32],
        };
        let mut buf = Vec::new();
        ack.encode(&mut buf).expect("encode");
        let mut reader = BufferReader::new(&buf);
        assert_eq!(StreamOpenAck::decode(&mut reader).expect("decode"), ack);
    }

    #[test]
    fn stream_open_err_round_trips() {
        let err = StreamOpenErr::new(1, ErrorCode::ConnectionRefused, "refused");
        let mut buf = Vec::new();
        err.encode(&mut buf);
        let mut reader = BufferReader::new(&buf);
        assert_eq!(StreamOpenErr::decode(&mut reader).expect("decode"), err);
    }

    #[test]
    fn stream_open_err_truncates_oversized_message() {
        let err = StreamOpenErr::new(1, ErrorCode::ConnectionRefused, "x".repeat(300));
        let mut buf = Vec::new();
        err.encode(&mut buf);
        let mut reader = BufferReader::new(&buf);
        let decoded = StreamOpenErr::decode(&mut reader).expect("decode");
        assert_eq!(decoded.message.len(), 255);
    }

    #[test]
    fn stream_reset_round_trips() {
        let reset = StreamReset { error_code: ErrorCode::StreamAlreadyClosed.to_u16() };
        let mut buf = Vec::new();
        reset.encode(&mut buf);
        let mut reader = BufferReader::new(&buf);
        assert_eq!(StreamReset::decode(&mut reader).expect("decode"), reset);
    }
}
