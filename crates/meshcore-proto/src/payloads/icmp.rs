//! ICMP-family payloads (`spec.md` §3.3, §6.2).
//!
//! `ICMPOpen` carries its destination as a plain length-prefixed string
//! (`ip_len(1) | ip(var)`), unlike `StreamOpen`/`UDPOpen` which use the
//! [`crate::addr::Address`] type-tagged encoding — there is no leading
//! address-type byte here. `ICMPOpenErr` is structurally identical to
//! `StreamOpenErr`/`UDPOpenErr` and reuses that type. `ICMPClose` carries no
//! fields, like `StreamClose`.

use bytes::BufMut;

use crate::{
    agent_id::AgentId,
    buffer::BufferReader,
    errors::{ProtocolError, Result},
};

pub use crate::payloads::stream::StreamOpenErr as IcmpOpenErr;

/// Maximum ICMP echo payload (`spec.md` §6.2).
pub const MAX_ECHO_DATA_SIZE: usize = 1472;

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

/// Request to open an ICMP session to `ip`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpOpen {
    /// Request correlation id.
    pub request_id: u64,
    /// Destination IP, as a plain length-prefixed string (not an [`crate::addr::Address`]).
    pub ip: String,
    /// Remaining hop budget.
    pub ttl: u8,
    /// Remaining path to traverse.
    pub path: Vec<AgentId>,
    /// Initiator's ephemeral X25519 public key.
    pub ephemeral_pub: [u8; 32],
}

impl IcmpOpen {
    /// Encode onto `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] if `ip` or `path` exceed their
    /// 1-byte length prefixes.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        buf.put_u64(self.request_id);
        crate::buffer::put_len_u8_string(buf, "icmp_open.ip", &self.ip)?;
        buf.put_u8(self.ttl);
        encode_path(buf, &self.path, "icmp_open.path")?;
        buf.put_slice(&self.ephemeral_pub);
        Ok(())
    }

    /// Decode from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] on truncated input.
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        let request_id = reader.read_u64("icmp_open.request_id")?;
        let ip = reader.read_len_u8_string("icmp_open.ip")?;
        let ttl = reader.read_u8("icmp_open.ttl")?;
        let path = reader.read_agent_id_list("icmp_open.path")?;
        let ephemeral_pub = reader.read_array::<32>("icmp_open.ephemeral_pub")?;
        Ok(Self { request_id, ip, ttl, path, ephemeral_pub })
    }
}

/// Acknowledgment of a successful [`IcmpOpen`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpOpenAck {
    /// Request correlation id this acknowledges.
    pub request_id: u64,
    /// IP the destination bound to, as a plain length-prefixed string.
    pub bound_ip: String,
    /// Responder's ephemeral X25519 public key.
    pub ephemeral_pub: [u8; 32],
}

impl IcmpOpenAck {
    /// Encode onto `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] if `bound_ip` exceeds its
    /// 1-byte length prefix.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        buf.put_u64(self.request_id);
        crate::buffer::put_len_u8_string(buf, "icmp_open_ack.bound_ip", &self.bound_ip)?;
        buf.put_slice(&self.ephemeral_pub);
        Ok(())
    }

    /// Decode from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] on truncated input.
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        let request_id = reader.read_u64("icmp_open_ack.request_id")?;
        let bound_ip = reader.read_len_u8_string("icmp_open_ack.bound_ip")?;
        let ephemeral_pub = reader.read_array::<32>("icmp_open_ack.ephemeral_pub")?;
        Ok(Self { request_id, bound_ip, ephemeral_pub })
    }
}

/// An ICMP echo request or reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpEcho {
    /// Echo identifier, matching the ICMP header field.
    pub identifier: u16,
    /// Echo sequence number.
    pub sequence: u16,
    /// Whether this is a reply (`true`) or request (`false`).
    pub is_reply: bool,
    /// Echo payload, at most [`MAX_ECHO_DATA_SIZE`] bytes.
    pub data: Vec<u8>,
}

impl IcmpEcho {
    /// Encode onto `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] if `data` exceeds
    /// [`MAX_ECHO_DATA_SIZE`].
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        if self.data.len() > MAX_ECHO_DATA_SIZE {
            return Err(ProtocolError::invalid(
                "icmp_echo.data",
                format!("{} bytes exceeds the {MAX_ECHO_DATA_SIZE}-byte echo limit", self.data.len()),
            ));
        }
        buf.put_u16(self.identifier);
        buf.put_u16(self.sequence);
        buf.put_u8(u8::from(self.is_reply));
        #[allow(clippy::cast_possible_truncation, reason = "length checked above")]
        buf.put_u16(self.data.len() as u16);
        buf.put_slice(&self.data);
        Ok(())
    }

    /// Decode from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] on truncated input.
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        let identifier = reader.read_u16("icmp_echo.identifier")?;
        let sequence = reader.read_u16("icmp_echo.sequence")?;
        let is_reply = reader.read_u8("icmp_echo.is_reply")? != 0;
        let data = reader.read_len_u16_bytes("icmp_echo.data")?.to_vec();
        Ok(Self { identifier, sequence, is_reply, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_id(byte: u8) -> AgentId {
        AgentId::from_bytes([byte; 16])
    }

    #[test]
    fn icmp_open_round_trips() {
        let open = IcmpOpen {
            request_id: 9,
            ip: "8.8.8.8".to_owned(),
            ttl: 10,
            path: vec![sample_id(1)],
            ephemeral_pub: [1; 32],
        };
        let mut buf = Vec::new();
        open.encode(&mut buf).expect("encode");
        let mut reader = BufferReader::new(&buf);
        assert_eq!(IcmpOpen::decode(&mut reader).expect("decode"), open);
    }

    #[test]
    fn icmp_open_ack_round_trips() {
        let ack = IcmpOpenAck { request_id: 9, bound_ip: "8.8.8.8".to_owned(), ephemeral_pub: [2; 32] };
        let mut buf = Vec::new();
        ack.encode(&mut buf).expect("encode");
        let mut reader = BufferReader::new(&buf);
        assert_eq!(IcmpOpenAck::decode(&mut reader).expect("decode"), ack);
    }

    #[test]
    fn icmp_echo_round_trips() {
        let echo = IcmpEcho { identifier: 1, sequence: 2, is_reply: true, data: vec![0xAB; 4] };
        let mut buf = Vec::new();
        echo.encode(&mut buf).expect("encode");
        let mut reader = BufferReader::new(&buf);
        assert_eq!(IcmpEcho::decode(&mut reader).expect("decode"), echo);
    }

    #[test]
    fn icmp_echo_rejects_oversized_payload() {
        let echo = IcmpEcho { identifier: 0, sequence: 0, is_reply: false, data: vec![0u8; MAX_ECHO_DATA_SIZE + 1] };
        let mut buf = Vec::new();
        assert!(echo.encode(&mut buf).is_err());
    }
}
