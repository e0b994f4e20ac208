//! Handshake, liveness and control-RPC payloads (`spec.md` §3.3, §6.2).

use bytes::BufMut;

use crate::{
    agent_id::AgentId,
    buffer::{put_len_u8_string, truncate_to_u8_len, BufferReader},
    errors::{ProtocolError, Result},
    header::{MAX_PAYLOAD_SIZE, PROTOCOL_VERSION},
};

/// Initial peer handshake, also used verbatim for `PeerHelloAck`
/// (the specification gives no distinct ack layout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerHello {
    /// Protocol version the sender speaks.
    pub version: u16,
    /// Sender's identity.
    pub agent_id: AgentId,
    /// Sender's wall-clock timestamp (unix millis).
    pub timestamp: u64,
    /// Human-readable display name.
    pub display_name: String,
    /// Advertised capability strings.
    pub capabilities: Vec<String>,
}

impl PeerHello {
    /// Build a hello announcing the current protocol version.
    #[must_use]
    pub fn new(agent_id: AgentId, timestamp: u64, display_name: String, capabilities: Vec<String>) -> Self {
        Self { version: PROTOCOL_VERSION, agent_id, timestamp, display_name, capabilities }
    }

    /// Encode onto `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] if `display_name`, a capability
    /// string, or the capability count exceeds its 1-byte length prefix.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        buf.put_u16(self.version);
        buf.put_slice(self.agent_id.as_bytes());
        buf.put_u64(self.timestamp);
        put_len_u8_string(buf, "peer_hello.display_name", &self.display_name)?;
        if self.capabilities.len() > u8::MAX as usize {
            return Err(ProtocolError::invalid(
                "peer_hello.capabilities",
                format!("{} entries exceeds the 1-byte count prefix", self.capabilities.len()),
            ));
        }
        #[allow(clippy::cast_possible_truncation, reason = "length checked above")]
        buf.put_u8(self.capabilities.len() as u8);
        for cap in &self.capabilities {
            put_len_u8_string(buf, "peer_hello.capability", cap)?;
        }
        Ok(())
    }

    /// Decode from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] on truncated input.
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        let version = reader.read_u16("peer_hello.version")?;
        let agent_id = reader.read_agent_id("peer_hello.agent_id")?;
        let timestamp = reader.read_u64("peer_hello.timestamp")?;
        let display_name = reader.read_len_u8_string("peer_hello.display_name")?;
        let cap_count = reader.read_u8("peer_hello.cap_count")? as usize;
        let capabilities = (0..cap_count)
            .map(|_| reader.read_len_u8_string("peer_hello.capability"))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { version, agent_id, timestamp, display_name, capabilities })
    }
}

/// Liveness probe and its acknowledgment share one layout: `timestamp(8)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keepalive {
    /// Sender's wall-clock timestamp (unix millis).
    pub timestamp: u64,
}

impl Keepalive {
    /// Encode onto `buf`.
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u64(self.timestamp);
    }

    /// Decode from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] on truncated input.
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        Ok(Self { timestamp: reader.read_u64("keepalive.timestamp")? })
    }
}

/// Control-plane RPC request/response discriminant (`spec.md` §3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ControlType {
    /// Query agent status.
    Status = 0x02,
    /// Query known peers.
    Peers = 0x03,
    /// Query known routes.
    Routes = 0x04,
    /// Generic RPC call.
    Rpc = 0x05,
    /// Manage routing table entries.
    RouteManage = 0x08,
    /// Manage forward listeners.
    ForwardManage = 0x09,
    /// Browse remote filesystem.
    FileBrowse = 0x0A,
}

impl ControlType {
    /// Raw wire byte.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse the wire byte, `None` if unrecognized.
    #[must_use]
    pub const fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0x02 => Self::Status,
            0x03 => Self::Peers,
            0x04 => Self::Routes,
            0x05 => Self::Rpc,
            0x08 => Self::RouteManage,
            0x09 => Self::ForwardManage,
            0x0A => Self::FileBrowse,
            _ => return None,
        })
    }
}

/// A control-plane RPC request routed toward `target` over `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRequest {
    /// Request correlation id.
    pub request_id: u64,
    /// Which RPC is being invoked.
    pub control_type: ControlType,
    /// Final destination of the request.
    pub target: AgentId,
    /// Remaining hops to traverse to reach `target`.
    pub path: Vec<AgentId>,
    /// Opaque request body.
    pub data: Vec<u8>,
}

impl ControlRequest {
    /// Encode onto `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] if `path` has more than 255
    /// entries.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        buf.put_u64(self.request_id);
        buf.put_u8(self.control_type.to_u8());
        buf.put_slice(self.target.as_bytes());
        if self.path.len() > u8::MAX as usize {
            return Err(ProtocolError::invalid(
                "control_request.path",
                format!("{} hops exceeds the 1-byte length prefix", self.path.len()),
            ));
        }
        #[allow(clippy::cast_possible_truncation, reason = "length checked above")]
        buf.put_u8(self.path.len() as u8);
        for hop in &self.path {
            buf.put_slice(hop.as_bytes());
        }
        #[allow(clippy::cast_possible_truncation, reason = "data is bounded by MAX_PAYLOAD_SIZE")]
        buf.put_u32(self.data.len() as u32);
        buf.put_slice(&self.data);
        Ok(())
    }

    /// Decode from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] on truncated input or an
    /// unrecognized `control_type` byte.
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        let request_id = reader.read_u64("control_request.request_id")?;
        let type_byte = reader.read_u8("control_request.control_type")?;
        let control_type = ControlType::from_u8(type_byte).ok_or_else(|| {
            ProtocolError::invalid("control_request.control_type", format!("unknown control type {type_byte:#04x}"))
        })?;
        let target = reader.read_agent_id("control_request.target")?;
        let path = reader.read_agent_id_list("control_request.path")?;
        let data = reader.read_len_u32_bytes("control_request.data")?.to_vec();
        Ok(Self { request_id, control_type, target, path, data })
    }
}

/// A control-plane RPC response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlResponse {
    /// Request correlation id this responds to.
    pub request_id: u64,
    /// Which RPC this is a response to.
    pub control_type: ControlType,
    /// Whether the RPC succeeded.
    pub success: bool,
    /// Opaque response body, truncated to fit `MaxPayloadSize` at encode time.
    pub data: Vec<u8>,
}

impl ControlResponse {
    /// Encode onto `buf`, truncating `data` so the payload fits within
    /// [`MAX_PAYLOAD_SIZE`].
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u64(self.request_id);
        buf.put_u8(self.control_type.to_u8());
        buf.put_u8(u8::from(self.success));
        const FIXED_HEADER: usize = 8 + 1 + 1 + 2;
        let budget = MAX_PAYLOAD_SIZE.saturating_sub(FIXED_HEADER).min(u16::MAX as usize);
        let data = if self.data.len() > budget { &self.data[..budget] } else { &self.data[..] };
        #[allow(clippy::cast_possible_truncation, reason = "data truncated to budget above")]
        buf.put_u16(data.len() as u16);
        buf.put_slice(data);
    }

    /// Decode from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] on truncated input or an
    /// unrecognized `control_type` byte.
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        let request_id = reader.read_u64("control_response.request_id")?;
        let type_byte = reader.read_u8("control_response.control_type")?;
        let control_type = ControlType::from_u8(type_byte).ok_or_else(|| {
            ProtocolError::invalid("control_response.control_type", format!("unknown control type {type_byte:#04x}"))
        })?;
        let success = reader.read_u8("control_response.success")? != 0;
        let data = reader.read_len_u16_bytes("control_response.data")?.to_vec();
        Ok(Self { request_id, control_type, success, data })
    }
}

/// Truncate an error message to fit the 1-byte length prefix used by
/// `StreamOpenErr`/`UDPOpenErr`/`ICMPOpenErr`.
#[must_use]
pub fn truncate_error_message(message: &str) -> &str {
    truncate_to_u8_len(message)
}
