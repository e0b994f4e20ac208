//! Routing and node-info payloads (`spec.md` §3.3, §4.2, §6.2).

use bytes::BufMut;

use crate::{
    agent_id::AgentId,
    buffer::{put_len_u8_string, BufferReader},
    errors::{ProtocolError, Result},
};

/// Maximum peer-connection entries kept in a [`NodeInfo`] (`spec.md` §3.3).
pub const MAX_PEERS: usize = 50;
/// Maximum forward-listener entries kept in a [`NodeInfo`] (`spec.md` §3.3).
pub const MAX_LISTENERS: usize = 20;

/// Route-prefix address family.
///
/// Distinct from [`crate::addr::AddressType`]: the two enumerations share a
/// domain but assign different numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AddressFamily {
    /// 4-byte IPv4 prefix.
    Ipv4 = 0x01,
    /// 16-byte IPv6 prefix.
    Ipv6 = 0x02,
    /// Length-prefixed domain prefix.
    Domain = 0x03,
    /// Routing-key-addressed forward prefix.
    Forward = 0x04,
    /// `AgentID`-addressed presence prefix.
    Agent = 0x05,
}

impl AddressFamily {
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
            0x02 => Self::Ipv6,
            0x03 => Self::Domain,
            0x04 => Self::Forward,
            0x05 => Self::Agent,
            _ => return None,
        })
    }
}

/// Encode a domain-name prefix (`1 + domain_len` bytes).
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidFrame`] if `domain` exceeds 255 bytes.
pub fn encode_domain_prefix(buf: &mut impl BufMut, domain: &str) -> Result<()> {
    put_len_u8_string(buf, "route.prefix.domain", domain)
}

/// Decode a domain-name prefix.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidFrame`] on truncated input.
pub fn decode_domain_prefix(reader: &mut BufferReader<'_>) -> Result<String> {
    reader.read_len_u8_string("route.prefix.domain")
}

/// Encode a forward routing key alone (`1 + key_len` bytes).
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidFrame`] if `key` exceeds 255 bytes.
pub fn encode_forward_key(buf: &mut impl BufMut, key: &str) -> Result<()> {
    put_len_u8_string(buf, "route.prefix.forward_key", key)
}

/// Encode a forward prefix's routing key and target address
/// (`1 + key_len + 1 + target_len` bytes).
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidFrame`] if `key` or `target` exceed 255
/// bytes.
pub fn encode_forward_key_with_target(buf: &mut impl BufMut, key: &str, target: &str) -> Result<()> {
    encode_forward_key(buf, key)?;
    put_len_u8_string(buf, "route.prefix.forward_target", target)
}

/// Decode a forward prefix's routing key and target address.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidFrame`] on truncated input.
pub fn decode_forward_key_and_target(reader: &mut BufferReader<'_>) -> Result<(String, String)> {
    let key = reader.read_len_u8_string("route.prefix.forward_key")?;
    let target = reader.read_len_u8_string("route.prefix.forward_target")?;
    Ok((key, target))
}

/// Encode an agent presence prefix (16 bytes).
pub fn encode_agent_prefix(buf: &mut impl BufMut, agent: AgentId) {
    buf.put_slice(agent.as_bytes());
}

/// Decode an agent presence prefix.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidFrame`] on truncated input.
pub fn decode_agent_prefix(reader: &mut BufferReader<'_>) -> Result<AgentId> {
    reader.read_agent_id("route.prefix.agent")
}

/// The family-specific payload of a [`Route`]'s prefix field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePrefix {
    /// 4-byte IPv4 prefix.
    Ipv4([u8; 4]),
    /// 16-byte IPv6 prefix.
    Ipv6([u8; 16]),
    /// Length-prefixed domain name.
    Domain(String),
    /// Routing key plus target address.
    Forward {
        /// Opaque routing key identifying the forward listener.
        key: String,
        /// Target address the listener forwards to.
        target: String,
    },
    /// An `AgentID` used as a presence prefix.
    Agent(AgentId),
}

impl RoutePrefix {
    /// The [`AddressFamily`] discriminant for this prefix.
    #[must_use]
    pub const fn family(&self) -> AddressFamily {
        match self {
            Self::Ipv4(_) => AddressFamily::Ipv4,
            Self::Ipv6(_) => AddressFamily::Ipv6,
            Self::Domain(_) => AddressFamily::Domain,
            Self::Forward { .. } => AddressFamily::Forward,
            Self::Agent(_) => AddressFamily::Agent,
        }
    }

    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        match self {
            Self::Ipv4(octets) => buf.put_slice(octets),
            Self::Ipv6(octets) => buf.put_slice(octets),
            Self::Domain(domain) => encode_domain_prefix(buf, domain)?,
            Self::Forward { key, target } => encode_forward_key_with_target(buf, key, target)?,
            Self::Agent(agent) => encode_agent_prefix(buf, *agent),
        }
        Ok(())
    }

    fn decode(family: AddressFamily, reader: &mut BufferReader<'_>) -> Result<Self> {
        Ok(match family {
            AddressFamily::Ipv4 => Self::Ipv4(reader.read_array::<4>("route.prefix.ipv4")?),
            AddressFamily::Ipv6 => Self::Ipv6(reader.read_array::<16>("route.prefix.ipv6")?),
            AddressFamily::Domain => Self::Domain(decode_domain_prefix(reader)?),
            AddressFamily::Forward => {
                let (key, target) = decode_forward_key_and_target(reader)?;
                Self::Forward { key, target }
            },
            AddressFamily::Agent => Self::Agent(decode_agent_prefix(reader)?),
        })
    }
}

/// A single advertised or withdrawn route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Declared prefix length (e.g. CIDR significant-bit count).
    pub prefix_len: u8,
    /// Family-specific prefix payload.
    pub prefix: RoutePrefix,
    /// Route metric (lower is preferred).
    pub metric: u16,
}

impl Route {
    /// Encode onto `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] if a variable-length prefix
    /// field exceeds its 1-byte length prefix.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        buf.put_u8(self.prefix.family().to_u8());
        buf.put_u8(self.prefix_len);
        self.prefix.encode(buf)?;
        buf.put_u16(self.metric);
        Ok(())
    }

    /// Decode from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownAddressFamily`] for an unrecognized
    /// family byte, or [`ProtocolError::InvalidFrame`] on truncation.
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        let family_byte = reader.read_u8("route.family")?;
        let family = AddressFamily::from_u8(family_byte).ok_or(ProtocolError::UnknownAddressFamily(family_byte))?;
        let prefix_len = reader.read_u8("route.prefix_len")?;
        let prefix = RoutePrefix::decode(family, reader)?;
        let metric = reader.read_u16("route.metric")?;
        Ok(Self { prefix_len, prefix, metric })
    }
}

fn encode_route_list(buf: &mut impl BufMut, routes: &[Route]) -> Result<()> {
    if routes.len() > u8::MAX as usize {
        return Err(ProtocolError::invalid(
            "route_list",
            format!("{} routes exceeds the 1-byte count prefix", routes.len()),
        ));
    }
    #[allow(clippy::cast_possible_truncation, reason = "length checked above")]
    buf.put_u8(routes.len() as u8);
    for route in routes {
        route.encode(buf)?;
    }
    Ok(())
}

fn decode_route_list(reader: &mut BufferReader<'_>) -> Result<Vec<Route>> {
    let count = reader.read_u8("route_list.count")? as usize;
    (0..count).map(|_| Route::decode(reader)).collect()
}

/// An envelope carrying either plaintext or an opaque sealed blob.
///
/// The codec never interprets encrypted contents; sealing/opening is
/// performed by an external trust module (`spec.md` §4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    encrypted: bool,
    data: Vec<u8>,
}

impl EncryptedData {
    /// Wrap plaintext bytes (already encoded with the inner structure's
    /// layout).
    #[must_use]
    pub fn plaintext(data: Vec<u8>) -> Self {
        Self { encrypted: false, data }
    }

    /// Wrap an opaque sealed blob produced by an external crypto module.
    #[must_use]
    pub fn sealed(data: Vec<u8>) -> Self {
        Self { encrypted: true, data }
    }

    /// Whether the wrapped bytes are a sealed blob.
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// The wrapped bytes: plaintext inner-structure bytes, or an opaque
    /// sealed blob when [`Self::is_encrypted`].
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Encode onto `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] if the wrapped bytes exceed
    /// 65535 bytes.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        if self.data.len() > u16::MAX as usize {
            return Err(ProtocolError::invalid(
                "encrypted_data.data_len",
                format!("{} bytes exceeds the 2-byte length prefix", self.data.len()),
            ));
        }
        buf.put_u8(u8::from(self.encrypted));
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
        let encrypted = reader.read_u8("encrypted_data.flag")? != 0;
        let data = reader.read_len_u16_bytes("encrypted_data.data")?.to_vec();
        Ok(Self { encrypted, data })
    }
}

/// Encode a path (`pathLen(1) | path(16×)`), the same layout `SeenBy` uses.
fn encode_agent_id_list(buf: &mut impl BufMut, field: &'static str, ids: &[AgentId]) -> Result<()> {
    if ids.len() > u8::MAX as usize {
        return Err(ProtocolError::invalid(field, format!("{} entries exceeds the 1-byte length prefix", ids.len())));
    }
    #[allow(clippy::cast_possible_truncation, reason = "length checked above")]
    buf.put_u8(ids.len() as u8);
    for id in ids {
        buf.put_slice(id.as_bytes());
    }
    Ok(())
}

fn encode_seen_by(buf: &mut impl BufMut, seen_by: &[AgentId]) -> Result<()> {
    if seen_by.len() > u8::MAX as usize {
        return Err(ProtocolError::invalid(
            "seen_by",
            format!("{} entries exceeds the 1-byte length prefix", seen_by.len()),
        ));
    }
    #[allow(clippy::cast_possible_truncation, reason = "length checked above")]
    buf.put_u8(seen_by.len() as u8);
    for id in seen_by {
        buf.put_slice(id.as_bytes());
    }
    Ok(())
}

/// `EncryptedData`'s decoded plaintext view of a forwarding path, `None` when
/// sealed or when the plaintext bytes don't parse as a path (`spec.md` §4.2).
fn decode_path_plaintext(wrapper: &EncryptedData) -> Option<Vec<AgentId>> {
    if wrapper.is_encrypted() {
        return None;
    }
    BufferReader::new(wrapper.data()).read_agent_id_list("route_advertise.decoded_path").ok()
}

/// `EncryptedData`'s decoded plaintext view of a `NodeInfo` body, `None` when
/// sealed or when the plaintext bytes don't parse as a `NodeInfo`
/// (`spec.md` §4.2, Testable Property 7).
fn decode_node_info_plaintext(wrapper: &EncryptedData) -> Option<NodeInfo> {
    if wrapper.is_encrypted() {
        return None;
    }
    NodeInfo::decode(&mut BufferReader::new(wrapper.data())).ok()
}

/// A route advertisement, gossiped with loop-prevention and an opaque,
/// possibly-encrypted forwarding path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteAdvertise {
    /// Originating agent.
    pub origin: AgentId,
    /// Origin's human-readable display name.
    pub display_name: String,
    /// Monotonic per-origin sequence number.
    pub sequence: u64,
    /// Advertised routes.
    pub routes: Vec<Route>,
    /// Forwarding path, plaintext or sealed.
    pub path: EncryptedData,
    /// `path` decoded into the agent hops it names, when `path` carries
    /// plaintext. `None` when `path` is sealed: the codec never attempts to
    /// decrypt it (`spec.md` §4.2, Testable Property 7).
    pub decoded_path: Option<Vec<AgentId>>,
    /// Loop-prevention list of agents this advertisement has traversed.
    pub seen_by: Vec<AgentId>,
}

impl RouteAdvertise {
    /// Encode onto `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] if any variable-length field
    /// exceeds its length prefix.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        buf.put_slice(self.origin.as_bytes());
        put_len_u8_string(buf, "route_advertise.display_name", &self.display_name)?;
        buf.put_u64(self.sequence);
        encode_route_list(buf, &self.routes)?;
        self.path.encode(buf)?;
        encode_seen_by(buf, &self.seen_by)?;
        Ok(())
    }

    /// Decode from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`]/[`ProtocolError::UnknownAddressFamily`]
    /// propagated from route decoding, or on truncated input.
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        let origin = reader.read_agent_id("route_advertise.origin")?;
        let display_name = reader.read_len_u8_string("route_advertise.display_name")?;
        let sequence = reader.read_u64("route_advertise.sequence")?;
        let routes = decode_route_list(reader)?;
        let path = EncryptedData::decode(reader)?;
        let decoded_path = decode_path_plaintext(&path);
        let seen_by = reader.read_agent_id_list("route_advertise.seen_by")?;
        Ok(Self { origin, display_name, sequence, routes, path, decoded_path, seen_by })
    }
}

/// Withdrawal of previously advertised routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteWithdraw {
    /// Originating agent.
    pub origin: AgentId,
    /// Monotonic per-origin sequence number.
    pub sequence: u64,
    /// Withdrawn routes.
    pub routes: Vec<Route>,
    /// Loop-prevention list of agents this withdrawal has traversed.
    pub seen_by: Vec<AgentId>,
}

impl RouteWithdraw {
    /// Encode onto `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] if any variable-length field
    /// exceeds its length prefix.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        buf.put_slice(self.origin.as_bytes());
        buf.put_u64(self.sequence);
        encode_route_list(buf, &self.routes)?;
        encode_seen_by(buf, &self.seen_by)?;
        Ok(())
    }

    /// Decode from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`]/[`ProtocolError::UnknownAddressFamily`]
    /// propagated from route decoding, or on truncated input.
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        let origin = reader.read_agent_id("route_withdraw.origin")?;
        let sequence = reader.read_u64("route_withdraw.sequence")?;
        let routes = decode_route_list(reader)?;
        let seen_by = reader.read_agent_id_list("route_withdraw.seen_by")?;
        Ok(Self { origin, sequence, routes, seen_by })
    }
}

/// A peer connection reported inside a [`NodeInfo`] body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfoPeer {
    /// Peer's identity.
    pub peer_id: AgentId,
    /// Transport the connection uses (e.g. `"tcp"`, `"quic"`).
    pub transport: String,
    /// Measured round-trip time, in milliseconds.
    pub rtt_ms: u64,
    /// Whether this node dialed the peer (`true`) or accepted it (`false`).
    pub is_dialer: bool,
}

/// A forward listener reported inside a [`NodeInfo`] body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardListener {
    /// Opaque routing key clients use to reach this listener.
    pub key: String,
    /// Listener's bound address.
    pub address: String,
}

/// The plaintext body wrapped by a [`NodeInfoAdvertise`]'s [`EncryptedData`].
///
/// `udp_enabled` and `listeners` are optional trailing fields for backward
/// compatibility: a buffer that ends right after `public_key` decodes with
/// `udp_enabled = false` and `listeners = []` rather than an error
/// (`spec.md` §6.2, §9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// Human-readable display name.
    pub display_name: String,
    /// Reported hostname.
    pub hostname: String,
    /// Reported operating system.
    pub os: String,
    /// Reported CPU architecture.
    pub arch: String,
    /// Reported agent software version.
    pub version: String,
    /// Process start time (unix millis).
    pub start_time: u64,
    /// Locally bound IP addresses.
    pub ips: Vec<String>,
    /// Active peer connections, truncated to [`MAX_PEERS`] at encode time.
    pub peers: Vec<NodeInfoPeer>,
    /// 32-byte static public key.
    pub public_key: [u8; 32],
    /// Whether this node accepts UDP forwarding.
    pub udp_enabled: bool,
    /// Active forward listeners, truncated to [`MAX_LISTENERS`] at encode
    /// time.
    pub listeners: Vec<ForwardListener>,
}

impl NodeInfo {
    /// Encode onto `buf`, truncating `peers` to [`MAX_PEERS`] and `listeners`
    /// to [`MAX_LISTENERS`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] if a string field or the `ips`
    /// count exceeds a 1-byte length prefix.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        put_len_u8_string(buf, "node_info.display_name", &self.display_name)?;
        put_len_u8_string(buf, "node_info.hostname", &self.hostname)?;
        put_len_u8_string(buf, "node_info.os", &self.os)?;
        put_len_u8_string(buf, "node_info.arch", &self.arch)?;
        put_len_u8_string(buf, "node_info.version", &self.version)?;
        buf.put_u64(self.start_time);

        if self.ips.len() > u8::MAX as usize {
            return Err(ProtocolError::invalid(
                "node_info.ips",
                format!("{} entries exceeds the 1-byte count prefix", self.ips.len()),
            ));
        }
        #[allow(clippy::cast_possible_truncation, reason = "length checked above")]
        buf.put_u8(self.ips.len() as u8);
        for ip in &self.ips {
            put_len_u8_string(buf, "node_info.ip", ip)?;
        }

        let peers = if self.peers.len() > MAX_PEERS { &self.peers[..MAX_PEERS] } else { &self.peers[..] };
        #[allow(clippy::cast_possible_truncation, reason = "truncated to MAX_PEERS above")]
        buf.put_u8(peers.len() as u8);
        for peer in peers {
            buf.put_slice(peer.peer_id.as_bytes());
            put_len_u8_string(buf, "node_info.peer.transport", &peer.transport)?;
            buf.put_u64(peer.rtt_ms);
            buf.put_u8(u8::from(peer.is_dialer));
        }

        buf.put_slice(&self.public_key);
        buf.put_u8(u8::from(self.udp_enabled));

        let listeners = if self.listeners.len() > MAX_LISTENERS {
            &self.listeners[..MAX_LISTENERS]
        } else {
            &self.listeners[..]
        };
        #[allow(clippy::cast_possible_truncation, reason = "truncated to MAX_LISTENERS above")]
        buf.put_u8(listeners.len() as u8);
        for listener in listeners {
            put_len_u8_string(buf, "node_info.listener.key", &listener.key)?;
            put_len_u8_string(buf, "node_info.listener.address", &listener.address)?;
        }
        Ok(())
    }

    /// Decode from `reader`, defaulting `udp_enabled`/`listeners` if the
    /// buffer ends early.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] on truncation within the
    /// mandatory prefix (through `public_key`).
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        let display_name = reader.read_len_u8_string("node_info.display_name")?;
        let hostname = reader.read_len_u8_string("node_info.hostname")?;
        let os = reader.read_len_u8_string("node_info.os")?;
        let arch = reader.read_len_u8_string("node_info.arch")?;
        let version = reader.read_len_u8_string("node_info.version")?;
        let start_time = reader.read_u64("node_info.start_time")?;

        let ip_count = reader.read_u8("node_info.ip_count")? as usize;
        let ips = (0..ip_count)
            .map(|_| reader.read_len_u8_string("node_info.ip"))
            .collect::<Result<Vec<_>>>()?;

        let peer_count = reader.read_u8("node_info.peer_count")? as usize;
        let peers = (0..peer_count)
            .map(|_| -> Result<NodeInfoPeer> {
                let peer_id = reader.read_agent_id("node_info.peer.peer_id")?;
                let transport = reader.read_len_u8_string("node_info.peer.transport")?;
                let rtt_ms = reader.read_u64("node_info.peer.rtt_ms")?;
                let is_dialer = reader.read_u8("node_info.peer.is_dialer")? != 0;
                Ok(NodeInfoPeer { peer_id, transport, rtt_ms, is_dialer })
            })
            .collect::<Result<Vec<_>>>()?;

        let public_key = reader.read_array::<32>("node_info.public_key")?;

        if reader.is_empty() {
            return Ok(Self {
                display_name,
                hostname,
                os,
                arch,
                version,
                start_time,
                ips,
                peers,
                public_key,
                udp_enabled: false,
                listeners: Vec::new(),
            });
        }
        let udp_enabled = reader.read_u8("node_info.udp_enabled")? != 0;

        if reader.is_empty() {
            return Ok(Self {
                display_name,
                hostname,
                os,
                arch,
                version,
                start_time,
                ips,
                peers,
                public_key,
                udp_enabled,
                listeners: Vec::new(),
            });
        }
        let listener_count = reader.read_u8("node_info.listener_count")? as usize;
        let listeners = (0..listener_count)
            .map(|_| -> Result<ForwardListener> {
                let key = reader.read_len_u8_string("node_info.listener.key")?;
                let address = reader.read_len_u8_string("node_info.listener.address")?;
                Ok(ForwardListener { key, address })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            display_name,
            hostname,
            os,
            arch,
            version,
            start_time,
            ips,
            peers,
            public_key,
            udp_enabled,
            listeners,
        })
    }
}

/// A node-info advertisement, gossiped with loop-prevention over an opaque,
/// possibly-encrypted [`NodeInfo`] body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfoAdvertise {
    /// Originating agent.
    pub origin: AgentId,
    /// Monotonic per-origin sequence number.
    pub sequence: u64,
    /// The wrapped `NodeInfo` body, plaintext or sealed.
    pub info: EncryptedData,
    /// `info` decoded into a [`NodeInfo`], when `info` carries plaintext.
    /// `None` when `info` is sealed: the codec never attempts to decrypt it
    /// (`spec.md` §4.2, Testable Property 7).
    pub decoded_info: Option<NodeInfo>,
    /// Loop-prevention list of agents this advertisement has traversed.
    pub seen_by: Vec<AgentId>,
}

impl NodeInfoAdvertise {
    /// Encode onto `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] if `seen_by` exceeds its
    /// 1-byte length prefix.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        buf.put_slice(self.origin.as_bytes());
        buf.put_u64(self.sequence);
        self.info.encode(buf)?;
        encode_seen_by(buf, &self.seen_by)?;
        Ok(())
    }

    /// Decode from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] on truncated input.
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        let origin = reader.read_agent_id("node_info_advertise.origin")?;
        let sequence = reader.read_u64("node_info_advertise.sequence")?;
        let info = EncryptedData::decode(reader)?;
        let decoded_info = decode_node_info_plaintext(&info);
        let seen_by = reader.read_agent_id_list("node_info_advertise.seen_by")?;
        Ok(Self { origin, sequence, info, decoded_info, seen_by })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_id(byte: u8) -> AgentId {
        AgentId::from_bytes([byte; 16])
    }

    fn sample_route(prefix: RoutePrefix) -> Route {
        Route { prefix_len: 24, prefix, metric: 10 }
    }

    #[test]
    fn route_round_trips_for_every_family() {
        let routes = [
            sample_route(RoutePrefix::Ipv4([192, 168, 0, 0])),
            sample_route(RoutePrefix::Ipv6([0xAB; 16])),
            sample_route(RoutePrefix::Domain("mesh.internal".to_owned())),
            sample_route(RoutePrefix::Forward { key: "k1".to_owned(), target: "10.0.0.5:443".to_owned() }),
            sample_route(RoutePrefix::Agent(sample_id(9))),
        ];
        for route in routes {
            let mut buf = Vec::new();
            route.encode(&mut buf).expect("encode");
            let mut reader = BufferReader::new(&buf);
            assert_eq!(Route::decode(&mut reader).expect("decode"), route);
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn unknown_family_is_rejected() {
        let bytes = [0x09u8, 0, 0, 0];
        let mut reader = BufferReader::new(&bytes);
        assert_eq!(Route::decode(&mut reader), Err(ProtocolError::UnknownAddressFamily(0x09)));
    }

    #[test]
    fn route_advertise_round_trips() {
        let adv = RouteAdvertise {
            origin: sample_id(1),
            display_name: "node-a".to_owned(),
            sequence: 42,
            routes: vec![sample_route(RoutePrefix::Ipv4([10, 0, 0, 0]))],
            path: EncryptedData::plaintext(vec![1, 2, 3]),
            decoded_path: None,
            seen_by: vec![sample_id(2)],
        };
        let mut buf = Vec::new();
        adv.encode(&mut buf).expect("encode");
        let mut reader = BufferReader::new(&buf);
        assert_eq!(RouteAdvertise::decode(&mut reader).expect("decode"), adv);
    }

    #[test]
    fn route_advertise_decodes_plaintext_path() {
        let mut path_bytes = Vec::new();
        encode_agent_id_list(&mut path_bytes, "test.path", &[sample_id(7), sample_id(8)]).expect("encode path");
        let adv = RouteAdvertise {
            origin: sample_id(1),
            display_name: "node-a".to_owned(),
            sequence: 1,
            routes: vec![],
            path: EncryptedData::plaintext(path_bytes),
            decoded_path: None,
            seen_by: vec![],
        };
        let mut buf = Vec::new();
        adv.encode(&mut buf).expect("encode");
        let mut reader = BufferReader::new(&buf);
        let decoded = RouteAdvertise::decode(&mut reader).expect("decode");
        assert_eq!(decoded.decoded_path, Some(vec![sample_id(7), sample_id(8)]));
    }

    #[test]
    fn route_advertise_leaves_decoded_path_empty_when_sealed() {
        let adv = RouteAdvertise {
            origin: sample_id(1),
            display_name: "node-a".to_owned(),
            sequence: 1,
            routes: vec![],
            path: EncryptedData::sealed(vec![0xDE, 0xAD, 0xBE, 0xEF]),
            decoded_path: None,
            seen_by: vec![],
        };
        let mut buf = Vec::new();
        adv.encode(&mut buf).expect("encode");
        let mut reader = BufferReader::new(&buf);
        let decoded = RouteAdvertise::decode(&mut reader).expect("decode");
        assert!(decoded.path.is_encrypted());
        assert!(decoded.decoded_path.is_none());
    }

    #[test]
    fn encrypted_data_round_trips_and_stays_opaque() {
        let sealed = EncryptedData::sealed(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        let mut buf = Vec::new();
        sealed.encode(&mut buf).expect("encode");
        let mut reader = BufferReader::new(&buf);
        let decoded = EncryptedData::decode(&mut reader).expect("decode");
        assert!(decoded.is_encrypted());
        assert_eq!(decoded.data(), &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    fn sample_node_info() -> NodeInfo {
        NodeInfo {
            display_name: "agent".to_owned(),
            hostname: "host".to_owned(),
            os: "linux".to_owned(),
            arch: "x86_64".to_owned(),
            version: "0.1.0".to_owned(),
            start_time: 1_700_000_000,
            ips: vec!["10.0.0.1".to_owned()],
            peers: vec![NodeInfoPeer {
                peer_id: sample_id(3),
                transport: "tcp".to_owned(),
                rtt_ms: 12,
                is_dialer: true,
            }],
            public_key: [7; 32],
            udp_enabled: true,
            listeners: vec![ForwardListener { key: "k".to_owned(), address: "1.2.3.4:80".to_owned() }],
        }
    }

    #[test]
    fn node_info_round_trips() {
        let info = sample_node_info();
        let mut buf = Vec::new();
        info.encode(&mut buf).expect("encode");
        let mut reader = BufferReader::new(&buf);
        assert_eq!(NodeInfo::decode(&mut reader).expect("decode"), info);
    }

    #[test]
    fn node_info_backward_compat_truncated_after_public_key() {
        let info = sample_node_info();
        let mut buf = Vec::new();
        info.encode(&mut buf).expect("encode");
        // Truncate right after public_key (drop udp_enabled + listeners).
        let cut = buf.len() - 1 - 1 - (1 + "k".len() + 1 + "1.2.3.4:80".len());
        buf.truncate(cut);
        let mut reader = BufferReader::new(&buf);
        let decoded = NodeInfo::decode(&mut reader).expect("decode");
        assert!(!decoded.udp_enabled);
        assert!(decoded.listeners.is_empty());
    }

    #[test]
    fn node_info_truncates_peers_and_listeners_at_encode() {
        let mut info = sample_node_info();
        info.peers = (0..MAX_PEERS + 5)
            .map(|i| NodeInfoPeer {
                peer_id: sample_id(i as u8),
                transport: "tcp".to_owned(),
                rtt_ms: 1,
                is_dialer: false,
            })
            .collect();
        info.listeners = (0..MAX_LISTENERS + 5)
            .map(|i| ForwardListener { key: format!("k{i}"), address: "0.0.0.0:0".to_owned() })
            .collect();
        let mut buf = Vec::new();
        info.encode(&mut buf).expect("encode");
        let mut reader = BufferReader::new(&buf);
        let decoded = NodeInfo::decode(&mut reader).expect("decode");
        assert_eq!(decoded.peers.len(), MAX_PEERS);
        assert_eq!(decoded.listeners.len(), MAX_LISTENERS);
    }

    #[test]
    fn node_info_advertise_round_trips() {
        let adv = NodeInfoAdvertise {
            origin: sample_id(5),
            sequence: 7,
            info: EncryptedData::plaintext(vec![1, 2, 3, 4]),
            decoded_info: None,
            seen_by: vec![sample_id(6)],
        };
        let mut buf = Vec::new();
        adv.encode(&mut buf).expect("encode");
        let mut reader = BufferReader::new(&buf);
        assert_eq!(NodeInfoAdvertise::decode(&mut reader).expect("decode"), adv);
    }

    #[test]
    fn node_info_advertise_decodes_plaintext_info() {
        let info = sample_node_info();
        let mut info_bytes = Vec::new();
        info.encode(&mut info_bytes).expect("encode node info");
        let adv = NodeInfoAdvertise {
            origin: sample_id(5),
            sequence: 7,
            info: EncryptedData::plaintext(info_bytes),
            decoded_info: None,
            seen_by: vec![],
        };
        let mut buf = Vec::new();
        adv.encode(&mut buf).expect("encode");
        let mut reader = BufferReader::new(&buf);
        let decoded = NodeInfoAdvertise::decode(&mut reader).expect("decode");
        assert_eq!(decoded.decoded_info, Some(info));
    }

    #[test]
    fn node_info_advertise_leaves_decoded_info_empty_when_sealed() {
        let adv = NodeInfoAdvertise {
            origin: sample_id(5),
            sequence: 7,
            info: EncryptedData::sealed(vec![0xDE, 0xAD, 0xBE, 0xEF]),
            decoded_info: None,
            seen_by: vec![],
        };
        let mut buf = Vec::new();
        adv.encode(&mut buf).expect("encode");
        let mut reader = BufferReader::new(&buf);
        let decoded = NodeInfoAdvertise::decode(&mut reader).expect("decode");
        assert!(decoded.info.is_encrypted());
        assert!(decoded.decoded_info.is_none());
    }
}
