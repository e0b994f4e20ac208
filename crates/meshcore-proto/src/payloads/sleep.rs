//! Sleep/wake hibernation payloads (`spec.md` §4.3, §4.4, §6.2, §9).
//!
//! Commands are signed over `origin‖command_id‖timestamp` only — `seen_by` is
//! excluded from the signable bytes so relaying agents can append themselves
//! without invalidating the signature (`spec.md` §9).

use bytes::BufMut;

use crate::{
    agent_id::AgentId,
    buffer::BufferReader,
    errors::{ProtocolError, Result},
    payloads::routing::{NodeInfoAdvertise, RouteAdvertise, RouteWithdraw},
};

/// Ed25519 signature size.
pub const SIGNATURE_SIZE: usize = 64;
/// Size of the signable byte string (`origin‖command_id‖timestamp`).
pub const SIGNABLE_SIZE: usize = 32;

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

/// A signed hibernation command, shared shape for sleep and wake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCommand {
    /// Agent that issued the command.
    pub origin: AgentId,
    /// Monotonic per-origin command id, used for dedup.
    pub command_id: u64,
    /// Issue time (unix millis).
    pub timestamp: u64,
    /// Ed25519 signature over [`signable_bytes`].
    pub signature: [u8; SIGNATURE_SIZE],
    /// Loop-prevention list of agents this command has traversed.
    pub seen_by: Vec<AgentId>,
}

impl SignedCommand {
    /// Encode onto `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] if `seen_by` exceeds 255
    /// entries.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        buf.put_slice(self.origin.as_bytes());
        buf.put_u64(self.command_id);
        buf.put_u64(self.timestamp);
        buf.put_slice(&self.signature);
        encode_seen_by(buf, &self.seen_by)?;
        Ok(())
    }

    /// Decode from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] on truncated input.
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        let origin = reader.read_agent_id("signed_command.origin")?;
        let command_id = reader.read_u64("signed_command.command_id")?;
        let timestamp = reader.read_u64("signed_command.timestamp")?;
        let signature = reader.read_array::<SIGNATURE_SIZE>("signed_command.signature")?;
        let seen_by = reader.read_agent_id_list("signed_command.seen_by")?;
        Ok(Self { origin, command_id, timestamp, signature, seen_by })
    }

    /// Bytes that are actually signed: `origin‖command_id‖timestamp`,
    /// excluding `seen_by` so relays can extend it without breaking the
    /// signature.
    #[must_use]
    pub fn signable_bytes(&self) -> [u8; SIGNABLE_SIZE] {
        let mut out = [0u8; SIGNABLE_SIZE];
        out[..16].copy_from_slice(self.origin.as_bytes());
        out[16..24].copy_from_slice(&self.command_id.to_be_bytes());
        out[24..32].copy_from_slice(&self.timestamp.to_be_bytes());
        out
    }

    /// Whether the signature field is all-zero, i.e. unsigned (used by
    /// internal tests and tooling, never accepted as valid over the wire).
    #[must_use]
    pub fn is_zero_signature(&self) -> bool {
        self.signature == [0u8; SIGNATURE_SIZE]
    }
}

/// Command instructing an agent to enter hibernation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SleepCommand(pub SignedCommand);

/// Command instructing an agent to wake from hibernation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeCommand(pub SignedCommand);

macro_rules! signed_command_wrapper {
    ($name:ident) => {
        impl $name {
            /// Encode onto `buf`.
            ///
            /// # Errors
            ///
            /// Returns [`ProtocolError::InvalidFrame`] if `seen_by` exceeds
            /// 255 entries.
            pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
                self.0.encode(buf)
            }

            /// Decode from `reader`.
            ///
            /// # Errors
            ///
            /// Returns [`ProtocolError::InvalidFrame`] on truncated input.
            pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
                Ok(Self(SignedCommand::decode(reader)?))
            }
        }
    };
}

signed_command_wrapper!(SleepCommand);
signed_command_wrapper!(WakeCommand);

fn encode_entry_list<T>(buf: &mut impl BufMut, entries: &[T], encode_one: impl Fn(&T, &mut Vec<u8>) -> Result<()>) -> Result<()> {
    if entries.len() > u16::MAX as usize {
        return Err(ProtocolError::invalid(
            "queued_state.entry_list",
            format!("{} entries exceeds the 2-byte count prefix", entries.len()),
        ));
    }
    #[allow(clippy::cast_possible_truncation, reason = "length checked above")]
    buf.put_u16(entries.len() as u16);
    for entry in entries {
        let mut encoded = Vec::new();
        encode_one(entry, &mut encoded)?;
        if encoded.len() > u16::MAX as usize {
            return Err(ProtocolError::invalid(
                "queued_state.entry",
                format!("{} bytes exceeds the 2-byte length prefix", encoded.len()),
            ));
        }
        #[allow(clippy::cast_possible_truncation, reason = "length checked above")]
        buf.put_u16(encoded.len() as u16);
        buf.put_slice(&encoded);
    }
    Ok(())
}

/// Decode a `u16`-count-prefixed list of `u16`-length-prefixed entries,
/// skipping (and continuing past) any entry that fails to decode
/// (`spec.md` §4.4).
fn decode_entry_list<T>(reader: &mut BufferReader<'_>, decode_one: impl Fn(&mut BufferReader<'_>) -> Result<T>) -> Result<Vec<T>> {
    let count = reader.read_u16("queued_state.entry_list.count")? as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let bytes = reader.read_len_u16_bytes("queued_state.entry")?;
        let mut entry_reader = BufferReader::new(bytes);
        if let Ok(value) = decode_one(&mut entry_reader) {
            out.push(value);
        }
    }
    Ok(out)
}

/// Queued gossip state delivered to a sleeping agent on its next poll
/// (`spec.md` §4.4).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueuedState {
    /// Pending route advertisements.
    pub route_advertises: Vec<RouteAdvertise>,
    /// Pending route withdrawals.
    pub route_withdraws: Vec<RouteWithdraw>,
    /// Pending node-info advertisements.
    pub node_info_advertises: Vec<NodeInfoAdvertise>,
    /// A sleep command addressed to this agent that arrived while queued.
    pub pending_sleep: Option<SleepCommand>,
    /// A wake command addressed to this agent that arrived while queued.
    pub pending_wake: Option<WakeCommand>,
}

impl QueuedState {
    /// Encode onto `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] if a list exceeds 65535
    /// entries or any entry exceeds 65535 encoded bytes.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        encode_entry_list(buf, &self.route_advertises, |v, out| v.encode(out))?;
        encode_entry_list(buf, &self.route_withdraws, |v, out| v.encode(out))?;
        encode_entry_list(buf, &self.node_info_advertises, |v, out| v.encode(out))?;

        match &self.pending_sleep {
            Some(cmd) => {
                buf.put_u8(1);
                cmd.encode(buf)?;
            },
            None => buf.put_u8(0),
        }
        match &self.pending_wake {
            Some(cmd) => {
                buf.put_u8(1);
                cmd.encode(buf)?;
            },
            None => buf.put_u8(0),
        }
        Ok(())
    }

    /// Decode from `reader`. Malformed entries within a list are skipped
    /// rather than failing the whole decode.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] on truncation of the
    /// structural framing itself (counts, length prefixes, the pending
    /// presence flags and command bodies).
    pub fn decode(reader: &mut BufferReader<'_>) -> Result<Self> {
        let route_advertises = decode_entry_list(reader, RouteAdvertise::decode)?;
        let route_withdraws = decode_entry_list(reader, RouteWithdraw::decode)?;
        let node_info_advertises = decode_entry_list(reader, NodeInfoAdvertise::decode)?;

        let pending_sleep = match reader.read_u8("queued_state.pending_sleep.flag")? {
            0 => None,
            _ => Some(SleepCommand::decode(reader)?),
        };
        let pending_wake = match reader.read_u8("queued_state.pending_wake.flag")? {
            0 => None,
            _ => Some(WakeCommand::decode(reader)?),
        };

        Ok(Self { route_advertises, route_withdraws, node_info_advertises, pending_sleep, pending_wake })
    }
}
