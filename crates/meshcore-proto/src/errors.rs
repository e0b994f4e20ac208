//! Error taxonomy for the framer and payload codec.
//!
//! Nothing in this crate logs or panics on malformed input; every fallible
//! path returns one of these variants with enough context (a field name, a
//! byte count) to diagnose a wire-format bug without a debugger.

/// Errors produced by frame and payload encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Payload exceeds [`crate::frame::MAX_PAYLOAD_SIZE`] at encode time.
    #[error("payload of {size} bytes exceeds MaxPayloadSize ({max})")]
    FrameTooLarge {
        /// Size that was rejected.
        size: usize,
        /// The configured maximum.
        max: usize,
    },

    /// Header declares more payload bytes than are available in the buffer.
    #[error("frame truncated: expected {expected} payload bytes, found {actual}")]
    FrameTruncated {
        /// Bytes the header claims.
        expected: usize,
        /// Bytes actually present after the header.
        actual: usize,
    },

    /// Buffer is shorter than the fixed 14-byte header.
    #[error("frame header too short: expected {expected} bytes, found {actual}")]
    FrameTooShort {
        /// Required header size.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// A payload field failed to decode.
    #[error("invalid frame field `{field}`: {reason}")]
    InvalidFrame {
        /// Name of the field being parsed when the error occurred.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// The frame header's type byte does not match a known [`crate::FrameType`].
    #[error("unknown frame type: {0:#04x}")]
    UnknownFrameType(u8),

    /// An address-type byte did not match IPv4/Domain/IPv6.
    #[error("unknown address type: {0:#04x}")]
    UnknownAddressType(u8),

    /// A route family byte did not match any [`crate::payloads::routing::AddressFamily`].
    #[error("unknown address family: {0:#04x}")]
    UnknownAddressFamily(u8),
}

impl ProtocolError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidFrame { field, reason: reason.into() }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;
