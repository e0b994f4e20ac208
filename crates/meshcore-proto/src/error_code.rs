//! Wire-level error codes carried in `*Err` payloads (`spec.md` §3.2).
//!
//! The specification names two fixed points — code 1 is `NoRoute`, code 52 is
//! `IcmpSessionLimit` — and says the 52 codes in between span routing,
//! resource, protocol, control and transport-family failures. The codes below
//! fill that range by family, grouped in blocks of ten so a new code can be
//! inserted in its family without renumbering the next one.

/// A two-byte wire error code (`StreamOpenErr`, `UdpOpenErr`, `IcmpOpenErr`,
/// `ControlResponse`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // Routing (1..10)
    /// No route to the requested destination.
    NoRoute = 1,
    /// Destination actively refused the connection.
    ConnectionRefused = 2,
    /// Connection attempt timed out.
    ConnectionTimeout = 3,
    /// Peer reset an established connection.
    ConnectionReset = 4,
    /// Host is unreachable from this node.
    HostUnreachable = 5,
    /// Network is unreachable from this node.
    NetworkUnreachable = 6,
    /// Requested address is already bound.
    AddressInUse = 7,
    /// Requested address cannot be assigned.
    AddressNotAvailable = 8,
    /// Domain-name resolution failed.
    DnsResolutionFailed = 9,
    /// Route's hop budget was exceeded.
    TtlExceeded = 10,

    // Resource (11..20)
    /// A generic resource limit was hit.
    ResourceExhausted = 11,
    /// Too many concurrent streams.
    StreamLimitExceeded = 12,
    /// Too many concurrent UDP associations.
    UdpAssociationLimit = 13,
    /// Memory budget exceeded.
    MemoryLimitExceeded = 14,
    /// Caller is being rate limited.
    RateLimited = 15,
    /// A configured quota was exceeded.
    QuotaExceeded = 16,
    /// Too many concurrent connections.
    TooManyConnections = 17,
    /// An internal buffer is full.
    BufferFull = 18,
    /// Write side is applying backpressure.
    Backpressure = 19,
    /// A queue reached its capacity.
    QueueFull = 20,

    // Protocol (21..30)
    /// Peer violated the wire protocol.
    ProtocolViolation = 21,
    /// Frame failed to decode.
    MalformedFrame = 22,
    /// Peer speaks an unsupported protocol version.
    UnsupportedVersion = 23,
    /// Frame type byte was not recognized.
    UnknownFrameType = 24,
    /// Stream ID referenced a stream that does not exist.
    InvalidStreamId = 25,
    /// Stream ID was already in use.
    DuplicateStreamId = 26,
    /// Stream was already closed.
    StreamAlreadyClosed = 27,
    /// Address field failed to decode.
    InvalidAddress = 28,
    /// Address-family byte was not recognized.
    InvalidAddressFamily = 29,
    /// Payload exceeded the maximum frame size.
    PayloadTooLarge = 30,

    // Control / auth (31..40)
    /// Peer authentication failed.
    AuthFailed = 31,
    /// Operation was not permitted.
    PermissionDenied = 32,
    /// Peer has not completed its handshake yet.
    PeerNotReady = 33,
    /// Peer is hibernating and cannot be reached directly.
    PeerSleeping = 34,
    /// Peer is unreachable.
    PeerUnreachable = 35,
    /// Control-request type byte was not recognized.
    UnknownControlType = 36,
    /// Control request failed on the remote side.
    ControlRequestFailed = 37,
    /// A signed command's signature did not verify.
    SignatureInvalid = 38,
    /// A command sequence number was replayed.
    SequenceReplayed = 39,
    /// A route advertisement referenced a stale sequence.
    StaleRoute = 40,

    // UDP (41..46)
    /// UDP association failed to open.
    UdpOpenFailed = 41,
    /// Referenced UDP association does not exist.
    UdpAssociationNotFound = 42,
    /// UDP association expired from inactivity.
    UdpAssociationExpired = 43,
    /// Datagram exceeded the maximum UDP payload size.
    UdpDatagramTooLarge = 44,
    /// Destination port unreachable.
    UdpPortUnreachable = 45,
    /// Too many concurrent UDP sessions.
    UdpSessionLimit = 46,

    // ICMP (47..52)
    /// ICMP session failed to open.
    IcmpOpenFailed = 47,
    /// Referenced ICMP session does not exist.
    IcmpSessionNotFound = 48,
    /// ICMP session expired from inactivity.
    IcmpSessionExpired = 49,
    /// ICMP echo request timed out.
    IcmpEchoTimeout = 50,
    /// ICMP type/code is not supported.
    IcmpUnsupportedType = 51,
    /// Too many concurrent ICMP sessions.
    IcmpSessionLimit = 52,
}

impl ErrorCode {
    /// Raw wire value.
    #[must_use]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Parse the wire value, `None` if unrecognized.
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            1 => Self::NoRoute,
            2 => Self::ConnectionRefused,
            3 => Self::ConnectionTimeout,
            4 => Self::ConnectionReset,
            5 => Self::HostUnreachable,
            6 => Self::NetworkUnreachable,
            7 => Self::AddressInUse,
            8 => Self::AddressNotAvailable,
            9 => Self::DnsResolutionFailed,
            10 => Self::TtlExceeded,
            11 => Self::ResourceExhausted,
            12 => Self::StreamLimitExceeded,
            13 => Self::UdpAssociationLimit,
            14 => Self::MemoryLimitExceeded,
            15 => Self::RateLimited,
            16 => Self::QuotaExceeded,
            17 => Self::TooManyConnections,
            18 => Self::BufferFull,
            19 => Self::Backpressure,
            20 => Self::QueueFull,
            21 => Self::ProtocolViolation,
            22 => Self::MalformedFrame,
            23 => Self::UnsupportedVersion,
            24 => Self::UnknownFrameType,
            25 => Self::InvalidStreamId,
            26 => Self::DuplicateStreamId,
            27 => Self::StreamAlreadyClosed,
            28 => Self::InvalidAddress,
            29 => Self::InvalidAddressFamily,
            30 => Self::PayloadTooLarge,
            31 => Self::AuthFailed,
            32 => Self::PermissionDenied,
            33 => Self::PeerNotReady,
            34 => Self::PeerSleeping,
            35 => Self::PeerUnreachable,
            36 => Self::UnknownControlType,
            37 => Self::ControlRequestFailed,
            38 => Self::SignatureInvalid,
            39 => Self::SequenceReplayed,
            40 => Self::StaleRoute,
            41 => Self::UdpOpenFailed,
            42 => Self::UdpAssociationNotFound,
            43 => Self::UdpAssociationExpired,
            44 => Self::UdpDatagramTooLarge,
            45 => Self::UdpPortUnreachable,
            46 => Self::UdpSessionLimit,
            47 => Self::IcmpOpenFailed,
            48 => Self::IcmpSessionNotFound,
            49 => Self::IcmpSessionExpired,
            50 => Self::IcmpEchoTimeout,
            51 => Self::IcmpUnsupportedType,
            52 => Self::IcmpSessionLimit,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_codes_match_spec() {
        assert_eq!(ErrorCode::from_u16(1), Some(ErrorCode::NoRoute));
        assert_eq!(ErrorCode::from_u16(2), Some(ErrorCode::ConnectionRefused));
        assert_eq!(ErrorCode::from_u16(52), Some(ErrorCode::IcmpSessionLimit));
    }

    #[test]
    fn full_range_round_trips() {
        for raw in 1u16..=52 {
            let code = ErrorCode::from_u16(raw).expect("1..=52 are all assigned");
            assert_eq!(code.to_u16(), raw);
        }
    }

    #[test]
    fn out_of_range_is_none() {
        assert_eq!(ErrorCode::from_u16(0), None);
        assert_eq!(ErrorCode::from_u16(53), None);
    }
}
