//! Frame type combining header and payload.
//!
//! A `Frame` is the wire unit: a 14-byte header followed by the raw payload
//! bytes. This is a pure data holder; for the typed payload taxonomy see
//! [`crate::payloads::Payload`].

use bytes::{BufMut, Bytes};

use crate::{
    errors::{ProtocolError, Result},
    flags::FrameFlags,
    frame_type::FrameType,
    header::{FrameHeader, MAX_PAYLOAD_SIZE},
};

/// A complete protocol frame: header plus raw payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame-type discriminant.
    pub frame_type: FrameType,
    /// Processing flags.
    pub flags: FrameFlags,
    /// Stream id, or [`crate::header::CONTROL_STREAM_ID`] for control-plane frames.
    pub stream_id: u64,
    /// Raw, already-encoded payload bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Build a frame from its parts.
    #[must_use]
    pub fn new(frame_type: FrameType, flags: FrameFlags, stream_id: u64, payload: impl Into<Bytes>) -> Self {
        Self { frame_type, flags, stream_id, payload: payload.into() }
    }

    /// Encode to `14 + len(payload)` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FrameTooLarge`] if the payload exceeds
    /// [`MAX_PAYLOAD_SIZE`].
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let header = FrameHeader::new(self.frame_type, self.flags, self.stream_id, self.payload.len())?;
        dst.put_slice(&header.to_bytes());
        dst.put_slice(&self.payload);
        Ok(())
    }

    /// Decode a frame from a byte slice.
    ///
    /// The decoded payload is copied out of `bytes` and does not alias it.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FrameTooShort`]/[`ProtocolError::FrameTooLarge`]
    /// from header parsing, [`ProtocolError::UnknownFrameType`] if the type
    /// byte is unrecognized, or [`ProtocolError::FrameTruncated`] if fewer
    /// payload bytes are present than the header declares.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::from_bytes(bytes)?;
        let frame_type = header
            .frame_type()
            .ok_or_else(|| ProtocolError::UnknownFrameType(header.frame_type_byte()))?;

        let payload_len = header.length() as usize;
        let total = FrameHeader::SIZE + payload_len;
        if bytes.len() < total {
            return Err(ProtocolError::FrameTruncated {
                expected: payload_len,
                actual: bytes.len().saturating_sub(FrameHeader::SIZE),
            });
        }

        let payload = Bytes::copy_from_slice(&bytes[FrameHeader::SIZE..total]);
        Ok(Self { frame_type, flags: header.flags(), stream_id: header.stream_id(), payload })
    }
}

/// Parse just the 14-byte header, without requiring the payload to be present.
///
/// # Errors
///
/// Same as [`FrameHeader::from_bytes`].
pub fn decode_header(bytes: &[u8]) -> Result<FrameHeader> {
    FrameHeader::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn arbitrary_frame_type() -> impl Strategy<Value = FrameType> {
        prop::sample::select(vec![
            FrameType::StreamOpen,
            FrameType::StreamOpenAck,
            FrameType::StreamOpenErr,
            FrameType::StreamData,
            FrameType::StreamClose,
            FrameType::StreamReset,
            FrameType::RouteAdvertise,
            FrameType::RouteWithdraw,
            FrameType::NodeInfoAdvertise,
            FrameType::PeerHello,
            FrameType::PeerHelloAck,
            FrameType::Keepalive,
            FrameType::KeepaliveAck,
            FrameType::ControlRequest,
            FrameType::ControlResponse,
            FrameType::UdpOpen,
            FrameType::UdpOpenAck,
            FrameType::UdpOpenErr,
            FrameType::UdpDatagram,
            FrameType::UdpClose,
            FrameType::IcmpOpen,
            FrameType::IcmpOpenAck,
            FrameType::IcmpOpenErr,
            FrameType::IcmpEcho,
            FrameType::IcmpClose,
            FrameType::SleepCommand,
            FrameType::WakeCommand,
            FrameType::QueuedState,
        ])
    }

    proptest! {
        #[test]
        fn frame_round_trips(
            frame_type in arbitrary_frame_type(),
            flags in any::<u8>(),
            stream_id in any::<u64>(),
            payload in prop::collection::vec(any::<u8>(), 0..=512),
        ) {
            let frame = Frame::new(frame_type, FrameFlags::from_byte(flags), stream_id, payload);
            let mut wire = Vec::new();
            frame.encode(&mut wire).expect("within size budget");
            prop_assert_eq!(wire.len(), 14 + frame.payload.len());
            let parsed = Frame::decode(&wire).expect("should decode");
            prop_assert_eq!(frame, parsed);
        }
    }

    #[test]
    fn literal_stream_data_frame() {
        // scenario A
        let frame = Frame::new(
            FrameType::StreamData,
            FrameFlags::empty().with(FrameFlags::FIN_WRITE),
            12_345_678,
            Bytes::from_static(b"Hello, World!"),
        );
        let mut wire = Vec::new();
        frame.encode(&mut wire).expect("within size budget");
        assert_eq!(
            &wire[..14],
            &[0x04, 0x01, 0x00, 0x00, 0x00, 0x0D, 0x00, 0x00, 0x00, 0x00, 0x00, 0xBC, 0x61, 0x4E][..]
        );
        assert_eq!(&wire[14..], b"Hello, World!");
    }

    #[test]
    fn oversize_payload_is_rejected() {
        let frame = Frame::new(
            FrameType::StreamData,
            FrameFlags::empty(),
            0,
            vec![0u8; MAX_PAYLOAD_SIZE + 1],
        );
        let mut wire = Vec::new();
        let err = frame.encode(&mut wire).unwrap_err();
        assert_eq!(err, ProtocolError::FrameTooLarge { size: MAX_PAYLOAD_SIZE + 1, max: MAX_PAYLOAD_SIZE });
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let frame = Frame::new(FrameType::StreamData, FrameFlags::empty(), 0, vec![0u8; 10]);
        let mut wire = Vec::new();
        frame.encode(&mut wire).expect("within size budget");
        wire.truncate(14 + 5);
        let err = Frame::decode(&wire).unwrap_err();
        assert_eq!(err, ProtocolError::FrameTruncated { expected: 10, actual: 5 });
    }

    #[test]
    fn unknown_frame_type_is_rejected() {
        let mut wire = vec![0u8; 14];
        wire[0] = 0x00;
        assert_eq!(Frame::decode(&wire), Err(ProtocolError::UnknownFrameType(0x00)));
    }
}
