//! Fixed 14-byte frame header, serialized as raw big-endian bytes.
//!
//! Unlike a self-describing framing format, this header carries no magic
//! number or version byte: `spec.md` §6.1 fixes the wire layout as
//! `type(1) | flags(1) | length(4) | stream_id(8)` and treats any future
//! change as a new frame type rather than a header revision.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    errors::{ProtocolError, Result},
    flags::FrameFlags,
    frame_type::FrameType,
};

/// Maximum payload size in bytes (`spec.md` §6.1).
pub const MAX_PAYLOAD_SIZE: usize = 16384;

/// Maximum total frame size (`HeaderSize + MaxPayloadSize`).
pub const MAX_FRAME_SIZE: usize = FrameHeader::SIZE + MAX_PAYLOAD_SIZE;

/// Reserved stream id for control-plane frames not bound to a data stream.
pub const CONTROL_STREAM_ID: u64 = 0;

/// Protocol version carried out-of-band (not part of the wire header).
pub const PROTOCOL_VERSION: u16 = 1;

/// Fixed 14-byte frame header (big-endian network byte order).
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    frame_type: u8,
    flags: u8,
    length: [u8; 4],
    stream_id: [u8; 8],
}

impl FrameHeader {
    /// Size of the serialized header in bytes.
    pub const SIZE: usize = 14;

    /// Build a header for a frame of the given type, flags, stream and
    /// payload length.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FrameTooLarge`] if `payload_len` exceeds
    /// [`MAX_PAYLOAD_SIZE`].
    pub fn new(
        frame_type: FrameType,
        flags: FrameFlags,
        stream_id: u64,
        payload_len: usize,
    ) -> Result<Self> {
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::FrameTooLarge { size: payload_len, max: MAX_PAYLOAD_SIZE });
        }
        #[allow(clippy::cast_possible_truncation, reason = "payload_len checked above")]
        let length = (payload_len as u32).to_be_bytes();
        Ok(Self {
            frame_type: frame_type.to_u8(),
            flags: flags.to_byte(),
            length,
            stream_id: stream_id.to_be_bytes(),
        })
    }

    /// Parse a header from the first [`Self::SIZE`] bytes of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FrameTooShort`] if fewer than [`Self::SIZE`]
    /// bytes are available, or [`ProtocolError::FrameTooLarge`] if the
    /// declared length exceeds [`MAX_PAYLOAD_SIZE`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = Self::read_from_prefix(bytes)
            .map_err(|_| ProtocolError::FrameTooShort { expected: Self::SIZE, actual: bytes.len() })?
            .0;

        let len = header.length() as usize;
        if len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::FrameTooLarge { size: len, max: MAX_PAYLOAD_SIZE });
        }
        Ok(header)
    }

    /// Serialize to the fixed 14-byte wire form.
    #[must_use]
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let bytes = IntoBytes::as_bytes(&self);
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(bytes);
        arr
    }

    /// Raw frame-type byte.
    #[must_use]
    pub const fn frame_type_byte(&self) -> u8 {
        self.frame_type
    }

    /// Decoded [`FrameType`], `None` if the byte is unrecognized.
    #[must_use]
    pub const fn frame_type(&self) -> Option<FrameType> {
        FrameType::from_u8(self.frame_type)
    }

    /// Frame processing flags.
    #[must_use]
    pub const fn flags(&self) -> FrameFlags {
        FrameFlags::from_byte(self.flags)
    }

    /// Declared payload length.
    #[must_use]
    pub fn length(&self) -> u32 {
        u32::from_be_bytes(self.length)
    }

    /// Stream id, or [`CONTROL_STREAM_ID`] for control-plane frames.
    #[must_use]
    pub fn stream_id(&self) -> u64 {
        u64::from_be_bytes(self.stream_id)
    }
}

impl std::fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHeader")
            .field("frame_type", &format!("{:#04x}", self.frame_type_byte()))
            .field("flags", &self.flags())
            .field("length", &self.length())
            .field("stream_id", &self.stream_id())
            .finish()
    }
}

impl PartialEq for FrameHeader {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for FrameHeader {}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn header_size_is_fourteen() {
        assert_eq!(std::mem::size_of::<FrameHeader>(), FrameHeader::SIZE);
        assert_eq!(FrameHeader::SIZE, 14);
    }

    #[test]
    fn literal_stream_data_header() {
        // scenario A: type=0x04, flags=0x01, stream_id=12345678, len=13
        let header =
            FrameHeader::new(FrameType::StreamData, FrameFlags::empty().with(FrameFlags::FIN_WRITE), 12_345_678, 13)
                .expect("within size budget");
        let bytes = header.to_bytes();
        assert_eq!(bytes, [0x04, 0x01, 0x00, 0x00, 0x00, 0x0D, 0x00, 0x00, 0x00, 0x00, 0x00, 0xBC, 0x61, 0x4E]);
    }

    #[test]
    fn rejects_oversized_payload_on_encode() {
        let err = FrameHeader::new(FrameType::StreamData, FrameFlags::empty(), 0, MAX_PAYLOAD_SIZE + 1);
        assert_eq!(err.unwrap_err(), ProtocolError::FrameTooLarge { size: MAX_PAYLOAD_SIZE + 1, max: MAX_PAYLOAD_SIZE });
    }

    #[test]
    fn rejects_short_buffer_on_decode() {
        let short = [0u8; 10];
        assert_eq!(
            FrameHeader::from_bytes(&short),
            Err(ProtocolError::FrameTooShort { expected: 14, actual: 10 })
        );
    }

    #[test]
    fn rejects_oversized_length_on_decode() {
        let mut buf = [0u8; FrameHeader::SIZE];
        buf[0] = FrameType::StreamData.to_u8();
        buf[2..6].copy_from_slice(&(MAX_PAYLOAD_SIZE as u32 + 1).to_be_bytes());
        assert_eq!(
            FrameHeader::from_bytes(&buf),
            Err(ProtocolError::FrameTooLarge { size: MAX_PAYLOAD_SIZE + 1, max: MAX_PAYLOAD_SIZE })
        );
    }

    proptest! {
        #[test]
        fn header_round_trips(
            frame_type in 0u8..=0xFFu8,
            flags in any::<u8>(),
            len in 0u32..=MAX_PAYLOAD_SIZE as u32,
            stream_id in any::<u64>(),
        ) {
            let Some(ft) = FrameType::from_u8(frame_type) else { return Ok(()); };
            let header = FrameHeader::new(ft, FrameFlags::from_byte(flags), stream_id, len as usize)
                .expect("len within budget");
            let bytes = header.to_bytes();
            let parsed = FrameHeader::from_bytes(&bytes).expect("should parse");
            prop_assert_eq!(header, parsed);
            prop_assert_eq!(parsed.length(), len);
            prop_assert_eq!(parsed.stream_id(), stream_id);
        }
    }
}
