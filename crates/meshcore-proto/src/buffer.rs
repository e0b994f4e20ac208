//! Bounds-checked cursor over a byte slice.
//!
//! Every payload codec function in [`crate::payloads`] reads through a single
//! [`BufferReader`] instead of slicing the input directly. A read past the
//! end of the buffer returns [`ProtocolError::InvalidFrame`] with the name of
//! the field being parsed; callers chain reads with `?`, so the first failure
//! unwinds the whole decode immediately rather than leaving a partially
//! constructed value around.

use crate::{
    agent_id::AgentId,
    errors::{ProtocolError, Result},
};

/// A forward-only cursor over `data`, bounds-checked on every read.
pub struct BufferReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BufferReader<'a> {
    /// Wrap `data` for sequential reads starting at offset 0.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether all bytes have been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ProtocolError::invalid(
                field,
                format!("need {n} bytes, {} remaining", self.remaining()),
            ));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self, field: &'static str) -> Result<u8> {
        Ok(self.take(1, field)?[0])
    }

    /// Read a big-endian `u16`.
    pub fn read_u16(&mut self, field: &'static str) -> Result<u16> {
        let b = self.take(2, field)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Read a big-endian `u32`.
    pub fn read_u32(&mut self, field: &'static str) -> Result<u32> {
        let b = self.take(4, field)?;
        #[allow(clippy::expect_used, reason = "take() guarantees exactly 4 bytes")]
        Ok(u32::from_be_bytes(b.try_into().expect("4-byte slice")))
    }

    /// Read a big-endian `u64`.
    pub fn read_u64(&mut self, field: &'static str) -> Result<u64> {
        let b = self.take(8, field)?;
        #[allow(clippy::expect_used, reason = "take() guarantees exactly 8 bytes")]
        Ok(u64::from_be_bytes(b.try_into().expect("8-byte slice")))
    }

    /// Read a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N]> {
        let b = self.take(N, field)?;
        #[allow(clippy::expect_used, reason = "take(N) guarantees exactly N bytes")]
        Ok(b.try_into().expect("N-byte slice"))
    }

    /// Read `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize, field: &'static str) -> Result<&'a [u8]> {
        self.take(n, field)
    }

    /// Read a `u8`-length-prefixed byte string.
    pub fn read_len_u8_bytes(&mut self, field: &'static str) -> Result<&'a [u8]> {
        let len = self.read_u8(field)? as usize;
        self.take(len, field)
    }

    /// Read a `u8`-length-prefixed UTF-8 string.
    pub fn read_len_u8_string(&mut self, field: &'static str) -> Result<String> {
        let bytes = self.read_len_u8_bytes(field)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ProtocolError::invalid(field, "bytes are not valid utf-8"))
    }

    /// Read a `u16`-length-prefixed byte string (`QueuedState`, `ControlResponse`).
    pub fn read_len_u16_bytes(&mut self, field: &'static str) -> Result<&'a [u8]> {
        let len = self.read_u16(field)? as usize;
        self.take(len, field)
    }

    /// Read a `u32`-length-prefixed byte string (`ControlRequest`).
    pub fn read_len_u32_bytes(&mut self, field: &'static str) -> Result<&'a [u8]> {
        let len = self.read_u32(field)? as usize;
        self.take(len, field)
    }

    /// Read one 16-byte [`AgentId`].
    pub fn read_agent_id(&mut self, field: &'static str) -> Result<AgentId> {
        Ok(AgentId::from_bytes(self.read_array::<16>(field)?))
    }

    /// Read a `u8`-count-prefixed list of [`AgentId`] (the `SeenBy`/path encoding).
    pub fn read_agent_id_list(&mut self, field: &'static str) -> Result<Vec<AgentId>> {
        let count = self.read_u8(field)? as usize;
        (0..count).map(|_| self.read_agent_id(field)).collect()
    }
}

/// Write a `u8`-length-prefixed string.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidFrame`] if `s` is longer than 255 bytes.
/// Callers that must tolerate oversized input (error messages, `NodeInfo`
/// peer/listener lists) truncate before calling this.
pub fn put_len_u8_string(
    buf: &mut impl bytes::BufMut,
    field: &'static str,
    s: &str,
) -> Result<()> {
    if s.len() > u8::MAX as usize {
        return Err(ProtocolError::invalid(
            field,
            format!("{} bytes exceeds the 1-byte length prefix", s.len()),
        ));
    }
    #[allow(clippy::cast_possible_truncation, reason = "length checked above")]
    buf.put_u8(s.len() as u8);
    buf.put_slice(s.as_bytes());
    Ok(())
}

/// Truncate `s` to at most 255 bytes on a UTF-8 boundary.
#[must_use]
pub fn truncate_to_u8_len(s: &str) -> &str {
    if s.len() <= u8::MAX as usize {
        return s;
    }
    let mut end = u8::MAX as usize;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
