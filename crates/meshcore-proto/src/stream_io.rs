//! Streaming reader/writer over any byte stream (`spec.md` §4.1).
//!
//! These wrap a generic [`tokio::io::AsyncRead`]/[`tokio::io::AsyncWrite`] so
//! the framer stays agnostic to the transport beneath it (TCP, QUIC,
//! WebSocket — all out of scope here).

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{errors::Result, frame::Frame, header::FrameHeader};

/// Reads [`Frame`]s one at a time from an async byte stream.
pub struct StreamReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> StreamReader<R> {
    /// Wrap `inner` for frame-at-a-time reads.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the next frame, reading exactly the header then exactly its
    /// declared payload.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, including the transport's EOF
    /// unchanged if no more bytes are available. Returns a [`crate::errors::ProtocolError`]
    /// if the header or payload fails to decode.
    pub async fn read_frame(&mut self) -> std::io::Result<Result<Frame>> {
        let mut buf = BytesMut::zeroed(FrameHeader::SIZE);
        self.inner.read_exact(&mut buf).await?;

        let header = match FrameHeader::from_bytes(&buf) {
            Ok(header) => header,
            Err(err) => return Ok(Err(err)),
        };

        let payload_len = header.length() as usize;
        let mut payload = BytesMut::zeroed(payload_len);
        self.inner.read_exact(&mut payload).await?;

        buf.unsplit(payload);
        Ok(Frame::decode(&buf))
    }

    /// Consume the reader and return the wrapped stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Writes [`Frame`]s to an async byte stream.
pub struct StreamWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> StreamWriter<W> {
    /// Wrap `inner` for frame-at-a-time writes.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Encode `frame` and write it in a single call.
    ///
    /// Partial writes from the underlying transport are the transport's
    /// responsibility to retry; this issues one logical write of the full
    /// encoded frame.
    ///
    /// # Errors
    ///
    /// Returns [`crate::errors::ProtocolError::FrameTooLarge`] if the payload
    /// is oversized, or the underlying I/O error.
    pub async fn write_frame(&mut self, frame: &Frame) -> std::io::Result<Result<()>> {
        let mut buf = Vec::new();
        if let Err(err) = frame.encode(&mut buf) {
            return Ok(Err(err));
        }
        self.inner.write_all(&buf).await?;
        Ok(Ok(()))
    }

    /// Consume the writer and return the wrapped stream.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{flags::FrameFlags, frame_type::FrameType};

    #[tokio::test]
    async fn round_trips_over_an_in_memory_pipe() {
        let (client, server) = tokio::io::duplex(4096);
        let (client_r, client_w) = tokio::io::split(client);
        let (server_r, server_w) = tokio::io::split(server);

        let mut writer = StreamWriter::new(client_w);
        let mut reader = StreamReader::new(server_r);
        drop(client_r);
        drop(server_w);

        let frame = Frame::new(FrameType::Keepalive, FrameFlags::empty(), 0, b"ping".to_vec());
        writer.write_frame(&frame).await.expect("io ok").expect("encode ok");

        let decoded = reader.read_frame().await.expect("io ok").expect("decode ok");
        assert_eq!(decoded, frame);
    }

    #[tokio::test]
    async fn eof_is_surfaced_unchanged() {
        let (client, server) = tokio::io::duplex(4096);
        drop(client);
        let mut reader = StreamReader::new(server);
        let err = reader.read_frame().await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
