//! Typed payload taxonomy and its binding to [`FrameType`].
//!
//! Every variant of [`Payload`] corresponds to exactly one [`FrameType`].
//! [`Payload::encode`]/[`Payload::decode`] convert between a typed value and
//! the raw bytes a [`Frame`] carries; [`Payload::into_frame`]/[`Payload::from_frame`]
//! fold the frame header's `stream_id`/flags in and out of that conversion.

pub mod control;
pub mod icmp;
pub mod routing;
pub mod sleep;
pub mod stream;
pub mod udp;

use bytes::{BufMut, Bytes};

use crate::{
    buffer::BufferReader,
    errors::Result,
    flags::FrameFlags,
    frame::Frame,
    frame_type::FrameType,
};

/// A decoded, typed frame payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// [`FrameType::StreamOpen`].
    StreamOpen(stream::StreamOpen),
    /// [`FrameType::StreamOpenAck`].
    StreamOpenAck(stream::StreamOpenAck),
    /// [`FrameType::StreamOpenErr`].
    StreamOpenErr(stream::StreamOpenErr),
    /// [`FrameType::StreamData`]: raw stream bytes, carried verbatim.
    StreamData(Bytes),
    /// [`FrameType::StreamClose`]: no fields.
    StreamClose,
    /// [`FrameType::StreamReset`].
    StreamReset(stream::StreamReset),

    /// [`FrameType::RouteAdvertise`].
    RouteAdvertise(routing::RouteAdvertise),
    /// [`FrameType::RouteWithdraw`].
    RouteWithdraw(routing::RouteWithdraw),
    /// [`FrameType::NodeInfoAdvertise`].
    NodeInfoAdvertise(routing::NodeInfoAdvertise),

    /// [`FrameType::PeerHello`].
    PeerHello(control::PeerHello),
    /// [`FrameType::PeerHelloAck`]: reuses [`control::PeerHello`]'s layout.
    PeerHelloAck(control::PeerHello),
    /// [`FrameType::Keepalive`].
    Keepalive(control::Keepalive),
    /// [`FrameType::KeepaliveAck`]: reuses [`control::Keepalive`]'s layout.
    KeepaliveAck(control::Keepalive),
    /// [`FrameType::ControlRequest`].
    ControlRequest(control::ControlRequest),
    /// [`FrameType::ControlResponse`].
    ControlResponse(control::ControlResponse),

    /// [`FrameType::UdpOpen`].
    UdpOpen(udp::UdpOpen),
    /// [`FrameType::UdpOpenAck`].
    UdpOpenAck(udp::UdpOpenAck),
    /// [`FrameType::UdpOpenErr`].
    UdpOpenErr(udp::UdpOpenErr),
    /// [`FrameType::UdpDatagram`].
    UdpDatagram(udp::UdpDatagram),
    /// [`FrameType::UdpClose`]: no fields.
    UdpClose,

    /// [`FrameType::IcmpOpen`].
    IcmpOpen(icmp::IcmpOpen),
    /// [`FrameType::IcmpOpenAck`].
    IcmpOpenAck(icmp::IcmpOpenAck),
    /// [`FrameType::IcmpOpenErr`].
    IcmpOpenErr(icmp::IcmpOpenErr),
    /// [`FrameType::IcmpEcho`].
    IcmpEcho(icmp::IcmpEcho),
    /// [`FrameType::IcmpClose`]: no fields.
    IcmpClose,

    /// [`FrameType::SleepCommand`].
    SleepCommand(sleep::SleepCommand),
    /// [`FrameType::WakeCommand`].
    WakeCommand(sleep::WakeCommand),
    /// [`FrameType::QueuedState`].
    QueuedState(sleep::QueuedState),
}

impl Payload {
    /// The [`FrameType`] this payload is carried under.
    #[must_use]
    pub const fn frame_type(&self) -> FrameType {
        match self {
            Self::StreamOpen(_) => FrameType::StreamOpen,
            Self::StreamOpenAck(_) => FrameType::StreamOpenAck,
            Self::StreamOpenErr(_) => FrameType::StreamOpenErr,
            Self::StreamData(_) => FrameType::StreamData,
            Self::StreamClose => FrameType::StreamClose,
            Self::StreamReset(_) => FrameType::StreamReset,
            Self::RouteAdvertise(_) => FrameType::RouteAdvertise,
            Self::RouteWithdraw(_) => FrameType::RouteWithdraw,
            Self::NodeInfoAdvertise(_) => FrameType::NodeInfoAdvertise,
            Self::PeerHello(_) => FrameType::PeerHello,
            Self::PeerHelloAck(_) => FrameType::PeerHelloAck,
            Self::Keepalive(_) => FrameType::Keepalive,
            Self::KeepaliveAck(_) => FrameType::KeepaliveAck,
            Self::ControlRequest(_) => FrameType::ControlRequest,
            Self::ControlResponse(_) => FrameType::ControlResponse,
            Self::UdpOpen(_) => FrameType::UdpOpen,
            Self::UdpOpenAck(_) => FrameType::UdpOpenAck,
            Self::UdpOpenErr(_) => FrameType::UdpOpenErr,
            Self::UdpDatagram(_) => FrameType::UdpDatagram,
            Self::UdpClose => FrameType::UdpClose,
            Self::IcmpOpen(_) => FrameType::IcmpOpen,
            Self::IcmpOpenAck(_) => FrameType::IcmpOpenAck,
            Self::IcmpOpenErr(_) => FrameType::IcmpOpenErr,
            Self::IcmpEcho(_) => FrameType::IcmpEcho,
            Self::IcmpClose => FrameType::IcmpClose,
            Self::SleepCommand(_) => FrameType::SleepCommand,
            Self::WakeCommand(_) => FrameType::WakeCommand,
            Self::QueuedState(_) => FrameType::QueuedState,
        }
    }

    /// Encode the payload body (not including the frame header) onto `buf`.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::errors::ProtocolError`] if a field exceeds its
    /// wire-format length limit.
    pub fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        match self {
            Self::StreamOpen(p) => p.encode(buf)?,
            Self::StreamOpenAck(p) => p.encode(buf)?,
            Self::StreamOpenErr(p) => p.encode(buf),
            Self::StreamData(bytes) => buf.put_slice(bytes),
            Self::StreamClose | Self::UdpClose | Self::IcmpClose => {},
            Self::StreamReset(p) => p.encode(buf),
            Self::RouteAdvertise(p) => p.encode(buf)?,
            Self::RouteWithdraw(p) => p.encode(buf)?,
            Self::NodeInfoAdvertise(p) => p.encode(buf)?,
            Self::PeerHello(p) | Self::PeerHelloAck(p) => p.encode(buf)?,
            Self::Keepalive(p) | Self::KeepaliveAck(p) => p.encode(buf),
            Self::ControlRequest(p) => p.encode(buf)?,
            Self::ControlResponse(p) => p.encode(buf),
            Self::UdpOpen(p) => p.encode(buf)?,
            Self::UdpOpenAck(p) => p.encode(buf)?,
            Self::UdpOpenErr(p) => p.encode(buf),
            Self::UdpDatagram(p) => p.encode(buf)?,
            Self::IcmpOpen(p) => p.encode(buf)?,
            Self::IcmpOpenAck(p) => p.encode(buf)?,
            Self::IcmpOpenErr(p) => p.encode(buf),
            Self::IcmpEcho(p) => p.encode(buf)?,
            Self::SleepCommand(p) => p.encode(buf)?,
            Self::WakeCommand(p) => p.encode(buf)?,
            Self::QueuedState(p) => p.encode(buf)?,
        }
        Ok(())
    }

    /// Decode a payload of the given `frame_type` from `bytes`.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::errors::ProtocolError`] if decoding any field
    /// fails.
    pub fn decode(frame_type: FrameType, bytes: &[u8]) -> Result<Self> {
        let mut reader = BufferReader::new(bytes);
        Ok(match frame_type {
            FrameType::StreamOpen => Self::StreamOpen(stream::StreamOpen::decode(&mut reader)?),
            FrameType::StreamOpenAck => Self::StreamOpenAck(stream::StreamOpenAck::decode(&mut reader)?),
            FrameType::StreamOpenErr => Self::StreamOpenErr(stream::StreamOpenErr::decode(&mut reader)?),
            FrameType::StreamData => Self::StreamData(Bytes::copy_from_slice(bytes)),
            FrameType::StreamClose => Self::StreamClose,
            FrameType::StreamReset => Self::StreamReset(stream::StreamReset::decode(&mut reader)?),
            FrameType::RouteAdvertise => Self::RouteAdvertise(routing::RouteAdvertise::decode(&mut reader)?),
            FrameType::RouteWithdraw => Self::RouteWithdraw(routing::RouteWithdraw::decode(&mut reader)?),
            FrameType::NodeInfoAdvertise => {
                Self::NodeInfoAdvertise(routing::NodeInfoAdvertise::decode(&mut reader)?)
            },
            FrameType::PeerHello => Self::PeerHello(control::PeerHello::decode(&mut reader)?),
            FrameType::PeerHelloAck => Self::PeerHelloAck(control::PeerHello::decode(&mut reader)?),
            FrameType::Keepalive => Self::Keepalive(control::Keepalive::decode(&mut reader)?),
            FrameType::KeepaliveAck => Self::KeepaliveAck(control::Keepalive::decode(&mut reader)?),
            FrameType::ControlRequest => Self::ControlRequest(control::ControlRequest::decode(&mut reader)?),
            FrameType::ControlResponse => Self::ControlResponse(control::ControlResponse::decode(&mut reader)?),
            FrameType::UdpOpen => Self::UdpOpen(udp::UdpOpen::decode(&mut reader)?),
            FrameType::UdpOpenAck => Self::UdpOpenAck(udp::UdpOpenAck::decode(&mut reader)?),
            FrameType::UdpOpenErr => Self::UdpOpenErr(udp::UdpOpenErr::decode(&mut reader)?),
            FrameType::UdpDatagram => Self::UdpDatagram(udp::UdpDatagram::decode(&mut reader)?),
            FrameType::UdpClose => Self::UdpClose,
            FrameType::IcmpOpen => Self::IcmpOpen(icmp::IcmpOpen::decode(&mut reader)?),
            FrameType::IcmpOpenAck => Self::IcmpOpenAck(icmp::IcmpOpenAck::decode(&mut reader)?),
            FrameType::IcmpOpenErr => Self::IcmpOpenErr(icmp::IcmpOpenErr::decode(&mut reader)?),
            FrameType::IcmpEcho => Self::IcmpEcho(icmp::IcmpEcho::decode(&mut reader)?),
            FrameType::IcmpClose => Self::IcmpClose,
            FrameType::SleepCommand => Self::SleepCommand(sleep::SleepCommand::decode(&mut reader)?),
            FrameType::WakeCommand => Self::WakeCommand(sleep::WakeCommand::decode(&mut reader)?),
            FrameType::QueuedState => Self::QueuedState(sleep::QueuedState::decode(&mut reader)?),
        })
    }

    /// Encode into a complete [`Frame`] with the given `flags`/`stream_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::errors::ProtocolError`] if encoding the payload
    /// body fails.
    pub fn into_frame(self, flags: FrameFlags, stream_id: u64) -> Result<Frame> {
        let frame_type = self.frame_type();
        let mut body = Vec::new();
        self.encode(&mut body)?;
        Ok(Frame::new(frame_type, flags, stream_id, body))
    }

    /// Decode the typed payload out of a received [`Frame`].
    ///
    /// # Errors
    ///
    /// Returns a [`crate::errors::ProtocolError`] if decoding the frame's
    /// payload bytes fails.
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        Self::decode(frame.frame_type, &frame.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_id::AgentId;

    #[test]
    fn stream_close_round_trips_through_a_frame() {
        let payload = Payload::StreamClose;
        let frame = payload.clone().into_frame(FrameFlags::empty(), 7).expect("encode");
        assert_eq!(frame.frame_type, FrameType::StreamClose);
        assert!(frame.payload.is_empty());
        assert_eq!(Payload::from_frame(&frame).expect("decode"), payload);
    }

    #[test]
    fn stream_data_round_trips_through_a_frame() {
        let payload = Payload::StreamData(Bytes::from_static(b"hello"));
        let frame = payload.clone().into_frame(FrameFlags::empty(), 7).expect("encode");
        assert_eq!(frame.frame_type, FrameType::StreamData);
        assert_eq!(frame.payload.as_ref(), b"hello");
        assert_eq!(Payload::from_frame(&frame).expect("decode"), payload);
    }

    #[test]
    fn peer_hello_ack_reuses_peer_hello_layout() {
        let hello = control::PeerHello::new(AgentId::from_bytes([1; 16]), 1, "a".to_owned(), vec![]);
        let payload = Payload::PeerHelloAck(hello.clone());
        let frame = payload.clone().into_frame(FrameFlags::empty(), 0).expect("encode");
        assert_eq!(frame.frame_type, FrameType::PeerHelloAck);
        assert_eq!(Payload::from_frame(&frame).expect("decode"), payload);

        let mut buf = Vec::new();
        hello.encode(&mut buf).expect("hello encodes");
        assert_eq!(frame.payload.as_ref(), &buf[..]);
    }

    #[test]
    fn keepalive_ack_reuses_keepalive_layout() {
        let ka = control::Keepalive { timestamp: 99 };
        let payload = Payload::KeepaliveAck(ka);
        let frame = payload.clone().into_frame(FrameFlags::empty(), 0).expect("encode");
        assert_eq!(frame.frame_type, FrameType::KeepaliveAck);
        assert_eq!(Payload::from_frame(&frame).expect("decode"), payload);
    }
}
