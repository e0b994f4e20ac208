//! Wire framing and payload codec for the overlay-mesh agent protocol.
//!
//! This crate is transport-agnostic: it turns typed payload values into
//! `Bytes` and back, and knows how to read/write length-delimited frames off
//! any [`tokio::io::AsyncRead`]/[`tokio::io::AsyncWrite`]. It does not dial
//! connections, route traffic, manage sleep state, or touch cryptographic key
//! material — those live in the agent crates built on top of it.

pub mod addr;
pub mod agent_id;
pub mod buffer;
pub mod error_code;
pub mod errors;
pub mod flags;
pub mod frame;
pub mod frame_type;
pub mod header;
pub mod payloads;
pub mod stream_io;

pub use addr::{Address, AddressType};
pub use agent_id::AgentId;
pub use error_code::ErrorCode;
pub use errors::{ProtocolError, Result};
pub use flags::FrameFlags;
pub use frame::Frame;
pub use frame_type::FrameType;
pub use header::{FrameHeader, CONTROL_STREAM_ID, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, PROTOCOL_VERSION};
pub use payloads::Payload;
pub use stream_io::{StreamReader, StreamWriter};
