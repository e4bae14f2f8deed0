//! Codec trait and implementations for serializing/deserializing frames.
//!
//! The gateway doesn't care how envelopes become bytes; it holds something
//! that implements [`Codec`]. [`JsonCodec`] is the only implementation and
//! is what browser clients speak.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ```rust
/// use pomosync_protocol::{ClientEnvelope, Codec, Command, JsonCodec, RoomId};
///
/// let codec = JsonCodec;
/// let frame = br#"{"seq":3,"payload":{"type":"start_timer","data":"R1"}}"#;
/// let envelope: ClientEnvelope = codec.decode(frame).unwrap();
///
/// assert_eq!(envelope.seq, 3);
/// assert_eq!(envelope.payload, Command::StartTimer(RoomId::from("R1")));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
