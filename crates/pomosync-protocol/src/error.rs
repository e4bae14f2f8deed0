//! Error types for the protocol layer.
//!
//! A `ProtocolError` means a frame could not be turned into (or out of) a
//! typed message. It is always terminal for that one frame only.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown command tag, a
    /// payload of the wrong shape, or an unknown timer mode.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but violates a payload rule (empty room id,
    /// oversized username, ...).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
