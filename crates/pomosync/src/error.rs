//! Unified error type for Pomosync.

use pomosync_protocol::ProtocolError;
use pomosync_room::RoomError;
use pomosync_transport::TransportError;

/// Top-level error that wraps every layer's error.
///
/// The `#[from]` conversions let `?` lift transport, protocol and room
/// errors in server code without mapping each one by hand.
#[derive(Debug, thiserror::Error)]
pub enum PomosyncError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid payload).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (duplicate, not found, hub gone).
    #[error(transparent)]
    Room(#[from] RoomError),
}
