//! Error types for the room layer.

use pomosync_protocol::RoomId;

/// Errors that can occur during room operations.
///
/// Only `create_room` and `join_room` surface these to the client (via
/// [`client_message`](Self::client_message)); every other command on a
/// failing room is a silent no-op.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// `create_room` named an id that is already live.
    #[error("room {0} already exists")]
    DuplicateRoom(RoomId),

    /// The room does not exist (never created, or emptied and deleted).
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// The hub task is gone or its command channel is closed.
    #[error("room hub is unavailable")]
    Unavailable,
}

impl RoomError {
    /// The string sent back in a failed acknowledgment. Carries no
    /// internal detail.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::DuplicateRoom(_) => "Room already exists",
            Self::RoomNotFound(_) => "Room not found",
            Self::Unavailable => "Server unavailable",
        }
    }
}
