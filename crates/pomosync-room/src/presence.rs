//! Membership of connections in rooms.

use pomosync_protocol::ParticipantId;

use crate::RoomState;

/// What a [`leave`] did to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// The participant was not in the room.
    NotMember,
    /// Removed; others remain.
    Left,
    /// Removed and the room has no one left. The caller must delete it.
    Emptied,
}

/// Adds `participant` under `username`.
///
/// Joining twice is not an error: the display name is replaced. Returns
/// `true` when the participant is new to the room.
pub fn join(room: &mut RoomState, participant: ParticipantId, username: String) -> bool {
    room.participants.insert(participant, username).is_none()
}

/// Removes `participant` and its display name together.
pub fn leave(room: &mut RoomState, participant: ParticipantId) -> Departure {
    if room.participants.remove(&participant).is_none() {
        return Departure::NotMember;
    }
    if room.is_empty() {
        Departure::Emptied
    } else {
        Departure::Left
    }
}
