//! The table of live rooms.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use pomosync_protocol::{ParticipantId, RoomId};

use crate::{RoomError, RoomState};

/// Maps room ids to their authoritative state.
///
/// Not synchronized: it is owned by the hub task and only touched from
/// there.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, RoomState>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new room. Fails if the id is already live; the existing
    /// room is left untouched.
    pub fn create(&mut self, room: RoomState) -> Result<&mut RoomState, RoomError> {
        match self.rooms.entry(room.room_id().clone()) {
            Entry::Occupied(entry) => Err(RoomError::DuplicateRoom(entry.key().clone())),
            Entry::Vacant(entry) => Ok(entry.insert(room)),
        }
    }

    pub fn get(&self, room_id: &RoomId) -> Result<&RoomState, RoomError> {
        self.rooms
            .get(room_id)
            .ok_or_else(|| RoomError::RoomNotFound(room_id.clone()))
    }

    pub fn get_mut(&mut self, room_id: &RoomId) -> Result<&mut RoomState, RoomError> {
        self.rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::RoomNotFound(room_id.clone()))
    }

    pub fn remove(&mut self, room_id: &RoomId) -> Option<RoomState> {
        self.rooms.remove(room_id)
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Ids of every room `participant` is currently in.
    pub fn rooms_with(&self, participant: ParticipantId) -> Vec<RoomId> {
        self.rooms
            .values()
            .filter(|room| room.contains(participant))
            .map(|room| room.room_id().clone())
            .collect()
    }
}
