//! Wire protocol for Pomosync.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Types** ([`Command`], [`ServerEvent`], [`TimerSnapshot`], ...) —
//!   one typed variant per inbound command and outbound event.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how envelopes become
//!   bytes.
//! - **Mirror** ([`TimerMirror`]) — the client's advisory local countdown,
//!   reconciled from server snapshots.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (ClientEnvelope / ServerEnvelope) → Room core
//! ```

mod codec;
mod error;
mod mirror;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use mirror::TimerMirror;
pub use types::{
    Ack, AdjustTimeRequest, ClientEnvelope, Command, CreateRoomRequest, HeartbeatAck,
    HeartbeatRequest, JoinRoomRequest, MAX_ROOM_ID_LEN, MAX_USERNAME_LEN, ModeChangeRequest,
    ParticipantId, PresenceSnapshot, RoomId, ServerEnvelope, ServerEvent, TimerMode,
    TimerSnapshot,
};
