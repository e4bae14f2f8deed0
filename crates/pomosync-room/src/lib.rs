//! Shared timer rooms for Pomosync.
//!
//! A room is a countdown that several connections watch and control
//! together. The server never ticks: it records when a run started and
//! derives the live value on demand (see [`effective_remaining`]).
//!
//! # Key types
//!
//! - [`RoomState`] — one room's authoritative record
//! - [`machine`] — the stopped/running state machine ([`Control`], [`Transition`])
//! - [`presence`] — joining and leaving
//! - [`RoomRegistry`] — the table of live rooms
//! - [`SyncBroadcaster`] — fan-out to participants' outbound channels
//! - [`SyncService`] — applies client commands to all of the above
//! - [`HubHandle`] — talks to the single task that owns the service

mod broadcast;
mod clock;
mod config;
mod error;
mod hub;
pub mod machine;
pub mod presence;
mod registry;
mod service;
mod state;
mod timer;

pub use broadcast::{OutboundSender, SyncBroadcaster};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TimerConfig;
pub use error::RoomError;
pub use hub::{HubHandle, spawn_hub};
pub use machine::{Control, Transition};
pub use presence::Departure;
pub use registry::RoomRegistry;
pub use service::SyncService;
pub use state::RoomState;
pub use timer::effective_remaining;
