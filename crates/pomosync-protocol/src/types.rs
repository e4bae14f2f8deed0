//! Core protocol types for Pomosync's wire format.
//!
//! Every inbound command is a variant of [`Command`] with its own payload
//! shape, so a frame is either a fully typed command or a decode error at
//! the gateway. Nothing downstream ever sees an untyped body.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Longest room id a client may use, in bytes.
pub const MAX_ROOM_ID_LEN: usize = 64;

/// Longest display name a client may use, in bytes.
pub const MAX_USERNAME_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A client-chosen room name, e.g. `"study-hall"`.
///
/// Serialized as a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One live connection's identity inside a room.
///
/// Opaque to clients; a reconnecting browser gets a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TimerMode
// ---------------------------------------------------------------------------

/// The three timer presets. Each selects a fixed duration on reset or
/// mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    #[default]
    Pomodoro,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub const ALL: [TimerMode; 3] = [Self::Pomodoro, Self::ShortBreak, Self::LongBreak];

    /// The wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pomodoro => "pomodoro",
            Self::ShortBreak => "shortBreak",
            Self::LongBreak => "longBreak",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Full timer + presence state of a room, as a client should see it *now*.
///
/// `remaining_seconds` is already reconciled against wall-clock time.
/// `participant_usernames[i]` belongs to `participants[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub room_id: RoomId,
    pub mode: TimerMode,
    pub is_running: bool,
    pub remaining_seconds: u32,
    pub base_duration_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_at_epoch_ms: Option<u64>,
    pub participants: Vec<ParticipantId>,
    pub participant_usernames: Vec<String>,
}

/// Who is in a room. Sent on joins and departures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSnapshot {
    pub room_id: RoomId,
    pub participants: Vec<ParticipantId>,
    pub participant_usernames: Vec<String>,
}

// ---------------------------------------------------------------------------
// Inbound commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub room_id: RoomId,
    pub username: String,
    /// Initial countdown in seconds. Missing or non-positive falls back to
    /// the server's default duration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub room_id: RoomId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeChangeRequest {
    pub room_id: RoomId,
    pub mode: TimerMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustTimeRequest {
    pub room_id: RoomId,
    pub delta_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    /// Client wall clock in epoch milliseconds, echoed back verbatim.
    pub client_time: u64,
}

/// Everything a client can ask the server to do.
///
/// Adjacently tagged: `{"type": "mode_change", "data": {"roomId": "R1", "mode": "longBreak"}}`.
/// Commands that only name a room carry the bare id: `{"type": "start_timer", "data": "R1"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Command {
    /// Acknowledged.
    CreateRoom(CreateRoomRequest),
    /// Acknowledged.
    JoinRoom(JoinRoomRequest),
    LeaveRoom(RoomId),
    RequestSync(RoomId),
    StartTimer(RoomId),
    PauseTimer(RoomId),
    ResetTimer(RoomId),
    ModeChange(ModeChangeRequest),
    AdjustTime(AdjustTimeRequest),
    Heartbeat(HeartbeatRequest),
}

impl Command {
    /// The wire tag, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom(_) => "create_room",
            Self::JoinRoom(_) => "join_room",
            Self::LeaveRoom(_) => "leave_room",
            Self::RequestSync(_) => "request_sync",
            Self::StartTimer(_) => "start_timer",
            Self::PauseTimer(_) => "pause_timer",
            Self::ResetTimer(_) => "reset_timer",
            Self::ModeChange(_) => "mode_change",
            Self::AdjustTime(_) => "adjust_time",
            Self::Heartbeat(_) => "heartbeat",
        }
    }

    /// The room this command targets. `None` for connection-level commands.
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Self::CreateRoom(req) => Some(&req.room_id),
            Self::JoinRoom(req) => Some(&req.room_id),
            Self::LeaveRoom(id)
            | Self::RequestSync(id)
            | Self::StartTimer(id)
            | Self::PauseTimer(id)
            | Self::ResetTimer(id) => Some(id),
            Self::ModeChange(req) => Some(&req.room_id),
            Self::AdjustTime(req) => Some(&req.room_id),
            Self::Heartbeat(_) => None,
        }
    }

    /// Whether the sender is owed an [`Ack`] for this command.
    pub fn expects_ack(&self) -> bool {
        matches!(self, Self::CreateRoom(_) | Self::JoinRoom(_))
    }

    /// Checks payload rules that the type system can't express.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if let Some(room_id) = self.room_id() {
            validate_label("room id", room_id.as_str(), MAX_ROOM_ID_LEN)?;
        }
        match self {
            Self::CreateRoom(CreateRoomRequest { username, .. })
            | Self::JoinRoom(JoinRoomRequest { username, .. }) => {
                validate_label("username", username, MAX_USERNAME_LEN)
            }
            _ => Ok(()),
        }
    }
}

fn validate_label(what: &str, value: &str, max_len: usize) -> Result<(), ProtocolError> {
    if value.trim().is_empty() {
        return Err(ProtocolError::InvalidMessage(format!("{what} must not be empty")));
    }
    if value.len() > max_len {
        return Err(ProtocolError::InvalidMessage(format!(
            "{what} must be at most {max_len} bytes"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Outbound events
// ---------------------------------------------------------------------------

/// Reply to an acknowledged command (`create_room`, `join_room`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    /// The `seq` of the client envelope being answered.
    pub reply_to: u64,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<TimerSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Ack {
    pub fn success(reply_to: u64, state: TimerSnapshot) -> Self {
        Self {
            reply_to,
            ok: true,
            room_id: Some(state.room_id.clone()),
            state: Some(state),
            error: None,
        }
    }

    pub fn failure(reply_to: u64, error: impl Into<String>) -> Self {
        Self {
            reply_to,
            ok: false,
            room_id: None,
            state: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatAck {
    pub client_time: u64,
    pub server_time: u64,
}

/// Everything the server pushes to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Ack(Ack),
    TimerUpdate(TimerSnapshot),
    PresenceUpdate(PresenceSnapshot),
    HeartbeatAck(HeartbeatAck),
    /// The sender's frame was rejected before reaching any room.
    /// `code` follows HTTP conventions (400 = bad request).
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// A frame from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    /// Client-chosen correlation id, echoed in [`Ack::reply_to`].
    /// Optional on the wire for fire-and-forget commands.
    #[serde(default)]
    pub seq: u64,
    pub payload: Command,
}

/// A frame to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEnvelope {
    /// Per-connection outbound counter, starting at 1.
    pub seq: u64,
    /// Server wall clock (epoch milliseconds) when the frame was written.
    pub timestamp: u64,
    pub payload: ServerEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> TimerSnapshot {
        TimerSnapshot {
            room_id: RoomId::from("R1"),
            mode: TimerMode::Pomodoro,
            is_running: false,
            remaining_seconds: 1500,
            base_duration_seconds: 1500,
            start_at_epoch_ms: None,
            participants: vec![ParticipantId(1)],
            participant_usernames: vec!["Alice".into()],
        }
    }

    #[test]
    fn test_room_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&RoomId::from("study")).unwrap();
        assert_eq!(json, "\"study\"");
    }

    #[test]
    fn test_participant_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ParticipantId(42)).unwrap();
        assert_eq!(json, "42");
        assert_eq!(ParticipantId(42).to_string(), "p-42");
    }

    #[test]
    fn test_timer_mode_wire_names() {
        for mode in TimerMode::ALL {
            let json = serde_json::to_value(mode).unwrap();
            assert_eq!(json, mode.as_str());
        }
        assert_eq!(TimerMode::default(), TimerMode::Pomodoro);
    }

    #[test]
    fn test_unknown_timer_mode_is_rejected() {
        let result: Result<TimerMode, _> = serde_json::from_str("\"coffeeBreak\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_create_room_decodes_with_and_without_duration() {
        let with: Command = serde_json::from_str(
            r#"{"type":"create_room","data":{"roomId":"R1","username":"Alice","duration":600}}"#,
        )
        .unwrap();
        assert_eq!(
            with,
            Command::CreateRoom(CreateRoomRequest {
                room_id: RoomId::from("R1"),
                username: "Alice".into(),
                duration: Some(600),
            })
        );

        let without: Command = serde_json::from_str(
            r#"{"type":"create_room","data":{"roomId":"R1","username":"Alice"}}"#,
        )
        .unwrap();
        match without {
            Command::CreateRoom(req) => assert_eq!(req.duration, None),
            other => panic!("expected CreateRoom, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_room_id_commands_decode() {
        let cases = [
            ("leave_room", Command::LeaveRoom(RoomId::from("R1"))),
            ("request_sync", Command::RequestSync(RoomId::from("R1"))),
            ("start_timer", Command::StartTimer(RoomId::from("R1"))),
            ("pause_timer", Command::PauseTimer(RoomId::from("R1"))),
            ("reset_timer", Command::ResetTimer(RoomId::from("R1"))),
        ];
        for (tag, expected) in cases {
            let json = format!(r#"{{"type":"{tag}","data":"R1"}}"#);
            let cmd: Command = serde_json::from_str(&json).unwrap();
            assert_eq!(cmd.name(), tag);
            assert_eq!(cmd, expected);
        }
    }

    #[test]
    fn test_mode_change_and_adjust_time_decode_camel_case() {
        let cmd: Command = serde_json::from_str(
            r#"{"type":"mode_change","data":{"roomId":"R1","mode":"shortBreak"}}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::ModeChange(ModeChangeRequest {
                room_id: RoomId::from("R1"),
                mode: TimerMode::ShortBreak,
            })
        );

        let cmd: Command = serde_json::from_str(
            r#"{"type":"adjust_time","data":{"roomId":"R1","deltaSeconds":-60}}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::AdjustTime(AdjustTimeRequest {
                room_id: RoomId::from("R1"),
                delta_seconds: -60,
            })
        );
    }

    #[test]
    fn test_mode_change_with_unknown_mode_fails_to_decode() {
        let result: Result<Command, _> = serde_json::from_str(
            r#"{"type":"mode_change","data":{"roomId":"R1","mode":"nap"}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_command_tag_fails_to_decode() {
        let result: Result<Command, _> =
            serde_json::from_str(r#"{"type":"fly_to_moon","data":"R1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_client_envelope_seq_defaults_to_zero() {
        let env: ClientEnvelope =
            serde_json::from_str(r#"{"payload":{"type":"start_timer","data":"R1"}}"#).unwrap();
        assert_eq!(env.seq, 0);
    }

    #[test]
    fn test_command_room_id_and_ack_expectations() {
        let create = Command::CreateRoom(CreateRoomRequest {
            room_id: RoomId::from("R1"),
            username: "Alice".into(),
            duration: None,
        });
        assert!(create.expects_ack());
        assert_eq!(create.room_id(), Some(&RoomId::from("R1")));

        let start = Command::StartTimer(RoomId::from("R2"));
        assert!(!start.expects_ack());
        assert_eq!(start.room_id(), Some(&RoomId::from("R2")));

        let hb = Command::Heartbeat(HeartbeatRequest { client_time: 1 });
        assert!(!hb.expects_ack());
        assert_eq!(hb.room_id(), None);
    }

    #[test]
    fn test_validate_rejects_blank_and_oversized_labels() {
        let blank_room = Command::StartTimer(RoomId::from("   "));
        assert!(matches!(
            blank_room.validate(),
            Err(ProtocolError::InvalidMessage(_))
        ));

        let long_name = Command::JoinRoom(JoinRoomRequest {
            room_id: RoomId::from("R1"),
            username: "x".repeat(MAX_USERNAME_LEN + 1),
        });
        assert!(long_name.validate().is_err());

        let blank_name = Command::CreateRoom(CreateRoomRequest {
            room_id: RoomId::from("R1"),
            username: String::new(),
            duration: None,
        });
        assert!(blank_name.validate().is_err());

        let fine = Command::JoinRoom(JoinRoomRequest {
            room_id: RoomId::from("R1"),
            username: "Bob".into(),
        });
        assert!(fine.validate().is_ok());
    }

    #[test]
    fn test_timer_update_json_format() {
        let event = ServerEvent::TimerUpdate(TimerSnapshot {
            is_running: true,
            remaining_seconds: 1490,
            start_at_epoch_ms: Some(1_000),
            ..snapshot()
        });
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "timer_update");
        let data = &json["data"];
        assert_eq!(data["roomId"], "R1");
        assert_eq!(data["mode"], "pomodoro");
        assert_eq!(data["isRunning"], true);
        assert_eq!(data["remainingSeconds"], 1490);
        assert_eq!(data["baseDurationSeconds"], 1500);
        assert_eq!(data["startAtEpochMs"], 1_000);
        assert_eq!(data["participants"], serde_json::json!([1]));
        assert_eq!(data["participantUsernames"], serde_json::json!(["Alice"]));
    }

    #[test]
    fn test_stopped_snapshot_omits_start_at() {
        let json = serde_json::to_value(snapshot()).unwrap();
        assert!(json.get("startAtEpochMs").is_none());
    }

    #[test]
    fn test_presence_update_json_format() {
        let event = ServerEvent::PresenceUpdate(PresenceSnapshot {
            room_id: RoomId::from("R1"),
            participants: vec![ParticipantId(2)],
            participant_usernames: vec!["Bob".into()],
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "presence_update");
        assert_eq!(json["data"]["participants"], serde_json::json!([2]));
        assert_eq!(json["data"]["participantUsernames"], serde_json::json!(["Bob"]));
    }

    #[test]
    fn test_ack_success_and_failure_json_format() {
        let ok = serde_json::to_value(ServerEvent::Ack(Ack::success(7, snapshot()))).unwrap();
        assert_eq!(ok["type"], "ack");
        assert_eq!(ok["data"]["replyTo"], 7);
        assert_eq!(ok["data"]["ok"], true);
        assert_eq!(ok["data"]["roomId"], "R1");
        assert_eq!(ok["data"]["state"]["remainingSeconds"], 1500);
        assert!(ok["data"].get("error").is_none());

        let err =
            serde_json::to_value(ServerEvent::Ack(Ack::failure(8, "Room not found"))).unwrap();
        assert_eq!(err["data"]["ok"], false);
        assert_eq!(err["data"]["error"], "Room not found");
        assert!(err["data"].get("state").is_none());
    }

    #[test]
    fn test_error_event_json_format() {
        let json = serde_json::to_value(ServerEvent::Error {
            code: 400,
            message: "bad".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["data"]["code"], 400);
        assert_eq!(json["data"]["message"], "bad");
    }

    #[test]
    fn test_heartbeat_ack_json_format() {
        let json = serde_json::to_value(ServerEvent::HeartbeatAck(HeartbeatAck {
            client_time: 5,
            server_time: 9,
        }))
        .unwrap();
        assert_eq!(json["type"], "heartbeat_ack");
        assert_eq!(json["data"]["clientTime"], 5);
        assert_eq!(json["data"]["serverTime"], 9);
    }
}
