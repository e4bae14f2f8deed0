//! Terminal client for a shared Pomodoro room.
//!
//! Creates or joins a room, prints the countdown once a second from a
//! local [`TimerMirror`], and keeps it honest with periodic heartbeats and
//! sync requests. Ctrl-C leaves the room.
//!
//! ```not_rust
//! cargo run -p focus-client -- --room study --name Alice --create --start
//! cargo run -p focus-client -- --room study --name Bob
//! ```

use std::time::Duration;

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use pomosync::protocol::{
    ClientEnvelope, Codec, Command, CreateRoomRequest, HeartbeatRequest, JoinRoomRequest,
    JsonCodec, RoomId, ServerEnvelope, ServerEvent, TimerMirror,
};
use pomosync::room::{Clock, SystemClock};
use pomosync::{PomosyncError, init_logging};
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser, Debug)]
#[command(name = "focus-client")]
#[command(about = "Join a shared Pomodoro room from the terminal", long_about = None)]
struct Args {
    /// Server URL
    #[arg(short, long, default_value = "ws://127.0.0.1:5000")]
    url: String,

    /// Room to create or join
    #[arg(short, long)]
    room: String,

    /// Display name
    #[arg(short, long)]
    name: String,

    /// Create the room instead of joining it
    #[arg(long)]
    create: bool,

    /// Start the timer once in the room
    #[arg(long)]
    start: bool,
}

const HEARTBEAT_EVERY: Duration = Duration::from_secs(10);
const SYNC_EVERY: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    init_logging(env!("CARGO_BIN_NAME"), "info");
    let args = Args::parse();

    if let Err(e) = run(args).await {
        tracing::error!(error = %e, "client error");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let (ws, _) = tokio_tungstenite::connect_async(args.url.as_str()).await?;
    let (mut sink, mut stream) = ws.split();
    let codec = JsonCodec;
    let room_id = RoomId::from(args.room.as_str());
    let mut mirror = TimerMirror::new(room_id.clone());
    let mut seq = 0;

    let enter = if args.create {
        Command::CreateRoom(CreateRoomRequest {
            room_id: room_id.clone(),
            username: args.name.clone(),
            duration: None,
        })
    } else {
        Command::JoinRoom(JoinRoomRequest {
            room_id: room_id.clone(),
            username: args.name.clone(),
        })
    };
    sink.send(frame(&codec, &mut seq, enter)?).await?;
    sink.send(frame(&codec, &mut seq, heartbeat())?).await?;
    if args.start {
        sink.send(frame(&codec, &mut seq, Command::StartTimer(room_id.clone()))?).await?;
    }

    let mut repaint = tokio::time::interval(Duration::from_secs(1));
    let mut heartbeat_timer = tokio::time::interval(HEARTBEAT_EVERY);
    let mut sync_timer = tokio::time::interval(SYNC_EVERY);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                sink.send(frame(&codec, &mut seq, Command::LeaveRoom(room_id.clone()))?).await?;
                sink.close().await?;
                println!("left {room_id}");
                return Ok(());
            }
            msg = stream.next() => {
                let Some(msg) = msg else {
                    println!("server closed the connection");
                    return Ok(());
                };
                let msg = msg?;
                if !(msg.is_text() || msg.is_binary()) {
                    continue;
                }
                let envelope: ServerEnvelope = codec.decode(&msg.into_data())?;
                report(&envelope);
                mirror.apply(&envelope, SystemClock.now_ms());
            }
            _ = repaint.tick() => {
                let now = SystemClock.now_ms();
                if let Some(remaining) = mirror.remaining_at(now) {
                    let mode = mirror.mode().map(|m| m.as_str()).unwrap_or("-");
                    let state = if mirror.is_running_at(now) { "running" } else { "paused" };
                    println!("[{room_id}] {mode} {} {state}", format_clock(remaining));
                }
            }
            _ = heartbeat_timer.tick() => {
                sink.send(frame(&codec, &mut seq, heartbeat())?).await?;
            }
            _ = sync_timer.tick() => {
                sink.send(frame(&codec, &mut seq, Command::RequestSync(room_id.clone()))?).await?;
            }
        }
    }
}

fn frame(codec: &JsonCodec, seq: &mut u64, command: Command) -> Result<Message, PomosyncError> {
    *seq += 1;
    let bytes = codec.encode(&ClientEnvelope {
        seq: *seq,
        payload: command,
    })?;
    Ok(Message::text(String::from_utf8_lossy(&bytes).into_owned()))
}

fn heartbeat() -> Command {
    Command::Heartbeat(HeartbeatRequest {
        client_time: SystemClock.now_ms(),
    })
}

/// Prints the events a user would want to know about.
fn report(envelope: &ServerEnvelope) {
    match &envelope.payload {
        ServerEvent::Ack(ack) if !ack.ok => {
            println!("rejected: {}", ack.error.as_deref().unwrap_or("unknown error"));
        }
        ServerEvent::PresenceUpdate(presence) => {
            println!("in room: {}", presence.participant_usernames.join(", "));
        }
        ServerEvent::Error { code, message } => println!("error {code}: {message}"),
        _ => {}
    }
}

fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(1500), "25:00");
        assert_eq!(format_clock(61), "01:01");
        assert_eq!(format_clock(0), "00:00");
    }

    #[test]
    fn test_frames_carry_increasing_seq() {
        let mut seq = 0;
        let codec = JsonCodec;
        let first = frame(&codec, &mut seq, Command::StartTimer(RoomId::from("R1"))).unwrap();
        let second = frame(&codec, &mut seq, Command::PauseTimer(RoomId::from("R1"))).unwrap();

        let first: ClientEnvelope = codec.decode(&first.into_data()).unwrap();
        let second: ClientEnvelope = codec.decode(&second.into_data()).unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
        assert_eq!(second.payload, Command::PauseTimer(RoomId::from("R1")));
    }

    #[test]
    fn test_heartbeat_carries_wall_clock_time() {
        let before = SystemClock.now_ms();
        match heartbeat() {
            Command::Heartbeat(request) => assert!(request.client_time >= before),
            other => panic!("expected heartbeat, got {other:?}"),
        }
    }
}
