//! Typed inbound/outbound messages over the frame envelope.
//!
//! SYSTEM CONTEXT
//! ==============
//! The transport hands us loosely-typed [`Frame`]s. Everything that crosses
//! into the controller goes through [`parse_inbound`] first, so malformed
//! payloads are rejected here and never reach the store.
//!
//! ERROR HANDLING
//! ==============
//! Parse failures are returned as [`ProtocolError`]; the caller logs and drops
//! the frame. A frame with status `error` is never a parse failure: it is the
//! server rejecting a request and surfaces as [`Inbound::Error`].

#[cfg(test)]
#[path = "protocol_test.rs"]
mod protocol_test;

use std::collections::HashSet;

use frames::{Frame, Status};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::types::{
    CombatEvent, DashboardChannel, GameOver, GameSnapshot, GridCell, JoinIntent, RoomSummary,
};

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown syscall: {0}")]
    UnknownSyscall(String),
    #[error("malformed {syscall} payload: {source}")]
    Payload {
        syscall: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid {syscall} payload: {reason}")]
    Invalid { syscall: String, reason: String },
}

/// A validated message from the server.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    SessionConnected { client_id: Option<String> },
    Snapshot(Box<GameSnapshot>),
    PlayerInfo { player_id: String },
    GameOver(GameOver),
    Error { syscall: String, message: String },
    RoomReset,
    RoomStatus(Vec<RoomSummary>),
    CombatEvents(Vec<CombatEvent>),
    Dashboard { channel: DashboardChannel, payload: Value },
}

/// Validate a decoded frame into a typed [`Inbound`] message.
///
/// # Errors
///
/// Returns [`ProtocolError`] for unknown syscalls, payloads that do not match
/// their schema, and snapshots that violate basic structural invariants.
pub fn parse_inbound(frame: &Frame) -> Result<Inbound, ProtocolError> {
    if frame.status == Status::Error {
        let message = frame.error_message().unwrap_or("request failed").to_owned();
        return Ok(Inbound::Error { syscall: frame.syscall.clone(), message });
    }

    let syscall = frame.syscall.as_str();
    match syscall {
        "session:connected" => Ok(Inbound::SessionConnected {
            client_id: frame.data.get("client_id").and_then(Value::as_str).map(str::to_owned),
        }),
        "game:state" => {
            let snapshot: GameSnapshot = from_data(syscall, &frame.data)?;
            validate_snapshot(&snapshot)?;
            Ok(Inbound::Snapshot(Box::new(snapshot)))
        }
        "player:info" => {
            let player_id = frame
                .data
                .get("player_id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| invalid(syscall, "missing player_id"))?;
            Ok(Inbound::PlayerInfo { player_id: player_id.to_owned() })
        }
        "game:over" => {
            let over: GameOver = from_data(syscall, &frame.data)?;
            if over.winner_id.is_none() && over.eliminated_id.is_none() {
                return Err(invalid(syscall, "neither winner_id nor eliminated_id present"));
            }
            Ok(Inbound::GameOver(over))
        }
        "room:reset" => Ok(Inbound::RoomReset),
        "room:status" => {
            let rooms = frame.data.get("rooms").cloned().unwrap_or(Value::Array(Vec::new()));
            Ok(Inbound::RoomStatus(from_data(syscall, &rooms)?))
        }
        "combat:events" => {
            let events = frame.data.get("events").cloned().unwrap_or(Value::Array(Vec::new()));
            Ok(Inbound::CombatEvents(from_data(syscall, &events)?))
        }
        "ai:status" => Ok(Inbound::Dashboard { channel: DashboardChannel::Ai, payload: frame.data.clone() }),
        "training:status" => {
            Ok(Inbound::Dashboard { channel: DashboardChannel::Training, payload: frame.data.clone() })
        }
        other => Err(ProtocolError::UnknownSyscall(other.to_owned())),
    }
}

fn from_data<T: DeserializeOwned>(syscall: &str, data: &Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data.clone())
        .map_err(|source| ProtocolError::Payload { syscall: syscall.to_owned(), source })
}

fn invalid(syscall: &str, reason: impl Into<String>) -> ProtocolError {
    ProtocolError::Invalid { syscall: syscall.to_owned(), reason: reason.into() }
}

fn validate_snapshot(snapshot: &GameSnapshot) -> Result<(), ProtocolError> {
    const SYSCALL: &str = "game:state";

    if snapshot.room_id.is_empty() {
        return Err(invalid(SYSCALL, "empty room_id"));
    }
    if snapshot.grid_size <= 0 {
        return Err(invalid(SYSCALL, format!("grid_size must be positive, got {}", snapshot.grid_size)));
    }
    let mut seen = HashSet::with_capacity(snapshot.troops.len());
    for troop in &snapshot.troops {
        if !seen.insert(troop.id.as_str()) {
            return Err(invalid(SYSCALL, format!("duplicate troop id {}", troop.id)));
        }
        if !snapshot.in_bounds(troop.cell) {
            return Err(invalid(SYSCALL, format!("troop {} outside the map", troop.id)));
        }
    }
    for (key, player) in &snapshot.players {
        if key != &player.id {
            return Err(invalid(SYSCALL, format!("player key {key} does not match id {}", player.id)));
        }
    }
    Ok(())
}

/// Where a deployed card goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeployTarget {
    Cell(GridCell),
    Player(String),
}

/// A request the client sends to the server.
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    JoinRoom(JoinIntent),
    ForceStart { room_id: String },
    DeployCard { room_id: String, card_id: String, target: DeployTarget },
    MoveTroop { room_id: String, troop_id: String, destination: GridCell },
    EndTurn { room_id: String },
    UpdateRoomSettings { room_id: String, settings: Value },
    RoomStatusQuery,
    StatusPoll(DashboardChannel),
}

impl Outbound {
    pub const MOVE_TROOP: &'static str = "troop:move";

    #[must_use]
    pub fn syscall(&self) -> &'static str {
        match self {
            Self::JoinRoom(_) => "room:join",
            Self::ForceStart { .. } => "room:start",
            Self::DeployCard { .. } => "card:deploy",
            Self::MoveTroop { .. } => Self::MOVE_TROOP,
            Self::EndTurn { .. } => "turn:end",
            Self::UpdateRoomSettings { .. } => "room:settings",
            Self::RoomStatusQuery => "room:status",
            Self::StatusPoll(channel) => channel.syscall(),
        }
    }

    #[must_use]
    pub fn room_id(&self) -> Option<&str> {
        match self {
            Self::JoinRoom(intent) => Some(&intent.room_id),
            Self::ForceStart { room_id }
            | Self::DeployCard { room_id, .. }
            | Self::MoveTroop { room_id, .. }
            | Self::EndTurn { room_id }
            | Self::UpdateRoomSettings { room_id, .. } => Some(room_id),
            Self::RoomStatusQuery | Self::StatusPoll(_) => None,
        }
    }

    #[must_use]
    pub fn to_frame(&self) -> Frame {
        let data = match self {
            Self::JoinRoom(intent) => json!({
                "room_id": intent.room_id,
                "display_name": intent.display_name,
                "movement_mode": intent.movement_mode,
            }),
            Self::ForceStart { room_id } | Self::EndTurn { room_id } => json!({ "room_id": room_id }),
            Self::DeployCard { room_id, card_id, target: DeployTarget::Cell(cell) } => json!({
                "room_id": room_id,
                "card_id": card_id,
                "cell": cell,
            }),
            Self::DeployCard { room_id, card_id, target: DeployTarget::Player(player_id) } => json!({
                "room_id": room_id,
                "card_id": card_id,
                "target_player_id": player_id,
            }),
            Self::MoveTroop { room_id, troop_id, destination } => json!({
                "room_id": room_id,
                "troop_id": troop_id,
                "destination": destination,
            }),
            Self::UpdateRoomSettings { room_id, settings } => json!({
                "room_id": room_id,
                "settings": settings,
            }),
            Self::RoomStatusQuery | Self::StatusPoll(_) => json!({}),
        };
        let frame = Frame::request(self.syscall(), data);
        match self.room_id() {
            Some(room_id) => frame.with_room_id(room_id),
            None => frame,
        }
    }
}
