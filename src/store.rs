//! Last known authoritative state.
//!
//! DESIGN
//! ======
//! The server is the only source of truth. Each snapshot replaces the
//! previous one outright; there is no merge path, so a dropped or reordered
//! delta can never leave the client in a state the server never had.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::HashMap;

use serde_json::Value;

use crate::types::{DashboardChannel, GameOver, GameSnapshot, PlayerView, RoomSummary};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Participant,
    Spectator,
}

/// What one game-over notification means for the local player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameOutcome {
    Win,
    Lose,
    /// Someone else won or was knocked out; the local result is unchanged.
    ThirdParty { player_id: String },
}

#[derive(Debug, Default)]
pub struct SnapshotStore {
    snapshot: Option<GameSnapshot>,
    self_id: Option<String>,
    outcome: Option<GameOutcome>,
    rooms: Vec<RoomSummary>,
    dashboard: HashMap<DashboardChannel, Value>,
}

impl SnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, snapshot: GameSnapshot) {
        self.snapshot = Some(snapshot);
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<&GameSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn set_self_id(&mut self, player_id: impl Into<String>) {
        self.self_id = Some(player_id.into());
    }

    #[must_use]
    pub fn self_id(&self) -> Option<&str> {
        self.self_id.as_deref()
    }

    /// Participant iff our identity is a key in the player map.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        let snapshot = self.snapshot.as_ref()?;
        let is_player = self
            .self_id
            .as_deref()
            .is_some_and(|id| snapshot.players.contains_key(id));
        Some(if is_player { Role::Participant } else { Role::Spectator })
    }

    #[must_use]
    pub fn me(&self) -> Option<&PlayerView> {
        self.snapshot.as_ref()?.players.get(self.self_id.as_deref()?)
    }

    #[must_use]
    pub fn is_my_turn(&self) -> bool {
        match (self.snapshot.as_ref(), self.self_id.as_deref()) {
            (Some(snapshot), Some(id)) => snapshot.is_turn_of(id),
            _ => false,
        }
    }

    /// Local verdict so far. Only a win or a loss is recorded here.
    #[must_use]
    pub fn outcome(&self) -> Option<&GameOutcome> {
        self.outcome.as_ref()
    }

    /// Resolve one game-over notification into exactly one outcome.
    ///
    /// A winner announcement is a win for us or a loss for every other
    /// participant; spectators see it as a third-party result. An
    /// elimination is a loss only when it names us.
    pub fn record_game_over(&mut self, over: &GameOver) -> Option<GameOutcome> {
        let me = self.self_id.as_deref();
        let participant = self.role() == Some(Role::Participant);
        let outcome = match (over.winner_id.as_deref(), over.eliminated_id.as_deref()) {
            (Some(winner), _) if Some(winner) == me => GameOutcome::Win,
            (Some(_), _) if participant => GameOutcome::Lose,
            (Some(winner), _) => GameOutcome::ThirdParty { player_id: winner.to_owned() },
            (None, Some(eliminated)) if Some(eliminated) == me => GameOutcome::Lose,
            (None, Some(eliminated)) => GameOutcome::ThirdParty { player_id: eliminated.to_owned() },
            (None, None) => return None,
        };
        if matches!(outcome, GameOutcome::Win | GameOutcome::Lose) {
            self.outcome = Some(outcome.clone());
        }
        Some(outcome)
    }

    pub fn set_rooms(&mut self, rooms: Vec<RoomSummary>) {
        self.rooms = rooms;
    }

    #[must_use]
    pub fn rooms(&self) -> &[RoomSummary] {
        &self.rooms
    }

    pub fn set_dashboard(&mut self, channel: DashboardChannel, payload: Value) {
        self.dashboard.insert(channel, payload);
    }

    #[must_use]
    pub fn dashboard(&self, channel: DashboardChannel) -> Option<&Value> {
        self.dashboard.get(&channel)
    }

    /// Drop game state. The local identity, lobby list, and dashboard feeds
    /// are connection-scoped and survive.
    pub fn clear_game(&mut self) {
        self.snapshot = None;
        self.outcome = None;
    }
}
