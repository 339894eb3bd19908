//! Room membership state machine and transparent rejoin.
//!
//! SYSTEM CONTEXT
//! ==============
//! One explicit phase replaces the usual pile of `pending`/`joined`/`lobby`
//! booleans:
//!
//! ```text
//! PreJoin ──join──▶ Joining ──snapshot(room == target)──▶ InRoom ⇄ Playing ──▶ Ended
//!    ▲                 │
//!    └──server error───┘            (room reset from any phase ──▶ PreJoin)
//! ```
//!
//! A server error sends `Joining` back to whatever phase the join started
//! from, so a failed room switch leaves the player in their current room.
//! A rejected rejoin has nothing to go back to and lands in `PreJoin`.
//!
//! A join is confirmed only by a snapshot for the pending room, never by
//! whatever frame happens to arrive next. Losing the link while in a room
//! arms a single replay of the last [`JoinIntent`] for the next connect.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use crate::types::{JoinIntent, RoomStatus};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    PreJoin,
    Joining { room_id: String },
    InRoom { room_id: String },
    Playing { room_id: String },
    Ended { room_id: String },
}

impl SessionPhase {
    #[must_use]
    pub fn room_id(&self) -> Option<&str> {
        match self {
            Self::PreJoin => None,
            Self::Joining { room_id }
            | Self::InRoom { room_id }
            | Self::Playing { room_id }
            | Self::Ended { room_id } => Some(room_id),
        }
    }

    fn for_status(room_id: String, status: RoomStatus) -> Self {
        match status {
            RoomStatus::Waiting => Self::InRoom { room_id },
            RoomStatus::Playing => Self::Playing { room_id },
            RoomStatus::Ended => Self::Ended { room_id },
        }
    }
}

/// What the coordinator made of an arriving snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotDisposition {
    /// The snapshot completed the pending join.
    Confirmed,
    /// A routine update for the room we are in.
    Accepted,
    /// Belongs to some other room; must not touch local state.
    Stale,
}

#[derive(Debug, Default)]
pub struct SessionCoordinator {
    phase: SessionPhase,
    /// Phase to restore if the pending join is rejected.
    before_join: SessionPhase,
    pending: Option<JoinIntent>,
    confirmed: Option<JoinIntent>,
    rejoin_armed: bool,
}

impl SessionCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// The in-flight join if there is one, otherwise the last confirmed one.
    #[must_use]
    pub fn intent(&self) -> Option<&JoinIntent> {
        self.pending.as_ref().or(self.confirmed.as_ref())
    }

    #[must_use]
    pub fn room_id(&self) -> Option<&str> {
        self.phase.room_id()
    }

    #[must_use]
    pub fn is_joining(&self) -> bool {
        matches!(self.phase, SessionPhase::Joining { .. })
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        matches!(self.phase, SessionPhase::Playing { .. })
    }

    #[must_use]
    pub fn rejoin_armed(&self) -> bool {
        self.rejoin_armed
    }

    /// Capture the intent and enter `Joining`. The caller sends the request.
    pub fn begin_join(&mut self, intent: JoinIntent) {
        if !self.is_joining() {
            self.before_join = self.phase.clone();
        }
        self.phase = SessionPhase::Joining { room_id: intent.room_id.clone() };
        self.pending = Some(intent);
    }

    /// Arm a replay for the next successful connect. Used when a join is
    /// requested while the link is down.
    pub fn queue_rejoin(&mut self) {
        if self.intent().is_some() {
            self.rejoin_armed = true;
        }
    }

    pub fn on_snapshot(&mut self, room_id: &str, status: RoomStatus) -> SnapshotDisposition {
        let disposition = match &self.phase {
            SessionPhase::Joining { room_id: target } if target == room_id => SnapshotDisposition::Confirmed,
            SessionPhase::InRoom { room_id: current }
            | SessionPhase::Playing { room_id: current }
            | SessionPhase::Ended { room_id: current }
                if current == room_id =>
            {
                SnapshotDisposition::Accepted
            }
            _ => return SnapshotDisposition::Stale,
        };

        if disposition == SnapshotDisposition::Confirmed {
            self.confirmed = self.pending.take();
            self.before_join = SessionPhase::PreJoin;
        }
        self.phase = SessionPhase::for_status(room_id.to_owned(), status);
        disposition
    }

    /// A server error while joining cancels the join and restores the phase
    /// held before it. Returns the abandoned intent, or `None` when no join
    /// was pending.
    pub fn abort_pending(&mut self) -> Option<JoinIntent> {
        if !self.is_joining() {
            return None;
        }
        self.phase = std::mem::take(&mut self.before_join);
        self.rejoin_armed = false;
        self.pending.take()
    }

    pub fn on_game_over(&mut self) {
        if let Some(room_id) = self.room_id() {
            self.phase = SessionPhase::Ended { room_id: room_id.to_owned() };
        }
    }

    /// Returns whether a rejoin was armed.
    pub fn on_disconnect(&mut self) -> bool {
        if self.phase != SessionPhase::PreJoin && self.intent().is_some() {
            self.rejoin_armed = true;
        }
        self.rejoin_armed
    }

    /// Consume the armed rejoin, if any, re-entering `Joining` for it.
    pub fn take_rejoin(&mut self) -> Option<JoinIntent> {
        if !std::mem::take(&mut self.rejoin_armed) {
            return None;
        }
        let intent = self.intent()?.clone();
        self.begin_join(intent.clone());
        // The server dropped us; a refused rejoin has no room to fall back to.
        self.before_join = SessionPhase::PreJoin;
        Some(intent)
    }

    /// Forget everything: phase, intents, and any armed rejoin.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
