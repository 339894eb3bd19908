//! Single owner of all client-side sync state.
//!
//! SYSTEM CONTEXT
//! ==============
//! The runtime feeds three kinds of input into one [`SyncController`]:
//! transport events, decoded frames, and render ticks. User intents arrive
//! through the same object. Everything runs on one task, so components are
//! plain owned fields with no locking and no shared handles.
//!
//! ```text
//! transport ──▶ on_connected / on_disconnected / on_transport_error
//! frames    ──▶ on_frame ──▶ session ─▶ store ─▶ interpolator + stacks
//! user      ──▶ join_room / begin_drag / place_card / ... ──▶ guard ──▶ connection.send
//! clock     ──▶ tick ──▶ interpolator.step, playback/notices prune, status polls
//! ```
//!
//! ERROR HANDLING
//! ==============
//! Local precondition failures return [`ActionError`] and send nothing.
//! Malformed frames are logged and dropped. Server rejections become a
//! notice, and abort a pending join. Nothing here is fatal.

#[cfg(test)]
#[path = "controller_test.rs"]
mod controller_test;

use std::collections::HashSet;
use std::time::Duration;

use frames::Frame;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::connection::{ConnectionManager, ConnectionState, DisconnectReason};
use crate::guard::{self, ActionError, CardSelection};
use crate::interpolate::Interpolator;
use crate::notices::{Notice, NoticeQueue, Severity};
use crate::planner::{self, ReachableSet};
use crate::playback::{CombatPlayback, Projectile};
use crate::protocol::{DeployTarget, Inbound, Outbound, parse_inbound};
use crate::session::{SessionCoordinator, SessionPhase, SnapshotDisposition};
use crate::stack::StackLayout;
use crate::store::{GameOutcome, SnapshotStore};
use crate::types::{DashboardChannel, GameSnapshot, GridCell, JoinIntent, Millis, MovementMode, PlayerView, Point};

/// Shown once per outage, on the first failed connection attempt.
pub const CONNECT_FAILED_NOTICE: &str = "Failed to connect to server";

/// State changes worth telling an observer about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncEvent {
    Status(ConnectionState),
    Phase(SessionPhase),
    JoinConfirmed { room_id: String },
    JoinAborted { room_id: String, message: String },
    Rejoining { room_id: String },
    TurnChanged { player_id: Option<String>, turn_number: u32, mine: bool },
    Outcome(GameOutcome),
    RoomReset,
}

#[derive(Debug)]
struct Drag {
    troop_id: String,
    reachable: ReachableSet,
}

#[derive(Debug)]
pub struct SyncController {
    config: SyncConfig,
    connection: ConnectionManager,
    session: SessionCoordinator,
    store: SnapshotStore,
    interpolator: Interpolator,
    stacks: StackLayout,
    playback: CombatPlayback,
    notices: NoticeQueue,
    selection: CardSelection,
    drag: Option<Drag>,
    /// Moves sent this turn that the server has not echoed back yet.
    submitted_moves: HashSet<String>,
    /// Turn number for which `turn:end` was already sent.
    ended_turn: Option<u32>,
    next_poll_at: Option<Millis>,
    events: Vec<SyncEvent>,
}

impl SyncController {
    #[must_use]
    pub fn new(config: SyncConfig, tx: UnboundedSender<Frame>) -> Self {
        Self {
            connection: ConnectionManager::new(config.backoff, tx),
            session: SessionCoordinator::new(),
            store: SnapshotStore::new(),
            interpolator: Interpolator::new(config.lerp_factor, config.position_epsilon),
            stacks: StackLayout::default(),
            playback: CombatPlayback::new(config.projectile_lifetime_ms, config.aim_recency_ms),
            notices: NoticeQueue::new(config.notice_ttl_ms),
            selection: CardSelection::default(),
            drag: None,
            submitted_moves: HashSet::new(),
            ended_turn: None,
            next_poll_at: None,
            events: Vec::new(),
            config,
        }
    }

    // =========================================================================
    // Transport events
    // =========================================================================

    pub fn on_connected(&mut self, now: Millis) {
        self.connection.on_connected();
        info!("connected to server");
        self.events.push(SyncEvent::Status(ConnectionState::Connected));

        if let Some(intent) = self.session.take_rejoin() {
            info!(room_id = %intent.room_id, "replaying join after reconnect");
            self.events.push(SyncEvent::Rejoining { room_id: intent.room_id.clone() });
            if !self.connection.send(&Outbound::JoinRoom(intent)) {
                self.session.queue_rejoin();
            }
        }
        self.refresh_poll_schedule(now);
    }

    /// Returns the delay before the next attempt, or `None` for a deliberate
    /// disconnect that must not be retried.
    pub fn on_disconnected(&mut self, reason: &DisconnectReason, now: Millis) -> Option<Duration> {
        let delay = self.connection.on_disconnected(reason, now);
        let rejoin = self.session.on_disconnect();
        self.drag = None;
        self.next_poll_at = None;
        match delay {
            Some(delay) => {
                warn!(%reason, ?delay, rejoin, "disconnected; reconnect scheduled");
            }
            None => info!(%reason, "disconnected; not reconnecting"),
        }
        self.events.push(SyncEvent::Status(self.connection.state()));
        delay
    }

    /// A connection attempt failed. Returns the delay before the next one.
    pub fn on_transport_error(&mut self, now: Millis) -> Duration {
        let failure = self.connection.on_transport_error(now);
        if failure.first_failure {
            self.notices.push(CONNECT_FAILED_NOTICE, Severity::Error, now);
            self.events.push(SyncEvent::Status(self.connection.state()));
        }
        debug!(attempt = self.connection.attempt(), delay = ?failure.delay, "connect attempt failed");
        failure.delay
    }

    // =========================================================================
    // Inbound frames
    // =========================================================================

    pub fn on_frame(&mut self, frame: &Frame, now: Millis) {
        match parse_inbound(frame) {
            Ok(message) => self.apply(message, now),
            Err(e) => warn!(error = %e, syscall = %frame.syscall, "dropping malformed frame"),
        }
    }

    fn apply(&mut self, message: Inbound, now: Millis) {
        match message {
            Inbound::SessionConnected { client_id } => {
                debug!(client_id = ?client_id, "session established");
                self.connection.set_transport_id(client_id);
            }
            Inbound::PlayerInfo { player_id } => {
                debug!(%player_id, "local player identified");
                self.store.set_self_id(player_id);
            }
            Inbound::Snapshot(snapshot) => self.apply_snapshot(*snapshot, now),
            Inbound::GameOver(over) => {
                let Some(outcome) = self.store.record_game_over(&over) else {
                    return;
                };
                info!(outcome = ?outcome, "game over notification");
                // A declared winner ends the match for everyone, spectators included.
                if over.winner_id.is_some() || matches!(outcome, GameOutcome::Win | GameOutcome::Lose) {
                    let before = self.session.phase().clone();
                    self.session.on_game_over();
                    if *self.session.phase() != before {
                        self.events.push(SyncEvent::Phase(self.session.phase().clone()));
                    }
                }
                self.events.push(SyncEvent::Outcome(outcome));
            }
            Inbound::Error { syscall, message } => {
                warn!(%syscall, %message, "server rejected request");
                if let Some(intent) = self.session.abort_pending() {
                    let restored = self.session.phase().clone();
                    info!(room_id = %intent.room_id, phase = ?restored, "join aborted");
                    if restored == SessionPhase::PreJoin {
                        self.clear_game();
                    }
                    self.events.push(SyncEvent::JoinAborted { room_id: intent.room_id, message: message.clone() });
                    self.events.push(SyncEvent::Phase(restored));
                }
                if syscall == Outbound::MOVE_TROOP {
                    // The error does not say which troop; release every local lock
                    // and let the next snapshot's moved set decide.
                    self.submitted_moves.clear();
                }
                self.notices.push(message, Severity::Error, now);
            }
            Inbound::RoomReset => {
                info!("room reset by server");
                self.session.reset();
                self.clear_game();
                self.events.push(SyncEvent::RoomReset);
                self.refresh_poll_schedule(now);
            }
            Inbound::RoomStatus(rooms) => self.store.set_rooms(rooms),
            Inbound::CombatEvents(events) => self.playback.ingest(&events, now),
            Inbound::Dashboard { channel, payload } => self.store.set_dashboard(channel, payload),
        }
    }

    fn apply_snapshot(&mut self, snapshot: GameSnapshot, now: Millis) {
        let before = self.session.phase().clone();
        match self.session.on_snapshot(&snapshot.room_id, snapshot.status) {
            SnapshotDisposition::Stale => {
                debug!(room_id = %snapshot.room_id, "ignoring snapshot for another room");
                return;
            }
            SnapshotDisposition::Confirmed => {
                info!(room_id = %snapshot.room_id, "join confirmed");
                if self.store.snapshot().is_some_and(|prev| prev.room_id != snapshot.room_id) {
                    self.clear_game();
                }
                self.events.push(SyncEvent::JoinConfirmed { room_id: snapshot.room_id.clone() });
            }
            SnapshotDisposition::Accepted => {}
        }

        let turn_changed = self.store.snapshot().is_none_or(|prev| prev.turn != snapshot.turn);
        if turn_changed {
            self.submitted_moves.clear();
            let mine = self.store.self_id().is_some_and(|id| snapshot.is_turn_of(id));
            self.events.push(SyncEvent::TurnChanged {
                player_id: snapshot.turn.current_player_id.clone(),
                turn_number: snapshot.turn.turn_number,
                mine,
            });
        } else {
            // The server's moved set now covers what we sent.
            self.submitted_moves.retain(|id| !snapshot.moved_troop_ids.contains(id));
        }

        self.interpolator.sync(&snapshot.troops);
        self.stacks.recompute(&snapshot.troops);
        self.store.replace(snapshot);
        self.revalidate_interaction();

        let after = self.session.phase();
        if *after != before {
            debug!(phase = ?after, "session phase changed");
            self.events.push(SyncEvent::Phase(after.clone()));
        }
        self.refresh_poll_schedule(now);
    }

    /// Drop a held card or an active drag that the new snapshot invalidated,
    /// and rebuild the drag preview against the new terrain.
    fn revalidate_interaction(&mut self) {
        match self.store.me() {
            Some(me) => self.selection.retain_in(&me.hand),
            None => self.selection.clear(),
        }

        let Some(drag) = self.drag.take() else {
            return;
        };
        let (Some(snapshot), Some(self_id)) = (self.store.snapshot(), self.store.self_id()) else {
            return;
        };
        let mode = self.movement_mode();
        if let Ok(troop) = guard::check_manual_move(snapshot, self_id, mode, &drag.troop_id, &self.submitted_moves) {
            let reachable = planner::reachable(snapshot, troop.cell, planner::speed_budget(troop.speed));
            self.drag = Some(Drag { troop_id: drag.troop_id, reachable });
        } else {
            debug!(troop_id = %drag.troop_id, "drag cancelled by snapshot");
        }
    }

    fn clear_game(&mut self) {
        self.store.clear_game();
        self.interpolator.clear();
        self.stacks.clear();
        self.playback.clear();
        self.selection.clear();
        self.drag = None;
        self.submitted_moves.clear();
        self.ended_turn = None;
    }

    // =========================================================================
    // User intents
    // =========================================================================

    fn send(&self, request: &Outbound) -> Result<(), ActionError> {
        if self.connection.send(request) { Ok(()) } else { Err(ActionError::Offline) }
    }

    fn movement_mode(&self) -> MovementMode {
        self.session.intent().map_or(MovementMode::Manual, |intent| intent.movement_mode)
    }

    fn active_game(&self) -> Result<(&GameSnapshot, &str), ActionError> {
        let snapshot = self.store.snapshot().ok_or(ActionError::NoActiveGame)?;
        let self_id = self.store.self_id().ok_or(ActionError::Spectator)?;
        Ok((snapshot, self_id))
    }

    /// Join a room. Returns `true` if the request went out now, `false` if
    /// the link is down and the join was queued for the next connect.
    pub fn join_room(&mut self, intent: JoinIntent) -> bool {
        info!(room_id = %intent.room_id, display_name = %intent.display_name, "joining room");
        self.session.begin_join(intent.clone());
        self.events.push(SyncEvent::Phase(self.session.phase().clone()));
        if self.connection.send(&Outbound::JoinRoom(intent)) {
            true
        } else {
            self.session.queue_rejoin();
            false
        }
    }

    /// # Errors
    ///
    /// [`ActionError::NoActiveGame`] outside a room, [`ActionError::Offline`]
    /// when the link is down.
    pub fn force_start(&mut self) -> Result<(), ActionError> {
        let room_id = self.session.room_id().ok_or(ActionError::NoActiveGame)?.to_owned();
        self.send(&Outbound::ForceStart { room_id })
    }

    /// # Errors
    ///
    /// Turn violations, a repeated end for the same turn, or offline.
    pub fn end_turn(&mut self) -> Result<(), ActionError> {
        let (snapshot, self_id) = self.active_game()?;
        guard::acting_player(snapshot, self_id)?;
        let turn_number = snapshot.turn.turn_number;
        if self.ended_turn == Some(turn_number) {
            return Err(ActionError::TurnAlreadyEnded);
        }
        self.send(&Outbound::EndTurn { room_id: snapshot.room_id.clone() })?;
        self.ended_turn = Some(turn_number);
        self.drag = None;
        Ok(())
    }

    /// # Errors
    ///
    /// [`ActionError::NoActiveGame`] outside a room, [`ActionError::Offline`]
    /// when the link is down.
    pub fn update_room_settings(&mut self, settings: Value) -> Result<(), ActionError> {
        let room_id = self.session.room_id().ok_or(ActionError::NoActiveGame)?.to_owned();
        self.send(&Outbound::UpdateRoomSettings { room_id, settings })
    }

    /// # Errors
    ///
    /// [`ActionError::Offline`] when the link is down.
    pub fn request_room_status(&mut self) -> Result<(), ActionError> {
        self.send(&Outbound::RoomStatusQuery)
    }

    /// Pick up a troop and compute its move preview.
    ///
    /// # Errors
    ///
    /// Any [`guard::check_manual_move`] failure. An already-moved troop also
    /// raises a warning notice.
    pub fn begin_drag(&mut self, troop_id: &str, now: Millis) -> Result<&ReachableSet, ActionError> {
        let (snapshot, self_id) = self.active_game()?;
        let mode = self.movement_mode();
        let troop = match guard::check_manual_move(snapshot, self_id, mode, troop_id, &self.submitted_moves) {
            Ok(troop) => troop,
            Err(e) => {
                if matches!(e, ActionError::AlreadyMoved { .. }) {
                    self.notices.push(e.to_string(), Severity::Warning, now);
                }
                return Err(e);
            }
        };
        let reachable = planner::reachable(snapshot, troop.cell, planner::speed_budget(troop.speed));
        let drag = self.drag.insert(Drag { troop_id: troop_id.to_owned(), reachable });
        Ok(&drag.reachable)
    }

    /// Drop the dragged troop on `destination`. The drag ends either way.
    ///
    /// # Errors
    ///
    /// [`ActionError::NoDrag`], a destination outside the preview, a troop
    /// that is no longer movable, or offline.
    pub fn finish_drag(&mut self, destination: GridCell) -> Result<(), ActionError> {
        let drag = self.drag.take().ok_or(ActionError::NoDrag)?;
        let (snapshot, self_id) = self.active_game()?;
        guard::check_manual_move(snapshot, self_id, self.movement_mode(), &drag.troop_id, &self.submitted_moves)?;
        guard::check_destination(&drag.reachable, destination)?;

        self.send(&Outbound::MoveTroop {
            room_id: snapshot.room_id.clone(),
            troop_id: drag.troop_id.clone(),
            destination,
        })?;
        debug!(troop_id = %drag.troop_id, x = destination.x, y = destination.y, "move submitted");
        self.submitted_moves.insert(drag.troop_id);
        Ok(())
    }

    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    /// Pick a card from the local hand. Offensive cards open target selection.
    ///
    /// # Errors
    ///
    /// [`ActionError::NoActiveGame`], [`ActionError::Spectator`], or
    /// [`ActionError::UnknownCard`].
    pub fn select_card(&mut self, card_id: &str) -> Result<(), ActionError> {
        self.store.snapshot().ok_or(ActionError::NoActiveGame)?;
        let me = self.store.me().ok_or(ActionError::Spectator)?;
        let card = me
            .hand
            .iter()
            .find(|c| c.id == card_id)
            .ok_or_else(|| ActionError::UnknownCard(card_id.to_owned()))?;
        self.selection.select(card);
        Ok(())
    }

    /// Deploy the held defensive card onto `cell`.
    ///
    /// # Errors
    ///
    /// [`ActionError::NoSelection`] or any [`guard::check_placement`] failure.
    pub fn place_card(&mut self, cell: GridCell) -> Result<(), ActionError> {
        let card_id = self.selection.held().ok_or(ActionError::NoSelection)?;
        let (snapshot, self_id) = self.active_game()?;
        guard::check_placement(snapshot, self_id, card_id, cell)?;
        self.send(&Outbound::DeployCard {
            room_id: snapshot.room_id.clone(),
            card_id: card_id.to_owned(),
            target: DeployTarget::Cell(cell),
        })?;
        self.selection.clear();
        Ok(())
    }

    /// # Errors
    ///
    /// [`ActionError::NotTargeting`] when no target selection is open.
    pub fn cancel_targeting(&mut self) -> Result<(), ActionError> {
        self.selection.cancel_targeting()
    }

    /// Fire the offensive card being aimed at `player_id`.
    ///
    /// # Errors
    ///
    /// [`ActionError::NotTargeting`] or any [`guard::check_offensive`] failure.
    pub fn choose_target(&mut self, player_id: &str) -> Result<(), ActionError> {
        let card_id = self.selection.aiming().ok_or(ActionError::NotTargeting)?;
        let (snapshot, self_id) = self.active_game()?;
        guard::check_offensive(snapshot, self_id, card_id, player_id)?;
        self.send(&Outbound::DeployCard {
            room_id: snapshot.room_id.clone(),
            card_id: card_id.to_owned(),
            target: DeployTarget::Player(player_id.to_owned()),
        })?;
        self.selection.clear();
        Ok(())
    }

    // =========================================================================
    // Frame clock
    // =========================================================================

    /// Advance one render frame. Returns whether another frame is wanted.
    pub fn tick(&mut self, now: Millis) -> bool {
        self.interpolator.step();
        self.playback.prune(now);
        self.notices.prune(now);
        self.poll_status(now);
        self.needs_frames()
    }

    fn poll_status(&mut self, now: Millis) {
        let Some(due) = self.next_poll_at else {
            return;
        };
        if now < due {
            return;
        }
        if !self.connection.is_connected() || self.session.is_playing() {
            self.next_poll_at = None;
            return;
        }
        let mut sent = self.connection.send(&Outbound::RoomStatusQuery);
        for channel in DashboardChannel::ALL {
            sent &= self.connection.send(&Outbound::StatusPoll(channel));
        }
        if !sent {
            debug!("status poll not delivered");
        }
        self.next_poll_at = Some(now.saturating_add(self.config.status_poll_interval_ms));
    }

    /// Polls run only while connected and outside a live match.
    fn refresh_poll_schedule(&mut self, now: Millis) {
        if !self.connection.is_connected() || self.session.is_playing() {
            self.next_poll_at = None;
        } else if self.next_poll_at.is_none() {
            self.next_poll_at = Some(now);
        }
    }

    /// Whether anything on screen is still changing from frame to frame.
    #[must_use]
    pub fn needs_frames(&self) -> bool {
        self.drag.is_some() || !self.interpolator.is_settled() || self.playback.is_active()
    }

    /// When the runtime must call [`Self::tick`] next, if ever.
    #[must_use]
    pub fn next_deadline(&self, now: Millis) -> Option<Millis> {
        if self.needs_frames() {
            return Some(now.saturating_add(self.config.frame_interval_ms));
        }
        [self.next_poll_at, self.notices.next_expiry()].into_iter().flatten().min()
    }

    pub fn take_events(&mut self) -> Vec<SyncEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // Presentation accessors
    // =========================================================================

    #[must_use]
    pub fn status(&self) -> ConnectionState {
        self.connection.state()
    }

    #[must_use]
    pub fn phase(&self) -> &SessionPhase {
        self.session.phase()
    }

    #[must_use]
    pub fn rejoin_armed(&self) -> bool {
        self.session.rejoin_armed()
    }

    #[must_use]
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<&GameSnapshot> {
        self.store.snapshot()
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&GameOutcome> {
        self.store.outcome()
    }

    #[must_use]
    pub fn is_my_turn(&self) -> bool {
        self.store.is_my_turn()
    }

    /// Interpolated on-screen position, before any stack offset.
    #[must_use]
    pub fn render_position(&self, troop_id: &str) -> Option<Point> {
        self.interpolator.position(troop_id)
    }

    #[must_use]
    pub fn stack_offset(&self, troop_id: &str) -> Point {
        self.stacks.offset(troop_id)
    }

    /// Preview of the troop being dragged.
    #[must_use]
    pub fn reachable(&self) -> Option<&ReachableSet> {
        self.drag.as_ref().map(|d| &d.reachable)
    }

    #[must_use]
    pub fn dragging(&self) -> Option<&str> {
        self.drag.as_ref().map(|d| d.troop_id.as_str())
    }

    #[must_use]
    pub fn selection(&self) -> &CardSelection {
        &self.selection
    }

    /// Legal deploy cells for the held defensive card. Empty when no card is held.
    #[must_use]
    pub fn placement_zone(&self) -> Vec<GridCell> {
        match (self.selection.held(), self.store.snapshot(), self.store.me()) {
            (Some(_), Some(snapshot), Some(me)) => guard::placement_zone(snapshot, me),
            _ => Vec::new(),
        }
    }

    /// Opponents selectable while aiming an offensive card.
    #[must_use]
    pub fn targets(&self) -> Vec<&PlayerView> {
        match (self.selection.aiming(), self.store.snapshot(), self.store.self_id()) {
            (Some(_), Some(snapshot), Some(self_id)) => guard::opponent_targets(snapshot, self_id),
            _ => Vec::new(),
        }
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn projectiles(&self, now: Millis) -> impl Iterator<Item = (&Projectile, Point)> {
        self.playback.positions(now)
    }

    #[must_use]
    pub fn facing(&self, troop_id: &str, now: Millis) -> f64 {
        self.playback.facing(troop_id, now)
    }
}
