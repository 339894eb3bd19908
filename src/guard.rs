//! Local preconditions for every player action.
//!
//! SYSTEM CONTEXT
//! ==============
//! The server re-validates everything, but a request it is going to reject
//! still costs a round trip and an error notice. These checks run first and
//! fail with an [`ActionError`] that never leaves the client.
//!
//! Placement geometry: the square map is split by its two diagonals into four
//! triangular quadrants. A player owns whichever quadrant their base sits in,
//! and [`is_legal_placement`] is the one predicate behind both the on-screen
//! zone overlay and the deploy gate, so the two cannot disagree.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use std::collections::HashSet;

use crate::planner::ReachableSet;
use crate::types::{CardPlay, CardView, GameSnapshot, GridCell, MovementMode, PlayerView, TroopView};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("no game in progress")]
    NoActiveGame,
    #[error("spectators cannot act")]
    Spectator,
    #[error("you have been eliminated")]
    Eliminated,
    #[error("not your turn")]
    NotYourTurn,
    #[error("troops move automatically in this room")]
    AutoMovement,
    #[error("unknown troop: {0}")]
    UnknownTroop(String),
    #[error("troop {0} belongs to another player")]
    NotYourTroop(String),
    #[error("troop {troop_id} has already moved this turn")]
    AlreadyMoved { troop_id: String },
    #[error("no troop is being dragged")]
    NoDrag,
    #[error("cell ({}, {}) is out of reach", .0.x, .0.y)]
    Unreachable(GridCell),
    #[error("troop is already on that cell")]
    NoOpMove,
    #[error("cell ({}, {}) is outside your deployment zone", .0.x, .0.y)]
    OutsideZone(GridCell),
    #[error("cell ({}, {}) is blocked", .0.x, .0.y)]
    BlockedCell(GridCell),
    #[error("card {0} is not in your hand")]
    UnknownCard(String),
    #[error("no card selected")]
    NoSelection,
    #[error("card {0} cannot be played that way")]
    WrongCardPlay(String),
    #[error("not choosing a target")]
    NotTargeting,
    #[error("{0} is not a valid target")]
    InvalidTarget(String),
    #[error("turn already ended")]
    TurnAlreadyEnded,
    #[error("not connected to server")]
    Offline,
}

/// One triangle of the map between the two diagonals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quadrant {
    North,
    East,
    South,
    West,
}

impl Quadrant {
    /// Quadrant containing `cell` on a `grid_size` square map. Cells lying
    /// exactly on a diagonal belong to nobody.
    #[must_use]
    pub fn of(cell: GridCell, grid_size: i32) -> Option<Self> {
        // Doubled offsets from the map centre keep odd and even sizes integral.
        let dx = i64::from(cell.x) * 2 - i64::from(grid_size - 1);
        let dy = i64::from(cell.y) * 2 - i64::from(grid_size - 1);
        let (ax, ay) = (dx.abs(), dy.abs());
        if ax == ay {
            None
        } else if ay > ax {
            Some(if dy < 0 { Self::North } else { Self::South })
        } else {
            Some(if dx < 0 { Self::West } else { Self::East })
        }
    }
}

#[must_use]
pub fn owned_quadrant(player: &PlayerView, grid_size: i32) -> Option<Quadrant> {
    Quadrant::of(player.base_position, grid_size)
}

fn placement_violation(snapshot: &GameSnapshot, player: &PlayerView, cell: GridCell) -> Option<ActionError> {
    let owned = owned_quadrant(player, snapshot.grid_size);
    if !snapshot.in_bounds(cell) || owned.is_none() || Quadrant::of(cell, snapshot.grid_size) != owned {
        return Some(ActionError::OutsideZone(cell));
    }
    if snapshot.terrain.is_blocked(cell) {
        return Some(ActionError::BlockedCell(cell));
    }
    None
}

/// Whether `player` may deploy onto `cell`, ignoring whose turn it is.
#[must_use]
pub fn is_legal_placement(snapshot: &GameSnapshot, player: &PlayerView, cell: GridCell) -> bool {
    placement_violation(snapshot, player, cell).is_none()
}

/// Every cell that passes [`is_legal_placement`], in row-major order.
#[must_use]
pub fn placement_zone(snapshot: &GameSnapshot, player: &PlayerView) -> Vec<GridCell> {
    (0..snapshot.grid_size)
        .flat_map(|y| (0..snapshot.grid_size).map(move |x| GridCell::new(x, y)))
        .filter(|&cell| is_legal_placement(snapshot, player, cell))
        .collect()
}

/// The local player, provided they are still in the game and it is their turn.
///
/// # Errors
///
/// [`ActionError::Spectator`], [`ActionError::Eliminated`], or
/// [`ActionError::NotYourTurn`].
pub fn acting_player<'a>(snapshot: &'a GameSnapshot, self_id: &str) -> Result<&'a PlayerView, ActionError> {
    let player = snapshot.players.get(self_id).ok_or(ActionError::Spectator)?;
    if player.eliminated {
        return Err(ActionError::Eliminated);
    }
    if !snapshot.is_turn_of(self_id) {
        return Err(ActionError::NotYourTurn);
    }
    Ok(player)
}

/// Gate for picking up a troop.
///
/// `submitted` holds moves already sent this turn that the server has not
/// yet reflected in its moved set.
///
/// # Errors
///
/// Any turn, ownership, or already-moved violation.
pub fn check_manual_move<'a>(
    snapshot: &'a GameSnapshot,
    self_id: &str,
    mode: MovementMode,
    troop_id: &str,
    submitted: &HashSet<String>,
) -> Result<&'a TroopView, ActionError> {
    if mode == MovementMode::Auto {
        return Err(ActionError::AutoMovement);
    }
    acting_player(snapshot, self_id)?;
    let troop = snapshot
        .troop(troop_id)
        .ok_or_else(|| ActionError::UnknownTroop(troop_id.to_owned()))?;
    if troop.owner_id != self_id {
        return Err(ActionError::NotYourTroop(troop_id.to_owned()));
    }
    if snapshot.moved_troop_ids.contains(troop_id) || submitted.contains(troop_id) {
        return Err(ActionError::AlreadyMoved { troop_id: troop_id.to_owned() });
    }
    Ok(troop)
}

/// Gate for dropping a troop on `destination`.
///
/// # Errors
///
/// [`ActionError::NoOpMove`] for the origin, [`ActionError::Unreachable`]
/// for anything outside the previewed set.
pub fn check_destination(reachable: &ReachableSet, destination: GridCell) -> Result<(), ActionError> {
    if destination == reachable.origin() {
        return Err(ActionError::NoOpMove);
    }
    if !reachable.contains(destination) {
        return Err(ActionError::Unreachable(destination));
    }
    Ok(())
}

fn card_in_hand<'a>(player: &'a PlayerView, card_id: &str) -> Result<&'a CardView, ActionError> {
    player
        .hand
        .iter()
        .find(|c| c.id == card_id)
        .ok_or_else(|| ActionError::UnknownCard(card_id.to_owned()))
}

/// Gate for deploying a defensive card onto the grid.
///
/// # Errors
///
/// Turn violations, a card not in hand or not defensive, or a cell outside
/// the player's zone.
pub fn check_placement<'a>(
    snapshot: &'a GameSnapshot,
    self_id: &str,
    card_id: &str,
    cell: GridCell,
) -> Result<&'a CardView, ActionError> {
    let player = acting_player(snapshot, self_id)?;
    let card = card_in_hand(player, card_id)?;
    if card.play != CardPlay::Defensive {
        return Err(ActionError::WrongCardPlay(card_id.to_owned()));
    }
    match placement_violation(snapshot, player, cell) {
        Some(err) => Err(err),
        None => Ok(card),
    }
}

/// Opponents an offensive card may be aimed at, ordered by id.
#[must_use]
pub fn opponent_targets<'a>(snapshot: &'a GameSnapshot, self_id: &str) -> Vec<&'a PlayerView> {
    let mut targets: Vec<&PlayerView> = snapshot
        .players
        .values()
        .filter(|p| p.id != self_id && !p.eliminated)
        .collect();
    targets.sort_unstable_by(|a, b| a.id.cmp(&b.id));
    targets
}

/// Gate for firing an offensive card at `target_id`.
///
/// # Errors
///
/// Turn violations, a card not in hand or not offensive, or a target that is
/// not a live opponent.
pub fn check_offensive<'a>(
    snapshot: &'a GameSnapshot,
    self_id: &str,
    card_id: &str,
    target_id: &str,
) -> Result<&'a CardView, ActionError> {
    let player = acting_player(snapshot, self_id)?;
    let card = card_in_hand(player, card_id)?;
    if card.play != CardPlay::Offensive {
        return Err(ActionError::WrongCardPlay(card_id.to_owned()));
    }
    if !opponent_targets(snapshot, self_id).iter().any(|p| p.id == target_id) {
        return Err(ActionError::InvalidTarget(target_id.to_owned()));
    }
    Ok(card)
}

/// Which card the player is holding and whether they are aiming it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CardSelection {
    #[default]
    Empty,
    Selected { card_id: String },
    /// Aiming an offensive card. `previous` is the card held before, which
    /// cancelling hands back.
    Targeting { card_id: String, previous: Option<String> },
}

impl CardSelection {
    /// Pick up `card`. Offensive cards go straight into target selection.
    pub fn select(&mut self, card: &CardView) {
        *self = match card.play {
            CardPlay::Defensive => Self::Selected { card_id: card.id.clone() },
            CardPlay::Offensive => {
                let previous = match self {
                    Self::Empty => None,
                    Self::Selected { card_id } => Some(card_id.clone()),
                    Self::Targeting { previous, .. } => previous.clone(),
                };
                Self::Targeting { card_id: card.id.clone(), previous }
            }
        };
    }

    /// Leave target selection, restoring whatever was held before it opened.
    ///
    /// # Errors
    ///
    /// [`ActionError::NotTargeting`] when no target selection is open.
    pub fn cancel_targeting(&mut self) -> Result<(), ActionError> {
        let Self::Targeting { previous, .. } = self else {
            return Err(ActionError::NotTargeting);
        };
        *self = match previous.take() {
            Some(card_id) => Self::Selected { card_id },
            None => Self::Empty,
        };
        Ok(())
    }

    /// The defensive card in hand, outside of target selection.
    #[must_use]
    pub fn held(&self) -> Option<&str> {
        match self {
            Self::Selected { card_id } => Some(card_id),
            Self::Empty | Self::Targeting { .. } => None,
        }
    }

    /// The offensive card being aimed, if target selection is open.
    #[must_use]
    pub fn aiming(&self) -> Option<&str> {
        match self {
            Self::Targeting { card_id, .. } => Some(card_id),
            Self::Empty | Self::Selected { .. } => None,
        }
    }

    /// Drop the selection if its card is no longer in `hand`.
    pub fn retain_in(&mut self, hand: &[CardView]) {
        let id = match self {
            Self::Empty => return,
            Self::Selected { card_id } | Self::Targeting { card_id, .. } => card_id.as_str(),
        };
        if !hand.iter().any(|c| c.id == id) {
            *self = Self::Empty;
        }
    }

    pub fn clear(&mut self) {
        *self = Self::Empty;
    }
}
