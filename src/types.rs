//! Game-state DTOs mirrored from the match server.
//!
//! DESIGN
//! ======
//! Field names follow the server's snake_case payloads so serde stays
//! lossless. Snapshots are plain data; everything derived from them
//! (interpolation, stacking, reachability) lives in its own module.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Milliseconds on the client's monotonic clock.
pub type Millis = u64;

/// Integer grid coordinate. `x` grows east, `y` grows south.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

impl GridCell {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The four orthogonal neighbours, in N/E/S/W order.
    #[must_use]
    pub fn neighbors(self) -> [Self; 4] {
        [
            Self::new(self.x, self.y - 1),
            Self::new(self.x + 1, self.y),
            Self::new(self.x, self.y + 1),
            Self::new(self.x - 1, self.y),
        ]
    }

    #[must_use]
    pub fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// A 2D point or offset in world (pixel) space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Linear interpolation from `self` toward `other` by `t` in `[0, 1]`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(self.x + (other.x - self.x) * t, self.y + (other.y - self.y) * t)
    }
}

/// Lifecycle of a room as reported by the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    #[default]
    Waiting,
    Playing,
    Ended,
}

/// How a player's troops move: dragged by hand, or advanced by the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementMode {
    #[default]
    Manual,
    Auto,
}

impl std::str::FromStr for MovementMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "manual" => Ok(Self::Manual),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown movement mode '{other}' (expected 'manual' or 'auto')")),
        }
    }
}

/// Whether a card lands on the grid or is aimed at an opponent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardPlay {
    #[default]
    Defensive,
    Offensive,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardView {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cost: u32,
    #[serde(default)]
    pub play: CardPlay,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub color: String,
    /// Grid cell of the player's base; fixes which quadrant they own.
    pub base_position: GridCell,
    #[serde(default)]
    pub base_hp: f64,
    #[serde(default)]
    pub eliminated: bool,
    #[serde(default)]
    pub hand: Vec<CardView>,
    #[serde(default)]
    pub elixir: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TroopView {
    /// Stable across snapshots; keys every derived per-troop structure.
    pub id: String,
    pub owner_id: String,
    pub cell: GridCell,
    /// Authoritative world position in pixels.
    pub position: Point,
    #[serde(default)]
    pub hp: f64,
    #[serde(default)]
    pub max_hp: f64,
    /// Cells per turn. Fractional values are floored by the move planner.
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub range: f64,
    #[serde(default)]
    pub card_kind: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terrain {
    #[serde(default)]
    pub blocked: HashSet<GridCell>,
    #[serde(default)]
    pub bridges: HashSet<GridCell>,
}

impl Terrain {
    /// A bridge spans otherwise blocked terrain, so it is always passable.
    #[must_use]
    pub fn is_blocked(&self, cell: GridCell) -> bool {
        self.blocked.contains(&cell) && !self.bridges.contains(&cell)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnInfo {
    pub current_player_id: Option<String>,
    #[serde(default)]
    pub turn_number: u32,
}

/// One complete authoritative game state. Replaced wholesale on every arrival.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub room_id: String,
    pub status: RoomStatus,
    /// Side length of the square map, in cells.
    pub grid_size: i32,
    #[serde(default)]
    pub players: HashMap<String, PlayerView>,
    #[serde(default)]
    pub troops: Vec<TroopView>,
    #[serde(default)]
    pub terrain: Terrain,
    #[serde(default)]
    pub turn: TurnInfo,
    #[serde(default)]
    pub moved_troop_ids: HashSet<String>,
}

impl GameSnapshot {
    #[must_use]
    pub fn in_bounds(&self, cell: GridCell) -> bool {
        (0..self.grid_size).contains(&cell.x) && (0..self.grid_size).contains(&cell.y)
    }

    #[must_use]
    pub fn troop(&self, troop_id: &str) -> Option<&TroopView> {
        self.troops.iter().find(|t| t.id == troop_id)
    }

    #[must_use]
    pub fn is_turn_of(&self, player_id: &str) -> bool {
        self.turn.current_player_id.as_deref() == Some(player_id)
    }
}

/// What the player asked to join. The last one sent drives auto-rejoin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinIntent {
    pub room_id: String,
    pub display_name: String,
    pub movement_mode: MovementMode,
}

impl JoinIntent {
    pub fn new(room_id: impl Into<String>, display_name: impl Into<String>, movement_mode: MovementMode) -> Self {
        Self { room_id: room_id.into(), display_name: display_name.into(), movement_mode }
    }
}

/// Row of the lobby room list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room_id: String,
    pub status: RoomStatus,
    #[serde(default)]
    pub players: u32,
    #[serde(default)]
    pub capacity: u32,
}

/// Server verdict at the end of a match or when a player drops out.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOver {
    #[serde(default)]
    pub winner_id: Option<String>,
    #[serde(default)]
    pub eliminated_id: Option<String>,
}

/// Transient combat notification. Only drives local effects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CombatEvent {
    Projectile { attacker_id: String, from: Point, to: Point },
    Melee { attacker_id: String, from: Point, to: Point },
    #[serde(other)]
    Unknown,
}

/// Opaque status feeds forwarded to the dashboard collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DashboardChannel {
    Ai,
    Training,
}

impl DashboardChannel {
    pub const ALL: [Self; 2] = [Self::Ai, Self::Training];

    #[must_use]
    pub fn syscall(self) -> &'static str {
        match self {
            Self::Ai => "ai:status",
            Self::Training => "training:status",
        }
    }
}
