//! Snapshot builders shared by unit tests.

use std::collections::HashMap;

use crate::types::{
    CardPlay, CardView, GameSnapshot, GridCell, Point, PlayerView, RoomStatus, Terrain, TroopView, TurnInfo,
};

pub const CELL_PX: f64 = 32.0;

pub fn cell_center(cell: GridCell) -> Point {
    Point::new(
        (f64::from(cell.x) + 0.5) * CELL_PX,
        (f64::from(cell.y) + 0.5) * CELL_PX,
    )
}

pub fn troop(id: &str, owner: &str, x: i32, y: i32) -> TroopView {
    let cell = GridCell::new(x, y);
    TroopView {
        id: id.to_owned(),
        owner_id: owner.to_owned(),
        cell,
        position: cell_center(cell),
        hp: 10.0,
        max_hp: 10.0,
        speed: 2.0,
        range: 1.0,
        card_kind: "knight".to_owned(),
    }
}

pub fn card(id: &str, play: CardPlay) -> CardView {
    CardView { id: id.to_owned(), name: id.to_owned(), cost: 3, play }
}

/// A player whose base sits in the middle of one map edge.
pub fn player(id: &str, base: GridCell) -> PlayerView {
    PlayerView {
        id: id.to_owned(),
        display_name: id.to_uppercase(),
        color: "#3498db".to_owned(),
        base_position: base,
        base_hp: 100.0,
        eliminated: false,
        hand: vec![card("archer", CardPlay::Defensive), card("fireball", CardPlay::Offensive)],
        elixir: 5.0,
    }
}

/// 10x10 playing snapshot with four players on the edge midpoints:
/// `p1` north, `p2` east, `p3` south, `p4` west. It is `p1`'s turn.
pub fn snapshot(room_id: &str, troops: Vec<TroopView>) -> GameSnapshot {
    let players = [
        player("p1", GridCell::new(5, 0)),
        player("p2", GridCell::new(9, 5)),
        player("p3", GridCell::new(4, 9)),
        player("p4", GridCell::new(0, 4)),
    ]
    .into_iter()
    .map(|p| (p.id.clone(), p))
    .collect::<HashMap<_, _>>();

    GameSnapshot {
        room_id: room_id.to_owned(),
        status: RoomStatus::Playing,
        grid_size: 10,
        players,
        troops,
        terrain: Terrain::default(),
        turn: TurnInfo { current_player_id: Some("p1".to_owned()), turn_number: 1 },
        moved_troop_ids: std::collections::HashSet::new(),
    }
}
