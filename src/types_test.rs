use super::*;

// =============================================================
// Geometry
// =============================================================

#[test]
fn neighbors_are_orthogonal_and_unit_distance() {
    let origin = GridCell::new(4, 4);
    for n in origin.neighbors() {
        assert_eq!(origin.manhattan(n), 1);
    }
}

#[test]
fn lerp_half_way_is_midpoint() {
    let mid = Point::new(0.0, 0.0).lerp(Point::new(10.0, -4.0), 0.5);
    assert_eq!(mid, Point::new(5.0, -2.0));
}

#[test]
fn bridge_overrides_blocked_terrain() {
    let cell = GridCell::new(2, 3);
    let mut terrain = Terrain::default();
    terrain.blocked.insert(cell);
    assert!(terrain.is_blocked(cell));
    terrain.bridges.insert(cell);
    assert!(!terrain.is_blocked(cell));
}

// =============================================================
// Serde
// =============================================================

#[test]
fn minimal_snapshot_fills_defaults() {
    let snap: GameSnapshot = serde_json::from_value(serde_json::json!({
        "room_id": "room7",
        "status": "waiting",
        "grid_size": 12
    }))
    .unwrap();
    assert_eq!(snap.room_id, "room7");
    assert_eq!(snap.status, RoomStatus::Waiting);
    assert!(snap.players.is_empty());
    assert!(snap.troops.is_empty());
    assert!(snap.moved_troop_ids.is_empty());
    assert_eq!(snap.turn, TurnInfo::default());
}

#[test]
fn terrain_cells_deserialize_from_arrays() {
    let terrain: Terrain = serde_json::from_value(serde_json::json!({
        "blocked": [{"x": 1, "y": 1}, {"x": 2, "y": 1}],
        "bridges": [{"x": 2, "y": 1}]
    }))
    .unwrap();
    assert!(terrain.is_blocked(GridCell::new(1, 1)));
    assert!(!terrain.is_blocked(GridCell::new(2, 1)));
}

#[test]
fn snapshot_in_bounds_checks_both_axes() {
    let snap: GameSnapshot = serde_json::from_value(serde_json::json!({
        "room_id": "r",
        "status": "playing",
        "grid_size": 3
    }))
    .unwrap();
    assert!(snap.in_bounds(GridCell::new(0, 2)));
    assert!(!snap.in_bounds(GridCell::new(3, 0)));
    assert!(!snap.in_bounds(GridCell::new(0, -1)));
}

#[test]
fn combat_event_unknown_kind_is_tolerated() {
    let event: CombatEvent = serde_json::from_value(serde_json::json!({"kind": "heal", "amount": 3})).unwrap();
    assert_eq!(event, CombatEvent::Unknown);
}

#[test]
fn combat_event_projectile_parses_points() {
    let event: CombatEvent = serde_json::from_value(serde_json::json!({
        "kind": "projectile",
        "attacker_id": "t1",
        "from": {"x": 0.0, "y": 0.0},
        "to": {"x": 32.0, "y": 16.0}
    }))
    .unwrap();
    assert!(matches!(event, CombatEvent::Projectile { ref attacker_id, .. } if attacker_id == "t1"));
}

#[test]
fn movement_mode_parses_lowercase_only() {
    assert_eq!("manual".parse::<MovementMode>(), Ok(MovementMode::Manual));
    assert_eq!("auto".parse::<MovementMode>(), Ok(MovementMode::Auto));
    assert!("Manual".parse::<MovementMode>().is_err());
}
