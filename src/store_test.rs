use super::*;
use crate::test_support::{snapshot, troop};

fn store_as(self_id: &str) -> SnapshotStore {
    let mut store = SnapshotStore::new();
    store.set_self_id(self_id);
    store.replace(snapshot("room5", vec![troop("t1", "p1", 1, 1)]));
    store
}

fn winner(id: &str) -> GameOver {
    GameOver { winner_id: Some(id.to_owned()), eliminated_id: None }
}

fn eliminated(id: &str) -> GameOver {
    GameOver { winner_id: None, eliminated_id: Some(id.to_owned()) }
}

// =============================================================
// Reconciliation
// =============================================================

#[test]
fn replace_discards_previous_snapshot_entirely() {
    let mut store = store_as("p1");
    store.replace(snapshot("room5", vec![troop("t2", "p2", 3, 3)]));
    let snap = store.snapshot().unwrap();
    assert!(snap.troop("t1").is_none());
    assert!(snap.troop("t2").is_some());
}

#[test]
fn role_depends_on_player_map_membership() {
    assert_eq!(store_as("p1").role(), Some(Role::Participant));
    assert_eq!(store_as("watcher").role(), Some(Role::Spectator));
    assert_eq!(SnapshotStore::new().role(), None);
}

#[test]
fn is_my_turn_follows_current_player() {
    assert!(store_as("p1").is_my_turn());
    assert!(!store_as("p2").is_my_turn());
}

// =============================================================
// Game over
// =============================================================

#[test]
fn winner_notification_is_win_for_winner_and_loss_for_others() {
    let mut mine = store_as("p1");
    assert_eq!(mine.record_game_over(&winner("p1")), Some(GameOutcome::Win));
    assert_eq!(mine.outcome(), Some(&GameOutcome::Win));

    let mut theirs = store_as("p2");
    assert_eq!(theirs.record_game_over(&winner("p1")), Some(GameOutcome::Lose));
}

#[test]
fn third_party_elimination_leaves_local_outcome_alone() {
    let mut store = store_as("p1");
    assert_eq!(
        store.record_game_over(&eliminated("p3")),
        Some(GameOutcome::ThirdParty { player_id: "p3".to_owned() })
    );
    assert_eq!(store.outcome(), None);
}

#[test]
fn own_elimination_is_a_loss() {
    let mut store = store_as("p2");
    assert_eq!(store.record_game_over(&eliminated("p2")), Some(GameOutcome::Lose));
    assert_eq!(store.outcome(), Some(&GameOutcome::Lose));
}

#[test]
fn spectator_sees_winner_as_third_party() {
    let mut store = store_as("watcher");
    assert_eq!(
        store.record_game_over(&winner("p4")),
        Some(GameOutcome::ThirdParty { player_id: "p4".to_owned() })
    );
}

#[test]
fn clear_game_keeps_identity_and_lobby() {
    let mut store = store_as("p1");
    store.set_rooms(vec![RoomSummary {
        room_id: "room9".to_owned(),
        status: crate::types::RoomStatus::Waiting,
        players: 1,
        capacity: 4,
    }]);
    store.set_dashboard(DashboardChannel::Ai, serde_json::json!({"ok": true}));
    store.clear_game();
    assert!(store.snapshot().is_none());
    assert_eq!(store.self_id(), Some("p1"));
    assert_eq!(store.rooms().len(), 1);
    assert!(store.dashboard(DashboardChannel::Ai).is_some());
}
