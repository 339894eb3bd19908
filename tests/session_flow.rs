//! End-to-end controller scenarios driven through the public API only.

use frames::{Frame, Status};
use serde_json::{Value, json};
use skirmish::config::SyncConfig;
use skirmish::connection::{ConnectionState, DisconnectReason};
use skirmish::controller::{SyncController, SyncEvent};
use skirmish::guard::ActionError;
use skirmish::session::SessionPhase;
use skirmish::types::{GridCell, JoinIntent, MovementMode};
use tokio::sync::mpsc::{self, UnboundedReceiver};

fn controller() -> (SyncController, UnboundedReceiver<Frame>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SyncController::new(SyncConfig::default(), tx), rx)
}

fn push(syscall: &str, data: Value) -> Frame {
    let mut frame = Frame::request(syscall, data);
    frame.status = Status::Done;
    frame
}

fn snapshot(room_id: &str, moved: &[&str]) -> Frame {
    push(
        "game:state",
        json!({
            "room_id": room_id,
            "status": "playing",
            "grid_size": 10,
            "players": {
                "p1": { "id": "p1", "display_name": "Nova", "base_position": { "x": 5, "y": 0 } },
                "p2": { "id": "p2", "display_name": "Vega", "base_position": { "x": 9, "y": 5 } }
            },
            "troops": [
                { "id": "t1", "owner_id": "p1", "cell": { "x": 5, "y": 2 },
                  "position": { "x": 176.0, "y": 80.0 }, "speed": 3.0 }
            ],
            "turn": { "current_player_id": "p1", "turn_number": 4 },
            "moved_troop_ids": moved
        }),
    )
}

fn sent(rx: &mut UnboundedReceiver<Frame>) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

#[test]
fn transport_close_then_reconnect_rejoins_unprompted() {
    let (mut ctl, mut rx) = controller();
    ctl.on_connected(0);
    ctl.join_room(JoinIntent::new("room5", "Nova", MovementMode::Manual));
    assert_eq!(sent(&mut rx).len(), 1);

    ctl.on_disconnected(&DisconnectReason::TransportClose, 500);
    assert!(ctl.rejoin_armed());
    ctl.on_connected(1_500);

    let joins: Vec<Frame> = sent(&mut rx).into_iter().filter(|f| f.syscall == "room:join").collect();
    assert_eq!(joins.len(), 1);
    assert_eq!(joins[0].data["room_id"], "room5");
    assert_eq!(joins[0].data["display_name"], "Nova");
    assert_eq!(joins[0].room_id.as_deref(), Some("room5"));
}

#[test]
fn rejoin_after_mid_match_drop_is_confirmed_by_next_snapshot() {
    let (mut ctl, mut rx) = controller();
    ctl.on_connected(0);
    ctl.on_frame(&push("player:info", json!({ "player_id": "p1" })), 0);
    ctl.join_room(JoinIntent::new("room5", "Nova", MovementMode::Manual));
    ctl.on_frame(&snapshot("room5", &[]), 10);
    assert_eq!(ctl.phase(), &SessionPhase::Playing { room_id: "room5".to_owned() });

    ctl.on_disconnected(&DisconnectReason::PingTimeout, 100);
    assert_eq!(ctl.status(), ConnectionState::Reconnecting);
    ctl.on_connected(1_100);
    assert_eq!(ctl.phase(), &SessionPhase::Joining { room_id: "room5".to_owned() });
    sent(&mut rx);
    ctl.take_events();

    ctl.on_frame(&snapshot("room5", &[]), 1_200);
    assert!(ctl.take_events().contains(&SyncEvent::JoinConfirmed { room_id: "room5".to_owned() }));
    assert_eq!(ctl.phase(), &SessionPhase::Playing { room_id: "room5".to_owned() });
}

#[test]
fn rapid_drags_of_moved_troop_send_nothing() {
    let (mut ctl, mut rx) = controller();
    ctl.on_connected(0);
    ctl.on_frame(&push("player:info", json!({ "player_id": "p1" })), 0);
    ctl.join_room(JoinIntent::new("room5", "Nova", MovementMode::Manual));
    ctl.on_frame(&snapshot("room5", &["t1"]), 10);
    sent(&mut rx);

    for now in 20..60 {
        if ctl.begin_drag("t1", now).is_ok() {
            assert!(ctl.finish_drag(GridCell::new(5, 4)).is_err());
        }
        assert!(matches!(ctl.finish_drag(GridCell::new(5, 3)), Err(ActionError::NoDrag)));
    }
    assert!(sent(&mut rx).iter().all(|f| f.syscall != "troop:move"));
}
