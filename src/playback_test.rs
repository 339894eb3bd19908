use std::f64::consts::FRAC_PI_2;

use super::*;

fn shot(attacker: &str, from: Point, to: Point) -> CombatEvent {
    CombatEvent::Projectile { attacker_id: attacker.to_owned(), from, to }
}

#[test]
fn projectile_flies_linearly_then_expires() {
    let mut playback = CombatPlayback::new(400, 800);
    playback.ingest(&[shot("t1", Point::new(0.0, 0.0), Point::new(100.0, 0.0))], 1_000);

    let at = |now| playback.positions(now).map(|(_, p)| p).collect::<Vec<_>>();
    assert_eq!(at(1_000), vec![Point::new(0.0, 0.0)]);
    assert_eq!(at(1_100), vec![Point::new(25.0, 0.0)]);
    assert_eq!(at(1_300), vec![Point::new(75.0, 0.0)]);
    assert!(at(1_400).is_empty());
}

#[test]
fn prune_removes_expired_projectiles() {
    let mut playback = CombatPlayback::new(400, 800);
    playback.ingest(&[shot("t1", Point::ZERO, Point::new(10.0, 10.0))], 0);
    playback.ingest(&[shot("t2", Point::ZERO, Point::new(10.0, 10.0))], 300);
    playback.prune(399);
    assert!(playback.is_active());
    playback.prune(400);
    assert_eq!(playback.positions(400).count(), 1);
    playback.prune(700);
    assert!(!playback.is_active());
}

#[test]
fn facing_follows_recent_aim_then_falls_back() {
    let mut playback = CombatPlayback::new(400, 800);
    playback.ingest(&[shot("t1", Point::new(5.0, 5.0), Point::new(5.0, 50.0))], 1_000);
    assert!((playback.facing("t1", 1_500) - FRAC_PI_2).abs() < 1e-9);
    assert!((playback.facing("t1", 1_800) - FRAC_PI_2).abs() < 1e-9);
    assert!((playback.facing("t1", 1_801) - DEFAULT_FACING).abs() < 1e-9);
    assert!((playback.facing("t9", 1_000) - DEFAULT_FACING).abs() < 1e-9);
}

#[test]
fn melee_updates_facing_without_spawning_projectile() {
    let mut playback = CombatPlayback::new(400, 800);
    playback.ingest(
        &[CombatEvent::Melee {
            attacker_id: "t1".to_owned(),
            from: Point::new(0.0, 0.0),
            to: Point::new(-10.0, 0.0),
        }],
        0,
    );
    assert!(!playback.is_active());
    assert!((playback.facing("t1", 10) - std::f64::consts::PI).abs() < 1e-9);
}

#[test]
fn unknown_events_are_ignored() {
    let mut playback = CombatPlayback::new(400, 800);
    playback.ingest(&[CombatEvent::Unknown], 0);
    assert!(!playback.is_active());
}
