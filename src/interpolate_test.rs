use super::*;
use crate::test_support::troop;

fn at(id: &str, x: f64, y: f64) -> TroopView {
    let mut t = troop(id, "p1", 0, 0);
    t.position = Point::new(x, y);
    t
}

#[test]
fn first_sighting_appears_in_place() {
    let mut interp = Interpolator::new(0.2, 0.5);
    interp.sync(&[at("t1", 100.0, 40.0)]);
    let state = interp.state("t1").unwrap();
    assert_eq!(state.current, Point::new(100.0, 40.0));
    assert_eq!(state.target, Point::new(100.0, 40.0));
    assert!(interp.is_settled());
}

#[test]
fn moved_troop_is_retargeted_not_replaced() {
    let mut interp = Interpolator::new(0.2, 0.5);
    interp.sync(&[at("t1", 0.0, 0.0)]);
    interp.sync(&[at("t1", 100.0, 0.0)]);
    let state = interp.state("t1").unwrap();
    assert_eq!(state.current, Point::new(0.0, 0.0));
    assert_eq!(state.target, Point::new(100.0, 0.0));
}

#[test]
fn jitter_within_epsilon_does_not_retarget() {
    let mut interp = Interpolator::new(0.2, 0.5);
    interp.sync(&[at("t1", 10.0, 10.0)]);
    interp.sync(&[at("t1", 10.3, 9.8)]);
    assert_eq!(interp.state("t1").unwrap().target, Point::new(10.0, 10.0));
}

#[test]
fn step_covers_a_fixed_fraction_of_remaining_distance() {
    let mut interp = Interpolator::new(0.2, 0.5);
    interp.sync(&[at("t1", 0.0, 0.0)]);
    interp.sync(&[at("t1", 100.0, 0.0)]);
    assert!(interp.step());
    let x = interp.position("t1").unwrap().x;
    assert!((x - 20.0).abs() < 1e-9);
}

#[test]
fn converges_monotonically_without_overshoot_in_bounded_frames() {
    let mut interp = Interpolator::new(0.2, 0.5);
    interp.sync(&[at("t1", 0.0, 0.0)]);
    interp.sync(&[at("t1", 320.0, -160.0)]);

    let target = Point::new(320.0, -160.0);
    let mut last = interp.position("t1").unwrap().distance(target);
    let mut frames = 0;
    while interp.step() {
        let pos = interp.position("t1").unwrap();
        let d = pos.distance(target);
        assert!(d < last, "distance must strictly shrink");
        assert!(pos.x <= 320.0 && pos.y >= -160.0, "never past the target");
        last = d;
        frames += 1;
        assert!(frames < 60, "should converge well within a second of frames");
    }
    assert_eq!(interp.position("t1"), Some(target));
}

#[test]
fn mid_flight_retarget_is_chased_from_current_position() {
    let mut interp = Interpolator::new(0.2, 0.5);
    interp.sync(&[at("t1", 0.0, 0.0)]);
    interp.sync(&[at("t1", 100.0, 0.0)]);
    for _ in 0..3 {
        interp.step();
    }
    let before = interp.position("t1").unwrap();
    interp.sync(&[at("t1", 0.0, 100.0)]);
    assert_eq!(interp.position("t1"), Some(before));
    while interp.step() {}
    assert_eq!(interp.position("t1"), Some(Point::new(0.0, 100.0)));
}

#[test]
fn troops_missing_from_snapshot_are_dropped() {
    let mut interp = Interpolator::new(0.2, 0.5);
    interp.sync(&[at("t1", 0.0, 0.0), at("t2", 5.0, 5.0)]);
    interp.sync(&[at("t2", 5.0, 5.0)]);
    assert!(interp.state("t1").is_none());
    assert_eq!(interp.len(), 1);
}

#[test]
fn factor_of_one_snaps_immediately() {
    let mut interp = Interpolator::new(1.0, 0.5);
    interp.sync(&[at("t1", 0.0, 0.0)]);
    interp.sync(&[at("t1", 50.0, 50.0)]);
    assert!(!interp.step());
    assert_eq!(interp.position("t1"), Some(Point::new(50.0, 50.0)));
}
