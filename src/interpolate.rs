//! Smooth troop motion between discrete snapshots.
//!
//! Snapshots arrive whenever the server feels like it; frames arrive at the
//! display's refresh rate. Each troop keeps a `current` render position that
//! chases the authoritative `target` by a fixed fraction per frame, so motion
//! looks the same whatever the network cadence, and a target that moves again
//! mid-flight is simply chased from wherever the troop is now.

#[cfg(test)]
#[path = "interpolate_test.rs"]
mod interpolate_test;

use std::collections::{HashMap, HashSet};

use crate::types::{Point, TroopView};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationState {
    pub current: Point,
    pub target: Point,
}

impl AnimationState {
    fn settled(&self) -> bool {
        self.current == self.target
    }
}

#[derive(Debug)]
pub struct Interpolator {
    factor: f64,
    epsilon: f64,
    states: HashMap<String, AnimationState>,
}

impl Interpolator {
    #[must_use]
    pub fn new(factor: f64, epsilon: f64) -> Self {
        Self { factor: factor.clamp(f64::MIN_POSITIVE, 1.0), epsilon: epsilon.abs(), states: HashMap::new() }
    }

    /// Align animation entries with the latest snapshot's troop list.
    ///
    /// New ids appear in place, moved ids are retargeted (never reset), and
    /// ids missing from the snapshot are dropped.
    pub fn sync(&mut self, troops: &[TroopView]) {
        let live: HashSet<&str> = troops.iter().map(|t| t.id.as_str()).collect();
        self.states.retain(|id, _| live.contains(id.as_str()));

        for troop in troops {
            match self.states.get_mut(&troop.id) {
                Some(state) => {
                    if state.target.distance(troop.position) > self.epsilon {
                        state.target = troop.position;
                    }
                }
                None => {
                    self.states.insert(
                        troop.id.clone(),
                        AnimationState { current: troop.position, target: troop.position },
                    );
                }
            }
        }
    }

    /// Advance every troop one frame. Returns whether anything is still moving.
    pub fn step(&mut self) -> bool {
        let mut moving = false;
        for state in self.states.values_mut() {
            if state.settled() {
                continue;
            }
            let next = state.current.lerp(state.target, self.factor);
            if next.distance(state.target) <= self.epsilon {
                state.current = state.target;
            } else {
                state.current = next;
                moving = true;
            }
        }
        moving
    }

    #[must_use]
    pub fn position(&self, troop_id: &str) -> Option<Point> {
        self.states.get(troop_id).map(|s| s.current)
    }

    #[must_use]
    pub fn state(&self, troop_id: &str) -> Option<&AnimationState> {
        self.states.get(troop_id)
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.states.values().all(AnimationState::settled)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}
