//! Reachable-cell preview for manual moves.
//!
//! DESIGN
//! ======
//! A plain breadth-first search over the four orthogonal neighbours. Every
//! step costs one cell, so BFS discovery order already yields the shortest
//! path length and no priority queue is needed. The resulting set is both the
//! drag preview and the submission gate: a destination outside it is never
//! sent to the server.

#[cfg(test)]
#[path = "planner_test.rs"]
mod planner_test;

use std::collections::{HashMap, VecDeque};

use crate::types::{GameSnapshot, GridCell};

/// Whole cells a troop may cover this turn. Fractional speeds are floored;
/// negative or non-finite speeds give no movement at all.
#[must_use]
pub fn speed_budget(speed: f64) -> u32 {
    if !speed.is_finite() || speed <= 0.0 {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let budget = speed.floor().min(f64::from(u32::MAX)) as u32;
    budget
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReachableSet {
    origin: GridCell,
    budget: u32,
    distances: HashMap<GridCell, u32>,
}

impl ReachableSet {
    #[must_use]
    pub fn origin(&self) -> GridCell {
        self.origin
    }

    #[must_use]
    pub fn budget(&self) -> u32 {
        self.budget
    }

    #[must_use]
    pub fn contains(&self, cell: GridCell) -> bool {
        self.distances.contains_key(&cell)
    }

    /// Steps needed to reach `cell`, if it is reachable at all.
    #[must_use]
    pub fn distance(&self, cell: GridCell) -> Option<u32> {
        self.distances.get(&cell).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Reachable cells in row-major order, origin included.
    #[must_use]
    pub fn cells(&self) -> Vec<GridCell> {
        let mut cells: Vec<GridCell> = self.distances.keys().copied().collect();
        cells.sort_unstable_by_key(|c| (c.y, c.x));
        cells
    }
}

/// Every cell reachable from `start` within `budget` steps through in-bounds,
/// passable terrain. The start cell is always a member at distance zero.
#[must_use]
pub fn reachable(snapshot: &GameSnapshot, start: GridCell, budget: u32) -> ReachableSet {
    let mut distances = HashMap::from([(start, 0)]);
    let mut frontier = VecDeque::from([start]);

    while let Some(cell) = frontier.pop_front() {
        let Some(&dist) = distances.get(&cell) else {
            continue;
        };
        if dist >= budget {
            continue;
        }
        for next in cell.neighbors() {
            if distances.contains_key(&next) || !snapshot.in_bounds(next) || snapshot.terrain.is_blocked(next) {
                continue;
            }
            distances.insert(next, dist + 1);
            frontier.push_back(next);
        }
    }

    ReachableSet { origin: start, budget, distances }
}
