//! Fan-out offsets for troops sharing a grid cell.

#[cfg(test)]
#[path = "stack_test.rs"]
mod stack_test;

use std::collections::{BTreeMap, HashMap};
use std::f64::consts::TAU;

use crate::types::{GridCell, Point, TroopView};

const MAX_RADIUS: f64 = 14.0;

/// Ring radius for `n` troops in one cell.
#[must_use]
pub fn stack_radius(n: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let n = n as f64;
    MAX_RADIUS.min(5.0 + n.sqrt() * 3.0)
}

/// Offsets for every troop in a multi-occupant cell, keyed by troop id.
///
/// Members are ordered by id before placement, so the result depends only on
/// which troops share a cell and never on snapshot ordering. Singleton cells
/// get no entry.
#[must_use]
pub fn resolve_offsets(troops: &[TroopView]) -> HashMap<String, Point> {
    let mut cells: BTreeMap<GridCell, Vec<&str>> = BTreeMap::new();
    for troop in troops {
        cells.entry(troop.cell).or_default().push(&troop.id);
    }

    let mut offsets = HashMap::new();
    for mut members in cells.into_values() {
        if members.len() < 2 {
            continue;
        }
        members.sort_unstable();
        let radius = stack_radius(members.len());
        #[allow(clippy::cast_precision_loss)]
        let n = members.len() as f64;
        for (i, id) in members.into_iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let angle = (i as f64 / n) * TAU;
            offsets.insert(id.to_owned(), Point::new(radius * angle.cos(), radius * angle.sin()));
        }
    }
    offsets
}

/// Offsets for the current snapshot. Rebuilt from scratch on every snapshot.
#[derive(Debug, Default)]
pub struct StackLayout {
    offsets: HashMap<String, Point>,
}

impl StackLayout {
    pub fn recompute(&mut self, troops: &[TroopView]) {
        self.offsets = resolve_offsets(troops);
    }

    /// Zero for troops alone in their cell.
    #[must_use]
    pub fn offset(&self, troop_id: &str) -> Point {
        self.offsets.get(troop_id).copied().unwrap_or(Point::ZERO)
    }

    #[must_use]
    pub fn is_stacked(&self, troop_id: &str) -> bool {
        self.offsets.contains_key(troop_id)
    }

    pub fn clear(&mut self) {
        self.offsets.clear();
    }
}
