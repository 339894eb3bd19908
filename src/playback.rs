//! Short-lived combat effects: projectile flights and unit facing.
//!
//! Nothing here feeds back into game state. Effects are keyed to absolute
//! timestamps and removed by [`CombatPlayback::prune`] on the frame tick, so
//! there are no per-effect timers to leak.

#[cfg(test)]
#[path = "playback_test.rs"]
mod playback_test;

use std::collections::HashMap;

use crate::types::{CombatEvent, Millis, Point};

/// Orientation for units with no recent aim, in radians.
pub const DEFAULT_FACING: f64 = 0.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Projectile {
    pub attacker_id: String,
    pub from: Point,
    pub to: Point,
    pub started_at: Millis,
    pub duration_ms: Millis,
}

impl Projectile {
    /// Position along the flight at `now`, clamped to the endpoints.
    #[must_use]
    pub fn position_at(&self, now: Millis) -> Point {
        let elapsed = now.saturating_sub(self.started_at);
        #[allow(clippy::cast_precision_loss)]
        let t = (elapsed as f64 / self.duration_ms.max(1) as f64).min(1.0);
        self.from.lerp(self.to, t)
    }

    #[must_use]
    pub fn is_expired(&self, now: Millis) -> bool {
        now >= self.started_at.saturating_add(self.duration_ms)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Aim {
    angle: f64,
    at: Millis,
}

#[derive(Debug)]
pub struct CombatPlayback {
    lifetime_ms: Millis,
    recency_ms: Millis,
    projectiles: Vec<Projectile>,
    aims: HashMap<String, Aim>,
}

impl CombatPlayback {
    #[must_use]
    pub fn new(lifetime_ms: Millis, recency_ms: Millis) -> Self {
        Self { lifetime_ms: lifetime_ms.max(1), recency_ms, projectiles: Vec::new(), aims: HashMap::new() }
    }

    /// Spawn effects for a batch of combat notifications.
    pub fn ingest(&mut self, events: &[CombatEvent], now: Millis) {
        for event in events {
            match event {
                CombatEvent::Projectile { attacker_id, from, to } => {
                    self.aim(attacker_id, *from, *to, now);
                    self.projectiles.push(Projectile {
                        attacker_id: attacker_id.clone(),
                        from: *from,
                        to: *to,
                        started_at: now,
                        duration_ms: self.lifetime_ms,
                    });
                }
                CombatEvent::Melee { attacker_id, from, to } => self.aim(attacker_id, *from, *to, now),
                CombatEvent::Unknown => tracing::debug!("ignoring unknown combat event"),
            }
        }
    }

    fn aim(&mut self, attacker_id: &str, from: Point, to: Point, now: Millis) {
        if from == to {
            return;
        }
        let angle = (to.y - from.y).atan2(to.x - from.x);
        self.aims.insert(attacker_id.to_owned(), Aim { angle, at: now });
    }

    /// Drop finished projectiles and aims older than the recency window.
    pub fn prune(&mut self, now: Millis) {
        self.projectiles.retain(|p| !p.is_expired(now));
        let recency = self.recency_ms;
        self.aims.retain(|_, aim| now.saturating_sub(aim.at) <= recency);
    }

    /// Live projectiles with their current positions.
    pub fn positions(&self, now: Millis) -> impl Iterator<Item = (&Projectile, Point)> {
        self.projectiles
            .iter()
            .filter(move |p| !p.is_expired(now))
            .map(move |p| (p, p.position_at(now)))
    }

    /// Facing angle for `unit_id`: its last aim while recent, otherwise
    /// [`DEFAULT_FACING`].
    #[must_use]
    pub fn facing(&self, unit_id: &str, now: Millis) -> f64 {
        match self.aims.get(unit_id) {
            Some(aim) if now.saturating_sub(aim.at) <= self.recency_ms => aim.angle,
            _ => DEFAULT_FACING,
        }
    }

    /// Whether any projectile is still in flight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.projectiles.is_empty()
    }

    pub fn clear(&mut self) {
        self.projectiles.clear();
        self.aims.clear();
    }
}
