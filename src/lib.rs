//! Client-side sync engine for a turn-based grid skirmish game.
//!
//! SYSTEM CONTEXT
//! ==============
//! The match server is authoritative. This crate keeps one websocket alive,
//! rejoins transparently after drops, mirrors the latest snapshot, and derives
//! everything a renderer needs from it: smoothed troop positions, stack
//! offsets for shared cells, move previews, the deploy zone, and short-lived
//! combat effects. Local guards stop requests the server would reject.
//!
//! [`controller::SyncController`] owns all state; [`runtime::Runtime`] drives
//! it from a real socket. Everything below the controller is plain data and
//! synchronous logic, testable without I/O.

pub mod config;
pub mod connection;
pub mod controller;
pub mod guard;
pub mod interpolate;
pub mod notices;
pub mod planner;
pub mod playback;
pub mod protocol;
pub mod runtime;
pub mod session;
pub mod stack;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_support;
