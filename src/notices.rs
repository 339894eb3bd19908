//! Self-expiring toast notifications for the presentation layer.

#[cfg(test)]
#[path = "notices_test.rs"]
mod notices_test;

use std::collections::VecDeque;

use crate::types::Millis;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub message: String,
    pub severity: Severity,
    pub expires_at: Millis,
}

/// FIFO of live notices. Each one carries its own expiry, so there is no
/// per-notice timer to cancel: [`NoticeQueue::prune`] runs on every frame.
#[derive(Debug)]
pub struct NoticeQueue {
    ttl_ms: Millis,
    next_id: u64,
    items: VecDeque<Notice>,
}

impl NoticeQueue {
    #[must_use]
    pub fn new(ttl_ms: Millis) -> Self {
        Self { ttl_ms, next_id: 1, items: VecDeque::new() }
    }

    /// Queue a notice. An identical message that is still visible is not
    /// duplicated; its expiry is pushed out instead.
    pub fn push(&mut self, message: impl Into<String>, severity: Severity, now: Millis) -> u64 {
        let message = message.into();
        let expires_at = now.saturating_add(self.ttl_ms);
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|n| n.message == message && n.severity == severity)
        {
            existing.expires_at = expires_at;
            return existing.id;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.items.push_back(Notice { id, message, severity, expires_at });
        id
    }

    pub fn prune(&mut self, now: Millis) {
        self.items.retain(|n| n.expires_at > now);
    }

    /// Earliest expiry among visible notices.
    #[must_use]
    pub fn next_expiry(&self) -> Option<Millis> {
        self.items.iter().map(|n| n.expires_at).min()
    }

    pub fn dismiss(&mut self, id: u64) {
        self.items.retain(|n| n.id != id);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
