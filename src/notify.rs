//! Bounded, self-expiring lists of what the user is told: toasts and the
//! results of recent rolls.
//!
//! Both lists are pruned against [`tokio::time::Instant`], so expiry follows
//! the runtime clock (and can be driven in tests with a paused clock).

use crate::config::DiceConfig;
use crate::roll::RollOutcome;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ToastKind {
    Success,
    Error,
    Info,
    Warning,
}

impl fmt::Display for ToastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
            Self::Warning => "warning",
        })
    }
}

/// Something that can show a short message to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: ToastKind, message: &str);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
    pub created: Instant,
    /// Zero keeps the toast until it is dismissed.
    pub duration: Duration,
}

impl Toast {
    fn expired(&self, now: Instant) -> bool {
        !self.duration.is_zero() && now >= self.created + self.duration
    }
}

#[derive(Debug)]
pub struct ToastQueue {
    limit: usize,
    duration: Duration,
    next_id: u64,
    toasts: VecDeque<Toast>,
}

impl ToastQueue {
    pub fn new(limit: usize, duration: Duration) -> Self {
        Self {
            limit,
            duration,
            next_id: 0,
            toasts: VecDeque::new(),
        }
    }

    pub fn from_config(config: &DiceConfig) -> Self {
        Self::new(config.toast_limit, config.toast_duration)
    }

    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>) -> u64 {
        let duration = self.duration;
        self.push_with_duration(kind, message, duration)
    }

    /// Adds a toast, evicting the oldest ones beyond the limit.
    pub fn push_with_duration(
        &mut self,
        kind: ToastKind,
        message: impl Into<String>,
        duration: Duration,
    ) -> u64 {
        self.prune();
        let id = self.next_id;
        self.next_id += 1;
        self.toasts.push_back(Toast {
            id,
            kind,
            message: message.into(),
            created: Instant::now(),
            duration,
        });
        while self.toasts.len() > self.limit {
            self.toasts.pop_front();
        }
        id
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.id != id);
        self.toasts.len() != before
    }

    pub fn prune(&mut self) {
        let now = Instant::now();
        self.toasts.retain(|t| !t.expired(now));
    }

    /// Live toasts, oldest first.
    pub fn active(&mut self) -> impl Iterator<Item = &Toast> {
        self.prune();
        self.toasts.iter()
    }

    /// Removes and returns every live toast.
    pub fn drain(&mut self) -> Vec<Toast> {
        self.prune();
        self.toasts.drain(..).collect()
    }
}

impl Notifier for Mutex<ToastQueue> {
    fn notify(&self, kind: ToastKind, message: &str) {
        tracing::debug!(%kind, message, "toast");
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(kind, message);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: u64,
    pub notation: String,
    pub title: Option<String>,
    pub outcome: RollOutcome,
    pub created: Instant,
}

/// Recent roll results, newest first.
#[derive(Debug)]
pub struct RollHistory {
    limit: usize,
    ttl: Duration,
    next_id: u64,
    entries: VecDeque<HistoryEntry>,
}

impl RollHistory {
    pub fn new(limit: usize, ttl: Duration) -> Self {
        Self {
            limit,
            ttl,
            next_id: 0,
            entries: VecDeque::new(),
        }
    }

    pub fn from_config(config: &DiceConfig) -> Self {
        Self::new(config.history_limit, config.history_ttl)
    }

    pub fn push(&mut self, title: Option<String>, outcome: RollOutcome) -> u64 {
        self.prune();
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push_front(HistoryEntry {
            id,
            notation: outcome.notation.clone(),
            title,
            outcome,
            created: Instant::now(),
        });
        self.entries.truncate(self.limit);
        id
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn prune(&mut self) {
        let now = Instant::now();
        let ttl = self.ttl;
        self.entries.retain(|e| now < e.created + ttl);
    }

    pub fn entries(&mut self) -> impl Iterator<Item = &HistoryEntry> {
        self.prune();
        self.entries.iter()
    }

    pub fn latest(&mut self) -> Option<&HistoryEntry> {
        self.entries().next()
    }
}
