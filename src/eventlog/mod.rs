//! Event log: append-only operational trail for one deployed instance.
//!
//! Every lifecycle and inference event lands here with a category chosen by
//! the caller at the moment it is written. Timestamps are strictly
//! increasing, so insertion order and time order always agree.
//!
//! `EventLog` is a cheap handle: clones share the same underlying trail.
//! The deployment instance owns one, the open inference session writes
//! through a clone of it.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::sync::lock;

/// Category tag attached to every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    System,
    Auth,
    Model,
    Cluster,
    Inbound,
    Outbound,
    Signal,
    Error,
}

impl EventCategory {
    /// Upper-case tag used in the rendered line (`[CLUSTER]`).
    pub fn tag(self) -> &'static str {
        match self {
            EventCategory::System => "SYSTEM",
            EventCategory::Auth => "AUTH",
            EventCategory::Model => "MODEL",
            EventCategory::Cluster => "CLUSTER",
            EventCategory::Inbound => "INBOUND",
            EventCategory::Outbound => "OUTBOUND",
            EventCategory::Signal => "SIGNAL",
            EventCategory::Error => "ERROR",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A single log entry. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLogEntry {
    /// Milliseconds since the Unix epoch.
    pub at_millis: u64,
    pub category: EventCategory,
    pub message: String,
}

impl EventLogEntry {
    /// Wall-clock time of day (UTC) as `HH:MM:SS`.
    pub fn clock(&self) -> String {
        let secs = (self.at_millis / 1000) % 86_400;
        format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
    }
}

impl fmt::Display for EventLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] [{}] {}", self.clock(), self.category, self.message)
    }
}

#[derive(Debug, Default)]
struct LogInner {
    entries: Vec<EventLogEntry>,
    last_millis: u64,
}

/// Shared, append-only event log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    inner: Arc<Mutex<LogInner>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its timestamp.
    ///
    /// Two appends inside the same millisecond still get distinct,
    /// increasing timestamps.
    pub fn append(&self, category: EventCategory, message: impl Into<String>) -> u64 {
        let mut inner = lock(&self.inner);
        let at_millis = now_millis().max(inner.last_millis + 1);
        inner.last_millis = at_millis;
        let message = message.into();
        tracing::debug!(category = category.tag(), "{message}");
        inner.entries.push(EventLogEntry {
            at_millis,
            category,
            message,
        });
        at_millis
    }

    /// Snapshot of all entries in insertion order.
    pub fn entries(&self) -> Vec<EventLogEntry> {
        lock(&self.inner).entries.clone()
    }

    /// Entries appended at or after position `from` (for incremental tailing).
    pub fn entries_since(&self, from: usize) -> Vec<EventLogEntry> {
        let inner = lock(&self.inner);
        inner.entries.get(from..).map(<[_]>::to_vec).unwrap_or_default()
    }

    pub fn last(&self) -> Option<EventLogEntry> {
        lock(&self.inner).entries.last().cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when both handles point at the same trail.
    pub fn same_log(&self, other: &EventLog) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
