//! Keyed call throttle with explicit time.
//!
//! A call runs at once when the key has been idle for the interval; otherwise
//! it is deferred and replaces whatever call was pending for that key. The
//! host drives deferred calls with [`Throttle::tick`].

use std::collections::HashMap;

use web_time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
struct Entry {
    /// Last time a call for this key ran
    ts: Option<Instant>,
    /// When the pending call is due
    due: Option<Instant>,
}

/// Outcome of a throttled call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleCall {
    /// Run the call now.
    Run,
    /// The call was deferred until the given time.
    Deferred(Instant),
}

#[derive(Debug, Clone, Default)]
pub struct Throttle {
    entries: HashMap<String, Entry>,
}

impl Throttle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a call for `key` at `now`.
    pub fn throttle(&mut self, key: &str, interval: Duration, now: Instant) -> ThrottleCall {
        let entry = self.entries.entry(key.to_string()).or_default();
        entry.due = None;
        let idle = entry.ts.is_none_or(|ts| now > ts + interval);
        if idle {
            entry.ts = Some(now);
            ThrottleCall::Run
        } else {
            let due = now + interval;
            entry.due = Some(due);
            log::trace!("throttle '{}': deferred", key);
            ThrottleCall::Deferred(due)
        }
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|e| e.due.is_some())
    }

    /// Take the pending call for `key`, if any; the caller runs it now.
    pub fn done(&mut self, key: &str, now: Instant) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) if entry.due.is_some() => {
                entry.due = None;
                entry.ts = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Forget a key entirely, dropping any pending call.
    pub fn clear(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Keys whose pending call is due at `now`; they count as run.
    pub fn tick(&mut self, now: Instant) -> Vec<String> {
        let mut due: Vec<String> = Vec::new();
        for (key, entry) in self.entries.iter_mut() {
            if entry.due.is_some_and(|d| d <= now) {
                entry.due = None;
                entry.ts = Some(now);
                due.push(key.clone());
            }
        }
        due.sort();
        due
    }
}
