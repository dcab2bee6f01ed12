//! Debounced recomputation for the single-threaded, cooperative editor
//! loop.
//!
//! No background timers: the owner calls [`Debouncer::poll`] from its tick
//! (the same explicit-poll style the settings layer uses for reloads). The
//! latest queued deadline always wins; an edit during the quiet period
//! resets the timer instead of queuing a second fire. Fires are tagged
//! with the store epoch they were issued against, so a template/version
//! switch invalidates pending work instead of applying it to a stale tree.

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

use crate::store::{Epoch, ValueStore};

pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_millis(350);

#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
    issued_epoch: Epoch,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
            issued_epoch: 0,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Record an edit at `now`. Restarts the quiet window; the previous
    /// deadline (if any) is superseded.
    pub fn note_edit(&mut self, now: Instant, epoch: Epoch) {
        self.deadline = Some(now + self.quiet);
        self.issued_epoch = epoch;
    }

    /// True exactly once per elapsed quiet window, and only if the session
    /// epoch still matches the one the edit was issued against. A stale
    /// pending fire is discarded silently.
    pub fn poll(&mut self, now: Instant, current_epoch: Epoch) -> bool {
        let Some(deadline) = self.deadline else {
            return false;
        };
        if now < deadline {
            return false;
        }
        self.deadline = None;
        if self.issued_epoch != current_epoch {
            debug!(
                issued = self.issued_epoch,
                current = current_epoch,
                "discarding stale debounce fire"
            );
            return false;
        }
        true
    }

    /// Drop any pending fire (session teardown).
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_WINDOW)
    }
}

/// Debounced flush of the value tree, for autosave/preview consumers.
/// The flush callback receives the snapshot taken at fire time — never a
/// stale one captured at edit time.
pub struct Autosave {
    debouncer: Debouncer,
}

impl Autosave {
    pub fn new(quiet: Duration) -> Self {
        Self {
            debouncer: Debouncer::new(quiet),
        }
    }

    pub fn note_edit(&mut self, now: Instant, store: &ValueStore) {
        self.debouncer.note_edit(now, store.epoch());
    }

    /// Poll from the editor tick; invokes `flush` with a fresh snapshot
    /// when the quiet window has elapsed. Returns whether a flush ran.
    pub fn poll_flush(
        &mut self,
        now: Instant,
        store: &ValueStore,
        flush: impl FnOnce(Value),
    ) -> bool {
        if !self.debouncer.poll(now, store.epoch()) {
            return false;
        }
        flush(store.snapshot());
        true
    }
}
