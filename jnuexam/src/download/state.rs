//! Single-flight slot state.
//!
//! Each logical target owns one slot. Claiming it moves it from `Idle` to
//! `InFlight` and hands back a [`SlotGuard`]; the guard finishes the slot with
//! `Succeeded` or `Failed` and the slot is immediately `Idle` again. Dropping
//! a guard without finishing it (a panicking worker) also frees the slot.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// State of a single-flight slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    InFlight,
}

/// How the most recent transfer on a slot ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOutcome {
    Succeeded,
    Failed,
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotState::Idle => write!(f, "idle"),
            SlotState::InFlight => write!(f, "in flight"),
        }
    }
}

#[derive(Debug)]
struct SlotInner {
    state: SlotState,
    last_outcome: Option<SlotOutcome>,
    completed: u64,
}

/// A gate allowing at most one transfer at a time.
#[derive(Debug, Clone)]
pub struct Slot {
    inner: Arc<Mutex<SlotInner>>,
}

impl Default for Slot {
    fn default() -> Self {
        Self::new()
    }
}

impl Slot {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SlotInner {
                state: SlotState::Idle,
                last_outcome: None,
                completed: 0,
            })),
        }
    }

    /// Claim the slot. Returns `None` if a transfer is already running.
    pub fn try_claim(&self) -> Option<SlotGuard> {
        let mut inner = self.inner.lock();
        if inner.state != SlotState::Idle {
            return None;
        }
        inner.state = SlotState::InFlight;
        Some(SlotGuard {
            slot: self.clone(),
            released: false,
        })
    }

    pub fn state(&self) -> SlotState {
        self.inner.lock().state
    }

    pub fn is_idle(&self) -> bool {
        self.state() == SlotState::Idle
    }

    /// Outcome of the most recently finished transfer.
    pub fn last_outcome(&self) -> Option<SlotOutcome> {
        self.inner.lock().last_outcome
    }

    /// Number of transfers that have finished on this slot.
    pub fn completed(&self) -> u64 {
        self.inner.lock().completed
    }

    fn release(&self, outcome: SlotOutcome) {
        let mut inner = self.inner.lock();
        inner.last_outcome = Some(outcome);
        inner.completed += 1;
        inner.state = SlotState::Idle;
    }
}

/// Exclusive ownership of a claimed slot.
#[derive(Debug)]
pub struct SlotGuard {
    slot: Slot,
    released: bool,
}

impl SlotGuard {
    /// Record the outcome and return the slot to `Idle`.
    pub fn finish(mut self, outcome: SlotOutcome) {
        self.released = true;
        self.slot.release(outcome);
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if !self.released {
            self.slot.release(SlotOutcome::Failed);
        }
    }
}
