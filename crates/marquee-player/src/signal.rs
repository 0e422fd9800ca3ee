//! Dwell-extension signal shared with the rendering surface.

use std::sync::atomic::{AtomicBool, Ordering};

/// Flip-flop set by the rendering surface when a long-form item reports
/// completion.
///
/// The player only ever reads it during dwell waits; `reset` is called
/// whenever a new reference is loaded so a stale completion never bleeds
/// into the next item.
#[derive(Debug, Default)]
pub struct DoneSignal {
    done: AtomicBool,
}

impl DoneSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called by the rendering surface when the current item is done.
    pub fn mark_done(&self) {
        self.done.store(true, Ordering::SeqCst);
    }

    /// Whether the current item has reported done.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// Cleared by the player when it loads a new reference.
    pub fn reset(&self) {
        self.done.store(false, Ordering::SeqCst);
    }
}
