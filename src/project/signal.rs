//! Explicit render-request signalling.
//!
//! State mutation never triggers rendering by itself; mutators call
//! [`RenderSignal::request`] and the compositor driver consumes the signal
//! once per tick. A deferred request covers cases like video seeks, where
//! the interesting pixels only exist a moment after the mutation.

use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct RenderSignal {
    requested: bool,
    deferred_until: Option<Instant>,
}

impl RenderSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a render on the next tick.
    pub fn request(&mut self) {
        self.requested = true;
    }

    /// Ask for an additional render once `delay` has elapsed.
    pub fn request_after(&mut self, delay: Duration) {
        let at = Instant::now() + delay;
        self.deferred_until = Some(match self.deferred_until {
            Some(existing) => existing.max(at),
            None => at,
        });
    }

    /// Consume the signal: returns true if a render is due at `now`.
    pub fn take(&mut self, now: Instant) -> bool {
        let mut due = std::mem::take(&mut self.requested);
        if let Some(at) = self.deferred_until
            && at <= now
        {
            self.deferred_until = None;
            due = true;
        }
        due
    }

    /// Is anything pending, now or later?
    pub fn is_pending(&self) -> bool {
        self.requested || self.deferred_until.is_some()
    }
}
