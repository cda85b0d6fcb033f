#![forbid(unsafe_code)]

//! Event coalescing primitives.
//!
//! - [`Throttle`] turns a burst of events into one deferred handling pass per
//!   window: the first event in an idle window arms a deadline, later events
//!   are dropped, and the pass fires once the deadline is reached.
//! - [`FrameRequest`] coalesces "please run on the next animation frame"
//!   requests into a single pending flag.
//!
//! Neither owns a timer. The host reads [`Throttle::deadline`] to schedule a
//! wakeup and calls [`Throttle::poll`] with the current time.

use core::time::Duration;

/// Leading-edge-armed, trailing-fired throttle token.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    deadline: Option<Duration>,
    dropped: u64,
}

impl Throttle {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
            dropped: 0,
        }
    }

    /// Register an event at `now`.
    ///
    /// Returns `true` if the event armed the token, `false` if it fell inside
    /// an already-armed window and was dropped.
    pub fn trigger(&mut self, now: Duration) -> bool {
        if self.deadline.is_some() {
            self.dropped = self.dropped.saturating_add(1);
            return false;
        }
        self.deadline = Some(now + self.interval);
        true
    }

    /// Fire if the armed deadline has been reached. Clears the token.
    pub fn poll(&mut self, now: Duration) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Events dropped inside armed windows since creation.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Pending animation-frame request.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameRequest {
    pending: bool,
}

impl FrameRequest {
    pub fn request(&mut self) {
        self.pending = true;
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Consume the request. Returns whether one was pending.
    pub fn take(&mut self) -> bool {
        core::mem::take(&mut self.pending)
    }
}
