#![forbid(unsafe_code)]

//! Numeric count-up animation.
//!
//! A [`CounterAnimator`] counts one element from 0 to the integer in its
//! `data-target` attribute over a fixed duration, rendering the floored
//! running total on every tick and snapping to the exact target at the end.
//! Counters have no cancellation: once started they run to completion.

use core::time::Duration;

use tracing::debug;

use crate::config::CounterTuning;
use crate::page::{ElementId, PageBackend};

/// Attribute holding the counter's target value.
pub const TARGET_ATTRIBUTE: &str = "data-target";

/// Read a leading integer the way browsers' `parseInt` does.
///
/// Leading whitespace and a sign are accepted; parsing stops at the first
/// non-digit. Anything without digits (including `None`) yields 0.
#[must_use]
pub fn parse_target(raw: Option<&str>) -> i64 {
    let Some(raw) = raw else {
        return 0;
    };
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    let magnitude = digits[..end].parse::<i64>().unwrap_or(if end == 0 {
        0
    } else {
        i64::MAX
    });
    if negative { -magnitude } else { magnitude }
}

/// Value rendered by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterFrame {
    pub value: i64,
    pub finished: bool,
}

/// Count-up state for one element.
#[derive(Debug, Clone)]
pub struct CounterAnimator {
    element: ElementId,
    target: i64,
    step: f64,
    total: f64,
    tick: Duration,
    next_tick: Duration,
    finished: bool,
    ticks: u64,
}

impl CounterAnimator {
    /// Start counting `element` at `now`.
    ///
    /// Targets of 0 or less (including unparsable ones) are rendered
    /// immediately and the animator finishes without ticking.
    pub fn start<P: PageBackend + ?Sized>(
        page: &mut P,
        element: ElementId,
        tuning: &CounterTuning,
        now: Duration,
    ) -> Self {
        let raw = page.attribute(element, TARGET_ATTRIBUTE);
        let target = parse_target(raw.as_deref());
        let animator = Self::new(element, target, tuning, now);
        if animator.finished {
            page.set_text(element, &target.to_string());
        }
        debug!(element = element.0, target, "counter start");
        animator
    }

    /// Build an animator for a known target without touching the page.
    #[must_use]
    pub fn new(element: ElementId, target: i64, tuning: &CounterTuning, now: Duration) -> Self {
        let tick = tuning.tick();
        Self {
            element,
            target,
            step: target as f64 / tuning.tick_count() as f64,
            total: 0.0,
            tick,
            next_tick: now + tick,
            finished: target <= 0,
            ticks: 0,
        }
    }

    #[must_use]
    pub fn element(&self) -> ElementId {
        self.element
    }

    #[must_use]
    pub fn target(&self) -> i64 {
        self.target
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Time of the next pending tick, or `None` once finished.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        (!self.finished).then_some(self.next_tick)
    }

    /// Ticks taken so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advance the running total by one step.
    pub fn tick(&mut self) -> CounterFrame {
        if self.finished {
            return CounterFrame {
                value: self.target,
                finished: true,
            };
        }
        self.ticks = self.ticks.saturating_add(1);
        self.next_tick += self.tick;
        self.total += self.step;
        if self.total >= self.target as f64 {
            self.finished = true;
            return CounterFrame {
                value: self.target,
                finished: true,
            };
        }
        CounterFrame {
            value: (self.total.floor() as i64).min(self.target),
            finished: false,
        }
    }

    /// Run every tick due at or before `now`, rendering each one.
    ///
    /// Returns the number of ticks rendered.
    pub fn advance<P: PageBackend + ?Sized>(&mut self, page: &mut P, now: Duration) -> u32 {
        let mut rendered = 0;
        while !self.finished && self.next_tick <= now {
            let frame = self.tick();
            page.set_text(self.element, &frame.value.to_string());
            rendered += 1;
        }
        if self.finished && rendered > 0 {
            debug!(element = self.element.0, target = self.target, "counter done");
        }
        rendered
    }
}
