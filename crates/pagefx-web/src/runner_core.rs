#![forbid(unsafe_code)]

//! Platform-independent runner core wrapping [`PageEnhancer`].
//!
//! This module contains the logic shared between the wasm-bindgen exports
//! and the native test harness. No JS/WASM types here: the page backend is a
//! type parameter, a live DOM in the browser and a `MemoryPage` in tests.

use core::time::Duration;

use pagefx_core::enhancer::{EventOutcome, StepResult};
use pagefx_core::{MemoryPage, PageBackend, PageEnhancer, PageEvent, PageFxConfig};

/// Page state the host owns and the core merely observes.
///
/// A browser page already reflects scrolling and resizing by the time the
/// event arrives; an in-memory page has to be told.
pub trait HostSync {
    fn sync(&mut self, _event: &PageEvent) {}
}

impl HostSync for MemoryPage {
    fn sync(&mut self, event: &PageEvent) {
        match *event {
            PageEvent::Scroll { y } => self.set_scroll(y),
            PageEvent::Resize { width, height } => self.set_viewport(width, height),
            _ => {}
        }
    }
}

/// Summary of one [`RunnerCore::step`] call.
#[cfg_attr(target_arch = "wasm32", allow(dead_code))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    pub result: StepResult,
    /// Milliseconds until the next timer, relative to the current clock.
    pub next_wakeup_ms: Option<f64>,
    pub wants_frame: bool,
}

/// Host-driven runner: owns the clock, the page and the enhancer.
pub struct RunnerCore<P> {
    page: P,
    enhancer: PageEnhancer,
    now: Duration,
    events_dispatched: u64,
}

impl<P: PageBackend + HostSync> RunnerCore<P> {
    pub fn new(page: P, config: PageFxConfig) -> Self {
        Self {
            page,
            enhancer: PageEnhancer::new(config),
            now: Duration::ZERO,
            events_dispatched: 0,
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    pub fn enhancer(&self) -> &PageEnhancer {
        &self.enhancer
    }

    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    pub fn now(&self) -> Duration {
        self.now
    }

    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    pub fn events_dispatched(&self) -> u64 {
        self.events_dispatched
    }

    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    /// Advance the clock by `dt_ms` milliseconds.
    pub fn advance_time_ms(&mut self, dt_ms: f64) {
        if dt_ms.is_finite() && dt_ms > 0.0 {
            self.now += Duration::from_nanos((dt_ms * 1_000_000.0) as u64);
        }
    }

    /// Set the clock to an absolute time. The clock never moves backwards.
    pub fn set_time(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    /// Deliver one event immediately.
    pub fn dispatch(&mut self, event: &PageEvent) -> EventOutcome {
        self.page.sync(event);
        self.events_dispatched += 1;
        self.enhancer.handle_event(&mut self.page, event, self.now)
    }

    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    /// Parse a JSON-encoded event and dispatch it.
    ///
    /// Returns `true` if the event was accepted, `false` if it was
    /// unsupported or malformed.
    pub fn push_encoded_event(&mut self, json: &str) -> bool {
        match pagefx_core::parse_encoded_event(json) {
            Ok(Some(event)) => {
                self.dispatch(&event);
                true
            }
            _ => false,
        }
    }

    /// Run all timers due at the current time.
    pub fn step(&mut self) -> StepReport {
        let result = self.enhancer.advance(&mut self.page, self.now);
        StepReport {
            result,
            next_wakeup_ms: self
                .enhancer
                .next_deadline()
                .map(|deadline| deadline.saturating_sub(self.now).as_nanos() as f64 / 1_000_000.0),
            wants_frame: self.enhancer.wants_frame(),
        }
    }

    /// Run pending per-frame work.
    pub fn animation_frame(&mut self) -> usize {
        self.enhancer.animation_frame(&mut self.page)
    }
}
