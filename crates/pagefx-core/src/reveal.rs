#![forbid(unsafe_code)]

//! Visibility-driven class toggles.
//!
//! [`RevealController`] handles `.reveal` elements: on entering the viewport
//! they gain the revealed class and, when the markup supplies a valid
//! `data-delay` (`0.3s`, `250ms`, `0.1s, 0.2s`, `calc(...)`), an inline
//! `transition-delay` carrying that value verbatim so staggered ordering is
//! driven by markup alone. [`EnterClass`] is the simpler variant used for
//! `.fade-in` and `.fade-up`/`.scale-in`: add one class on enter.
//!
//! Neither ever removes a class, so repeated entries are harmless.

use core::time::Duration;
use std::collections::BTreeMap;

use tracing::trace;

use crate::config::class;
use crate::page::{ElementId, PageBackend};
use crate::viewport::{IntersectionEntry, ViewportWatcher, WatchOptions};

/// Attribute holding a reveal element's transition delay.
pub const DELAY_ATTRIBUTE: &str = "data-delay";

/// Parse a CSS time value (`0.3s`, `250ms`). Anything else is `None`.
#[must_use]
pub fn parse_delay(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (number, nanos_per_unit) = if let Some(ms) = raw.strip_suffix("ms") {
        (ms, 1e6)
    } else {
        (raw.strip_suffix('s')?, 1e9)
    };
    let value: f64 = number.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0)
        .then(|| Duration::from_nanos((value * nanos_per_unit).round() as u64))
}

/// Validate a `transition-delay` value: a comma-separated list whose items
/// are CSS times or CSS functions such as `calc(...)` or `var(...)`.
///
/// Returns the trimmed value to write, or `None` if any item is malformed.
#[must_use]
pub fn css_delay(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    let valid_item = |item: &str| {
        let item = item.trim();
        parse_delay(item).is_some() || is_css_function(item)
    };
    (!raw.is_empty() && raw.split(',').all(valid_item)).then_some(raw)
}

fn is_css_function(item: &str) -> bool {
    let Some((name, rest)) = item.split_once('(') else {
        return false;
    };
    !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && rest.ends_with(')')
}

/// Reveal-on-enter with optional per-element delay.
#[derive(Debug, Clone)]
pub struct RevealController {
    watcher: ViewportWatcher,
    delays: BTreeMap<ElementId, String>,
}

impl RevealController {
    /// Observe every element matching `selector` at `threshold`.
    pub fn setup<P: PageBackend + ?Sized>(page: &mut P, selector: &str, threshold: f64) -> Self {
        let mut controller = Self {
            watcher: ViewportWatcher::new(WatchOptions::new(threshold)),
            delays: BTreeMap::new(),
        };
        for element in page.query_all(selector) {
            controller.watcher.observe(element);
            let Some(raw) = page.attribute(element, DELAY_ATTRIBUTE) else {
                continue;
            };
            match css_delay(&raw) {
                Some(delay) => {
                    controller.delays.insert(element, delay.to_owned());
                }
                None => trace!(element = element.0, %raw, "ignoring invalid delay"),
            }
        }
        controller
    }

    #[must_use]
    pub fn watcher(&self) -> &ViewportWatcher {
        &self.watcher
    }

    /// Delay written for `element`, as validated at setup.
    #[must_use]
    pub fn delay_css(&self, element: ElementId) -> Option<&str> {
        self.delays.get(&element).map(String::as_str)
    }

    /// Delay for `element` when it is a single CSS time.
    #[must_use]
    pub fn delay(&self, element: ElementId) -> Option<Duration> {
        self.delay_css(element).and_then(parse_delay)
    }

    /// Apply the reveal if the entry qualifies. Returns whether it did.
    pub fn handle_entry<P: PageBackend + ?Sized>(
        &mut self,
        page: &mut P,
        entry: &IntersectionEntry,
    ) -> bool {
        match self.watcher.handle_entry(entry) {
            Some(element) => {
                self.reveal(page, element);
                true
            }
            None => false,
        }
    }

    /// Sample geometry and reveal every element that entered.
    pub fn sample<P: PageBackend + ?Sized>(&mut self, page: &mut P) -> usize {
        let entered = self.watcher.sample(&*page);
        for &element in &entered {
            self.reveal(page, element);
        }
        entered.len()
    }

    fn reveal<P: PageBackend + ?Sized>(&self, page: &mut P, element: ElementId) {
        trace!(element = element.0, "reveal");
        page.add_class(element, class::REVEALED);
        if let Some(delay) = self.delays.get(&element) {
            page.set_style(element, "transition-delay", delay);
        }
    }
}

/// Add a fixed class to elements when they enter the viewport.
#[derive(Debug, Clone)]
pub struct EnterClass {
    watcher: ViewportWatcher,
    class: &'static str,
}

impl EnterClass {
    pub fn setup<P: PageBackend + ?Sized>(
        page: &mut P,
        selector: &str,
        options: WatchOptions,
        class: &'static str,
    ) -> Self {
        let mut watcher = ViewportWatcher::new(options);
        for element in page.query_all(selector) {
            watcher.observe(element);
        }
        Self { watcher, class }
    }

    #[must_use]
    pub fn watcher(&self) -> &ViewportWatcher {
        &self.watcher
    }

    pub fn handle_entry<P: PageBackend + ?Sized>(
        &mut self,
        page: &mut P,
        entry: &IntersectionEntry,
    ) -> bool {
        match self.watcher.handle_entry(entry) {
            Some(element) => {
                page.add_class(element, self.class);
                true
            }
            None => false,
        }
    }

    pub fn sample<P: PageBackend + ?Sized>(&mut self, page: &mut P) -> usize {
        let entered = self.watcher.sample(&*page);
        for &element in &entered {
            page.add_class(element, self.class);
        }
        entered.len()
    }
}
