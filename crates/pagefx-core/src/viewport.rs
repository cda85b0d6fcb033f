#![forbid(unsafe_code)]

//! Viewport-intersection subscriptions.
//!
//! A [`ViewportWatcher`] is one observer configuration (threshold, root
//! margin, fire-once policy) plus the set of elements subscribed to it.
//! Entries arrive either from the host (`IntersectionObserver` callbacks,
//! see [`ViewportWatcher::handle_entry`]) or from geometry sampling
//! ([`ViewportWatcher::sample`]). Either way the watcher decides whether the
//! element should be notified and, for `once` watchers, drops the
//! subscription before reporting it.
//!
//! Watchers are independent values; several may track the same element with
//! different options.

use std::collections::BTreeSet;

use tracing::trace;

use crate::geometry::{Rect, RootMargin, intersection_ratio};
use crate::page::{ElementId, PageBackend};

/// Observer configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    /// Minimum visible fraction (`0.0..=1.0`) that counts as "entered".
    pub threshold: f64,
    /// Margin applied to the viewport before computing the visible fraction.
    pub root_margin: RootMargin,
    /// Stop watching an element after its first notification.
    pub once: bool,
}

impl WatchOptions {
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            root_margin: RootMargin::ZERO,
            once: false,
        }
    }

    #[must_use]
    pub fn with_root_margin(mut self, margin: RootMargin) -> Self {
        self.root_margin = margin;
        self
    }

    #[must_use]
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }
}

/// One visibility report for one element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: ElementId,
    /// Visible fraction of the element inside the (margin-adjusted) root.
    pub ratio: f64,
    pub is_intersecting: bool,
}

impl IntersectionEntry {
    #[must_use]
    pub fn qualifies(&self, threshold: f64) -> bool {
        self.is_intersecting && self.ratio >= threshold
    }
}

/// Subscription set for one observer configuration.
#[derive(Debug, Clone)]
pub struct ViewportWatcher {
    options: WatchOptions,
    subscribed: BTreeSet<ElementId>,
    /// Elements that qualified on the previous geometry sample.
    qualifying: BTreeSet<ElementId>,
    notified: u64,
}

impl ViewportWatcher {
    #[must_use]
    pub fn new(options: WatchOptions) -> Self {
        Self {
            options,
            subscribed: BTreeSet::new(),
            qualifying: BTreeSet::new(),
            notified: 0,
        }
    }

    #[must_use]
    pub fn options(&self) -> &WatchOptions {
        &self.options
    }

    /// Start watching `element`. Returns `false` if it was already watched.
    pub fn observe(&mut self, element: ElementId) -> bool {
        self.subscribed.insert(element)
    }

    pub fn unobserve(&mut self, element: ElementId) {
        self.subscribed.remove(&element);
        self.qualifying.remove(&element);
    }

    #[must_use]
    pub fn is_observing(&self, element: ElementId) -> bool {
        self.subscribed.contains(&element)
    }

    /// Currently subscribed elements, in handle order.
    pub fn observed(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.subscribed.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribed.is_empty()
    }

    /// Notifications delivered so far.
    #[must_use]
    pub fn notified(&self) -> u64 {
        self.notified
    }

    /// Process one entry. Returns the element to notify, if any.
    ///
    /// Entries for elements that are not subscribed (including `once`
    /// elements that already fired) are ignored.
    pub fn handle_entry(&mut self, entry: &IntersectionEntry) -> Option<ElementId> {
        if !self.subscribed.contains(&entry.target) {
            return None;
        }
        if !entry.qualifies(self.options.threshold) {
            return None;
        }
        if self.options.once {
            self.unobserve(entry.target);
        }
        self.notified = self.notified.saturating_add(1);
        trace!(element = entry.target.0, ratio = entry.ratio, "viewport enter");
        Some(entry.target)
    }

    /// Compute the entry for `element` from page geometry.
    #[must_use]
    pub fn measure<P: PageBackend + ?Sized>(&self, page: &P, element: ElementId) -> IntersectionEntry {
        let viewport = Rect::new(0.0, 0.0, page.viewport_width(), page.viewport_height());
        let root = viewport.expand(&self.options.root_margin);
        let rect = page.bounding_rect(element);
        IntersectionEntry {
            target: element,
            ratio: intersection_ratio(&rect, &root),
            is_intersecting: rect.intersection(&root).is_some(),
        }
    }

    /// Sample every subscribed element and notify those that started
    /// qualifying since the previous sample.
    pub fn sample<P: PageBackend + ?Sized>(&mut self, page: &P) -> Vec<ElementId> {
        let elements: Vec<ElementId> = self.subscribed.iter().copied().collect();
        let mut entered = Vec::new();
        for element in elements {
            let entry = self.measure(page, element);
            if !entry.qualifies(self.options.threshold) {
                self.qualifying.remove(&element);
                continue;
            }
            if !self.qualifying.insert(element) {
                continue;
            }
            if let Some(target) = self.handle_entry(&entry) {
                entered.push(target);
            }
        }
        entered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{MemoryPage, NodeSpec};

    fn entry(target: ElementId, ratio: f64) -> IntersectionEntry {
        IntersectionEntry {
            target,
            ratio,
            is_intersecting: ratio > 0.0,
        }
    }

    #[test]
    fn below_threshold_does_not_notify() {
        let mut watcher = ViewportWatcher::new(WatchOptions::new(0.5));
        watcher.observe(ElementId(1));
        assert_eq!(watcher.handle_entry(&entry(ElementId(1), 0.3)), None);
        assert_eq!(watcher.handle_entry(&entry(ElementId(1), 0.5)), Some(ElementId(1)));
    }

    #[test]
    fn once_fires_at_most_once() {
        let mut watcher = ViewportWatcher::new(WatchOptions::new(0.5).once());
        watcher.observe(ElementId(7));
        assert_eq!(watcher.handle_entry(&entry(ElementId(7), 1.0)), Some(ElementId(7)));
        assert_eq!(watcher.handle_entry(&entry(ElementId(7), 1.0)), None);
        assert!(!watcher.is_observing(ElementId(7)));
        assert_eq!(watcher.notified(), 1);
    }

    #[test]
    fn repeatable_watcher_fires_every_time() {
        let mut watcher = ViewportWatcher::new(WatchOptions::new(0.1));
        watcher.observe(ElementId(2));
        assert!(watcher.handle_entry(&entry(ElementId(2), 0.2)).is_some());
        assert!(watcher.handle_entry(&entry(ElementId(2), 0.2)).is_some());
        assert_eq!(watcher.notified(), 2);
    }

    #[test]
    fn unknown_element_is_noop() {
        let mut watcher = ViewportWatcher::new(WatchOptions::new(0.0));
        assert_eq!(watcher.handle_entry(&entry(ElementId(9), 1.0)), None);
    }

    #[test]
    fn not_intersecting_never_qualifies() {
        let mut watcher = ViewportWatcher::new(WatchOptions::new(0.0));
        watcher.observe(ElementId(3));
        let outside = IntersectionEntry {
            target: ElementId(3),
            ratio: 0.0,
            is_intersecting: false,
        };
        assert_eq!(watcher.handle_entry(&outside), None);
    }

    #[test]
    fn sampling_reports_rising_edges_only() {
        let mut page = MemoryPage::new(1000.0, 800.0);
        let below = page.insert(NodeSpec::new("div").at(1200.0, 100.0));
        let mut watcher = ViewportWatcher::new(WatchOptions::new(0.1));
        watcher.observe(below);

        assert!(watcher.sample(&page).is_empty());
        page.set_scroll(600.0);
        assert_eq!(watcher.sample(&page), vec![below]);
        page.set_scroll(650.0);
        assert!(watcher.sample(&page).is_empty());
        page.set_scroll(0.0);
        assert!(watcher.sample(&page).is_empty());
        page.set_scroll(600.0);
        assert_eq!(watcher.sample(&page), vec![below]);
    }

    #[test]
    fn root_margin_delays_entry() {
        let mut page = MemoryPage::new(1000.0, 800.0);
        // Top edge 30px above the viewport bottom.
        let element = page.insert(NodeSpec::new("div").at(770.0, 100.0));
        let margin: RootMargin = "0px 0px -50px 0px".parse().unwrap();
        let mut plain = ViewportWatcher::new(WatchOptions::new(0.1));
        let mut shrunk = ViewportWatcher::new(WatchOptions::new(0.1).with_root_margin(margin));
        plain.observe(element);
        shrunk.observe(element);

        assert_eq!(plain.sample(&page), vec![element]);
        assert!(shrunk.sample(&page).is_empty());
    }
}
