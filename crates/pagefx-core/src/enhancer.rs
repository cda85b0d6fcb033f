#![forbid(unsafe_code)]

//! Host-driven coordinator for every page effect.
//!
//! [`PageEnhancer`] performs the one-time setup on the ready event and then
//! routes each [`PageEvent`] to the controller that owns it. It never blocks
//! and owns no timers: the host supplies monotonic timestamps and schedules
//! its own wakeups from [`PageEnhancer::next_deadline`] and
//! [`PageEnhancer::wants_frame`].
//!
//! ```text
//! DOMContentLoaded  → handle_event(Ready)      // discover elements, bind
//! scroll / click …  → handle_event(event, now) // arm throttles, navigate
//! timer wakeup      → advance(now)             // throttles, counters, carousel
//! animation frame   → animation_frame()        // parallax transforms
//! ```
//!
//! Each feature is optional. A page without a navbar, hero, modal or
//! testimonials simply leaves that controller unset; the others still run.

use core::time::Duration;
use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::anchors::AnchorScroller;
use crate::carousel::CarouselController;
use crate::config::{PageFxConfig, VisibilitySource, class};
use crate::counter::CounterAnimator;
use crate::event::{PageEvent, WatchKind};
use crate::modal::ModalMediaController;
use crate::page::{ElementId, PageBackend};
use crate::reveal::{EnterClass, RevealController};
use crate::scroll::{ScrollEffectsController, ScrollPass};
use crate::viewport::{IntersectionEntry, ViewportWatcher, WatchOptions};

/// Outcome of one [`PageEnhancer::advance`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepResult {
    /// Throttled scroll handlers that ran.
    pub scroll: ScrollPass,
    /// Counter ticks rendered.
    pub counter_ticks: u32,
    /// Carousel auto-advances performed.
    pub carousel_advances: u32,
}

/// What the host must do after dispatching an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventOutcome {
    /// Some controller reacted to the event.
    pub handled: bool,
    /// The browser's default action must be suppressed.
    pub prevent_default: bool,
    /// The intersection target is no longer watched; the host observer should
    /// stop reporting it.
    pub unobserve: bool,
}

/// Observer the host must create for one watcher.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchPlan {
    pub kind: WatchKind,
    pub options: WatchOptions,
    pub elements: Vec<ElementId>,
}

/// Controllers built by setup.
#[derive(Debug, Clone)]
struct Features {
    scroll: ScrollEffectsController,
    counter_watch: ViewportWatcher,
    counters: Vec<CounterAnimator>,
    fade_in: EnterClass,
    animated: EnterClass,
    reveal: RevealController,
    carousel: Option<CarouselController>,
    modal: Option<ModalMediaController>,
    anchors: AnchorScroller,
    overlay: Option<ElementId>,
    tooltips: Vec<ElementId>,
}

/// Coordinator for all page effects.
#[derive(Debug, Clone)]
pub struct PageEnhancer {
    config: PageFxConfig,
    features: Option<Features>,
    loaded: bool,
}

impl PageEnhancer {
    #[must_use]
    pub fn new(config: PageFxConfig) -> Self {
        Self {
            config,
            features: None,
            loaded: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> &PageFxConfig {
        &self.config
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.features.is_some()
    }

    /// One-time setup: discover elements and register every watcher.
    ///
    /// Calling it again is a no-op.
    pub fn ready<P: PageBackend + ?Sized>(&mut self, page: &mut P, now: Duration) {
        if self.features.is_some() {
            trace!("ready ignored: already set up");
            return;
        }
        let config = &self.config;
        let selectors = &config.selectors;

        let mut counter_watch =
            ViewportWatcher::new(WatchOptions::new(config.watch.counter_threshold).once());
        for counter in page.query_all(&selectors.counter) {
            counter_watch.observe(counter);
        }
        let fade_in = EnterClass::setup(
            page,
            &selectors.fade_in,
            WatchOptions::new(config.watch.fade_in_threshold),
            class::VISIBLE,
        );
        let animated = EnterClass::setup(
            page,
            &selectors.animated,
            WatchOptions::new(config.watch.animated_threshold)
                .with_root_margin(config.animated_root_margin()),
            class::VISIBLE,
        );
        let reveal = RevealController::setup(page, &selectors.reveal, config.watch.reveal_threshold);
        let scroll = ScrollEffectsController::setup(page, selectors, &config.scroll);
        let anchors = AnchorScroller::setup(page, &selectors.anchor, &config.anchors);

        for logo in page.query_all(&selectors.university_logo) {
            page.add_class(logo, class::FLOATING);
        }

        let carousel =
            CarouselController::setup(page, selectors, config.carousel_interval(), now);
        let modal = ModalMediaController::setup(page, selectors);
        let overlay = page.query(&selectors.loading_overlay);
        let tooltips = page.query_all(&selectors.tooltip);

        debug!(
            counters = counter_watch.len(),
            fade_in = fade_in.watcher().len(),
            animated = animated.watcher().len(),
            reveal = reveal.watcher().len(),
            anchors = anchors.len(),
            carousel = carousel.as_ref().map_or(0, CarouselController::len),
            modal = modal.is_some(),
            "page setup complete"
        );

        self.features = Some(Features {
            scroll,
            counter_watch,
            counters: Vec::new(),
            fade_in,
            animated,
            reveal,
            carousel,
            modal,
            anchors,
            overlay,
            tooltips,
        });

        if self.loaded {
            self.hide_overlay(page);
        }
        if self.config.visibility_source == VisibilitySource::Geometry {
            self.sample_visibility(page, now);
        }
    }

    /// Dispatch one event.
    pub fn handle_event<P: PageBackend + ?Sized>(
        &mut self,
        page: &mut P,
        event: &PageEvent,
        now: Duration,
    ) -> EventOutcome {
        let handled = EventOutcome {
            handled: true,
            ..EventOutcome::default()
        };
        match *event {
            PageEvent::Ready => {
                self.ready(page, now);
                handled
            }
            PageEvent::Load => {
                self.loaded = true;
                self.hide_overlay(page);
                handled
            }
            PageEvent::Scroll { .. } => {
                let geometry = self.config.visibility_source == VisibilitySource::Geometry;
                let Some(features) = self.features.as_mut() else {
                    return EventOutcome::default();
                };
                features.scroll.on_scroll(now);
                if geometry {
                    self.sample_visibility(page, now);
                }
                handled
            }
            PageEvent::Resize { .. } => {
                if self.features.is_some()
                    && self.config.visibility_source == VisibilitySource::Geometry
                {
                    self.sample_visibility(page, now);
                    return handled;
                }
                EventOutcome::default()
            }
            PageEvent::Click(element) => self.handle_click(page, element),
            PageEvent::Intersection { watch, entry } => self.handle_intersection(page, watch, &entry, now),
            PageEvent::Modal { dialog, phase } => {
                let written = self
                    .features
                    .as_ref()
                    .and_then(|features| features.modal.as_ref())
                    .is_some_and(|modal| modal.handle(page, dialog, phase));
                EventOutcome {
                    handled: written,
                    ..EventOutcome::default()
                }
            }
            PageEvent::AnimationFrame => EventOutcome {
                handled: self.animation_frame(page) > 0,
                ..EventOutcome::default()
            },
        }
    }

    fn handle_click<P: PageBackend + ?Sized>(&mut self, page: &mut P, element: ElementId) -> EventOutcome {
        let Some(features) = self.features.as_mut() else {
            return EventOutcome::default();
        };
        if let Some(carousel) = features.carousel.as_mut()
            && let Some(transition) = carousel.transition_for_click(element)
        {
            carousel.apply(page, transition);
            // A control written as `<a href="#">` must not jump to the top.
            return EventOutcome {
                handled: true,
                prevent_default: features.anchors.manages(element),
                unobserve: false,
            };
        }
        match features.anchors.handle_click(page, element) {
            Some(_) => EventOutcome {
                handled: true,
                prevent_default: true,
                unobserve: false,
            },
            None => EventOutcome::default(),
        }
    }

    fn handle_intersection<P: PageBackend + ?Sized>(
        &mut self,
        page: &mut P,
        watch: WatchKind,
        entry: &IntersectionEntry,
        now: Duration,
    ) -> EventOutcome {
        let Some(features) = self.features.as_mut() else {
            return EventOutcome::default();
        };
        let handled = match watch {
            WatchKind::Counter => match features.counter_watch.handle_entry(entry) {
                Some(element) => {
                    features.start_counter(page, element, &self.config, now);
                    true
                }
                None => false,
            },
            WatchKind::FadeIn => features.fade_in.handle_entry(page, entry),
            WatchKind::Animated => features.animated.handle_entry(page, entry),
            WatchKind::Reveal => features.reveal.handle_entry(page, entry),
        };
        EventOutcome {
            handled,
            prevent_default: false,
            unobserve: handled && !features.watcher(watch).is_observing(entry.target),
        }
    }

    /// Evaluate every watcher against current geometry.
    ///
    /// Used automatically with [`VisibilitySource::Geometry`]; hosts with a
    /// native observer never need it.
    pub fn sample_visibility<P: PageBackend + ?Sized>(&mut self, page: &mut P, now: Duration) -> usize {
        let Some(features) = self.features.as_mut() else {
            return 0;
        };
        let entered_counters = features.counter_watch.sample(&*page);
        for &element in &entered_counters {
            features.start_counter(page, element, &self.config, now);
        }
        entered_counters.len()
            + features.fade_in.sample(page)
            + features.animated.sample(page)
            + features.reveal.sample(page)
    }

    /// Run everything due at or before `now`.
    pub fn advance<P: PageBackend + ?Sized>(&mut self, page: &mut P, now: Duration) -> StepResult {
        let Some(features) = self.features.as_mut() else {
            return StepResult::default();
        };
        let mut result = StepResult {
            scroll: features.scroll.advance(page, now),
            ..StepResult::default()
        };
        for counter in &mut features.counters {
            result.counter_ticks += counter.advance(page, now);
        }
        features.counters.retain(|counter| !counter.is_finished());
        if let Some(carousel) = features.carousel.as_mut() {
            result.carousel_advances = carousel.advance(page, now);
        }
        result
    }

    /// Apply pending per-frame work. Returns the number of elements touched.
    pub fn animation_frame<P: PageBackend + ?Sized>(&mut self, page: &mut P) -> usize {
        self.features
            .as_mut()
            .map_or(0, |features| features.scroll.animation_frame(page))
    }

    /// Earliest pending timer, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        let features = self.features.as_ref()?;
        features
            .scroll
            .next_deadline()
            .into_iter()
            .chain(features.counters.iter().filter_map(CounterAnimator::next_deadline))
            .chain(features.carousel.as_ref().map(CarouselController::next_deadline))
            .min()
    }

    #[must_use]
    pub fn wants_frame(&self) -> bool {
        self.features
            .as_ref()
            .is_some_and(|features| features.scroll.wants_frame())
    }

    /// Observers the host must create (empty before setup).
    #[must_use]
    pub fn watch_plans(&self) -> Vec<WatchPlan> {
        let Some(features) = self.features.as_ref() else {
            return Vec::new();
        };
        WatchKind::ALL
            .into_iter()
            .map(|kind| {
                let watcher = features.watcher(kind);
                WatchPlan {
                    kind,
                    options: *watcher.options(),
                    elements: watcher.observed().collect(),
                }
            })
            .filter(|plan| !plan.elements.is_empty())
            .collect()
    }

    /// Elements that need click listeners, each listed once.
    #[must_use]
    pub fn click_targets(&self) -> Vec<ElementId> {
        let Some(features) = self.features.as_ref() else {
            return Vec::new();
        };
        features
            .carousel
            .iter()
            .flat_map(CarouselController::click_targets)
            .chain(features.anchors.click_targets())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Dialog that needs show/hide listeners.
    #[must_use]
    pub fn modal_dialog(&self) -> Option<ElementId> {
        self.features
            .as_ref()?
            .modal
            .as_ref()
            .map(ModalMediaController::dialog)
    }

    /// Elements the tooltip library should be attached to.
    #[must_use]
    pub fn tooltip_targets(&self) -> &[ElementId] {
        self.features
            .as_ref()
            .map_or(&[][..], |features| features.tooltips.as_slice())
    }

    #[must_use]
    pub fn carousel(&self) -> Option<&CarouselController> {
        self.features.as_ref()?.carousel.as_ref()
    }

    /// Counters still animating.
    #[must_use]
    pub fn running_counters(&self) -> usize {
        self.features
            .as_ref()
            .map_or(0, |features| features.counters.len())
    }

    fn hide_overlay<P: PageBackend + ?Sized>(&self, page: &mut P) {
        if let Some(overlay) = self.features.as_ref().and_then(|features| features.overlay) {
            page.add_class(overlay, class::HIDDEN);
        }
    }
}

impl Features {
    fn watcher(&self, kind: WatchKind) -> &ViewportWatcher {
        match kind {
            WatchKind::Counter => &self.counter_watch,
            WatchKind::FadeIn => self.fade_in.watcher(),
            WatchKind::Animated => self.animated.watcher(),
            WatchKind::Reveal => self.reveal.watcher(),
        }
    }

    fn start_counter<P: PageBackend + ?Sized>(
        &mut self,
        page: &mut P,
        element: ElementId,
        config: &PageFxConfig,
        now: Duration,
    ) {
        let counter = CounterAnimator::start(page, element, &config.counter, now);
        if !counter.is_finished() {
            self.counters.push(counter);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{MemoryPage, NodeSpec};
    use pretty_assertions::assert_eq;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn entry(target: ElementId) -> IntersectionEntry {
        IntersectionEntry {
            target,
            ratio: 1.0,
            is_intersecting: true,
        }
    }

    #[test]
    fn events_before_ready_are_ignored() {
        let mut page = MemoryPage::default();
        page.insert(NodeSpec::new("nav").class("navbar"));
        let mut enhancer = PageEnhancer::new(PageFxConfig::default());
        let outcome = enhancer.handle_event(&mut page, &PageEvent::Scroll { y: 300.0 }, ms(0));
        assert_eq!(outcome, EventOutcome::default());
        assert_eq!(enhancer.next_deadline(), None);
        assert!(enhancer.watch_plans().is_empty());
    }

    #[test]
    fn empty_page_sets_up_without_features() {
        let mut page = MemoryPage::default();
        let mut enhancer = PageEnhancer::new(PageFxConfig::default());
        enhancer.ready(&mut page, ms(0));
        assert!(enhancer.is_ready());
        assert!(enhancer.carousel().is_none());
        assert_eq!(enhancer.modal_dialog(), None);
        assert_eq!(enhancer.next_deadline(), None);
        assert!(page.journal().is_empty());
    }

    #[test]
    fn counter_intersection_requests_unobserve() {
        let mut page = MemoryPage::default();
        let counter = page.insert(NodeSpec::new("span").class("counter").attr("data-target", "10"));
        let mut enhancer = PageEnhancer::new(PageFxConfig::default());
        enhancer.ready(&mut page, ms(0));

        let event = PageEvent::Intersection {
            watch: WatchKind::Counter,
            entry: entry(counter),
        };
        let first = enhancer.handle_event(&mut page, &event, ms(0));
        assert!(first.handled && first.unobserve);
        let second = enhancer.handle_event(&mut page, &event, ms(5));
        assert!(!second.handled);
        assert_eq!(enhancer.running_counters(), 1);
        assert_eq!(enhancer.next_deadline(), Some(ms(10)));
    }

    #[test]
    fn reveal_entries_keep_observing() {
        let mut page = MemoryPage::default();
        let el = page.insert(NodeSpec::new("div").class("reveal"));
        let mut enhancer = PageEnhancer::new(PageFxConfig::default());
        enhancer.ready(&mut page, ms(0));
        let outcome = enhancer.handle_event(
            &mut page,
            &PageEvent::Intersection {
                watch: WatchKind::Reveal,
                entry: entry(el),
            },
            ms(0),
        );
        assert!(outcome.handled);
        assert!(!outcome.unobserve);
    }

    #[test]
    fn watch_plans_carry_thresholds() {
        let mut page = MemoryPage::default();
        page.insert(NodeSpec::new("span").class("counter"));
        page.insert(NodeSpec::new("div").class("fade-up"));
        let mut enhancer = PageEnhancer::new(PageFxConfig::default());
        enhancer.ready(&mut page, ms(0));
        let plans = enhancer.watch_plans();
        let kinds: Vec<_> = plans.iter().map(|plan| plan.kind).collect();
        assert_eq!(kinds, vec![WatchKind::Counter, WatchKind::Animated]);
        assert!(plans[0].options.once);
        assert_eq!(plans[0].options.threshold, 0.5);
        assert_eq!(plans[1].options.root_margin.bottom, -50.0);
    }

    #[test]
    fn load_before_ready_hides_overlay_at_setup() {
        let mut page = MemoryPage::default();
        let overlay = page.insert(NodeSpec::new("div").class("loading-overlay"));
        let mut enhancer = PageEnhancer::new(PageFxConfig::default());
        enhancer.handle_event(&mut page, &PageEvent::Load, ms(0));
        assert!(!page.has_class(overlay, "hidden"));
        enhancer.handle_event(&mut page, &PageEvent::Ready, ms(0));
        assert!(page.has_class(overlay, "hidden"));
    }

    #[test]
    fn ready_twice_is_noop() {
        let mut page = MemoryPage::default();
        page.insert(NodeSpec::new("img").class("university-logo"));
        let mut enhancer = PageEnhancer::new(PageFxConfig::default());
        enhancer.ready(&mut page, ms(0));
        enhancer.ready(&mut page, ms(10));
        assert_eq!(page.journal().len(), 1);
    }
}
