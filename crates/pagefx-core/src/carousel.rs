#![forbid(unsafe_code)]

//! Testimonial carousel.
//!
//! The carousel is a cyclic index over `N` cards with a parallel sequence of
//! indicator dots. Every transition clears the active class from all cards
//! and indicators and then marks the new pair, so exactly one card and one
//! indicator are active afterwards.
//!
//! An auto-advance timer moves to the next card on a fixed period forever.
//! Manual navigation neither resets nor pauses it.

use core::time::Duration;

use tracing::{debug, trace};

use crate::config::{Selectors, class};
use crate::page::{ElementId, PageBackend};

/// How the carousel reached its current index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Next,
    Prev,
    Jump(usize),
    Auto,
}

/// Cyclic index state plus the elements it drives.
#[derive(Debug, Clone)]
pub struct CarouselController {
    cards: Vec<ElementId>,
    indicators: Vec<ElementId>,
    prev_control: Option<ElementId>,
    next_control: Option<ElementId>,
    index: usize,
    interval: Duration,
    next_auto: Duration,
}

impl CarouselController {
    /// Discover cards, indicators and controls. Returns `None` without cards.
    pub fn setup<P: PageBackend + ?Sized>(
        page: &mut P,
        selectors: &Selectors,
        interval: Duration,
        now: Duration,
    ) -> Option<Self> {
        let cards = page.query_all(&selectors.testimonial_card);
        if cards.is_empty() {
            debug!("carousel disabled: no cards");
            return None;
        }
        let indicators = page.query_all(&selectors.indicator);
        let prev_control = page.query(&selectors.control_prev);
        let next_control = page.query(&selectors.control_next);
        debug!(
            cards = cards.len(),
            indicators = indicators.len(),
            "carousel setup"
        );
        Some(
            Self::new(cards, indicators, interval, now)?
                .with_controls(prev_control, next_control),
        )
    }

    /// Build a carousel over `cards` starting at index 0.
    #[must_use]
    pub fn new(
        cards: Vec<ElementId>,
        indicators: Vec<ElementId>,
        interval: Duration,
        now: Duration,
    ) -> Option<Self> {
        if cards.is_empty() {
            return None;
        }
        let interval = interval.max(Duration::from_millis(1));
        Some(Self {
            cards,
            indicators,
            prev_control: None,
            next_control: None,
            index: 0,
            interval,
            next_auto: now + interval,
        })
    }

    #[must_use]
    pub fn with_controls(mut self, prev: Option<ElementId>, next: Option<ElementId>) -> Self {
        self.prev_control = prev;
        self.next_control = next;
        self
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    #[must_use]
    pub fn cards(&self) -> &[ElementId] {
        &self.cards
    }

    #[must_use]
    pub fn indicators(&self) -> &[ElementId] {
        &self.indicators
    }

    /// Elements whose clicks drive the carousel.
    pub fn click_targets(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.prev_control
            .into_iter()
            .chain(self.next_control)
            .chain(self.indicators.iter().copied())
    }

    /// Map a click on `element` to a transition, if it is one of ours.
    #[must_use]
    pub fn transition_for_click(&self, element: ElementId) -> Option<Transition> {
        if Some(element) == self.next_control {
            return Some(Transition::Next);
        }
        if Some(element) == self.prev_control {
            return Some(Transition::Prev);
        }
        self.indicators
            .iter()
            .position(|&dot| dot == element)
            .map(Transition::Jump)
    }

    #[must_use]
    pub fn next_deadline(&self) -> Duration {
        self.next_auto
    }

    pub fn next<P: PageBackend + ?Sized>(&mut self, page: &mut P) {
        self.apply(page, Transition::Next);
    }

    pub fn prev<P: PageBackend + ?Sized>(&mut self, page: &mut P) {
        self.apply(page, Transition::Prev);
    }

    /// Jump to `index`. Out-of-range indices are ignored.
    pub fn jump_to<P: PageBackend + ?Sized>(&mut self, page: &mut P, index: usize) {
        self.apply(page, Transition::Jump(index));
    }

    /// Perform a transition and render the new active pair.
    ///
    /// Returns `false` for an out-of-range jump (nothing changes).
    pub fn apply<P: PageBackend + ?Sized>(&mut self, page: &mut P, transition: Transition) -> bool {
        let len = self.cards.len();
        let index = match transition {
            Transition::Next | Transition::Auto => (self.index + 1) % len,
            Transition::Prev => (self.index + len - 1) % len,
            Transition::Jump(index) if index < len => index,
            Transition::Jump(_) => return false,
        };
        trace!(from = self.index, to = index, ?transition, "carousel");
        self.index = index;
        self.show(page);
        true
    }

    /// Run the auto-advance if one is due at or before `now`.
    ///
    /// Ticks missed during a long sleep are dropped: at most one advance per
    /// wakeup, then the deadline moves to the first grid point after `now`.
    pub fn advance<P: PageBackend + ?Sized>(&mut self, page: &mut P, now: Duration) -> u32 {
        if self.next_auto > now {
            return 0;
        }
        let missed = (now - self.next_auto).as_nanos() / self.interval.as_nanos().max(1);
        let skip = u32::try_from(missed + 1).unwrap_or(u32::MAX);
        self.next_auto = self
            .next_auto
            .saturating_add(self.interval.saturating_mul(skip));
        self.apply(page, Transition::Auto);
        1
    }

    fn show<P: PageBackend + ?Sized>(&self, page: &mut P) {
        for &card in &self.cards {
            page.remove_class(card, class::ACTIVE);
        }
        for &dot in &self.indicators {
            page.remove_class(dot, class::ACTIVE);
        }
        page.add_class(self.cards[self.index], class::ACTIVE);
        if let Some(&dot) = self.indicators.get(self.index) {
            page.add_class(dot, class::ACTIVE);
        }
    }
}
