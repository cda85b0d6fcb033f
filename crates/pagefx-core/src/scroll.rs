#![forbid(unsafe_code)]

//! Scroll-reactive effects: navbar state, hero parallax and generic parallax
//! elements.
//!
//! # Design
//!
//! - The navbar and hero handlers each own a [`Throttle`]; every scroll event
//!   arms it (if idle) and the handler runs once when the window closes,
//!   reading the scroll offset at that moment.
//! - Parallax elements are updated on the next animation frame after a scroll
//!   instead of on a timer. Only elements overlapping the viewport get a new
//!   transform.
//! - Elements are discovered once, at construction. A missing navbar or hero
//!   simply disables that handler.

use core::time::Duration;

use tracing::debug;

use crate::config::{ScrollTuning, Selectors, class};
use crate::page::{ElementId, PageBackend};
use crate::throttle::{FrameRequest, Throttle};

/// Attribute holding a parallax element's speed factor.
pub const SPEED_ATTRIBUTE: &str = "data-speed";

/// Whether the navbar should carry the scrolled class at `offset`.
#[must_use]
pub fn navbar_scrolled(offset: f64, threshold: f64) -> bool {
    offset > threshold
}

/// Hero `background-position-y` for a scroll offset, in pixels.
#[must_use]
pub fn hero_background_offset(offset: f64, factor: f64) -> f64 {
    offset * factor
}

/// Parse an optional speed attribute, falling back to `default`.
#[must_use]
pub fn parse_speed(raw: Option<&str>, default: f64) -> f64 {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|speed| speed.is_finite())
        .unwrap_or(default)
}

/// A parallax element with its speed resolved at setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParallaxTarget {
    pub element: ElementId,
    pub speed: f64,
}

/// Which throttled handlers ran during one [`ScrollEffectsController::advance`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollPass {
    pub navbar: bool,
    pub hero: bool,
}

impl ScrollPass {
    #[must_use]
    pub fn any(&self) -> bool {
        self.navbar || self.hero
    }
}

/// Owner of all scroll-driven state.
#[derive(Debug, Clone)]
pub struct ScrollEffectsController {
    tuning: ScrollTuning,
    navbar: Option<ElementId>,
    navbar_throttle: Throttle,
    hero: Option<ElementId>,
    hero_throttle: Throttle,
    parallax: Vec<ParallaxTarget>,
    frame: FrameRequest,
}

impl ScrollEffectsController {
    /// Discover the navbar, hero section and parallax elements.
    pub fn setup<P: PageBackend + ?Sized>(
        page: &mut P,
        selectors: &Selectors,
        tuning: &ScrollTuning,
    ) -> Self {
        let navbar = page.query(&selectors.navbar);
        let hero = page.query(&selectors.hero);
        let parallax: Vec<ParallaxTarget> = page
            .query_all(&selectors.parallax)
            .into_iter()
            .map(|element| ParallaxTarget {
                element,
                speed: parse_speed(
                    page.attribute(element, SPEED_ATTRIBUTE).as_deref(),
                    tuning.default_parallax_speed,
                ),
            })
            .collect();
        debug!(
            navbar = navbar.is_some(),
            hero = hero.is_some(),
            parallax = parallax.len(),
            "scroll effects setup"
        );
        Self::new(tuning.clone(), navbar, hero, parallax)
    }

    #[must_use]
    pub fn new(
        tuning: ScrollTuning,
        navbar: Option<ElementId>,
        hero: Option<ElementId>,
        parallax: Vec<ParallaxTarget>,
    ) -> Self {
        let interval = tuning.throttle_interval();
        Self {
            tuning,
            navbar,
            navbar_throttle: Throttle::new(interval),
            hero,
            hero_throttle: Throttle::new(interval),
            parallax,
            frame: FrameRequest::default(),
        }
    }

    /// Whether any scroll behavior is active on this page.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.navbar.is_some() || self.hero.is_some() || !self.parallax.is_empty()
    }

    #[must_use]
    pub fn parallax_targets(&self) -> &[ParallaxTarget] {
        &self.parallax
    }

    /// Register a scroll event at `now`.
    pub fn on_scroll(&mut self, now: Duration) {
        if self.navbar.is_some() {
            self.navbar_throttle.trigger(now);
        }
        if self.hero.is_some() {
            self.hero_throttle.trigger(now);
        }
        if !self.parallax.is_empty() {
            self.frame.request();
        }
    }

    /// Run throttled handlers whose window has closed.
    pub fn advance<P: PageBackend + ?Sized>(&mut self, page: &mut P, now: Duration) -> ScrollPass {
        let mut pass = ScrollPass::default();
        if let Some(navbar) = self.navbar
            && self.navbar_throttle.poll(now)
        {
            let offset = page.scroll_offset();
            if navbar_scrolled(offset, self.tuning.navbar_threshold_px) {
                page.add_class(navbar, class::SCROLLED);
            } else {
                page.remove_class(navbar, class::SCROLLED);
            }
            pass.navbar = true;
        }
        if let Some(hero) = self.hero
            && self.hero_throttle.poll(now)
        {
            let offset = hero_background_offset(page.scroll_offset(), self.tuning.hero_factor);
            page.set_style(hero, "background-position-y", &format!("{offset}px"));
            pass.hero = true;
        }
        pass
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        match (self.navbar_throttle.deadline(), self.hero_throttle.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    #[must_use]
    pub fn wants_frame(&self) -> bool {
        self.frame.is_pending()
    }

    /// Apply parallax transforms if a frame was requested.
    ///
    /// Returns how many elements were transformed.
    pub fn animation_frame<P: PageBackend + ?Sized>(&mut self, page: &mut P) -> usize {
        if !self.frame.take() {
            return 0;
        }
        let offset = page.scroll_offset();
        let viewport_height = page.viewport_height();
        let mut applied = 0;
        for target in &self.parallax {
            let rect = page.bounding_rect(target.element);
            if !rect.overlaps_viewport_vertically(viewport_height) {
                continue;
            }
            let shift = offset * target.speed;
            page.set_style(target.element, "transform", &format!("translateY({shift}px)"));
            applied += 1;
        }
        applied
    }
}
