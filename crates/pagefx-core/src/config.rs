#![forbid(unsafe_code)]

//! Tunables and the markup contract.
//!
//! Every selector, class name and timing constant the controllers use lives
//! here. [`PageFxConfig::default`] reproduces the stock marketing page; hosts
//! may override any field by passing a partial JSON document to
//! [`PageFxConfig::from_json`].

use core::fmt;
use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::geometry::RootMargin;

/// Selectors that discover elements on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub counter: String,
    pub fade_in: String,
    pub animated: String,
    pub reveal: String,
    pub parallax: String,
    pub navbar: String,
    pub hero: String,
    pub loading_overlay: String,
    pub university_logo: String,
    pub anchor: String,
    pub tooltip: String,
    pub testimonial_card: String,
    pub indicator: String,
    pub control_prev: String,
    pub control_next: String,
    pub video_modal: String,
    pub video_frame: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            counter: ".counter".into(),
            fade_in: ".fade-in".into(),
            animated: ".fade-up, .scale-in".into(),
            reveal: ".reveal".into(),
            parallax: ".parallax".into(),
            navbar: ".navbar".into(),
            hero: ".hero-section".into(),
            loading_overlay: ".loading-overlay".into(),
            university_logo: ".university-logo".into(),
            anchor: r##"a[href^="#"]"##.into(),
            tooltip: r#"[data-toggle="tooltip"]"#.into(),
            testimonial_card: ".testimonial-card".into(),
            indicator: ".indicator".into(),
            control_prev: ".control-prev".into(),
            control_next: ".control-next".into(),
            video_modal: "#videoModal".into(),
            video_frame: "#videoIframe".into(),
        }
    }
}

/// State classes toggled on page elements.
pub mod class {
    pub const SCROLLED: &str = "scrolled";
    pub const VISIBLE: &str = "visible";
    pub const REVEALED: &str = "revealed";
    pub const ACTIVE: &str = "active";
    pub const HIDDEN: &str = "hidden";
    pub const FLOATING: &str = "floating";
}

/// Scroll-reactive behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollTuning {
    /// Throttle window for the navbar and hero handlers.
    pub throttle_ms: u64,
    /// Offset above which the navbar carries the scrolled class.
    pub navbar_threshold_px: f64,
    /// Hero background offset factor.
    pub hero_factor: f64,
    /// Parallax speed for elements without `data-speed`.
    pub default_parallax_speed: f64,
}

impl ScrollTuning {
    #[must_use]
    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

impl Default for ScrollTuning {
    fn default() -> Self {
        Self {
            throttle_ms: 100,
            navbar_threshold_px: 100.0,
            hero_factor: 0.5,
            default_parallax_speed: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterTuning {
    pub duration_ms: u64,
    pub tick_ms: u64,
}

impl Default for CounterTuning {
    fn default() -> Self {
        Self {
            duration_ms: 2000,
            tick_ms: 10,
        }
    }
}

impl CounterTuning {
    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    /// Ticks needed to cover the full duration (at least one).
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        (self.duration_ms / self.tick_ms.max(1)).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarouselTuning {
    pub auto_advance_ms: u64,
}

impl Default for CarouselTuning {
    fn default() -> Self {
        Self {
            auto_advance_ms: 5000,
        }
    }
}

/// Thresholds and root margins for the visibility watchers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchTuning {
    pub counter_threshold: f64,
    pub fade_in_threshold: f64,
    pub animated_threshold: f64,
    /// CSS margin string for the `.fade-up`/`.scale-in` watcher.
    pub animated_root_margin: String,
    pub reveal_threshold: f64,
}

impl Default for WatchTuning {
    fn default() -> Self {
        Self {
            counter_threshold: 0.5,
            fade_in_threshold: 0.1,
            animated_threshold: 0.1,
            animated_root_margin: "0px 0px -50px 0px".into(),
            reveal_threshold: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorTuning {
    /// Space kept free above the anchor target (fixed header height).
    pub header_offset_px: f64,
    pub smooth: bool,
}

impl Default for AnchorTuning {
    fn default() -> Self {
        Self {
            header_offset_px: 100.0,
            smooth: true,
        }
    }
}

/// Where intersection entries come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilitySource {
    /// The host delivers entries (browser `IntersectionObserver`).
    #[default]
    Host,
    /// The enhancer samples element geometry after scroll and resize.
    Geometry,
}

/// Complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageFxConfig {
    pub selectors: Selectors,
    pub scroll: ScrollTuning,
    pub counter: CounterTuning,
    pub carousel: CarouselTuning,
    pub watch: WatchTuning,
    pub anchors: AnchorTuning,
    pub visibility_source: VisibilitySource,
    /// Initialise tooltip and animate-on-scroll globals when present.
    pub third_party: bool,
}

impl Default for PageFxConfig {
    fn default() -> Self {
        Self {
            selectors: Selectors::default(),
            scroll: ScrollTuning::default(),
            counter: CounterTuning::default(),
            carousel: CarouselTuning::default(),
            watch: WatchTuning::default(),
            anchors: AnchorTuning::default(),
            visibility_source: VisibilitySource::default(),
            third_party: true,
        }
    }
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl PageFxConfig {
    /// Parse a (possibly partial) JSON document and validate the result.
    pub fn from_json(json: &str) -> Result<Self, Vec<ConfigError>> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| vec![ConfigError::new("<json>", json.trim(), e.to_string())])?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        if self.scroll.throttle_ms == 0 {
            errors.push(ConfigError::new("scroll.throttle_ms", "0", "must be > 0"));
        }
        if !self.scroll.hero_factor.is_finite() {
            errors.push(ConfigError::new(
                "scroll.hero_factor",
                self.scroll.hero_factor.to_string(),
                "must be finite",
            ));
        }
        if !self.scroll.default_parallax_speed.is_finite() {
            errors.push(ConfigError::new(
                "scroll.default_parallax_speed",
                self.scroll.default_parallax_speed.to_string(),
                "must be finite",
            ));
        }
        if self.counter.tick_ms == 0 {
            errors.push(ConfigError::new("counter.tick_ms", "0", "must be > 0"));
        }
        if self.counter.duration_ms < self.counter.tick_ms {
            errors.push(ConfigError::new(
                "counter.duration_ms",
                self.counter.duration_ms.to_string(),
                "must be >= counter.tick_ms",
            ));
        }
        if self.carousel.auto_advance_ms == 0 {
            errors.push(ConfigError::new(
                "carousel.auto_advance_ms",
                "0",
                "must be > 0",
            ));
        }
        for (field, value) in [
            ("watch.counter_threshold", self.watch.counter_threshold),
            ("watch.fade_in_threshold", self.watch.fade_in_threshold),
            ("watch.animated_threshold", self.watch.animated_threshold),
            ("watch.reveal_threshold", self.watch.reveal_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(ConfigError::new(field, value.to_string(), "must be in [0, 1]"));
            }
        }
        if self.watch.animated_root_margin.parse::<RootMargin>().is_err() {
            errors.push(ConfigError::new(
                "watch.animated_root_margin",
                self.watch.animated_root_margin.clone(),
                "expected 1-4 pixel lengths",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    #[must_use]
    pub fn carousel_interval(&self) -> Duration {
        Duration::from_millis(self.carousel.auto_advance_ms)
    }

    /// Root margin of the animated watcher; falls back to zero if unparsable.
    #[must_use]
    pub fn animated_root_margin(&self) -> RootMargin {
        self.watch
            .animated_root_margin
            .parse()
            .unwrap_or(RootMargin::ZERO)
    }
}
