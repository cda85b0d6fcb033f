#![forbid(unsafe_code)]

//! Host-driven scroll, visibility, counter, carousel and modal effects for a
//! static marketing page.
//!
//! Every controller is a deterministic state machine. The host owns the
//! clock and the event loop: it passes monotonic timestamps in, asks for the
//! next deadline, and renders through a [`page::PageBackend`]. The browser
//! binding lives in `pagefx-web`; [`page::MemoryPage`] backs native tests
//! and replays.
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`viewport`] | threshold-based visibility subscriptions |
//! | [`counter`] | count-up animation for statistic elements |
//! | [`scroll`] | throttled navbar / hero effects and per-frame parallax |
//! | [`reveal`] | one-way "revealed" / "visible" class application |
//! | [`carousel`] | cyclic testimonial index with auto-advance |
//! | [`modal`] | lazy video source on dialog show / hide |
//! | [`anchors`] | smooth in-page link scrolling |
//! | [`enhancer`] | setup and event routing for all of the above |

pub mod anchors;
pub mod carousel;
pub mod config;
pub mod counter;
pub mod enhancer;
pub mod event;
pub mod geometry;
pub mod modal;
pub mod page;
pub mod reveal;
pub mod scroll;
pub mod throttle;
pub mod viewport;

pub use config::{ConfigError, PageFxConfig, VisibilitySource};
pub use enhancer::{EventOutcome, PageEnhancer, StepResult, WatchPlan};
pub use event::{EventParseError, PageEvent, WatchKind, parse_encoded_event};
pub use page::{ElementId, MemoryPage, Mutation, NodeSpec, PageBackend};
pub use viewport::{IntersectionEntry, ViewportWatcher, WatchOptions};
