#![forbid(unsafe_code)]

//! Typed page events and the JSON decoder for host-encoded events.
//!
//! Hosts that cannot call the enhancer directly (replay files, headless
//! drivers, JS shims) send one JSON object per event:
//!
//! ```text
//! {"kind":"ready"}
//! {"kind":"load"}
//! {"kind":"scroll","y":150}
//! {"kind":"resize","width":1280,"height":720}
//! {"kind":"click","target":3}
//! {"kind":"intersection","watch":"counter","target":3,"ratio":0.6,"intersecting":true}
//! {"kind":"modal","phase":"show","target":5}
//! {"kind":"frame"}
//! ```
//!
//! Unknown kinds decode to `Ok(None)` so newer hosts can talk to older cores.

use serde::Deserialize;

use crate::modal::ModalPhase;
use crate::page::ElementId;
use crate::viewport::IntersectionEntry;

/// Which visibility watcher an intersection entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WatchKind {
    /// `.counter`, fires once.
    Counter,
    /// `.fade-in`.
    FadeIn,
    /// `.fade-up, .scale-in`, with a shrunk root.
    Animated,
    /// `.reveal`.
    Reveal,
}

impl WatchKind {
    pub const ALL: [WatchKind; 4] = [
        WatchKind::Counter,
        WatchKind::FadeIn,
        WatchKind::Animated,
        WatchKind::Reveal,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::FadeIn => "fade_in",
            Self::Animated => "animated",
            Self::Reveal => "reveal",
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

/// An event delivered to the enhancer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageEvent {
    /// Document parsed; run one-time setup.
    Ready,
    /// All resources loaded.
    Load,
    /// Window scrolled to vertical offset `y`.
    Scroll { y: f64 },
    /// Viewport resized.
    Resize { width: f64, height: f64 },
    Click(ElementId),
    Intersection {
        watch: WatchKind,
        entry: IntersectionEntry,
    },
    Modal {
        dialog: ElementId,
        phase: ModalPhase,
    },
    AnimationFrame,
}

/// Errors from decoding an encoded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventParseError {
    /// Malformed JSON.
    Json(String),
    /// Missing required field.
    MissingField(&'static str),
    /// Unknown modal phase value.
    UnknownPhase(String),
    /// Unknown watcher name.
    UnknownWatch(String),
}

impl core::fmt::Display for EventParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "JSON parse error: {msg}"),
            Self::MissingField(field) => write!(f, "missing required field: {field}"),
            Self::UnknownPhase(phase) => write!(f, "unknown phase: {phase}"),
            Self::UnknownWatch(watch) => write!(f, "unknown watch: {watch}"),
        }
    }
}

impl std::error::Error for EventParseError {}

#[derive(Debug, Deserialize)]
struct RawEvent {
    kind: String,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
    #[serde(default)]
    target: Option<u32>,
    #[serde(default)]
    watch: Option<String>,
    #[serde(default)]
    ratio: Option<f64>,
    #[serde(default)]
    intersecting: Option<bool>,
    #[serde(default)]
    phase: Option<String>,
}

impl RawEvent {
    fn target(&self) -> Result<ElementId, EventParseError> {
        self.target
            .map(ElementId)
            .ok_or(EventParseError::MissingField("target"))
    }
}

/// Decode one host-encoded event.
pub fn parse_encoded_event(json: &str) -> Result<Option<PageEvent>, EventParseError> {
    let raw: RawEvent =
        serde_json::from_str(json).map_err(|e| EventParseError::Json(e.to_string()))?;

    let event = match raw.kind.as_str() {
        "ready" => PageEvent::Ready,
        "load" => PageEvent::Load,
        "frame" => PageEvent::AnimationFrame,
        "scroll" => PageEvent::Scroll {
            y: raw.y.ok_or(EventParseError::MissingField("y"))?,
        },
        "resize" => PageEvent::Resize {
            width: raw.width.ok_or(EventParseError::MissingField("width"))?,
            height: raw.height.ok_or(EventParseError::MissingField("height"))?,
        },
        "click" => PageEvent::Click(raw.target()?),
        "intersection" => {
            let name = raw
                .watch
                .as_deref()
                .ok_or(EventParseError::MissingField("watch"))?;
            let watch =
                WatchKind::parse(name).ok_or_else(|| EventParseError::UnknownWatch(name.to_owned()))?;
            let ratio = raw.ratio.ok_or(EventParseError::MissingField("ratio"))?;
            PageEvent::Intersection {
                watch,
                entry: IntersectionEntry {
                    target: raw.target()?,
                    ratio,
                    is_intersecting: raw.intersecting.unwrap_or(ratio > 0.0),
                },
            }
        }
        "modal" => {
            let phase = match raw.phase.as_deref() {
                Some("show") => ModalPhase::Show,
                Some("hide") => ModalPhase::Hide,
                Some(other) => return Err(EventParseError::UnknownPhase(other.to_owned())),
                None => return Err(EventParseError::MissingField("phase")),
            };
            PageEvent::Modal {
                dialog: raw.target()?,
                phase,
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(event))
}
