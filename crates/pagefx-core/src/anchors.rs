#![forbid(unsafe_code)]

//! Smooth scrolling for in-page links.
//!
//! Clicks on `href="#..."` links are taken over: the default jump is
//! suppressed and, when the fragment resolves to an element, the window
//! scrolls so the target sits below the fixed header.

use std::collections::BTreeMap;

use tracing::trace;

use crate::config::AnchorTuning;
use crate::page::{ElementId, PageBackend};

/// In-page link handler.
#[derive(Debug, Clone, Default)]
pub struct AnchorScroller {
    links: BTreeMap<ElementId, String>,
    tuning: AnchorTuning,
}

/// Scroll position that leaves `header_offset` pixels above the target.
#[must_use]
pub fn anchor_scroll_top(target_offset_top: f64, header_offset: f64) -> f64 {
    target_offset_top - header_offset
}

impl AnchorScroller {
    pub fn setup<P: PageBackend + ?Sized>(page: &mut P, selector: &str, tuning: &AnchorTuning) -> Self {
        let links = page
            .query_all(selector)
            .into_iter()
            .filter_map(|link| page.attribute(link, "href").map(|href| (link, href)))
            .collect();
        Self {
            links,
            tuning: tuning.clone(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn click_targets(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.links.keys().copied()
    }

    #[must_use]
    pub fn manages(&self, link: ElementId) -> bool {
        self.links.contains_key(&link)
    }

    /// Handle a click on `link`.
    ///
    /// Returns `None` if `link` is not a managed anchor. Otherwise returns
    /// `Some(scrolled)`; the caller must suppress the default navigation in
    /// both cases.
    pub fn handle_click<P: PageBackend + ?Sized>(&self, page: &mut P, link: ElementId) -> Option<bool> {
        let href = self.links.get(&link)?;
        let Some(target) = page.query(href) else {
            trace!(%href, "anchor target missing");
            return Some(false);
        };
        let top = anchor_scroll_top(page.offset_top(target), self.tuning.header_offset_px);
        page.scroll_to(top, self.tuning.smooth);
        Some(true)
    }
}
