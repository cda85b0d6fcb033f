#![forbid(unsafe_code)]

//! Lazy media loading for the video dialog.
//!
//! The embedded frame keeps its real address in `data-src`. Opening the
//! dialog copies it into `src`; closing resets `src` to a blank document,
//! which stops playback and any in-flight loading.

use tracing::debug;

use crate::config::Selectors;
use crate::page::{ElementId, PageBackend};

/// Attribute holding the pending media address.
pub const PENDING_SOURCE_ATTRIBUTE: &str = "data-src";

/// Neutral source assigned on close.
pub const BLANK_SOURCE: &str = "about:blank";

/// Dialog lifecycle phase reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalPhase {
    Show,
    Hide,
}

/// Binding between a dialog and its media frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModalMediaController {
    dialog: ElementId,
    frame: ElementId,
}

impl ModalMediaController {
    /// Bind the dialog and frame, or `None` if either is missing.
    pub fn setup<P: PageBackend + ?Sized>(page: &mut P, selectors: &Selectors) -> Option<Self> {
        let Some(dialog) = page.query(&selectors.video_modal) else {
            debug!("video modal absent");
            return None;
        };
        let Some(frame) = page.query(&selectors.video_frame) else {
            debug!("video frame absent");
            return None;
        };
        Some(Self { dialog, frame })
    }

    #[must_use]
    pub fn new(dialog: ElementId, frame: ElementId) -> Self {
        Self { dialog, frame }
    }

    #[must_use]
    pub fn dialog(&self) -> ElementId {
        self.dialog
    }

    #[must_use]
    pub fn frame(&self) -> ElementId {
        self.frame
    }

    /// React to a lifecycle event on `dialog`. Events for other elements are
    /// ignored. Returns whether the frame source was written.
    pub fn handle<P: PageBackend + ?Sized>(
        &self,
        page: &mut P,
        dialog: ElementId,
        phase: ModalPhase,
    ) -> bool {
        if dialog != self.dialog {
            return false;
        }
        match phase {
            ModalPhase::Show => self.open(page),
            ModalPhase::Hide => self.close(page),
        }
        true
    }

    pub fn open<P: PageBackend + ?Sized>(&self, page: &mut P) {
        let source = page
            .attribute(self.frame, PENDING_SOURCE_ATTRIBUTE)
            .unwrap_or_default();
        page.set_attribute(self.frame, "src", &source);
    }

    pub fn close<P: PageBackend + ?Sized>(&self, page: &mut P) {
        page.set_attribute(self.frame, "src", BLANK_SOURCE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{MemoryPage, NodeSpec};

    fn page_with_modal(data_src: Option<&str>) -> (MemoryPage, ModalMediaController) {
        let mut page = MemoryPage::default();
        page.insert(NodeSpec::new("div").id("videoModal").class("modal"));
        let frame = NodeSpec::new("iframe").id("videoIframe");
        page.insert(match data_src {
            Some(src) => frame.attr("data-src", src),
            None => frame,
        });
        let modal = ModalMediaController::setup(&mut page, &Selectors::default()).unwrap();
        (page, modal)
    }

    #[test]
    fn open_then_close() {
        let (mut page, modal) = page_with_modal(Some("https://video.example/embed/1"));
        assert!(modal.handle(&mut page, modal.dialog(), ModalPhase::Show));
        assert_eq!(
            page.attribute(modal.frame(), "src").as_deref(),
            Some("https://video.example/embed/1")
        );
        modal.handle(&mut page, modal.dialog(), ModalPhase::Hide);
        assert_eq!(page.attribute(modal.frame(), "src").as_deref(), Some("about:blank"));
    }

    #[test]
    fn empty_pending_source_is_copied_verbatim() {
        let (mut page, modal) = page_with_modal(Some(""));
        modal.open(&mut page);
        assert_eq!(page.attribute(modal.frame(), "src").as_deref(), Some(""));
        modal.close(&mut page);
        assert_eq!(page.attribute(modal.frame(), "src").as_deref(), Some("about:blank"));
    }

    #[test]
    fn reopening_restores_source() {
        let (mut page, modal) = page_with_modal(Some("clip.mp4"));
        modal.open(&mut page);
        modal.close(&mut page);
        modal.open(&mut page);
        assert_eq!(page.attribute(modal.frame(), "src").as_deref(), Some("clip.mp4"));
    }

    #[test]
    fn other_dialogs_are_ignored() {
        let (mut page, modal) = page_with_modal(Some("clip.mp4"));
        assert!(!modal.handle(&mut page, modal.frame(), ModalPhase::Show));
        assert_eq!(page.attribute(modal.frame(), "src"), None);
    }

    #[test]
    fn missing_dialog_disables_binding() {
        let mut page = MemoryPage::default();
        page.insert(NodeSpec::new("iframe").id("videoIframe"));
        assert!(ModalMediaController::setup(&mut page, &Selectors::default()).is_none());
    }
}
