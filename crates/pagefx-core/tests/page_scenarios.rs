//! End-to-end scenarios: a [`PageEnhancer`] driving a [`MemoryPage`] through
//! the same event sequences a browser would deliver.

use std::time::Duration;

use pagefx_core::event::WatchKind;
use pagefx_core::modal::ModalPhase;
use pagefx_core::{
    ElementId, IntersectionEntry, MemoryPage, Mutation, NodeSpec, PageBackend, PageEnhancer,
    PageEvent, PageFxConfig, VisibilitySource, parse_encoded_event,
};
use pretty_assertions::assert_eq;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn ready(page: &mut MemoryPage, config: PageFxConfig) -> PageEnhancer {
    let mut enhancer = PageEnhancer::new(config);
    enhancer.handle_event(page, &PageEvent::Ready, Duration::ZERO);
    enhancer
}

fn scroll(enhancer: &mut PageEnhancer, page: &mut MemoryPage, y: f64, now: Duration) {
    page.set_scroll(y);
    enhancer.handle_event(page, &PageEvent::Scroll { y }, now);
}

fn entered(target: ElementId, ratio: f64) -> IntersectionEntry {
    IntersectionEntry {
        target,
        ratio,
        is_intersecting: ratio > 0.0,
    }
}

// ---------------------------------------------------------------------------
// Scroll effects
// ---------------------------------------------------------------------------

#[test]
fn navbar_toggles_after_throttle_window() {
    let mut page = MemoryPage::default();
    let nav = page.insert(NodeSpec::new("nav").class("navbar"));
    let mut enhancer = ready(&mut page, PageFxConfig::default());

    scroll(&mut enhancer, &mut page, 150.0, ms(0));
    assert_eq!(enhancer.next_deadline(), Some(ms(100)));
    enhancer.advance(&mut page, ms(99));
    assert!(!page.has_class(nav, "scrolled"));

    let step = enhancer.advance(&mut page, ms(100));
    assert!(step.scroll.navbar);
    assert!(page.has_class(nav, "scrolled"));

    scroll(&mut enhancer, &mut page, 50.0, ms(200));
    enhancer.advance(&mut page, ms(300));
    assert!(!page.has_class(nav, "scrolled"));
}

#[test]
fn navbar_threshold_is_strict() {
    let mut page = MemoryPage::default();
    let nav = page.insert(NodeSpec::new("nav").class("navbar"));
    let mut enhancer = ready(&mut page, PageFxConfig::default());
    scroll(&mut enhancer, &mut page, 100.0, ms(0));
    enhancer.advance(&mut page, ms(100));
    assert!(!page.has_class(nav, "scrolled"));
}

#[test]
fn hero_background_follows_half_offset() {
    let mut page = MemoryPage::default();
    let hero = page.insert(NodeSpec::new("section").class("hero-section").at(0.0, 700.0));
    let mut enhancer = ready(&mut page, PageFxConfig::default());

    scroll(&mut enhancer, &mut page, 200.0, ms(0));
    enhancer.advance(&mut page, ms(100));
    assert_eq!(page.style_property(hero, "background-position-y"), Some("100px"));
}

#[test]
fn scroll_burst_runs_one_pass_with_latest_offset() {
    let mut page = MemoryPage::default();
    let nav = page.insert(NodeSpec::new("nav").class("navbar"));
    let mut enhancer = ready(&mut page, PageFxConfig::default());

    for i in 0..10u64 {
        scroll(&mut enhancer, &mut page, 20.0 * i as f64, ms(i * 9));
    }
    page.take_journal();
    let step = enhancer.advance(&mut page, ms(100));
    assert!(step.scroll.navbar);
    assert_eq!(
        page.take_journal(),
        vec![Mutation::AddClass(nav, "scrolled".into())]
    );
    assert_eq!(enhancer.next_deadline(), None);
}

#[test]
fn parallax_runs_once_per_frame_for_visible_elements() {
    let mut page = MemoryPage::default();
    let near = page.insert(
        NodeSpec::new("div")
            .class("parallax")
            .attr("data-speed", "0.25")
            .at(0.0, 500.0),
    );
    let far = page.insert(NodeSpec::new("div").class("parallax").at(5000.0, 300.0));
    let mut enhancer = ready(&mut page, PageFxConfig::default());

    assert!(!enhancer.wants_frame());
    scroll(&mut enhancer, &mut page, 100.0, ms(0));
    scroll(&mut enhancer, &mut page, 100.0, ms(5));
    assert!(enhancer.wants_frame());

    let touched = enhancer.animation_frame(&mut page);
    assert_eq!(touched, 1);
    assert_eq!(page.style_property(near, "transform"), Some("translateY(25px)"));
    assert_eq!(page.style_property(far, "transform"), None);
    assert!(!enhancer.wants_frame());
    assert_eq!(enhancer.animation_frame(&mut page), 0);
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

#[test]
fn counter_animates_to_target_once() {
    let mut page = MemoryPage::default();
    let counter = page.insert(NodeSpec::new("span").class("counter").attr("data-target", "1000"));
    let mut enhancer = ready(&mut page, PageFxConfig::default());

    let event = PageEvent::Intersection {
        watch: WatchKind::Counter,
        entry: entered(counter, 0.6),
    };
    let outcome = enhancer.handle_event(&mut page, &event, ms(0));
    assert!(outcome.unobserve);

    enhancer.advance(&mut page, ms(1000));
    assert_eq!(page.text(counter), Some("500"));

    enhancer.advance(&mut page, ms(2100));
    assert_eq!(page.text(counter), Some("1000"));
    assert_eq!(enhancer.running_counters(), 0);

    assert!(!enhancer.handle_event(&mut page, &event, ms(3000)).handled);
    assert_eq!(enhancer.running_counters(), 0);
}

#[test]
fn counter_below_threshold_waits() {
    let mut page = MemoryPage::default();
    let counter = page.insert(NodeSpec::new("span").class("counter").attr("data-target", "10"));
    let mut enhancer = ready(&mut page, PageFxConfig::default());
    let outcome = enhancer.handle_event(
        &mut page,
        &PageEvent::Intersection {
            watch: WatchKind::Counter,
            entry: entered(counter, 0.4),
        },
        ms(0),
    );
    assert!(!outcome.handled);
    assert_eq!(enhancer.running_counters(), 0);
}

#[test]
fn zero_target_counter_renders_immediately() {
    let mut page = MemoryPage::default();
    let counter = page.insert(NodeSpec::new("span").class("counter").attr("data-target", "abc"));
    let mut enhancer = ready(&mut page, PageFxConfig::default());
    enhancer.handle_event(
        &mut page,
        &PageEvent::Intersection {
            watch: WatchKind::Counter,
            entry: entered(counter, 1.0),
        },
        ms(0),
    );
    assert_eq!(page.text(counter), Some("0"));
    assert_eq!(enhancer.next_deadline(), None);
}

#[test]
fn reveal_applies_markup_delay() {
    let mut page = MemoryPage::default();
    let card = page.insert(NodeSpec::new("div").class("reveal").attr("data-delay", "0.3s"));
    let plain = page.insert(NodeSpec::new("div").class("reveal"));
    let mut enhancer = ready(&mut page, PageFxConfig::default());

    for target in [card, plain] {
        enhancer.handle_event(
            &mut page,
            &PageEvent::Intersection {
                watch: WatchKind::Reveal,
                entry: entered(target, 0.2),
            },
            ms(0),
        );
    }
    assert!(page.has_class(card, "revealed"));
    assert_eq!(page.style_property(card, "transition-delay"), Some("0.3s"));
    assert!(page.has_class(plain, "revealed"));
    assert_eq!(page.style_property(plain, "transition-delay"), None);
}

#[test]
fn geometry_source_drives_watchers_from_scroll() {
    let mut page = MemoryPage::default();
    let top = page.insert(NodeSpec::new("div").class("fade-in").at(100.0, 200.0));
    let below = page.insert(NodeSpec::new("div").class("fade-up").at(1500.0, 200.0));
    let counter = page.insert(
        NodeSpec::new("span")
            .class("counter")
            .attr("data-target", "40")
            .at(2000.0, 40.0),
    );
    let config = PageFxConfig {
        visibility_source: VisibilitySource::Geometry,
        ..PageFxConfig::default()
    };
    let mut enhancer = ready(&mut page, config);
    assert!(page.has_class(top, "visible"));
    assert!(!page.has_class(below, "visible"));

    scroll(&mut enhancer, &mut page, 1000.0, ms(50));
    assert!(page.has_class(below, "visible"));
    assert_eq!(enhancer.running_counters(), 0);

    scroll(&mut enhancer, &mut page, 1500.0, ms(60));
    assert_eq!(enhancer.running_counters(), 1);
    enhancer.advance(&mut page, ms(3000));
    assert_eq!(page.text(counter), Some("40"));

    scroll(&mut enhancer, &mut page, 0.0, ms(3100));
    scroll(&mut enhancer, &mut page, 1500.0, ms(3200));
    assert_eq!(enhancer.running_counters(), 0);
}

// ---------------------------------------------------------------------------
// Carousel, modal, anchors, page load
// ---------------------------------------------------------------------------

fn testimonial_page(cards: usize) -> (MemoryPage, Vec<ElementId>, Vec<ElementId>) {
    let mut page = MemoryPage::default();
    let cards: Vec<_> = (0..cards)
        .map(|_| page.insert(NodeSpec::new("div").class("testimonial-card")))
        .collect();
    let dots: Vec<_> = (0..cards.len())
        .map(|_| page.insert(NodeSpec::new("button").class("indicator")))
        .collect();
    page.insert(NodeSpec::new("button").class("control-prev"));
    page.insert(NodeSpec::new("button").class("control-next"));
    (page, cards, dots)
}

#[test]
fn carousel_clicks_and_auto_advance() {
    let (mut page, cards, dots) = testimonial_page(3);
    let mut enhancer = ready(&mut page, PageFxConfig::default());
    let next = page.query(".control-next").unwrap();
    let prev = page.query(".control-prev").unwrap();

    enhancer.handle_event(&mut page, &PageEvent::Click(dots[2]), ms(100));
    assert_eq!(enhancer.carousel().unwrap().index(), 2);
    enhancer.handle_event(&mut page, &PageEvent::Click(next), ms(200));
    assert_eq!(enhancer.carousel().unwrap().index(), 0);
    enhancer.handle_event(&mut page, &PageEvent::Click(prev), ms(300));
    assert_eq!(enhancer.carousel().unwrap().index(), 2);

    assert_eq!(enhancer.next_deadline(), Some(ms(5000)));
    let step = enhancer.advance(&mut page, ms(5000));
    assert_eq!(step.carousel_advances, 1);
    assert_eq!(enhancer.carousel().unwrap().index(), 0);
    let active: Vec<_> = cards.iter().map(|&c| page.has_class(c, "active")).collect();
    assert_eq!(active, vec![true, false, false]);
    assert!(page.has_class(dots[0], "active"));
    assert!(!page.has_class(dots[2], "active"));
}

#[test]
fn link_styled_control_advances_once_and_keeps_position() {
    let mut page = MemoryPage::default();
    for _ in 0..4 {
        page.insert(NodeSpec::new("div").class("testimonial-card"));
    }
    let next = page.insert(NodeSpec::new("a").class("control-next").attr("href", "#"));
    let mut enhancer = ready(&mut page, PageFxConfig::default());

    let targets = enhancer.click_targets();
    assert_eq!(targets.iter().filter(|&&t| t == next).count(), 1);

    page.take_journal();
    let outcome = enhancer.handle_event(&mut page, &PageEvent::Click(next), ms(100));
    assert!(outcome.handled);
    assert!(outcome.prevent_default);
    assert_eq!(enhancer.carousel().unwrap().index(), 1);
    assert!(
        !page
            .journal()
            .iter()
            .any(|m| matches!(m, Mutation::ScrollTo { .. }))
    );
}

#[test]
fn button_control_keeps_default_action() {
    let (mut page, _, _) = testimonial_page(2);
    let mut enhancer = ready(&mut page, PageFxConfig::default());
    let next = page.query(".control-next").unwrap();
    let outcome = enhancer.handle_event(&mut page, &PageEvent::Click(next), ms(100));
    assert!(outcome.handled);
    assert!(!outcome.prevent_default);
}

#[test]
fn modal_swaps_video_source() {
    let mut page = MemoryPage::default();
    let dialog = page.insert(NodeSpec::new("div").id("videoModal"));
    let frame = page.insert(
        NodeSpec::new("iframe")
            .id("videoIframe")
            .attr("data-src", "https://video.example/embed/42"),
    );
    let mut enhancer = ready(&mut page, PageFxConfig::default());
    assert_eq!(enhancer.modal_dialog(), Some(dialog));

    let show = PageEvent::Modal {
        dialog,
        phase: ModalPhase::Show,
    };
    assert!(enhancer.handle_event(&mut page, &show, ms(0)).handled);
    assert_eq!(
        page.attribute(frame, "src").as_deref(),
        Some("https://video.example/embed/42")
    );
    let hide = PageEvent::Modal {
        dialog,
        phase: ModalPhase::Hide,
    };
    enhancer.handle_event(&mut page, &hide, ms(10));
    assert_eq!(page.attribute(frame, "src").as_deref(), Some("about:blank"));
}

#[test]
fn anchor_click_scrolls_below_header() {
    let mut page = MemoryPage::default();
    let link = page.insert(NodeSpec::new("a").attr("href", "#features"));
    let missing = page.insert(NodeSpec::new("a").attr("href", "#gone"));
    page.insert(NodeSpec::new("section").id("features").at(900.0, 400.0));
    let mut enhancer = ready(&mut page, PageFxConfig::default());

    let outcome = enhancer.handle_event(&mut page, &PageEvent::Click(link), ms(0));
    assert!(outcome.prevent_default);
    assert_eq!(
        page.journal().last(),
        Some(&Mutation::ScrollTo {
            top: 800.0,
            smooth: true
        })
    );

    page.take_journal();
    let outcome = enhancer.handle_event(&mut page, &PageEvent::Click(missing), ms(0));
    assert!(outcome.prevent_default);
    assert!(page.journal().is_empty());
}

#[test]
fn load_hides_overlay_and_logos_float() {
    let mut page = MemoryPage::default();
    let overlay = page.insert(NodeSpec::new("div").class("loading-overlay"));
    let logos = [
        page.insert(NodeSpec::new("img").class("university-logo")),
        page.insert(NodeSpec::new("img").class("university-logo")),
    ];
    let mut enhancer = ready(&mut page, PageFxConfig::default());
    assert!(logos.iter().all(|&logo| page.has_class(logo, "floating")));
    assert!(!page.has_class(overlay, "hidden"));

    enhancer.handle_event(&mut page, &PageEvent::Load, ms(800));
    assert!(page.has_class(overlay, "hidden"));
}

#[test]
fn page_without_optional_elements_is_inert() {
    let mut page = MemoryPage::default();
    page.insert(NodeSpec::new("main"));
    let mut enhancer = ready(&mut page, PageFxConfig::default());
    let events = [
        PageEvent::Load,
        PageEvent::Scroll { y: 400.0 },
        PageEvent::Resize {
            width: 800.0,
            height: 600.0,
        },
        PageEvent::Click(ElementId(0)),
        PageEvent::Click(ElementId(99)),
        PageEvent::Modal {
            dialog: ElementId(0),
            phase: ModalPhase::Show,
        },
        PageEvent::AnimationFrame,
    ];
    for (i, event) in events.iter().enumerate() {
        enhancer.handle_event(&mut page, event, ms(i as u64 * 50));
    }
    enhancer.advance(&mut page, ms(10_000));
    assert!(page.journal().is_empty());
    assert_eq!(enhancer.next_deadline(), None);
    assert!(enhancer.click_targets().is_empty());
    assert!(enhancer.watch_plans().is_empty());
}

#[test]
fn encoded_events_drive_the_same_paths() {
    let mut page = MemoryPage::default();
    let nav = page.insert(NodeSpec::new("nav").class("navbar"));
    let mut enhancer = PageEnhancer::new(PageFxConfig::default());

    let script = [
        (0, r#"{"kind":"ready"}"#),
        (10, r#"{"kind":"scroll","y":320}"#),
        (20, r#"{"kind":"hover","target":0}"#),
    ];
    for (at, json) in script {
        if let Some(event) = parse_encoded_event(json).unwrap() {
            if let PageEvent::Scroll { y } = event {
                page.set_scroll(y);
            }
            enhancer.handle_event(&mut page, &event, ms(at));
        }
    }
    enhancer.advance(&mut page, ms(110));
    assert!(page.has_class(nav, "scrolled"));
}

#[test]
fn config_overrides_apply() {
    let config = PageFxConfig::from_json(
        r#"{"scroll":{"navbar_threshold_px":20,"throttle_ms":50},"anchors":{"header_offset_px":0}}"#,
    )
    .unwrap();
    let mut page = MemoryPage::default();
    let nav = page.insert(NodeSpec::new("nav").class("navbar"));
    let mut enhancer = ready(&mut page, config);
    scroll(&mut enhancer, &mut page, 30.0, ms(0));
    assert_eq!(enhancer.next_deadline(), Some(ms(50)));
    enhancer.advance(&mut page, ms(50));
    assert!(page.has_class(nav, "scrolled"));
}
