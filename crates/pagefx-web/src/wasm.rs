#![forbid(unsafe_code)]

//! Browser binding: a [`PageBackend`] over the live DOM plus the glue that
//! turns DOM events, observers and timers into [`RunnerCore`] calls.
//!
//! Only compiled on `wasm32` targets.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Function, Object, Reflect};
use pagefx_core::enhancer::EventOutcome;
use pagefx_core::geometry::Rect;
use pagefx_core::modal::ModalPhase;
use pagefx_core::{
    ElementId, IntersectionEntry, PageBackend, PageEvent, PageFxConfig, WatchPlan,
};
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Element, Event, HtmlElement, IntersectionObserver,
    IntersectionObserverEntry, IntersectionObserverInit, ScrollBehavior, ScrollToOptions, Window,
};
use web_time::Instant;

use super::runner_core::{HostSync, RunnerCore};

fn console_error(msg: &str) {
    let global = js_sys::global();
    let Ok(console) = Reflect::get(&global, &"console".into()) else {
        return;
    };
    let Ok(error) = Reflect::get(&console, &"error".into()) else {
        return;
    };
    let Ok(error_fn) = error.dyn_into::<Function>() else {
        return;
    };
    let _ = error_fn.call1(&console, &JsValue::from_str(msg));
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = if let Some(loc) = info.location() {
                format!(
                    "pagefx panic at {}:{}:{}: {info}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                )
            } else {
                format!("pagefx panic: {info}")
            };
            console_error(&msg);
        }));
    });
}

// ---------------------------------------------------------------------------
// DOM backend
// ---------------------------------------------------------------------------

/// [`PageBackend`] over `window.document`.
///
/// Elements are interned on first sight; an [`ElementId`] is an index into
/// that table and stays valid for the life of the page.
pub struct DomPage {
    window: Window,
    document: Document,
    elements: Vec<Element>,
}

impl DomPage {
    fn new(window: Window, document: Document) -> Self {
        Self {
            window,
            document,
            elements: Vec::new(),
        }
    }

    fn intern(&mut self, element: Element) -> ElementId {
        let index = match self.elements.iter().position(|known| *known == element) {
            Some(index) => index,
            None => {
                self.elements.push(element);
                self.elements.len() - 1
            }
        };
        ElementId(u32::try_from(index).unwrap_or(u32::MAX))
    }

    fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0 as usize)
    }

    fn lookup(&self, element: &Element) -> Option<ElementId> {
        self.elements
            .iter()
            .position(|known| known == element)
            .and_then(|index| u32::try_from(index).ok())
            .map(ElementId)
    }

    fn html(&self, id: ElementId) -> Option<&HtmlElement> {
        self.element(id)?.dyn_ref::<HtmlElement>()
    }
}

impl HostSync for DomPage {}

impl PageBackend for DomPage {
    fn query(&mut self, selector: &str) -> Option<ElementId> {
        let element = self.document.query_selector(selector).ok().flatten()?;
        Some(self.intern(element))
    }

    fn query_all(&mut self, selector: &str) -> Vec<ElementId> {
        let Ok(nodes) = self.document.query_selector_all(selector) else {
            warn!(%selector, "invalid selector");
            return Vec::new();
        };
        (0..nodes.length())
            .filter_map(|i| nodes.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(|element| self.intern(element))
            .collect()
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        self.element(element)?.get_attribute(name)
    }

    fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.element(element)
            .is_some_and(|el| el.class_list().contains(class))
    }

    fn add_class(&mut self, element: ElementId, class: &str) {
        if let Some(el) = self.element(element) {
            let _ = el.class_list().add_1(class);
        }
    }

    fn remove_class(&mut self, element: ElementId, class: &str) {
        if let Some(el) = self.element(element) {
            let _ = el.class_list().remove_1(class);
        }
    }

    fn set_style(&mut self, element: ElementId, property: &str, value: &str) {
        if let Some(el) = self.html(element) {
            let _ = el.style().set_property(property, value);
        }
    }

    fn set_text(&mut self, element: ElementId, text: &str) {
        if let Some(el) = self.element(element) {
            el.set_text_content(Some(text));
        }
    }

    fn set_attribute(&mut self, element: ElementId, name: &str, value: &str) {
        if let Some(el) = self.element(element) {
            let _ = el.set_attribute(name, value);
        }
    }

    fn bounding_rect(&self, element: ElementId) -> Rect {
        self.element(element)
            .map(|el| {
                let rect = el.get_bounding_client_rect();
                Rect::new(rect.x(), rect.y(), rect.width(), rect.height())
            })
            .unwrap_or_default()
    }

    fn offset_top(&self, element: ElementId) -> f64 {
        self.html(element)
            .map_or(0.0, |el| f64::from(el.offset_top()))
    }

    fn scroll_offset(&self) -> f64 {
        self.window.scroll_y().unwrap_or(0.0)
    }

    fn viewport_height(&self) -> f64 {
        self.window
            .inner_height()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    }

    fn viewport_width(&self) -> f64 {
        self.window
            .inner_width()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    }

    fn scroll_to(&mut self, top: f64, smooth: bool) {
        let options = ScrollToOptions::new();
        options.set_top(top);
        options.set_behavior(if smooth {
            ScrollBehavior::Smooth
        } else {
            ScrollBehavior::Auto
        });
        self.window.scroll_to_with_scroll_to_options(&options);
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Live page state shared between every callback.
struct Driver {
    core: RunnerCore<DomPage>,
    origin: Instant,
    timer: Option<i32>,
    frame_pending: bool,
    on_timer: Option<Function>,
    on_frame: Option<Function>,
}

type Shared = Rc<RefCell<Driver>>;

impl Driver {
    fn dispatch(&mut self, event: &PageEvent) -> EventOutcome {
        self.core.set_time(self.origin.elapsed());
        self.core.dispatch(event)
    }
}

#[wasm_bindgen(start)]
pub fn wasm_start() {
    install_panic_hook();
}

fn js_error(msg: impl Into<String>) -> JsValue {
    JsValue::from_str(&msg.into())
}

/// Attach the page effects to the current document.
///
/// `config_json` overrides any subset of the defaults. Setup runs once the
/// document is parsed (immediately if it already is).
#[wasm_bindgen]
pub fn attach(config_json: Option<String>) -> Result<(), JsValue> {
    install_panic_hook();
    let config = match config_json.as_deref() {
        Some(json) => PageFxConfig::from_json(json).map_err(|errors| {
            let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
            js_error(joined.join("; "))
        })?,
        None => PageFxConfig::default(),
    };
    let window = web_sys::window().ok_or_else(|| js_error("no window"))?;
    let document = window.document().ok_or_else(|| js_error("no document"))?;
    let loading = document.ready_state() == "loading";

    let shared: Shared = Rc::new(RefCell::new(Driver {
        core: RunnerCore::new(DomPage::new(window.clone(), document.clone()), config),
        origin: Instant::now(),
        timer: None,
        frame_pending: false,
        on_timer: None,
        on_frame: None,
    }));
    install_scheduler(&shared);

    if loading {
        let ready_shared = shared.clone();
        let on_ready = Closure::<dyn FnMut()>::new(move || on_ready(&ready_shared));
        document.add_event_listener_with_callback(
            "DOMContentLoaded",
            on_ready.as_ref().unchecked_ref(),
        )?;
        on_ready.forget();
    } else {
        on_ready(&shared);
    }
    Ok(())
}

fn on_ready(shared: &Shared) {
    shared.borrow_mut().dispatch(&PageEvent::Ready);
    if let Err(err) = bind(shared) {
        console_error(&format!("pagefx: binding failed: {err:?}"));
    }
    let third_party = shared.borrow().core.enhancer().config().third_party;
    if third_party {
        init_third_party(shared);
    }
    schedule(shared);
}

fn bind(shared: &Shared) -> Result<(), JsValue> {
    let (window, document) = {
        let driver = shared.borrow();
        let page = driver.core.page();
        (page.window.clone(), page.document.clone())
    };

    let scroll_shared = shared.clone();
    let on_scroll = Closure::<dyn FnMut()>::new(move || {
        let y = scroll_shared.borrow().core.page().scroll_offset();
        scroll_shared.borrow_mut().dispatch(&PageEvent::Scroll { y });
        schedule(&scroll_shared);
    });
    window.add_event_listener_with_callback("scroll", on_scroll.as_ref().unchecked_ref())?;
    on_scroll.forget();

    let resize_shared = shared.clone();
    let on_resize = Closure::<dyn FnMut()>::new(move || {
        let (width, height) = {
            let driver = resize_shared.borrow();
            let page = driver.core.page();
            (page.viewport_width(), page.viewport_height())
        };
        resize_shared
            .borrow_mut()
            .dispatch(&PageEvent::Resize { width, height });
        schedule(&resize_shared);
    });
    window.add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())?;
    on_resize.forget();

    if document.ready_state() == "complete" {
        shared.borrow_mut().dispatch(&PageEvent::Load);
    } else {
        let load_shared = shared.clone();
        let on_load = Closure::<dyn FnMut()>::new(move || {
            load_shared.borrow_mut().dispatch(&PageEvent::Load);
        });
        window.add_event_listener_with_callback("load", on_load.as_ref().unchecked_ref())?;
        on_load.forget();
    }

    let targets = shared.borrow().core.enhancer().click_targets();
    for target in targets {
        let Some(element) = shared.borrow().core.page().element(target).cloned() else {
            continue;
        };
        let click_shared = shared.clone();
        let on_click = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let outcome = click_shared.borrow_mut().dispatch(&PageEvent::Click(target));
            if outcome.prevent_default {
                event.prevent_default();
            }
            schedule(&click_shared);
        });
        element.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
        on_click.forget();
    }

    let dialog = shared.borrow().core.enhancer().modal_dialog();
    if let Some(dialog) = dialog
        && let Some(element) = shared.borrow().core.page().element(dialog).cloned()
    {
        for (name, phase) in [
            ("show.bs.modal", ModalPhase::Show),
            ("hide.bs.modal", ModalPhase::Hide),
        ] {
            let modal_shared = shared.clone();
            let on_phase = Closure::<dyn FnMut()>::new(move || {
                modal_shared
                    .borrow_mut()
                    .dispatch(&PageEvent::Modal { dialog, phase });
            });
            element.add_event_listener_with_callback(name, on_phase.as_ref().unchecked_ref())?;
            on_phase.forget();
        }
    }

    let plans = shared.borrow().core.enhancer().watch_plans();
    if shared.borrow().core.enhancer().config().visibility_source
        == pagefx_core::VisibilitySource::Host
    {
        for plan in plans {
            let kind = plan.kind;
            if let Err(err) = observe(shared, plan) {
                warn!(?kind, "observer not attached");
                console_error(&format!("pagefx: {kind:?} observer failed: {err:?}"));
            }
        }
    }
    Ok(())
}

fn observe(shared: &Shared, plan: WatchPlan) -> Result<(), JsValue> {
    let kind = plan.kind;
    let observer_shared = shared.clone();
    let callback = Closure::<dyn FnMut(Array, IntersectionObserver)>::new(
        move |entries: Array, observer: IntersectionObserver| {
            for entry in entries.iter() {
                let Ok(entry) = entry.dyn_into::<IntersectionObserverEntry>() else {
                    continue;
                };
                let target = entry.target();
                let Some(id) = observer_shared.borrow().core.page().lookup(&target) else {
                    continue;
                };
                let event = PageEvent::Intersection {
                    watch: kind,
                    entry: IntersectionEntry {
                        target: id,
                        ratio: entry.intersection_ratio(),
                        is_intersecting: entry.is_intersecting(),
                    },
                };
                let outcome = observer_shared.borrow_mut().dispatch(&event);
                if outcome.unobserve {
                    observer.unobserve(&target);
                }
            }
            schedule(&observer_shared);
        },
    );

    let init = IntersectionObserverInit::new();
    init.set_threshold(&JsValue::from_f64(plan.options.threshold));
    if !plan.options.root_margin.is_zero() {
        init.set_root_margin(&plan.options.root_margin.to_string());
    }
    let observer =
        IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)?;
    callback.forget();

    let driver = shared.borrow();
    for id in &plan.elements {
        if let Some(element) = driver.core.page().element(*id) {
            observer.observe(element);
        }
    }
    debug!(watch = kind.as_str(), elements = plan.elements.len(), "observer attached");
    Ok(())
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

fn install_scheduler(shared: &Shared) {
    let timer_shared = shared.clone();
    let on_timer = Closure::<dyn FnMut()>::new(move || {
        {
            let mut driver = timer_shared.borrow_mut();
            driver.timer = None;
            let now = driver.origin.elapsed();
            driver.core.set_time(now);
            driver.core.step();
        }
        schedule(&timer_shared);
    });
    let frame_shared = shared.clone();
    let on_frame = Closure::<dyn FnMut(f64)>::new(move |_ts: f64| {
        {
            let mut driver = frame_shared.borrow_mut();
            driver.frame_pending = false;
            driver.core.animation_frame();
        }
        schedule(&frame_shared);
    });
    let mut driver = shared.borrow_mut();
    driver.on_timer = Some(on_timer.into_js_value().unchecked_into());
    driver.on_frame = Some(on_frame.into_js_value().unchecked_into());
}

/// Re-arm the single timeout and request a frame if one is wanted.
fn schedule(shared: &Shared) {
    let mut driver = shared.borrow_mut();
    let window = driver.core.page().window.clone();
    let now = driver.origin.elapsed();
    driver.core.set_time(now);

    if let Some(handle) = driver.timer.take() {
        window.clear_timeout_with_handle(handle);
    }
    if let Some(deadline) = driver.core.enhancer().next_deadline()
        && let Some(on_timer) = driver.on_timer.clone()
    {
        let delay = deadline.saturating_sub(now).as_millis();
        let delay = i32::try_from(delay).unwrap_or(i32::MAX);
        match window.set_timeout_with_callback_and_timeout_and_arguments_0(&on_timer, delay) {
            Ok(handle) => driver.timer = Some(handle),
            Err(err) => warn!(?err, "setTimeout failed"),
        }
    }

    if !driver.frame_pending
        && driver.core.enhancer().wants_frame()
        && let Some(on_frame) = driver.on_frame.clone()
    {
        match window.request_animation_frame(&on_frame) {
            Ok(_) => driver.frame_pending = true,
            Err(err) => warn!(?err, "requestAnimationFrame failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Third-party widgets
// ---------------------------------------------------------------------------

/// Initialize tooltip and scroll-animation libraries when the page loaded
/// them. Missing libraries are skipped.
fn init_third_party(shared: &Shared) {
    let driver = shared.borrow();
    let page = driver.core.page();
    let global = JsValue::from(page.window.clone());

    let tooltip_ctor = Reflect::get(&global, &"bootstrap".into())
        .ok()
        .filter(|bootstrap| bootstrap.is_object())
        .and_then(|bootstrap| Reflect::get(&bootstrap, &"Tooltip".into()).ok())
        .and_then(|ctor| ctor.dyn_into::<Function>().ok());
    match tooltip_ctor {
        Some(ctor) => {
            for &id in driver.core.enhancer().tooltip_targets() {
                if let Some(element) = page.element(id)
                    && Reflect::construct(&ctor, &Array::of1(element)).is_err()
                {
                    warn!(element = id.0, "tooltip init failed");
                }
            }
        }
        None => debug!("bootstrap tooltips unavailable"),
    }

    let aos = Reflect::get(&global, &"AOS".into())
        .ok()
        .filter(JsValue::is_object);
    let init = aos
        .as_ref()
        .and_then(|aos| Reflect::get(aos, &"init".into()).ok())
        .and_then(|init| init.dyn_into::<Function>().ok());
    match (aos, init) {
        (Some(aos), Some(init)) => {
            let options = Object::new();
            let _ = Reflect::set(&options, &"duration".into(), &JsValue::from_f64(1000.0));
            let _ = Reflect::set(&options, &"once".into(), &JsValue::TRUE);
            if init.call1(&aos, &options).is_err() {
                warn!("AOS init failed");
            }
        }
        _ => debug!("AOS unavailable"),
    }
}
