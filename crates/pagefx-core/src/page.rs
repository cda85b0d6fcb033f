#![forbid(unsafe_code)]

//! Page abstraction consumed by every controller.
//!
//! [`PageBackend`] is the seam between the effect logic and a concrete
//! document. The browser binding in `pagefx-web` implements it over
//! `web_sys::Document`; [`MemoryPage`] implements it in memory so the same
//! logic runs natively for tests, replay and headless harnesses.
//!
//! Elements are addressed by opaque [`ElementId`] handles handed out by the
//! backend's query methods. Handles stay valid for the page lifetime; the
//! effect layer never removes nodes.

use std::collections::BTreeMap;

use crate::geometry::Rect;

/// Opaque handle to a page element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub u32);

/// Document operations needed by the effect controllers.
///
/// Query methods take `&mut self` so backends may intern handles lazily.
/// Invalid selectors behave like selectors that match nothing.
pub trait PageBackend {
    /// First element matching `selector`.
    fn query(&mut self, selector: &str) -> Option<ElementId>;

    /// Every element matching `selector`, in document order.
    fn query_all(&mut self, selector: &str) -> Vec<ElementId>;

    fn attribute(&self, element: ElementId, name: &str) -> Option<String>;

    fn has_class(&self, element: ElementId, class: &str) -> bool;

    fn add_class(&mut self, element: ElementId, class: &str);

    fn remove_class(&mut self, element: ElementId, class: &str);

    /// Set an inline style property (CSS property name, e.g. `transition-delay`).
    fn set_style(&mut self, element: ElementId, property: &str, value: &str);

    fn set_text(&mut self, element: ElementId, text: &str);

    fn set_attribute(&mut self, element: ElementId, name: &str, value: &str);

    /// Bounding box in viewport coordinates.
    fn bounding_rect(&self, element: ElementId) -> Rect;

    /// Distance from the document top to the element's top edge.
    fn offset_top(&self, element: ElementId) -> f64;

    /// Current vertical scroll offset of the window.
    fn scroll_offset(&self) -> f64;

    /// Height of the visible viewport.
    fn viewport_height(&self) -> f64;

    /// Viewport width, used for horizontal intersection tests.
    fn viewport_width(&self) -> f64;

    fn scroll_to(&mut self, top: f64, smooth: bool);
}

// ---------------------------------------------------------------------------
// Selectors
// ---------------------------------------------------------------------------

/// Attribute test inside a compound selector.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrTest {
    Present(String),
    Equals(String, String),
    Prefix(String, String),
}

/// A compound selector without combinators: `tag.class#id[attr]...`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

/// Comma-separated list of compound selectors.
///
/// This covers the markup contract (`.reveal`, `#videoModal`,
/// `a[href^="#"]`, `[data-toggle="tooltip"]`, `.fade-up, .scale-in`).
/// Descendant and child combinators are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    groups: Vec<Compound>,
}

impl SelectorList {
    /// Parse a selector list, or `None` when it is empty or unsupported.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let groups = input
            .split(',')
            .map(|group| parse_compound(group.trim()))
            .collect::<Option<Vec<_>>>()?;
        if groups.is_empty() {
            return None;
        }
        Some(Self { groups })
    }

    fn matches(&self, node: &MemoryNode) -> bool {
        self.groups.iter().any(|group| group.matches(node))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &mut core::iter::Peekable<core::str::Chars<'_>>) -> Option<String> {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    (!ident.is_empty()).then_some(ident)
}

fn parse_compound(input: &str) -> Option<Compound> {
    if input.is_empty() {
        return None;
    }
    let mut compound = Compound::default();
    let mut chars = input.chars().peekable();
    if chars.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
        compound.tag = Some(take_ident(&mut chars)?.to_ascii_lowercase());
    }
    while let Some(c) = chars.next() {
        match c {
            '.' => compound.classes.push(take_ident(&mut chars)?),
            '#' => compound.id = Some(take_ident(&mut chars)?),
            '[' => {
                let mut body = String::new();
                loop {
                    match chars.next()? {
                        ']' => break,
                        other => body.push(other),
                    }
                }
                compound.attrs.push(parse_attr_test(&body)?);
            }
            _ => return None,
        }
    }
    Some(compound)
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    let unquoted = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);
    unquoted.to_owned()
}

fn parse_attr_test(body: &str) -> Option<AttrTest> {
    if let Some((name, value)) = body.split_once("^=") {
        let name = name.trim();
        if name.is_empty() || !name.chars().all(is_ident_char) {
            return None;
        }
        return Some(AttrTest::Prefix(name.to_owned(), unquote(value)));
    }
    if let Some((name, value)) = body.split_once('=') {
        let name = name.trim();
        if name.is_empty() || !name.chars().all(is_ident_char) {
            return None;
        }
        return Some(AttrTest::Equals(name.to_owned(), unquote(value)));
    }
    let name = body.trim();
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return None;
    }
    Some(AttrTest::Present(name.to_owned()))
}

impl Compound {
    fn matches(&self, node: &MemoryNode) -> bool {
        if let Some(tag) = &self.tag
            && *tag != node.tag
        {
            return false;
        }
        if let Some(id) = &self.id
            && node.attributes.get("id") != Some(id)
        {
            return false;
        }
        if !self
            .classes
            .iter()
            .all(|class| node.classes.iter().any(|c| c == class))
        {
            return false;
        }
        self.attrs.iter().all(|test| match test {
            AttrTest::Present(name) => node.attributes.contains_key(name),
            AttrTest::Equals(name, value) => node.attributes.get(name) == Some(value),
            AttrTest::Prefix(name, prefix) => node
                .attributes
                .get(name)
                .is_some_and(|v| v.starts_with(prefix.as_str())),
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryPage
// ---------------------------------------------------------------------------

/// One recorded write against a [`MemoryPage`].
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    AddClass(ElementId, String),
    RemoveClass(ElementId, String),
    SetStyle(ElementId, String, String),
    SetText(ElementId, String),
    SetAttribute(ElementId, String, String),
    ScrollTo { top: f64, smooth: bool },
}

#[derive(Debug, Clone)]
struct MemoryNode {
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    text: String,
    /// Layout box in document coordinates (unaffected by scrolling).
    layout: Rect,
}

/// Builder for a [`MemoryPage`] element.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    layout: Rect,
}

impl NodeSpec {
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            layout: Rect::default(),
        }
    }

    /// Add one or more whitespace-separated classes.
    #[must_use]
    pub fn class(mut self, classes: &str) -> Self {
        self.classes
            .extend(classes.split_whitespace().map(str::to_owned));
        self
    }

    #[must_use]
    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_owned(), value.to_owned());
        self
    }

    /// Document-space position: `top` from the document start, `height` tall,
    /// full viewport width.
    #[must_use]
    pub fn at(mut self, top: f64, height: f64) -> Self {
        self.layout = Rect::new(0.0, top, 1024.0, height);
        self
    }

    #[must_use]
    pub fn layout(mut self, layout: Rect) -> Self {
        self.layout = layout;
        self
    }
}

/// In-memory document used for native runs.
///
/// Every write is appended to a journal so tests can assert on the exact
/// sequence of DOM mutations.
#[derive(Debug, Clone)]
pub struct MemoryPage {
    nodes: Vec<MemoryNode>,
    scroll_y: f64,
    viewport_width: f64,
    viewport_height: f64,
    journal: Vec<Mutation>,
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new(1024.0, 768.0)
    }
}

impl MemoryPage {
    #[must_use]
    pub fn new(viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            nodes: Vec::new(),
            scroll_y: 0.0,
            viewport_width,
            viewport_height,
            journal: Vec::new(),
        }
    }

    /// Append an element in document order and return its handle.
    pub fn insert(&mut self, spec: NodeSpec) -> ElementId {
        let id = ElementId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(MemoryNode {
            tag: spec.tag,
            classes: spec.classes,
            attributes: spec.attributes,
            style: BTreeMap::new(),
            text: String::new(),
            layout: spec.layout,
        });
        id
    }

    /// Move the window without going through an effect (user scrolling).
    pub fn set_scroll(&mut self, scroll_y: f64) {
        self.scroll_y = scroll_y.max(0.0);
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    /// Inline style property value, if set.
    #[must_use]
    pub fn style_property(&self, element: ElementId, property: &str) -> Option<&str> {
        self.node(element)?.style.get(property).map(String::as_str)
    }

    #[must_use]
    pub fn text(&self, element: ElementId) -> Option<&str> {
        self.node(element).map(|node| node.text.as_str())
    }

    #[must_use]
    pub fn classes(&self, element: ElementId) -> Vec<&str> {
        self.node(element)
            .map(|node| node.classes.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn journal(&self) -> &[Mutation] {
        &self.journal
    }

    /// Drain the journal.
    pub fn take_journal(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.journal)
    }

    fn node(&self, element: ElementId) -> Option<&MemoryNode> {
        self.nodes.get(element.0 as usize)
    }

    fn node_mut(&mut self, element: ElementId) -> Option<&mut MemoryNode> {
        self.nodes.get_mut(element.0 as usize)
    }

    fn handle(index: usize) -> ElementId {
        ElementId(u32::try_from(index).unwrap_or(u32::MAX))
    }
}

impl PageBackend for MemoryPage {
    fn query(&mut self, selector: &str) -> Option<ElementId> {
        let selector = SelectorList::parse(selector)?;
        self.nodes
            .iter()
            .position(|node| selector.matches(node))
            .map(Self::handle)
    }

    fn query_all(&mut self, selector: &str) -> Vec<ElementId> {
        let Some(selector) = SelectorList::parse(selector) else {
            return Vec::new();
        };
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| selector.matches(node))
            .map(|(index, _)| Self::handle(index))
            .collect()
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        self.node(element)?.attributes.get(name).cloned()
    }

    fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.node(element)
            .is_some_and(|node| node.classes.iter().any(|c| c == class))
    }

    fn add_class(&mut self, element: ElementId, class: &str) {
        self.journal
            .push(Mutation::AddClass(element, class.to_owned()));
        if let Some(node) = self.node_mut(element)
            && !node.classes.iter().any(|c| c == class)
        {
            node.classes.push(class.to_owned());
        }
    }

    fn remove_class(&mut self, element: ElementId, class: &str) {
        self.journal
            .push(Mutation::RemoveClass(element, class.to_owned()));
        if let Some(node) = self.node_mut(element) {
            node.classes.retain(|c| c != class);
        }
    }

    fn set_style(&mut self, element: ElementId, property: &str, value: &str) {
        self.journal.push(Mutation::SetStyle(
            element,
            property.to_owned(),
            value.to_owned(),
        ));
        if let Some(node) = self.node_mut(element) {
            node.style.insert(property.to_owned(), value.to_owned());
        }
    }

    fn set_text(&mut self, element: ElementId, text: &str) {
        self.journal
            .push(Mutation::SetText(element, text.to_owned()));
        if let Some(node) = self.node_mut(element) {
            text.clone_into(&mut node.text);
        }
    }

    fn set_attribute(&mut self, element: ElementId, name: &str, value: &str) {
        self.journal.push(Mutation::SetAttribute(
            element,
            name.to_owned(),
            value.to_owned(),
        ));
        if let Some(node) = self.node_mut(element) {
            node.attributes.insert(name.to_owned(), value.to_owned());
        }
    }

    fn bounding_rect(&self, element: ElementId) -> Rect {
        self.node(element)
            .map(|node| Rect {
                y: node.layout.y - self.scroll_y,
                ..node.layout
            })
            .unwrap_or_default()
    }

    fn offset_top(&self, element: ElementId) -> f64 {
        self.node(element).map_or(0.0, |node| node.layout.y)
    }

    fn scroll_offset(&self) -> f64 {
        self.scroll_y
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn viewport_width(&self) -> f64 {
        self.viewport_width
    }

    fn scroll_to(&mut self, top: f64, smooth: bool) {
        self.journal.push(Mutation::ScrollTo { top, smooth });
        self.scroll_y = top.max(0.0);
    }
}
