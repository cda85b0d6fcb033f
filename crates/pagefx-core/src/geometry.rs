#![forbid(unsafe_code)]

//! Viewport geometry: rectangles, root margins and intersection ratios.
//!
//! All coordinates are CSS pixels in viewport space (the same space as
//! `Element.getBoundingClientRect()`), so `top = 0` is the upper edge of the
//! visible viewport.

use core::fmt;
use core::str::FromStr;

/// Axis-aligned rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn top(&self) -> f64 {
        self.y
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn left(&self) -> f64 {
        self.x
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Overlapping region, or `None` when the rectangles do not touch.
    #[must_use]
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right < left || bottom < top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }

    /// Grow (or shrink, for negative values) each edge by the margin.
    #[must_use]
    pub fn expand(&self, margin: &RootMargin) -> Rect {
        Rect::new(
            self.x - margin.left,
            self.y - margin.top,
            (self.width + margin.left + margin.right).max(0.0),
            (self.height + margin.top + margin.bottom).max(0.0),
        )
    }

    /// Whether any vertical slice of `self` is inside a viewport of the given
    /// height (`top < height && bottom > 0`).
    #[must_use]
    pub fn overlaps_viewport_vertically(&self, viewport_height: f64) -> bool {
        self.top() < viewport_height && self.bottom() > 0.0
    }
}

/// Fraction of `target` visible inside `root`, in `0.0..=1.0`.
///
/// Zero-area targets count as fully visible when their edge lies inside the
/// root, mirroring how browsers report empty elements.
#[must_use]
pub fn intersection_ratio(target: &Rect, root: &Rect) -> f64 {
    let Some(overlap) = target.intersection(root) else {
        return 0.0;
    };
    let area = target.area();
    if area <= 0.0 {
        return 1.0;
    }
    (overlap.area() / area).clamp(0.0, 1.0)
}

/// Pixel margins applied to the observation root, in CSS `top right bottom
/// left` order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RootMargin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl RootMargin {
    pub const ZERO: Self = Self {
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
        left: 0.0,
    };

    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

/// Failure to read a root margin string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarginParseError {
    pub input: String,
}

impl fmt::Display for MarginParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid root margin: {:?}", self.input)
    }
}

impl std::error::Error for MarginParseError {}

impl FromStr for RootMargin {
    type Err = MarginParseError;

    /// Accepts one to four `px` (or unitless) lengths with CSS shorthand
    /// expansion. Percentages are not supported.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MarginParseError {
            input: s.to_owned(),
        };
        let mut values = Vec::with_capacity(4);
        for part in s.split_whitespace() {
            let number = part.strip_suffix("px").unwrap_or(part);
            let value = number.parse::<f64>().map_err(|_| err())?;
            if !value.is_finite() {
                return Err(err());
            }
            values.push(value);
        }
        let [top, right, bottom, left] = match values.as_slice() {
            [all] => [*all; 4],
            [vertical, horizontal] => [*vertical, *horizontal, *vertical, *horizontal],
            [top, horizontal, bottom] => [*top, *horizontal, *bottom, *horizontal],
            [top, right, bottom, left] => [*top, *right, *bottom, *left],
            _ => return Err(err()),
        };
        Ok(Self {
            top,
            right,
            bottom,
            left,
        })
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}px {}px {}px {}px",
            self.top, self.right, self.bottom, self.left
        )
    }
}
