//! Geometry value types shared by every stage of the pipeline.
//!
//! Three coordinate frames appear throughout the crate:
//!   - page space     — CSS pixels, origin at the top-left of the scrollable document
//!   - viewport space — CSS pixels, origin at the top-left of the visible viewport
//!   - pixel space    — integer pixels of whatever bitmap a capture produced
//!
//! `SelectionRect` lives in page space, `PixelRect` in pixel space.
//! Conversions between them belong to `crop::reconcile`, never here.

use serde::{Deserialize, Serialize};

/// Errors raised when constructing geometry from untrusted input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("Selection has non-positive size ({width}x{height})")]
    EmptySelection { width: f64, height: f64 },

    #[error("Selection contains a non-finite coordinate")]
    NonFinite,
}

/// A 2D point in display or page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Scale both axes independently (display → native resolution).
    pub fn scaled(&self, sx: f64, sy: f64) -> Point {
        Point::new(self.x * sx, self.y * sy)
    }
}

/// A user-dragged rectangle in page coordinates.
///
/// Width and height are always strictly positive; the only way to obtain
/// one is through [`SelectionRect::new`]. Once built it cannot change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SelectionRect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl SelectionRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Result<Self, GeometryError> {
        if ![x, y, width, height].iter().all(|v| v.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        if width <= 0.0 || height <= 0.0 {
            return Err(GeometryError::EmptySelection { width, height });
        }
        Ok(Self { x, y, width, height })
    }

    /// Build a selection from the two corners of a drag gesture,
    /// regardless of drag direction.
    pub fn from_corners(a: Point, b: Point) -> Result<Self, GeometryError> {
        Self::new(
            a.x.min(b.x),
            a.y.min(b.y),
            (a.x - b.x).abs(),
            (a.y - b.y).abs(),
        )
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }
}

/// An integer rectangle inside a bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Round a floating-point rectangle to integers and intersect it with
    /// `[0, bound_width) x [0, bound_height)`.
    ///
    /// Returns `None` when nothing of the rectangle remains inside the bounds.
    pub fn clamped(
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        bound_width: u32,
        bound_height: u32,
    ) -> Option<Self> {
        if ![x, y, width, height].iter().all(|v| v.is_finite()) {
            return None;
        }
        let (x, y) = (x.round(), y.round());
        let (w, h) = (width.round(), height.round());

        let left = x.max(0.0);
        let top = y.max(0.0);
        let right = (x + w).min(bound_width as f64);
        let bottom = (y + h).min(bound_height as f64);

        if right <= left || bottom <= top {
            return None;
        }
        Some(Self {
            x: left as u32,
            y: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }

    /// Intersect an existing pixel rectangle with new bounds.
    pub fn clamp_to(&self, bound_width: u32, bound_height: u32) -> Option<Self> {
        Self::clamped(
            self.x as f64,
            self.y as f64,
            self.width as f64,
            self.height as f64,
            bound_width,
            bound_height,
        )
    }
}

/// Which coordinate frame a capture's pixels are believed to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpaceHint {
    FullScreen,
    MultiMonitorScreen,
    BrowserWindow,
    ViewportOnly,
    Unknown,
}

/// Shape of a captured bitmap: its pixel size and believed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSpace {
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub hint: SpaceHint,
}

/// Snapshot of window, viewport and screen geometry at capture time.
///
/// Must be re-read for every capture attempt: the window can move or
/// resize between user actions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportMetrics {
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub device_pixel_ratio: f64,
    pub outer_width: f64,
    pub outer_height: f64,
    pub screen_width: f64,
    pub screen_height: f64,
    pub window_screen_x: f64,
    pub window_screen_y: f64,
}

impl Default for ViewportMetrics {
    fn default() -> Self {
        Self {
            viewport_width: 1280.0,
            viewport_height: 720.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
            device_pixel_ratio: 1.0,
            outer_width: 1280.0,
            outer_height: 800.0,
            screen_width: 1920.0,
            screen_height: 1080.0,
            window_screen_x: 0.0,
            window_screen_y: 0.0,
        }
    }
}

impl ViewportMetrics {
    /// Device pixel ratio, guarded against zero/negative/NaN reports.
    pub fn dpr(&self) -> f64 {
        if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        }
    }

    /// Vertical CSS pixels taken by browser UI above the viewport.
    pub fn chrome_height(&self) -> f64 {
        (self.outer_height - self.viewport_height).max(0.0)
    }

    /// Translate a page-space selection origin into viewport space.
    pub fn to_viewport(&self, selection: &SelectionRect) -> Point {
        Point::new(selection.x() - self.scroll_x, selection.y() - self.scroll_y)
    }
}
