//! Screen capture domain — public API.
//!
//! This module owns every way of turning "the page as the user sees it"
//! into a bitmap. External code should only use the items exported here.
//!
//! Providers (tried in this order by default):
//!   - display_stream.rs — OS-level screen/window share
//!   - dom_render.rs     — document-to-bitmap renderer, two quality profiles
//!   - server_side.rs    — remote rendering service over HTTP
//!
//! orchestrator.rs walks the provider list and falls back on failure.

mod display_stream;
mod dom_render;
mod error;
#[cfg(feature = "native-capture")]
pub mod native;
mod orchestrator;
mod provider;
mod server_side;

pub use display_stream::{
    DisplayCapture, DisplayStreamProvider, DisplaySurface, MediaStream, StreamError,
    SurfaceRequest,
};
pub use dom_render::{
    DomRenderProvider, DomRenderer, RenderOptions, RenderProfile, OWN_CHROME_SELECTORS,
};
pub use error::{CaptureError, ProviderFailure};
pub use orchestrator::{CaptureOrchestrator, Captured};
pub use provider::CaptureProvider;
pub use server_side::ServerSideProvider;

pub use crate::geometry::SpaceHint;

use crate::geometry::{CaptureSpace, SelectionRect, ViewportMetrics};
use image::RgbaImage;

/// A page element the user asked to capture.
///
/// `bounds` is the element's bounding box in page coordinates, as reported
/// by the surrounding UI at the time of the request. `selector` is handed
/// to renderers that can resolve the element themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementRef {
    pub selector: String,
    pub bounds: SelectionRect,
}

/// What the caller wants captured.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureKind {
    WholePage,
    Area(SelectionRect),
    Element(ElementRef),
}

impl CaptureKind {
    /// The page-space region that will be cropped out afterwards, if any.
    pub fn region(&self) -> Option<SelectionRect> {
        match self {
            CaptureKind::WholePage => None,
            CaptureKind::Area(sel) => Some(*sel),
            CaptureKind::Element(el) => Some(el.bounds),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CaptureKind::WholePage => "whole-page",
            CaptureKind::Area(_) => "area",
            CaptureKind::Element(_) => "element",
        }
    }
}

/// Everything a provider needs for one attempt.
///
/// Built fresh by the orchestrator before every provider attempt.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub kind: CaptureKind,
    pub metrics: ViewportMetrics,
    pub page_url: Option<String>,
}

/// Source of live page geometry and identity.
pub trait PageEnvironment: Send + Sync {
    /// Current window/viewport/screen metrics. Called once per attempt.
    fn metrics(&self) -> ViewportMetrics;

    /// URL of the page being captured (needed by the server-side provider).
    fn page_url(&self) -> Option<String> {
        None
    }
}

/// A fixed environment, for embedders that push metrics in from
/// elsewhere, and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    pub metrics: ViewportMetrics,
    pub page_url: Option<String>,
}

impl PageEnvironment for StaticEnvironment {
    fn metrics(&self) -> ViewportMetrics {
        self.metrics
    }

    fn page_url(&self) -> Option<String> {
        self.page_url.clone()
    }
}

/// Pixels returned by a provider, tagged with their believed coordinate frame.
///
/// Never empty and never mutated after construction.
#[derive(Debug, Clone)]
pub struct RawCapture {
    pixels: RgbaImage,
    space_hint: SpaceHint,
    viewport: Option<ViewportMetrics>,
}

impl RawCapture {
    pub fn new(pixels: RgbaImage, space_hint: SpaceHint) -> Result<Self, CaptureError> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(CaptureError::RenderFailure(
                "Capture produced an empty bitmap".to_string(),
            ));
        }
        Ok(Self {
            pixels,
            space_hint,
            viewport: None,
        })
    }

    /// Mark the pixels as rendered for `viewport` rather than the live one.
    ///
    /// Renderers that can draw any part of the document use this for
    /// regions outside the visible viewport; cropping then maps against
    /// these metrics instead of the attempt's snapshot.
    pub fn with_viewport(mut self, viewport: ViewportMetrics) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn viewport(&self) -> Option<ViewportMetrics> {
        self.viewport
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pixel_width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn pixel_height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn space_hint(&self) -> SpaceHint {
        self.space_hint
    }

    /// Dimensions and hint without the pixels; all the reconciler needs.
    pub fn space(&self) -> CaptureSpace {
        CaptureSpace {
            pixel_width: self.pixel_width(),
            pixel_height: self.pixel_height(),
            hint: self.space_hint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_capture_rejects_empty_bitmap() {
        let result = RawCapture::new(RgbaImage::new(0, 10), SpaceHint::Unknown);
        assert!(matches!(result, Err(CaptureError::RenderFailure(_))));
    }

    #[test]
    fn element_kind_exposes_bounds_as_region() {
        let bounds = SelectionRect::new(10.0, 20.0, 30.0, 40.0).unwrap();
        let kind = CaptureKind::Element(ElementRef {
            selector: "#checkout".to_string(),
            bounds,
        });
        assert_eq!(kind.region(), Some(bounds));
        assert_eq!(CaptureKind::WholePage.region(), None);
    }
}
