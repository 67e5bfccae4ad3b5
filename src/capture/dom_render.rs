//! Document-to-bitmap rendering provider.
//!
//! Two instances normally sit in the fallback chain, differing only in
//! their `RenderProfile`: a high-fidelity pass rendered at the device
//! pixel ratio, and a conservative pass at 1x that tolerates tainted
//! cross-origin images.
//!
//! Whatever the profile, the widget's own UI is always excluded from the
//! render. Otherwise the capture would contain the capture overlay itself.

use super::{CaptureError, CaptureKind, CaptureProvider, CaptureRequest, RawCapture, SpaceHint};
use crate::geometry::{SelectionRect, ViewportMetrics};
use async_trait::async_trait;
use image::RgbaImage;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Selectors matching the widget's own chrome: overlays, toolbars, modals.
pub const OWN_CHROME_SELECTORS: &[&str] = &[
    "[data-snip-chrome]",
    ".snip-overlay",
    ".snip-toolbar",
    ".snip-modal",
    ".snip-launcher",
];

/// Tolerance when deciding whether the render scale equals the device ratio.
const SCALE_EPSILON: f64 = 0.01;

/// Options passed to the renderer for one render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub scale: f64,
    pub tolerate_cross_origin: bool,
    pub exclude_selectors: Vec<String>,
    pub background_color: Option<String>,
    /// Page-space region to render; `None` renders the full document.
    pub clip: Option<SelectionRect>,
    /// Selector of the element being captured, for element captures.
    pub element_selector: Option<String>,
}

/// A document-to-bitmap renderer. Always renders from the document root;
/// `options.clip` narrows the output.
#[async_trait]
pub trait DomRenderer: Send + Sync {
    async fn render(&self, options: &RenderOptions) -> Result<RgbaImage, CaptureError>;
}

/// Quality/compatibility knobs for one DOM-render provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderProfile {
    pub name: String,
    /// Render scale. `None` renders at the device pixel ratio.
    pub scale: Option<f64>,
    pub tolerate_cross_origin: bool,
    pub background_color: Option<String>,
}

impl RenderProfile {
    pub fn high_fidelity() -> Self {
        Self {
            name: "dom-render-hifi".to_string(),
            scale: None,
            tolerate_cross_origin: false,
            background_color: None,
        }
    }

    pub fn conservative() -> Self {
        Self {
            name: "dom-render-safe".to_string(),
            scale: Some(1.0),
            tolerate_cross_origin: true,
            background_color: Some("#ffffff".to_string()),
        }
    }
}

/// Provider that renders the page through a `DomRenderer`.
pub struct DomRenderProvider {
    renderer: Arc<dyn DomRenderer>,
    profile: RenderProfile,
    extra_excludes: Vec<String>,
    settle_delay: Duration,
}

impl DomRenderProvider {
    pub fn new(renderer: Arc<dyn DomRenderer>, profile: RenderProfile) -> Self {
        Self {
            renderer,
            profile,
            extra_excludes: Vec::new(),
            settle_delay: Duration::ZERO,
        }
    }

    /// Additional selectors to exclude on top of the widget's own chrome.
    pub fn with_excludes(mut self, selectors: Vec<String>) -> Self {
        self.extra_excludes = selectors;
        self
    }

    /// Fixed wait before rendering so freshly hidden UI has left the layout.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Own chrome first, then configured extras, without duplicates.
    fn exclusion_list(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let candidates = OWN_CHROME_SELECTORS
            .iter()
            .map(|s| s.to_string())
            .chain(self.extra_excludes.iter().map(|s| s.trim().to_string()));
        for selector in candidates {
            if !selector.is_empty() && !out.contains(&selector) {
                out.push(selector);
            }
        }
        out
    }

    fn options_for(&self, request: &CaptureRequest) -> RenderOptions {
        let metrics = &request.metrics;
        let (clip, element_selector) = match &request.kind {
            CaptureKind::WholePage => (None, None),
            // Area captures render exactly the visible viewport so the
            // result lines up with viewport coordinates.
            CaptureKind::Area(_) => (
                SelectionRect::new(
                    metrics.scroll_x,
                    metrics.scroll_y,
                    metrics.viewport_width,
                    metrics.viewport_height,
                )
                .ok(),
                None,
            ),
            // Elements may sit outside the viewport; render their own box.
            CaptureKind::Element(el) => (Some(el.bounds), Some(el.selector.clone())),
        };
        RenderOptions {
            scale: self.profile.scale.unwrap_or_else(|| metrics.dpr()),
            tolerate_cross_origin: self.profile.tolerate_cross_origin,
            exclude_selectors: self.exclusion_list(),
            background_color: self.profile.background_color.clone(),
            clip,
            element_selector,
        }
    }
}

#[async_trait]
impl CaptureProvider for DomRenderProvider {
    fn name(&self) -> &str {
        &self.profile.name
    }

    async fn capture(&self, request: &CaptureRequest) -> Result<RawCapture, CaptureError> {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let options = self.options_for(request);
        let start = Instant::now();
        let bitmap = self.renderer.render(&options).await?;
        log::info!(
            "[CAPTURE] {}: rendered {}x{} at scale {:.2} in {}ms",
            self.name(),
            bitmap.width(),
            bitmap.height(),
            options.scale,
            start.elapsed().as_millis()
        );

        // Only a viewport render at exactly the device ratio is trustworthy
        // as viewport space; anything else is left for proportional mapping.
        let at_device_ratio = (options.scale - request.metrics.dpr()).abs() < SCALE_EPSILON;
        let hint = if options.clip.is_some() && at_device_ratio {
            SpaceHint::ViewportOnly
        } else {
            SpaceHint::Unknown
        };
        let raw = RawCapture::new(bitmap, hint)?;
        Ok(match (&request.kind, options.clip) {
            // The bitmap is the element's box, so it is mapped as a viewport
            // scrolled to that box.
            (CaptureKind::Element(_), Some(clip)) => raw.with_viewport(ViewportMetrics {
                viewport_width: clip.width(),
                viewport_height: clip.height(),
                scroll_x: clip.x(),
                scroll_y: clip.y(),
                ..request.metrics
            }),
            _ => raw,
        })
    }
}
