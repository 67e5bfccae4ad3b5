//! Fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use feedback_snip::capture::{
    CaptureError, CaptureProvider, CaptureRequest, DisplayCapture, DisplaySurface, DomRenderer,
    MediaStream, RawCapture, RenderOptions, SpaceHint, StreamError, SurfaceRequest,
};
use feedback_snip::geometry::ViewportMetrics;
use feedback_snip::PageEnvironment;
use image::{Rgba, RgbaImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Height of the fake document in CSS pixels.
pub const PAGE_HEIGHT: f64 = 1500.0;

/// Colour encoding the page-space coordinate a pixel came from.
pub fn page_color(page_x: f64, page_y: f64) -> Rgba<u8> {
    Rgba([
        (page_x.floor() as i64).rem_euclid(251) as u8,
        (page_y.floor() as i64).rem_euclid(251) as u8,
        40,
        255,
    ])
}

// ── Page environment ─────────────────────────────────────────────────

/// Environment that counts how often metrics were read.
pub struct CountingEnv {
    pub metrics: ViewportMetrics,
    pub reads: AtomicUsize,
}

impl CountingEnv {
    pub fn new(metrics: ViewportMetrics) -> Self {
        Self {
            metrics,
            reads: AtomicUsize::new(0),
        }
    }
}

impl PageEnvironment for CountingEnv {
    fn metrics(&self) -> ViewportMetrics {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.metrics
    }

    fn page_url(&self) -> Option<String> {
        Some("https://shop.example/checkout".to_string())
    }
}

// ── Scripted providers ───────────────────────────────────────────────

/// Provider that appends its name to a shared log, then fails or succeeds.
pub struct Scripted {
    pub name: String,
    pub log: Arc<Mutex<Vec<String>>>,
    pub succeed: bool,
}

impl Scripted {
    pub fn boxed(name: &str, log: &Arc<Mutex<Vec<String>>>, succeed: bool) -> Box<Self> {
        Box::new(Self {
            name: name.to_string(),
            log: log.clone(),
            succeed,
        })
    }
}

#[async_trait]
impl CaptureProvider for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    async fn capture(&self, _request: &CaptureRequest) -> Result<RawCapture, CaptureError> {
        self.log.lock().unwrap().push(self.name.clone());
        if self.succeed {
            RawCapture::new(RgbaImage::new(64, 32), SpaceHint::ViewportOnly)
        } else {
            Err(CaptureError::RenderFailure(format!("{} failed", self.name)))
        }
    }
}

// ── Display capture ──────────────────────────────────────────────────

/// How a fake stream behaves once acquired.
#[derive(Clone, PartialEq)]
pub enum FrameBehavior {
    Hang,
    Fail,
    Frame(RgbaImage),
}

/// Display capture with scripted streams. Tracks how many streams are live.
pub struct FakeDisplay {
    pub active: Arc<AtomicUsize>,
    pub behavior: FrameBehavior,
}

impl FakeDisplay {
    pub fn new(behavior: FrameBehavior) -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            behavior,
        }
    }
}

struct FakeStream {
    active: Arc<AtomicUsize>,
    behavior: FrameBehavior,
    stopped: bool,
}

#[async_trait]
impl DisplayCapture for FakeDisplay {
    async fn request_capture(
        &self,
        _request: SurfaceRequest,
    ) -> Result<Box<dyn MediaStream>, CaptureError> {
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            active: self.active.clone(),
            behavior: self.behavior.clone(),
            stopped: false,
        }))
    }
}

#[async_trait]
impl MediaStream for FakeStream {
    fn surface(&self) -> DisplaySurface {
        DisplaySurface::BrowserTab
    }

    async fn grab_frame(&mut self) -> Result<RgbaImage, CaptureError> {
        match &self.behavior {
            FrameBehavior::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            FrameBehavior::Fail => Err(CaptureError::RenderFailure("black frame".to_string())),
            FrameBehavior::Frame(frame) => Ok(frame.clone()),
        }
    }

    fn stop(&mut self) -> Result<(), StreamError> {
        if !self.stopped {
            self.stopped = true;
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Provider that records how many display streams were live when it started.
pub struct ObservesStreams {
    pub active: Arc<AtomicUsize>,
    pub seen_active: Arc<Mutex<Option<usize>>>,
}

#[async_trait]
impl CaptureProvider for ObservesStreams {
    fn name(&self) -> &str {
        "observer"
    }

    async fn capture(&self, _request: &CaptureRequest) -> Result<RawCapture, CaptureError> {
        *self.seen_active.lock().unwrap() = Some(self.active.load(Ordering::SeqCst));
        RawCapture::new(RgbaImage::new(16, 16), SpaceHint::Unknown)
    }
}

// ── DOM renderer ─────────────────────────────────────────────────────

/// Renderer that paints each pixel with the page coordinate it depicts.
/// Records the options it was called with.
#[derive(Default)]
pub struct FakeRenderer {
    pub calls: Mutex<Vec<RenderOptions>>,
    pub fail: bool,
}

#[async_trait]
impl DomRenderer for FakeRenderer {
    async fn render(&self, options: &RenderOptions) -> Result<RgbaImage, CaptureError> {
        self.calls.lock().unwrap().push(options.clone());
        if self.fail {
            return Err(CaptureError::RenderFailure("unsupported CSS".to_string()));
        }
        Ok(render_page(options))
    }
}

/// Paint the page region `options` asks for, one page coordinate per pixel.
pub fn render_page(options: &RenderOptions) -> RgbaImage {
    let (origin_x, origin_y, width, height) = match &options.clip {
        Some(clip) => (clip.x(), clip.y(), clip.width(), clip.height()),
        None => (0.0, 0.0, 1280.0, PAGE_HEIGHT),
    };
    let scale = options.scale;
    let w = (width * scale).round() as u32;
    let h = (height * scale).round() as u32;
    RgbaImage::from_fn(w, h, |px, py| {
        page_color(origin_x + px as f64 / scale, origin_y + py as f64 / scale)
    })
}

/// A viewport-sized frame as a tab share would deliver it.
pub fn viewport_frame(metrics: &ViewportMetrics) -> RgbaImage {
    let dpr = metrics.dpr();
    let w = (metrics.viewport_width * dpr).round() as u32;
    let h = (metrics.viewport_height * dpr).round() as u32;
    RgbaImage::from_fn(w, h, |px, py| {
        page_color(
            metrics.scroll_x + px as f64 / dpr,
            metrics.scroll_y + py as f64 / dpr,
        )
    })
}
