//! OS-level display capture (screen / window / tab share).
//!
//! Highest fidelity, most fragile: the user may deny the permission prompt,
//! pick a different surface than the one we asked for, or the environment
//! may not offer display capture at all.
//!
//! The acquired stream is wrapped in a `StreamGuard` so it is stopped on
//! every exit path — including the attempt future being dropped by a
//! timeout or a user cancel. A stream left running keeps the OS capture
//! indicator lit.

use super::{CaptureError, CaptureProvider, CaptureRequest, RawCapture, SpaceHint};
use crate::geometry::ViewportMetrics;
use async_trait::async_trait;
use image::RgbaImage;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Multi-monitor threshold: a monitor frame wider than this multiple of
/// `screen_width * dpr` spans more than one screen.
const MULTI_MONITOR_FACTOR: f64 = 1.1;

/// Default budget. Includes time the user spends on the permission prompt.
const DISPLAY_TIMEOUT: Duration = Duration::from_secs(60);

/// Which surface to ask the OS for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceRequest {
    CurrentTab,
    Window,
    Screen,
}

/// Which surface the OS actually handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplaySurface {
    Monitor,
    Window,
    BrowserTab,
    Unknown,
}

/// Stopping a stream failed. Logged, never propagated.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Failed to stop display stream: {0}")]
pub struct StreamError(pub String);

/// An OS display-capture mechanism.
#[async_trait]
pub trait DisplayCapture: Send + Sync {
    /// Ask for a stream. Suspends until the user answers any permission prompt.
    async fn request_capture(
        &self,
        request: SurfaceRequest,
    ) -> Result<Box<dyn MediaStream>, CaptureError>;
}

/// A live capture stream.
#[async_trait]
pub trait MediaStream: Send {
    fn surface(&self) -> DisplaySurface;

    /// Decode the current frame into a bitmap.
    async fn grab_frame(&mut self) -> Result<RgbaImage, CaptureError>;

    /// Stop all tracks.
    fn stop(&mut self) -> Result<(), StreamError>;
}

/// Owns a stream and stops it exactly once, explicitly via `release()`
/// or implicitly on drop.
struct StreamGuard {
    stream: Option<Box<dyn MediaStream>>,
    provider: String,
}

impl StreamGuard {
    fn new(stream: Box<dyn MediaStream>, provider: &str) -> Self {
        Self {
            stream: Some(stream),
            provider: provider.to_string(),
        }
    }

    fn surface(&self) -> DisplaySurface {
        self.stream
            .as_ref()
            .map(|s| s.surface())
            .unwrap_or(DisplaySurface::Unknown)
    }

    async fn grab_frame(&mut self) -> Result<RgbaImage, CaptureError> {
        match self.stream.as_mut() {
            Some(stream) => stream.grab_frame().await,
            None => Err(CaptureError::Unsupported("Stream already released".to_string())),
        }
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            match stream.stop() {
                Ok(()) => log::debug!("[CAPTURE] {}: stream stopped", self.provider),
                Err(e) => log::warn!("[CAPTURE] {}: {}", self.provider, e),
            }
        }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Guess the coordinate frame of a display frame from the surface the OS
/// reports and the frame width.
pub(crate) fn infer_space_hint(
    surface: DisplaySurface,
    frame_width: u32,
    metrics: &ViewportMetrics,
) -> SpaceHint {
    match surface {
        DisplaySurface::BrowserTab => SpaceHint::ViewportOnly,
        DisplaySurface::Window => SpaceHint::BrowserWindow,
        DisplaySurface::Monitor => {
            let single_screen = metrics.screen_width * metrics.dpr();
            if frame_width as f64 > single_screen * MULTI_MONITOR_FACTOR {
                SpaceHint::MultiMonitorScreen
            } else {
                SpaceHint::FullScreen
            }
        }
        DisplaySurface::Unknown => SpaceHint::Unknown,
    }
}

/// Provider backed by a `DisplayCapture` implementation.
pub struct DisplayStreamProvider {
    display: Arc<dyn DisplayCapture>,
    surface: SurfaceRequest,
    timeout: Duration,
}

impl DisplayStreamProvider {
    pub fn new(display: Arc<dyn DisplayCapture>) -> Self {
        Self {
            display,
            // A tab share avoids any chrome/screen offset guesswork.
            surface: SurfaceRequest::CurrentTab,
            timeout: DISPLAY_TIMEOUT,
        }
    }

    pub fn with_surface(mut self, surface: SurfaceRequest) -> Self {
        self.surface = surface;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl CaptureProvider for DisplayStreamProvider {
    fn name(&self) -> &str {
        "display-stream"
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }

    async fn capture(&self, request: &CaptureRequest) -> Result<RawCapture, CaptureError> {
        let start = Instant::now();
        let surface_request = self.surface;

        let stream = self.display.request_capture(surface_request).await?;
        let mut guard = StreamGuard::new(stream, self.name());
        log::info!(
            "[CAPTURE] display-stream: granted {:?} (asked {:?}) in {}ms",
            guard.surface(),
            surface_request,
            start.elapsed().as_millis()
        );

        let frame = guard.grab_frame().await;
        let surface = guard.surface();
        // Released before returning on both paths, not left to drop order.
        guard.release();

        let frame = frame?;
        let hint = infer_space_hint(surface, frame.width(), &request.metrics);
        log::info!(
            "[CAPTURE] display-stream: {}x{} frame, hint={:?}, {}ms",
            frame.width(),
            frame.height(),
            hint,
            start.elapsed().as_millis()
        );
        RawCapture::new(frame, hint)
    }
}
