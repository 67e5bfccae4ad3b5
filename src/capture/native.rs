//! Native display capture backed by xcap.
//!
//! Grabs the primary monitor. There is no permission prompt to wait on,
//! so `request_capture` resolves immediately; the frame itself is taken on
//! a blocking thread because xcap's capture call is synchronous.

use super::{CaptureError, DisplayCapture, DisplaySurface, MediaStream, StreamError, SurfaceRequest};
use async_trait::async_trait;
use image::RgbaImage;
use xcap::Monitor;

/// `DisplayCapture` over the machine's monitors.
#[derive(Debug, Default)]
pub struct XcapDisplay;

impl XcapDisplay {
    pub fn new() -> Self {
        Self
    }
}

fn primary_monitor() -> Result<Monitor, CaptureError> {
    let monitors = Monitor::all()
        .map_err(|e| CaptureError::Unsupported(format!("Cannot enumerate monitors: {}", e)))?;
    let mut fallback = None;
    for monitor in monitors {
        if monitor.is_primary().unwrap_or(false) {
            return Ok(monitor);
        }
        fallback.get_or_insert(monitor);
    }
    fallback.ok_or_else(|| CaptureError::Unsupported("No monitors found".to_string()))
}

#[async_trait]
impl DisplayCapture for XcapDisplay {
    async fn request_capture(
        &self,
        request: SurfaceRequest,
    ) -> Result<Box<dyn MediaStream>, CaptureError> {
        // Tabs and windows aren't addressable from here; the whole monitor is
        // the closest surface, and the stream says so.
        let monitor_id = primary_monitor()?
            .id()
            .map_err(|e| CaptureError::Unsupported(format!("Monitor has no id: {}", e)))?;
        log::debug!(
            "[CAPTURE] xcap: {:?} requested, using monitor {}",
            request,
            monitor_id
        );
        Ok(Box::new(XcapStream {
            monitor_id,
            stopped: false,
        }))
    }
}

/// Holds the monitor id only; the monitor is looked up again per frame.
struct XcapStream {
    monitor_id: u32,
    stopped: bool,
}

fn capture_monitor(monitor_id: u32) -> Result<RgbaImage, CaptureError> {
    let monitors = Monitor::all()
        .map_err(|e| CaptureError::Unsupported(format!("Cannot enumerate monitors: {}", e)))?;
    let monitor = monitors
        .into_iter()
        .find(|m| m.id().ok() == Some(monitor_id))
        .ok_or_else(|| CaptureError::Unsupported(format!("Monitor {} disappeared", monitor_id)))?;

    let frame = monitor.capture_image().map_err(|e| {
        let message = e.to_string();
        if message.to_lowercase().contains("permission") {
            CaptureError::PermissionDenied(message)
        } else {
            CaptureError::RenderFailure(format!("Monitor capture failed: {}", message))
        }
    })?;

    let (width, height) = (frame.width(), frame.height());
    RgbaImage::from_raw(width, height, frame.into_raw())
        .ok_or_else(|| CaptureError::RenderFailure("Monitor frame has a bad buffer size".to_string()))
}

#[async_trait]
impl MediaStream for XcapStream {
    fn surface(&self) -> DisplaySurface {
        DisplaySurface::Monitor
    }

    async fn grab_frame(&mut self) -> Result<RgbaImage, CaptureError> {
        if self.stopped {
            return Err(CaptureError::Unsupported("Stream already stopped".to_string()));
        }
        let monitor_id = self.monitor_id;
        tokio::task::spawn_blocking(move || capture_monitor(monitor_id))
            .await
            .map_err(|e| CaptureError::RenderFailure(format!("Capture task failed: {}", e)))?
    }

    fn stop(&mut self) -> Result<(), StreamError> {
        self.stopped = true;
        Ok(())
    }
}
