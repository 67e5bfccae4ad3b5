//! Area cropper — turns a raw capture plus a selection into the base image
//! for annotation. Never fails: when no hypothesis yields a usable
//! rectangle it falls back to a centered crop and says so in the status.

use super::reconcile::{reconcile, CropStrategyKind};
use super::region::copy_region;
use crate::capture::RawCapture;
use crate::geometry::{PixelRect, SelectionRect, ViewportMetrics};
use image::RgbaImage;
use serde::Serialize;

/// Immutable base layer handed to the annotation engine.
#[derive(Debug, Clone)]
pub struct CroppedImage {
    pixels: RgbaImage,
}

impl CroppedImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// How the crop rectangle was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CropStatus {
    /// A reconciler hypothesis produced the rectangle.
    Matched(CropStrategyKind),
    /// Every hypothesis was rejected; the image may show the wrong content.
    CenterFallback,
    /// Whole-page capture, no cropping needed.
    WholeCapture,
}

impl CropStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CropStatus::Matched(kind) => kind.name(),
            CropStatus::CenterFallback => "center-fallback",
            CropStatus::WholeCapture => "whole-capture",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CropOutcome {
    pub image: CroppedImage,
    pub status: CropStatus,
    /// Rectangle copied out of the capture.
    pub source: PixelRect,
}

impl CropOutcome {
    pub fn is_degraded(&self) -> bool {
        self.status == CropStatus::CenterFallback
    }
}

/// Crop `capture` to `selection`.
///
/// Candidates are tried in reconciler order and the first one whose copy
/// succeeds wins; later (possibly "better") candidates are never consulted.
pub fn crop_area(
    capture: &RawCapture,
    selection: &SelectionRect,
    metrics: &ViewportMetrics,
) -> CropOutcome {
    let pixels = capture.pixels();

    for candidate in reconcile(selection, metrics, &capture.space()) {
        match copy_region(pixels, candidate.rect) {
            Ok(cropped) => {
                log::info!(
                    "[CROP] {} → {}x{} at ({}, {})",
                    candidate.strategy.name(),
                    candidate.rect.width,
                    candidate.rect.height,
                    candidate.rect.x,
                    candidate.rect.y
                );
                return CropOutcome {
                    image: CroppedImage::new(cropped),
                    status: CropStatus::Matched(candidate.strategy),
                    source: candidate.rect,
                };
            }
            Err(e) => {
                log::warn!("[CROP] {} copy failed: {}", candidate.strategy.name(), e);
            }
        }
    }

    let source = center_rect(capture, selection, metrics);
    log::warn!(
        "[CROP] No strategy matched a {}x{} capture — center crop {}x{}",
        capture.pixel_width(),
        capture.pixel_height(),
        source.width,
        source.height
    );
    let cropped = copy_region(pixels, source).unwrap_or_else(|_| pixels.clone());
    CropOutcome {
        image: CroppedImage::new(cropped),
        status: CropStatus::CenterFallback,
        source,
    }
}

/// Wrap a whole capture as the base image.
pub fn crop_whole(capture: &RawCapture) -> CropOutcome {
    CropOutcome {
        image: CroppedImage::new(capture.pixels().clone()),
        status: CropStatus::WholeCapture,
        source: PixelRect::new(0, 0, capture.pixel_width(), capture.pixel_height()),
    }
}

/// The requested size at device density, clamped to the capture
/// (at least 1x1), centered.
fn center_rect(capture: &RawCapture, selection: &SelectionRect, metrics: &ViewportMetrics) -> PixelRect {
    let (cap_w, cap_h) = (capture.pixel_width(), capture.pixel_height());
    let dpr = metrics.dpr();
    let scaled = |v: f64, bound: u32| -> u32 {
        let px = (v * dpr).round();
        if px.is_finite() {
            (px.max(1.0) as u32).min(bound)
        } else {
            bound
        }
    };
    let width = scaled(selection.width(), cap_w);
    let height = scaled(selection.height(), cap_h);
    PixelRect::new((cap_w - width) / 2, (cap_h - height) / 2, width, height)
}
