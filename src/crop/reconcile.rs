//! Coordinate reconciliation — selection rectangle → capture pixels.
//!
//! A capture's `SpaceHint` is only a guess. The OS may hand back a whole
//! monitor when we asked for a tab, a renderer may silently rescale, the
//! window may sit on a second monitor. So rather than computing "the"
//! mapping, `reconcile` produces one candidate per plausible hypothesis,
//! in a fixed priority order, and leaves the choice to the cropper.
//!
//! Everything here is a pure function of plain values: no DOM, no bitmaps.

use crate::geometry::{CaptureSpace, PixelRect, SelectionRect, SpaceHint, ViewportMetrics};
use serde::Serialize;

/// Candidates smaller than this (in either dimension, after clamping) are discarded.
pub const MIN_CROP_PX: u32 = 10;

/// A monitor frame at least this fraction of `screen_width * dpr` is
/// treated as a full-screen capture.
const FULL_SCREEN_RATIO: f64 = 0.9;

/// Relative tolerance when matching a frame width against `outer_width * dpr`.
const WINDOW_WIDTH_TOLERANCE: f64 = 0.1;

/// Relative tolerance when matching a frame width against `viewport_width * dpr`.
const VIEWPORT_WIDTH_TOLERANCE: f64 = 0.02;

/// One hypothesis about what a capture contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CropStrategyKind {
    DirectDpr,
    BrowserWindowRelative,
    ScreenRelative,
    ProportionalFallback,
}

/// Priority order in which hypotheses are tested.
pub const STRATEGY_ORDER: [CropStrategyKind; 4] = [
    CropStrategyKind::DirectDpr,
    CropStrategyKind::BrowserWindowRelative,
    CropStrategyKind::ScreenRelative,
    CropStrategyKind::ProportionalFallback,
];

/// A clamped pixel rectangle produced under one hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub strategy: CropStrategyKind,
    pub rect: PixelRect,
}

/// Unclamped floating-point rectangle in capture pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

fn within(actual: f64, expected: f64, tolerance: f64) -> bool {
    expected > 0.0 && ((actual - expected) / expected).abs() <= tolerance
}

impl CropStrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            CropStrategyKind::DirectDpr => "direct-dpr",
            CropStrategyKind::BrowserWindowRelative => "browser-window-relative",
            CropStrategyKind::ScreenRelative => "screen-relative",
            CropStrategyKind::ProportionalFallback => "proportional-fallback",
        }
    }

    /// Whether this hypothesis is plausible for the given capture.
    pub fn applies(&self, metrics: &ViewportMetrics, space: &CaptureSpace) -> bool {
        let dpr = metrics.dpr();
        let frame_width = space.pixel_width as f64;
        match self {
            CropStrategyKind::DirectDpr => match space.hint {
                SpaceHint::ViewportOnly => true,
                SpaceHint::Unknown => within(
                    frame_width,
                    metrics.viewport_width * dpr,
                    VIEWPORT_WIDTH_TOLERANCE,
                ),
                _ => false,
            },
            CropStrategyKind::BrowserWindowRelative => {
                matches!(space.hint, SpaceHint::BrowserWindow | SpaceHint::Unknown)
                    && within(frame_width, metrics.outer_width * dpr, WINDOW_WIDTH_TOLERANCE)
            }
            CropStrategyKind::ScreenRelative => {
                matches!(
                    space.hint,
                    SpaceHint::FullScreen | SpaceHint::MultiMonitorScreen | SpaceHint::Unknown
                ) && metrics.screen_width > 0.0
                    && frame_width >= FULL_SCREEN_RATIO * metrics.screen_width * dpr
            }
            CropStrategyKind::ProportionalFallback => {
                metrics.viewport_width > 0.0 && metrics.viewport_height > 0.0
            }
        }
    }

    /// Map the selection into capture pixels under this hypothesis.
    pub fn project(
        &self,
        selection: &SelectionRect,
        metrics: &ViewportMetrics,
        space: &CaptureSpace,
    ) -> Projection {
        let dpr = metrics.dpr();
        let origin = metrics.to_viewport(selection);
        match self {
            CropStrategyKind::DirectDpr | CropStrategyKind::BrowserWindowRelative => Projection {
                x: origin.x * dpr,
                y: origin.y * dpr,
                width: selection.width() * dpr,
                height: selection.height() * dpr,
            },
            CropStrategyKind::ScreenRelative => Projection {
                x: (origin.x + metrics.window_screen_x) * dpr,
                y: (origin.y + metrics.window_screen_y + metrics.chrome_height()) * dpr,
                width: selection.width() * dpr,
                height: selection.height() * dpr,
            },
            CropStrategyKind::ProportionalFallback => {
                let sx = space.pixel_width as f64 / metrics.viewport_width;
                let sy = space.pixel_height as f64 / metrics.viewport_height;
                Projection {
                    x: origin.x * sx,
                    y: origin.y * sy,
                    width: selection.width() * sx,
                    height: selection.height() * sy,
                }
            }
        }
    }
}

/// Produce every surviving candidate, in `STRATEGY_ORDER`.
///
/// Each candidate is rounded, clamped to the capture bounds and dropped
/// if less than `MIN_CROP_PX` square remains.
pub fn reconcile(
    selection: &SelectionRect,
    metrics: &ViewportMetrics,
    space: &CaptureSpace,
) -> Vec<Candidate> {
    let mut candidates = Vec::with_capacity(STRATEGY_ORDER.len());
    for strategy in STRATEGY_ORDER {
        if !strategy.applies(metrics, space) {
            log::debug!("[CROP] {}: not applicable to {:?}", strategy.name(), space);
            continue;
        }
        let p = strategy.project(selection, metrics, space);
        match PixelRect::clamped(p.x, p.y, p.width, p.height, space.pixel_width, space.pixel_height)
        {
            Some(rect) if rect.width >= MIN_CROP_PX && rect.height >= MIN_CROP_PX => {
                log::debug!("[CROP] {}: candidate {:?}", strategy.name(), rect);
                candidates.push(Candidate { strategy, rect });
            }
            other => {
                log::debug!(
                    "[CROP] {}: rejected {:?} (clamped to {:?})",
                    strategy.name(),
                    p,
                    other
                );
            }
        }
    }
    candidates
}
