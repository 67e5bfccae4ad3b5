//! Annotation session handed back to the UI after a successful capture.

use super::SessionError;
use crate::annotate::{AnnotationEngine, AnnotationPrimitive, Color, Tool};
use crate::config::CaptureConfig;
use crate::crop::{CropOutcome, CropStatus};
use crate::encode;
use crate::geometry::{PixelRect, Point};
use image::RgbaImage;
use serde::Serialize;

/// Flattened, encoded result of a session.
#[derive(Debug, Clone)]
pub struct FinalImage {
    png: Vec<u8>,
    meta: FinalImageMeta,
}

/// Everything the UI needs to know about a final image besides its bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalImageMeta {
    pub width: u32,
    pub height: u32,
    pub crop_status: CropStatus,
    /// True when the crop was a center fallback and may show the wrong content.
    pub degraded: bool,
    pub provider: String,
    pub annotation_count: usize,
    /// `sha256:<hex>` of the PNG bytes.
    pub digest: String,
}

impl FinalImage {
    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn into_png(self) -> Vec<u8> {
        self.png
    }

    pub fn meta(&self) -> &FinalImageMeta {
        &self.meta
    }

    pub fn width(&self) -> u32 {
        self.meta.width
    }

    pub fn height(&self) -> u32 {
        self.meta.height
    }

    /// `data:image/png;base64,...`
    pub fn to_data_url(&self) -> String {
        encode::png_data_url(&self.png)
    }
}

pub struct CaptureSessionHandle {
    engine: AnnotationEngine,
    status: CropStatus,
    source: PixelRect,
    provider: String,
}

impl CaptureSessionHandle {
    pub(crate) fn new(outcome: CropOutcome, provider: String, config: &CaptureConfig) -> Self {
        let mut engine = AnnotationEngine::new(outcome.image);
        match config.default_color.parse::<Color>() {
            Ok(color) => engine.set_color(color),
            Err(e) => log::warn!("[SESSION] Default colour ignored: {}", e),
        }
        engine.set_thickness(config.default_thickness);

        Self {
            engine,
            status: outcome.status,
            source: outcome.source,
            provider,
        }
    }

    pub fn crop_status(&self) -> CropStatus {
        self.status
    }

    pub fn is_degraded(&self) -> bool {
        self.status == CropStatus::CenterFallback
    }

    /// Rectangle of the raw capture the base image was copied from.
    pub fn source_rect(&self) -> PixelRect {
        self.source
    }

    /// Name of the provider that produced the capture.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Native size of the base image.
    pub fn image_size(&self) -> (u32, u32) {
        (self.engine.base().width(), self.engine.base().height())
    }

    // ── Editing ─────────────────────────────────────────────────────

    pub fn set_tool(&mut self, tool: Tool) {
        self.engine.set_tool(tool);
    }

    pub fn set_color(&mut self, color: Color) {
        self.engine.set_color(color);
    }

    /// Parse and apply a colour from the UI (`#rgb`, `#rrggbb`, `#rrggbbaa`, or a name).
    pub fn set_color_str(&mut self, color: &str) -> Result<(), SessionError> {
        self.engine.set_color(color.parse()?);
        Ok(())
    }

    pub fn set_thickness(&mut self, thickness: u32) {
        self.engine.set_thickness(thickness);
    }

    /// Size the base image is shown at; pointer coordinates use this space.
    pub fn set_display_size(&mut self, width: u32, height: u32) {
        self.engine.set_display_size(width, height);
    }

    pub fn clear_annotations(&mut self) {
        self.engine.clear();
    }

    pub fn undo_last(&mut self) -> Option<AnnotationPrimitive> {
        self.engine.undo_last()
    }

    pub fn pointer_down(&mut self, at: Point) {
        self.engine.pointer_down(at);
    }

    pub fn pointer_move(&mut self, at: Point) {
        self.engine.pointer_move(at);
    }

    pub fn pointer_up(&mut self, at: Point) -> bool {
        self.engine.pointer_up(at)
    }

    pub fn primitives(&self) -> &[AnnotationPrimitive] {
        self.engine.primitives()
    }

    pub fn redraw(&self) -> RgbaImage {
        self.engine.redraw()
    }

    // ── Completion ──────────────────────────────────────────────────

    /// Discard the session. Nothing external is held during annotation,
    /// so this only drops the in-memory state.
    pub fn cancel(self) {
        log::info!(
            "[SESSION] Annotation cancelled ({} primitive(s) discarded)",
            self.engine.primitives().len()
        );
    }

    /// Flatten annotations onto the base image at native resolution and encode as PNG.
    pub fn finalize(&self) -> Result<FinalImage, SessionError> {
        let start = std::time::Instant::now();
        let flat = self.engine.finalize();
        let png = encode::encode_png(&flat)?;
        let meta = FinalImageMeta {
            width: flat.width(),
            height: flat.height(),
            crop_status: self.status,
            degraded: self.is_degraded(),
            provider: self.provider.clone(),
            annotation_count: self.engine.primitives().len(),
            digest: encode::sha256_digest(&png),
        };
        log::info!(
            "[SESSION] Final image {}x{} ({} bytes, {}, via {}) in {}ms",
            meta.width,
            meta.height,
            png.len(),
            self.status.label(),
            self.provider,
            start.elapsed().as_millis()
        );
        Ok(FinalImage { png, meta })
    }

    /// `finalize` on the blocking pool, so flattening and PNG encoding of
    /// a large capture don't stall the UI's runtime.
    pub async fn finalize_async(self) -> Result<FinalImage, SessionError> {
        match tokio::task::spawn_blocking(move || self.finalize()).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(SessionError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop::{CropStrategyKind, CroppedImage};
    use image::Rgba;

    fn handle(status: CropStatus) -> CaptureSessionHandle {
        let image = RgbaImage::from_fn(40, 30, |x, y| Rgba([x as u8, y as u8, 7, 255]));
        let outcome = CropOutcome {
            image: CroppedImage::new(image),
            status,
            source: PixelRect::new(0, 0, 40, 30),
        };
        CaptureSessionHandle::new(outcome, "fake".to_string(), &CaptureConfig::default())
    }

    #[test]
    fn finalize_without_annotations_round_trips_base() {
        let h = handle(CropStatus::Matched(CropStrategyKind::DirectDpr));
        let out = h.finalize().unwrap();
        let decoded = encode::decode_image(out.png_bytes()).unwrap();
        assert_eq!(&decoded, h.engine.base().pixels());
        assert_eq!(out.meta().annotation_count, 0);
        assert!(!out.meta().degraded);
        assert!(out.meta().digest.starts_with("sha256:"));
        assert!(out.to_data_url().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn degraded_status_is_reported() {
        let h = handle(CropStatus::CenterFallback);
        assert!(h.is_degraded());
        let meta = h.finalize().unwrap().meta().clone();
        assert!(meta.degraded);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["cropStatus"], "center-fallback");
        assert_eq!(json["provider"], "fake");
    }

    #[test]
    fn bad_colour_string_is_rejected() {
        let mut h = handle(CropStatus::WholeCapture);
        assert!(matches!(h.set_color_str("#12"), Err(SessionError::Color(_))));
        h.set_color_str("blue").unwrap();
        h.pointer_down(Point::new(1.0, 1.0));
        h.pointer_up(Point::new(20.0, 20.0));
        assert_eq!(h.primitives()[0].color(), Color::rgb(0, 0, 255));
    }

    #[tokio::test]
    async fn async_finalize_matches_sync_finalize() {
        let mut h = handle(CropStatus::WholeCapture);
        h.pointer_down(Point::new(2.0, 2.0));
        h.pointer_up(Point::new(30.0, 20.0));
        let sync = h.finalize().unwrap();
        let from_pool = h.finalize_async().await.unwrap();
        assert_eq!(from_pool.png_bytes(), sync.png_bytes());
        assert_eq!(from_pool.meta(), sync.meta());
    }

    #[test]
    fn annotations_change_the_final_image() {
        let mut h = handle(CropStatus::WholeCapture);
        h.set_tool(Tool::Line);
        h.pointer_down(Point::new(0.0, 15.0));
        h.pointer_up(Point::new(39.0, 15.0));
        let out = h.finalize().unwrap();
        let decoded = encode::decode_image(out.png_bytes()).unwrap();
        assert_eq!(decoded.get_pixel(20, 15), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.meta().annotation_count, 1);
    }
}
