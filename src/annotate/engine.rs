//! Annotation engine — pointer-driven state machine over a cropped base image.
//!
//! States: `Idle` → `Drawing` (one primitive under construction) → `Idle`.
//! Pointer coordinates are in display space: the size the base image is
//! shown at in the UI, which may be smaller than its native size.
//! `finalize()` maps everything back to native resolution.

use super::primitive::{AnnotationPrimitive, Color, Tool, MAX_THICKNESS, MIN_THICKNESS};
use super::raster;
use crate::crop::CroppedImage;
use crate::geometry::Point;
use image::imageops::{self, FilterType};
use image::RgbaImage;

#[derive(Debug, Clone)]
enum Stroke {
    Freehand(Vec<Point>),
    Shape { tool: Tool, anchor: Point, current: Point },
}

#[derive(Debug, Clone)]
struct InProgress {
    stroke: Stroke,
    color: Color,
    thickness: u32,
}

impl InProgress {
    /// The primitive this stroke would commit as, ending at its current point.
    fn preview(&self) -> AnnotationPrimitive {
        match &self.stroke {
            Stroke::Freehand(points) => AnnotationPrimitive::Freehand {
                points: points.clone(),
                color: self.color,
                thickness: self.thickness,
            },
            Stroke::Shape { tool, anchor, current } => {
                AnnotationPrimitive::from_drag(*tool, *anchor, *current, self.color, self.thickness)
                    .unwrap_or_else(|| AnnotationPrimitive::Freehand {
                        points: vec![*anchor, *current],
                        color: self.color,
                        thickness: self.thickness,
                    })
            }
        }
    }
}

#[derive(Debug, Clone)]
enum DrawState {
    Idle,
    Drawing(InProgress),
}

pub struct AnnotationEngine {
    base: CroppedImage,
    /// Base image resized to the display size, cached for redraws.
    display_base: RgbaImage,
    primitives: Vec<AnnotationPrimitive>,
    state: DrawState,
    tool: Tool,
    color: Color,
    thickness: u32,
}

impl AnnotationEngine {
    /// Start a session displayed at the base image's native size.
    pub fn new(base: CroppedImage) -> Self {
        let display_base = base.pixels().clone();
        Self {
            base,
            display_base,
            primitives: Vec::new(),
            state: DrawState::Idle,
            tool: Tool::default(),
            color: Color::default(),
            thickness: 3,
        }
    }

    /// Start a session displayed at `width` x `height`.
    pub fn with_display_size(base: CroppedImage, width: u32, height: u32) -> Self {
        let mut engine = Self::new(base);
        engine.set_display_size(width, height);
        engine
    }

    /// Change the display size. Committed primitives keep their
    /// coordinates; callers resizing mid-session should clear first.
    pub fn set_display_size(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) == self.display_base.dimensions() {
            return;
        }
        self.display_base = if (width, height) == self.base.pixels().dimensions() {
            self.base.pixels().clone()
        } else {
            imageops::resize(self.base.pixels(), width, height, FilterType::Triangle)
        };
        log::debug!(
            "[ANNOTATE] Display size {}x{} (native {}x{})",
            width,
            height,
            self.base.width(),
            self.base.height()
        );
    }

    pub fn display_size(&self) -> (u32, u32) {
        self.display_base.dimensions()
    }

    pub fn base(&self) -> &CroppedImage {
        &self.base
    }

    // ── Attributes ──────────────────────────────────────────────────

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn thickness(&self) -> u32 {
        self.thickness
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Clamped to `MIN_THICKNESS..=MAX_THICKNESS`.
    pub fn set_thickness(&mut self, thickness: u32) {
        self.thickness = thickness.clamp(MIN_THICKNESS, MAX_THICKNESS);
    }

    // ── Pointer events ──────────────────────────────────────────────

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, DrawState::Drawing(_))
    }

    /// Begin a stroke. Ignored while one is already in progress.
    pub fn pointer_down(&mut self, at: Point) {
        if self.is_drawing() {
            log::debug!("[ANNOTATE] pointer_down ignored: already drawing");
            return;
        }
        let stroke = match self.tool {
            Tool::Freehand => Stroke::Freehand(vec![at]),
            tool => Stroke::Shape {
                tool,
                anchor: at,
                current: at,
            },
        };
        self.state = DrawState::Drawing(InProgress {
            stroke,
            color: self.color,
            thickness: self.thickness,
        });
    }

    /// Extend the freehand path or move the live shape endpoint.
    pub fn pointer_move(&mut self, at: Point) {
        if let DrawState::Drawing(progress) = &mut self.state {
            match &mut progress.stroke {
                Stroke::Freehand(points) => points.push(at),
                Stroke::Shape { current, .. } => *current = at,
            }
        }
    }

    /// Commit the stroke in progress. Returns whether a primitive was added.
    pub fn pointer_up(&mut self, at: Point) -> bool {
        let DrawState::Drawing(mut progress) = std::mem::replace(&mut self.state, DrawState::Idle)
        else {
            return false;
        };
        match &mut progress.stroke {
            Stroke::Freehand(points) => {
                if points.last() != Some(&at) {
                    points.push(at);
                }
            }
            Stroke::Shape { current, .. } => *current = at,
        }
        let primitive = progress.preview();
        log::debug!(
            "[ANNOTATE] Committed #{}: {:?}",
            self.primitives.len() + 1,
            primitive
        );
        self.primitives.push(primitive);
        true
    }

    // ── History ─────────────────────────────────────────────────────

    pub fn primitives(&self) -> &[AnnotationPrimitive] {
        &self.primitives
    }

    /// Drop every primitive and any stroke in progress.
    pub fn clear(&mut self) {
        self.primitives.clear();
        self.state = DrawState::Idle;
    }

    /// Remove the most recent primitive. No-op while drawing.
    pub fn undo_last(&mut self) -> Option<AnnotationPrimitive> {
        if self.is_drawing() {
            return None;
        }
        self.primitives.pop()
    }

    // ── Rendering ───────────────────────────────────────────────────

    /// Display-resolution frame: base, committed primitives, then the
    /// in-progress preview on top. Rebuilt from scratch every call.
    pub fn redraw(&self) -> RgbaImage {
        let mut canvas = self.display_base.clone();
        raster::draw_all(&mut canvas, &self.primitives);
        if let DrawState::Drawing(progress) = &self.state {
            raster::draw_primitive(&mut canvas, &progress.preview());
        }
        canvas
    }

    /// Native-resolution flattened image of the committed primitives.
    pub fn finalize(&self) -> RgbaImage {
        let mut canvas = self.base.pixels().clone();
        if self.primitives.is_empty() {
            return canvas;
        }
        let (dw, dh) = self.display_size();
        let sx = self.base.width() as f64 / dw as f64;
        let sy = self.base.height() as f64 / dh as f64;
        for primitive in &self.primitives {
            raster::draw_primitive(&mut canvas, &primitive.scaled(sx, sy));
        }
        log::info!(
            "[ANNOTATE] Flattened {} primitive(s) at {}x{} (scale {:.2}x{:.2})",
            self.primitives.len(),
            canvas.width(),
            canvas.height(),
            sx,
            sy
        );
        canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn base(w: u32, h: u32) -> CroppedImage {
        CroppedImage::new(RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x * 3 % 256) as u8, (y * 5 % 256) as u8, 90, 255])
        }))
    }

    fn drag(engine: &mut AnnotationEngine, from: (f64, f64), to: (f64, f64)) {
        engine.pointer_down(Point::new(from.0, from.1));
        engine.pointer_move(Point::new((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0));
        engine.pointer_up(Point::new(to.0, to.1));
    }

    #[test]
    fn empty_session_flattens_to_base() {
        let engine = AnnotationEngine::with_display_size(base(120, 80), 60, 40);
        assert_eq!(&engine.finalize(), engine.base().pixels());
    }

    #[test]
    fn redraw_is_idempotent() {
        let mut engine = AnnotationEngine::new(base(100, 100));
        drag(&mut engine, (10.0, 10.0), (60.0, 50.0));
        engine.set_tool(Tool::Freehand);
        engine.pointer_down(Point::new(20.0, 80.0));
        engine.pointer_move(Point::new(40.0, 70.0));
        assert_eq!(engine.redraw(), engine.redraw());
    }

    #[test]
    fn preview_moving_backward_leaves_no_trace() {
        let mut engine = AnnotationEngine::new(base(100, 100));
        engine.set_tool(Tool::Line);
        engine.pointer_down(Point::new(10.0, 10.0));
        engine.pointer_move(Point::new(90.0, 90.0));
        engine.pointer_move(Point::new(30.0, 30.0));
        let with_backtrack = engine.redraw();

        let mut direct = AnnotationEngine::new(base(100, 100));
        direct.set_tool(Tool::Line);
        direct.pointer_down(Point::new(10.0, 10.0));
        direct.pointer_move(Point::new(30.0, 30.0));
        assert_eq!(with_backtrack, direct.redraw());
    }

    #[test]
    fn rectangle_freehand_then_clear() {
        let mut engine = AnnotationEngine::new(base(100, 100));
        drag(&mut engine, (10.0, 10.0), (50.0, 50.0));
        engine.set_tool(Tool::Freehand);
        drag(&mut engine, (60.0, 60.0), (90.0, 70.0));
        assert_eq!(engine.primitives().len(), 2);
        assert!(matches!(engine.primitives()[0], AnnotationPrimitive::Rectangle { .. }));
        assert!(matches!(engine.primitives()[1], AnnotationPrimitive::Freehand { .. }));

        engine.clear();
        assert!(engine.primitives().is_empty());
        assert_eq!(&engine.redraw(), engine.base().pixels());
    }

    #[test]
    fn pointer_events_out_of_state_are_ignored() {
        let mut engine = AnnotationEngine::new(base(50, 50));
        engine.pointer_move(Point::new(5.0, 5.0));
        assert!(!engine.pointer_up(Point::new(5.0, 5.0)));
        assert!(engine.primitives().is_empty());

        engine.pointer_down(Point::new(1.0, 1.0));
        engine.pointer_down(Point::new(40.0, 40.0));
        engine.pointer_up(Point::new(20.0, 20.0));
        assert_eq!(
            engine.primitives()[0],
            AnnotationPrimitive::Rectangle {
                x1: 1.0,
                y1: 1.0,
                x2: 20.0,
                y2: 20.0,
                color: Color::RED,
                thickness: 3,
            }
        );
    }

    #[test]
    fn zero_length_drag_still_commits() {
        let mut engine = AnnotationEngine::new(base(50, 50));
        engine.set_tool(Tool::Circle);
        engine.pointer_down(Point::new(25.0, 25.0));
        assert!(engine.pointer_up(Point::new(25.0, 25.0)));
        assert_eq!(engine.primitives().len(), 1);
    }

    #[test]
    fn attributes_apply_to_future_primitives_only() {
        let mut engine = AnnotationEngine::new(base(50, 50));
        drag(&mut engine, (1.0, 1.0), (10.0, 10.0));
        engine.set_color(Color::rgb(0, 0, 255));
        engine.set_thickness(500);
        drag(&mut engine, (1.0, 1.0), (10.0, 10.0));

        assert_eq!(engine.primitives()[0].color(), Color::RED);
        assert_eq!(engine.primitives()[0].thickness(), 3);
        assert_eq!(engine.primitives()[1].color(), Color::rgb(0, 0, 255));
        assert_eq!(engine.primitives()[1].thickness(), MAX_THICKNESS);

        engine.set_thickness(0);
        assert_eq!(engine.thickness(), MIN_THICKNESS);
    }

    #[test]
    fn undo_removes_latest_only_when_idle() {
        let mut engine = AnnotationEngine::new(base(50, 50));
        drag(&mut engine, (1.0, 1.0), (10.0, 10.0));
        engine.set_tool(Tool::Line);
        drag(&mut engine, (1.0, 1.0), (10.0, 10.0));

        engine.pointer_down(Point::new(2.0, 2.0));
        assert!(engine.undo_last().is_none());
        engine.pointer_up(Point::new(3.0, 3.0));

        assert!(matches!(engine.undo_last(), Some(AnnotationPrimitive::Line { .. })));
        assert_eq!(engine.primitives().len(), 2);
    }

    #[test]
    fn finalize_scales_display_strokes_to_native() {
        let white = CroppedImage::new(RgbaImage::from_pixel(200, 100, Rgba([255, 255, 255, 255])));
        let mut engine = AnnotationEngine::with_display_size(white, 100, 50);
        engine.set_tool(Tool::Line);
        engine.set_thickness(1);
        drag(&mut engine, (10.0, 25.0), (90.0, 25.0));

        let flat = engine.finalize();
        assert_eq!(flat.dimensions(), (200, 100));
        assert_eq!(flat.get_pixel(100, 50), &Rgba([255, 0, 0, 255]));
        assert_eq!(flat.get_pixel(10, 25), &Rgba([255, 255, 255, 255]));
    }
}
