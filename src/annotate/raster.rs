//! Rasterizes annotation primitives onto an RGBA canvas with imageproc.
//!
//! One-pixel strokes use imageproc's line/circle routines directly. Wider
//! strokes are stamped as filled discs along the path, which gives round
//! caps and joins for free.

use super::primitive::AnnotationPrimitive;
use crate::geometry::Point;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut};
use std::f64::consts::TAU;

/// Draw one primitive onto `canvas`. Anything outside the canvas is clipped.
pub fn draw_primitive(canvas: &mut RgbaImage, primitive: &AnnotationPrimitive) {
    let color = primitive.color().to_rgba();
    let thickness = primitive.thickness();

    match primitive {
        AnnotationPrimitive::Rectangle { x1, y1, x2, y2, .. } => {
            let corners = [
                Point::new(*x1, *y1),
                Point::new(*x2, *y1),
                Point::new(*x2, *y2),
                Point::new(*x1, *y2),
            ];
            for i in 0..4 {
                stroke_segment(canvas, corners[i], corners[(i + 1) % 4], thickness, color);
            }
        }
        AnnotationPrimitive::Circle { center_x, center_y, radius, .. } => {
            stroke_circle(canvas, Point::new(*center_x, *center_y), *radius, thickness, color);
        }
        AnnotationPrimitive::Line { x1, y1, x2, y2, .. } => {
            stroke_segment(canvas, Point::new(*x1, *y1), Point::new(*x2, *y2), thickness, color);
        }
        AnnotationPrimitive::Freehand { points, .. } => match points.as_slice() {
            [] => {}
            [only] => stamp(canvas, *only, thickness, color),
            path => {
                for pair in path.windows(2) {
                    stroke_segment(canvas, pair[0], pair[1], thickness, color);
                }
            }
        },
    }
}

/// Draw every primitive in order (later ones on top).
pub fn draw_all<'a>(
    canvas: &mut RgbaImage,
    primitives: impl IntoIterator<Item = &'a AnnotationPrimitive>,
) {
    for primitive in primitives {
        draw_primitive(canvas, primitive);
    }
}

fn stamp(canvas: &mut RgbaImage, at: Point, thickness: u32, color: Rgba<u8>) {
    let center = (at.x.round() as i32, at.y.round() as i32);
    let radius = (thickness / 2) as i32;
    if radius == 0 {
        if center.0 >= 0
            && center.1 >= 0
            && (center.0 as u32) < canvas.width()
            && (center.1 as u32) < canvas.height()
        {
            canvas.put_pixel(center.0 as u32, center.1 as u32, color);
        }
    } else {
        draw_filled_circle_mut(canvas, center, radius, color);
    }
}

fn stroke_segment(canvas: &mut RgbaImage, from: Point, to: Point, thickness: u32, color: Rgba<u8>) {
    if thickness <= 1 {
        if from == to {
            stamp(canvas, from, 1, color);
        } else {
            draw_line_segment_mut(
                canvas,
                (from.x as f32, from.y as f32),
                (to.x as f32, to.y as f32),
                color,
            );
        }
        return;
    }

    let length = from.distance(&to);
    let step = (thickness as f64 / 4.0).max(1.0);
    let steps = (length / step).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let p = Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t);
        stamp(canvas, p, thickness, color);
    }
}

fn stroke_circle(canvas: &mut RgbaImage, center: Point, radius: f64, thickness: u32, color: Rgba<u8>) {
    if radius < 0.5 {
        stamp(canvas, center, thickness, color);
        return;
    }
    if thickness <= 1 {
        let c = (center.x.round() as i32, center.y.round() as i32);
        draw_hollow_circle_mut(canvas, c, radius.round() as i32, color);
        return;
    }

    let step = (thickness as f64 / 4.0).max(1.0);
    let steps = ((TAU * radius) / step).ceil().max(8.0) as usize;
    for i in 0..steps {
        let angle = TAU * i as f64 / steps as f64;
        let p = Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin());
        stamp(canvas, p, thickness, color);
    }
}
