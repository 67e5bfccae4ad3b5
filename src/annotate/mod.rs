//! Annotation domain — drawing on top of a cropped capture.
//!
//!   - primitive.rs — tools, colours, committed shapes
//!   - engine.rs    — pointer state machine, redraw and flatten
//!   - raster.rs    — imageproc rasterization of primitives

pub mod engine;
pub mod primitive;
pub mod raster;

pub use engine::AnnotationEngine;
pub use primitive::{AnnotationPrimitive, Color, ColorParseError, Tool, MAX_THICKNESS, MIN_THICKNESS};
