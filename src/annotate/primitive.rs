//! Annotation value types: tools, colours and committed primitives.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest and largest stroke width a user may pick (display pixels).
pub const MIN_THICKNESS: u32 = 1;
pub const MAX_THICKNESS: u32 = 64;

/// Drawing tool selection. Applies to future primitives only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Rectangle,
    Circle,
    Line,
    Freehand,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorParseError {
    #[error("Empty colour string")]
    Empty,

    #[error("Invalid hex colour '{0}' (expected #rgb, #rrggbb or #rrggbbaa)")]
    InvalidHex(String),

    #[error("Unknown colour name '{0}'")]
    UnknownName(String),
}

/// An RGBA stroke colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const RED: Color = Color::rgb(255, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }

    fn named(name: &str) -> Option<Self> {
        let c = match name {
            "red" => Color::rgb(255, 0, 0),
            "green" => Color::rgb(0, 128, 0),
            "blue" => Color::rgb(0, 0, 255),
            "yellow" => Color::rgb(255, 255, 0),
            "black" => Color::rgb(0, 0, 0),
            "white" => Color::rgb(255, 255, 255),
            "orange" => Color::rgb(255, 165, 0),
            _ => return None,
        };
        Some(c)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::RED
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ColorParseError::Empty);
        }
        let Some(hex) = s.strip_prefix('#') else {
            return Color::named(&s.to_ascii_lowercase())
                .ok_or_else(|| ColorParseError::UnknownName(s.to_string()));
        };

        let invalid = || ColorParseError::InvalidHex(s.to_string());
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let nibble = |i: usize| {
            u8::from_str_radix(&hex[i..i + 1], 16)
                .map(|v| v * 17)
                .map_err(|_| invalid())
        };

        match hex.len() {
            3 => Ok(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
            6 => Ok(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Color {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => Err(invalid()),
        }
    }
}

/// A committed annotation, in the coordinate space it was drawn in.
///
/// Z-order is insertion order; primitives are never mutated after commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AnnotationPrimitive {
    Rectangle {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        color: Color,
        thickness: u32,
    },
    Circle {
        center_x: f64,
        center_y: f64,
        radius: f64,
        color: Color,
        thickness: u32,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        color: Color,
        thickness: u32,
    },
    Freehand {
        points: Vec<Point>,
        color: Color,
        thickness: u32,
    },
}

impl AnnotationPrimitive {
    /// Build a shape from a drag gesture. `None` for the freehand tool,
    /// which is built from a point path instead.
    ///
    /// The drag diagonal of a circle is its diameter, not its radius.
    pub fn from_drag(
        tool: Tool,
        anchor: Point,
        release: Point,
        color: Color,
        thickness: u32,
    ) -> Option<Self> {
        let primitive = match tool {
            Tool::Rectangle => AnnotationPrimitive::Rectangle {
                x1: anchor.x,
                y1: anchor.y,
                x2: release.x,
                y2: release.y,
                color,
                thickness,
            },
            Tool::Circle => {
                let center = anchor.midpoint(&release);
                AnnotationPrimitive::Circle {
                    center_x: center.x,
                    center_y: center.y,
                    radius: anchor.distance(&release) / 2.0,
                    color,
                    thickness,
                }
            }
            Tool::Line => AnnotationPrimitive::Line {
                x1: anchor.x,
                y1: anchor.y,
                x2: release.x,
                y2: release.y,
                color,
                thickness,
            },
            Tool::Freehand => return None,
        };
        Some(primitive)
    }

    pub fn color(&self) -> Color {
        match self {
            AnnotationPrimitive::Rectangle { color, .. }
            | AnnotationPrimitive::Circle { color, .. }
            | AnnotationPrimitive::Line { color, .. }
            | AnnotationPrimitive::Freehand { color, .. } => *color,
        }
    }

    pub fn thickness(&self) -> u32 {
        match self {
            AnnotationPrimitive::Rectangle { thickness, .. }
            | AnnotationPrimitive::Circle { thickness, .. }
            | AnnotationPrimitive::Line { thickness, .. }
            | AnnotationPrimitive::Freehand { thickness, .. } => *thickness,
        }
    }

    /// Rescale from one resolution to another.
    ///
    /// Coordinates scale per axis; radius and stroke width scale by the
    /// mean of the two factors. Stroke width never drops below 1.
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        let mean = (sx + sy) / 2.0;
        let width = |t: u32| ((t as f64 * mean).round() as u32).max(MIN_THICKNESS);
        match self {
            AnnotationPrimitive::Rectangle { x1, y1, x2, y2, color, thickness } => {
                AnnotationPrimitive::Rectangle {
                    x1: x1 * sx,
                    y1: y1 * sy,
                    x2: x2 * sx,
                    y2: y2 * sy,
                    color: *color,
                    thickness: width(*thickness),
                }
            }
            AnnotationPrimitive::Circle { center_x, center_y, radius, color, thickness } => {
                AnnotationPrimitive::Circle {
                    center_x: center_x * sx,
                    center_y: center_y * sy,
                    radius: radius * mean,
                    color: *color,
                    thickness: width(*thickness),
                }
            }
            AnnotationPrimitive::Line { x1, y1, x2, y2, color, thickness } => {
                AnnotationPrimitive::Line {
                    x1: x1 * sx,
                    y1: y1 * sy,
                    x2: x2 * sx,
                    y2: y2 * sy,
                    color: *color,
                    thickness: width(*thickness),
                }
            }
            AnnotationPrimitive::Freehand { points, color, thickness } => {
                AnnotationPrimitive::Freehand {
                    points: points.iter().map(|p| p.scaled(sx, sy)).collect(),
                    color: *color,
                    thickness: width(*thickness),
                }
            }
        }
    }
}
