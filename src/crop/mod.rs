//! Crop domain — mapping a page-space selection onto a capture's pixels.
//!
//!   - reconcile.rs — candidate rectangles, one per coordinate hypothesis
//!   - cropper.rs   — picks the first usable candidate, center-crops otherwise
//!   - region.rs    — the clamped bitmap copy primitive

pub mod cropper;
pub mod reconcile;
pub mod region;

pub use cropper::{crop_area, crop_whole, CropOutcome, CropStatus, CroppedImage};
pub use reconcile::{reconcile, Candidate, CropStrategyKind, MIN_CROP_PX, STRATEGY_ORDER};
pub use region::{copy_region, CropError};
