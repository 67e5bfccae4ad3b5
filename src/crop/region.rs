//! Bitmap copy primitive — functional core.
//!
//! Takes pixels in, returns pixels out. The source rectangle is always
//! re-clamped against the bitmap immediately before copying, even when the
//! caller already clamped it against (possibly stale) capture dimensions.

use crate::geometry::PixelRect;
use image::RgbaImage;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CropError {
    #[error("Crop rectangle has zero width or height")]
    ZeroDimension,

    #[error(
        "Crop rectangle ({},{},{},{}) exceeds image bounds ({}x{})",
        requested.x, requested.y, requested.width, requested.height,
        image_size.0, image_size.1
    )]
    OutOfBounds {
        requested: PixelRect,
        image_size: (u32, u32),
    },
}

/// Copy `rect` out of `image`.
///
/// The rectangle is intersected with the image first; an empty
/// intersection is `OutOfBounds`, an empty request is `ZeroDimension`.
pub fn copy_region(image: &RgbaImage, rect: PixelRect) -> Result<RgbaImage, CropError> {
    if rect.width == 0 || rect.height == 0 {
        return Err(CropError::ZeroDimension);
    }

    let (img_width, img_height) = image.dimensions();
    let source = rect
        .clamp_to(img_width, img_height)
        .ok_or(CropError::OutOfBounds {
            requested: rect,
            image_size: (img_width, img_height),
        })?;

    if source != rect {
        log::debug!("[CROP] Re-clamped {:?} to {:?}", rect, source);
    }

    Ok(image::imageops::crop_imm(image, source.x, source.y, source.width, source.height)
        .to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn copy_valid_region() {
        let mut img = RgbaImage::new(100, 100);
        img.put_pixel(10, 10, Rgba([255, 0, 0, 255]));
        let out = copy_region(&img, PixelRect::new(10, 10, 50, 40)).unwrap();
        assert_eq!(out.dimensions(), (50, 40));
        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn copy_zero_dimension_fails() {
        let img = RgbaImage::new(100, 100);
        let result = copy_region(&img, PixelRect::new(0, 0, 0, 50));
        assert!(matches!(result, Err(CropError::ZeroDimension)));
    }

    #[test]
    fn overhanging_region_is_reclamped() {
        let img = RgbaImage::new(100, 100);
        let out = copy_region(&img, PixelRect::new(80, 80, 30, 30)).unwrap();
        assert_eq!(out.dimensions(), (20, 20));
    }

    #[test]
    fn region_past_the_edge_fails() {
        let img = RgbaImage::new(100, 100);
        let result = copy_region(&img, PixelRect::new(100, 0, 30, 30));
        assert!(matches!(result, Err(CropError::OutOfBounds { .. })));
    }
}
