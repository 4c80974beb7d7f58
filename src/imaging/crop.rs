//! Rectangle extraction.
//!
//! The rectangle comes from [`compute_crop_rect`](super::calculations::compute_crop_rect),
//! which already clamps to the source; extraction re-checks so a hand-built
//! [`Rect`] can never read out of bounds.

use super::calculations::Rect;
use image::{RgbaImage, imageops};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExtractError {
    #[error("crop {rect:?} exceeds {width}x{height} source")]
    OutOfBounds { rect: Rect, width: u32, height: u32 },
    #[error("crop {0:?} is empty")]
    Empty(Rect),
}

/// Copy `rect` out of `image` into a new buffer.
pub fn extract(image: RgbaImage, rect: Rect) -> Result<RgbaImage, ExtractError> {
    let (width, height) = image.dimensions();
    if rect.width == 0 || rect.height == 0 {
        return Err(ExtractError::Empty(rect));
    }
    if !rect.fits_within(width, height) {
        return Err(ExtractError::OutOfBounds {
            rect,
            width,
            height,
        });
    }
    if rect == Rect::new(0, 0, width, height) {
        return Ok(image);
    }
    Ok(imageops::crop_imm(&image, rect.left, rect.top, rect.width, rect.height).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn numbered(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]))
    }

    #[test]
    fn extracts_requested_window() {
        let out = extract(numbered(10, 8), Rect::new(3, 2, 4, 5)).unwrap();
        assert_eq!(out.dimensions(), (4, 5));
        assert_eq!(out.get_pixel(0, 0), &Rgba([3, 2, 0, 255]));
        assert_eq!(out.get_pixel(3, 4), &Rgba([6, 6, 0, 255]));
    }

    #[test]
    fn full_rect_returns_same_pixels() {
        let img = numbered(6, 6);
        assert_eq!(extract(img.clone(), Rect::new(0, 0, 6, 6)).unwrap(), img);
    }

    #[test]
    fn out_of_bounds_is_an_error() {
        let err = extract(numbered(10, 10), Rect::new(8, 0, 5, 5)).unwrap_err();
        assert!(matches!(err, ExtractError::OutOfBounds { width: 10, .. }));
    }

    #[test]
    fn empty_rect_is_an_error() {
        let err = extract(numbered(10, 10), Rect::new(0, 0, 0, 5)).unwrap_err();
        assert_eq!(err, ExtractError::Empty(Rect::new(0, 0, 0, 5)));
    }
}
