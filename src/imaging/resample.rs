//! Resampling to exact output dimensions.
//!
//! Uses `image::imageops::resize` with the `Triangle` (bilinear) filter. The
//! filter support widens with the shrink ratio, so downscaling averages over
//! the covered source area instead of skipping pixels.
//!
//! Filtering runs on premultiplied `f32` channels. The rotator leaves exposed
//! corners as transparent black, and averaging those straight-alpha zeros
//! into visible neighbours would darken every edge pixel.

use image::imageops::{self, FilterType};
use image::{Rgba, Rgba32FImage, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("cannot resample to {width}x{height}")]
pub struct ResampleError {
    pub width: u32,
    pub height: u32,
}

/// Scale `image` to exactly `width × height`.
///
/// Requesting the current dimensions returns the buffer untouched.
pub fn resample(image: RgbaImage, width: u32, height: u32) -> Result<RgbaImage, ResampleError> {
    if width == 0 || height == 0 || image.width() == 0 || image.height() == 0 {
        return Err(ResampleError { width, height });
    }
    if image.dimensions() == (width, height) {
        return Ok(image);
    }
    let premultiplied = premultiply(&image);
    let resized = imageops::resize(&premultiplied, width, height, FilterType::Triangle);
    Ok(unpremultiply(&resized))
}

fn premultiply(image: &RgbaImage) -> Rgba32FImage {
    Rgba32FImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0.map(|c| c as f32 / 255.0);
        Rgba([r * a, g * a, b * a, a])
    })
}

fn unpremultiply(image: &Rgba32FImage) -> RgbaImage {
    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        if a <= 0.0 {
            return Rgba([0, 0, 0, 0]);
        }
        Rgba([to_u8(r / a), to_u8(g / a), to_u8(b / a), to_u8(a)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn same_size_is_identity() {
        let img = RgbaImage::from_fn(9, 7, |x, y| Rgba([x as u8, y as u8, 1, 255]));
        assert_eq!(resample(img.clone(), 9, 7).unwrap(), img);
    }

    #[test]
    fn enlarges_to_exact_dimensions() {
        let img = RgbaImage::from_pixel(10, 5, Rgba([50, 60, 70, 255]));
        let out = resample(img, 33, 21).unwrap();
        assert_eq!(out.dimensions(), (33, 21));
        assert_eq!(out.get_pixel(16, 10), &Rgba([50, 60, 70, 255]));
    }

    #[test]
    fn shrinking_averages_instead_of_aliasing() {
        // 1px black/white checkerboard averages to mid grey when halved
        let img = RgbaImage::from_fn(64, 64, |x, y| {
            let v = if (x + y) % 2 == 0 { 0 } else { 255 };
            Rgba([v, v, v, 255])
        });
        let out = resample(img, 16, 16).unwrap();
        let p = out.get_pixel(8, 8);
        assert!((100..=155).contains(&p[0]), "expected grey, got {p:?}");
    }

    #[test]
    fn transparent_neighbours_do_not_darken() {
        // Opaque white disc on transparent black, like a rotated canvas corner
        let img = RgbaImage::from_fn(40, 40, |x, y| {
            if x >= 20 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        let out = resample(img, 13, 13).unwrap();
        for p in out.pixels().filter(|p| p[3] > 0) {
            assert!(p[0] >= 254, "edge darkened: {p:?}");
        }
        // The boundary column is partially transparent, not grey
        assert!(out.pixels().any(|p| p[3] > 0 && p[3] < 255));
    }

    #[test]
    fn zero_target_is_an_error() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        assert_eq!(
            resample(img, 0, 4).unwrap_err(),
            ResampleError {
                width: 0,
                height: 4
            }
        );
    }
}
