//! Arbitrary-angle rotation onto an expanded transparent canvas.
//!
//! Positive angles turn the image clockwise as displayed (y axis pointing
//! down). Multiples of 90° are exact pixel permutations; everything else uses
//! inverse mapping: each destination pixel center is rotated back into source
//! space and bilinearly sampled, with out-of-bounds taps treated as fully
//! transparent.
//!
//! ```text
//! src_x =  (dst_x - dst_cx) · cos θ + (dst_y - dst_cy) · sin θ + src_cx
//! src_y = -(dst_x - dst_cx) · sin θ + (dst_y - dst_cy) · cos θ + src_cy
//! ```

use super::calculations::{calculate_rotated_bounds, quarter_turns};
use image::{Rgba, RgbaImage, imageops};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RotateError {
    #[error("cannot rotate an empty {width}x{height} image")]
    EmptyImage { width: u32, height: u32 },
    #[error("rotation angle must be finite, got {0}")]
    NonFiniteAngle(f64),
}

/// Rotate `image` by `angle_degrees`, expanding the canvas to fit.
///
/// Takes ownership; an angle congruent to 0° hands the same buffer back.
pub fn rotate(image: RgbaImage, angle_degrees: f64) -> Result<RgbaImage, RotateError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(RotateError::EmptyImage { width, height });
    }
    if !angle_degrees.is_finite() {
        return Err(RotateError::NonFiniteAngle(angle_degrees));
    }

    match quarter_turns(angle_degrees) {
        Some(0) => Ok(image),
        Some(1) => Ok(imageops::rotate90(&image)),
        Some(2) => Ok(imageops::rotate180(&image)),
        Some(_) => Ok(imageops::rotate270(&image)),
        None => Ok(rotate_bilinear(&image, angle_degrees)),
    }
}

fn rotate_bilinear(image: &RgbaImage, angle_degrees: f64) -> RgbaImage {
    let (src_w, src_h) = image.dimensions();
    let (dst_w, dst_h) = calculate_rotated_bounds(src_w, src_h, angle_degrees);

    let radians = angle_degrees.to_radians();
    let (sin, cos) = radians.sin_cos();

    let src_cx = src_w as f64 / 2.0;
    let src_cy = src_h as f64 / 2.0;
    let dst_cx = dst_w as f64 / 2.0;
    let dst_cy = dst_h as f64 / 2.0;

    RgbaImage::from_fn(dst_w, dst_h, |x, y| {
        let dx = x as f64 + 0.5 - dst_cx;
        let dy = y as f64 + 0.5 - dst_cy;
        let sx = dx * cos + dy * sin + src_cx;
        let sy = -dx * sin + dy * cos + src_cy;
        sample_bilinear(image, sx, sy)
    })
}

/// Bilinear sample at continuous coordinates (pixel centers sit at `n + 0.5`).
///
/// Colour is weighted by alpha so transparent taps outside the image do not
/// darken edge pixels; the stored result is straight alpha.
fn sample_bilinear(image: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let u = x - 0.5;
    let v = y - 0.5;
    let x0 = u.floor();
    let y0 = v.floor();
    let fx = u - x0;
    let fy = v - y0;

    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1.0, y0, fx * (1.0 - fy)),
        (x0, y0 + 1.0, (1.0 - fx) * fy),
        (x0 + 1.0, y0 + 1.0, fx * fy),
    ];

    let (w, h) = (image.width() as f64, image.height() as f64);
    let mut alpha = 0.0;
    let mut color = [0.0f64; 3];
    for (tx, ty, weight) in taps {
        if weight <= 0.0 || tx < 0.0 || ty < 0.0 || tx >= w || ty >= h {
            continue;
        }
        let p = image.get_pixel(tx as u32, ty as u32);
        let a = weight * p[3] as f64;
        alpha += a;
        for (c, channel) in color.iter_mut().enumerate() {
            *channel += a * p[c] as f64;
        }
    }

    if alpha <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let to_u8 = |v: f64| v.round().clamp(0.0, 255.0) as u8;
    Rgba([
        to_u8(color[0] / alpha),
        to_u8(color[1] / alpha),
        to_u8(color[2] / alpha),
        to_u8(alpha),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 200, 255])
        })
    }

    #[test]
    fn zero_angle_returns_input_unchanged() {
        let img = gradient(31, 17);
        let rotated = rotate(img.clone(), 0.0).unwrap();
        assert_eq!(rotated, img);
    }

    #[test]
    fn full_turn_returns_input_unchanged() {
        let img = gradient(12, 9);
        assert_eq!(rotate(img.clone(), 360.0).unwrap(), img);
        assert_eq!(rotate(img.clone(), -720.0).unwrap(), img);
    }

    #[test]
    fn quarter_turn_is_clockwise_and_exact() {
        let mut img = RgbaImage::from_pixel(4, 2, Rgba([0, 0, 0, 255]));
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));

        let rotated = rotate(img, 90.0).unwrap();
        assert_eq!(rotated.dimensions(), (2, 4));
        // Top-left moves to top-right under a clockwise turn
        assert_eq!(rotated.get_pixel(1, 0), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn half_turn_preserves_pixels_reversed() {
        let img = gradient(5, 3);
        let rotated = rotate(img.clone(), 180.0).unwrap();
        assert_eq!(rotated.get_pixel(0, 0), img.get_pixel(4, 2));
    }

    #[test]
    fn arbitrary_angle_expands_canvas() {
        let rotated = rotate(gradient(100, 100), 45.0).unwrap();
        assert_eq!(rotated.dimensions(), (142, 142));
    }

    #[test]
    fn arbitrary_angle_corners_are_transparent() {
        let rotated = rotate(gradient(100, 60), 30.0).unwrap();
        let (w, h) = rotated.dimensions();
        for (x, y) in [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)] {
            assert_eq!(rotated.get_pixel(x, y)[3], 0, "corner ({x},{y})");
        }
    }

    #[test]
    fn arbitrary_angle_center_keeps_source_color() {
        let img = RgbaImage::from_pixel(80, 80, Rgba([10, 120, 240, 255]));
        let rotated = rotate(img, 17.0).unwrap();
        let (w, h) = rotated.dimensions();
        assert_eq!(rotated.get_pixel(w / 2, h / 2), &Rgba([10, 120, 240, 255]));
    }

    #[test]
    fn edge_pixels_do_not_darken() {
        let img = RgbaImage::from_pixel(40, 40, Rgba([200, 200, 200, 255]));
        let rotated = rotate(img, 10.0).unwrap();
        for p in rotated.pixels().filter(|p| p[3] > 0) {
            assert!(p[0] >= 199 && p[0] <= 201, "colour bled: {p:?}");
        }
    }

    #[test]
    fn empty_image_is_rejected() {
        let err = rotate(RgbaImage::new(0, 5), 12.0).unwrap_err();
        assert_eq!(
            err,
            RotateError::EmptyImage {
                width: 0,
                height: 5
            }
        );
    }

    #[test]
    fn non_finite_angle_is_rejected() {
        assert!(matches!(
            rotate(gradient(4, 4), f64::NAN),
            Err(RotateError::NonFiniteAngle(_))
        ));
    }
}
