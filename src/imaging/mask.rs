//! Ellipse masking.
//!
//! The ellipse is inscribed in `[0, 0, W, H]`: centered at `(W/2, H/2)` with
//! semi-axes `W/2` and `H/2`, touching all four edge midpoints. A pixel is
//! tested at its center `(x + 0.5, y + 0.5)` using the normalized distance
//!
//! ```text
//! d² = ((px - cx) / a)² + ((py - cy) / b)²
//! ```
//!
//! `d² > 1` is outside and always ends fully transparent. Inside pixels keep
//! their alpha, scaled by sub-pixel coverage when the edge is
//! [`MaskEdge::Smooth`].

use super::params::MaskEdge;
use image::RgbaImage;

/// Sub-samples per axis used to estimate edge coverage.
const SUPERSAMPLE: u32 = 4;

/// Normalized squared distance of `(px, py)` from the ellipse center.
fn normalized_distance_sq(px: f64, py: f64, width: u32, height: u32) -> f64 {
    let a = width as f64 / 2.0;
    let b = height as f64 / 2.0;
    let nx = (px - a) / a;
    let ny = (py - b) / b;
    nx * nx + ny * ny
}

/// Whether the center of pixel `(x, y)` lies inside or on the inscribed ellipse.
pub fn pixel_center_inside(x: u32, y: u32, width: u32, height: u32) -> bool {
    normalized_distance_sq(x as f64 + 0.5, y as f64 + 0.5, width, height) <= 1.0
}

/// Fraction of pixel `(x, y)` covered by the ellipse, from a regular grid of
/// sub-samples. Only called for pixels whose center is inside.
fn coverage(x: u32, y: u32, width: u32, height: u32) -> f64 {
    let step = 1.0 / SUPERSAMPLE as f64;
    let mut inside = 0u32;
    for sy in 0..SUPERSAMPLE {
        for sx in 0..SUPERSAMPLE {
            let px = x as f64 + (sx as f64 + 0.5) * step;
            let py = y as f64 + (sy as f64 + 0.5) * step;
            if normalized_distance_sq(px, py, width, height) <= 1.0 {
                inside += 1;
            }
        }
    }
    inside as f64 / (SUPERSAMPLE * SUPERSAMPLE) as f64
}

/// Composite `image` through an ellipse inscribed in its bounds.
///
/// A 1-pixel-wide or 1-pixel-tall image is a degenerate ellipse (a line
/// through every pixel center) and is returned with full coverage.
pub fn mask_to_ellipse(mut image: RgbaImage, edge: MaskEdge) -> RgbaImage {
    let (width, height) = image.dimensions();
    if width <= 1 || height <= 1 {
        return image;
    }

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        if !pixel_center_inside(x, y, width, height) {
            pixel.0 = [0, 0, 0, 0];
            continue;
        }
        if edge == MaskEdge::Smooth {
            let cov = coverage(x, y, width, height);
            if cov < 1.0 {
                pixel[3] = (pixel[3] as f64 * cov).round() as u8;
            }
        }
    }
    image
}
