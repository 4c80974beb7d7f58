//! Pure calculation functions for crop geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::CropPolicy;

/// Slack applied before truncating a float to whole pixels, so values like
/// `199.99999999997` from a division land on `199.99999999997 + EPS → 200`.
const PIXEL_EPSILON: f64 = 1e-6;

/// Integer pixel rectangle inside a containing image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Whether the rectangle lies entirely inside a `width × height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.left as u64 + self.width as u64 <= width as u64
            && self.top as u64 + self.height as u64 <= height as u64
    }
}

fn truncate_px(value: f64) -> f64 {
    (value + PIXEL_EPSILON).floor()
}

/// Number of clockwise quarter turns if `angle_degrees` is a multiple of 90.
///
/// # Examples
/// ```
/// # use shape_cropper::imaging::quarter_turns;
/// assert_eq!(quarter_turns(0.0), Some(0));
/// assert_eq!(quarter_turns(-90.0), Some(3));
/// assert_eq!(quarter_turns(450.0), Some(1));
/// assert_eq!(quarter_turns(30.0), None);
/// ```
pub fn quarter_turns(angle_degrees: f64) -> Option<u8> {
    if !angle_degrees.is_finite() {
        return None;
    }
    let normalized = angle_degrees.rem_euclid(360.0);
    let turns = (normalized / 90.0).round();
    if (normalized - turns * 90.0).abs() < PIXEL_EPSILON {
        Some((turns as u32 % 4) as u8)
    } else {
        None
    }
}

/// Bounding box of a `width × height` rectangle rotated about its center.
///
/// `new_w = |w·cos θ| + |h·sin θ|`, `new_h = |w·sin θ| + |h·cos θ|`, rounded
/// up to the enclosing integer. Quarter turns are exact.
pub fn calculate_rotated_bounds(width: u32, height: u32, angle_degrees: f64) -> (u32, u32) {
    match quarter_turns(angle_degrees) {
        Some(0) | Some(2) => return (width, height),
        Some(_) => return (height, width),
        None => {}
    }

    let radians = angle_degrees.to_radians();
    let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
    let (w, h) = (width as f64, height as f64);

    let new_w = (w * cos + h * sin - PIXEL_EPSILON).ceil() as u32;
    let new_h = (w * sin + h * cos - PIXEL_EPSILON).ceil() as u32;

    (new_w.max(1), new_h.max(1))
}

/// Uniform factor that scales `source` to just cover `target`.
///
/// When the source is relatively wider than the target, height binds
/// (`target_h / source_h`); otherwise width binds (`target_w / source_w`).
pub fn calculate_cover_factor(source: (u32, u32), target: (u32, u32)) -> f64 {
    let (src_w, src_h) = (source.0 as f64, source.1 as f64);
    let (tgt_w, tgt_h) = (target.0 as f64, target.1 as f64);

    if src_w / src_h > tgt_w / tgt_h {
        tgt_h / src_h
    } else {
        tgt_w / src_w
    }
}

/// Place a window of `crop` pixels centrally on an axis of `source` pixels.
///
/// A window larger than the axis is replaced by the full axis starting at 0.
/// Otherwise the offset truncates and the length is clamped into the axis.
fn center_axis(source: u32, crop: f64) -> (u32, u32) {
    let offset = (source as f64 - crop) / 2.0;
    if offset < 0.0 {
        return (0, source);
    }
    let start = (truncate_px(offset) as u32).min(source.saturating_sub(1));
    let length = (truncate_px(crop) as u32).clamp(1, source - start);
    (start, length)
}

/// Compute the source-space crop rectangle for a policy.
///
/// The result always lies within `source` and is at least 1×1; overflow is
/// clamped, never an error.
///
/// # Arguments
/// * `source` - Dimensions of the (rotated) image being cropped
/// * `target` - Final output dimensions
/// * `policy` - [`CropPolicy::ZoomScale`] or [`CropPolicy::AspectFit`]
pub fn compute_crop_rect(source: (u32, u32), target: (u32, u32), policy: CropPolicy) -> Rect {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = (target.0 as f64, target.1 as f64);

    let (crop_w, crop_h) = match policy {
        CropPolicy::ZoomScale(scale) => (tgt_w / scale.value(), tgt_h / scale.value()),
        CropPolicy::AspectFit => {
            // A target×target window in scaled space is target/f in source
            // space; written as products to keep exact integer ratios exact.
            if src_w as f64 / src_h as f64 > tgt_w / tgt_h {
                (tgt_w * src_h as f64 / tgt_h, src_h as f64)
            } else {
                (src_w as f64, tgt_h * src_w as f64 / tgt_w)
            }
        }
    };

    let (left, width) = center_axis(src_w, crop_w);
    let (top, height) = center_axis(src_h, crop_h);
    Rect::new(left, top, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::ZoomScale;

    fn zoom(scale: f64) -> CropPolicy {
        CropPolicy::ZoomScale(ZoomScale::new(scale))
    }

    // =========================================================================
    // quarter_turns / calculate_rotated_bounds tests
    // =========================================================================

    #[test]
    fn quarter_turns_normalizes_negative_and_large_angles() {
        assert_eq!(quarter_turns(360.0), Some(0));
        assert_eq!(quarter_turns(-180.0), Some(2));
        assert_eq!(quarter_turns(-270.0), Some(1));
        assert_eq!(quarter_turns(720.0 + 270.0), Some(3));
        assert_eq!(quarter_turns(89.9), None);
        assert_eq!(quarter_turns(f64::NAN), None);
    }

    #[test]
    fn rotated_bounds_zero_is_identity() {
        assert_eq!(calculate_rotated_bounds(400, 200, 0.0), (400, 200));
    }

    #[test]
    fn rotated_bounds_quarter_turn_swaps() {
        assert_eq!(calculate_rotated_bounds(400, 200, 90.0), (200, 400));
        assert_eq!(calculate_rotated_bounds(400, 200, -90.0), (200, 400));
        assert_eq!(calculate_rotated_bounds(400, 200, 180.0), (400, 200));
    }

    #[test]
    fn rotated_bounds_45_degrees_square() {
        // 100·cos45 + 100·sin45 = 141.42 → 142
        assert_eq!(calculate_rotated_bounds(100, 100, 45.0), (142, 142));
    }

    #[test]
    fn rotated_bounds_30_degrees_rectangle() {
        // w=200,h=100: 200·0.866 + 100·0.5 = 223.2 → 224
        //              200·0.5 + 100·0.866 = 186.6 → 187
        assert_eq!(calculate_rotated_bounds(200, 100, 30.0), (224, 187));
        assert_eq!(calculate_rotated_bounds(200, 100, -30.0), (224, 187));
    }

    // =========================================================================
    // ZoomScale tests
    // =========================================================================

    #[test]
    fn zoom_scale_one_crops_target_size_centered() {
        let rect = compute_crop_rect((400, 300), (200, 100), zoom(1.0));
        assert_eq!(rect, Rect::new(100, 100, 200, 100));
    }

    #[test]
    fn zoom_scale_two_halves_the_window() {
        let rect = compute_crop_rect((400, 300), (200, 100), zoom(2.0));
        assert_eq!(rect, Rect::new(150, 125, 100, 50));
    }

    #[test]
    fn zoom_scale_floor_and_ceiling_match_clamped_values() {
        let src = (640, 480);
        let tgt = (300, 300);
        assert_eq!(
            compute_crop_rect(src, tgt, zoom(0.5)),
            compute_crop_rect(src, tgt, zoom(1.0))
        );
        assert_eq!(
            compute_crop_rect(src, tgt, zoom(100.0)),
            compute_crop_rect(src, tgt, zoom(5.0))
        );
    }

    #[test]
    fn zoom_scale_truncates_odd_offsets() {
        // (101 - 50) / 2 = 25.5 → 25
        let rect = compute_crop_rect((101, 101), (50, 50), zoom(1.0));
        assert_eq!(rect, Rect::new(25, 25, 50, 50));
    }

    #[test]
    fn zoom_scale_overflow_clamps_to_full_axis() {
        // Target wider than source: horizontal axis becomes the full source.
        let rect = compute_crop_rect((100, 400), (300, 200), zoom(1.0));
        assert_eq!(rect, Rect::new(0, 100, 100, 200));
        assert!(rect.fits_within(100, 400));
    }

    #[test]
    fn zoom_scale_overflow_both_axes() {
        let rect = compute_crop_rect((50, 50), (500, 80), zoom(1.0));
        assert_eq!(rect, Rect::new(0, 0, 50, 50));
    }

    #[test]
    fn zoom_scale_tiny_window_is_at_least_one_pixel() {
        // 1 / 5 = 0.2 px window
        let rect = compute_crop_rect((10, 10), (1, 1), zoom(5.0));
        assert_eq!(rect.width, 1);
        assert_eq!(rect.height, 1);
        assert!(rect.fits_within(10, 10));
    }

    // =========================================================================
    // AspectFit tests
    // =========================================================================

    #[test]
    fn cover_factor_wide_source_binds_height() {
        assert_eq!(calculate_cover_factor((400, 200), (100, 100)), 0.5);
    }

    #[test]
    fn cover_factor_tall_source_binds_width() {
        assert_eq!(calculate_cover_factor((200, 400), (100, 100)), 0.5);
        assert_eq!(calculate_cover_factor((300, 600), (150, 100)), 0.5);
    }

    #[test]
    fn aspect_fit_wide_source_centers_on_width() {
        // f = 100/200 = 0.5 → scaled 200×100, window 100×100 at (50, 0)
        // → source space: (100, 0) 200×200
        let rect = compute_crop_rect((400, 200), (100, 100), CropPolicy::AspectFit);
        assert_eq!(rect, Rect::new(100, 0, 200, 200));
    }

    #[test]
    fn aspect_fit_tall_source_centers_on_height() {
        let rect = compute_crop_rect((200, 400), (100, 100), CropPolicy::AspectFit);
        assert_eq!(rect, Rect::new(0, 100, 200, 200));
    }

    #[test]
    fn aspect_fit_same_aspect_takes_whole_source() {
        let rect = compute_crop_rect((800, 600), (400, 300), CropPolicy::AspectFit);
        assert_eq!(rect, Rect::new(0, 0, 800, 600));
    }

    #[test]
    fn aspect_fit_upscale_target_still_within_source() {
        let rect = compute_crop_rect((120, 90), (1000, 300), CropPolicy::AspectFit);
        // Wider target: width binds, window height = 300·120/1000 = 36
        assert_eq!(rect, Rect::new(0, 27, 120, 36));
        assert!(rect.fits_within(120, 90));
    }

    #[test]
    fn aspect_fit_matches_window_in_scaled_space() {
        let src = (640, 480);
        let tgt = (200, 300);
        let f = calculate_cover_factor(src, tgt);
        let rect = compute_crop_rect(src, tgt, CropPolicy::AspectFit);
        // Scaled rect must reproduce the target window
        assert_eq!((rect.width as f64 * f).round() as u32, 200);
        assert_eq!((rect.height as f64 * f).round() as u32, 300);
    }
}
