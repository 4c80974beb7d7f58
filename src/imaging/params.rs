//! Parameter types for the crop pipeline.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between request parsing ([`dispatch`](crate::dispatch), the CLI)
//! and the [`pipeline`](crate::pipeline), which does the pixel work.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (0–100, default 100). Clamped on construction.
//! - [`ZoomScale`]: Zoom factor for the ZoomScale policy (1.0–5.0). Clamped on construction.
//! - [`CropPolicy`]: How the crop window is derived from source and target size.
//! - [`OutputFormat`]: PNG (lossless) or JPEG (lossy, no alpha).
//! - [`MaskEdge`]: Hard or anti-aliased ellipse boundary.
//! - [`CropRequest`]: Everything the pipeline needs besides the source pixels.

use image::Rgb;
use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    /// Clamp any integer into `0..=100`. Out-of-range input is never an error.
    pub fn new(value: i64) -> Self {
        Self(value.clamp(0, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(100)
    }
}

/// Zoom factor for [`CropPolicy::ZoomScale`].
///
/// `1.0` means no magnification (the crop window equals the target size);
/// each step up shrinks the window and magnifies the subject.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomScale(f64);

impl ZoomScale {
    pub const MIN: f64 = 1.0;
    pub const MAX: f64 = 5.0;

    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(Self::MIN);
        }
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for ZoomScale {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

/// How the crop window is derived. Both policies center on the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropPolicy {
    /// Window = target size divided by the clamped zoom factor.
    ZoomScale(ZoomScale),
    /// Uniformly scale the source to cover the target, then center-crop.
    AspectFit,
}

impl Default for CropPolicy {
    fn default() -> Self {
        Self::ZoomScale(ZoomScale::default())
    }
}

/// Policy name as it appears in `config.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    ZoomScale,
    AspectFit,
}

impl PolicyKind {
    /// Parse a request-side policy name. Accepts `zoomScale`/`zoom_scale`
    /// and `aspectFit`/`aspect_fit`, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "zoomscale" => Some(Self::ZoomScale),
            "aspectfit" => Some(Self::AspectFit),
            _ => None,
        }
    }

    pub fn with_scale(self, scale: f64) -> CropPolicy {
        match self {
            Self::ZoomScale => CropPolicy::ZoomScale(ZoomScale::new(scale)),
            Self::AspectFit => CropPolicy::AspectFit,
        }
    }
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

impl OutputFormat {
    /// `"png"` in any case selects PNG; every other name selects JPEG.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("png") {
            Self::Png
        } else {
            Self::Jpeg
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => f.write_str("png"),
            Self::Jpeg => f.write_str("jpeg"),
        }
    }
}

/// Ellipse boundary treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskEdge {
    /// Binary coverage: pixel center inside or on the ellipse keeps its alpha.
    Hard,
    /// Boundary pixels get partial coverage; pixels whose center lies
    /// outside the ellipse are still fully transparent.
    #[default]
    Smooth,
}

/// Everything that describes one crop, minus the source pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct CropRequest {
    pub angle_degrees: f64,
    /// Defaults to the post-rotation source width.
    pub target_width: Option<u32>,
    /// Defaults to the post-rotation source height.
    pub target_height: Option<u32>,
    pub policy: CropPolicy,
    pub format: OutputFormat,
    /// Ignored for PNG.
    pub quality: Quality,
    pub mask_edge: MaskEdge,
    /// Opaque colour JPEG output is flattened onto.
    pub jpeg_background: Rgb<u8>,
}

impl Default for CropRequest {
    fn default() -> Self {
        Self {
            angle_degrees: 0.0,
            target_width: None,
            target_height: None,
            policy: CropPolicy::default(),
            format: OutputFormat::default(),
            quality: Quality::default(),
            mask_edge: MaskEdge::default(),
            jpeg_background: Rgb([255, 255, 255]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(-20).value(), 0);
        assert_eq!(Quality::new(0).value(), 0);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_100() {
        assert_eq!(Quality::default().value(), 100);
    }

    #[test]
    fn zoom_scale_clamps_floor_and_ceiling() {
        assert_eq!(ZoomScale::new(0.5).value(), 1.0);
        assert_eq!(ZoomScale::new(2.5).value(), 2.5);
        assert_eq!(ZoomScale::new(100.0).value(), 5.0);
        assert_eq!(ZoomScale::new(f64::INFINITY).value(), 5.0);
        assert_eq!(ZoomScale::new(f64::NAN).value(), 1.0);
    }

    #[test]
    fn policy_kind_parses_both_spellings() {
        assert_eq!(PolicyKind::parse("zoomScale"), Some(PolicyKind::ZoomScale));
        assert_eq!(PolicyKind::parse("ZOOM_SCALE"), Some(PolicyKind::ZoomScale));
        assert_eq!(PolicyKind::parse("aspectFit"), Some(PolicyKind::AspectFit));
        assert_eq!(PolicyKind::parse("aspect-fit"), Some(PolicyKind::AspectFit));
        assert_eq!(PolicyKind::parse("stretch"), None);
    }

    #[test]
    fn aspect_fit_ignores_scale() {
        assert_eq!(PolicyKind::AspectFit.with_scale(3.0), CropPolicy::AspectFit);
        assert_eq!(
            PolicyKind::ZoomScale.with_scale(3.0),
            CropPolicy::ZoomScale(ZoomScale::new(3.0))
        );
    }

    #[test]
    fn output_format_anything_but_png_is_jpeg() {
        assert_eq!(OutputFormat::from_name("PNG"), OutputFormat::Png);
        assert_eq!(OutputFormat::from_name("png"), OutputFormat::Png);
        assert_eq!(OutputFormat::from_name("jpeg"), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_name("webp"), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_name(""), OutputFormat::Jpeg);
    }
}
