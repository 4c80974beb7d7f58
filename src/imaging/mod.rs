//! Image processing in pure Rust, built on the `image` crate.
//!
//! | Stage | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` → RGBA8 |
//! | **Rotate** | exact quarter turns via `imageops`, bilinear inverse mapping otherwise |
//! | **Crop** | [`compute_crop_rect`] + `imageops::crop_imm` |
//! | **Resample** | `imageops::resize` with `Triangle` |
//! | **Mask** | inscribed ellipse, optional sub-pixel coverage |
//! | **Encode** | `PngEncoder` / `JpegEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for geometry (unit testable)
//! - **Parameters**: Data structures describing a crop request
//! - **Stages**: one module per buffer-in/buffer-out transform
//! - **Codec**: decode and encode at the two ends of the pipeline
//!
//! Every stage takes its [`RasterImage`] by value and returns a new one, so no
//! buffer is aliased between stages.

mod calculations;
pub mod codec;
pub mod crop;
pub mod mask;
mod params;
pub mod resample;
pub mod rotate;

/// Width × height RGBA8, straight alpha, row-major, top-left origin.
pub type RasterImage = image::RgbaImage;

pub use calculations::{
    Rect, calculate_cover_factor, calculate_rotated_bounds, compute_crop_rect, quarter_turns,
};
pub use codec::{CodecError, decode_bytes, decode_path, encode};
pub use crop::{ExtractError, extract};
pub use mask::mask_to_ellipse;
pub use params::{
    CropPolicy, CropRequest, MaskEdge, OutputFormat, PolicyKind, Quality, ZoomScale,
};
pub use resample::{ResampleError, resample};
pub use rotate::{RotateError, rotate};
