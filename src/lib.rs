//! # Shape Cropper
//!
//! Turns an image file into an oval-cropped avatar: rotated, center-cropped,
//! resampled to an exact output size, with everything outside the inscribed
//! ellipse made transparent, and encoded as PNG or JPEG.
//!
//! # Architecture: One Linear Pipeline
//!
//! Every request runs the same six stages, each consuming the previous
//! stage's buffer:
//!
//! ```text
//! decode → rotate → crop → resample → mask → encode
//! ```
//!
//! The stage math (rotated bounds, crop rectangles, cover factors) lives in
//! pure functions under [`imaging`], so the geometry is unit tested without
//! touching pixels. The stages themselves are pure buffer-in, buffer-out
//! functions; only `decode` and the callers touch the filesystem.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Pixel stages, geometry, request parameters, PNG/JPEG codec |
//! | [`pipeline`] | Runs the stages in order, emits progress events, maps failures to error codes |
//! | [`dispatch`] | Method-call boundary: parses loosely typed `cropOval` arguments into a typed request |
//! | [`config`] | `config.toml` loading, validation and merging; supplies request fallbacks |
//! | [`batch`] | Parallel cropping of a whole directory tree |
//! | [`output`] | CLI output formatting for stage events, batch progress and responses |
//!
//! # Design Decisions
//!
//! ## Explicit Crop Policy
//!
//! A request names its policy (`zoomScale` or `aspectFit`) in the `policy`
//! field. Supplying a width and height never switches the policy on its own;
//! the configured default applies when the field is absent.
//!
//! ## Straight Alpha
//!
//! Buffers are stored with straight (non-premultiplied) alpha, which is what
//! PNG expects. Rotation weights colour by alpha while interpolating, and
//! resampling filters premultiplied values, so transparent corners never
//! bleed dark fringes into the picture.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling and encoding go through the `image` crate with only
//! the codecs we need enabled. No system libraries are required.

pub mod batch;
pub mod config;
pub mod dispatch;
pub mod imaging;
pub mod output;
pub mod pipeline;
