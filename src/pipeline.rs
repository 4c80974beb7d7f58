//! The crop pipeline.
//!
//! ```text
//! Decode → Rotate → ComputeCropRect → Extract → Resample → Mask → Encode
//! ```
//!
//! Strictly linear: each stage consumes the previous stage's buffer and the
//! first failure aborts the run. No partial output is ever returned. Callers
//! that want progress pass a [`Sender`] and receive a [`PipelineEvent`] at the
//! start and end of every stage; a dropped receiver is ignored.
//!
//! ## Error codes
//!
//! | Failure | [`ErrorCode`] |
//! |---|---|
//! | Bad request field (zero target, non-finite angle) | `INVALID_ARGUMENT` |
//! | Target or rotated canvas over [`MAX_PIXELS`] | `INVALID_ARGUMENT` |
//! | Source missing, unreadable, or not an image | `INVALID_IMAGE` |
//! | Rotation fault | `ROTATE_FAILED` |
//! | Anything downstream (extract, resample, encode) | `CROP_FAILED` |
//!
//! `ROTATE_FAILED` only comes from calling [`rotate`] directly. Requests
//! through this module are validated first and decoded images are never
//! empty, so the rotator's own checks cannot fire here.

use crate::imaging::{
    CodecError, CropRequest, ExtractError, OutputFormat, RasterImage, ResampleError, RotateError,
    calculate_rotated_bounds, codec, compute_crop_rect, extract, mask_to_ellipse, resample, rotate,
};
use std::path::Path;
use std::sync::mpsc::Sender;
use thiserror::Error;

/// Machine-readable failure category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidArgument,
    InvalidImage,
    RotateFailed,
    CropFailed,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidImage => "INVALID_IMAGE",
            Self::RotateFailed => "ROTATE_FAILED",
            Self::CropFailed => "CROP_FAILED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum CropError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Cannot decode image: {0}")]
    InvalidImage(#[source] CodecError),
    #[error("Failed to rotate image: {0}")]
    Rotate(#[from] RotateError),
    #[error("Failed to extract crop: {0}")]
    Extract(#[from] ExtractError),
    #[error("Failed to resample: {0}")]
    Resample(#[from] ResampleError),
    #[error("Failed to encode image: {0}")]
    Encode(#[source] CodecError),
}

impl CropError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::InvalidImage(_) => ErrorCode::InvalidImage,
            Self::Rotate(_) => ErrorCode::RotateFailed,
            Self::Extract(_) | Self::Resample(_) | Self::Encode(_) => ErrorCode::CropFailed,
        }
    }
}

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Rotate,
    Crop,
    Resample,
    Mask,
    Encode,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Rotate => "rotate",
            Self::Crop => "crop",
            Self::Resample => "resample",
            Self::Mask => "mask",
            Self::Encode => "encode",
        }
    }
}

/// Progress notification emitted at stage boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    StageStarted { stage: Stage },
    StageFinished { stage: Stage, width: u32, height: u32 },
    Encoded { format: OutputFormat, bytes: usize },
}

/// Final artifact: format tag plus encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
}

fn emit(events: Option<&Sender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(tx) = events {
        tx.send(event).ok();
    }
}

fn finished(events: Option<&Sender<PipelineEvent>>, stage: Stage, image: &RasterImage) {
    log::debug!(
        "{} finished: {}x{}",
        stage.label(),
        image.width(),
        image.height()
    );
    emit(
        events,
        PipelineEvent::StageFinished {
            stage,
            width: image.width(),
            height: image.height(),
        },
    );
}

fn started(events: Option<&Sender<PipelineEvent>>, stage: Stage) {
    log::debug!("{} started", stage.label());
    emit(events, PipelineEvent::StageStarted { stage });
}

/// Largest buffer, in pixels, any stage may allocate (64 Mpx, 256 MiB as RGBA8).
pub const MAX_PIXELS: u64 = 64 * 1024 * 1024;

/// Reject a `width × height` buffer larger than [`MAX_PIXELS`].
pub fn check_pixel_budget(what: &str, width: u32, height: u32) -> Result<(), CropError> {
    if width as u64 * height as u64 > MAX_PIXELS {
        return Err(CropError::InvalidArgument(format!(
            "{what} {width}x{height} exceeds the {MAX_PIXELS}-pixel limit"
        )));
    }
    Ok(())
}

fn validate(request: &CropRequest) -> Result<(), CropError> {
    if request.target_width == Some(0) || request.target_height == Some(0) {
        return Err(CropError::InvalidArgument(format!(
            "target size must be positive, got {}x{}",
            request.target_width.unwrap_or_default(),
            request.target_height.unwrap_or_default()
        )));
    }
    if !request.angle_degrees.is_finite() {
        return Err(CropError::InvalidArgument(format!(
            "angle must be finite, got {}",
            request.angle_degrees
        )));
    }
    if let (Some(width), Some(height)) = (request.target_width, request.target_height) {
        check_pixel_budget("target", width, height)?;
    }
    Ok(())
}

/// Run the full pipeline on an image file.
pub fn run(source: &Path, request: &CropRequest) -> Result<EncodedImage, CropError> {
    run_with_events(source, request, None)
}

/// Run the full pipeline on an image file, reporting stage boundaries.
pub fn run_with_events(
    source: &Path,
    request: &CropRequest,
    events: Option<&Sender<PipelineEvent>>,
) -> Result<EncodedImage, CropError> {
    validate(request)?;
    started(events, Stage::Decode);
    let image = codec::decode_path(source).map_err(CropError::InvalidImage)?;
    finished(events, Stage::Decode, &image);
    process_with_events(image, request, events)
}

/// Run the full pipeline on an encoded image already in memory.
pub fn run_bytes(
    bytes: &[u8],
    request: &CropRequest,
    events: Option<&Sender<PipelineEvent>>,
) -> Result<EncodedImage, CropError> {
    validate(request)?;
    started(events, Stage::Decode);
    let image = codec::decode_bytes(bytes).map_err(CropError::InvalidImage)?;
    finished(events, Stage::Decode, &image);
    process_with_events(image, request, events)
}

/// Everything after decoding: transform, then encode.
pub fn process_with_events(
    image: RasterImage,
    request: &CropRequest,
    events: Option<&Sender<PipelineEvent>>,
) -> Result<EncodedImage, CropError> {
    let masked = transform(image, request, events)?;

    started(events, Stage::Encode);
    let bytes = codec::encode(
        &masked,
        request.format,
        request.quality,
        request.jpeg_background,
    )
    .map_err(CropError::Encode)?;
    log::debug!("encode finished: {} {} bytes", request.format, bytes.len());
    emit(
        events,
        PipelineEvent::Encoded {
            format: request.format,
            bytes: bytes.len(),
        },
    );

    Ok(EncodedImage {
        format: request.format,
        bytes,
    })
}

/// Rotate, crop, resample and mask a decoded image; no encoding.
///
/// The output is exactly the requested target size, or the rotated source
/// size when the request leaves a dimension unset.
pub fn transform(
    image: RasterImage,
    request: &CropRequest,
    events: Option<&Sender<PipelineEvent>>,
) -> Result<RasterImage, CropError> {
    validate(request)?;
    let (source_w, source_h) = image.dimensions();
    let (canvas_w, canvas_h) = calculate_rotated_bounds(source_w, source_h, request.angle_degrees);
    check_pixel_budget("rotated canvas", canvas_w, canvas_h)?;

    started(events, Stage::Rotate);
    let rotated = rotate(image, request.angle_degrees)?;
    finished(events, Stage::Rotate, &rotated);

    let (rotated_w, rotated_h) = rotated.dimensions();
    let target = (
        request.target_width.unwrap_or(rotated_w),
        request.target_height.unwrap_or(rotated_h),
    );
    check_pixel_budget("target", target.0, target.1)?;

    started(events, Stage::Crop);
    let rect = compute_crop_rect((rotated_w, rotated_h), target, request.policy);
    log::debug!(
        "crop rect {:?} from {}x{} for target {}x{} ({:?})",
        rect,
        rotated_w,
        rotated_h,
        target.0,
        target.1,
        request.policy
    );
    let cropped = extract(rotated, rect)?;
    finished(events, Stage::Crop, &cropped);

    started(events, Stage::Resample);
    let resampled = resample(cropped, target.0, target.1)?;
    finished(events, Stage::Resample, &resampled);

    started(events, Stage::Mask);
    let masked = mask_to_ellipse(resampled, request.mask_edge);
    finished(events, Stage::Mask, &masked);

    Ok(masked)
}
