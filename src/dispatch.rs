//! Method-call boundary.
//!
//! Callers speak in loosely typed method calls (a method name plus a JSON
//! object of arguments) and get back raw bytes, a coded error, or
//! "not implemented". This module turns that into a typed [`CropRequest`],
//! runs the [`pipeline`](crate::pipeline), and maps the outcome back.
//!
//! ## `cropOval` arguments
//!
//! | Field | Type | Default |
//! |---|---|---|
//! | `sourcePath` | string, required | none |
//! | `angle` | number (degrees) | `0` |
//! | `width`, `height` | number, truncated to whole pixels | post-rotation source size |
//! | `policy` | `"zoomScale"` \| `"aspectFit"` | configured default (`zoomScale`) |
//! | `scale` | number, ZoomScale only | configured default (`1.0`) |
//! | `compressFormat` | string; `"png"` (any case) or anything else ⇒ JPEG | `"png"` |
//! | `compressQuality` | integer, clamped to 0–100 | `100` |
//!
//! The policy is always chosen by the explicit `policy` field, never inferred
//! from which other fields are present. `null` is treated as absent.

use crate::imaging::{CropRequest, MaskEdge, OutputFormat, PolicyKind, Quality};
use crate::pipeline::{self, CropError, ErrorCode, PipelineEvent};
use image::Rgb;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use thiserror::Error;

/// The one method this boundary implements.
pub const CROP_OVAL: &str = "cropOval";

/// Largest accepted target dimension, in pixels.
pub const MAX_TARGET_DIMENSION: u32 = 32_768;

#[derive(Error, Debug, PartialEq)]
pub enum ArgumentError {
    #[error("arguments must be a JSON object")]
    NotAnObject,
    #[error("{0} is missing")]
    Missing(&'static str),
    #[error("{field} must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("unknown policy '{0}' (expected zoomScale or aspectFit)")]
    UnknownPolicy(String),
}

impl From<ArgumentError> for CropError {
    fn from(err: ArgumentError) -> Self {
        CropError::InvalidArgument(err.to_string())
    }
}

/// A method invocation as it arrives from the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// Outcome of one method call.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Success(Vec<u8>),
    Error { code: ErrorCode, message: String },
    NotImplemented { method: String },
}

impl From<CropError> for MethodResponse {
    fn from(err: CropError) -> Self {
        MethodResponse::Error {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Values used when a request leaves a field unset.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDefaults {
    pub policy: PolicyKind,
    pub scale: f64,
    pub format: OutputFormat,
    pub quality: Quality,
    pub mask_edge: MaskEdge,
    pub jpeg_background: Rgb<u8>,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            policy: PolicyKind::ZoomScale,
            scale: 1.0,
            format: OutputFormat::Png,
            quality: Quality::default(),
            mask_edge: MaskEdge::Smooth,
            jpeg_background: Rgb([255, 255, 255]),
        }
    }
}

/// Parsed `cropOval` call.
#[derive(Debug, Clone, PartialEq)]
pub struct CropOvalArgs {
    pub source_path: PathBuf,
    pub request: CropRequest,
}

type Fields = serde_json::Map<String, Value>;

fn field<'a>(fields: &'a Fields, name: &str) -> Option<&'a Value> {
    fields.get(name).filter(|v| !v.is_null())
}

fn number(fields: &Fields, name: &'static str) -> Result<Option<f64>, ArgumentError> {
    match field(fields, name) {
        None => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or(ArgumentError::WrongType {
            field: name,
            expected: "a number",
        }),
    }
}

fn string<'a>(fields: &'a Fields, name: &'static str) -> Result<Option<&'a str>, ArgumentError> {
    match field(fields, name) {
        None => Ok(None),
        Some(v) => v.as_str().map(Some).ok_or(ArgumentError::WrongType {
            field: name,
            expected: "a string",
        }),
    }
}

/// Whole-pixel dimension from an int or float, truncating the fraction.
fn dimension(fields: &Fields, name: &'static str) -> Result<Option<u32>, ArgumentError> {
    let Some(value) = number(fields, name)? else {
        return Ok(None);
    };
    let pixels = value.trunc();
    if !(1.0..=MAX_TARGET_DIMENSION as f64).contains(&pixels) {
        return Err(ArgumentError::OutOfRange { field: name, value });
    }
    Ok(Some(pixels as u32))
}

fn quality(fields: &Fields, default: Quality) -> Result<Quality, ArgumentError> {
    match field(fields, "compressQuality") {
        None => Ok(default),
        Some(v) => {
            if let Some(q) = v.as_i64() {
                Ok(Quality::new(q))
            } else if let Some(q) = v.as_f64() {
                Ok(Quality::new(q.clamp(i64::MIN as f64, i64::MAX as f64) as i64))
            } else {
                Err(ArgumentError::WrongType {
                    field: "compressQuality",
                    expected: "an integer",
                })
            }
        }
    }
}

/// Parse the transform fields of a call (everything except `sourcePath`).
pub fn parse_request(
    arguments: &Value,
    defaults: &RequestDefaults,
) -> Result<CropRequest, ArgumentError> {
    let fields = arguments.as_object().ok_or(ArgumentError::NotAnObject)?;

    let policy = match string(fields, "policy")? {
        None => defaults.policy,
        Some(name) => {
            PolicyKind::parse(name).ok_or_else(|| ArgumentError::UnknownPolicy(name.to_string()))?
        }
    };
    let scale = number(fields, "scale")?.unwrap_or(defaults.scale);
    let format = string(fields, "compressFormat")?
        .map(OutputFormat::from_name)
        .unwrap_or(defaults.format);

    Ok(CropRequest {
        angle_degrees: number(fields, "angle")?.unwrap_or(0.0),
        target_width: dimension(fields, "width")?,
        target_height: dimension(fields, "height")?,
        policy: policy.with_scale(scale),
        format,
        quality: quality(fields, defaults.quality)?,
        mask_edge: defaults.mask_edge,
        jpeg_background: defaults.jpeg_background,
    })
}

/// Parse `cropOval` arguments into a typed request.
pub fn parse_crop_oval(
    arguments: &Value,
    defaults: &RequestDefaults,
) -> Result<CropOvalArgs, ArgumentError> {
    let fields = arguments.as_object().ok_or(ArgumentError::NotAnObject)?;

    let source_path = string(fields, "sourcePath")?.ok_or(ArgumentError::Missing("sourcePath"))?;
    if source_path.is_empty() || source_path.contains('\0') {
        return Err(ArgumentError::WrongType {
            field: "sourcePath",
            expected: "a non-empty path",
        });
    }

    Ok(CropOvalArgs {
        source_path: PathBuf::from(source_path),
        request: parse_request(arguments, defaults)?,
    })
}

/// Routes method calls to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    defaults: RequestDefaults,
}

impl Dispatcher {
    pub fn new(defaults: RequestDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &RequestDefaults {
        &self.defaults
    }

    pub fn handle(&self, call: &MethodCall) -> MethodResponse {
        self.handle_with_events(call, None)
    }

    /// Handle one call. Never panics on malformed input; every failure is a
    /// coded [`MethodResponse::Error`].
    pub fn handle_with_events(
        &self,
        call: &MethodCall,
        events: Option<&Sender<PipelineEvent>>,
    ) -> MethodResponse {
        if call.method != CROP_OVAL {
            log::warn!("method not implemented: {}", call.method);
            return MethodResponse::NotImplemented {
                method: call.method.clone(),
            };
        }

        let args = match parse_crop_oval(&call.arguments, &self.defaults) {
            Ok(args) => args,
            Err(err) => {
                log::warn!("{CROP_OVAL} rejected: {err}");
                return CropError::from(err).into();
            }
        };
        log::info!(
            "{CROP_OVAL} source={} angle={} size={:?}x{:?} policy={:?} format={} quality={}",
            args.source_path.display(),
            args.request.angle_degrees,
            args.request.target_width,
            args.request.target_height,
            args.request.policy,
            args.request.format,
            args.request.quality.value()
        );

        match pipeline::run_with_events(&args.source_path, &args.request, events) {
            Ok(encoded) => {
                log::info!("{CROP_OVAL} produced {} bytes", encoded.bytes.len());
                MethodResponse::Success(encoded.bytes)
            }
            Err(err) => {
                log::error!("{CROP_OVAL} failed [{}]: {err}", err.code());
                err.into()
            }
        }
    }
}
