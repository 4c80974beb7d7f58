//! Cropper configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! overridden by a user config file; the merged result supplies the values a
//! request falls back to when it leaves a field unset. Explicit request
//! fields always win.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [defaults]
//! policy = "zoom_scale"     # "zoom_scale" or "aspect_fit"
//! scale = 1.0               # Zoom factor when a request omits one (clamped 1-5)
//! format = "png"            # "png" or "jpeg"
//! quality = 100             # JPEG quality (0-100)
//!
//! [mask]
//! antialias = true          # Soft ellipse edge
//!
//! [jpeg]
//! background = "#ffffff"    # Colour transparent corners become in JPEG output
//!
//! [processing]
//! max_processes = 4         # Max parallel batch workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [defaults]
//! policy = "aspect_fit"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::dispatch::RequestDefaults;
use crate::imaging::{MaskEdge, OutputFormat, PolicyKind, Quality};
use image::Rgb;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Cropper configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropperConfig {
    /// Fallbacks for request fields.
    pub defaults: DefaultsConfig,
    /// Ellipse edge settings.
    pub mask: MaskConfig,
    /// JPEG output settings.
    pub jpeg: JpegConfig,
    /// Parallel batch settings.
    pub processing: ProcessingConfig,
}

impl CropperConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.quality > 100 {
            return Err(ConfigError::Validation(
                "defaults.quality must be 0-100".into(),
            ));
        }
        if !self.defaults.scale.is_finite() || self.defaults.scale <= 0.0 {
            return Err(ConfigError::Validation(
                "defaults.scale must be a positive number".into(),
            ));
        }
        if parse_hex_color(&self.jpeg.background).is_none() {
            return Err(ConfigError::Validation(format!(
                "jpeg.background must be #rgb or #rrggbb, got '{}'",
                self.jpeg.background
            )));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Request fallbacks derived from this config.
    ///
    /// Call on a validated config; an unparseable background falls back to white.
    pub fn request_defaults(&self) -> RequestDefaults {
        RequestDefaults {
            policy: self.defaults.policy,
            scale: self.defaults.scale,
            format: self.defaults.format,
            quality: Quality::new(self.defaults.quality as i64),
            mask_edge: if self.mask.antialias {
                MaskEdge::Smooth
            } else {
                MaskEdge::Hard
            },
            jpeg_background: parse_hex_color(&self.jpeg.background)
                .unwrap_or(Rgb([255, 255, 255])),
        }
    }
}

/// Fallback values for request fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultsConfig {
    pub policy: PolicyKind,
    pub scale: f64,
    pub format: OutputFormat,
    pub quality: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::ZoomScale,
            scale: 1.0,
            format: OutputFormat::Png,
            quality: 100,
        }
    }
}

/// Ellipse edge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaskConfig {
    /// Partial coverage along the inside of the boundary.
    pub antialias: bool,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self { antialias: true }
    }
}

/// JPEG output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JpegConfig {
    /// Opaque colour transparent pixels are flattened onto.
    pub background: String,
}

impl Default for JpegConfig {
    fn default() -> Self {
        Self {
            background: "#ffffff".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel batch workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Parse `#rgb` or `#rrggbb`.
pub fn parse_hex_color(value: &str) -> Option<Rgb<u8>> {
    let hex = value.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                rgb[i] = v * 17;
            }
            Some(Rgb(rgb))
        }
        6 => Some(Rgb([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        ])),
        _ => None,
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(CropperConfig::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults do not serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<CropperConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: CropperConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<CropperConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Shape Cropper Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# These are fallbacks: a request that sets a field explicitly always wins.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Request defaults
# ---------------------------------------------------------------------------
[defaults]
# Crop policy when a request names none.
#   "zoom_scale" - window = target size / scale, centered on the source
#   "aspect_fit" - scale the source to cover the target, then center-crop
policy = "zoom_scale"

# Zoom factor for zoom_scale when a request omits it. Clamped to 1.0-5.0.
scale = 1.0

# Output format: "png" (lossless, transparent corners) or "jpeg".
format = "png"

# JPEG quality (0-100). Ignored for PNG.
quality = 100

# ---------------------------------------------------------------------------
# Ellipse mask
# ---------------------------------------------------------------------------
[mask]
# Soften the boundary with sub-pixel coverage. Pixels whose center lies
# outside the ellipse are always fully transparent.
antialias = true

# ---------------------------------------------------------------------------
# JPEG output
# ---------------------------------------------------------------------------
[jpeg]
# JPEG has no alpha channel: transparent corners are flattened onto this
# colour (#rgb or #rrggbb).
background = "#ffffff"

# ---------------------------------------------------------------------------
# Batch processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for the batch command.
# Omit to use all CPU cores. Values above the core count are clamped.
# max_processes = 4
"##
}
