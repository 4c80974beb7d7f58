//! Decoding sources into RGBA8 and encoding the final raster.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF, BMP) | `image::ImageReader` with format sniffing |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (lossless, keeps alpha) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` after flattening onto an opaque background |
//!
//! JPEG has no alpha channel, so masked corners are composited over the
//! request's background colour. The result is a visibly different artifact
//! from the PNG path: corners are solid colour, not transparent.

use super::params::{OutputFormat, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageReader, Rgb, RgbImage, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot decode {origin}: {source}")]
    Decode {
        origin: String,
        source: image::ImageError,
    },
    #[error("decoded image {origin} is empty")]
    EmptyImage { origin: String },
    #[error("{format} encode failed: {source}")]
    Encode {
        format: OutputFormat,
        source: image::ImageError,
    },
}

/// Extensions whose decoders are compiled in.
const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "webp", "gif", "bmp"];

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    SUPPORTED_EXTENSIONS
}

/// Whether `path` has an extension [`decode_path`] is expected to handle.
pub fn is_supported_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
}

fn non_empty(image: RgbaImage, origin: impl FnOnce() -> String) -> Result<RgbaImage, CodecError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(CodecError::EmptyImage { origin: origin() });
    }
    Ok(image)
}

/// Load and decode an image file into straight-alpha RGBA8.
///
/// The format is sniffed from the content, so a misnamed file still decodes.
pub fn decode_path(path: &Path) -> Result<RgbaImage, CodecError> {
    let origin = || path.display().to_string();
    let reader = ImageReader::open(path)
        .map_err(|source| CodecError::Open {
            path: path.to_path_buf(),
            source,
        })?
        .with_guessed_format()
        .map_err(|source| CodecError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let decoded = reader.decode().map_err(|source| CodecError::Decode {
        origin: origin(),
        source,
    })?;
    non_empty(decoded.into_rgba8(), origin)
}

/// Decode an in-memory encoded image into straight-alpha RGBA8.
pub fn decode_bytes(bytes: &[u8]) -> Result<RgbaImage, CodecError> {
    let origin = || format!("<{} bytes>", bytes.len());
    let decoded = image::load_from_memory(bytes).map_err(|source| CodecError::Decode {
        origin: origin(),
        source,
    })?;
    non_empty(decoded.into_rgba8(), origin)
}

/// Composite straight-alpha RGBA over an opaque colour.
pub fn flatten_onto(image: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        let alpha = p[3] as u32;
        let blend = |fg: u8, bg: u8| ((fg as u32 * alpha + bg as u32 * (255 - alpha) + 127) / 255) as u8;
        Rgb([
            blend(p[0], background[0]),
            blend(p[1], background[1]),
            blend(p[2], background[2]),
        ])
    })
}

/// Encode the final raster.
///
/// PNG is lossless and ignores `quality`. JPEG flattens onto `background`
/// first; quality 0 is passed to the codec as 1, its lowest setting.
pub fn encode(
    image: &RgbaImage,
    format: OutputFormat,
    quality: Quality,
    background: Rgb<u8>,
) -> Result<Vec<u8>, CodecError> {
    let mut buffer = Cursor::new(Vec::new());
    let (width, height) = image.dimensions();

    let result = match format {
        OutputFormat::Png => PngEncoder::new(&mut buffer).write_image(
            image.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
        OutputFormat::Jpeg => {
            let flat = flatten_onto(image, background);
            JpegEncoder::new_with_quality(&mut buffer, quality.value().max(1)).write_image(
                flat.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )
        }
    };
    result.map_err(|source| CodecError::Encode { format, source })?;

    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn masked_like(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            if (x + y) % 3 == 0 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([(x * 9) as u8, (y * 11) as u8, 77, (x * 13 + y) as u8])
            }
        })
    }

    #[test]
    fn png_round_trip_is_lossless() {
        let img = masked_like(23, 19);
        let bytes = encode(&img, OutputFormat::Png, Quality::default(), Rgb([255; 3])).unwrap();
        let decoded = decode_bytes(&bytes).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn png_ignores_quality() {
        let img = masked_like(8, 8);
        let a = encode(&img, OutputFormat::Png, Quality::new(0), Rgb([0; 3])).unwrap();
        let b = encode(&img, OutputFormat::Png, Quality::new(100), Rgb([0; 3])).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn jpeg_output_has_jpeg_magic_and_dimensions() {
        let img = masked_like(32, 16);
        let bytes = encode(&img, OutputFormat::Jpeg, Quality::new(80), Rgb([255; 3])).unwrap();
        assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);
        let decoded = decode_bytes(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (32, 16));
        assert!(decoded.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn jpeg_quality_zero_still_encodes() {
        let img = masked_like(16, 16);
        assert!(encode(&img, OutputFormat::Jpeg, Quality::new(0), Rgb([0; 3])).is_ok());
    }

    #[test]
    fn jpeg_transparent_corners_take_background() {
        let img = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 0]));
        let bytes = encode(&img, OutputFormat::Jpeg, Quality::new(100), Rgb([255, 255, 255])).unwrap();
        let decoded = decode_bytes(&bytes).unwrap();
        assert!(decoded.get_pixel(0, 0)[0] > 245);
    }

    #[test]
    fn flatten_blends_by_alpha() {
        let img = RgbaImage::from_fn(3, 1, |x, _| match x {
            0 => Rgba([200, 100, 0, 255]),
            1 => Rgba([200, 100, 0, 0]),
            _ => Rgba([0, 0, 0, 128]),
        });
        let flat = flatten_onto(&img, Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(0, 0), &Rgb([200, 100, 0]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(2, 0), &Rgb([127, 127, 127]));
    }

    #[test]
    fn decode_path_nonexistent_is_open_error() {
        let err = decode_path(Path::new("/nonexistent/image.png")).unwrap_err();
        assert!(matches!(err, CodecError::Open { .. }));
    }

    #[test]
    fn decode_path_garbage_is_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let err = decode_path(&path).unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
    }

    #[test]
    fn decode_path_sniffs_misnamed_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("actually-png.jpg");
        let img = masked_like(5, 4);
        let bytes = encode(&img, OutputFormat::Png, Quality::default(), Rgb([0; 3])).unwrap();
        std::fs::write(&path, bytes).unwrap();
        assert_eq!(decode_path(&path).unwrap(), img);
    }

    #[test]
    fn supported_extension_check_is_case_insensitive() {
        assert!(is_supported_path(Path::new("a/b/photo.JPG")));
        assert!(is_supported_path(Path::new("x.webp")));
        assert!(!is_supported_path(Path::new("notes.txt")));
        assert!(!is_supported_path(Path::new("no_extension")));
    }
}
