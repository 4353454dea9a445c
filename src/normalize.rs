//! Image format normalization.
//!
//! Every stored avatar is PNG. PNG sources are copied byte-for-byte,
//! anything else the `image` crate can decode is re-encoded.

use std::io::Cursor;
use std::path::Path;

use image::{ColorType, DynamicImage, GenericImageView, ImageFormat, ImageReader};
use tracing::{debug, trace};

use crate::error::{AvatarError, Result};

/// The on-disk image format.
pub const CANONICAL_FORMAT: ImageFormat = ImageFormat::Png;

/// Canonical bytes produced from a source image.
#[derive(Debug, Clone)]
pub struct Normalized {
    /// PNG-encoded image data.
    pub bytes: Vec<u8>,
    /// False when the source bytes were kept as-is.
    pub reencoded: bool,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
}

/// Returns true when `path` carries the canonical (PNG) extension, ignoring case.
pub fn is_canonical(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

/// Produce canonical bytes for `source`.
///
/// # Errors
///
/// Returns `DecodeError` when the file is missing, has an unrecognized
/// extension, or cannot be decoded as an image.
pub fn normalize(source: &Path) -> Result<Normalized> {
    let decode_error = |reason: String| AvatarError::DecodeError {
        path: source.display().to_string(),
        reason,
    };

    let format = ImageFormat::from_path(source)
        .map_err(|_| decode_error("unrecognized image extension".to_string()))?;

    let bytes = std::fs::read(source).map_err(|e| decode_error(e.to_string()))?;
    if bytes.is_empty() {
        return Err(decode_error("file is empty".to_string()));
    }

    if is_canonical(source) {
        let img = decode_canonical(&bytes).map_err(|e| decode_error(e.to_string()))?;
        let (width, height) = img.dimensions();
        trace!(path = %source.display(), width, height, "Keeping PNG source bytes");
        return Ok(Normalized {
            bytes,
            reencoded: false,
            width,
            height,
        });
    }

    let img = ImageReader::with_format(Cursor::new(&bytes), format)
        .decode()
        .map_err(|e| decode_error(e.to_string()))?;
    let (width, height) = img.dimensions();
    let encoded = encode_canonical(&img).map_err(|e| decode_error(e.to_string()))?;

    debug!(
        path = %source.display(),
        ?format,
        width,
        height,
        size = encoded.len(),
        "Re-encoded source image to PNG"
    );

    Ok(Normalized {
        bytes: encoded,
        reencoded: true,
        width,
        height,
    })
}

/// Decode stored avatar bytes.
pub fn decode_canonical(bytes: &[u8]) -> image::ImageResult<DynamicImage> {
    image::load_from_memory_with_format(bytes, CANONICAL_FORMAT)
}

/// Encode an image as PNG.
///
/// Float pixel layouts have no PNG representation and are converted to 8-bit RGBA.
pub fn encode_canonical(img: &DynamicImage) -> image::ImageResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    match img.color() {
        ColorType::Rgb32F | ColorType::Rgba32F => {
            DynamicImage::ImageRgba8(img.to_rgba8()).write_to(&mut out, CANONICAL_FORMAT)?;
        }
        _ => img.write_to(&mut out, CANONICAL_FORMAT)?,
    }
    Ok(out.into_inner())
}
