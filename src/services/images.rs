//! Decoding and measuring images before they are embedded.

use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

use crate::models::{ImageKind, PreparedImage};

fn native_kind(format: Option<ImageFormat>) -> Option<ImageKind> {
    match format? {
        ImageFormat::Png => Some(ImageKind::Png),
        ImageFormat::Jpeg => Some(ImageKind::Jpeg),
        ImageFormat::Gif => Some(ImageKind::Gif),
        ImageFormat::Bmp => Some(ImageKind::Bmp),
        _ => None,
    }
}

/// Decode `bytes` to validate them and read pixel dimensions.
/// Formats a word processor cannot display (WebP and friends) are re-encoded as PNG.
pub fn prepare_image(bytes: Vec<u8>) -> Result<PreparedImage, String> {
    if bytes.is_empty() {
        return Err("image is empty".to_string());
    }
    let reader = ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .map_err(|e| format!("could not read image: {}", e))?;
    let format = reader.format();
    let decoded = reader
        .decode()
        .map_err(|e| format!("could not decode image: {}", e))?;
    let (width_px, height_px) = (decoded.width(), decoded.height());
    if width_px == 0 || height_px == 0 {
        return Err("image has no pixels".to_string());
    }

    match native_kind(format) {
        Some(kind) => Ok(PreparedImage {
            bytes,
            kind,
            width_px,
            height_px,
        }),
        None => {
            let mut out = Cursor::new(Vec::new());
            decoded
                .write_to(&mut out, ImageFormat::Png)
                .map_err(|e| format!("could not convert image to PNG: {}", e))?;
            Ok(PreparedImage {
                bytes: out.into_inner(),
                kind: ImageKind::Png,
                width_px,
                height_px,
            })
        }
    }
}

pub fn prepare_image_file(path: &Path) -> Result<PreparedImage, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("could not read {}: {}", path.display(), e))?;
    prepare_image(bytes)
}
