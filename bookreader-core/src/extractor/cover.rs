//! Cover image validation and encoding

use crate::error::ExtractError;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

/// Check that `bytes` decode completely as an image.
///
/// A valid header is not enough: truncated or corrupt pixel data fails.
pub fn is_decodable_image(bytes: &[u8]) -> bool {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.decode().ok())
        .map(|image| image.width() > 0 && image.height() > 0)
        .unwrap_or(false)
}

/// Keep cover bytes only when they decode as an image
pub fn validate_cover(bytes: Vec<u8>) -> Option<Vec<u8>> {
    if is_decodable_image(&bytes) {
        Some(bytes)
    } else {
        None
    }
}

/// Encode an image as PNG
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ExtractError> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| ExtractError::InvalidImage(e.to_string()))?;
    Ok(out.into_inner())
}
