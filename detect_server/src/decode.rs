//! Decoding of uploaded image bytes.
//!
use image::RgbImage;

use crate::error::DetectError;

/// Decode an encoded image (JPEG, PNG, BMP, WebP, ...) into an RGB pixel buffer.
///
/// The format is guessed from the leading magic bytes, not from a file name or content type.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, DetectError> {
    let format = image::guess_format(bytes)?;
    log::debug!("Decoding {} bytes as {:?}", bytes.len(), format);

    let image = image::load_from_memory_with_format(bytes, format)?;

    Ok(image.to_rgb8())
}
