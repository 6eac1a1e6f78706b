//! Thumbnail generation for fetched images

use image::codecs::jpeg::JpegEncoder;
use std::path::Path;

use crate::config::ThumbnailConfig;
use crate::error::TaskError;

/// An encoded JPEG thumbnail held in memory
#[derive(Clone, Debug)]
pub struct Thumbnail {
    /// Encoded JPEG bytes
    pub jpeg: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Decode `bytes` as an image and encode a JPEG thumbnail of it
///
/// The thumbnail fits within `max_width` x `max_height` with the aspect ratio preserved.
/// Images already within bounds are re-encoded at their original size, never upscaled.
/// Nothing touches the filesystem, so a payload that fails here leaves no partial file.
///
/// This is CPU-bound; call it from `spawn_blocking` in async code.
pub fn render_thumbnail(bytes: &[u8], config: &ThumbnailConfig) -> Result<Thumbnail, TaskError> {
    let img = image::load_from_memory(bytes).map_err(|e| {
        TaskError::invalid_response(format!("payload is not a decodable image: {}", e))
    })?;

    let thumb = if img.width() > config.max_width || img.height() > config.max_height {
        img.thumbnail(config.max_width, config.max_height)
    } else {
        img
    };
    let rgb = thumb.to_rgb8();

    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, config.jpeg_quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| TaskError::io(format!("failed to encode thumbnail: {}", e)))?;

    let (width, height) = rgb.dimensions();
    Ok(Thumbnail {
        jpeg,
        width,
        height,
    })
}

/// Render a thumbnail of `bytes` and write it to `dest`
///
/// `dest` is only created once encoding has succeeded.
pub fn write_thumbnail(
    bytes: &[u8],
    dest: &Path,
    config: &ThumbnailConfig,
) -> Result<(u32, u32), TaskError> {
    let thumb = render_thumbnail(bytes, config)?;
    std::fs::write(dest, &thumb.jpeg)?;
    Ok((thumb.width, thumb.height))
}
