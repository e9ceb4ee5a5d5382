//! Image re-encoding: shrink to a maximum width, then JPEG at fixed quality.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError};

/// Content type of every re-encoded image.
pub const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";

/// Target size for an image `width`×`height` capped at `max_width`.
///
/// Aspect ratio is preserved; neither side drops below one pixel.
pub fn fit_to_width(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let scaled = (height as f64 * max_width as f64 / width as f64).round() as u32;
    (max_width, scaled.max(1))
}

/// Decode `bytes`, shrink to `max_width` and encode as JPEG at `quality`.
///
/// CPU bound; callers on the async runtime should run it on the blocking
/// pool.
pub fn transcode(bytes: &[u8], max_width: u32, quality: u8) -> Result<Vec<u8>, ImageError> {
    let img = image::load_from_memory(bytes)?;
    let (width, height) = fit_to_width(img.width(), img.height(), max_width);

    let img = if width == img.width() {
        img
    } else {
        img.resize_exact(width, height, FilterType::Triangle)
    };

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    rgb.write_with_encoder(encoder)?;
    Ok(out)
}
