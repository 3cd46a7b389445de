//! Lossless PNG encoding for baselines and diff artifacts
//!
//! Captures arrive from the browser as already-valid PNG payloads; this
//! module re-encodes them with the strongest lossless settings so on-disk
//! baselines are deterministic and as small as the codec can make them.

use crate::CaptureError;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder, RgbaImage};
use tracing::warn;

/// Encodes an in-memory image as an optimized PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CaptureError> {
    let mut out = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ColorType::Rgba8,
        )
        .map_err(|e| CaptureError::ImageEncodeFailed(e.to_string()))?;
    Ok(out)
}

/// Re-encodes raw PNG bytes with the strongest lossless settings.
///
/// If optimization fails, or does not actually shrink the payload, the
/// original bytes are returned unchanged; the caller never receives an empty
/// or malformed buffer.
pub fn optimize_png(raw: &[u8]) -> Vec<u8> {
    match reencode(raw) {
        Ok(optimized) if optimized.len() < raw.len() => optimized,
        Ok(_) => raw.to_vec(),
        Err(err) => {
            warn!("PNG optimization failed, writing unoptimized bytes: {err}");
            raw.to_vec()
        }
    }
}

fn reencode(raw: &[u8]) -> Result<Vec<u8>, CaptureError> {
    let decoded = image::load_from_memory(raw)?.to_rgba8();
    encode_png(&decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_encode_png_is_lossless() {
        let mut img = RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255]));
        img.put_pixel(3, 4, Rgba([200, 0, 100, 255]));

        let bytes = encode_png(&img).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, img);
    }

    #[test]
    fn test_optimize_png_falls_back_on_garbage() {
        let garbage = b"definitely not a png".to_vec();
        assert_eq!(optimize_png(&garbage), garbage);
    }

    #[test]
    fn test_optimize_png_never_empty() {
        let img = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 255]));
        let raw = encode_png(&img).unwrap();
        let optimized = optimize_png(&raw);
        assert!(!optimized.is_empty());
        let decoded = image::load_from_memory(&optimized).unwrap().to_rgba8();
        assert_eq!(decoded, img);
    }
}
