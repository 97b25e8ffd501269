use std::io::Cursor;

use bytes::Bytes;
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageReader};
use tracing::{info, warn};

use crate::error::GlamoError;
use crate::models::{ProcessedImage, UploadableImage};

pub const DEFAULT_MAX_DIMENSION: u32 = 1024;
pub const DEFAULT_QUALITY: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessOptions {
    pub max_dimension: u32,
    /// Lossy quality factor in `0.0..=1.0`.
    pub quality: f32,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self { max_dimension: DEFAULT_MAX_DIMENSION, quality: DEFAULT_QUALITY }
    }
}

/// Outcome of pre-processing: either the compressed replacement or the
/// untouched original.
#[derive(Debug, Clone, PartialEq)]
pub enum Preprocessed {
    Compressed(ProcessedImage),
    Original(UploadableImage),
}

impl Preprocessed {
    pub fn bytes(&self) -> Bytes {
        match self {
            Preprocessed::Compressed(p) => p.bytes.clone(),
            Preprocessed::Original(o) => o.bytes.clone(),
        }
    }

    pub fn media_type(&self) -> &str {
        match self {
            Preprocessed::Compressed(p) => p.media_type(),
            Preprocessed::Original(o) => &o.media_type,
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            Preprocessed::Compressed(p) => p.file_name(),
            Preprocessed::Original(o) => &o.file_name,
        }
    }

    pub fn is_compressed(&self) -> bool { matches!(self, Preprocessed::Compressed(_)) }
}

/// Size that fits `width x height` inside a `max_dimension` square without
/// ever enlarging it.
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    let max = max_dimension.max(1);
    let scale = (max as f64 / width as f64)
        .min(max as f64 / height as f64)
        .min(1.0);
    let w = ((width as f64 * scale).round() as u32).clamp(1, max);
    let h = ((height as f64 * scale).round() as u32).clamp(1, max);
    (w, h)
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, GlamoError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| GlamoError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| GlamoError::Decode(e.to_string()))
}

fn encode_webp(img: &DynamicImage, quality: f32) -> Result<Vec<u8>, GlamoError> {
    let quality = quality.clamp(0.0, 1.0) * 100.0;
    let encoded = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
            .encode_simple(false, quality)
            .map(|m| m.to_vec())
    } else {
        let rgb = img.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height())
            .encode_simple(false, quality)
            .map(|m| m.to_vec())
    };
    encoded.map_err(|e| GlamoError::Encode(format!("{e:?}")))
}

/// Synchronous core of [`process`].
pub fn process_blocking(image: UploadableImage, options: PreprocessOptions) -> Preprocessed {
    let decoded = match decode(&image.bytes) {
        Ok(d) => d,
        Err(e) => {
            warn!(file = %image.file_name, error = %e, "uploading original file");
            return Preprocessed::Original(image);
        }
    };

    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        warn!(file = %image.file_name, "empty bitmap, uploading original file");
        return Preprocessed::Original(image);
    }

    let (target_w, target_h) = target_dimensions(width, height, options.max_dimension);
    let resized = (target_w, target_h) != (width, height);
    let bitmap = if resized {
        decoded.resize_exact(target_w, target_h, FilterType::Lanczos3)
    } else {
        decoded
    };

    let encoded = match encode_webp(&bitmap, options.quality) {
        Ok(b) => b,
        Err(e) => {
            warn!(file = %image.file_name, error = %e, "uploading original file");
            return Preprocessed::Original(image);
        }
    };

    if !resized && encoded.len() > image.bytes.len() {
        info!(
            file = %image.file_name,
            original = image.bytes.len(),
            encoded = encoded.len(),
            "re-encode would grow payload, uploading original file"
        );
        return Preprocessed::Original(image);
    }

    info!(
        "🗜️ {} {}x{} -> {}x{} ({} -> {} bytes)",
        image.file_name, width, height, target_w, target_h, image.bytes.len(), encoded.len()
    );
    Preprocessed::Compressed(ProcessedImage { bytes: Bytes::from(encoded), width: target_w, height: target_h })
}

/// Runs the decode/resize/encode on the blocking pool so the request task
/// sees it as a single awaited step.
pub async fn process(image: UploadableImage, options: PreprocessOptions) -> Preprocessed {
    let fallback = image.clone();
    match tokio::task::spawn_blocking(move || process_blocking(image, options)).await {
        Ok(out) => out,
        Err(e) => {
            warn!(error = %e, "pre-processing task failed, uploading original file");
            Preprocessed::Original(fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb};

    fn png(width: u32, height: u32, noisy: bool) -> UploadableImage {
        let buf = ImageBuffer::from_fn(width, height, |x, y| {
            if noisy {
                let v = (x.wrapping_mul(7919) ^ y.wrapping_mul(104_729) ^ x.wrapping_mul(y)) % 256;
                Rgb([v as u8, (v * 3 % 256) as u8, (v * 7 % 256) as u8])
            } else {
                Rgb([200, 120, 40])
            }
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(buf).write_to(&mut out, ImageFormat::Png).unwrap();
        UploadableImage::new(out.into_inner(), "image/png", "photo.png")
    }

    #[test]
    fn target_dimensions_never_exceed_bound_or_upscale() {
        for &max in &[512u32, 1024] {
            for &(w, h) in &[(1, 1), (300, 200), (512, 512), (513, 10), (4000, 3000), (1000, 5000), (1023, 1025)] {
                let (tw, th) = target_dimensions(w, h, max);
                assert!(tw.max(th) <= max, "{w}x{h} -> {tw}x{th} exceeds {max}");
                assert!(tw <= w && th <= h, "{w}x{h} was enlarged to {tw}x{th}");
                let scale = (max as f64 / w as f64).min(max as f64 / h as f64).min(1.0);
                assert!((tw as f64 - w as f64 * scale).abs() <= 0.5 + f64::EPSILON);
                assert!((th as f64 - h as f64 * scale).abs() <= 0.5 + f64::EPSILON);
            }
        }
    }

    #[test]
    fn portrait_rounds_short_side() {
        assert_eq!(target_dimensions(600, 1800, 512), (171, 512));
        assert_eq!(target_dimensions(2000, 1000, 1024), (1024, 512));
    }

    #[test]
    fn large_image_is_downscaled_to_webp() {
        let input = png(2000, 1000, true);
        let out = process_blocking(input, PreprocessOptions::default());
        let Preprocessed::Compressed(processed) = &out else { panic!("expected compressed output") };
        assert_eq!((processed.width, processed.height), (1024, 512));
        assert_eq!(out.media_type(), "image/webp");
        assert_eq!(out.file_name(), "compressed.webp");

        let decoded = image::load_from_memory_with_format(&processed.bytes, ImageFormat::WebP).unwrap();
        assert_eq!(decoded.dimensions(), (1024, 512));
    }

    #[test]
    fn small_image_is_never_enlarged_or_grown() {
        for noisy in [true, false] {
            let input = png(300, 200, noisy);
            let original_len = input.bytes.len();
            let out = process_blocking(input, PreprocessOptions { max_dimension: 512, quality: 0.85 });
            assert!(out.bytes().len() <= original_len);
            let decoded = image::load_from_memory(&out.bytes()).unwrap();
            assert_eq!(decoded.dimensions(), (300, 200));
        }
    }

    #[test]
    fn undecodable_input_passes_through_unchanged() {
        let input = UploadableImage::new(&b"definitely not an image"[..], "image/jpeg", "broken.jpg");
        let out = process_blocking(input.clone(), PreprocessOptions::default());
        assert_eq!(out, Preprocessed::Original(input));
    }

    #[tokio::test]
    async fn async_process_matches_blocking() {
        let input = png(64, 64, true);
        let a = process(input.clone(), PreprocessOptions::default()).await;
        let b = process_blocking(input, PreprocessOptions::default());
        assert_eq!(a.media_type(), b.media_type());
        assert_eq!(a.is_compressed(), b.is_compressed());
    }
}
