//! Derivative-generation primitives.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, DynamicImage, ImageResult};

use crate::config::{WatermarkCorner, WatermarkSettings};

/// File extensions treated as batch images.
pub const IMAGE_EXTENSIONS: &[&str] = &["tif", "tiff", "jpg", "jpeg", "png"];

/// Whether the path has a recognized image extension.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// Whether the image uses more than 8 bits per channel.
pub fn is_sixteen_bit(img: &DynamicImage) -> bool {
    matches!(
        img.color(),
        ColorType::L16
            | ColorType::La16
            | ColorType::Rgb16
            | ColorType::Rgba16
            | ColorType::Rgb32F
            | ColorType::Rgba32F
    )
}

/// Convert an image to 8 bits per channel, preserving alpha and grayscale.
pub fn to_eight_bit(img: &DynamicImage) -> DynamicImage {
    match img.color() {
        ColorType::L16 => DynamicImage::ImageLuma8(img.to_luma8()),
        ColorType::La16 => DynamicImage::ImageLumaA8(img.to_luma_alpha8()),
        c if c.has_alpha() => DynamicImage::ImageRgba8(img.to_rgba8()),
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    }
}

/// Save an image as JPEG with the given quality.
///
/// JPEG has no alpha channel, so the image is flattened to RGB first.
pub fn save_jpeg(img: &DynamicImage, path: &Path, quality: u8) -> ImageResult<()> {
    let rgb = img.to_rgb8();
    let file = File::create(path).map_err(image::ImageError::IoError)?;
    let mut writer = BufWriter::new(file);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
    encoder.encode_image(&rgb)
}

/// Bound the longest edge of an image, preserving aspect ratio.
///
/// Images already within the bound are returned unchanged.
pub fn resize_max_edge(img: &DynamicImage, max_edge: u32) -> DynamicImage {
    if img.width() <= max_edge && img.height() <= max_edge {
        return img.clone();
    }
    img.resize(max_edge, max_edge, FilterType::Lanczos3)
}

/// Composite a watermark onto an image.
///
/// The watermark is scaled relative to the base width, faded to the
/// configured opacity, and anchored to the configured corner with a
/// margin. Returns a new RGBA image.
pub fn composite_watermark(
    base: &DynamicImage,
    mark: &DynamicImage,
    settings: &WatermarkSettings,
) -> DynamicImage {
    let mut canvas = base.to_rgba8();

    // Scale the watermark to a fraction of the base width
    let scale_pct = u32::from(settings.scale_pct.clamp(1, 100));
    let target_w = (base.width() * scale_pct / 100).max(1).min(base.width());
    let target_h = ((u64::from(mark.height()) * u64::from(target_w))
        / u64::from(mark.width().max(1)))
    .max(1) as u32;
    let scaled = mark.resize_exact(target_w, target_h.min(base.height()), FilterType::Lanczos3);

    // Apply opacity to the watermark alpha channel
    let opacity = u32::from(settings.opacity_pct.min(100));
    let mut mark_rgba = scaled.to_rgba8();
    for pixel in mark_rgba.pixels_mut() {
        pixel.0[3] = (u32::from(pixel.0[3]) * opacity / 100) as u8;
    }

    // Anchor position, clamped so the watermark stays inside the canvas
    let margin = settings.margin_px;
    let max_x = canvas.width().saturating_sub(mark_rgba.width());
    let max_y = canvas.height().saturating_sub(mark_rgba.height());
    let (x, y) = match settings.corner {
        WatermarkCorner::TopLeft => (margin.min(max_x), margin.min(max_y)),
        WatermarkCorner::TopRight => (max_x.saturating_sub(margin), margin.min(max_y)),
        WatermarkCorner::BottomLeft => (margin.min(max_x), max_y.saturating_sub(margin)),
        WatermarkCorner::BottomRight => {
            (max_x.saturating_sub(margin), max_y.saturating_sub(margin))
        }
    };

    imageops::overlay(&mut canvas, &mark_rgba, i64::from(x), i64::from(y));
    DynamicImage::ImageRgba8(canvas)
}
