//! Color/transparency normalization.
//!
//! Reconciles a decoded image with what the target encoder accepts. After
//! [`normalize`] the image's [`ColorMode`] is in the target's allowed set and
//! its bit depth fits the target.
//!
//! Three cases, checked in order:
//!
//! 1. **Already acceptable**: returned untouched (PNG to PNG is always this).
//! 2. **Alpha into an opaque format**: flattened over the configured
//!    background. Fully transparent pixels take the background color exactly;
//!    partial alpha blends linearly.
//! 3. **Plain mode mismatch**: converted channel-wise (luma expands to RGB,
//!    wide buffers narrow to the target's depth).

use super::params::ConversionSettings;
use crate::formats::{ColorMode, Format, FormatSpec, bits_per_channel};
use image::{DynamicImage, Rgb, RgbImage};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid image: degenerate dimensions {width}x{height}")]
pub struct InvalidImageError {
    pub width: u32,
    pub height: u32,
}

/// Bring `image` into a color mode and depth the `target` encoder accepts.
pub fn normalize(
    image: DynamicImage,
    target: Format,
    settings: &ConversionSettings,
) -> Result<DynamicImage, InvalidImageError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 || image.color().channel_count() == 0 {
        return Err(InvalidImageError { width, height });
    }

    let spec = target.spec();
    let mode = ColorMode::of(&image);
    let bits = bits_per_channel(&image);

    if spec.accepts(mode, bits) {
        return Ok(image);
    }

    if mode.has_alpha() && !spec.supports_alpha {
        return Ok(DynamicImage::ImageRgb8(flatten(
            &image,
            settings.background_color,
        )));
    }

    let wide = bits > 8 && spec.max_bits_per_channel > 8;
    Ok(convert_mode(&image, closest_mode(spec, mode), wide))
}

/// Composite `image` over an opaque `background` canvas of the same size.
pub fn flatten(image: &DynamicImage, background: Rgb<u8>) -> RgbImage {
    let rgba = image.to_rgba8();
    let Rgb([br, bg, bb]) = background;
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        Rgb([blend(r, br, a), blend(g, bg, a), blend(b, bb, a)])
    })
}

/// `fg * a + bg * (1 - a)` with alpha in 0..=255, rounded.
fn blend(fg: u8, bg: u8, alpha: u8) -> u8 {
    let a = u32::from(alpha);
    let mixed = u32::from(fg) * a + u32::from(bg) * (255 - a);
    ((mixed + 127) / 255) as u8
}

/// The allowed mode that loses the least information from `mode`.
fn closest_mode(spec: &FormatSpec, mode: ColorMode) -> ColorMode {
    if spec.allows(mode) {
        mode
    } else if mode.has_alpha() && spec.supports_alpha && spec.allows(ColorMode::Rgba) {
        ColorMode::Rgba
    } else {
        ColorMode::Rgb
    }
}

fn convert_mode(image: &DynamicImage, mode: ColorMode, wide: bool) -> DynamicImage {
    match (mode, wide) {
        (ColorMode::Grayscale, false) => DynamicImage::ImageLuma8(image.to_luma8()),
        (ColorMode::Grayscale, true) => DynamicImage::ImageLuma16(image.to_luma16()),
        (ColorMode::GrayscaleAlpha, false) => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        (ColorMode::GrayscaleAlpha, true) => DynamicImage::ImageLumaA16(image.to_luma_alpha16()),
        (ColorMode::Rgba, false) => DynamicImage::ImageRgba8(image.to_rgba8()),
        (ColorMode::Rgba, true) => DynamicImage::ImageRgba16(image.to_rgba16()),
        // Palette and CMYK never come out of the decoders; RGB is the
        // lossless landing spot for everything else.
        (_, false) => DynamicImage::ImageRgb8(image.to_rgb8()),
        (_, true) => DynamicImage::ImageRgb16(image.to_rgb16()),
    }
}
