//! Format capability table.
//!
//! Static knowledge about the three formats the converter speaks: which color
//! modes each encoder accepts, whether it can carry an alpha channel, which
//! file extensions identify it, and how many bits per channel it stores.
//!
//! | Format | Alpha | Encodable modes | Extensions | Bits/channel |
//! |---|---|---|---|---|
//! | JPG | no | RGB | `jpg`, `jpeg` | 8 |
//! | PNG | yes | grayscale, grayscale+alpha, RGB, RGB+alpha, palette | `png` | 16 |
//! | HEIC | no | RGB | `heic`, `heif` | 8 |
//!
//! HEIF containers can hold an alpha plane, but this converter always
//! flattens HEIC output to opaque RGB. The table encodes that policy rather
//! than the container's limits.
//!
//! Everything here is `'static` and side-effect free, so components take
//! `&'static FormatSpec` instead of consulting shared state.

use image::{ColorType, DynamicImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported format '{0}': use 'heic', 'png', or 'jpg'")]
pub struct UnsupportedFormatError(pub String);

/// One of the three supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Heic,
    Png,
    Jpg,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Heic, Format::Png, Format::Jpg];

    /// Capability entry for this format.
    pub fn spec(self) -> &'static FormatSpec {
        match self {
            Format::Heic => &HEIC,
            Format::Png => &PNG,
            Format::Jpg => &JPG,
        }
    }

    /// Lowercase canonical name, as used in config files.
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Extension written for output files of this format.
    pub fn primary_extension(self) -> &'static str {
        self.spec().file_extensions[0]
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name().to_ascii_uppercase())
    }
}

impl FromStr for Format {
    type Err = UnsupportedFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heic" | "heif" => Ok(Format::Heic),
            "png" => Ok(Format::Png),
            "jpg" | "jpeg" => Ok(Format::Jpg),
            _ => Err(UnsupportedFormatError(s.to_string())),
        }
    }
}

/// Look up the capabilities of a format by name.
///
/// Fails for anything outside heic/png/jpg (and their aliases heif/jpeg).
pub fn capabilities_of(name: &str) -> Result<&'static FormatSpec, UnsupportedFormatError> {
    name.parse::<Format>().map(Format::spec)
}

/// Pixel representation of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    Grayscale,
    GrayscaleAlpha,
    Rgb,
    Rgba,
    /// Indexed color. The `image` crate expands palettes while decoding.
    Palette,
    /// Four-channel print color. Expanded to RGB while decoding.
    Cmyk,
}

impl ColorMode {
    /// Derive the color mode of a decoded image.
    pub fn of(image: &DynamicImage) -> Self {
        Self::from_color_type(image.color())
    }

    pub fn from_color_type(color: ColorType) -> Self {
        match (color.channel_count(), color.has_alpha()) {
            (1, _) => ColorMode::Grayscale,
            (2, _) => ColorMode::GrayscaleAlpha,
            (_, true) => ColorMode::Rgba,
            _ => ColorMode::Rgb,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, ColorMode::GrayscaleAlpha | ColorMode::Rgba)
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColorMode::Grayscale => "grayscale",
            ColorMode::GrayscaleAlpha => "grayscale+alpha",
            ColorMode::Rgb => "RGB",
            ColorMode::Rgba => "RGB+alpha",
            ColorMode::Palette => "palette",
            ColorMode::Cmyk => "CMYK",
        };
        f.write_str(s)
    }
}

/// Bits stored per channel for the image's current buffer.
pub fn bits_per_channel(image: &DynamicImage) -> u16 {
    let color = image.color();
    color.bits_per_pixel() / u16::from(color.channel_count().max(1))
}

/// Static capabilities of one output format.
#[derive(Debug, PartialEq, Eq)]
pub struct FormatSpec {
    pub format: Format,
    pub name: &'static str,
    pub supports_alpha: bool,
    pub allowed_color_modes: &'static [ColorMode],
    /// Recognized extensions, lowercase, without the dot. The first one is
    /// used for output files.
    pub file_extensions: &'static [&'static str],
    pub max_bits_per_channel: u16,
}

impl FormatSpec {
    pub fn allows(&self, mode: ColorMode) -> bool {
        self.allowed_color_modes.contains(&mode)
    }

    /// Whether an image in `mode` at `bits` per channel can go straight to
    /// this format's encoder.
    pub fn accepts(&self, mode: ColorMode, bits: u16) -> bool {
        self.allows(mode)
            && (self.supports_alpha || !mode.has_alpha())
            && bits <= self.max_bits_per_channel
    }

    pub fn matches_extension(&self, path: &Path) -> bool {
        has_extension(path, self.file_extensions)
    }
}

/// Case-insensitive extension check against a list of dot-less extensions.
pub fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.as_ref().eq_ignore_ascii_case(ext)))
}

static JPG: FormatSpec = FormatSpec {
    format: Format::Jpg,
    name: "jpg",
    supports_alpha: false,
    allowed_color_modes: &[ColorMode::Rgb],
    file_extensions: &["jpg", "jpeg"],
    max_bits_per_channel: 8,
};

static PNG: FormatSpec = FormatSpec {
    format: Format::Png,
    name: "png",
    supports_alpha: true,
    allowed_color_modes: &[
        ColorMode::Grayscale,
        ColorMode::GrayscaleAlpha,
        ColorMode::Rgb,
        ColorMode::Rgba,
        ColorMode::Palette,
    ],
    file_extensions: &["png"],
    max_bits_per_channel: 16,
};

static HEIC: FormatSpec = FormatSpec {
    format: Format::Heic,
    name: "heic",
    supports_alpha: false,
    allowed_color_modes: &[ColorMode::Rgb],
    file_extensions: &["heic", "heif"],
    max_bits_per_channel: 8,
};
