//! Parameter types for conversion.
//!
//! These structs describe *what* to do, not *how*. They sit between the
//! [`policy`](super::policy) (which decides the encoder settings for a target
//! format) and the [`backend`](super::backend) (which does the pixel work),
//! so a mock codec can record exactly what the policy asked for.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1–100, default 95). Clamped on construction.
//! - [`ConversionSettings`]: run-wide settings resolved from the config file.
//! - [`FormatExtensions`]: which file extensions select each input format.
//! - [`SaveParams`]: per-format encoder parameters for a single write.

use crate::formats::Format;
use image::Rgb;
use serde::Serialize;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

/// Extensions (lowercase, no dot) that select input files for each format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatExtensions {
    pub heic: Vec<String>,
    pub png: Vec<String>,
    pub jpg: Vec<String>,
}

impl FormatExtensions {
    pub fn for_format(&self, format: Format) -> &[String] {
        match format {
            Format::Heic => &self.heic,
            Format::Png => &self.png,
            Format::Jpg => &self.jpg,
        }
    }
}

impl Default for FormatExtensions {
    fn default() -> Self {
        let owned = |f: Format| {
            f.spec()
                .file_extensions
                .iter()
                .map(|e| e.to_string())
                .collect()
        };
        Self {
            heic: owned(Format::Heic),
            png: owned(Format::Png),
            jpg: owned(Format::Jpg),
        }
    }
}

/// Settings for one conversion run. Built once from config, then passed by
/// reference into every component call.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSettings {
    /// JPG quality.
    pub target_quality: Quality,
    pub png_optimize: bool,
    pub heic_quality: Quality,
    pub heic_lossless: bool,
    /// Canvas color used when flattening transparency.
    pub background_color: Rgb<u8>,
    pub clear_output: bool,
    pub show_progress: bool,
    pub extensions: FormatExtensions,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            target_quality: Quality::default(),
            png_optimize: true,
            heic_quality: Quality::default(),
            heic_lossless: false,
            background_color: Rgb([255, 255, 255]),
            clear_output: true,
            show_progress: true,
            extensions: FormatExtensions::default(),
        }
    }
}

/// Encoder parameters for a single write, one variant per target format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum SaveParams {
    Jpg {
        quality: Quality,
    },
    Png {
        /// Maximum compression effort.
        optimize: bool,
        preserve_alpha: bool,
    },
    Heic {
        /// Nominal quality; the encoder ignores it when `lossless` is set.
        quality: Quality,
        lossless: bool,
    },
}

impl SaveParams {
    pub fn format(&self) -> Format {
        match self {
            SaveParams::Jpg { .. } => Format::Jpg,
            SaveParams::Png { .. } => Format::Png,
            SaveParams::Heic { .. } => Format::Heic,
        }
    }

    /// Whether the written file keeps an alpha channel.
    pub fn keeps_alpha(&self) -> bool {
        matches!(
            self,
            SaveParams::Png {
                preserve_alpha: true,
                ..
            }
        )
    }

    /// Short human-readable summary, e.g. `quality 95` or `lossless`.
    pub fn describe(&self) -> String {
        match self {
            SaveParams::Jpg { quality } => format!("quality {}", quality.value()),
            SaveParams::Png { optimize, .. } => {
                if *optimize {
                    "optimized".to_string()
                } else {
                    "default compression".to_string()
                }
            }
            SaveParams::Heic {
                quality,
                lossless: true,
            } => format!("lossless (nominal quality {})", quality.value()),
            SaveParams::Heic { quality, .. } => format!("quality {}", quality.value()),
        }
    }
}
