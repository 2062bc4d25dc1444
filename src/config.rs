//! Converter configuration.
//!
//! Handles loading, validating and merging `imgconv.toml`. Stock defaults are
//! the base layer; the user's file is merged on top, and command-line flags
//! are merged on top of that.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! input_dir = "file_in"
//! output_dir = "file_out"
//! input_format = "heic"     # heic | png | jpg
//! output_format = "jpg"     # heic | png | jpg
//! quality = 95              # JPG quality (1-100)
//!
//! [png]
//! background_color = [255, 255, 255]  # Fill for transparency on JPG/HEIC output
//! optimize = true
//!
//! [heic]
//! quality = 95
//! lossless = false
//!
//! [general]
//! clear_output = true       # Empty output_dir before converting
//! show_progress = true      # Print one line per file
//!
//! [extensions]
//! heic = ["heic", "heif"]
//! png = ["png"]
//! jpg = ["jpg", "jpeg"]
//! ```
//!
//! Config files are sparse: override just the values you want. Unknown keys
//! are rejected to catch typos early.

use crate::formats::{Format, UnsupportedFormatError};
use crate::imaging::{ConversionSettings, FormatExtensions, Quality};
use image::Rgb;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "imgconv.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Format(#[from] UnsupportedFormatError),
}

/// Converter configuration loaded from `imgconv.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// Directory scanned for input files (not recursive).
    pub input_dir: String,
    /// Directory converted files are written to.
    pub output_dir: String,
    pub input_format: String,
    pub output_format: String,
    /// JPG encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    pub png: PngConfig,
    pub heic: HeicConfig,
    pub general: GeneralConfig,
    pub extensions: ExtensionsConfig,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            input_dir: "file_in".to_string(),
            output_dir: "file_out".to_string(),
            input_format: "heic".to_string(),
            output_format: "jpg".to_string(),
            quality: 95,
            png: PngConfig::default(),
            heic: HeicConfig::default(),
            general: GeneralConfig::default(),
            extensions: ExtensionsConfig::default(),
        }
    }
}

/// PNG output and transparency settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PngConfig {
    /// `[r, g, b]` canvas used when flattening alpha for JPG/HEIC output.
    pub background_color: [u8; 3],
    /// Spend extra effort on PNG compression.
    pub optimize: bool,
}

impl Default for PngConfig {
    fn default() -> Self {
        Self {
            background_color: [255, 255, 255],
            optimize: true,
        }
    }
}

/// HEIC output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeicConfig {
    pub quality: u32,
    /// Lossless HEVC; `quality` is then only reported, not used.
    pub lossless: bool,
}

impl Default for HeicConfig {
    fn default() -> Self {
        Self {
            quality: 95,
            lossless: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralConfig {
    /// Delete everything in `output_dir` before converting.
    pub clear_output: bool,
    /// Print a line for every converted file.
    pub show_progress: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            clear_output: true,
            show_progress: true,
        }
    }
}

/// File extensions (without the dot) that select input files per format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtensionsConfig {
    pub heic: Vec<String>,
    pub png: Vec<String>,
    pub jpg: Vec<String>,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        let FormatExtensions { heic, png, jpg } = FormatExtensions::default();
        Self { heic, png, jpg }
    }
}

impl ConverterConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::Validation("quality must be 1-100".into()));
        }
        if !(1..=100).contains(&self.heic.quality) {
            return Err(ConfigError::Validation(
                "heic.quality must be 1-100".into(),
            ));
        }
        if self.input_dir.trim().is_empty() || self.output_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "input_dir and output_dir must not be empty".into(),
            ));
        }
        self.formats()?;
        for (name, list) in [
            ("heic", &self.extensions.heic),
            ("png", &self.extensions.png),
            ("jpg", &self.extensions.jpg),
        ] {
            if list.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "extensions.{name} must not be empty"
                )));
            }
            if let Some(bad) = list.iter().find(|e| e.is_empty() || e.starts_with('.')) {
                return Err(ConfigError::Validation(format!(
                    "extensions.{name}: '{bad}' must be a bare extension like \"{name}\""
                )));
            }
        }
        Ok(())
    }

    /// Parsed `(input_format, output_format)`.
    pub fn formats(&self) -> Result<(Format, Format), UnsupportedFormatError> {
        Ok((self.input_format.parse()?, self.output_format.parse()?))
    }

    pub fn input_path(&self) -> PathBuf {
        PathBuf::from(&self.input_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }

    /// Run-wide conversion settings derived from this config.
    pub fn settings(&self) -> ConversionSettings {
        let lower = |list: &[String]| -> Vec<String> {
            list.iter().map(|e| e.to_ascii_lowercase()).collect()
        };
        ConversionSettings {
            target_quality: Quality::new(self.quality),
            png_optimize: self.png.optimize,
            heic_quality: Quality::new(self.heic.quality),
            heic_lossless: self.heic.lossless,
            background_color: Rgb(self.png.background_color),
            clear_output: self.general.clear_output,
            show_progress: self.general.show_progress,
            extensions: FormatExtensions {
                heic: lower(&self.extensions.heic),
                png: lower(&self.extensions.png),
                jpg: lower(&self.extensions.jpg),
            },
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ConverterConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Apply each overlay in order onto `base`, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<ConverterConfig, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: ConverterConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, with command-line `overrides` applied last.
///
/// A missing file falls back to stock defaults unless `required` is set
/// (i.e. the user named the file explicitly).
pub fn load_config(
    path: &Path,
    required: bool,
    overrides: &Overrides,
) -> Result<ConverterConfig, ConfigError> {
    let file = load_raw_config(path)?;
    if file.is_none() && required {
        return Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
        });
    }
    resolve_config(
        stock_defaults_value(),
        file.into_iter().chain(Some(overrides.to_toml())),
    )
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub input_format: Option<String>,
    pub output_format: Option<String>,
    pub quality: Option<u32>,
    pub keep_output: bool,
}

impl Overrides {
    /// Sparse TOML table holding only the values that were given.
    pub fn to_toml(&self) -> toml::Value {
        let mut table = toml::map::Map::new();
        let path_str = |p: &PathBuf| toml::Value::String(p.to_string_lossy().into_owned());
        if let Some(dir) = &self.input_dir {
            table.insert("input_dir".into(), path_str(dir));
        }
        if let Some(dir) = &self.output_dir {
            table.insert("output_dir".into(), path_str(dir));
        }
        if let Some(f) = &self.input_format {
            table.insert("input_format".into(), toml::Value::String(f.clone()));
        }
        if let Some(f) = &self.output_format {
            table.insert("output_format".into(), toml::Value::String(f.clone()));
        }
        if let Some(q) = self.quality {
            table.insert("quality".into(), toml::Value::Integer(i64::from(q)));
        }
        if self.keep_output {
            let mut general = toml::map::Map::new();
            general.insert("clear_output".into(), toml::Value::Boolean(false));
            table.insert("general".into(), toml::Value::Table(general));
        }
        toml::Value::Table(table)
    }
}

/// Returns a fully-commented stock `imgconv.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgconv configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Directory scanned for input files (top level only).
input_dir = "file_in"

# Directory converted files are written to. Created if missing.
output_dir = "file_out"

# Formats: "heic", "png" or "jpg" ("heif" and "jpeg" are accepted aliases).
input_format = "heic"
output_format = "jpg"

# JPG encoding quality (1 = worst, 100 = best).
quality = 95

# ---------------------------------------------------------------------------
# PNG output and transparency
# ---------------------------------------------------------------------------
[png]
# JPG and HEIC output cannot hold transparency. Transparent pixels are
# composited onto this [r, g, b] color.
background_color = [255, 255, 255]

# Spend extra effort on PNG compression (slower, smaller files).
optimize = true

# ---------------------------------------------------------------------------
# HEIC output (requires a build with the `heic` feature)
# ---------------------------------------------------------------------------
[heic]
quality = 95

# Lossless HEVC. When true, quality above is ignored by the encoder.
lossless = false

# ---------------------------------------------------------------------------
# General
# ---------------------------------------------------------------------------
[general]
# Delete everything in output_dir before converting.
clear_output = true

# Print one line for every converted file.
show_progress = true

# ---------------------------------------------------------------------------
# Input file extensions per format (case-insensitive, without the dot)
# ---------------------------------------------------------------------------
[extensions]
heic = ["heic", "heif"]
png = ["png"]
jpg = ["jpg", "jpeg"]
"##
}
