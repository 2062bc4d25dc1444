//! Conversion policy: choose encoder parameters for a target format.
//!
//! Pure function of its inputs. The returned [`SaveParams`] never asks for
//! something the [capability table](crate::formats) rules out for the target,
//! e.g. alpha preservation on JPG.

use super::params::{ConversionSettings, SaveParams};
use crate::formats::Format;

/// Resolve the save parameters for writing `target`.
///
/// `source_has_alpha` describes the normalized image; it only matters for
/// targets that can carry alpha.
pub fn resolve_save_params(
    target: Format,
    settings: &ConversionSettings,
    source_has_alpha: bool,
) -> SaveParams {
    match target {
        Format::Jpg => SaveParams::Jpg {
            quality: settings.target_quality,
        },
        Format::Png => SaveParams::Png {
            optimize: settings.png_optimize,
            preserve_alpha: source_has_alpha && target.spec().supports_alpha,
        },
        Format::Heic => SaveParams::Heic {
            quality: settings.heic_quality,
            lossless: settings.heic_lossless,
        },
    }
}
