//! Production codec backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode JPG, PNG | `image::ImageReader` with content sniffing |
//! | Encode JPG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode PNG | `image::codecs::png::PngEncoder` (`Best` compression when optimizing) |
//! | Decode/encode HEIC | `libheif-rs` (HEVC), behind the default `heic` cargo feature |
//!
//! JPG and PNG are pure Rust. HEIC needs the system libheif; in a
//! `--no-default-features` build [`RustCodec::supports`] reports HEIC as
//! unavailable and the batch driver refuses to start instead of failing every
//! file.

use super::backend::{CodecError, ImageCodec};
use super::params::SaveParams;
use crate::formats::{ColorMode, Format, bits_per_channel};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Codec using the `image` crate, plus libheif when compiled in.
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject images the normalizer should never have let through.
fn check_encodable(image: &DynamicImage, format: Format) -> Result<(), CodecError> {
    let mode = ColorMode::of(image);
    let bits = bits_per_channel(image);
    if format.spec().accepts(mode, bits) {
        Ok(())
    } else {
        Err(CodecError::Encode(format!(
            "{mode} at {bits} bits per channel cannot be written as {format}"
        )))
    }
}

fn load_image(path: &Path) -> Result<DynamicImage, CodecError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| CodecError::Decode(format!("{}: {}", path.display(), e)))
}

fn create_writer(path: &Path) -> Result<BufWriter<File>, CodecError> {
    Ok(BufWriter::new(File::create(path)?))
}

fn save_jpeg(image: &DynamicImage, path: &Path, quality: u8) -> Result<(), CodecError> {
    let mut writer = create_writer(path)?;
    image
        .write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))
        .map_err(|e| CodecError::Encode(format!("JPG encode failed: {e}")))?;
    writer.flush()?;
    Ok(())
}

fn save_png(image: &DynamicImage, path: &Path, optimize: bool) -> Result<(), CodecError> {
    let compression = if optimize {
        CompressionType::Best
    } else {
        CompressionType::Default
    };
    let mut writer = create_writer(path)?;
    image
        .write_with_encoder(PngEncoder::new_with_quality(
            &mut writer,
            compression,
            FilterType::Adaptive,
        ))
        .map_err(|e| CodecError::Encode(format!("PNG encode failed: {e}")))?;
    writer.flush()?;
    Ok(())
}

impl ImageCodec for RustCodec {
    fn supports(&self, format: Format) -> bool {
        match format {
            Format::Jpg => {
                ImageFormat::Jpeg.reading_enabled() && ImageFormat::Jpeg.writing_enabled()
            }
            Format::Png => ImageFormat::Png.reading_enabled() && ImageFormat::Png.writing_enabled(),
            Format::Heic => cfg!(feature = "heic"),
        }
    }

    fn decode(&self, path: &Path, format: Format) -> Result<DynamicImage, CodecError> {
        match format {
            Format::Jpg | Format::Png => load_image(path),
            Format::Heic => heic::decode(path),
        }
    }

    fn encode(
        &self,
        image: &DynamicImage,
        params: &SaveParams,
        path: &Path,
    ) -> Result<(), CodecError> {
        check_encodable(image, params.format())?;
        match *params {
            SaveParams::Jpg { quality } => save_jpeg(image, path, quality.value()),
            SaveParams::Png { optimize, .. } => save_png(image, path, optimize),
            SaveParams::Heic { quality, lossless } => {
                heic::encode(image, path, quality.value(), lossless)
            }
        }
    }
}

#[cfg(feature = "heic")]
mod heic {
    //! HEIC through libheif. Decodes to interleaved 8-bit RGB(A) and encodes
    //! 8-bit RGB with the HEVC encoder.

    use super::CodecError;
    use image::{DynamicImage, RgbImage, RgbaImage};
    use libheif_rs::{
        Channel, ColorSpace, CompressionFormat, EncoderQuality, HeifContext, Image, LibHeif,
        RgbChroma,
    };
    use std::path::Path;

    fn path_str(path: &Path) -> Result<&str, CodecError> {
        path.to_str().ok_or_else(|| {
            CodecError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("non UTF-8 path: {}", path.display()),
            ))
        })
    }

    /// Copy `height` rows of `row_len` bytes out of a strided plane.
    fn unstride(data: &[u8], stride: usize, row_len: usize, height: usize) -> Vec<u8> {
        let mut packed = Vec::with_capacity(row_len * height);
        for row in 0..height {
            let start = row * stride;
            packed.extend_from_slice(&data[start..start + row_len]);
        }
        packed
    }

    pub(super) fn decode(path: &Path) -> Result<DynamicImage, CodecError> {
        let decode_err = |e: libheif_rs::HeifError| {
            CodecError::Decode(format!("{}: {}", path.display(), e))
        };
        let lib_heif = LibHeif::new();
        let ctx = HeifContext::read_from_file(path_str(path)?).map_err(decode_err)?;
        let handle = ctx.primary_image_handle().map_err(decode_err)?;
        let has_alpha = handle.has_alpha_channel();
        let chroma = if has_alpha {
            RgbChroma::Rgba
        } else {
            RgbChroma::Rgb
        };
        let decoded = lib_heif
            .decode(&handle, ColorSpace::Rgb(chroma), None)
            .map_err(decode_err)?;

        let planes = decoded.planes();
        let plane = planes
            .interleaved
            .ok_or_else(|| CodecError::Decode(format!("{}: no interleaved plane", path.display())))?;
        let (width, height) = (plane.width, plane.height);
        let channels = if has_alpha { 4 } else { 3 };
        let pixels = unstride(
            plane.data,
            plane.stride,
            width as usize * channels,
            height as usize,
        );

        let image = if has_alpha {
            RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8)
        } else {
            RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
        };
        image.ok_or_else(|| {
            CodecError::Decode(format!("{}: decoded buffer size mismatch", path.display()))
        })
    }

    pub(super) fn encode(
        image: &DynamicImage,
        path: &Path,
        quality: u8,
        lossless: bool,
    ) -> Result<(), CodecError> {
        let encode_err = |e: libheif_rs::HeifError| CodecError::Encode(format!("HEIC: {e}"));
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let row_len = width as usize * 3;

        let mut heif_image =
            Image::new(width, height, ColorSpace::Rgb(RgbChroma::Rgb)).map_err(encode_err)?;
        heif_image
            .create_plane(Channel::Interleaved, width, height, 8)
            .map_err(encode_err)?;
        {
            let planes = heif_image.planes_mut();
            let mut plane = planes
                .interleaved
                .ok_or_else(|| CodecError::Encode("HEIC: no interleaved plane".into()))?;
            let stride = plane.stride;
            for (row, src) in rgb.as_raw().chunks_exact(row_len).enumerate() {
                let start = row * stride;
                plane.data[start..start + row_len].copy_from_slice(src);
            }
        }

        let lib_heif = LibHeif::new();
        let mut encoder = lib_heif
            .encoder_for_format(CompressionFormat::Hevc)
            .map_err(encode_err)?;
        let setting = if lossless {
            EncoderQuality::LossLess
        } else {
            EncoderQuality::Lossy(quality)
        };
        encoder.set_quality(setting).map_err(encode_err)?;

        let mut ctx = HeifContext::new().map_err(encode_err)?;
        ctx.encode_image(&heif_image, &mut encoder, None)
            .map_err(encode_err)?;
        ctx.write_to_file(path_str(path)?).map_err(encode_err)
    }
}

#[cfg(not(feature = "heic"))]
mod heic {
    use super::CodecError;
    use crate::formats::Format;
    use image::DynamicImage;
    use std::path::Path;

    pub(super) fn decode(_path: &Path) -> Result<DynamicImage, CodecError> {
        Err(CodecError::Unsupported(Format::Heic))
    }

    pub(super) fn encode(
        _image: &DynamicImage,
        _path: &Path,
        _quality: u8,
        _lossless: bool,
    ) -> Result<(), CodecError> {
        Err(CodecError::Unsupported(Format::Heic))
    }
}
