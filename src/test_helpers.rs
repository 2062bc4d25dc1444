//! Shared test utilities: synthetic images and fixture directories.
//!
//! Every helper builds its input in code so tests never depend on binary
//! fixtures checked into the repository.

use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;

/// Opaque color used outside the transparent quadrant.
pub const OPAQUE_FILL: Rgba<u8> = Rgba([200, 30, 60, 255]);

/// RGBA image whose top-left quadrant is fully transparent.
pub fn quadrant_rgba(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if x < width / 2 && y < height / 2 {
            Rgba([0, 0, 0, 0])
        } else {
            OPAQUE_FILL
        }
    })
}

/// Write a gradient JPEG with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write an RGBA PNG.
pub fn create_test_png(path: &Path, img: &RgbaImage) {
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

/// List file names in a directory, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
