//! Codec backend trait and shared types.
//!
//! The [`ImageCodec`] trait is the seam between the batch driver and the
//! actual decoders/encoders. The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec); tests swap in a recording
//! mock so the driver's ordering and failure handling can be checked without
//! real files.

use super::params::SaveParams;
use crate::formats::Format;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("{0} support is not available in this build")]
    Unsupported(Format),
}

/// Trait for decode/encode backends.
pub trait ImageCodec {
    /// Whether this build can both read and write `format`.
    fn supports(&self, format: Format) -> bool;

    /// Decode the file at `path`, which is expected to hold `format`.
    fn decode(&self, path: &Path, format: Format) -> Result<DynamicImage, CodecError>;

    /// Encode `image` to `path` with the given parameters.
    ///
    /// The image must already be normalized for `params.format()`.
    fn encode(&self, image: &DynamicImage, params: &SaveParams, path: &Path)
    -> Result<(), CodecError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Mock codec that records operations instead of touching pixels.
    ///
    /// Decoding returns a small RGB image unless the file name contains
    /// `corrupt`; encoding writes a placeholder so output paths exist.
    #[derive(Default)]
    pub struct MockCodec {
        pub operations: RefCell<Vec<RecordedOp>>,
        pub unsupported: Vec<Format>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode { path: String, format: Format },
        Encode { path: String, params: SaveParams },
    }

    impl MockCodec {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn without(formats: &[Format]) -> Self {
            Self {
                unsupported: formats.to_vec(),
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.borrow().clone()
        }
    }

    impl ImageCodec for MockCodec {
        fn supports(&self, format: Format) -> bool {
            !self.unsupported.contains(&format)
        }

        fn decode(&self, path: &Path, format: Format) -> Result<DynamicImage, CodecError> {
            self.operations.borrow_mut().push(RecordedOp::Decode {
                path: path.to_string_lossy().to_string(),
                format,
            });
            let name = path.file_name().unwrap_or_default().to_string_lossy();
            if name.contains("corrupt") {
                return Err(CodecError::Decode(format!("{name}: not an image")));
            }
            if name.contains("empty") {
                return Ok(DynamicImage::new_rgb8(0, 0));
            }
            Ok(DynamicImage::new_rgba8(4, 3))
        }

        fn encode(
            &self,
            _image: &DynamicImage,
            params: &SaveParams,
            path: &Path,
        ) -> Result<(), CodecError> {
            self.operations.borrow_mut().push(RecordedOp::Encode {
                path: path.to_string_lossy().to_string(),
                params: *params,
            });
            std::fs::write(path, b"mock")?;
            Ok(())
        }
    }

    #[test]
    fn mock_records_decode_and_encode() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("a.jpg");
        let codec = MockCodec::new();

        let img = codec.decode(Path::new("/in/a.png"), Format::Png).unwrap();
        assert_eq!((img.width(), img.height()), (4, 3));

        let params = SaveParams::Jpg {
            quality: crate::imaging::Quality::new(90),
        };
        codec.encode(&img, &params, &out).unwrap();
        assert!(out.exists());

        let ops = codec.get_operations();
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], RecordedOp::Decode { path, format: Format::Png } if path == "/in/a.png"));
        assert!(matches!(&ops[1], RecordedOp::Encode { params: p, .. } if *p == params));
    }

    #[test]
    fn mock_fails_corrupt_names() {
        let codec = MockCodec::new();
        let result = codec.decode(Path::new("/in/corrupt.png"), Format::Png);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn unsupported_error_names_the_format() {
        assert_eq!(
            CodecError::Unsupported(Format::Heic).to_string(),
            "HEIC support is not available in this build"
        );
    }
}
