//! Image conversion pipeline pieces.
//!
//! | Step | Module |
//! |---|---|
//! | **Normalize** color mode and transparency | [`normalize`] |
//! | **Decide** encoder parameters | [`policy`] |
//! | **Decode/encode** | [`ImageCodec`] + [`RustCodec`] |
//!
//! The module is split into:
//! - **Parameters**: settings and per-write encoder parameters
//! - **Normalize / Policy**: pure functions, unit testable without files
//! - **Backend**: [`ImageCodec`] trait + [`RustCodec`]

pub mod backend;
pub mod normalize;
mod params;
pub mod policy;
pub mod rust_backend;

pub use backend::{CodecError, ImageCodec};
pub use normalize::{InvalidImageError, flatten, normalize};
pub use params::{ConversionSettings, FormatExtensions, Quality, SaveParams};
pub use policy::resolve_save_params;
pub use rust_backend::RustCodec;
