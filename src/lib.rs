//! # imgconv
//!
//! Batch image converter between HEIC/HEIF, PNG and JPG. Every matching file
//! in an input directory is decoded, normalized for the target format, and
//! written to an output directory under the same stem with the target
//! extension.
//!
//! ```text
//! file_in/*.heic ──decode──▶ normalize ──▶ resolve params ──encode──▶ file_out/*.jpg
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`formats`] | Supported formats and their capability table (alpha, color modes, bit depth, extensions) |
//! | [`imaging`] | Normalization, save-parameter policy, and the codec trait with its production backend |
//! | [`convert`] | Batch driver: directory enumeration, output clearing, per-file failure isolation |
//! | [`config`] | `imgconv.toml` loading, merging with CLI overrides, validation |
//! | [`output`] | CLI output formatting for progress, summaries, `check` and `formats` |
//!
//! # Design Decisions
//!
//! ## One Capability Table
//!
//! Everything format-specific (whether alpha survives, which color modes an
//! encoder accepts, extensions) is read from a single static table in
//! [`formats`]. Normalization and policy consult it instead of matching on
//! format names, so adding a rule means editing one row.
//!
//! ## Transparency Is Flattened, Not Dropped
//!
//! JPG and HEIC output never carry alpha. Transparent pixels are composited
//! onto the configured background color rather than having the channel
//! stripped, which would expose whatever color data sat under fully
//! transparent pixels.
//!
//! ## HEIC Through libheif
//!
//! JPG and PNG go through the pure-Rust `image` crate. HEIC goes through the
//! system `libheif`, enabled by the default `heic` cargo feature. Building
//! with `--no-default-features` gives a pure-Rust binary that reports HEIC as
//! unavailable and refuses HEIC runs up front.
//!
//! ## Failure Isolation
//!
//! A bad file never stops a batch. Per-file problems become failure entries
//! in the [`convert::RunReport`]; only directory-level problems abort.

pub mod config;
pub mod convert;
pub mod formats;
pub mod imaging;
pub mod output;

#[cfg(test)]
pub(crate) mod test_helpers;
