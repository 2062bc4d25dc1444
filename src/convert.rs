//! Batch conversion driver.
//!
//! Converts every matching file in an input directory into an output
//! directory, one file at a time:
//!
//! ```text
//! file_in/IMG_0001.HEIC ──decode──▶ normalize ──▶ resolve params ──encode──▶ file_out/IMG_0001.jpg
//! ```
//!
//! ## Failure isolation
//!
//! Only directory-level problems abort a run ([`RunError`]): a missing input
//! directory, an output directory that cannot be created or cleared, or a
//! format the codec was not built with. Anything that goes wrong with a single
//! file (corrupt input, degenerate image, encoder rejection, write failure)
//! becomes a [`ConversionStatus::Failure`] entry and the batch moves on.
//!
//! ## Output directory
//!
//! With `clear_output` the output directory is emptied exactly once, before
//! the first file is touched. The clear is refused if it would delete the
//! input directory. Each file is encoded to a hidden `.partial` sibling and
//! renamed into place, so an interrupted run never leaves a truncated image
//! under its final name.
//!
//! ## Progress
//!
//! Callers may pass an `mpsc::Sender<ConvertEvent>`; one event is sent when
//! the file list is known and one per finished file. Each file is also logged
//! through `tracing`.

use crate::formats::{ColorMode, Format, has_extension};
use crate::imaging::{
    CodecError, ConversionSettings, ImageCodec, InvalidImageError, RustCodec, SaveParams,
    normalize, resolve_save_params,
};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Conditions that stop a run before any file is converted.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Input directory '{0}' does not exist")]
    InputDirMissing(PathBuf),
    #[error("Cannot read input directory '{path}': {source}")]
    InputDir { path: PathBuf, source: io::Error },
    #[error("Cannot prepare output directory '{path}': {source}")]
    OutputDir { path: PathBuf, source: io::Error },
    #[error("Refusing to clear '{output}': it contains the input directory '{input}'")]
    ClearWouldRemoveInput { input: PathBuf, output: PathBuf },
    #[error("{0} support is not available in this build (it was built without the `heic` feature)")]
    CodecUnavailable(Format),
}

/// Why a single file failed. Recorded in its [`ConversionResult`], never
/// propagated out of the batch.
#[derive(Error, Debug)]
pub enum FileError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    InvalidImage(#[from] InvalidImageError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("{} was already written by an earlier file in this run", .0.display())]
    DuplicateOutput(PathBuf),
    #[error("output would overwrite the source file")]
    OverwritesSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    Success,
    Failure,
}

/// Outcome of converting one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionResult {
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub status: ConversionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        self.status == ConversionStatus::Success
    }
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// All results of a run, in processing order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input_format: Format,
    pub output_format: Format,
    pub results: Vec<ConversionResult>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(|r| !r.is_success())
    }
}

/// Progress notifications for the CLI.
#[derive(Debug, Clone)]
pub enum ConvertEvent {
    /// Input files are enumerated; conversion is about to start.
    Started {
        total: usize,
        input_format: Format,
        output_format: Format,
    },
    /// One file is done. `index` is 1-based.
    FileFinished {
        index: usize,
        total: usize,
        result: ConversionResult,
    },
}

/// Convert with the production codec.
pub fn run(
    input_dir: &Path,
    output_dir: &Path,
    input_format: Format,
    output_format: Format,
    settings: &ConversionSettings,
    events: Option<Sender<ConvertEvent>>,
) -> Result<RunReport, RunError> {
    run_with_codec(
        &RustCodec::new(),
        input_dir,
        output_dir,
        input_format,
        output_format,
        settings,
        events,
    )
}

/// Convert using a specific codec (allows testing with mock).
pub fn run_with_codec(
    codec: &impl ImageCodec,
    input_dir: &Path,
    output_dir: &Path,
    input_format: Format,
    output_format: Format,
    settings: &ConversionSettings,
    events: Option<Sender<ConvertEvent>>,
) -> Result<RunReport, RunError> {
    let started = Instant::now();

    if !input_dir.is_dir() {
        return Err(RunError::InputDirMissing(input_dir.to_path_buf()));
    }
    for format in [input_format, output_format] {
        if !codec.supports(format) {
            return Err(RunError::CodecUnavailable(format));
        }
    }

    prepare_output_dir(input_dir, output_dir, settings.clear_output)?;

    let pairs = plan(input_dir, output_dir, input_format, output_format, settings)?;
    let total = pairs.len();

    info!(
        total,
        input = %input_format,
        output = %output_format,
        input_dir = %input_dir.display(),
        output_dir = %output_dir.display(),
        "starting conversion"
    );
    emit(
        events.as_ref(),
        ConvertEvent::Started {
            total,
            input_format,
            output_format,
        },
    );

    let mut written = HashSet::new();
    let mut results = Vec::with_capacity(total);

    for (i, (source, dest)) in pairs.into_iter().enumerate() {
        let file_started = Instant::now();

        let outcome = if written.contains(&collision_key(&dest)) {
            Err(FileError::DuplicateOutput(dest.clone()))
        } else {
            convert_file(codec, &source, &dest, input_format, output_format, settings)
        };

        let elapsed = file_started.elapsed();
        let result = match outcome {
            Ok(params) => {
                info!(
                    source = %source.display(),
                    dest = %dest.display(),
                    params = %params.describe(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "converted"
                );
                written.insert(collision_key(&dest));
                ConversionResult {
                    source_path: source,
                    dest_path: dest,
                    status: ConversionStatus::Success,
                    error_detail: None,
                    elapsed,
                }
            }
            Err(e) => {
                warn!(
                    source = %source.display(),
                    error = %e,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "conversion failed"
                );
                ConversionResult {
                    source_path: source,
                    dest_path: dest,
                    status: ConversionStatus::Failure,
                    error_detail: Some(e.to_string()),
                    elapsed,
                }
            }
        };

        emit(
            events.as_ref(),
            ConvertEvent::FileFinished {
                index: i + 1,
                total,
                result: result.clone(),
            },
        );
        results.push(result);
    }

    let report = RunReport {
        input_format,
        output_format,
        results,
        elapsed: started.elapsed(),
    };
    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "conversion complete"
    );
    Ok(report)
}

fn emit(events: Option<&Sender<ConvertEvent>>, event: ConvertEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is watching progress.
        let _ = tx.send(event);
    }
}

/// Regular files directly inside `dir` whose extension is in `extensions`
/// (case-insensitive), sorted by file name.
pub fn find_input_files(dir: &Path, extensions: &[String]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, extensions) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// The `(source, destination)` pairs a run would process, in order.
pub fn plan(
    input_dir: &Path,
    output_dir: &Path,
    input_format: Format,
    output_format: Format,
    settings: &ConversionSettings,
) -> Result<Vec<(PathBuf, PathBuf)>, RunError> {
    if !input_dir.is_dir() {
        return Err(RunError::InputDirMissing(input_dir.to_path_buf()));
    }
    let extensions = settings.extensions.for_format(input_format);
    let sources = find_input_files(input_dir, extensions).map_err(|source| RunError::InputDir {
        path: input_dir.to_path_buf(),
        source,
    })?;
    Ok(sources
        .into_iter()
        .map(|source| {
            let dest = output_path_for(&source, output_dir, output_format);
            (source, dest)
        })
        .collect())
}

/// `<output_dir>/<source stem>.<target extension>`.
pub fn output_path_for(source: &Path, output_dir: &Path, target: Format) -> PathBuf {
    let stem = source.file_stem().unwrap_or(source.as_os_str());
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(target.primary_extension());
    output_dir.join(name)
}

/// Create `output_dir`, emptying it first when `clear` is set.
fn prepare_output_dir(input_dir: &Path, output_dir: &Path, clear: bool) -> Result<(), RunError> {
    let output_err = |source| RunError::OutputDir {
        path: output_dir.to_path_buf(),
        source,
    };

    if clear && output_dir.exists() {
        let input = input_dir.canonicalize().map_err(|source| RunError::InputDir {
            path: input_dir.to_path_buf(),
            source,
        })?;
        let output = output_dir.canonicalize().map_err(output_err)?;
        if input.starts_with(&output) {
            return Err(RunError::ClearWouldRemoveInput {
                input: input_dir.to_path_buf(),
                output: output_dir.to_path_buf(),
            });
        }
        clear_dir(&output).map_err(output_err)?;
        info!(output_dir = %output_dir.display(), "output directory cleared");
    }

    std::fs::create_dir_all(output_dir).map_err(output_err)
}

/// Remove every entry inside `dir`, leaving `dir` itself in place.
fn clear_dir(dir: &Path) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(entry.path())?;
        } else {
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Destinations that would land on the same file on a case-insensitive
/// volume share a key. All destinations live in one directory, so the file
/// name is enough.
fn collision_key(dest: &Path) -> String {
    dest.file_name()
        .unwrap_or(dest.as_os_str())
        .to_string_lossy()
        .to_lowercase()
}

/// Hidden sibling the encoder writes to before the final rename.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(dest.file_name().unwrap_or_default());
    name.push(".partial");
    dest.with_file_name(name)
}

fn convert_file(
    codec: &impl ImageCodec,
    source: &Path,
    dest: &Path,
    input_format: Format,
    output_format: Format,
    settings: &ConversionSettings,
) -> Result<SaveParams, FileError> {
    if is_same_file(source, dest) {
        return Err(FileError::OverwritesSource);
    }

    let decoded = codec.decode(source, input_format)?;
    let source_mode = ColorMode::of(&decoded);
    let image = normalize(decoded, output_format, settings)?;
    let mode = ColorMode::of(&image);
    let params = resolve_save_params(output_format, settings, mode.has_alpha());
    debug!(
        source = %source.display(),
        width = image.width(),
        height = image.height(),
        from_mode = %source_mode,
        to_mode = %mode,
        "normalized"
    );

    let partial = partial_path(dest);
    if let Err(e) = codec.encode(&image, &params, &partial) {
        let _ = std::fs::remove_file(&partial);
        return Err(e.into());
    }
    if let Err(e) = std::fs::rename(&partial, dest) {
        let _ = std::fs::remove_file(&partial);
        return Err(e.into());
    }
    Ok(params)
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
