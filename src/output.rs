//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Convert
//!
//! ```text
//! Converting 3 HEIC file(s) to JPG
//! 001 IMG_0001.heic → IMG_0001.jpg (142 ms)
//! 002 IMG_0002.heic FAILED
//!     Decode failed: IMG_0002.heic: invalid HEIF header
//! 003 IMG_0003.heic → IMG_0003.jpg (97 ms)
//!
//! Converted 2 of 3 file(s) from HEIC to JPG in 0.4 s
//! Failed (1):
//!     IMG_0002.heic: Decode failed: IMG_0002.heic: invalid HEIF header
//! ```
//!
//! ## Check
//!
//! ```text
//! Input:  file_in (HEIC: .heic .heif)
//! Output: file_out as JPG (quality 95), cleared before each run
//! 001 IMG_0001.heic → IMG_0001.jpg
//! 002 IMG_0003.heic → IMG_0003.jpg
//! 2 file(s) would be converted
//! ```
//!
//! ## Formats
//!
//! ```text
//! Format  Alpha  Max bits  Color modes                Extensions  Available
//! HEIC    no     8         rgb                        heic heif   no
//! ...
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::convert::{ConversionResult, ConvertEvent, RunReport};
use crate::formats::Format;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Final path component, or the whole path if it has none.
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural_files(n: usize) -> String {
    format!("{} file(s)", n)
}

// ============================================================================
// Convert
// ============================================================================

/// One result line, plus an indented cause line for failures.
pub fn format_result(index: usize, result: &ConversionResult) -> Vec<String> {
    let source = file_name(&result.source_path);
    if result.is_success() {
        vec![format!(
            "{} {} \u{2192} {} ({} ms)",
            format_index(index),
            source,
            file_name(&result.dest_path),
            result.elapsed.as_millis()
        )]
    } else {
        let mut lines = vec![format!("{} {} FAILED", format_index(index), source)];
        if let Some(detail) = &result.error_detail {
            lines.push(format!("{}{}", indent(1), detail));
        }
        lines
    }
}

/// Format a progress event from the batch driver.
pub fn format_convert_event(event: &ConvertEvent) -> Vec<String> {
    match event {
        ConvertEvent::Started {
            total: 0,
            input_format,
            ..
        } => vec![format!("No {} files found in the input directory", input_format)],
        ConvertEvent::Started {
            total,
            input_format,
            output_format,
        } => vec![format!(
            "Converting {} {} file(s) to {}",
            total, input_format, output_format
        )],
        ConvertEvent::FileFinished { index, result, .. } => format_result(*index, result),
    }
}

/// Counts line, then every failure with its cause.
pub fn format_summary(report: &RunReport) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        format!(
            "Converted {} of {} from {} to {} in {:.1} s",
            report.succeeded(),
            plural_files(report.results.len()),
            report.input_format,
            report.output_format,
            report.elapsed.as_secs_f64()
        ),
    ];

    if report.failed() > 0 {
        lines.push(format!("Failed ({}):", report.failed()));
        for failure in report.failures() {
            let cause = failure.error_detail.as_deref().unwrap_or("unknown error");
            lines.push(format!(
                "{}{}: {}",
                indent(1),
                file_name(&failure.source_path),
                cause
            ));
        }
    }
    lines
}

pub fn print_summary(report: &RunReport) {
    for line in format_summary(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// What a `convert` run would do with the current configuration.
#[derive(Debug, Clone)]
pub struct CheckSummary<'a> {
    pub input_dir: &'a Path,
    pub output_dir: &'a Path,
    pub input_format: Format,
    pub output_format: Format,
    pub input_extensions: &'a [String],
    pub params: String,
    pub clear_output: bool,
    pub codec_ready: bool,
    /// `(source, destination)` pairs in processing order.
    pub pairs: &'a [(std::path::PathBuf, std::path::PathBuf)],
}

pub fn format_check_output(check: &CheckSummary) -> Vec<String> {
    let exts: Vec<String> = check
        .input_extensions
        .iter()
        .map(|e| format!(".{}", e))
        .collect();
    let mut lines = vec![
        format!(
            "Input:  {} ({}: {})",
            check.input_dir.display(),
            check.input_format,
            exts.join(" ")
        ),
        format!(
            "Output: {} as {} ({}), {}",
            check.output_dir.display(),
            check.output_format,
            check.params,
            if check.clear_output {
                "cleared before each run"
            } else {
                "existing files kept"
            }
        ),
    ];

    if !check.codec_ready {
        lines.push(format!(
            "Warning: this build cannot convert {} to {}",
            check.input_format, check.output_format
        ));
    }

    for (i, (source, dest)) in check.pairs.iter().enumerate() {
        lines.push(format!(
            "{} {} \u{2192} {}",
            format_index(i + 1),
            file_name(source),
            file_name(dest)
        ));
    }
    lines.push(format!("{} would be converted", plural_files(check.pairs.len())));
    lines
}

pub fn print_check_output(check: &CheckSummary) {
    for line in format_check_output(check) {
        println!("{}", line);
    }
}

// ============================================================================
// Formats
// ============================================================================

/// Capability table, one row per format. `available` says whether the
/// running build can read and write the format.
pub fn format_capability_table(available: impl Fn(Format) -> bool) -> Vec<String> {
    let header = ["Format", "Alpha", "Max bits", "Color modes", "Extensions", "Available"];
    let mut rows: Vec<[String; 6]> = vec![header.map(String::from)];
    for format in Format::ALL {
        let spec = format.spec();
        let modes: Vec<String> = spec
            .allowed_color_modes
            .iter()
            .map(|m| m.to_string())
            .collect();
        let yes_no = |b: bool| if b { "yes" } else { "no" }.to_string();
        rows.push([
            format.to_string(),
            yes_no(spec.supports_alpha),
            spec.max_bits_per_channel.to_string(),
            modes.join(" "),
            spec.file_extensions.join(" "),
            yes_no(available(format)),
        ]);
    }

    let mut widths = [0usize; 6];
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    rows.iter()
        .map(|row| {
            let cells: Vec<String> = row
                .iter()
                .zip(widths)
                .map(|(cell, w)| format!("{:<w$}", cell, w = w))
                .collect();
            cells.join("  ").trim_end().to_string()
        })
        .collect()
}

pub fn print_capability_table(available: impl Fn(Format) -> bool) {
    for line in format_capability_table(available) {
        println!("{}", line);
    }
}
