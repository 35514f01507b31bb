//! Folder-level conversion: discover, mirror, convert, report.
//!
//! Files are processed one at a time in discovery order. A failing document
//! is recorded in the [`ConversionReport`] and the run moves on; only a bad
//! input path aborts the run before any file is touched.
//!
//! Cancellation is cooperative: the token is checked between files, so the
//! document in flight always finishes (or fails) first.
//!
//! The check for an existing destination and the later write are not atomic.
//! Another process creating the file in between will have it overwritten.

use crate::cleanup;
use crate::converter;
use crate::discover::{self, DocFormat};
use crate::error::{ConvertError, Result};
use crate::legacy;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Folder name for LibreOffice output, under the output root.
pub const SCRATCH_DIR_NAME: &str = ".__tmp_doc_conversion__";

/// Options for a conversion run.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub recursive: bool,
    /// Also convert `.doc` files through LibreOffice.
    pub include_legacy: bool,
    pub overwrite: bool,
    /// LibreOffice executable; searched on `PATH` when unset.
    pub office_executable: Option<PathBuf>,
}

/// A document that could not be converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub source: PathBuf,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source.display(), self.message)
    }
}

/// Outcome of a run. Counts only cover files reached before cancellation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionReport {
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<Failure>,
}

impl ConversionReport {
    /// Number of files that were evaluated.
    pub fn processed(&self) -> usize {
        self.converted + self.skipped + self.failed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Shared flag for stopping a run from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Called before each file with `(index, total, path)`, and once at the end
/// with `(total, total, "")`.
pub type ProgressFn<'a> = dyn FnMut(usize, usize, &Path) + 'a;

/// Convert every document under `options.input_dir`.
pub fn run_batch(options: &BatchOptions) -> Result<ConversionReport> {
    run_batch_with_progress(options, &mut |_, _, _| {}, &CancellationToken::new())
}

/// [`run_batch`] with progress notifications and cancellation.
pub fn run_batch_with_progress(
    options: &BatchOptions,
    on_progress: &mut ProgressFn<'_>,
    cancel: &CancellationToken,
) -> Result<ConversionReport> {
    if !options.input_dir.is_dir() {
        return Err(ConvertError::InputNotDirectory {
            path: options.input_dir.clone(),
        });
    }

    let input_root = absolute(&options.input_dir)?;
    let output_root = absolute(&options.output_dir)?;

    let _span = tracing::info_span!("run_batch", input = %input_root.display()).entered();

    let files = discover::discover(&input_root, options.recursive, options.include_legacy);
    tracing::info!(files = files.len(), output = %output_root.display(), "Discovered documents");

    Ok(process_files(
        &files,
        &input_root,
        &output_root,
        options,
        on_progress,
        cancel,
    ))
}

/// Convert a single document into `<output_dir>/<stem>.md`.
///
/// Follows the same skip/overwrite policy and reporting as a batch of one.
/// A file that discovery would not pick up yields an empty report.
pub fn run_file(
    input_file: &Path,
    options: &BatchOptions,
    on_progress: &mut ProgressFn<'_>,
    cancel: &CancellationToken,
) -> Result<ConversionReport> {
    if !input_file.is_file() {
        return Err(ConvertError::InputNotFile {
            path: input_file.to_path_buf(),
        });
    }

    let input_file = absolute(input_file)?;
    let output_root = absolute(&options.output_dir)?;
    let input_root = input_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let _span = tracing::info_span!("run_file", input = %input_file.display()).entered();

    let files = match discover::detect_format(&input_file) {
        Some(DocFormat::Docx) => vec![input_file.clone()],
        Some(DocFormat::Doc) if options.include_legacy => vec![input_file.clone()],
        _ => Vec::new(),
    };

    Ok(process_files(
        &files,
        &input_root,
        &output_root,
        options,
        on_progress,
        cancel,
    ))
}

fn process_files(
    files: &[PathBuf],
    input_root: &Path,
    output_root: &Path,
    options: &BatchOptions,
    on_progress: &mut ProgressFn<'_>,
    cancel: &CancellationToken,
) -> ConversionReport {
    let scratch = ScratchDir::new(output_root.join(SCRATCH_DIR_NAME));
    let total = files.len();
    let mut report = ConversionReport::default();

    for (index, src) in files.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::info!(processed = index, total, "Conversion cancelled");
            break;
        }

        on_progress(index, total, src);

        match convert_one(src, input_root, output_root, options, &scratch) {
            Ok(Outcome::Converted(dest)) => {
                tracing::info!(source = %src.display(), output = %dest.display(), "Converted document");
                report.converted += 1;
            }
            Ok(Outcome::Skipped(dest)) => {
                tracing::debug!(output = %dest.display(), "Skipping existing output");
                report.skipped += 1;
            }
            Err(e) => {
                tracing::warn!(path = %src.display(), error = %e, "Failed to convert document");
                report.failed += 1;
                report.failures.push(Failure {
                    source: src.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    on_progress(total, total, Path::new(""));

    drop(scratch);
    report
}

enum Outcome {
    Converted(PathBuf),
    Skipped(PathBuf),
}

fn convert_one(
    src: &Path,
    input_root: &Path,
    output_root: &Path,
    options: &BatchOptions,
    scratch: &ScratchDir,
) -> Result<Outcome> {
    let dest = discover::output_markdown_path(src, input_root, output_root)?;

    if dest.exists() && !options.overwrite {
        return Ok(Outcome::Skipped(dest));
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| ConvertError::io(parent, e))?;
    }

    let markdown = match discover::detect_format(src) {
        Some(DocFormat::Doc) => {
            let docx = legacy::transcode(src, scratch.path(), options.office_executable.as_deref())?;
            converter::convert_document(&docx, &dest)?
        }
        _ => converter::convert_document(src, &dest)?,
    };

    fs::write(&dest, markdown).map_err(|e| ConvertError::io(&dest, e))?;
    Ok(Outcome::Converted(dest))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| ConvertError::io(path, e))
}

/// LibreOffice scratch folder, removed (best effort) when dropped.
struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.path.exists() {
            cleanup::best_effort("remove scratch directory", || fs::remove_dir_all(&self.path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn fresh_token_lets_a_run_finish() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.docx"), b"not a zip").unwrap();
        fs::write(tmp.path().join("b.docx"), b"not a zip").unwrap();
        let options = BatchOptions {
            input_dir: tmp.path().to_path_buf(),
            output_dir: tmp.path().join("out"),
            ..Default::default()
        };

        let report =
            run_batch_with_progress(&options, &mut |_, _, _| {}, &CancellationToken::default()).unwrap();
        assert_eq!(report.processed(), 2);
    }

    #[test]
    fn failure_display_joins_path_and_message() {
        let failure = Failure {
            source: PathBuf::from("/in/bad.docx"),
            message: "failed to parse DOCX content: eof".to_string(),
        };
        assert_eq!(failure.to_string(), "/in/bad.docx: failed to parse DOCX content: eof");
    }

    #[test]
    fn scratch_dir_removed_on_drop() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(SCRATCH_DIR_NAME);
        fs::create_dir_all(path.join("nested")).unwrap();
        fs::write(path.join("nested").join("a.docx"), b"x").unwrap();

        drop(ScratchDir::new(path.clone()));
        assert!(!path.exists());

        // Never created: nothing to do
        drop(ScratchDir::new(path.clone()));
    }

    #[test]
    fn missing_input_is_a_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        let options = BatchOptions {
            input_dir: tmp.path().join("nope"),
            output_dir: tmp.path().join("out"),
            ..Default::default()
        };

        let err = run_batch(&options).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn empty_folder_reports_nothing_and_signals_completion() {
        let tmp = tempfile::tempdir().unwrap();
        let options = BatchOptions {
            input_dir: tmp.path().to_path_buf(),
            output_dir: tmp.path().join("out"),
            ..Default::default()
        };

        let mut calls = Vec::new();
        let report = run_batch_with_progress(
            &options,
            &mut |i, n, p| calls.push((i, n, p.to_path_buf())),
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(report, ConversionReport::default());
        assert_eq!(calls, vec![(0, 0, PathBuf::new())]);
    }
}
