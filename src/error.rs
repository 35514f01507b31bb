//! Error types for the docs2md library.
//!
//! Only [`ConvertError::InputNotDirectory`] and [`ConvertError::InputNotFile`]
//! ever escape a batch run. Every other variant describes a single document
//! that could not be converted and is recorded in the
//! [`ConversionReport`](crate::batch::ConversionReport) instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Configuration errors ────────────────────────────────────────────
    #[error("input folder does not exist or is not a directory: {path}")]
    InputNotDirectory { path: PathBuf },

    #[error("input file does not exist or is not a file: {path}")]
    InputNotFile { path: PathBuf },

    #[error("{path} is not inside {root}")]
    NotUnderRoot { path: PathBuf, root: PathBuf },

    // ── Document errors ─────────────────────────────────────────────────
    #[error("failed to open DOCX {path}: {detail}")]
    OpenDocument { path: PathBuf, detail: String },

    #[error("failed to parse DOCX content: {detail}")]
    ParseDocument { detail: String },

    #[error("failed to normalize HTML: {detail}")]
    Html { detail: String },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Legacy .doc conversion ──────────────────────────────────────────
    #[error("LibreOffice 'soffice' not found on PATH; cannot convert .doc")]
    OfficeNotFound,

    #[error("LibreOffice conversion failed: {detail}")]
    OfficeFailed { detail: String },

    #[error("LibreOffice did not produce expected .docx output: {expected}")]
    OfficeOutputMissing { expected: PathBuf },
}

impl ConvertError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors that abort a whole run rather than a single file.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InputNotDirectory { .. } | Self::InputNotFile { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
