//! Legacy `.doc` support through LibreOffice.
//!
//! `soffice --headless --convert-to docx` writes `<stem>.docx` into a
//! scratch folder; the result is then converted like any other DOCX.
//! The call blocks until LibreOffice exits; there is no timeout.

use crate::error::{ConvertError, Result};
use std::env;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const OFFICE_EXECUTABLES: &[&str] = &["soffice", "soffice.exe"];

/// Search `PATH` for the LibreOffice command-line executable.
pub fn find_office() -> Option<PathBuf> {
    find_office_in(env::var_os("PATH")?)
}

fn find_office_in(paths: impl AsRef<OsStr>) -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;
    OFFICE_EXECUTABLES
        .iter()
        .find_map(|name| which::which_in(name, Some(paths.as_ref()), &cwd).ok())
}

/// Convert `doc` to `<scratch_dir>/<stem>.docx` and return that path.
///
/// `office` overrides the `PATH` lookup when given.
pub fn transcode(doc: &Path, scratch_dir: &Path, office: Option<&Path>) -> Result<PathBuf> {
    let soffice = match office {
        Some(path) => path.to_path_buf(),
        None => find_office().ok_or(ConvertError::OfficeNotFound)?,
    };

    fs::create_dir_all(scratch_dir).map_err(|e| ConvertError::io(scratch_dir, e))?;

    tracing::debug!(
        soffice = %soffice.display(),
        input = %doc.display(),
        "Running LibreOffice"
    );

    let output = Command::new(&soffice)
        .args([
            "--headless",
            "--nologo",
            "--nolockcheck",
            "--nodefault",
            "--norestore",
            "--convert-to",
            "docx",
            "--outdir",
        ])
        .arg(scratch_dir)
        .arg(doc)
        .output()
        .map_err(|e| ConvertError::OfficeFailed {
            detail: format!("could not run {}: {}", soffice.display(), e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        return Err(ConvertError::OfficeFailed { detail });
    }

    let stem = doc
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let produced = scratch_dir.join(format!("{}.docx", stem));

    if !produced.is_file() {
        return Err(ConvertError::OfficeOutputMissing { expected: produced });
    }

    Ok(produced)
}
