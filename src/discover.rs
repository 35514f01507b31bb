use crate::error::{ConvertError, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Input document format, from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocFormat {
    Docx,
    /// Binary Word format; needs LibreOffice.
    Doc,
}

pub fn detect_format(path: &Path) -> Option<DocFormat> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "docx" => Some(DocFormat::Docx),
        "doc" => Some(DocFormat::Doc),
        _ => None,
    }
}

/// List the documents under `root`, sorted case-insensitively by path.
///
/// Only `.docx` files are returned unless `include_legacy` adds `.doc`.
/// Unreadable entries are skipped. Paths resolving to the same file (through
/// a symlink) are listed once, under the name that sorts first.
pub fn discover(root: &Path, recursive: bool, include_legacy: bool) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(root).min_depth(1);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::debug!(error = %err, "Skipping unreadable entry");
                None
            }
        })
        .map(|e| e.into_path())
        .filter(|p| p.is_file())
        .filter(|p| match detect_format(p) {
            Some(DocFormat::Docx) => true,
            Some(DocFormat::Doc) => include_legacy,
            None => false,
        })
        .collect();

    files.sort_by_cached_key(|p| p.to_string_lossy().to_lowercase());

    let mut seen = HashSet::new();
    files.retain(|p| seen.insert(fs::canonicalize(p).unwrap_or_else(|_| p.clone())));
    files
}

/// Mirror `input_file` from `input_root` into `output_root` as `.md`.
pub fn output_markdown_path(input_file: &Path, input_root: &Path, output_root: &Path) -> Result<PathBuf> {
    let rel = input_file
        .strip_prefix(input_root)
        .map_err(|_| ConvertError::NotUnderRoot {
            path: input_file.to_path_buf(),
            root: input_root.to_path_buf(),
        })?;

    Ok(output_root.join(rel).with_extension("md"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn detects_formats_case_insensitively() {
        assert_eq!(detect_format(Path::new("a.docx")), Some(DocFormat::Docx));
        assert_eq!(detect_format(Path::new("a.DOCX")), Some(DocFormat::Docx));
        assert_eq!(detect_format(Path::new("a.Doc")), Some(DocFormat::Doc));
        assert_eq!(detect_format(Path::new("a.txt")), None);
        assert_eq!(detect_format(Path::new("docx")), None);
    }

    #[test]
    fn non_recursive_without_legacy() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.docx"), "x").unwrap();
        fs::write(tmp.path().join("b.doc"), "x").unwrap();
        fs::write(tmp.path().join("c.txt"), "x").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub").join("d.docx"), "x").unwrap();

        let files = discover(tmp.path(), false, false);
        assert_eq!(names(&files), vec!["a.docx"]);
    }

    #[test]
    fn recursive_with_legacy() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.docx"), "x").unwrap();
        fs::write(tmp.path().join("b.doc"), "x").unwrap();
        fs::write(tmp.path().join("c.txt"), "x").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub").join("d.docx"), "x").unwrap();

        let files = discover(tmp.path(), true, true);
        assert_eq!(names(&files), vec!["a.docx", "b.doc", "d.docx"]);
    }

    #[test]
    fn sorts_case_insensitively() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("b.docx"), "x").unwrap();
        fs::write(tmp.path().join("A.docx"), "x").unwrap();
        fs::write(tmp.path().join("c.DOCX"), "x").unwrap();

        let files = discover(tmp.path(), false, false);
        assert_eq!(names(&files), vec!["A.docx", "b.docx", "c.DOCX"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_file_is_listed_once() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("report.docx"), "x").unwrap();
        std::os::unix::fs::symlink(tmp.path().join("report.docx"), tmp.path().join("alias.docx")).unwrap();
        fs::write(tmp.path().join("other.docx"), "x").unwrap();

        let files = discover(tmp.path(), false, false);
        assert_eq!(names(&files), vec!["alias.docx", "other.docx"]);
    }

    #[test]
    fn directories_named_like_documents_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("folder.docx")).unwrap();

        assert!(discover(tmp.path(), true, true).is_empty());
    }

    #[test]
    fn output_path_mirrors_structure() {
        let input = Path::new("/data/in");
        let output = Path::new("/data/out");
        let src = input.join("sub").join("My File.DOCX");

        let md = output_markdown_path(&src, input, output).unwrap();
        assert_eq!(md, output.join("sub").join("My File.md"));
    }

    #[test]
    fn output_path_keeps_inner_dots() {
        let md = output_markdown_path(
            Path::new("/in/v1.2 notes.docx"),
            Path::new("/in"),
            Path::new("/out"),
        )
        .unwrap();
        assert_eq!(md, PathBuf::from("/out/v1.2 notes.md"));
    }

    #[test]
    fn output_path_outside_root_is_an_error() {
        let err = output_markdown_path(Path::new("/elsewhere/a.docx"), Path::new("/in"), Path::new("/out"))
            .unwrap_err();
        assert!(matches!(err, ConvertError::NotUnderRoot { .. }));
    }
}
