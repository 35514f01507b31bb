use crate::error::{ConvertError, Result};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

const KNOWN_IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/png", ".png"),
    ("image/jpeg", ".jpg"),
    ("image/jpg", ".jpg"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
    ("image/bmp", ".bmp"),
    ("image/tiff", ".tiff"),
    ("image/svg+xml", ".svg"),
];

/// Pick a file extension (with leading dot) for an image content type.
///
/// Known types come from a fixed table; anything else falls back to the
/// subtype with parameters and `+suffix` stripped, then to `.bin`.
pub fn extension_for_content_type(content_type: &str) -> String {
    let content_type = content_type.trim().to_ascii_lowercase();

    if let Some((_, ext)) = KNOWN_IMAGE_TYPES.iter().find(|(ct, _)| *ct == content_type) {
        return ext.to_string();
    }

    if let Some((_, subtype)) = content_type.split_once('/') {
        let subtype = subtype.split(';').next().unwrap_or("");
        let subtype = subtype.split('+').next().unwrap_or("").trim();
        if !subtype.is_empty() {
            return format!(".{}", subtype);
        }
    }

    ".bin".to_string()
}

/// Content type for a media part inside a DOCX package, keyed by extension
/// the same way `[Content_Types].xml` defaults are.
pub fn content_type_for_part(part_name: &str) -> String {
    let ext = Path::new(part_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png".to_string(),
        Some("jpg") | Some("jpeg") | Some("jpe") => "image/jpeg".to_string(),
        Some("gif") => "image/gif".to_string(),
        Some("webp") => "image/webp".to_string(),
        Some("bmp") => "image/bmp".to_string(),
        Some("tif") | Some("tiff") => "image/tiff".to_string(),
        Some("svg") => "image/svg+xml".to_string(),
        Some("emf") => "image/x-emf".to_string(),
        Some("wmf") => "image/x-wmf".to_string(),
        Some(other) if !other.is_empty() => format!("image/{}", other),
        _ => String::new(),
    }
}

/// `<stem>_files`, next to the Markdown file.
pub fn assets_dir_for(markdown_path: &Path) -> PathBuf {
    let stem = markdown_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = format!("{}_files", stem);

    match markdown_path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// An image embedded in a document, as handed to an [`ImageSink`].
pub struct EmbeddedImage<'a> {
    pub content_type: String,
    pub data: &'a [u8],
}

impl<'a> EmbeddedImage<'a> {
    pub fn reader(&self) -> impl Read + 'a {
        self.data
    }
}

/// Receives each embedded image in document order and returns the link
/// target to use for it in the output.
pub trait ImageSink {
    fn store(&mut self, image: &EmbeddedImage<'_>) -> Result<String>;
}

/// Writes images as `image<N><ext>` into a document's assets directory.
///
/// Holds a running counter, so one writer serves one document on one thread.
pub struct AssetWriter {
    assets_dir: PathBuf,
    dir_name: String,
    count: usize,
}

impl AssetWriter {
    pub fn for_markdown(markdown_path: &Path) -> Self {
        let assets_dir = assets_dir_for(markdown_path);
        let dir_name = assets_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            assets_dir,
            dir_name,
            count: 0,
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Number of images written so far.
    pub fn written(&self) -> usize {
        self.count
    }
}

impl ImageSink for AssetWriter {
    fn store(&mut self, image: &EmbeddedImage<'_>) -> Result<String> {
        let index = self.count + 1;
        let filename = format!(
            "image{}{}",
            index,
            extension_for_content_type(&image.content_type)
        );
        let dest = self.assets_dir.join(&filename);

        fs::create_dir_all(&self.assets_dir)
            .map_err(|e| ConvertError::io(&self.assets_dir, e))?;

        let mut data = Vec::with_capacity(image.data.len());
        image
            .reader()
            .read_to_end(&mut data)
            .map_err(|e| ConvertError::io(&dest, e))?;
        fs::write(&dest, &data).map_err(|e| ConvertError::io(&dest, e))?;

        self.count = index;

        // Markdown link targets always use forward slashes
        Ok(format!("{}/{}", self.dir_name, filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_content_types() {
        assert_eq!(extension_for_content_type("image/png"), ".png");
        assert_eq!(extension_for_content_type("IMAGE/JPEG"), ".jpg");
        assert_eq!(extension_for_content_type("image/jpg"), ".jpg");
        assert_eq!(extension_for_content_type(" image/svg+xml "), ".svg");
        assert_eq!(extension_for_content_type("image/tiff"), ".tiff");
    }

    #[test]
    fn derived_and_fallback_content_types() {
        assert_eq!(extension_for_content_type("image/foo+bar;charset=x"), ".foo");
        assert_eq!(extension_for_content_type("image/x-emf"), ".x-emf");
        assert_eq!(extension_for_content_type(""), ".bin");
        assert_eq!(extension_for_content_type("garbage"), ".bin");
        assert_eq!(extension_for_content_type("image/"), ".bin");
        assert_eq!(extension_for_content_type("image/;q=1"), ".bin");
    }

    #[test]
    fn part_content_types() {
        assert_eq!(content_type_for_part("word/media/image1.PNG"), "image/png");
        assert_eq!(content_type_for_part("media/photo.jpeg"), "image/jpeg");
        assert_eq!(content_type_for_part("media/chart.emf"), "image/x-emf");
        assert_eq!(content_type_for_part("media/blob"), "");
    }

    #[test]
    fn assets_dir_is_sibling_of_markdown() {
        let md = Path::new("/out/sub/My Doc.md");
        assert_eq!(assets_dir_for(md), PathBuf::from("/out/sub/My Doc_files"));
    }

    #[test]
    fn writer_numbers_images_and_creates_dir_lazily() {
        let tmp = tempfile::tempdir().unwrap();
        let md = tmp.path().join("Report.md");
        let mut writer = AssetWriter::for_markdown(&md);

        assert!(!writer.assets_dir().exists());

        let png = EmbeddedImage {
            content_type: "image/png".to_string(),
            data: b"png-bytes",
        };
        let unknown = EmbeddedImage {
            content_type: String::new(),
            data: b"raw",
        };

        assert_eq!(writer.store(&png).unwrap(), "Report_files/image1.png");
        assert_eq!(writer.store(&unknown).unwrap(), "Report_files/image2.bin");
        assert_eq!(writer.written(), 2);

        let written = fs::read(tmp.path().join("Report_files").join("image1.png")).unwrap();
        assert_eq!(written, b"png-bytes");
    }
}
