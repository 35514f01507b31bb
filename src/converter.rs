use crate::cleanup;
use crate::docx_html;
use crate::error::Result;
use crate::html;
use crate::image::AssetWriter;
use crate::markdown;
use std::path::Path;

/// Convert one DOCX file to Markdown text.
///
/// Images are written into the `<stem>_files` folder next to
/// `output_markdown`; the Markdown itself is returned, not written.
/// Fails as a whole: no partial text on error.
pub fn convert_document(document: &Path, output_markdown: &Path) -> Result<String> {
    let _span = tracing::info_span!("convert_document", path = %document.display()).entered();

    let mut assets = AssetWriter::for_markdown(output_markdown);

    let raw_html = docx_html::docx_to_html(document, &mut assets)?;
    let html = html::normalize_fragment(&raw_html)?;
    let md = markdown::html_to_markdown(&html);
    let md = markdown::collapse_blank_lines(&md);

    if assets.written() == 0 {
        cleanup::remove_empty_dir(assets.assets_dir());
    } else {
        tracing::debug!(
            images = assets.written(),
            dir = %assets.assets_dir().display(),
            "Extracted images"
        );
    }

    Ok(markdown::finish(&md))
}
