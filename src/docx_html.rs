use crate::error::{ConvertError, Result};
use crate::image::{content_type_for_part, EmbeddedImage, ImageSink};
use docx_rust::document::{
    BodyContent, ParagraphContent, RunContent, TableCellContent, TableRowContent,
};
use docx_rust::formatting::CharacterProperty;
use docx_rust::{Docx, DocxFile};
use std::path::Path;

/// Convert a DOCX file to an HTML fragment.
///
/// Every embedded image is handed to `sink` exactly once, in document order,
/// before this returns; the `<img>` elements point at whatever it returns.
pub fn docx_to_html(path: &Path, sink: &mut dyn ImageSink) -> Result<String> {
    let file = DocxFile::from_file(path).map_err(|e| ConvertError::OpenDocument {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let docx = file.parse().map_err(|e| ConvertError::ParseDocument {
        detail: e.to_string(),
    })?;

    let mut ctx = RenderContext {
        docx: &docx,
        sink,
        output: String::new(),
        open_lists: Vec::new(),
    };

    for content in &docx.document.body.content {
        ctx.render_body_content(content)?;
    }
    ctx.close_lists_to(0);

    Ok(ctx.output)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Bullet => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

struct RenderContext<'a, 'd> {
    docx: &'a Docx<'d>,
    sink: &'a mut dyn ImageSink,
    output: String,
    /// One entry per open list, outermost first; each has an open `<li>`.
    open_lists: Vec<ListKind>,
}

impl<'a, 'd> RenderContext<'a, 'd> {
    fn render_body_content(&mut self, content: &BodyContent) -> Result<()> {
        match content {
            BodyContent::Paragraph(para) => self.render_paragraph(para)?,
            BodyContent::Table(table) => {
                self.close_lists_to(0);
                self.render_table(table)?;
            }
            BodyContent::Sdt(sdt) => {
                if let Some(ref sdt_content) = sdt.content {
                    for item in &sdt_content.content {
                        self.render_body_content(item)?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn render_paragraph(&mut self, para: &docx_rust::document::Paragraph) -> Result<()> {
        let mut heading_level: Option<u8> = None;
        let mut numbering: Option<(isize, isize)> = None;

        if let Some(ref prop) = para.property {
            if let Some(ref style_id) = prop.style_id {
                heading_level = heading_level_for_style(style_id.value.as_ref());
            }

            if let Some(ref num_prop) = prop.numbering {
                if let (Some(ref id), Some(ref level)) = (&num_prop.id, &num_prop.level) {
                    numbering = Some((id.value, level.value));
                }
            }
        }

        let inline = self.render_inline_content(para)?;

        if let Some((num_id, level)) = numbering.filter(|_| heading_level.is_none()) {
            let kind = self.list_kind(num_id, level);
            self.open_list_item(level.max(0) as usize, kind);
            self.output.push_str(inline.trim());
            return Ok(());
        }

        self.close_lists_to(0);

        // Empty paragraphs carry no content
        if inline.trim().is_empty() {
            return Ok(());
        }

        let tag = match heading_level {
            Some(level) => format!("h{}", level),
            None => "p".to_string(),
        };
        self.output
            .push_str(&format!("<{}>{}</{}>", tag, inline.trim(), tag));
        Ok(())
    }

    fn open_list_item(&mut self, level: usize, kind: ListKind) {
        let depth = level + 1;
        self.close_lists_to(depth);

        if self.open_lists.len() == depth {
            if self.open_lists[depth - 1] == kind {
                self.output.push_str("</li><li>");
                return;
            }
            self.close_lists_to(depth - 1);
        }

        while self.open_lists.len() < depth {
            self.output.push_str(&format!("<{}><li>", kind.tag()));
            self.open_lists.push(kind);
        }
    }

    fn close_lists_to(&mut self, depth: usize) {
        while self.open_lists.len() > depth {
            if let Some(kind) = self.open_lists.pop() {
                self.output.push_str(&format!("</li></{}>", kind.tag()));
            }
        }
    }

    fn render_inline_content(&mut self, para: &docx_rust::document::Paragraph) -> Result<String> {
        let mut result = String::new();

        for pc in &para.content {
            match pc {
                ParagraphContent::Run(run) => {
                    let html = self.render_run(run)?;
                    if !html.is_empty() {
                        result.push_str(&wrap_run_formatting(&html, &run.property));
                    }
                }
                ParagraphContent::Link(link) => {
                    let display = match link.content.as_ref() {
                        Some(run) => self.render_run(run)?,
                        None => String::new(),
                    };

                    match self.resolve_hyperlink_target(link) {
                        Some(url) => {
                            let text = if display.is_empty() {
                                escape_html(&url)
                            } else {
                                display
                            };
                            result.push_str(&format!(
                                "<a href=\"{}\">{}</a>",
                                escape_attr(&url),
                                text
                            ));
                        }
                        None => result.push_str(&display),
                    }
                }
                _ => {}
            }
        }

        Ok(result)
    }

    fn render_run(&mut self, run: &docx_rust::document::Run) -> Result<String> {
        let mut html = String::new();

        for rc in &run.content {
            match rc {
                RunContent::Text(t) => html.push_str(&escape_html(&t.text)),
                RunContent::Break(_) => html.push_str("<br>"),
                RunContent::Tab(_) => html.push('\t'),
                RunContent::Drawing(drawing) => {
                    if let Some(img) = self.render_drawing(drawing)? {
                        html.push_str(&img);
                    }
                }
                _ => {}
            }
        }

        Ok(html)
    }

    fn render_drawing(&mut self, drawing: &docx_rust::document::Drawing) -> Result<Option<String>> {
        if let Some(ref inline) = drawing.inline {
            if let Some(ref graphic) = inline.graphic {
                if let Some(pic) = graphic.data.children.first() {
                    let embed_id = pic.fill.blip.embed.as_ref();
                    let alt = inline.doc_property.descr.as_deref().unwrap_or("");
                    return self.store_image(embed_id, alt);
                }
            }
        }

        if let Some(ref anchor) = drawing.anchor {
            if let Some(ref graphic) = anchor.graphic {
                if let Some(pic) = graphic.data.children.first() {
                    let embed_id = pic.fill.blip.embed.as_ref();
                    let alt = anchor.doc_property.descr.as_deref().unwrap_or("");
                    return self.store_image(embed_id, alt);
                }
            }
        }

        Ok(None)
    }

    fn store_image(&mut self, embed_id: &str, alt: &str) -> Result<Option<String>> {
        let Some(target) = self.relationship_target(embed_id) else {
            tracing::debug!(embed_id, "Image relationship not found");
            return Ok(None);
        };

        // Relationship targets are relative to word/, media keys are package paths
        let full_path = format!("word/{}", target.trim_start_matches('/'));
        let data = self
            .docx
            .media
            .get(target)
            .or_else(|| self.docx.media.get(&full_path))
            .map(|(_, data)| &data[..]);

        let Some(data) = data else {
            tracing::warn!(target, "Embedded image data missing from package");
            return Ok(None);
        };

        let image = EmbeddedImage {
            content_type: content_type_for_part(target),
            data,
        };
        let src = self.sink.store(&image)?;

        Ok(Some(format!(
            "<img src=\"{}\" alt=\"{}\">",
            escape_attr(&src),
            escape_attr(alt)
        )))
    }

    fn relationship_target(&self, id: &str) -> Option<&'a str> {
        self.docx
            .document_rels
            .as_ref()?
            .relationships
            .iter()
            .find(|r| r.id.as_ref() == id)
            .map(|r| r.target.as_ref())
    }

    fn resolve_hyperlink_target(&self, link: &docx_rust::document::Hyperlink) -> Option<String> {
        if let Some(ref anchor) = link.anchor {
            return Some(format!("#{}", anchor));
        }

        let id = link.id.as_ref()?;
        self.relationship_target(id.as_ref()).map(|t| t.to_string())
    }

    fn list_kind(&self, num_id: isize, level: isize) -> ListKind {
        let Some(ref numbering) = self.docx.numbering else {
            return ListKind::Bullet;
        };

        let abstract_id = numbering
            .numberings
            .iter()
            .find(|num| num.num_id == Some(num_id))
            .and_then(|num| num.abstract_num_id.as_ref())
            .map(|aid| aid.value);

        let Some(abstract_id) = abstract_id else {
            return ListKind::Bullet;
        };

        let format: Option<&str> = numbering
            .abstract_numberings
            .iter()
            .filter(|a| a.abstract_num_id == abstract_id)
            .flat_map(|a| a.levels.iter())
            .find(|lvl| lvl.i_level == Some(level))
            .and_then(|lvl| lvl.number_format.as_ref())
            .map(|fmt| fmt.value.as_ref());

        match format {
            Some("decimal") | Some("upperRoman") | Some("lowerRoman") | Some("upperLetter")
            | Some("lowerLetter") => ListKind::Ordered,
            _ => ListKind::Bullet,
        }
    }

    fn render_table(&mut self, table: &docx_rust::document::Table) -> Result<()> {
        let mut rows: Vec<Vec<String>> = Vec::new();

        for row in &table.rows {
            let mut cells: Vec<String> = Vec::new();

            for cell_content in &row.cells {
                if let TableRowContent::TableCell(cell) = cell_content {
                    cells.push(self.render_cell(cell)?);
                }
            }

            if !cells.is_empty() {
                rows.push(cells);
            }
        }

        if rows.is_empty() {
            return Ok(());
        }

        self.output.push_str("<table>");
        for (i, row) in rows.iter().enumerate() {
            let cell_tag = if i == 0 { "th" } else { "td" };
            self.output.push_str("<tr>");
            for cell in row {
                self.output
                    .push_str(&format!("<{}>{}</{}>", cell_tag, cell, cell_tag));
            }
            self.output.push_str("</tr>");
        }
        self.output.push_str("</table>");

        Ok(())
    }

    fn render_cell(&mut self, cell: &docx_rust::document::TableCell) -> Result<String> {
        let mut parts: Vec<String> = Vec::new();

        for tc in &cell.content {
            let TableCellContent::Paragraph(para) = tc;
            let html = self.render_inline_content(para)?;
            let trimmed = html.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }

        Ok(parts.join("<br>"))
    }
}

fn heading_level_for_style(style_id: &str) -> Option<u8> {
    match style_id {
        "Heading1" | "heading1" | "heading 1" | "Title" | "title" => Some(1),
        "Heading2" | "heading2" | "heading 2" | "Subtitle" | "subtitle" => Some(2),
        "Heading3" | "heading3" | "heading 3" => Some(3),
        "Heading4" | "heading4" | "heading 4" => Some(4),
        "Heading5" | "heading5" | "heading 5" => Some(5),
        "Heading6" | "heading6" | "heading 6" => Some(6),
        _ => None,
    }
}

/// Wrap rendered run HTML in tags for its character formatting.
fn wrap_run_formatting(html: &str, props: &Option<CharacterProperty>) -> String {
    let Some(props) = props else {
        return html.to_string();
    };

    // Don't wrap whitespace-only text
    if html.trim().is_empty() {
        return html.to_string();
    }

    let is_bold = props
        .bold
        .as_ref()
        .map(|b| b.value != Some(false))
        .unwrap_or(false);
    let is_italic = props
        .italics
        .as_ref()
        .map(|i| i.value != Some(false))
        .unwrap_or(false);
    let is_strike = props.strike.is_some() || props.dstrike.is_some();

    let mut result = html.to_string();
    if is_strike {
        result = format!("<s>{}</s>", result);
    }
    if is_italic {
        result = format!("<em>{}</em>", result);
    }
    if is_bold {
        result = format!("<strong>{}</strong>", result);
    }
    result
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(text: &str) -> String {
    escape_html(text).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_styles() {
        assert_eq!(heading_level_for_style("Heading1"), Some(1));
        assert_eq!(heading_level_for_style("heading 3"), Some(3));
        assert_eq!(heading_level_for_style("Subtitle"), Some(2));
        assert_eq!(heading_level_for_style("Normal"), None);
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape_html("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(escape_attr("say \"hi\""), "say &quot;hi&quot;");
    }

    #[test]
    fn plain_run_is_not_wrapped() {
        assert_eq!(wrap_run_formatting("text", &None), "text");
    }
}
