//! HTML fragment to Markdown.
//!
//! Output uses ATX headings, `-` bullets, `*` emphasis, `---` rules and
//! bare code fences. Blocks are separated by one blank line; nested list
//! items are indented by the width of their parent's marker.

use scraper::{ElementRef, Html, Node};

#[derive(Default)]
struct Context {
    list_depth: usize,
    in_preformatted: bool,
    in_table_cell: bool,
}

/// Convert an HTML fragment to Markdown.
pub fn html_to_markdown(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut output = String::new();
    convert_children(&mut output, fragment.root_element(), &mut Context::default());
    output
}

fn convert_children(output: &mut String, element: ElementRef<'_>, ctx: &mut Context) {
    for child in element.children() {
        match child.value() {
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    convert_element(output, el, ctx);
                }
            }
            Node::Text(text) => {
                if ctx.in_preformatted {
                    output.push_str(text);
                } else {
                    output.push_str(&escape_text(&collapse_inline_whitespace(text)));
                }
            }
            _ => {}
        }
    }
}

fn convert_element(output: &mut String, element: ElementRef<'_>, ctx: &mut Context) {
    match element.value().name() {
        "h1" => convert_heading(output, element, ctx, 1),
        "h2" => convert_heading(output, element, ctx, 2),
        "h3" => convert_heading(output, element, ctx, 3),
        "h4" => convert_heading(output, element, ctx, 4),
        "h5" => convert_heading(output, element, ctx, 5),
        "h6" => convert_heading(output, element, ctx, 6),

        "p" => {
            ensure_blank_line(output);
            let mut text = String::new();
            convert_children(&mut text, element, ctx);
            output.push_str(text.trim());
            output.push_str("\n\n");
        }
        "div" | "section" | "article" => {
            convert_children(output, element, ctx);
            ensure_blank_line(output);
        }
        "blockquote" => {
            ensure_blank_line(output);
            let mut content = String::new();
            convert_children(&mut content, element, ctx);
            for line in content.trim().lines() {
                output.push('>');
                if !line.is_empty() {
                    output.push(' ');
                    output.push_str(line);
                }
                output.push('\n');
            }
            output.push('\n');
        }

        "ul" => convert_list(output, element, ctx, false),
        "ol" => convert_list(output, element, ctx, true),

        "pre" => convert_pre(output, element),
        "code" if !ctx.in_preformatted => {
            output.push('`');
            output.push_str(&element.text().collect::<String>());
            output.push('`');
        }

        "a" => convert_link(output, element, ctx),
        "img" => convert_image(output, element),
        "table" => convert_table(output, element, ctx),

        "strong" | "b" => wrap_inline(output, element, ctx, "**"),
        "em" | "i" => wrap_inline(output, element, ctx, "*"),
        "s" | "del" | "strike" => wrap_inline(output, element, ctx, "~~"),

        "br" => {
            if ctx.in_table_cell {
                output.push_str("<br>");
            } else {
                output.push_str("  \n");
            }
        }
        "hr" => {
            ensure_blank_line(output);
            output.push_str("---\n\n");
        }

        "script" | "style" | "head" | "title" => {}

        _ => convert_children(output, element, ctx),
    }
}

fn convert_heading(output: &mut String, element: ElementRef<'_>, ctx: &mut Context, level: usize) {
    let mut text = String::new();
    convert_children(&mut text, element, ctx);
    let text = collapse_whitespace(&text);
    if text.is_empty() {
        return;
    }

    ensure_blank_line(output);
    output.push_str(&"#".repeat(level));
    output.push(' ');
    output.push_str(&text);
    output.push_str("\n\n");
}

/// Emphasis markers hug the text; surrounding spaces move outside.
fn wrap_inline(output: &mut String, element: ElementRef<'_>, ctx: &mut Context, marker: &str) {
    let mut text = String::new();
    convert_children(&mut text, element, ctx);
    let inner = text.trim();
    if inner.is_empty() {
        output.push_str(&text);
        return;
    }

    if text.starts_with(char::is_whitespace) {
        output.push(' ');
    }
    output.push_str(marker);
    output.push_str(inner);
    output.push_str(marker);
    if text.ends_with(char::is_whitespace) {
        output.push(' ');
    }
}

fn convert_list(output: &mut String, element: ElementRef<'_>, ctx: &mut Context, ordered: bool) {
    if ctx.list_depth == 0 {
        ensure_blank_line(output);
    } else {
        ensure_newline(output);
    }

    let mut number: usize = element
        .value()
        .attr("start")
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);

    ctx.list_depth += 1;
    for child in element.children() {
        let Some(li) = ElementRef::wrap(child) else {
            continue;
        };
        if li.value().name() != "li" {
            continue;
        }

        let marker = if ordered {
            format!("{number}. ")
        } else {
            "- ".to_string()
        };
        number += 1;

        let mut content = String::new();
        convert_children(&mut content, li, ctx);
        push_list_item(output, &marker, content.trim());
    }
    ctx.list_depth -= 1;

    if ctx.list_depth == 0 {
        output.push('\n');
    }
}

/// Write one item; continuation lines are indented to the marker width.
fn push_list_item(output: &mut String, marker: &str, content: &str) {
    let indent = " ".repeat(marker.len());
    output.push_str(marker);

    for (i, line) in content.lines().enumerate() {
        if i > 0 {
            output.push('\n');
            if !line.trim().is_empty() {
                output.push_str(&indent);
            }
        }
        output.push_str(if i == 0 { line.trim_start() } else { line });
    }
    output.push('\n');
}

fn convert_pre(output: &mut String, element: ElementRef<'_>) {
    ensure_blank_line(output);

    let code: String = element.text().collect();
    let code = code.strip_prefix('\n').unwrap_or(&code);
    let code = code.strip_suffix('\n').unwrap_or(code);

    output.push_str("```\n");
    output.push_str(code);
    output.push_str("\n```\n\n");
}

fn convert_link(output: &mut String, element: ElementRef<'_>, ctx: &mut Context) {
    let mut text = String::new();
    convert_children(&mut text, element, ctx);
    let text = collapse_whitespace(&text);

    let href = element.value().attr("href").unwrap_or("").trim();
    if href.is_empty() {
        output.push_str(&text);
        return;
    }

    let label = if text.is_empty() { href } else { text.as_str() };
    output.push('[');
    output.push_str(label);
    output.push_str("](");
    output.push_str(&link_destination(href));
    output.push(')');
}

fn convert_image(output: &mut String, element: ElementRef<'_>) {
    let src = element.value().attr("src").unwrap_or("").trim();
    if src.is_empty() {
        return;
    }
    let alt = element.value().attr("alt").unwrap_or("");

    output.push_str("![");
    output.push_str(&collapse_whitespace(alt).replace(['[', ']'], ""));
    output.push_str("](");
    output.push_str(&link_destination(src));
    output.push(')');
}

/// Targets are written as-is; ones with spaces or parentheses go in `<...>`.
fn link_destination(target: &str) -> String {
    if target.contains(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | '<' | '>')) {
        format!("<{}>", target.replace('<', "%3C").replace('>', "%3E"))
    } else {
        target.to_string()
    }
}

fn convert_table(output: &mut String, element: ElementRef<'_>, ctx: &mut Context) {
    let mut rows: Vec<Vec<String>> = element
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "tr")
        .map(|tr| collect_table_cells(tr, ctx))
        .collect();

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return;
    }
    for row in &mut rows {
        row.resize(columns, String::new());
    }

    ensure_blank_line(output);
    for (i, row) in rows.iter().enumerate() {
        push_table_row(output, row);
        if i == 0 {
            push_table_row(output, &vec!["---".to_string(); columns]);
        }
    }
    output.push('\n');
}

fn collect_table_cells(tr: ElementRef<'_>, ctx: &mut Context) -> Vec<String> {
    let was_in_cell = ctx.in_table_cell;
    ctx.in_table_cell = true;

    let cells = tr
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
        .map(|cell| {
            let mut text = String::new();
            convert_children(&mut text, cell, ctx);
            collapse_whitespace(&text).replace('|', "\\|")
        })
        .collect();

    ctx.in_table_cell = was_in_cell;
    cells
}

fn push_table_row(output: &mut String, cells: &[String]) {
    output.push('|');
    for cell in cells {
        output.push(' ');
        output.push_str(cell);
        output.push_str(" |");
    }
    output.push('\n');
}

fn ensure_newline(output: &mut String) {
    if !output.is_empty() && !output.ends_with('\n') {
        output.push('\n');
    }
}

/// Leave the output ending in a blank line, unless it is empty.
fn ensure_blank_line(output: &mut String) {
    if output.is_empty() {
        return;
    }
    match output.chars().rev().take_while(|&c| c == '\n').count() {
        0 => output.push_str("\n\n"),
        1 => output.push('\n'),
        _ => {}
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse runs of whitespace to one space, keeping a leading or trailing one.
fn collapse_inline_whitespace(s: &str) -> String {
    let collapsed = collapse_whitespace(s);
    if collapsed.is_empty() {
        return if s.is_empty() { String::new() } else { " ".to_string() };
    }

    let mut result = String::with_capacity(collapsed.len() + 2);
    if s.starts_with(char::is_whitespace) {
        result.push(' ');
    }
    result.push_str(&collapsed);
    if s.ends_with(char::is_whitespace) {
        result.push(' ');
    }
    result
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Collapse runs of blank lines down to a single blank line.
pub fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;

    for (i, line) in text.split('\n').enumerate() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
            if i > 0 {
                out.push('\n');
            }
            continue;
        }

        blank_run = 0;
        if i > 0 {
            out.push('\n');
        }
        out.push_str(line);
    }

    out
}

/// Trim surrounding whitespace and end with exactly one newline.
pub fn finish(md: &str) -> String {
    let mut result = md.trim().to_string();
    result.push('\n');
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(html: &str) -> String {
        finish(&collapse_blank_lines(&html_to_markdown(html)))
    }

    #[test]
    fn paragraphs_are_separated_by_a_blank_line() {
        assert_eq!(
            render("<p>First paragraph</p><p>Second paragraph</p>"),
            "First paragraph\n\nSecond paragraph\n"
        );
    }

    #[test]
    fn headings_are_atx() {
        assert_eq!(
            render("<h1>Title</h1><p>text</p><h2>Sub <em>part</em></h2>"),
            "# Title\n\ntext\n\n## Sub *part*\n"
        );
    }

    #[test]
    fn horizontal_rule_is_kept() {
        assert_eq!(render("<p>a</p><hr><p>b</p>"), "a\n\n---\n\nb\n");
    }

    #[test]
    fn nested_lists_are_indented_by_marker_width() {
        let html = "<ul><li>a<ul><li>b<ol><li>c</li><li>d</li></ol></li></ul></li><li>e</li></ul>";
        assert_eq!(render(html), "- a\n  - b\n    1. c\n    2. d\n- e\n");
    }

    #[test]
    fn ordered_list_honors_start() {
        assert_eq!(render("<ol start=\"3\"><li>x</li><li>y</li></ol>"), "3. x\n4. y\n");
    }

    #[test]
    fn list_is_separated_from_surrounding_paragraphs() {
        assert_eq!(
            render("<p>intro</p><ul><li>one</li></ul><p>outro</p>"),
            "intro\n\n- one\n\noutro\n"
        );
    }

    #[test]
    fn table_gets_separator_row() {
        let html = "<table><tr><th>Name</th><th>Qty</th></tr><tr><td>a|b</td><td>1<br>2</td></tr><tr><td>c</td></tr></table>";
        assert_eq!(
            render(html),
            "| Name | Qty |\n| --- | --- |\n| a\\|b | 1<br>2 |\n| c |  |\n"
        );
    }

    #[test]
    fn inline_formatting() {
        assert_eq!(
            render("<p><strong>bold</strong> <em>it </em>and <s>gone</s></p>"),
            "**bold** *it* and ~~gone~~\n"
        );
    }

    #[test]
    fn image_target_is_not_percent_encoded() {
        assert_eq!(
            render("<p><img src=\"My Doc_files/image1.png\" alt=\"chart\"></p>"),
            "![chart](<My Doc_files/image1.png>)\n"
        );
        assert_eq!(
            render("<p><img src=\"doc_files/image2.jpg\" alt=\"\"></p>"),
            "![](doc_files/image2.jpg)\n"
        );
    }

    #[test]
    fn links_keep_their_href() {
        assert_eq!(
            render("<p>see <a href=\"https://example.com/a?b=c\">the site</a></p>"),
            "see [the site](https://example.com/a?b=c)\n"
        );
    }

    #[test]
    fn markdown_characters_in_text_are_escaped() {
        assert_eq!(render("<p>2 * 3 = snake_case</p>"), "2 \\* 3 = snake\\_case\n");
    }

    #[test]
    fn code_blocks_use_bare_fences() {
        assert_eq!(
            render("<pre><code class=\"language-rust\">fn main() {}\n  x</code></pre>"),
            "```\nfn main() {}\n  x\n```\n"
        );
    }

    #[test]
    fn line_break_inside_paragraph() {
        assert_eq!(render("<p>one<br>two</p>"), "one  \ntwo\n");
    }

    #[test]
    fn collapse_reduces_runs_to_one_blank_line() {
        assert_eq!(collapse_blank_lines("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n  \n\t\nb\n"), "a\n\nb\n");
        assert_eq!(collapse_blank_lines("a\nb"), "a\nb");
    }

    #[test]
    fn collapse_is_idempotent() {
        let samples = [
            "",
            "\n\n\n",
            "one\n\n\n\ntwo\n\n\nthree\n",
            "  \n\nx\n \n \n \ny",
            "# Title\n\n\n- a\n- b\n\n\n\n",
        ];
        for s in samples {
            let once = collapse_blank_lines(s);
            assert_eq!(collapse_blank_lines(&once), once, "input: {:?}", s);
        }
    }

    #[test]
    fn finish_ends_with_single_newline() {
        assert_eq!(finish("\n\n# Doc\n\ntext\n\n\n"), "# Doc\n\ntext\n");
        assert_eq!(finish(""), "\n");
    }
}
