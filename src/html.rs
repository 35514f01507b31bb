use crate::error::{ConvertError, Result};
use scraper::{ElementRef, Html};

/// Re-serialize an HTML fragment through a lenient parser.
///
/// The fragment is wrapped in a `<div>` so unclosed tags and stray text end
/// up under one container, whose children are then written back out.
pub fn normalize_fragment(html: &str) -> Result<String> {
    let wrapped = format!("<div>{}</div>", html);
    let fragment = Html::parse_fragment(&wrapped);

    let container = fragment
        .root_element()
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div")
        .ok_or_else(|| ConvertError::Html {
            detail: "wrapper element missing after parse".to_string(),
        })?;

    Ok(container.inner_html())
}
