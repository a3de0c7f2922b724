use crate::extract::ExtractError;
use scraper::{ElementRef, Node, Selector};

/// Compiles a CSS selector
pub(crate) fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|_| ExtractError::Selector(css.to_string()))
}

/// Serializes an element's children, trimming each one and joining them
/// without separators
///
/// Source markup pads post bodies with indentation and newlines between
/// children; dropping that padding keeps bodies compact without touching
/// the whitespace inside child elements.
pub(crate) fn joined_inner_html(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => Some(escape_text(text.trim())),
            Node::Element(_) => ElementRef::wrap(child).map(|e| e.html().trim().to_string()),
            _ => None,
        })
        .collect()
}

/// Collects an element's text, trimmed
pub(crate) fn trimmed_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text of the first element matching `selector` under `scope`
pub(crate) fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(trimmed_text)
        .filter(|s| !s.is_empty())
}

/// First run of ASCII digits in `text`
pub(crate) fn first_number(text: &str) -> Option<u32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
