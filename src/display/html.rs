//! Just enough HTML inspection for the popout to lay out fragments

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref MEDIA_ELEMENT: Regex = Regex::new(r"(?i)<(?:img|video)\b").unwrap();
    static ref IMG_SRC: Regex =
        Regex::new(r#"(?is)<img\b[^>]*?\ssrc\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
    static ref VIDEO_SRC: Regex = Regex::new(
        r#"(?is)<(?:video|source)\b[^>]*?\ssrc\s*=\s*(?:"([^"]*)"|'([^']*)')"#
    )
    .unwrap();
    static ref BLOCK_BREAK: Regex =
        Regex::new(r"(?i)<br\s*/?>|</(?:p|div|h[1-6]|li|tr|table|blockquote|pre)\s*>").unwrap();
    static ref LIST_ITEM: Regex = Regex::new(r"(?i)<li\b[^>]*>").unwrap();
    static ref TAG: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
    static ref SKIPPED: Regex = Regex::new(r"(?is)<(style|script)\b.*?</(?:style|script)\s*>").unwrap();
    static ref BLANK_RUNS: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Fragments with an image or video are map-like and drawn full-bleed;
/// everything else is a scrollable text document
pub fn contains_media(html: &str) -> bool {
    MEDIA_ELEMENT.is_match(html)
}

/// Source of the first `<img>`, used to size fit, grid and export
pub fn first_image_src(html: &str) -> Option<String> {
    first_src(&IMG_SRC, html)
}

/// Source of the first `<video>` or `<source>` element
pub fn first_video_src(html: &str) -> Option<String> {
    first_src(&VIDEO_SRC, html)
}

fn first_src(pattern: &Regex, html: &str) -> Option<String> {
    pattern
        .captures(html)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| decode_entities(m.as_str()))
        .filter(|src| !src.is_empty())
}

/// Readable text with paragraph breaks kept
pub fn to_plain_text(html: &str) -> String {
    let text = SKIPPED.replace_all(html, "");
    let text = LIST_ITEM.replace_all(&text, "• ");
    let text = BLOCK_BREAK.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, "");
    let text = decode_entities(&text);
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    BLANK_RUNS.replace_all(lines.join("\n").trim(), "\n\n").into_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
