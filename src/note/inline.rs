//! Inlines vault resources referenced by rendered HTML as data URLs
//!
//! The popout has no vault access, so everything it should display has to
//! travel inside the message payload.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::media::mime_for_path;
use crate::vault::{FileHandle, FileLookup, join};

lazy_static! {
    static ref SCRIPT: Regex = Regex::new(r"(?is)<script\b.*?</script\s*>").unwrap();
    static ref MEDIA_TAG: Regex = Regex::new(r"(?i)<(?:img|video|source)\b[^>]*>").unwrap();
    static ref SRC_ATTR: Regex = Regex::new(r#"(?i)(\ssrc\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).unwrap();
    static ref SRCSET_ATTR: Regex = Regex::new(r#"(?i)(\ssrcset\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).unwrap();
    static ref URL_SCHEME: Regex = Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:").unwrap();
}

/// Files larger than this keep their original reference
const MAX_INLINE_BYTES: usize = 50 * 1024 * 1024;

/// Encode a vault file as a `data:` URL
pub fn data_url_for<L: FileLookup + ?Sized>(lookup: &L, file: &FileHandle) -> Result<String> {
    let bytes = lookup
        .read_binary(file)
        .with_context(|| format!("Failed to read {} for inlining", file.path))?;
    Ok(encode_data_url(&file.path, &bytes))
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(value) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Map an HTML source attribute back to a vault file
fn locate_source<L: FileLookup + ?Sized>(lookup: &L, src: &str, context_dir: &str) -> Option<FileHandle> {
    let clean = src.split('?').next().unwrap_or(src);

    if URL_SCHEME.is_match(clean) || clean.starts_with("//") {
        // Resource URLs handed out by the vault itself
        return lookup
            .files()
            .iter()
            .find(|f| lookup.resource_url_of(f).split('?').next() == Some(clean))
            .cloned();
    }

    let path = percent_decode(clean);
    lookup
        .find_by_exact_path(&path)
        .or_else(|| {
            if context_dir.is_empty() {
                None
            } else {
                lookup.find_by_exact_path(&join(context_dir, &path))
            }
        })
        .or_else(|| lookup.find_by_base_name(&path))
}

fn inline_source<L: FileLookup + ?Sized>(lookup: &L, src: &str, context_dir: &str) -> Option<String> {
    if src.is_empty() || src.starts_with("data:") {
        return None;
    }
    let file = locate_source(lookup, src, context_dir)?;
    let bytes = match lookup.read_binary(&file) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %file.path, error = %e, "Failed to read resource for inlining");
            return None;
        }
    };
    if bytes.len() > MAX_INLINE_BYTES {
        debug!(path = %file.path, bytes = bytes.len(), "Resource too large to inline, keeping reference");
        return None;
    }
    Some(encode_data_url(&file.path, &bytes))
}

fn encode_data_url(path: &str, bytes: &[u8]) -> String {
    let mime = mime_for_path(path).unwrap_or("application/octet-stream");
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

fn attr_value<'c>(caps: &'c Captures) -> &'c str {
    caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str()).unwrap_or("")
}

fn rewrite_srcset<L: FileLookup + ?Sized>(lookup: &L, srcset: &str, context_dir: &str) -> String {
    srcset
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut pieces = part.splitn(2, char::is_whitespace);
            let url = pieces.next().unwrap_or("");
            let descriptor = pieces.next().map(str::trim).unwrap_or("");
            let url = inline_source(lookup, url, context_dir).unwrap_or_else(|| url.to_string());
            if descriptor.is_empty() {
                url
            } else {
                format!("{url} {descriptor}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn rewrite_tag<L: FileLookup + ?Sized>(lookup: &L, tag: &str, context_dir: &str) -> String {
    let tag = SRC_ATTR.replace_all(tag, |caps: &Captures| {
        let value = attr_value(caps);
        match inline_source(lookup, value, context_dir) {
            Some(data) => format!("{}\"{}\"", &caps[1], data),
            None => caps[0].to_string(),
        }
    });
    SRCSET_ATTR
        .replace_all(&tag, |caps: &Captures| {
            let value = rewrite_srcset(lookup, attr_value(caps), context_dir);
            format!("{}\"{}\"", &caps[1], value)
        })
        .into_owned()
}

/// Inline vault media in `html` and drop `<script>` elements
///
/// `context_path` is the note's vault path; relative sources resolve against
/// its folder. Sources that can't be found are left untouched.
pub fn inline_resources<L: FileLookup + ?Sized>(html: &str, context_path: &str, lookup: &L) -> String {
    let context_dir = context_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    let without_scripts = SCRIPT.replace_all(html, "");
    MEDIA_TAG
        .replace_all(&without_scripts, |caps: &Captures| rewrite_tag(lookup, &caps[0], context_dir))
        .into_owned()
}
