//! Media type detection shared by the resolver, projector and popout

use crate::constants::media::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};

/// Lower-cased extension of a path or URL (query string ignored)
pub fn extension_of(path: &str) -> Option<String> {
    let clean = path.split(['?', '#']).next().unwrap_or(path);
    let name = clean.rsplit('/').next().unwrap_or(clean);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn is_video_extension(ext: &str) -> bool {
    VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

pub fn is_media_extension(ext: &str) -> bool {
    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()) || VIDEO_EXTENSIONS.contains(&ext.as_str())
}

pub fn is_video_path(path: &str) -> bool {
    extension_of(path).is_some_and(|ext| is_video_extension(&ext))
}

/// Whether a `show` source should play as video
///
/// Data URLs are sniffed by MIME prefix, everything else by extension.
pub fn is_video_source(src: &str) -> bool {
    if src.starts_with("data:video") {
        return true;
    }
    if src.starts_with("data:") {
        return false;
    }
    src.rsplit_once('.')
        .map(|(_, ext)| is_video_extension(ext))
        .unwrap_or(false)
}

/// MIME type for a file path, `None` for unrecognized extensions
pub fn mime_for_path(path: &str) -> Option<&'static str> {
    let mime = match extension_of(path)?.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/x-icon",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogg" => "video/ogg",
        "mov" => "video/quicktime",
        _ => return None,
    };
    Some(mime)
}
