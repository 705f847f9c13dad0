//! Rewrites `![[name]]` embeds into markup the markdown renderer understands

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::debug;

use crate::constants::media::ASSET_FOLDERS;
use crate::media::is_video_path;
use crate::vault::{FileHandle, FileLookup};

lazy_static! {
    static ref WIKI_EMBED: Regex = Regex::new(r"!\[\[([^\]]+)\]\]").unwrap();
}

const VIDEO_STYLE: &str = "max-width:100%;max-height:100%;display:block;margin:auto";

/// Find the file an embed refers to
///
/// Order: next to the note, vault-absolute, by basename anywhere, then the
/// conventional asset folders. With the default basename search the asset
/// folders never add a match; they matter for lookups that override
/// `find_by_base_name` with something narrower.
pub fn locate_embed<L: FileLookup + ?Sized>(target: &str, note_dir: &str, lookup: &L) -> Option<FileHandle> {
    let base_name = target.rsplit('/').next().unwrap_or(target);

    if !note_dir.is_empty() {
        if let Some(file) = lookup.find_by_relative_path(note_dir, target) {
            return Some(file);
        }
    }

    lookup
        .find_by_exact_path(target)
        .or_else(|| lookup.find_by_base_name(target))
        .or_else(|| {
            ASSET_FOLDERS
                .iter()
                .find_map(|folder| lookup.find_by_relative_path(folder, base_name))
        })
}

/// Embed target without Obsidian's `|alias` or `|300` size suffix
fn embed_target(raw: &str) -> &str {
    raw.split('|').next().unwrap_or(raw).trim()
}

fn markdown_destination(path: &str) -> String {
    if path.chars().any(char::is_whitespace) {
        format!("<{path}>")
    } else {
        path.to_string()
    }
}

fn render_embed<L: FileLookup + ?Sized>(target: &str, note_dir: &str, lookup: &L) -> String {
    match locate_embed(target, note_dir, lookup) {
        Some(file) if is_video_path(&file.name) => {
            let url = lookup.resource_url_of(&file);
            format!(
                r#"<video controls autoplay muted loop style="{VIDEO_STYLE}"><source src="{url}" type="video/{}"></video>"#,
                file.extension
            )
        }
        Some(file) => format!("![{target}]({})", markdown_destination(&file.path)),
        None => {
            debug!(target = %target, note_dir = %note_dir, "Embed did not resolve, keeping literal reference");
            if is_video_path(target) {
                format!(r#"<video controls style="max-width:100%;max-height:100%"><source src="{target}"></video>"#)
            } else {
                format!("![{target}]({})", markdown_destination(target))
            }
        }
    }
}

/// Replace every `![[name]]` in `content` in place
///
/// Unresolvable references degrade to literal markup instead of failing.
pub fn resolve_embeds<L: FileLookup + ?Sized>(content: &str, note_dir: &str, lookup: &L) -> String {
    WIKI_EMBED
        .replace_all(content, |caps: &Captures| {
            let target = embed_target(&caps[1]);
            render_embed(target, note_dir, lookup)
        })
        .into_owned()
}
