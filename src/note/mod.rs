//! Note projection pipeline
//!
//! raw text → sections → embeds → markdown → inlined HTML → composed document

pub mod compose;
pub mod embeds;
pub mod inline;
pub mod markdown;
pub mod sections;

pub use compose::compose_projection;
pub use embeds::resolve_embeds;
pub use inline::{data_url_for, inline_resources};
pub use markdown::{CommonMarkRenderer, MarkdownRenderer};
pub use sections::split_sections;

use anyhow::{Context, Result};
use tracing::debug;

use crate::vault::{FileHandle, FileLookup};

/// A note ready to be sent to the popout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteProjection {
    pub html: String,
    /// Rendered player section, empty when excluded or absent
    pub player_info: String,
    pub title: String,
}

/// Run a vault note through the whole pipeline
///
/// The player section is returned separately rather than composed into the
/// document; the popout draws its own overlay box for it.
pub fn prepare_note<L, R>(lookup: &L, renderer: &R, file: &FileHandle, include_player_info: bool) -> Result<NoteProjection>
where
    L: FileLookup + ?Sized,
    R: MarkdownRenderer + ?Sized,
{
    let raw = lookup
        .read_text(file)
        .with_context(|| format!("Failed to read note {}", file.path))?;

    let sections = split_sections(&raw, include_player_info);
    let resolved = resolve_embeds(&sections.image_content, file.parent(), lookup);

    let image_html = renderer
        .render(&resolved, &file.path)
        .with_context(|| format!("Failed to render {}", file.path))?;
    let image_html = inline_resources(&image_html, &file.path, lookup);

    let player_info = if sections.player_info_content.trim().is_empty() {
        String::new()
    } else {
        let rendered = renderer
            .render(&sections.player_info_content, &file.path)
            .with_context(|| format!("Failed to render player info of {}", file.path))?;
        inline_resources(&rendered, &file.path, lookup)
    };

    debug!(
        path = %file.path,
        image_bytes = image_html.len(),
        player_info_bytes = player_info.len(),
        "Prepared note projection"
    );

    Ok(NoteProjection {
        html: compose_projection(&image_html, ""),
        player_info,
        title: file.basename().to_string(),
    })
}
