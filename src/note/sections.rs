//! Splits a note into the player-facing parts and throws away DM-only text
//!
//! Sections are introduced by markdown headings. The heading text alone
//! decides which section follows; body text never reclassifies anything.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Projection-button directive blocks, removed before anything else
    static ref DIRECTIVE_BLOCK: Regex = Regex::new(r"(?s)```vtt-project.*?```").unwrap();

    static ref HEADING: Regex = Regex::new(r"^#+\s*(.*)$").unwrap();

    /// "Player Info" / "Player Infos" on their own carry no information once
    /// rendered inside the overlay box, so that exact heading is dropped
    static ref CANONICAL_PLAYER_HEADING: Regex = Regex::new(r"^player\s*infos?$").unwrap();
}

const DM_MARKERS: &[&str] = &["dm info", "dm-info", "dminfo", "gm info", "gamemaster", "dm note"];
const DM_LABELS: &[&str] = &["dm", "story", "story generator"];

const PLAYER_MARKERS: &[&str] = &[
    "player info",
    "player-info",
    "playerinfo",
    "introduction to player",
    "player introduction",
    "to player",
    "for player",
];

/// Section a line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Main,
    Player,
    Dm,
}

/// Result of splitting a note for projection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteSections {
    /// Main content: everything outside player and DM sections
    pub image_content: String,
    /// Player section content, empty unless inclusion was requested
    pub player_info_content: String,
}

/// Classify a heading's text. DM wins over player when both match.
/// Returns None for headings that don't start a recognized section.
pub fn classify_heading(text: &str) -> Option<SectionKind> {
    let text = text.trim().to_lowercase();

    if DM_MARKERS.iter().any(|m| text.contains(m)) || DM_LABELS.contains(&text.as_str()) {
        return Some(SectionKind::Dm);
    }

    if PLAYER_MARKERS.iter().any(|m| text.contains(m)) {
        return Some(SectionKind::Player);
    }

    None
}

fn is_canonical_player_heading(text: &str) -> bool {
    CANONICAL_PLAYER_HEADING.is_match(&text.trim().to_lowercase())
}

/// Remove every ```vtt-project fenced block
pub fn strip_directive_blocks(content: &str) -> String {
    DIRECTIVE_BLOCK.replace_all(content, "").into_owned()
}

/// Split note content into image/main and player-info streams
///
/// Lines under a DM heading are dropped unconditionally. Headings that match
/// neither family leave the current section in place, so sub-headings inside
/// a DM section stay hidden.
pub fn split_sections(content: &str, include_player_info: bool) -> NoteSections {
    let cleaned = strip_directive_blocks(content);

    let mut image_lines: Vec<&str> = Vec::new();
    let mut player_lines: Vec<&str> = Vec::new();
    let mut current = SectionKind::Main;

    for line in cleaned.split('\n') {
        if let Some(caps) = HEADING.captures(line) {
            let text = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            match classify_heading(text) {
                Some(SectionKind::Dm) => {
                    current = SectionKind::Dm;
                    continue;
                }
                Some(SectionKind::Player) => {
                    current = SectionKind::Player;
                    if include_player_info && !is_canonical_player_heading(text) {
                        player_lines.push(line);
                    }
                    continue;
                }
                // Unrecognized headings fall through as ordinary lines
                Some(SectionKind::Main) | None => {}
            }
        }

        match current {
            SectionKind::Main => image_lines.push(line),
            SectionKind::Player if include_player_info => player_lines.push(line),
            SectionKind::Player | SectionKind::Dm => {}
        }
    }

    NoteSections {
        image_content: image_lines.join("\n"),
        player_info_content: player_lines.join("\n"),
    }
}
