//! Plugin-side projector
//!
//! Owns the vault, the card deck and the session history, and turns
//! requests ("show card 3", "project this note") into projection messages
//! for the popout.

pub mod deck;
pub mod transport;
pub mod worker;

pub use deck::{Deck, scan_maps};
pub use transport::{ChannelTransport, Transport};
pub use worker::{ProjectorEvent, spawn_projector};

use anyhow::{Context, Result, bail};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::{HistoryKind, ItemKind, Settings, SessionHistory};
use crate::constants::media::NOTE_EXTENSION;
use crate::constants::projector::REQUEST_SUPPRESS_MS;
use crate::media::{is_media_extension, is_video_extension};
use crate::note::{self, MarkdownRenderer, data_url_for, inline_resources};
use crate::protocol::{MediaKind, ProjectionMessage, SettingsUpdate};
use crate::vault::{FileHandle, FileLookup, join};

const NO_CARD_HTML: &str = r#"<div style="color:#fff;padding:24px;text-align:center">No card image available</div>"#;

lazy_static! {
    static ref STATBLOCK_FENCE: Regex = Regex::new(r"(?i)```(?:statblock|stat-block)\n[\s\S]*?```").unwrap();
    static ref MARKDOWN_IMAGE: Regex = Regex::new(r"!\[[^\]]*\]\(([^)]+)\)").unwrap();
}

pub struct Projector<L, R, T> {
    vault: L,
    renderer: R,
    transport: T,
    settings: Settings,
    settings_path: Option<PathBuf>,
    deck: Deck,
    maps: Vec<FileHandle>,
    history: SessionHistory,
    history_path: Option<PathBuf>,
    history_export_dir: PathBuf,
    /// A requestCurrent before this instant is swallowed once
    suppress_until: Option<Instant>,
}

impl<L, R, T> Projector<L, R, T>
where
    L: FileLookup,
    R: MarkdownRenderer,
    T: Transport,
{
    pub fn new(vault: L, renderer: R, transport: T, settings: Settings) -> Self {
        let deck = Deck::scan(&vault, &settings.folder_path);
        let maps = scan_maps(&vault, &settings.maps_folder_path);
        info!(cards = deck.len(), maps = maps.len(), "Projector ready");
        Self {
            vault,
            renderer,
            transport,
            settings,
            settings_path: None,
            deck,
            maps,
            history: SessionHistory::default(),
            history_path: None,
            history_export_dir: PathBuf::from("."),
            suppress_until: None,
        }
    }

    /// Persist settings changes to this file
    pub fn with_settings_path(mut self, path: PathBuf) -> Self {
        self.settings_path = Some(path);
        self
    }

    /// Resume a saved history and keep it saved after every entry
    pub fn with_history(mut self, history: SessionHistory, path: Option<PathBuf>) -> Self {
        self.history = history;
        self.history_path = path;
        self
    }

    /// Where exported history notes are written, normally the vault root
    pub fn with_history_export_dir(mut self, dir: PathBuf) -> Self {
        self.history_export_dir = dir;
        self
    }

    #[cfg(test)]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[cfg(test)]
    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    #[cfg(test)]
    pub fn maps(&self) -> &[FileHandle] {
        &self.maps
    }

    #[cfg(test)]
    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    fn send(&mut self, message: ProjectionMessage) {
        if message.is_projection() {
            self.suppress_until = Some(Instant::now() + Duration::from_millis(REQUEST_SUPPRESS_MS));
        }
        debug!(kind = message.type_name(), "Posting to popout");
        self.transport.post(message);
    }

    fn record(&mut self, path: &str, kind: HistoryKind) {
        self.history.record(path, kind, chrono::Utc::now().timestamp_millis());
        if let Some(path) = &self.history_path {
            if let Err(e) = self.history.save_to(path) {
                warn!(error = ?e, "Failed to save session history");
            }
        }
    }

    fn media_message(&self, file: &FileHandle, kind: MediaKind, title: Option<String>) -> Result<ProjectionMessage> {
        let src = data_url_for(&self.vault, file)?;
        let kind = if is_video_extension(&file.extension) { MediaKind::Video } else { kind };
        Ok(ProjectionMessage::Show {
            src,
            kind: Some(kind),
            html: None,
            player_info: None,
            title: Some(title.unwrap_or_else(|| file.basename().to_string())),
        })
    }

    fn note_message(&self, file: &FileHandle, title: Option<String>) -> Result<ProjectionMessage> {
        let projection = note::prepare_note(&self.vault, &self.renderer, file, self.settings.show_player_info)?;
        Ok(ProjectionMessage::ShowHtml {
            html: projection.html,
            player_info: Some(projection.player_info).filter(|info| !info.trim().is_empty()),
            title: Some(title.unwrap_or(projection.title)),
        })
    }

    fn find(&self, path: &str, what: &str) -> Result<FileHandle> {
        self.vault
            .find_by_exact_path(path)
            .with_context(|| format!("{what} not found: {path}"))
    }

    fn send_current_card(&mut self, title: Option<String>, record: bool) -> Result<()> {
        let Some(card) = self.deck.current().cloned() else {
            warn!(
                folder = %self.settings.folder_path,
                "No cards available to project, add images to the cards folder or set folder_path in the config"
            );
            self.send(ProjectionMessage::ShowHtml {
                html: NO_CARD_HTML.to_string(),
                player_info: None,
                title: None,
            });
            return Ok(());
        };

        let message = self.media_message(&card, MediaKind::Card, title)?;
        info!(path = %card.path, index = self.deck.current_index(), "Projecting card");
        self.send(message);
        if record {
            self.record(&card.path, HistoryKind::Card);
        }
        Ok(())
    }

    /// Show the card at `index`, or the current one
    pub fn project_card(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(index) = index {
            if !self.deck.is_empty() && self.deck.select(index).is_none() {
                bail!("Card index {} out of range, the deck has {} cards", index, self.deck.len());
            }
        }
        self.send_current_card(None, true)
    }

    pub fn next(&mut self) -> Result<()> {
        self.deck.advance();
        self.send_current_card(None, true)
    }

    pub fn prev(&mut self) -> Result<()> {
        self.deck.retreat();
        self.send_current_card(None, true)
    }

    /// Any vault media file, shown as a plain image or video
    pub fn project_media(&mut self, path: &str) -> Result<()> {
        self.project_media_titled(path, None)
    }

    fn project_media_titled(&mut self, path: &str, title: Option<String>) -> Result<()> {
        let file = self.find(path, "Image file")?;
        if !is_media_extension(&file.extension) {
            bail!("{} is not an image or video", file.path);
        }
        let message = self.media_message(&file, MediaKind::Image, title)?;
        info!(path = %file.path, "Projecting media");
        self.send(message);
        Ok(())
    }

    /// Player-safe rendering of a note
    pub fn project_note(&mut self, path: &str) -> Result<()> {
        self.project_note_titled(path, None)
    }

    fn project_note_titled(&mut self, path: &str, title: Option<String>) -> Result<()> {
        let file = self.find(path, "Note")?;
        let message = self.note_message(&file, title)?;
        info!(path = %file.path, include_player_info = self.settings.show_player_info, "Projecting note");
        self.send(message);
        Ok(())
    }

    /// A map by vault path or by name within the maps folder
    pub fn project_map(&mut self, path: &str) -> Result<()> {
        self.project_map_titled(path, None)
    }

    fn project_map_titled(&mut self, path: &str, title: Option<String>) -> Result<()> {
        let file = self
            .vault
            .find_by_exact_path(path)
            .or_else(|| {
                self.maps
                    .iter()
                    .find(|m| m.name == path || m.basename() == path)
                    .cloned()
            })
            .with_context(|| format!("Map not found: {path}"))?;

        let message = if file.extension == NOTE_EXTENSION {
            self.note_message(&file, title)?
        } else if is_media_extension(&file.extension) {
            self.media_message(&file, MediaKind::Map, title)?
        } else {
            bail!("{} is neither a map image nor a note", file.path);
        };

        info!(path = %file.path, "Projecting map");
        self.send(message);
        self.record(&file.path, HistoryKind::Map);
        Ok(())
    }

    /// Dispatch a registered item by its type
    pub fn project_item(&mut self, id: &str) -> Result<()> {
        let item = self
            .settings
            .find_item(id)
            .cloned()
            .with_context(|| format!("No registered item with id {id}"))?;
        debug!(id = %item.id, kind = ?item.kind, value = %item.value, "Projecting registered item");

        match item.kind {
            ItemKind::Image => self.project_media_titled(&item.value, item.title),
            ItemKind::Card => {
                if self.deck.select_path(&item.value).is_none() {
                    bail!("Card not found: {}", item.value);
                }
                self.send_current_card(item.title, true)
            }
            ItemKind::Map => self.project_map_titled(&item.value, item.title),
            ItemKind::Note => self.project_note_titled(&item.value, item.title),
            ItemKind::Statblock => self.project_statblock(&item.value, item.title),
            ItemKind::NoteImage => self.project_note_image(&item.value, item.title),
        }
    }

    /// The note's fenced statblock when it has one, otherwise the whole note
    fn project_statblock(&mut self, path: &str, title: Option<String>) -> Result<()> {
        let file = self.find(path, "Note")?;
        let content = self.vault.read_text(&file)?;
        let source = STATBLOCK_FENCE
            .find(&content)
            .map(|m| m.as_str())
            .unwrap_or(content.as_str());

        let html = self.renderer.render(source, &file.path)?;
        let html = inline_resources(&html, &file.path, &self.vault);
        info!(path = %file.path, "Projecting statblock");
        self.send(ProjectionMessage::ShowHtml {
            html,
            player_info: None,
            title: Some(title.unwrap_or_else(|| file.basename().to_string())),
        });
        Ok(())
    }

    /// First markdown image of a note, without any of its text
    fn project_note_image(&mut self, path: &str, title: Option<String>) -> Result<()> {
        let file = self.find(path, "Note")?;
        let content = self.vault.read_text(&file)?;
        let Some(target) = MARKDOWN_IMAGE.captures(&content).and_then(|c| c.get(1)) else {
            bail!("No image found in note {}", file.path);
        };
        let target = target.as_str().trim();

        let image = self
            .vault
            .find_by_exact_path(target)
            .or_else(|| self.vault.find_by_exact_path(&join(file.parent(), target)))
            .with_context(|| format!("Image not found: {target}"))?;

        let message = self.media_message(&image, MediaKind::Image, title)?;
        info!(note = %file.path, image = %image.path, "Projecting note image");
        self.send(message);
        Ok(())
    }

    /// Favorite at `index`; notes go through the note route
    pub fn project_favorite(&mut self, index: usize) -> Result<()> {
        let Some(path) = self.settings.favorites.get(index).cloned() else {
            bail!(
                "No favorite at index {index} ({} configured)",
                self.settings.favorites.len()
            );
        };
        let file = self.find(&path, "Favorite")?;
        if file.extension == NOTE_EXTENSION {
            self.project_note(&file.path)
        } else {
            self.project_media(&file.path)
        }
    }

    /// Merge an overlay update, persist it and forward it to the popout
    pub fn apply_settings(&mut self, update: &SettingsUpdate) -> Result<()> {
        self.settings.merge_update(update);
        if let Some(path) = &self.settings_path {
            self.settings.save_to(path)?;
        }
        self.send(ProjectionMessage::Settings(self.settings.overlay_update()));
        Ok(())
    }

    /// Re-read the config file and rescan the vault
    pub fn reload(&mut self) -> Result<()> {
        if let Some(path) = &self.settings_path {
            self.settings = Settings::load_from(path);
        }
        self.vault.refresh()?;
        self.deck.rescan(&self.vault, &self.settings.folder_path);
        self.maps = scan_maps(&self.vault, &self.settings.maps_folder_path);
        info!(cards = self.deck.len(), maps = self.maps.len(), "Reloaded vault");
        self.send(ProjectionMessage::Settings(self.settings.overlay_update()));
        Ok(())
    }

    /// Write the session history as a markdown note
    pub fn export_history(&self) -> Result<PathBuf> {
        if self.history.is_empty() {
            bail!("Session history is empty");
        }
        let path = self.history_export_dir.join(SessionHistory::export_filename());
        fs::write(&path, self.history.to_markdown())
            .context(format!("Failed to write session history to {}", path.display()))?;
        info!(path = %path.display(), entries = self.history.len(), "Exported session history");
        Ok(path)
    }

    /// Messages arriving from the popout window
    pub fn handle_popout_message(&mut self, message: ProjectionMessage) -> Result<()> {
        self.handle_popout_message_at(message, Instant::now())
    }

    fn handle_popout_message_at(&mut self, message: ProjectionMessage, now: Instant) -> Result<()> {
        match message {
            ProjectionMessage::Next => self.next(),
            ProjectionMessage::Prev => self.prev(),
            ProjectionMessage::RequestCurrent => {
                if self.suppress_until.take().is_some_and(|until| now < until) {
                    debug!("Ignoring requestCurrent right after a projection");
                    return Ok(());
                }
                self.transport
                    .post(ProjectionMessage::Settings(self.settings.overlay_update()));
                self.send_current_card(None, false)
            }
            other => {
                debug!(kind = other.type_name(), "Ignoring popout message meant for the display");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::transport::testing::RecordingTransport;
    use super::*;
    use crate::config::settings::RegisteredItem;
    use crate::note::CommonMarkRenderer;
    use crate::vault::testing::MemoryVault;

    type TestProjector = Projector<MemoryVault, CommonMarkRenderer, RecordingTransport>;

    fn vault() -> MemoryVault {
        MemoryVault::new()
            .with_file("Cards/a-goblin.png", "PNG")
            .with_file("Cards/b-orc.jpg", "JPG")
            .with_file("Cards/c-ooze.webm", "WEBM")
            .with_file("Cards/_hidden/d.png", "PNG")
            .with_file("Maps/cave.png", "CAVE")
            .with_file("Maps/Old Mill.md", "![[mill.png]]\n# DM Notes\nGhost in the attic.\n")
            .with_file("Maps/mill.png", "MILL")
            .with_file(
                "Notes/Battle.md",
                "![[battlefield.png]]\n# Player Infos\nThe ground is muddy.\n# DM Info\nSecret: trap at 10ft.\n",
            )
            .with_file("Notes/battlefield.png", "BF")
            .with_file("Notes/Ogre.md", "Some lore.\n\n```statblock\nname: Ogre\nhp: 59\n```\n")
            .with_file("Notes/Portrait.md", "Intro\n\n![portrait](art/hero.png)\n")
            .with_file("Notes/art/hero.png", "HERO")
            .with_file("Notes/Plain.md", "Just words.\n")
    }

    fn projector_with(settings: Settings) -> (TestProjector, RecordingTransport) {
        let transport = RecordingTransport::new();
        let projector = Projector::new(vault(), CommonMarkRenderer, transport.clone(), settings);
        (projector, transport)
    }

    fn projector() -> (TestProjector, RecordingTransport) {
        projector_with(Settings::default())
    }

    fn shown(message: Option<ProjectionMessage>) -> (String, Option<MediaKind>, Option<String>) {
        match message {
            Some(ProjectionMessage::Show { src, kind, title, .. }) => (src, kind, title),
            other => panic!("expected show, got {other:?}"),
        }
    }

    fn shown_html(message: Option<ProjectionMessage>) -> (String, Option<String>, Option<String>) {
        match message {
            Some(ProjectionMessage::ShowHtml { html, player_info, title }) => (html, player_info, title),
            other => panic!("expected showHTML, got {other:?}"),
        }
    }

    #[test]
    fn test_deck_skips_hidden_folders() {
        let (projector, _) = projector();
        assert_eq!(projector.deck().len(), 3);
        assert_eq!(projector.maps().len(), 3);
    }

    #[test]
    fn test_project_card_sends_data_url() {
        let (mut projector, transport) = projector();
        projector.project_card(Some(1)).unwrap();
        let (src, kind, title) = shown(transport.last());
        assert_eq!(src, "data:image/jpeg;base64,SlBH");
        assert_eq!(kind, Some(MediaKind::Card));
        assert_eq!(title.as_deref(), Some("b-orc"));
        assert_eq!(projector.history().len(), 1);
    }

    #[test]
    fn test_video_cards_are_marked_video() {
        let (mut projector, transport) = projector();
        projector.project_card(Some(2)).unwrap();
        let (src, kind, _) = shown(transport.last());
        assert!(src.starts_with("data:video/webm;base64,"));
        assert_eq!(kind, Some(MediaKind::Video));
    }

    #[test]
    fn test_out_of_range_card_is_an_error() {
        let (mut projector, transport) = projector();
        assert!(projector.project_card(Some(10)).is_err());
        assert!(transport.take().is_empty());
    }

    #[test]
    fn test_next_and_prev_wrap() {
        let (mut projector, transport) = projector();
        projector.prev().unwrap();
        assert_eq!(shown(transport.last()).2.as_deref(), Some("c-ooze"));
        projector.next().unwrap();
        assert_eq!(shown(transport.last()).2.as_deref(), Some("a-goblin"));
    }

    #[test]
    fn test_empty_deck_sends_placeholder() {
        let settings = Settings {
            folder_path: "Nothing".to_string(),
            ..Settings::default()
        };
        let (mut projector, transport) = projector_with(settings);
        projector.next().unwrap();
        let (html, _, _) = shown_html(transport.last());
        assert!(html.contains("No card image available"));
        assert!(projector.history().is_empty());
    }

    #[test]
    fn test_project_note_filters_dm_content() {
        let settings = Settings {
            show_player_info: true,
            ..Settings::default()
        };
        let (mut projector, transport) = projector_with(settings);
        projector.project_note("Notes/Battle.md").unwrap();
        let (html, player_info, title) = shown_html(transport.last());
        assert!(html.contains("data:image/png;base64,QkY="));
        assert!(!html.contains("trap"));
        assert_eq!(player_info.as_deref().map(str::trim), Some("<p>The ground is muddy.</p>"));
        assert_eq!(title.as_deref(), Some("Battle"));
    }

    #[test]
    fn test_project_note_without_player_info() {
        let (mut projector, transport) = projector();
        projector.project_note("Notes/Battle.md").unwrap();
        let (_, player_info, _) = shown_html(transport.last());
        assert!(player_info.is_none());
    }

    #[test]
    fn test_project_map_by_name_and_kind() {
        let (mut projector, transport) = projector();
        projector.project_map("cave").unwrap();
        let (_, kind, _) = shown(transport.last());
        assert_eq!(kind, Some(MediaKind::Map));

        projector.project_map("Maps/Old Mill.md").unwrap();
        let (html, _, _) = shown_html(transport.last());
        assert!(html.contains("data:image/png;base64,TUlMTA=="));
        assert!(!html.contains("Ghost"));

        let kinds: Vec<_> = projector.history().entries().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![HistoryKind::Map, HistoryKind::Map]);
        assert!(projector.project_map("Atlantis").is_err());
    }

    #[test]
    fn test_project_media_rejects_notes() {
        let (mut projector, _) = projector();
        assert!(projector.project_media("Notes/Plain.md").is_err());
        assert!(projector.project_media("Notes/missing.png").is_err());
        assert!(projector.project_media("Notes/art/hero.png").is_ok());
    }

    fn with_items(items: Vec<RegisteredItem>) -> (TestProjector, RecordingTransport) {
        projector_with(Settings {
            items,
            ..Settings::default()
        })
    }

    fn item(id: &str, kind: ItemKind, value: &str) -> RegisteredItem {
        RegisteredItem {
            id: id.to_string(),
            title: Some(format!("{id} title")),
            kind,
            value: value.to_string(),
        }
    }

    #[test]
    fn test_items_dispatch_by_type() {
        let (mut projector, transport) = with_items(vec![
            item("ogre", ItemKind::Statblock, "Notes/Ogre.md"),
            item("plain", ItemKind::Statblock, "Notes/Plain.md"),
            item("hero", ItemKind::NoteImage, "Notes/Portrait.md"),
            item("orc", ItemKind::Card, "Cards/b-orc.jpg"),
            item("pic", ItemKind::Image, "Maps/cave.png"),
            item("battle", ItemKind::Note, "Notes/Battle.md"),
        ]);

        projector.project_item("ogre").unwrap();
        let (html, _, title) = shown_html(transport.last());
        assert!(html.contains("hp: 59"));
        assert!(!html.contains("Some lore"));
        assert_eq!(title.as_deref(), Some("ogre title"));

        projector.project_item("plain").unwrap();
        assert!(shown_html(transport.last()).0.contains("Just words."));

        projector.project_item("hero").unwrap();
        let (src, kind, _) = shown(transport.last());
        assert_eq!(src, "data:image/png;base64,SEVSTw==");
        assert_eq!(kind, Some(MediaKind::Image));

        projector.project_item("orc").unwrap();
        assert_eq!(projector.deck().current_index(), 1);
        assert_eq!(shown(transport.last()).1, Some(MediaKind::Card));

        projector.project_item("pic").unwrap();
        assert_eq!(shown(transport.last()).2.as_deref(), Some("pic title"));

        projector.project_item("battle").unwrap();
        assert_eq!(shown_html(transport.last()).2.as_deref(), Some("battle title"));

        assert!(projector.project_item("nope").is_err());
    }

    #[test]
    fn test_item_errors() {
        let (mut projector, _) = with_items(vec![
            item("no-image", ItemKind::NoteImage, "Notes/Plain.md"),
            item("gone", ItemKind::Card, "Cards/zombie.png"),
        ]);
        let err = projector.project_item("no-image").unwrap_err();
        assert!(err.to_string().contains("No image found"));
        let err = projector.project_item("gone").unwrap_err();
        assert!(err.to_string().contains("Card not found"));
    }

    #[test]
    fn test_project_favorite() {
        let mut settings = Settings::default();
        settings.favorites = vec![
            "Maps/cave.png".to_string(),
            "Notes/Battle.md".to_string(),
            "Maps/gone.png".to_string(),
        ];
        let (mut projector, transport) = projector_with(settings);

        projector.project_favorite(0).unwrap();
        let (src, kind, _) = shown(transport.last());
        assert_eq!(src, "data:image/png;base64,Q0FWRQ==");
        assert_eq!(kind, Some(MediaKind::Image));

        projector.project_favorite(1).unwrap();
        let (html, _, title) = shown_html(transport.last());
        assert!(!html.contains("trap"));
        assert_eq!(title.as_deref(), Some("Battle"));

        assert!(projector.project_favorite(2).is_err());
        let err = projector.project_favorite(7).unwrap_err();
        assert!(err.to_string().contains("3 configured"));
    }

    #[test]
    fn test_request_current_suppressed_after_projection() {
        let (mut projector, transport) = projector();
        projector.project_card(Some(0)).unwrap();
        transport.take();

        projector.handle_popout_message(ProjectionMessage::RequestCurrent).unwrap();
        assert!(transport.take().is_empty());

        // suppression is one-shot
        projector.handle_popout_message(ProjectionMessage::RequestCurrent).unwrap();
        let sent = transport.take();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].type_name(), "settings");
        assert_eq!(sent[1].type_name(), "show");
        assert_eq!(projector.history().len(), 1);
    }

    #[test]
    fn test_request_current_after_window_resends() {
        let (mut projector, transport) = projector();
        projector.project_card(Some(0)).unwrap();
        transport.take();

        let later = Instant::now() + Duration::from_millis(REQUEST_SUPPRESS_MS + 100);
        projector
            .handle_popout_message_at(ProjectionMessage::RequestCurrent, later)
            .unwrap();
        assert_eq!(transport.take().len(), 2);
    }

    #[test]
    fn test_popout_navigation() {
        let (mut projector, transport) = projector();
        projector.handle_popout_message(ProjectionMessage::Next).unwrap();
        assert_eq!(projector.deck().current_index(), 1);
        projector.handle_popout_message(ProjectionMessage::Prev).unwrap();
        assert_eq!(projector.deck().current_index(), 0);
        transport.take();
        projector
            .handle_popout_message(ProjectionMessage::Settings(SettingsUpdate::default()))
            .unwrap();
        assert!(transport.take().is_empty());
    }

    #[test]
    fn test_apply_settings_clamps_persists_and_forwards() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let (projector, transport) = projector();
        let mut projector = projector.with_settings_path(path.clone());

        let update = SettingsUpdate {
            grid_size: Some(5000),
            show_player_info: Some(true),
            ..SettingsUpdate::default()
        };
        projector.apply_settings(&update).unwrap();

        assert_eq!(projector.settings().grid_size, 200);
        match transport.last() {
            Some(ProjectionMessage::Settings(sent)) => {
                assert_eq!(sent.grid_size, Some(200));
                assert_eq!(sent.show_player_info, Some(true));
            }
            other => panic!("expected settings, got {other:?}"),
        }
        let saved = fs::read_to_string(&path).unwrap();
        assert!(saved.contains("grid_size = 200"));
    }

    #[test]
    fn test_export_history() {
        let dir = tempfile::tempdir().unwrap();
        let (projector, _) = projector();
        let mut projector = projector.with_history_export_dir(dir.path().to_path_buf());
        assert!(projector.export_history().is_err());

        projector.project_card(Some(0)).unwrap();
        projector.project_map("cave").unwrap();
        let path = projector.export_history().unwrap();
        let md = fs::read_to_string(&path).unwrap();
        assert!(md.starts_with("# Session History"));
        assert!(md.contains("[[Cards/a-goblin.png|a-goblin]]"));
        assert!(md.contains("[[Maps/cave.png|cave]]"));
    }

    #[test]
    fn test_history_persists_after_each_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let (projector, _) = projector();
        let mut projector = projector.with_history(SessionHistory::default(), Some(path.clone()));
        projector.next().unwrap();
        assert_eq!(SessionHistory::load_from(&path).len(), 1);
    }
}
