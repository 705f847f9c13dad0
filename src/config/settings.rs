//! Persistent user settings
//!
//! Stored as TOML under the XDG config dir. Every field has a default, so a
//! partial file (or one from an older version) still loads.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::color::HexColor;
use crate::constants::{config, fog, grid, popout, projector};
use crate::protocol::SettingsUpdate;

/// What a registered item projects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemKind {
    /// Any vault media file
    Image,
    /// A card from the deck folder
    Card,
    /// A map from the maps folder (media or note)
    Map,
    /// The statblock of a note, rendered as a scrollable document
    Statblock,
    /// A note's image section only, no player info
    NoteImage,
    /// A note with player/DM filtering
    Note,
}

/// A named shortcut to something projectable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Vault path of the target
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Vault directory. `VTT_VAULT` overrides it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_root: Option<PathBuf>,

    /// Card deck folder, relative to the vault
    pub folder_path: String,
    pub maps_folder_path: String,

    pub popout_left: i32,
    pub popout_top: i32,
    pub popout_width: u32,
    pub popout_height: u32,

    /// Include the player section of notes in projections
    pub show_player_info: bool,

    pub grid_size: u32,
    pub grid_color: String,
    pub grid_opacity: f32,
    pub fog_reveal_size: u32,

    /// Where popout exports are written (downloads dir when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error, overridden by LOG_LEVEL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    pub favorites: Vec<String>,
    pub items: Vec<RegisteredItem>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_root: None,
            folder_path: projector::DEFAULT_CARDS_FOLDER.to_string(),
            maps_folder_path: projector::DEFAULT_MAPS_FOLDER.to_string(),
            popout_left: popout::DEFAULT_LEFT,
            popout_top: popout::DEFAULT_TOP,
            popout_width: popout::DEFAULT_WIDTH,
            popout_height: popout::DEFAULT_HEIGHT,
            show_player_info: false,
            grid_size: grid::DEFAULT_SIZE,
            grid_color: grid::DEFAULT_COLOR.to_string(),
            grid_opacity: grid::DEFAULT_OPACITY,
            fog_reveal_size: fog::DEFAULT_REVEAL_SIZE,
            export_dir: None,
            log_level: None,
            favorites: Vec::new(),
            items: Vec::new(),
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(config::APP_DIR);
        path.push(config::FILENAME);
        path
    }

    /// Load from the default location, writing defaults on first run
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// A broken file is reported and left untouched; defaults are used
    pub fn load_from(path: &Path) -> Self {
        let mut settings = match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Settings>(&contents) {
                Ok(settings) => {
                    info!(path = %path.display(), "Loaded settings");
                    settings
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to parse config file");
                    error!(path = %path.display(), "The file has been preserved, using defaults until it is fixed");
                    Settings::default()
                }
            },
            Err(_) => {
                let settings = Settings::default();
                match settings.save_to(path) {
                    Ok(()) => info!(path = %path.display(), "Generated config file for user to edit (env vars still override)"),
                    Err(e) => error!(error = ?e, "Failed to save default config"),
                }
                settings
            }
        };

        settings.apply_env_overrides();
        settings.validate_and_clamp();
        settings
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        fs::write(path, contents).context(format!("Failed to write config file to {}", path.display()))?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(vault) = env::var(config::VAULT_ENV) {
            let vault = vault.trim();
            if !vault.is_empty() {
                self.vault_root = Some(PathBuf::from(vault));
            }
        }
    }

    /// Clamp values to safe ranges. Called after loading and after edits.
    pub fn validate_and_clamp(&mut self) {
        if self.grid_size < grid::MIN_SIZE || self.grid_size > grid::MAX_SIZE {
            let clamped = self.grid_size.clamp(grid::MIN_SIZE, grid::MAX_SIZE);
            warn!(grid_size = self.grid_size, using = clamped, "grid_size out of range, clamping");
            self.grid_size = clamped;
        }

        if self.grid_opacity.is_nan() {
            warn!(using = grid::DEFAULT_OPACITY, "grid_opacity is not a number, using default");
            self.grid_opacity = grid::DEFAULT_OPACITY;
        } else if self.grid_opacity < grid::MIN_OPACITY || self.grid_opacity > grid::MAX_OPACITY {
            let clamped = self.grid_opacity.clamp(grid::MIN_OPACITY, grid::MAX_OPACITY);
            warn!(grid_opacity = self.grid_opacity, using = clamped, "grid_opacity out of range, clamping");
            self.grid_opacity = clamped;
        }

        if HexColor::parse(&self.grid_color).is_none() {
            warn!(grid_color = %self.grid_color, using = grid::DEFAULT_COLOR, "Invalid grid_color hex, using default");
            self.grid_color = grid::DEFAULT_COLOR.to_string();
        }

        if self.fog_reveal_size < fog::MIN_REVEAL_SIZE || self.fog_reveal_size > fog::MAX_REVEAL_SIZE {
            let clamped = self.fog_reveal_size.clamp(fog::MIN_REVEAL_SIZE, fog::MAX_REVEAL_SIZE);
            warn!(fog_reveal_size = self.fog_reveal_size, using = clamped, "fog_reveal_size out of range, clamping");
            self.fog_reveal_size = clamped;
        }

        if self.popout_width < popout::MIN_DIMENSION {
            warn!(popout_width = self.popout_width, min = popout::MIN_DIMENSION, "popout_width below minimum, clamping");
            self.popout_width = popout::MIN_DIMENSION;
        }
        if self.popout_height < popout::MIN_DIMENSION {
            warn!(popout_height = self.popout_height, min = popout::MIN_DIMENSION, "popout_height below minimum, clamping");
            self.popout_height = popout::MIN_DIMENSION;
        }

        if self.folder_path.trim().is_empty() {
            warn!(using = projector::DEFAULT_CARDS_FOLDER, "folder_path is empty, using default");
            self.folder_path = projector::DEFAULT_CARDS_FOLDER.to_string();
        }
        if self.maps_folder_path.trim().is_empty() {
            warn!(using = projector::DEFAULT_MAPS_FOLDER, "maps_folder_path is empty, using default");
            self.maps_folder_path = projector::DEFAULT_MAPS_FOLDER.to_string();
        }
    }

    /// Apply a partial overlay update, as sent from the CLI
    pub fn merge_update(&mut self, update: &SettingsUpdate) {
        if let Some(size) = update.grid_size {
            self.grid_size = size;
        }
        if let Some(color) = &update.grid_color {
            self.grid_color = color.clone();
        }
        if let Some(opacity) = update.grid_opacity {
            self.grid_opacity = opacity;
        }
        if let Some(size) = update.fog_reveal_size {
            self.fog_reveal_size = size;
        }
        if let Some(show) = update.show_player_info {
            self.show_player_info = show;
        }
        self.validate_and_clamp();
    }

    /// Full settings message for syncing a freshly opened popout
    pub fn overlay_update(&self) -> SettingsUpdate {
        SettingsUpdate {
            grid_size: Some(self.grid_size),
            grid_color: Some(self.grid_color.clone()),
            grid_opacity: Some(self.grid_opacity),
            fog_reveal_size: Some(self.fog_reveal_size),
            show_player_info: Some(self.show_player_info),
        }
    }

    pub fn find_item(&self, id: &str) -> Option<&RegisteredItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .or_else(dirs::download_dir)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.folder_path, "Cards");
        assert_eq!(settings.maps_folder_path, "Maps");
        assert_eq!((settings.popout_left, settings.popout_top), (1920, 0));
        assert_eq!((settings.popout_width, settings.popout_height), (800, 600));
        assert!(!settings.show_player_info);
        assert_eq!(settings.grid_size, 50);
        assert_eq!(settings.grid_color, "#ffffff");
        assert_eq!(settings.grid_opacity, 0.3);
        assert_eq!(settings.fog_reveal_size, 30);
    }

    #[test]
    fn test_validate_and_clamp() {
        let mut settings = Settings {
            grid_size: 5,
            grid_opacity: 2.0,
            grid_color: "purple".to_string(),
            fog_reveal_size: 500,
            popout_width: 50,
            popout_height: 10,
            folder_path: "  ".to_string(),
            ..Default::default()
        };
        settings.validate_and_clamp();
        assert_eq!(settings.grid_size, 10);
        assert_eq!(settings.grid_opacity, 1.0);
        assert_eq!(settings.grid_color, "#ffffff");
        assert_eq!(settings.fog_reveal_size, 150);
        assert_eq!(settings.popout_width, 200);
        assert_eq!(settings.popout_height, 200);
        assert_eq!(settings.folder_path, "Cards");

        settings.grid_opacity = f32::NAN;
        settings.validate_and_clamp();
        assert_eq!(settings.grid_opacity, 0.3);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let contents = r#"
folder_path = "Decks/Monsters"
grid_size = 70

[[items]]
id = "goblin"
type = "card"
value = "Decks/Monsters/goblin.png"

[[items]]
id = "cave"
title = "The Cave"
type = "note-image"
value = "Maps/Cave.md"
"#;
        let settings: Settings = toml::from_str(contents).unwrap();
        assert_eq!(settings.folder_path, "Decks/Monsters");
        assert_eq!(settings.grid_size, 70);
        assert_eq!(settings.maps_folder_path, "Maps");
        assert_eq!(settings.items.len(), 2);
        assert_eq!(settings.items[1].kind, ItemKind::NoteImage);
        assert_eq!(settings.find_item("cave").and_then(|i| i.title.as_deref()), Some("The Cave"));
        assert!(settings.find_item("missing").is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.show_player_info = true;
        settings.favorites = vec!["Cards/goblin.png".to_string()];
        settings.items.push(RegisteredItem {
            id: "m1".to_string(),
            title: None,
            kind: ItemKind::Map,
            value: "Maps/cave.png".to_string(),
        });
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path);
        assert!(loaded.show_player_info);
        assert_eq!(loaded.favorites, settings.favorites);
        assert_eq!(loaded.items, settings.items);
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let settings = Settings::load_from(&path);
        assert!(path.exists());
        assert_eq!(settings.grid_size, 50);
    }

    #[test]
    fn test_broken_file_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "grid_size = \"lots\"").unwrap();
        let settings = Settings::load_from(&path);
        assert_eq!(settings.grid_size, 50);
        assert_eq!(fs::read_to_string(&path).unwrap(), "grid_size = \"lots\"");
    }

    #[test]
    fn test_merge_update_clamps() {
        let mut settings = Settings::default();
        settings.merge_update(&SettingsUpdate {
            grid_size: Some(1000),
            show_player_info: Some(true),
            ..Default::default()
        });
        assert_eq!(settings.grid_size, 200);
        assert!(settings.show_player_info);
        assert_eq!(settings.overlay_update().grid_size, Some(200));
    }
}
