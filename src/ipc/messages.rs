//! IPC message types for CLI ↔ projector communication

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::protocol::SettingsUpdate;

/// Requests sent from a CLI invocation to the running projector
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ControlRequest {
    /// Show the card at `index`, or re-send the current one
    ShowCard { index: Option<usize> },

    Next,

    Prev,

    /// Project any vault media file
    ShowMedia { path: String },

    /// Project a note with player/DM filtering
    ShowNote { path: String },

    /// Project a map by vault path or name
    ShowMap { path: String },

    /// Project a registered item
    ShowItem { id: String },

    /// Project the favorite at `index` in the configured list
    ShowFavorite { index: usize },

    /// Update overlay settings (persisted and forwarded to the popout)
    ApplySettings(SettingsUpdate),

    /// Re-read the config file and rescan the vault
    Reload,

    /// Write session history into the vault as a markdown note
    ExportHistory,

    /// Health check
    Ping,

    /// Close the popout and exit
    Shutdown,
}

/// Responses sent from the projector back to the CLI
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ControlResponse {
    /// Request processed
    Ready,

    /// Health check response
    Pong,

    /// History written to this path
    Exported(PathBuf),

    Error(String),
}
