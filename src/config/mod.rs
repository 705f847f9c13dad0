//! Configuration management for vtt-card-display
//!
//! - **settings**: user settings, TOML under the XDG config dir
//! - **history**: session history, JSON under the XDG data dir

pub mod history;
pub mod settings;

pub use history::{HistoryKind, SessionHistory};
pub use settings::{ItemKind, Settings};
