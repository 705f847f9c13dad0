//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Projection message protocol constants
pub mod protocol {
    /// Discriminator carried by every message exchanged with the popout
    pub const PLUGIN_ID: &str = "vtt-card-display";
}

/// Zoom limits and increments for the projection surface
pub mod zoom {
    pub const MIN: f32 = 0.25;
    pub const MAX: f32 = 5.0;

    /// Step applied by the zoom in/out buttons
    pub const BUTTON_STEP: f32 = 0.25;

    /// Step applied per mouse wheel notch
    pub const WHEEL_STEP: f32 = 0.1;
}

/// Rotation constants
pub mod rotation {
    /// Rotation is quantized to quarter turns
    pub const STEP_DEGREES: i32 = 90;

    /// How long the rotation indicator stays visible after a change
    pub const INDICATOR_MS: u64 = 1500;
}

/// Grid overlay defaults and bounds
pub mod grid {
    pub const DEFAULT_SIZE: u32 = 50;
    pub const DEFAULT_COLOR: &str = "#ffffff";
    pub const DEFAULT_OPACITY: f32 = 0.3;

    pub const MIN_SIZE: u32 = 10;
    pub const MAX_SIZE: u32 = 200;
    pub const MIN_OPACITY: f32 = 0.05;
    pub const MAX_OPACITY: f32 = 1.0;

    /// Content size assumed when the natural size is unknown
    pub const FALLBACK_WIDTH: u32 = 800;
    pub const FALLBACK_HEIGHT: u32 = 600;
}

/// Fog of war defaults and bounds
pub mod fog {
    pub const DEFAULT_REVEAL_SIZE: u32 = 30;
    pub const MIN_REVEAL_SIZE: u32 = 10;
    pub const MAX_REVEAL_SIZE: u32 = 150;
}

/// Recognized media file extensions (lower-case, without dot)
pub mod media {
    pub const IMAGE_EXTENSIONS: &[&str] = &[
        "png", "jpg", "jpeg", "bmp", "tif", "tiff", "gif", "webp", "svg", "ico",
    ];

    pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogg", "mov"];

    /// Markdown notes are valid map entries
    pub const NOTE_EXTENSION: &str = "md";

    /// Conventional asset folders searched for unresolved embeds
    pub const ASSET_FOLDERS: &[&str] = &["images", "_resources"];
}

/// Plugin-side projector constants
pub mod projector {
    /// Session history keeps only the newest entries
    pub const HISTORY_LIMIT: usize = 500;

    /// A requestCurrent arriving this soon after a projection is ignored
    pub const REQUEST_SUPPRESS_MS: u64 = 500;

    pub const DEFAULT_CARDS_FOLDER: &str = "Cards";
    pub const DEFAULT_MAPS_FOLDER: &str = "Maps";
}

/// Popout window defaults
pub mod popout {
    pub const TITLE: &str = "VTT Projection";
    pub const DEFAULT_LEFT: i32 = 1920;
    pub const DEFAULT_TOP: i32 = 0;
    pub const DEFAULT_WIDTH: u32 = 800;
    pub const DEFAULT_HEIGHT: u32 = 600;
    pub const MIN_DIMENSION: u32 = 200;
}

/// Configuration file constants
pub mod config {
    /// Application directory under the XDG config dir
    pub const APP_DIR: &str = "vtt-card-display";

    pub const FILENAME: &str = "config.toml";

    pub const HISTORY_FILENAME: &str = "history.json";

    /// Environment variable overriding the configured vault root
    pub const VAULT_ENV: &str = "VTT_VAULT";
}

/// Control socket constants
pub mod ipc {
    /// Socket path relative to XDG_RUNTIME_DIR (or the cache dir)
    pub const SOCKET_PATH: &str = "vtt-card-display/control.sock";

    /// Maximum frame size (10 MB) to prevent DoS via memory exhaustion
    pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;
}
