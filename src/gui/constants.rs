//! GUI-specific constants for layout, colors and intervals

use egui;

/// Controls panel hides itself after this long without pointer activity
pub const CONTROLS_AUTO_HIDE_MS: u64 = 3000;

/// Status line under the controls (export results, errors)
pub const STATUS_MS: u64 = 4000;

/// Polling interval for shutdown and timed overlays
pub const REPAINT_INTERVAL_MS: u64 = 250;

/// Player info overlay box
pub const PLAYER_INFO_MARGIN: f32 = 16.0;
pub const PLAYER_INFO_MAX_WIDTH: f32 = 350.0;
/// Fraction of the window height the box may take
pub const PLAYER_INFO_MAX_HEIGHT: f32 = 0.6;

/// Layout spacing
pub const ITEM_SPACING: f32 = 8.0;
pub const DOCUMENT_PADDING: f32 = 24.0;

pub const BACKGROUND: egui::Color32 = egui::Color32::BLACK;
pub const TEXT_COLOR: egui::Color32 = egui::Color32::from_rgb(235, 235, 235);
pub const OVERLAY_FILL: egui::Color32 = egui::Color32::from_rgba_premultiplied(0, 0, 0, 200);
pub const STATUS_OK: egui::Color32 = egui::Color32::from_rgb(0, 200, 0);
pub const STATUS_ERROR: egui::Color32 = egui::Color32::from_rgb(220, 60, 60);

pub const INDICATOR_FONT_SIZE: f32 = 28.0;
pub const PLACEHOLDER_FONT_SIZE: f32 = 18.0;
