//! Popout projection window implemented with egui/eframe
//!
//! Draws a `DisplaySession` every frame and feeds it input. All display
//! logic lives in the session; this file only translates.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use eframe::{CreationContext, NativeOptions, egui};
use eframe::egui::{Color32, Pos2, Rect, Sense, Vec2};
use image::RgbaImage;
use tracing::{debug, error, info, warn};

use super::constants::*;
use super::loader::{LoadResult, spawn_loader};
use crate::config::Settings;
use crate::constants::{fog, grid, popout, rotation};
use crate::display::export::write_export;
use crate::display::html::to_plain_text;
use crate::display::{Content, DisplaySession, HtmlLayout, Placement, Rotation, Size};
use crate::projector::ProjectorEvent;
use crate::protocol::{self, SettingsUpdate};

/// Channels tying the window to the rest of the process
pub struct PopoutChannels {
    /// Encoded projection messages from the projector
    pub inbound: Receiver<String>,
    /// Popout messages (next/prev/requestCurrent) go back here
    pub projector: Sender<ProjectorEvent>,
    /// Signalled when a CLI client asks the process to quit
    pub shutdown: Receiver<()>,
    /// Filled with the egui context once the window exists
    pub context: Arc<OnceLock<egui::Context>>,
}

struct StatusMessage {
    text: String,
    color: Color32,
    shown_at: Instant,
}

/// GPU texture plus the generation it was built from
struct CachedTexture {
    generation: u64,
    handle: egui::TextureHandle,
}

fn to_color_image(image: &RgbaImage) -> egui::ColorImage {
    egui::ColorImage::from_rgba_unmultiplied(
        [image.width() as usize, image.height() as usize],
        image.as_raw(),
    )
}

/// Rebuild a texture only when its source generation moved
fn sync_texture(
    ctx: &egui::Context,
    slot: &mut Option<CachedTexture>,
    name: &str,
    generation: u64,
    make: impl FnOnce() -> Option<RgbaImage>,
) {
    if slot.as_ref().is_some_and(|t| t.generation == generation) {
        return;
    }
    *slot = make().map(|image| CachedTexture {
        generation,
        handle: ctx.load_texture(name, to_color_image(&image), egui::TextureOptions::LINEAR),
    });
}

/// Textured quad rotated about its center
fn draw_rotated_image(painter: &egui::Painter, texture_id: egui::TextureId, placement: &Placement) {
    let center = Pos2::new(placement.center.0, placement.center.1);
    let half = Vec2::new(placement.size.width, placement.size.height) * 0.5;
    let (s, c) = placement.rotation.radians().sin_cos();
    let rotate = |v: Vec2| Vec2::new(v.x * c - v.y * s, v.x * s + v.y * c);

    let corners = [
        (Vec2::new(-half.x, -half.y), Pos2::new(0.0, 0.0)),
        (Vec2::new(half.x, -half.y), Pos2::new(1.0, 0.0)),
        (Vec2::new(half.x, half.y), Pos2::new(1.0, 1.0)),
        (Vec2::new(-half.x, half.y), Pos2::new(0.0, 1.0)),
    ];

    let mut mesh = egui::epaint::Mesh::with_texture(texture_id);
    for (offset, uv) in corners {
        mesh.vertices.push(egui::epaint::Vertex {
            pos: center + rotate(offset),
            uv,
            color: Color32::WHITE,
        });
    }
    mesh.add_triangle(0, 1, 2);
    mesh.add_triangle(0, 2, 3);
    painter.add(egui::Shape::mesh(mesh));
}

struct PopoutApp {
    session: DisplaySession,
    channels: PopoutChannels,
    loads_tx: Sender<LoadResult>,
    loads_rx: Receiver<LoadResult>,
    media_texture: Option<CachedTexture>,
    grid_texture: Option<CachedTexture>,
    fog_texture: Option<CachedTexture>,
    export_dir: PathBuf,
    last_activity: Instant,
    last_rotation: Rotation,
    rotation_changed_at: Option<Instant>,
    last_title: Option<String>,
    status_message: Option<StatusMessage>,
}

impl PopoutApp {
    fn new(cc: &CreationContext<'_>, settings: &Settings, channels: PopoutChannels) -> Self {
        info!("Initializing popout window");
        if channels.context.set(cc.egui_ctx.clone()).is_err() {
            warn!("Popout context was already registered");
        }

        let viewport = Size::from_pixels(settings.popout_width, settings.popout_height);
        let mut session = DisplaySession::new(viewport);
        session.apply_settings(&settings.overlay_update());
        // Ask for whatever is current as soon as we exist
        session.request_current();

        let (loads_tx, loads_rx) = mpsc::channel();
        Self {
            session,
            channels,
            loads_tx,
            loads_rx,
            media_texture: None,
            grid_texture: None,
            fog_texture: None,
            export_dir: settings.export_dir(),
            last_activity: Instant::now(),
            last_rotation: Rotation::default(),
            rotation_changed_at: None,
            last_title: None,
            status_message: None,
        }
    }

    fn set_status(&mut self, text: String, color: Color32) {
        self.status_message = Some(StatusMessage {
            text,
            color,
            shown_at: Instant::now(),
        });
    }

    fn process_inbound(&mut self, ctx: &egui::Context) {
        while let Ok(raw) = self.channels.inbound.try_recv() {
            match protocol::decode(&raw) {
                Ok(Some(message)) => self.session.handle(message),
                Ok(None) => debug!("Ignoring message without our plugin tag"),
                Err(e) => warn!(error = %e, "Dropping malformed projection message"),
            }
        }

        if let Some(src) = self.session.take_load_request() {
            let ctx = ctx.clone();
            spawn_loader(src, self.loads_tx.clone(), move || ctx.request_repaint());
        }

        while let Ok(LoadResult { src, result }) = self.loads_rx.try_recv() {
            match result {
                Ok(image) => {
                    self.session.on_media_loaded(&src, image);
                }
                Err(e) => self.session.on_media_error(&src, &e),
            }
        }

        let title = self.session.title().map(str::to_string);
        if title != self.last_title {
            let text = match &title {
                Some(t) => format!("{} - {}", popout::TITLE, t),
                None => popout::TITLE.to_string(),
            };
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(text));
            self.last_title = title;
        }
    }

    fn flush_outbound(&mut self) {
        for message in self.session.drain_outbound() {
            let raw = match protocol::encode(&message) {
                Ok(raw) => raw,
                Err(e) => {
                    error!(error = %e, "Failed to encode popout message");
                    continue;
                }
            };
            if self.channels.projector.send(ProjectorEvent::Popout(raw)).is_err() {
                warn!("Projector is gone, dropping popout message");
            }
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        // Text fields in the controls own the keyboard while focused
        if ctx.wants_keyboard_input() {
            return;
        }
        ctx.input(|i| {
            if i.key_pressed(egui::Key::ArrowRight) || i.key_pressed(egui::Key::PageDown) {
                self.session.request_next();
            }
            if i.key_pressed(egui::Key::ArrowLeft) || i.key_pressed(egui::Key::PageUp) {
                self.session.request_prev();
            }
            if i.key_pressed(egui::Key::Plus) || i.key_pressed(egui::Key::Equals) {
                self.session.state.zoom_in();
            }
            if i.key_pressed(egui::Key::Minus) {
                self.session.state.zoom_out();
            }
            if i.key_pressed(egui::Key::Num0) {
                self.session.state.reset_view();
            }
            if i.key_pressed(egui::Key::R) {
                if i.modifiers.shift {
                    self.session.rotate_counter_clockwise();
                } else {
                    self.session.rotate_clockwise();
                }
            }
        });
    }

    fn sync_textures(&mut self, ctx: &egui::Context) {
        let session = &self.session;
        sync_texture(ctx, &mut self.media_texture, "projection-media", session.media_generation(), || {
            session.media().map(|m| m.image.clone())
        });
        sync_texture(ctx, &mut self.grid_texture, "projection-grid", session.grid_generation(), || {
            session.grid_raster()
        });
        if session.state.fog.enabled() {
            sync_texture(ctx, &mut self.fog_texture, "projection-fog", session.state.fog.generation(), || {
                Some(session.state.fog.to_rgba())
            });
        } else {
            self.fog_texture = None;
        }
    }

    fn draw_stage(&mut self, ui: &mut egui::Ui) {
        let rect = ui.max_rect();
        self.session.on_resize(Size::new(rect.width(), rect.height()));
        let response = ui.allocate_rect(rect, Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        match self.session.content().clone() {
            Content::Empty => placeholder(&painter, rect, "Waiting for content"),
            Content::Video { .. } => placeholder(&painter, rect, "Video playback is not available in this window"),
            Content::Image { .. } => self.draw_media(&painter, rect),
            Content::Html { layout: HtmlLayout::FullBleed, .. } if self.media_texture.is_some() => {
                self.draw_media(&painter, rect)
            }
            Content::Html { html, .. } => {
                let text = to_plain_text(&html);
                let mut child = ui.new_child(egui::UiBuilder::new().max_rect(rect.shrink(DOCUMENT_PADDING)));
                egui::ScrollArea::vertical().auto_shrink([false, false]).show(&mut child, |ui| {
                    ui.label(egui::RichText::new(text).color(TEXT_COLOR));
                });
                if let Some(grid) = &self.grid_texture {
                    painter.image(grid.handle.id(), rect, uv_full(), Color32::WHITE);
                }
            }
        }

        if let Some(fog) = &self.fog_texture {
            painter.image(fog.handle.id(), rect, uv_full(), Color32::WHITE);
        }

        self.handle_pointer(ui, rect, &response);
        self.draw_rotation_indicator(&painter, rect);
    }

    fn draw_media(&self, painter: &egui::Painter, rect: Rect) {
        let (Some(media), Some(natural)) = (&self.media_texture, self.session.natural_size()) else {
            let text = if self.session.load_failed() {
                "Image could not be loaded"
            } else {
                "Loading image"
            };
            placeholder(painter, rect, text);
            return;
        };
        let mut placement = self.session.state.placement(natural, self.session.viewport());
        placement.center.0 += rect.min.x;
        placement.center.1 += rect.min.y;
        draw_rotated_image(painter, media.handle.id(), &placement);
        if let Some(grid) = &self.grid_texture {
            draw_rotated_image(painter, grid.handle.id(), &placement);
        }
    }

    fn handle_pointer(&mut self, ui: &egui::Ui, rect: Rect, response: &egui::Response) {
        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                self.session.state.wheel(scroll > 0.0);
            }
        }

        let Some(pointer) = response.interact_pointer_pos() else {
            if self.session.state.is_panning() {
                self.session.state.end_pan();
            }
            return;
        };
        let local = (pointer.x - rect.min.x, pointer.y - rect.min.y);

        if self.session.state.fog.enabled() {
            if response.dragged() || response.clicked() {
                self.session.state.fog.reveal_at(local.0, local.1);
            }
            return;
        }

        if response.drag_started() {
            self.session.state.begin_pan(local);
        } else if response.dragged() {
            self.session.state.drag_pan(local);
        }
        if response.drag_stopped() {
            self.session.state.end_pan();
        }
    }

    fn draw_rotation_indicator(&mut self, painter: &egui::Painter, rect: Rect) {
        let current = self.session.state.rotation();
        if current != self.last_rotation {
            self.last_rotation = current;
            self.rotation_changed_at = Some(Instant::now());
        }
        let Some(changed) = self.rotation_changed_at else {
            return;
        };
        if changed.elapsed() > Duration::from_millis(rotation::INDICATOR_MS) {
            self.rotation_changed_at = None;
            return;
        }
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            format!("Rotation: {}°", current.degrees()),
            egui::FontId::proportional(INDICATOR_FONT_SIZE),
            TEXT_COLOR,
        );
    }

    fn draw_player_info(&self, ctx: &egui::Context) {
        if !self.session.state.player_info_shown() {
            return;
        }
        let text = to_plain_text(&self.session.state.player_info_text);
        let max_height = self.session.viewport().height * PLAYER_INFO_MAX_HEIGHT;

        egui::Area::new(egui::Id::new("player_info"))
            .anchor(egui::Align2::RIGHT_TOP, [-PLAYER_INFO_MARGIN, PLAYER_INFO_MARGIN])
            .show(ctx, |ui| {
                egui::Frame::new()
                    .fill(OVERLAY_FILL)
                    .corner_radius(8.0)
                    .inner_margin(12.0)
                    .show(ui, |ui| {
                        ui.set_max_width(PLAYER_INFO_MAX_WIDTH);
                        egui::ScrollArea::vertical().max_height(max_height).show(ui, |ui| {
                            ui.label(egui::RichText::new(text).color(TEXT_COLOR));
                        });
                    });
            });
    }

    fn draw_controls(&mut self, ctx: &egui::Context) {
        let active = ctx.input(|i| i.pointer.delta() != Vec2::ZERO || i.pointer.any_down());
        if active {
            self.last_activity = Instant::now();
        }
        if self.last_activity.elapsed() > Duration::from_millis(CONTROLS_AUTO_HIDE_MS) {
            return;
        }

        egui::Window::new("Controls")
            .collapsible(true)
            .resizable(false)
            .default_open(false)
            .anchor(egui::Align2::LEFT_BOTTOM, [ITEM_SPACING, -ITEM_SPACING])
            .show(ctx, |ui| self.controls_contents(ui));
    }

    fn controls_contents(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("\u{25C0} Prev").clicked() {
                self.session.request_prev();
            }
            if ui.button("Next \u{25B6}").clicked() {
                self.session.request_next();
            }
        });

        ui.horizontal(|ui| {
            if ui.button("\u{2212}").clicked() {
                self.session.state.zoom_out();
            }
            ui.label(self.session.state.zoom_label());
            if ui.button("+").clicked() {
                self.session.state.zoom_in();
            }
            if ui.button("Fit").clicked() {
                let natural = self.session.natural_size();
                let viewport = self.session.viewport();
                self.session.state.fit(natural, viewport);
            }
        });

        ui.horizontal(|ui| {
            if ui.button("\u{27F2}").on_hover_text("Rotate counter-clockwise").clicked() {
                self.session.rotate_counter_clockwise();
            }
            if ui.button("\u{27F3}").on_hover_text("Rotate clockwise").clicked() {
                self.session.rotate_clockwise();
            }
            if ui.button("Reset rotation").clicked() {
                self.session.reset_rotation();
            }
        });

        ui.separator();

        let mut grid_on = self.session.state.grid.enabled;
        if ui.checkbox(&mut grid_on, "Grid").changed() {
            self.session.set_grid_enabled(grid_on);
        }
        let mut grid_size = self.session.state.grid.size;
        let mut grid_opacity = self.session.state.grid.opacity;
        let size_changed = ui
            .add(egui::Slider::new(&mut grid_size, grid::MIN_SIZE..=grid::MAX_SIZE).text("Cell px"))
            .changed();
        let opacity_changed = ui
            .add(egui::Slider::new(&mut grid_opacity, grid::MIN_OPACITY..=grid::MAX_OPACITY).text("Opacity"))
            .changed();
        if size_changed || opacity_changed {
            self.session.apply_settings(&SettingsUpdate {
                grid_size: Some(grid_size),
                grid_opacity: Some(grid_opacity),
                ..SettingsUpdate::default()
            });
        }

        ui.separator();

        let mut fog_on = self.session.state.fog.enabled();
        if ui.checkbox(&mut fog_on, "Fog of war").changed() {
            self.session.set_fog_enabled(fog_on);
        }
        let mut brush = self.session.state.fog.reveal_size();
        if ui
            .add(egui::Slider::new(&mut brush, fog::MIN_REVEAL_SIZE..=fog::MAX_REVEAL_SIZE).text("Brush px"))
            .changed()
        {
            self.session.state.fog.set_reveal_size(brush);
        }
        ui.horizontal(|ui| {
            if ui.button("Reset fog").clicked() {
                self.session.reset_fog();
            }
            if ui.button("Reveal all").clicked() {
                self.session.state.fog.reveal_all();
            }
        });

        ui.separator();

        ui.checkbox(&mut self.session.state.player_info_visible, "Player info");
        if ui.button("\u{1F4BE} Export PNG").clicked() {
            self.export();
        }

        if let Some(message) = &self.status_message {
            ui.colored_label(message.color, &message.text);
        }
    }

    fn export(&mut self) {
        let result = self
            .session
            .export_png()
            .and_then(|png| write_export(&self.export_dir, &png));
        match result {
            Ok(path) => self.set_status(format!("Saved {}", path.display()), STATUS_OK),
            Err(e) => {
                error!(error = ?e, "Export failed");
                self.set_status(format!("Export failed: {e}"), STATUS_ERROR);
            }
        }
    }
}

fn uv_full() -> Rect {
    Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0))
}

fn placeholder(painter: &egui::Painter, rect: Rect, text: &str) {
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        text,
        egui::FontId::proportional(PLACEHOLDER_FONT_SIZE),
        TEXT_COLOR,
    );
}

impl eframe::App for PopoutApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.channels.shutdown.try_recv().is_ok() {
            info!("Closing popout on request");
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        self.process_inbound(ctx);
        self.handle_keys(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(BACKGROUND))
            .show(ctx, |ui| {
                self.sync_textures(ui.ctx());
                self.draw_stage(ui);
            });

        self.draw_player_info(ctx);
        self.draw_controls(ctx);

        if self
            .status_message
            .as_ref()
            .is_some_and(|m| m.shown_at.elapsed() > Duration::from_millis(STATUS_MS))
        {
            self.status_message = None;
        }

        self.flush_outbound();
        ctx.request_repaint_after(Duration::from_millis(REPAINT_INTERVAL_MS));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Popout exiting");
    }
}

pub fn run_popout(settings: Settings, channels: PopoutChannels) -> Result<()> {
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_position([settings.popout_left as f32, settings.popout_top as f32])
            .with_inner_size([settings.popout_width as f32, settings.popout_height as f32])
            .with_min_inner_size([popout::MIN_DIMENSION as f32, popout::MIN_DIMENSION as f32])
            .with_title(popout::TITLE),
        ..Default::default()
    };

    eframe::run_native(
        popout::TITLE,
        options,
        Box::new(move |cc| Ok(Box::new(PopoutApp::new(cc, &settings, channels)))),
    )
    .map_err(|err| anyhow!("Failed to launch popout window: {err}"))
}
