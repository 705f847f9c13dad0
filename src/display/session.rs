//! The popout's state machine: what is on screen and how it got there
//!
//! A `DisplaySession` consumes `ProjectionMessage`s and input events and
//! never touches a window. The egui front end reads it back every frame.

use anyhow::{Result, bail};
use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::color::HexColor;
use crate::media::is_video_source;
use crate::protocol::{MediaKind, ProjectionMessage, SettingsUpdate};

use super::export;
use super::geometry::Size;
use super::grid;
use super::html::{contains_media, first_image_src, first_video_src};
use super::state::DisplayState;

/// How an HTML fragment is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlLayout {
    /// Text document: padded, styled, scrolls
    Scrollable,
    /// Map-like: media fills the window, no padding or scroll
    FullBleed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Empty,
    Image { src: String },
    Video { src: String },
    Html { html: String, layout: HtmlLayout },
}

impl Content {
    pub fn name(&self) -> &'static str {
        match self {
            Content::Empty => "empty",
            Content::Image { .. } => "image",
            Content::Video { .. } => "video",
            Content::Html { .. } => "html",
        }
    }
}

/// Decoded pixels for the current content
#[derive(Debug, Clone)]
pub struct LoadedMedia {
    pub src: String,
    pub image: RgbaImage,
}

impl LoadedMedia {
    pub fn natural_size(&self) -> Size {
        Size::from_pixels(self.image.width(), self.image.height())
    }
}

pub struct DisplaySession {
    pub state: DisplayState,
    content: Content,
    /// Source whose pixels the current content is waiting for
    wanted_src: Option<String>,
    /// Set when a new source needs loading, taken by the front end
    pending_load: Option<String>,
    /// Last decoded frame; outlives a new `show` until its pixels arrive
    media: Option<LoadedMedia>,
    /// The wanted source failed to decode
    load_failed: bool,
    viewport: Size,
    outbox: Vec<ProjectionMessage>,
    title: Option<String>,
    /// Bumped whenever the grid raster would come out different
    grid_generation: u64,
    /// Bumped whenever `media` changes
    media_generation: u64,
}

impl DisplaySession {
    pub fn new(viewport: Size) -> Self {
        Self {
            state: DisplayState::default(),
            content: Content::Empty,
            wanted_src: None,
            pending_load: None,
            media: None,
            load_failed: false,
            viewport,
            outbox: Vec::new(),
            title: None,
            grid_generation: 0,
            media_generation: 0,
        }
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn media(&self) -> Option<&LoadedMedia> {
        self.media.as_ref()
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    /// True once the displayed frame belongs to the current content
    pub fn media_is_current(&self) -> bool {
        match (&self.media, &self.wanted_src) {
            (Some(media), Some(wanted)) => &media.src == wanted,
            _ => false,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn grid_generation(&self) -> u64 {
        self.grid_generation
    }

    pub fn media_generation(&self) -> u64 {
        self.media_generation
    }

    /// Natural size of the displayed media, once decoded
    pub fn natural_size(&self) -> Option<Size> {
        self.media.as_ref().map(LoadedMedia::natural_size)
    }

    /// Apply one inbound message
    pub fn handle(&mut self, message: ProjectionMessage) {
        debug!(message_type = message.type_name(), "Popout received message");
        match message {
            ProjectionMessage::Show {
                src,
                kind,
                html,
                player_info,
                title,
            } => self.show(src, kind, html, player_info, title),
            ProjectionMessage::ShowHtml { html, player_info, title } => self.show_html(html, player_info, title),
            ProjectionMessage::Settings(update) => self.apply_settings(&update),
            ProjectionMessage::Next | ProjectionMessage::Prev | ProjectionMessage::RequestCurrent => {
                // Popout → projector only
                debug!(message_type = message.type_name(), "Ignoring outbound-only message");
            }
        }
    }

    fn show(
        &mut self,
        src: String,
        kind: Option<MediaKind>,
        html: Option<String>,
        player_info: Option<String>,
        title: Option<String>,
    ) {
        self.state.reset_for_new_content();
        self.title = title;

        if is_video_source(&src) || kind == Some(MediaKind::Video) {
            info!(kind = ?kind, "Showing video");
            self.set_content(Content::Video { src }, None);
        } else if matches!(kind, Some(MediaKind::Image | MediaKind::Card | MediaKind::Map))
            || (kind.is_none() && !src.is_empty())
        {
            info!(kind = ?kind, "Showing image");
            self.set_content(Content::Image { src: src.clone() }, Some(src));
        } else if kind == Some(MediaKind::Html) {
            self.set_html(html.unwrap_or_default());
        } else {
            debug!(kind = ?kind, "Show message with nothing to display, keeping content");
        }

        // Replaced on every show, cleared when absent
        self.state.player_info_text = player_info.unwrap_or_default();
    }

    fn show_html(&mut self, html: String, player_info: Option<String>, title: Option<String>) {
        self.state.reset_for_new_content();
        self.title = title;
        self.set_html(html);

        // Kept from the previous content unless this message brings its own
        if let Some(info) = player_info.filter(|p| !p.is_empty()) {
            self.state.player_info_text = info;
        }
    }

    fn set_html(&mut self, html: String) {
        let layout = if contains_media(&html) {
            HtmlLayout::FullBleed
        } else {
            HtmlLayout::Scrollable
        };
        let media_src = first_image_src(&html);
        if media_src.is_none() {
            if let Some(src) = first_video_src(&html) {
                info!("Showing HTML whose only media is a video");
                self.set_content(Content::Video { src }, None);
                return;
            }
        }
        info!(layout = ?layout, has_image = media_src.is_some(), "Showing HTML");
        self.set_content(Content::Html { html, layout }, media_src);
    }

    fn set_content(&mut self, content: Content, load: Option<String>) {
        self.content = content;
        self.load_failed = false;
        if load.is_none() && self.media.take().is_some() {
            self.media_generation += 1;
        }
        self.grid_generation += 1;
        self.wanted_src = load.clone();
        self.pending_load = load;
        // Fitted to the retained frame, if any, until new pixels arrive
        self.state.fit(self.natural_size(), self.viewport);
    }

    /// Source the front end should start decoding, if any
    pub fn take_load_request(&mut self) -> Option<String> {
        self.pending_load.take()
    }

    /// Decoded media arrived. Returns false when the source is stale.
    pub fn on_media_loaded(&mut self, src: &str, image: RgbaImage) -> bool {
        if self.wanted_src.as_deref() != Some(src) {
            debug!("Dropping decoded media for a source that is no longer shown");
            return false;
        }
        info!(width = image.width(), height = image.height(), content = self.content.name(), "Media loaded");
        self.load_failed = false;
        self.media = Some(LoadedMedia {
            src: src.to_string(),
            image,
        });
        self.media_generation += 1;
        self.grid_generation += 1;

        if self.state.fog.enabled() {
            let (w, h) = self.viewport_pixels();
            self.state.fog.reset(w, h);
        }
        self.state.fit(self.natural_size(), self.viewport);
        true
    }

    /// Load or decode failure: logged, previous frame kept, no retry
    pub fn on_media_error(&mut self, src: &str, error: &anyhow::Error) {
        let stale = self.wanted_src.as_deref() != Some(src);
        warn!(stale, error = %error, "Failed to load media");
        if !stale {
            self.load_failed = true;
        }
    }

    pub fn on_resize(&mut self, viewport: Size) {
        if viewport == self.viewport {
            return;
        }
        debug!(width = viewport.width, height = viewport.height, "Popout resized");
        self.viewport = viewport;
        let (w, h) = self.viewport_pixels();
        self.state.fog.resize(w, h);
        if self.media.is_none() {
            // Media-less grids cover the viewport
            self.grid_generation += 1;
        }
    }

    fn viewport_pixels(&self) -> (u32, u32) {
        (
            self.viewport.width.max(0.0).round() as u32,
            self.viewport.height.max(0.0).round() as u32,
        )
    }

    /// Update overlay defaults; displayed content is left alone
    pub fn apply_settings(&mut self, update: &SettingsUpdate) {
        if let Some(size) = update.grid_size {
            self.state.grid.set_size(size);
        }
        if let Some(color) = &update.grid_color {
            match HexColor::parse(color) {
                Some(parsed) => self.state.grid.color = parsed,
                None => warn!(color = %color, "Ignoring invalid grid color"),
            }
        }
        if let Some(opacity) = update.grid_opacity {
            self.state.grid.set_opacity(opacity);
        }
        if let Some(size) = update.fog_reveal_size {
            self.state.fog.set_reveal_size(size);
        }
        if let Some(show) = update.show_player_info {
            self.state.player_info_visible = show;
        }
        self.grid_generation += 1;
    }

    pub fn set_grid_enabled(&mut self, enabled: bool) {
        self.state.grid.enabled = enabled;
        self.grid_generation += 1;
    }

    pub fn set_fog_enabled(&mut self, enabled: bool) {
        let (w, h) = self.viewport_pixels();
        self.state.fog.set_enabled(enabled, w, h);
    }

    pub fn reset_fog(&mut self) {
        let (w, h) = self.viewport_pixels();
        self.state.fog.reset(w, h);
    }

    pub fn rotate_clockwise(&mut self) {
        let natural = self.natural_size();
        self.state.rotate_clockwise(natural, self.viewport);
    }

    pub fn rotate_counter_clockwise(&mut self) {
        let natural = self.natural_size();
        self.state.rotate_counter_clockwise(natural, self.viewport);
    }

    pub fn reset_rotation(&mut self) {
        let natural = self.natural_size();
        self.state.set_rotation(0, natural, self.viewport);
    }

    /// Grid raster for the current content, None when the grid is off
    pub fn grid_raster(&self) -> Option<RgbaImage> {
        if !self.state.grid.enabled {
            return None;
        }
        let viewport = match self.content {
            Content::Html { .. } if self.media.is_none() => Some(self.viewport),
            _ => None,
        };
        let (w, h) = grid::raster_extent(self.natural_size(), viewport);
        Some(grid::render(&self.state.grid, w, h))
    }

    /// Flatten image, grid and fog into PNG bytes. Image content only.
    pub fn export_png(&self) -> Result<Vec<u8>> {
        let media = match (&self.content, &self.media) {
            (Content::Image { .. }, Some(media)) if self.media_is_current() => media,
            (Content::Image { .. }, _) if self.load_failed => bail!("Image could not be loaded"),
            (Content::Image { .. }, _) => bail!("Image has not finished loading"),
            (other, _) => bail!("Export supports images only, currently showing {}", other.name()),
        };
        let grid = self.grid_raster();
        let fog = self.state.fog.enabled().then(|| self.state.fog.to_rgba());
        let flattened = export::composite(&media.image, grid.as_ref(), fog.as_ref());
        export::encode_png(&flattened)
    }

    pub fn request_current(&mut self) {
        self.outbox.push(ProjectionMessage::RequestCurrent);
    }

    pub fn request_next(&mut self) {
        self.outbox.push(ProjectionMessage::Next);
    }

    pub fn request_prev(&mut self) {
        self.outbox.push(ProjectionMessage::Prev);
    }

    /// Messages for the projector, oldest first
    pub fn drain_outbound(&mut self) -> Vec<ProjectionMessage> {
        std::mem::take(&mut self.outbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const VIEWPORT: Size = Size::new(800.0, 600.0);

    fn show(src: &str, kind: Option<MediaKind>) -> ProjectionMessage {
        ProjectionMessage::Show {
            src: src.to_string(),
            kind,
            html: None,
            player_info: None,
            title: None,
        }
    }

    fn show_html(html: &str, player_info: Option<&str>) -> ProjectionMessage {
        ProjectionMessage::ShowHtml {
            html: html.to_string(),
            player_info: player_info.map(str::to_string),
            title: None,
        }
    }

    fn pixels(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]))
    }

    #[test]
    fn test_video_detection() {
        let mut session = DisplaySession::new(VIEWPORT);
        for src in ["Maps/storm.webm", "clip.MP4", "data:video/mp4;base64,AAAA"] {
            session.handle(show(src, Some(MediaKind::Map)));
            assert!(matches!(session.content(), Content::Video { .. }), "{src}");
            assert_eq!(session.take_load_request(), None);
        }
    }

    #[test]
    fn test_image_kinds() {
        let mut session = DisplaySession::new(VIEWPORT);
        for kind in [Some(MediaKind::Image), Some(MediaKind::Card), Some(MediaKind::Map), None] {
            session.handle(show("data:image/png;base64,AA", kind));
            assert!(matches!(session.content(), Content::Image { .. }), "{kind:?}");
            assert_eq!(session.take_load_request().as_deref(), Some("data:image/png;base64,AA"));
        }
    }

    #[test]
    fn test_show_without_src_keeps_content() {
        let mut session = DisplaySession::new(VIEWPORT);
        session.handle(show("a.png", None));
        session.handle(show("", None));
        assert_eq!(session.content(), &Content::Image { src: "a.png".to_string() });
    }

    #[test]
    fn test_show_with_html_kind() {
        let mut session = DisplaySession::new(VIEWPORT);
        session.handle(ProjectionMessage::Show {
            src: String::new(),
            kind: Some(MediaKind::Html),
            html: Some("<p>hello</p>".to_string()),
            player_info: None,
            title: None,
        });
        assert!(matches!(session.content(), Content::Html { layout: HtmlLayout::Scrollable, .. }));
    }

    #[test]
    fn test_show_html_layouts() {
        let mut session = DisplaySession::new(VIEWPORT);
        session.handle(show_html("<div><p>AC 15</p></div>", None));
        assert!(matches!(session.content(), Content::Html { layout: HtmlLayout::Scrollable, .. }));
        assert_eq!(session.take_load_request(), None);

        session.handle(show_html(r#"<div><img src="data:image/png;base64,AA"></div>"#, None));
        assert!(matches!(session.content(), Content::Html { layout: HtmlLayout::FullBleed, .. }));
        assert_eq!(session.take_load_request().as_deref(), Some("data:image/png;base64,AA"));
    }

    #[test]
    fn test_player_info_replacement_rules() {
        let mut session = DisplaySession::new(VIEWPORT);
        session.handle(show_html("<p>a</p>", Some("<p>muddy</p>")));
        assert_eq!(session.state.player_info_text, "<p>muddy</p>");

        // showHTML without player info keeps the previous text
        session.handle(show_html("<p>b</p>", None));
        assert_eq!(session.state.player_info_text, "<p>muddy</p>");
        session.handle(show_html("<p>b</p>", Some("")));
        assert_eq!(session.state.player_info_text, "<p>muddy</p>");

        // show without player info clears it
        session.handle(show("a.png", None));
        assert_eq!(session.state.player_info_text, "");
    }

    #[test]
    fn test_new_content_resets_rotation_and_pan() {
        let mut session = DisplaySession::new(VIEWPORT);
        session.handle(show("a.png", None));
        session.rotate_clockwise();
        session.state.begin_pan((0.0, 0.0));
        session.state.drag_pan((40.0, 40.0));
        session.handle(show_html("<p>x</p>", None));
        assert_eq!(session.state.rotation().degrees(), 0);
        assert_eq!(session.state.pan(), (0.0, 0.0));
    }

    #[test]
    fn test_media_load_fits_and_stale_results_dropped() {
        let mut session = DisplaySession::new(VIEWPORT);
        session.handle(show("first.png", None));
        session.handle(show("second.png", None));
        assert!(!session.on_media_loaded("first.png", pixels(10, 10)));
        assert!(session.media().is_none());

        session.rotate_clockwise();
        assert!(session.on_media_loaded("second.png", pixels(1000, 500)));
        assert_eq!(session.natural_size(), Some(Size::new(1000.0, 500.0)));
        // loaded after a rotation: fitted for the current quarter turn
        assert_eq!(session.state.rotation().degrees(), 90);
        assert!((session.state.zoom() - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_media_error_keeps_state() {
        let mut session = DisplaySession::new(VIEWPORT);
        session.handle(show("a.png", None));
        assert!(session.on_media_loaded("a.png", pixels(4, 4)));
        session.on_media_error("a.png", &anyhow::anyhow!("boom"));
        assert!(session.media().is_some());
        assert_eq!(session.content(), &Content::Image { src: "a.png".to_string() });
    }

    #[test]
    fn test_settings_leave_content_alone() {
        let mut session = DisplaySession::new(VIEWPORT);
        session.handle(show("a.png", None));
        let before = session.grid_generation();
        session.handle(ProjectionMessage::Settings(SettingsUpdate {
            grid_size: Some(64),
            grid_color: Some("#ff0000".to_string()),
            grid_opacity: Some(0.5),
            fog_reveal_size: Some(40),
            show_player_info: Some(true),
        }));
        assert_eq!(session.content(), &Content::Image { src: "a.png".to_string() });
        assert_eq!(session.state.grid.size, 64);
        assert_eq!(session.state.grid.color, HexColor::rgb(255, 0, 0));
        assert_eq!(session.state.grid.opacity, 0.5);
        assert_eq!(session.state.fog.reveal_size(), 40);
        assert!(session.state.player_info_visible);
        assert!(session.grid_generation() > before);

        session.apply_settings(&SettingsUpdate {
            grid_color: Some("not a color".to_string()),
            ..Default::default()
        });
        assert_eq!(session.state.grid.color, HexColor::rgb(255, 0, 0));
    }

    #[test]
    fn test_grid_raster_sizes() {
        let mut session = DisplaySession::new(VIEWPORT);
        session.set_grid_enabled(true);

        session.handle(show("a.png", None));
        let raster = session.grid_raster().unwrap();
        assert_eq!(raster.dimensions(), (800, 600));

        session.on_media_loaded("a.png", pixels(320, 200));
        assert_eq!(session.grid_raster().unwrap().dimensions(), (320, 200));

        session.handle(show_html("<p>statblock</p>", None));
        session.on_resize(Size::new(1024.0, 768.0));
        assert_eq!(session.grid_raster().unwrap().dimensions(), (1024, 768));

        session.set_grid_enabled(false);
        assert!(session.grid_raster().is_none());
    }

    #[test]
    fn test_fog_tracks_viewport() {
        let mut session = DisplaySession::new(VIEWPORT);
        session.set_fog_enabled(true);
        assert_eq!(session.state.fog.dimensions(), (800, 600));
        session.state.fog.reveal_all();
        session.on_resize(Size::new(400.0, 300.0));
        assert_eq!(session.state.fog.dimensions(), (400, 300));
        assert_eq!(session.state.fog.coverage(), 1.0);
    }

    #[test]
    fn test_export_only_for_loaded_images() {
        let mut session = DisplaySession::new(VIEWPORT);
        assert!(session.export_png().is_err());

        session.handle(show("a.png", None));
        assert!(session.export_png().is_err());
        session.on_media_loaded("a.png", pixels(16, 8));
        let png = session.export_png().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        session.handle(show("clip.webm", None));
        assert!(session.export_png().is_err());
    }

    #[test]
    fn test_outbound_messages() {
        let mut session = DisplaySession::new(VIEWPORT);
        session.request_current();
        session.request_next();
        session.request_prev();
        assert_eq!(
            session.drain_outbound(),
            vec![ProjectionMessage::RequestCurrent, ProjectionMessage::Next, ProjectionMessage::Prev]
        );
        assert!(session.drain_outbound().is_empty());
    }

    #[test]
    fn test_inbound_control_messages_ignored() {
        let mut session = DisplaySession::new(VIEWPORT);
        session.handle(show("a.png", None));
        session.handle(ProjectionMessage::Next);
        session.handle(ProjectionMessage::RequestCurrent);
        assert_eq!(session.content(), &Content::Image { src: "a.png".to_string() });
        assert!(session.drain_outbound().is_empty());
    }

    #[test]
    fn test_failed_load_keeps_previous_frame() {
        let mut session = DisplaySession::new(VIEWPORT);
        session.handle(show("a.png", None));
        assert!(session.on_media_loaded("a.png", pixels(4, 4)));
        let generation = session.media_generation();

        session.handle(show("broken.png", None));
        assert_eq!(session.take_load_request().as_deref(), Some("broken.png"));
        assert_eq!(session.media().map(|m| m.src.as_str()), Some("a.png"));
        assert!(!session.media_is_current());

        session.on_media_error("broken.png", &anyhow::anyhow!("corrupt"));
        assert!(session.load_failed());
        assert_eq!(session.media().map(|m| m.src.as_str()), Some("a.png"));
        assert_eq!(session.media_generation(), generation);
        assert_eq!(session.content(), &Content::Image { src: "broken.png".to_string() });
        assert!(session.export_png().is_err());

        // The next good image clears the failure and swaps the frame
        session.handle(show("c.png", None));
        assert!(!session.load_failed());
        assert!(session.on_media_loaded("c.png", pixels(8, 8)));
        assert!(session.media_is_current());
        assert_eq!(session.natural_size(), Some(Size::new(8.0, 8.0)));
    }

    #[test]
    fn test_stale_error_does_not_flag_current_load() {
        let mut session = DisplaySession::new(VIEWPORT);
        session.handle(show("old.png", None));
        session.handle(show("new.png", None));
        session.on_media_error("old.png", &anyhow::anyhow!("gone"));
        assert!(!session.load_failed());
    }

    #[test]
    fn test_content_without_pixels_drops_frame() {
        let mut session = DisplaySession::new(VIEWPORT);
        session.handle(show("a.png", None));
        session.on_media_loaded("a.png", pixels(4, 4));
        session.handle(show_html("<p>Goblin</p>", None));
        assert!(session.media().is_none());
    }

    #[test]
    fn test_video_only_html_shows_as_video() {
        let mut session = DisplaySession::new(VIEWPORT);
        let html = r#"<div class="vtt-note-image"><video controls autoplay muted loop><source src="data:video/webm;base64,V0VCTQ==" type="video/webm"></video></div>"#;
        session.handle(show_html(html, Some("<p>storm</p>")));
        assert_eq!(
            session.content(),
            &Content::Video { src: "data:video/webm;base64,V0VCTQ==".to_string() }
        );
        assert_eq!(session.take_load_request(), None);
        assert_eq!(session.state.player_info_text, "<p>storm</p>");

        // An image next to the video still wins
        session.handle(show_html(r#"<img src="a.png"><video><source src="b.webm"></video>"#, None));
        assert!(matches!(session.content(), Content::Html { layout: HtmlLayout::FullBleed, .. }));
        assert_eq!(session.take_load_request().as_deref(), Some("a.png"));
    }
}
