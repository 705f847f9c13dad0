//! Interactive view state of the projection surface

use crate::constants::{rotation, zoom};

use super::fog::FogOfWar;
use super::geometry::{Rotation, Size, clamp_zoom, contained_size, fit_zoom};
use super::grid::GridSettings;

/// Where the content box ends up on screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Center of the box in window coordinates
    pub center: (f32, f32),
    /// Box size before rotation is applied
    pub size: Size,
    pub rotation: Rotation,
}

#[derive(Debug, Clone)]
pub struct DisplayState {
    zoom: f32,
    pan: (f32, f32),
    rotation: Rotation,
    /// Pointer minus pan at the moment a drag started
    drag_anchor: Option<(f32, f32)>,

    pub grid: GridSettings,
    pub fog: FogOfWar,

    pub player_info_visible: bool,
    pub player_info_text: String,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: (0.0, 0.0),
            rotation: Rotation::default(),
            drag_anchor: None,
            grid: GridSettings::default(),
            fog: FogOfWar::default(),
            player_info_visible: false,
            player_info_text: String::new(),
        }
    }
}

impl DisplayState {
    #[cfg(test)]
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    #[cfg(test)]
    pub fn pan(&self) -> (f32, f32) {
        self.pan
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn is_panning(&self) -> bool {
        self.drag_anchor.is_some()
    }

    pub fn set_zoom(&mut self, value: f32) {
        self.zoom = clamp_zoom(value);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + zoom::BUTTON_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - zoom::BUTTON_STEP);
    }

    /// One wheel notch; scrolling up zooms in
    pub fn wheel(&mut self, scroll_up: bool) {
        let delta = if scroll_up { zoom::WHEEL_STEP } else { -zoom::WHEEL_STEP };
        self.set_zoom(self.zoom + delta);
    }

    pub fn reset_view(&mut self) {
        self.zoom = 1.0;
        self.pan = (0.0, 0.0);
    }

    /// Pick the zoom that fits the content at the current rotation.
    /// Without known content dimensions zoom is reset to 1.
    pub fn fit(&mut self, natural: Option<Size>, viewport: Size) {
        self.zoom = natural
            .and_then(|natural| fit_zoom(natural, viewport, self.rotation))
            .unwrap_or(1.0);
    }

    /// Any rotation change recenters and re-fits
    pub fn set_rotation(&mut self, degrees: i32, natural: Option<Size>, viewport: Size) {
        self.rotation = Rotation::from_degrees(degrees);
        self.pan = (0.0, 0.0);
        self.drag_anchor = None;
        self.fit(natural, viewport);
    }

    pub fn rotate_clockwise(&mut self, natural: Option<Size>, viewport: Size) {
        let next = self.rotation.offset(rotation::STEP_DEGREES);
        self.set_rotation(next.degrees() as i32, natural, viewport);
    }

    pub fn rotate_counter_clockwise(&mut self, natural: Option<Size>, viewport: Size) {
        let next = self.rotation.offset(-rotation::STEP_DEGREES);
        self.set_rotation(next.degrees() as i32, natural, viewport);
    }

    pub fn begin_pan(&mut self, pointer: (f32, f32)) {
        self.drag_anchor = Some((pointer.0 - self.pan.0, pointer.1 - self.pan.1));
    }

    /// Pan is unbounded; content may be dragged fully off-screen
    pub fn drag_pan(&mut self, pointer: (f32, f32)) {
        if let Some(anchor) = self.drag_anchor {
            self.pan = (pointer.0 - anchor.0, pointer.1 - anchor.1);
        }
    }

    pub fn end_pan(&mut self) {
        self.drag_anchor = None;
    }

    /// New content: rotation back to 0 and pan recentered. Zoom, grid and
    /// fog settings carry over.
    pub fn reset_for_new_content(&mut self) {
        self.rotation = Rotation::default();
        self.pan = (0.0, 0.0);
        self.drag_anchor = None;
    }

    /// Screen placement of content with the given natural size
    pub fn placement(&self, natural: Size, viewport: Size) -> Placement {
        let base = if natural.is_empty() || viewport.is_empty() {
            natural
        } else {
            contained_size(natural, viewport)
        };
        Placement {
            center: (viewport.width / 2.0 + self.pan.0, viewport.height / 2.0 + self.pan.1),
            size: base.scaled(self.zoom),
            rotation: self.rotation,
        }
    }

    /// Text for the zoom readout ("150%")
    pub fn zoom_label(&self) -> String {
        format!("{}%", (self.zoom * 100.0).round() as i32)
    }

    /// Overlay shows only when toggled on and there is something to show
    pub fn player_info_shown(&self) -> bool {
        self.player_info_visible && !self.player_info_text.trim().is_empty()
    }
}
