//! Layout math for fitting rotated content into the window

use crate::constants::zoom;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self::new(width as f32, height as f32)
    }

    /// Zero or negative along either axis
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn swapped(&self) -> Self {
        Self::new(self.height, self.width)
    }

    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }
}

/// Quarter-turn rotation, always one of 0, 90, 180, 270
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rotation(u16);

impl Rotation {
    /// Wrap any degree value into [0, 360), snapped down to a quarter turn
    pub fn from_degrees(degrees: i32) -> Self {
        let wrapped = degrees.rem_euclid(360);
        Self((wrapped - wrapped % 90) as u16)
    }

    pub fn degrees(&self) -> u16 {
        self.0
    }

    pub fn offset(&self, delta: i32) -> Self {
        Self::from_degrees(self.0 as i32 + delta)
    }

    /// True at 90 and 270, where width and height trade places on screen
    pub fn is_sideways(&self) -> bool {
        self.0 == 90 || self.0 == 270
    }

    pub fn radians(&self) -> f32 {
        (self.0 as f32).to_radians()
    }
}

/// Scale at which `natural` is contained by `viewport` (object-fit: contain)
pub fn contain_scale(natural: Size, viewport: Size) -> f32 {
    (viewport.width / natural.width).min(viewport.height / natural.height)
}

/// Size of the content box at zoom 1, before rotation
pub fn contained_size(natural: Size, viewport: Size) -> Size {
    natural.scaled(contain_scale(natural, viewport))
}

/// Zoom that makes the rotated, contained content touch the viewport on one
/// axis without exceeding it on the other
///
/// None when either size is degenerate.
pub fn fit_zoom(natural: Size, viewport: Size, rotation: Rotation) -> Option<f32> {
    if natural.is_empty() || viewport.is_empty() {
        return None;
    }
    let displayed = contained_size(natural, viewport);
    let effective = if rotation.is_sideways() { displayed.swapped() } else { displayed };
    let needed = (viewport.width / effective.width).min(viewport.height / effective.height);
    Some(clamp_zoom(needed))
}

pub fn clamp_zoom(value: f32) -> f32 {
    if value.is_nan() {
        return 1.0;
    }
    value.clamp(zoom::MIN, zoom::MAX)
}
