//! Square grid overlay rasterized at the content's natural resolution

use image::{Rgba, RgbaImage};

use crate::color::HexColor;
use crate::constants::grid;

use super::geometry::Size;

#[derive(Debug, Clone, PartialEq)]
pub struct GridSettings {
    pub enabled: bool,
    /// Cell edge in natural content pixels
    pub size: u32,
    pub color: HexColor,
    pub opacity: f32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            size: grid::DEFAULT_SIZE,
            color: HexColor::WHITE,
            opacity: grid::DEFAULT_OPACITY,
        }
    }
}

impl GridSettings {
    pub fn set_size(&mut self, size: u32) {
        self.size = size.clamp(grid::MIN_SIZE, grid::MAX_SIZE);
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = if opacity.is_nan() {
            grid::DEFAULT_OPACITY
        } else {
            opacity.clamp(grid::MIN_OPACITY, grid::MAX_OPACITY)
        };
    }
}

/// Pixel size of the grid raster
///
/// Media content uses its natural size; HTML without media covers the
/// viewport. Anything unknown falls back to 800×600.
pub fn raster_extent(natural: Option<Size>, viewport: Option<Size>) -> (u32, u32) {
    let size = natural
        .filter(|s| !s.is_empty())
        .or(viewport.filter(|s| !s.is_empty()))
        .map(|s| (s.width.round() as u32, s.height.round() as u32));
    match size {
        Some((w, h)) if w > 0 && h > 0 => (w, h),
        _ => (grid::FALLBACK_WIDTH, grid::FALLBACK_HEIGHT),
    }
}

/// 1px lines every `size` pixels on both axes, starting at 0 and including
/// the far edge when it lands on a multiple
pub fn render(settings: &GridSettings, width: u32, height: u32) -> RgbaImage {
    let mut raster = RgbaImage::new(width, height);
    if width == 0 || height == 0 {
        return raster;
    }
    let pixel = Rgba(settings.color.with_opacity(settings.opacity));
    let step = settings.size.max(1) as usize;

    for x in (0..=width).step_by(step) {
        let column = x.min(width - 1);
        for y in 0..height {
            raster.put_pixel(column, y, pixel);
        }
    }
    for y in (0..=height).step_by(step) {
        let row = y.min(height - 1);
        for x in 0..width {
            raster.put_pixel(x, row, pixel);
        }
    }
    raster
}
