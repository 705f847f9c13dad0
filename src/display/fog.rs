//! Fog of war: an opaque mask over the whole window that the DM wipes away
//!
//! The mask lives in window space and never follows the content's zoom, pan
//! or rotation. Revealing is destructive and a resize re-fogs everything.

use image::{Rgba, RgbaImage};

use crate::constants::fog;

const OPAQUE: u8 = 255;
const CLEAR: u8 = 0;

#[derive(Debug, Clone)]
pub struct FogOfWar {
    enabled: bool,
    reveal_size: u32,
    width: u32,
    height: u32,
    /// Row-major alpha, 255 = fogged
    alpha: Vec<u8>,
    /// Bumped on every mutation so renderers know when to re-upload
    generation: u64,
}

impl Default for FogOfWar {
    fn default() -> Self {
        Self {
            enabled: false,
            reveal_size: fog::DEFAULT_REVEAL_SIZE,
            width: 0,
            height: 0,
            alpha: Vec::new(),
            generation: 0,
        }
    }
}

impl FogOfWar {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn reveal_size(&self) -> u32 {
        self.reveal_size
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn set_reveal_size(&mut self, size: u32) {
        self.reveal_size = size.clamp(fog::MIN_REVEAL_SIZE, fog::MAX_REVEAL_SIZE);
    }

    /// Turning fog on always starts fully fogged at the given window size
    pub fn set_enabled(&mut self, enabled: bool, width: u32, height: u32) {
        self.enabled = enabled;
        if enabled {
            self.reset(width, height);
        }
    }

    /// Re-fog the whole window
    pub fn reset(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.alpha = vec![OPAQUE; width as usize * height as usize];
        self.generation += 1;
    }

    /// Window resized. Revealed areas are not carried over.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.enabled && (width, height) != (self.width, self.height) {
            self.reset(width, height);
        }
    }

    /// Clear a disc of radius `reveal_size` centered on a window position
    pub fn reveal_at(&mut self, x: f32, y: f32) {
        if !self.enabled || self.alpha.is_empty() {
            return;
        }
        let radius = self.reveal_size as f32;
        let min_x = (x - radius).floor().max(0.0) as u32;
        let min_y = (y - radius).floor().max(0.0) as u32;
        let max_x = ((x + radius).ceil().max(0.0) as u32).min(self.width);
        let max_y = ((y + radius).ceil().max(0.0) as u32).min(self.height);
        let radius_sq = radius * radius;

        for py in min_y..max_y {
            for px in min_x..max_x {
                // Pixel centers, like a canvas clip path
                let dx = px as f32 + 0.5 - x;
                let dy = py as f32 + 0.5 - y;
                if dx * dx + dy * dy <= radius_sq {
                    self.alpha[(py * self.width + px) as usize] = CLEAR;
                }
            }
        }
        self.generation += 1;
    }

    pub fn reveal_all(&mut self) {
        self.alpha.fill(CLEAR);
        self.generation += 1;
    }

    pub fn is_fogged(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.alpha[(y * self.width + x) as usize] == OPAQUE
    }

    /// Share of the window still under fog, 0.0 to 1.0
    pub fn coverage(&self) -> f32 {
        if self.alpha.is_empty() {
            return 0.0;
        }
        let fogged = self.alpha.iter().filter(|a| **a == OPAQUE).count();
        fogged as f32 / self.alpha.len() as f32
    }

    /// Black RGBA raster with the mask as alpha
    pub fn to_rgba(&self) -> RgbaImage {
        let mut raster = RgbaImage::new(self.width, self.height);
        for (pixel, alpha) in raster.pixels_mut().zip(&self.alpha) {
            *pixel = Rgba([0, 0, 0, *alpha]);
        }
        raster
    }
}
