//! Flattening the projected image with its overlays into a PNG

use anyhow::{Context, Result};
use image::RgbaImage;
use image::imageops;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Paint order: image, grid, fog, all anchored at the image origin
///
/// The grid raster already matches the image's natural size. The fog raster
/// is window-sized and is overlaid 1:1, cropped to the image.
pub fn composite(image: &RgbaImage, grid: Option<&RgbaImage>, fog: Option<&RgbaImage>) -> RgbaImage {
    let mut canvas = image.clone();
    if let Some(grid) = grid {
        imageops::overlay(&mut canvas, grid, 0, 0);
    }
    if let Some(fog) = fog {
        imageops::overlay(&mut canvas, fog, 0, 0);
    }
    canvas
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut bytes, image.width(), image.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().context("Failed to write PNG header")?;
        writer
            .write_image_data(image.as_raw())
            .context("Failed to write PNG image data")?;
        writer.finish().context("Failed to finish PNG stream")?;
    }
    Ok(bytes)
}

pub fn export_filename(unix_millis: i64) -> String {
    format!("vtt-export-{unix_millis}.png")
}

/// Write an export into `dir`, named after the current time
pub fn write_export(dir: &Path, png: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create export directory {}", dir.display()))?;
    let path = dir.join(export_filename(chrono::Utc::now().timestamp_millis()));
    fs::write(&path, png).with_context(|| format!("Failed to write export to {}", path.display()))?;
    info!(path = %path.display(), bytes = png.len(), "Exported projection");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_composite_paint_order() {
        let image = RgbaImage::from_pixel(4, 4, Rgba([200, 0, 0, 255]));
        let mut grid = RgbaImage::new(4, 4);
        grid.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
        grid.put_pixel(1, 0, Rgba([255, 255, 255, 255]));
        let mut fog = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        fog.put_pixel(1, 0, Rgba([0, 0, 0, 0]));

        let out = composite(&image, Some(&grid), Some(&fog));
        assert_eq!(out.dimensions(), (4, 4));
        // fog over grid
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        // revealed grid line
        assert_eq!(out.get_pixel(1, 0), &Rgba([255, 255, 255, 255]));
        // outside the fog raster
        assert_eq!(out.get_pixel(3, 3), &Rgba([200, 0, 0, 255]));
    }

    #[test]
    fn test_encode_png_decodes_back() {
        let image = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]));
        let bytes = encode_png(&image).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_write_export_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_export(dir.path(), b"png").unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("vtt-export-") && name.ends_with(".png"), "{name}");
        assert_eq!(export_filename(42), "vtt-export-42.png");
    }
}
