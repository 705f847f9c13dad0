//! Background decoding of projected media

use anyhow::{Context, Result, anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::RgbaImage;
use std::fs;
use std::sync::mpsc::Sender;
use tracing::debug;

/// Decoded pixels, or why there are none
pub struct LoadResult {
    pub src: String,
    pub result: Result<RgbaImage>,
}

/// Fetch the bytes behind a `show` source
fn source_bytes(src: &str) -> Result<Vec<u8>> {
    if let Some(rest) = src.strip_prefix("data:") {
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| anyhow!("Malformed data URL"))?;
        if !header.ends_with(";base64") {
            bail!("Only base64 data URLs are supported");
        }
        return STANDARD.decode(payload.trim()).context("Invalid base64 in data URL");
    }
    if src.starts_with("http://") || src.starts_with("https://") {
        bail!("Remote sources are not fetched: {src}");
    }
    let path = src.strip_prefix("file://").unwrap_or(src).replace("%20", " ");
    fs::read(&path).context(format!("Failed to read {path}"))
}

pub fn decode_source(src: &str) -> Result<RgbaImage> {
    let bytes = source_bytes(src)?;
    let image = image::load_from_memory(&bytes).context("Unsupported or corrupt image")?;
    Ok(image.to_rgba8())
}

/// Decode on a short-lived thread; `wake` runs once the result is queued
pub fn spawn_loader(src: String, tx: Sender<LoadResult>, wake: impl FnOnce() + Send + 'static) {
    std::thread::spawn(move || {
        let result = decode_source(&src);
        debug!(ok = result.is_ok(), "Media decode finished");
        if tx.send(LoadResult { src, result }).is_ok() {
            wake();
        }
    });
}
