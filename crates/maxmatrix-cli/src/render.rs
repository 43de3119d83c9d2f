//! Rendering of the virtual chain for terminal and file output.

use anyhow::{bail, Context, Result};
use maxmatrix_hw::{ChainConfig, Framebuffer, VirtualChain};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// LED colour at full intensity.
const LIT_RGB: [u8; 3] = [255, 48, 16];

/// Colour of a dark LED.
const DARK_RGB: [u8; 3] = [40, 8, 8];

/// Machine-readable state dump.
#[derive(Debug, Serialize)]
pub struct Snapshot {
    pub devices: u8,
    pub panel_width: u8,
    pub panel_height: u8,
    pub layout: String,
    pub transactions: u64,
    /// Framebuffer columns, left to right.
    pub framebuffer: Vec<u8>,
    /// Column registers read back from the virtual devices.
    pub device_columns: Vec<u8>,
}

impl Snapshot {
    pub fn capture(
        config: &ChainConfig,
        framebuffer: &Framebuffer,
        chain: &VirtualChain,
        transactions: u64,
    ) -> Self {
        let panel = config.panel();
        Self {
            devices: config.devices(),
            panel_width: panel.width(),
            panel_height: panel.height(),
            layout: framebuffer.layout().to_string(),
            transactions,
            framebuffer: framebuffer.to_vec(),
            device_columns: chain.columns(panel.width()),
        }
    }
}

fn is_lit(chain: &VirtualChain, config: &ChainConfig, column: usize, row: u8) -> bool {
    config
        .locate(column)
        .and_then(|(device, local)| chain.device(device).map(|d| d.is_lit(local, row)))
        .unwrap_or(false)
}

/// Draws the chain as text, one line per row.
pub fn ascii(chain: &VirtualChain, config: &ChainConfig, on: &str, off: &str) -> String {
    let mut out = String::new();
    for row in 0..config.panel().height() {
        for column in 0..config.columns() {
            out.push_str(if is_lit(chain, config, column, row) {
                on
            } else {
                off
            });
        }
        out.push('\n');
    }
    out
}

/// Scales a colour by the device intensity register (0-15).
fn shade(rgb: [u8; 3], intensity: u8) -> [u8; 3] {
    let level = u16::from(intensity.min(15)) + 1;
    rgb.map(|c| ((u16::from(c) * level) / 16) as u8)
}

/// Builds the RGB pixels of a screenshot, `scale` pixels per LED.
fn rgb_pixels(
    chain: &VirtualChain,
    config: &ChainConfig,
    scale: u32,
) -> Result<(u32, u32, Vec<u8>)> {
    let width = u32::try_from(config.columns())
        .ok()
        .and_then(|columns| columns.checked_mul(scale));
    let height = u32::from(config.panel().height()).checked_mul(scale);
    let (Some(width), Some(height)) = (width, height) else {
        bail!("Screenshot scale {} is too large", scale);
    };
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(3))
        .with_context(|| format!("Screenshot scale {} is too large", scale))?;
    let mut data = Vec::with_capacity(len);

    for y in 0..height {
        let row = (y / scale) as u8;
        for x in 0..width {
            let column = (x / scale) as usize;
            let color = if is_lit(chain, config, column, row) {
                let intensity = config
                    .locate(column)
                    .and_then(|(device, _)| chain.device(device))
                    .map(|d| d.intensity)
                    .unwrap_or(15);
                shade(LIT_RGB, intensity)
            } else {
                DARK_RGB
            };
            data.extend_from_slice(&color);
        }
    }

    Ok((width, height, data))
}

/// Writes a PNG screenshot of the chain.
pub fn write_png<P: AsRef<Path>>(
    path: P,
    chain: &VirtualChain,
    config: &ChainConfig,
    scale: u32,
) -> Result<()> {
    let scale = scale.max(1);
    let (width, height, data) = rgb_pixels(chain, config, scale)?;

    let file = File::create(path.as_ref()).context("Failed to create screenshot file")?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use maxmatrix_hw::{MaxMatrix, PanelGeometry};

    fn lit_chain() -> (VirtualChain, ChainConfig) {
        let chain = VirtualChain::new(2);
        let (data, load, clock) = chain.pins();
        let mut matrix = MaxMatrix::new(data, load, clock, 2);
        matrix.init().unwrap();
        matrix.set_column(0, 0b0000_0001).unwrap();
        matrix.set_column(15, 0b1000_0000).unwrap();
        let config = *matrix.config();
        (chain, config)
    }

    #[test]
    fn test_ascii() {
        let (chain, config) = lit_chain();
        let text = ascii(&chain, &config, "#", ".");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "#...............");
        assert_eq!(lines[3], "................");
        assert_eq!(lines[7], "...............#");
    }

    #[test]
    fn test_shade() {
        assert_eq!(shade(LIT_RGB, 15), LIT_RGB);
        assert_eq!(shade([160, 0, 0], 0), [10, 0, 0]);
    }

    #[test]
    fn test_rgb_pixels() {
        let (chain, config) = lit_chain();
        let (width, height, data) = rgb_pixels(&chain, &config, 2).unwrap();
        assert_eq!((width, height), (32, 16));
        assert_eq!(data.len(), 32 * 16 * 3);
        assert_eq!(data[..3], LIT_RGB);
        assert_eq!(data[6..9], DARK_RGB);
    }

    #[test]
    fn test_oversized_scale_is_rejected() {
        let chain = VirtualChain::new(14);
        let config = ChainConfig::new(14, PanelGeometry::default());
        assert!(rgb_pixels(&chain, &config, 50_000_000).is_err());
        assert!(rgb_pixels(&chain, &config, u32::MAX).is_err());

        let path = std::env::temp_dir().join(format!("maxmatrix-huge-{}.png", std::process::id()));
        assert!(write_png(&path, &chain, &config, u32::MAX).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_snapshot_serializes() {
        let (chain, config) = lit_chain();
        let fb = Framebuffer::new(config.columns(), PanelGeometry::default());
        let snapshot = Snapshot::capture(&config, &fb, &chain, 14);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["devices"], 2);
        assert_eq!(json["device_columns"][15], 128);
        assert_eq!(json["framebuffer"].as_array().unwrap().len(), 16);
    }
}
