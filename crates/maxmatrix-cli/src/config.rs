//! Configuration management.

use anyhow::{Context, Result};
use maxmatrix_hw::{PanelGeometry, DEFAULT_INTENSITY, PANEL_HEIGHT, PANEL_WIDTH};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chain configuration
    #[serde(default)]
    pub chain: ChainSettings,

    /// Panel configuration
    #[serde(default)]
    pub panel: PanelSettings,

    /// Output rendering
    #[serde(default)]
    pub render: RenderSettings,
}

/// Chain configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSettings {
    /// Number of chained devices (clamped to 14)
    #[serde(default = "default_devices")]
    pub devices: u8,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            devices: default_devices(),
        }
    }
}

/// Per-panel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelSettings {
    /// Columns per panel (1-8)
    #[serde(default = "default_width")]
    pub width: u8,

    /// Rows per panel (1-8)
    #[serde(default = "default_height")]
    pub height: u8,

    /// Brightness (0-15)
    #[serde(default = "default_intensity")]
    pub intensity: u8,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            intensity: default_intensity(),
        }
    }
}

/// Rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Glyph for a lit LED
    #[serde(default = "default_on")]
    pub on: String,

    /// Glyph for a dark LED
    #[serde(default = "default_off")]
    pub off: String,

    /// PNG pixels per LED
    #[serde(default = "default_scale")]
    pub scale: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            on: default_on(),
            off: default_off(),
            scale: default_scale(),
        }
    }
}

// Default value functions
fn default_devices() -> u8 {
    4
}

fn default_width() -> u8 {
    PANEL_WIDTH
}

fn default_height() -> u8 {
    PANEL_HEIGHT
}

fn default_intensity() -> u8 {
    DEFAULT_INTENSITY
}

fn default_on() -> String {
    "#".to_string()
}

fn default_off() -> String {
    ".".to_string()
}

fn default_scale() -> u32 {
    8
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path.as_ref(), content).context("Failed to write configuration file")?;
        Ok(())
    }

    /// Validated panel geometry.
    pub fn panel_geometry(&self) -> Result<PanelGeometry> {
        PanelGeometry::new(self.panel.width, self.panel.height).context("Invalid [panel] section")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.chain.devices, 4);
        assert_eq!(config.panel.width, 8);
        assert_eq!(config.panel.height, 8);
        assert_eq!(config.panel.intensity, 15);
        assert_eq!(config.render.on, "#");
        assert_eq!(config.render.scale, 8);
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [chain]
            devices = 2

            [panel]
            height = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.chain.devices, 2);
        assert_eq!(config.panel.width, 8);
        let panel = config.panel_geometry().unwrap();
        assert_eq!(panel.height(), 5);
    }

    #[test]
    fn test_bundled_default_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/default.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.chain.devices, 4);
        assert_eq!(config.panel.intensity, 15);
        assert_eq!(config.render.scale, 8);
    }

    #[test]
    fn test_invalid_geometry() {
        let mut config = Config::default();
        config.panel.width = 9;
        assert!(config.panel_geometry().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path =
            std::env::temp_dir().join(format!("maxmatrix-config-{}.toml", std::process::id()));
        let mut config = Config::default();
        config.chain.devices = 7;
        config.render.off = " ".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.chain.devices, 7);
        assert_eq!(loaded.render.off, " ");
        std::fs::remove_file(&path).unwrap();
    }
}
