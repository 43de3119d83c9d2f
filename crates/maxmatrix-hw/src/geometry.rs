//! Panel and chain geometry.
//!
//! A column register is one byte, so a panel is at most 8 columns wide and
//! 8 rows tall. Devices are laid out left to right: device `k`'s local column
//! `c` is global column `k * width + c`.

use tracing::warn;

use crate::framebuffer::Layout;
use crate::{Error, Result, MAX_DEVICES, PANEL_HEIGHT, PANEL_WIDTH};

/// Pixel grid of a single device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelGeometry {
    width: u8,
    height: u8,
}

impl Default for PanelGeometry {
    fn default() -> Self {
        Self {
            width: PANEL_WIDTH,
            height: PANEL_HEIGHT,
        }
    }
}

impl PanelGeometry {
    /// Creates a geometry, rejecting sides outside 1-8.
    pub fn new(width: u8, height: u8) -> Result<Self> {
        if !(1..=8).contains(&width) || !(1..=8).contains(&height) {
            return Err(Error::InvalidGeometry { width, height });
        }
        Ok(Self { width, height })
    }

    /// Columns per device.
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Rows per device.
    pub fn height(&self) -> u8 {
        self.height
    }

    /// Mask of the bits a column of this panel can hold.
    pub fn row_mask(&self) -> u8 {
        (((1u16 << self.height) - 1) & 0xFF) as u8
    }

    /// Storage strategy for framebuffers of this panel.
    pub fn layout(&self) -> Layout {
        Layout::for_height(self.height)
    }
}

/// Immutable description of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainConfig {
    devices: u8,
    requested: u8,
    panel: PanelGeometry,
}

impl ChainConfig {
    /// Creates a chain description, clamping the device count to [`MAX_DEVICES`].
    pub fn new(devices: u8, panel: PanelGeometry) -> Self {
        let clamped = devices.min(MAX_DEVICES);
        if clamped != devices {
            warn!(
                "Device count {} exceeds maximum, clamped to {}",
                devices, clamped
            );
        }
        Self {
            devices: clamped,
            requested: devices,
            panel,
        }
    }

    /// Effective number of devices.
    pub fn devices(&self) -> u8 {
        self.devices
    }

    /// Device count as passed in.
    pub fn requested_devices(&self) -> u8 {
        self.requested
    }

    /// Returns true if the requested count was reduced.
    pub fn was_clamped(&self) -> bool {
        self.requested != self.devices
    }

    pub fn panel(&self) -> PanelGeometry {
        self.panel
    }

    /// Total columns across the chain.
    pub fn columns(&self) -> usize {
        self.devices as usize * self.panel.width as usize
    }

    /// Maps a global column to (device, local column).
    pub fn locate(&self, column: usize) -> Option<(u8, u8)> {
        if column >= self.columns() {
            return None;
        }
        let width = self.panel.width as usize;
        Some(((column / width) as u8, (column % width) as u8))
    }

    /// Maps (device, local column) to a global column.
    pub fn global_column(&self, device: u8, column: u8) -> Option<usize> {
        if device >= self.devices || column >= self.panel.width {
            return None;
        }
        Some(device as usize * self.panel.width as usize + column as usize)
    }
}
