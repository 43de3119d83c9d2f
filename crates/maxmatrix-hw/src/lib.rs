//! MaxMatrix Hardware Library
//!
//! Drives a chain of cascaded MAX7219 LED matrix controllers over a
//! bit-banged DATA/CLOCK/LOAD bus and keeps a host-side framebuffer that
//! mirrors what the chain displays.

pub mod bus;
pub mod direction;
pub mod error;
pub mod framebuffer;
pub mod geometry;
pub mod matrix;
pub mod registers;
pub mod sim;
pub mod sprite;

pub use bus::{Bus, Line};
pub use direction::Direction;
pub use error::{Error, Result};
pub use framebuffer::{Framebuffer, Layout};
pub use geometry::{ChainConfig, PanelGeometry};
pub use matrix::MaxMatrix;
pub use registers::Register;
pub use sim::{DeviceState, VirtualChain, VirtualPin};
pub use sprite::Sprite;

/// Maximum number of chained devices a driver will address.
pub const MAX_DEVICES: u8 = 14;

/// Default panel dimensions.
pub const PANEL_WIDTH: u8 = 8;
pub const PANEL_HEIGHT: u8 = 8;

/// Intensity range of the intensity register.
pub const MAX_INTENSITY: u8 = 0x0F;
pub const MIN_INTENSITY: u8 = 0x00;

/// Intensity programmed by [`MaxMatrix::init`].
pub const DEFAULT_INTENSITY: u8 = MAX_INTENSITY;
