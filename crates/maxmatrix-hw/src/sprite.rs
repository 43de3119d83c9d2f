//! Sprite assets.
//!
//! Asset layout:
//! - Byte 0: width in columns
//! - Byte 1: height in rows
//! - Bytes 2..2+width: one bitmask per column, row bit 0 at the top
//!
//! Sprites borrow the caller's bytes; nothing is copied.

use crate::{Error, Result};

/// Size of the width/height header.
pub const HEADER_SIZE: usize = 2;

/// Read-only view of a column bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sprite<'a> {
    width: u8,
    height: u8,
    columns: &'a [u8],
}

impl<'a> Sprite<'a> {
    /// Creates a sprite over bare column bytes (no header).
    pub fn new(width: u8, height: u8, columns: &'a [u8]) -> Result<Self> {
        if height > 8 {
            return Err(Error::SpriteHeight(height));
        }
        if columns.len() < width as usize {
            return Err(Error::SpriteSize {
                expected: width as usize,
                actual: columns.len(),
            });
        }
        Ok(Self {
            width,
            height,
            columns: &columns[..width as usize],
        })
    }

    /// Parses an asset, taking the dimensions from its header.
    pub fn from_asset(asset: &'a [u8]) -> Result<Self> {
        if asset.len() < HEADER_SIZE {
            return Err(Error::SpriteHeader { len: asset.len() });
        }
        Self::with_size(asset[0], asset[1], asset)
    }

    /// Views an asset with explicit dimensions, ignoring the ones in its header.
    pub fn with_size(width: u8, height: u8, asset: &'a [u8]) -> Result<Self> {
        let columns = asset
            .get(HEADER_SIZE..)
            .ok_or(Error::SpriteHeader { len: asset.len() })?;
        Self::new(width, height, columns)
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    /// Column bitmasks, exactly `width` of them.
    pub fn columns(&self) -> &'a [u8] {
        self.columns
    }

    /// Gets one pixel of the sprite.
    pub fn pixel(&self, x: u8, y: u8) -> bool {
        x < self.width && y < self.height && self.columns[x as usize] & (1 << y) != 0
    }
}
