//! Column framebuffer mirroring the chain.
//!
//! One bitmask per global column, row bit 0 at the top. Panels that are a
//! full byte tall store a byte per column; shorter panels pack `height` bits
//! per column back to back.

use crate::geometry::{ChainConfig, PanelGeometry};

/// Storage strategy, selected from the panel height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One byte per column.
    Bytes,
    /// `height` bits per column, packed LSB first.
    Packed { height: u8 },
}

impl Layout {
    /// Picks the layout for a panel height.
    pub fn for_height(height: u8) -> Self {
        if height == 8 {
            Layout::Bytes
        } else {
            Layout::Packed { height }
        }
    }

    /// Bytes of storage needed for `columns` columns.
    pub fn storage_len(&self, columns: usize) -> usize {
        match *self {
            Layout::Bytes => columns,
            Layout::Packed { height } => (columns * height as usize).div_ceil(8),
        }
    }
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layout::Bytes => write!(f, "byte-per-column"),
            Layout::Packed { height } => write!(f, "packed ({} bits per column)", height),
        }
    }
}

/// Host-side mirror of every column in the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    /// Column storage, laid out per `layout`.
    data: Vec<u8>,
    /// Number of columns.
    columns: usize,
    /// Rows per column.
    height: u8,
    layout: Layout,
}

impl Framebuffer {
    /// Creates a blank framebuffer of `columns` columns for the given panel.
    pub fn new(columns: usize, panel: PanelGeometry) -> Self {
        let layout = panel.layout();
        Self {
            data: vec![0; layout.storage_len(columns)],
            columns,
            height: panel.height(),
            layout,
        }
    }

    /// Creates a blank framebuffer covering a whole chain.
    pub fn for_chain(config: &ChainConfig) -> Self {
        Self::new(config.columns(), config.panel())
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns == 0
    }

    /// Rows per column.
    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Raw storage.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn mask(&self) -> u8 {
        (((1u16 << self.height) - 1) & 0xFF) as u8
    }

    fn read(&self, column: usize) -> u8 {
        match self.layout {
            Layout::Bytes => self.data[column],
            Layout::Packed { height } => {
                let start = column * height as usize;
                (0..height).fold(0u8, |acc, row| {
                    let bit = start + row as usize;
                    if self.data[bit / 8] & (1 << (bit % 8)) != 0 {
                        acc | (1 << row)
                    } else {
                        acc
                    }
                })
            }
        }
    }

    fn write(&mut self, column: usize, value: u8) {
        match self.layout {
            Layout::Bytes => self.data[column] = value,
            Layout::Packed { height } => {
                let start = column * height as usize;
                for row in 0..height {
                    let bit = start + row as usize;
                    if value & (1 << row) != 0 {
                        self.data[bit / 8] |= 1 << (bit % 8);
                    } else {
                        self.data[bit / 8] &= !(1 << (bit % 8));
                    }
                }
            }
        }
    }

    /// Gets a column bitmask.
    pub fn column(&self, column: usize) -> Option<u8> {
        (column < self.columns).then(|| self.read(column))
    }

    /// Sets a column bitmask; bits below the panel are dropped.
    pub fn set_column(&mut self, column: usize, value: u8) {
        if column < self.columns {
            let value = value & self.mask();
            self.write(column, value);
        }
    }

    /// Gets a single pixel.
    pub fn dot(&self, column: usize, row: u8) -> Option<bool> {
        if row >= self.height {
            return None;
        }
        self.column(column).map(|bits| bits & (1 << row) != 0)
    }

    /// Sets or clears a single pixel.
    pub fn set_dot(&mut self, column: usize, row: u8, on: bool) {
        if column >= self.columns || row >= self.height {
            return;
        }
        let bits = self.read(column);
        let bits = if on {
            bits | (1 << row)
        } else {
            bits & !(1 << row)
        };
        self.write(column, bits);
    }

    /// Zeroes every column.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Iterates over the column bitmasks in order.
    pub fn columns(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.columns).map(move |c| self.read(c))
    }

    /// Copies the columns out.
    pub fn to_vec(&self) -> Vec<u8> {
        self.columns().collect()
    }

    /// Moves every column one slot towards column 0.
    ///
    /// With `rotate` the old first column wraps to the end. Otherwise the last
    /// column is zeroed when `fill_zero` is set, or keeps its old value.
    pub fn shift_left(&mut self, rotate: bool, fill_zero: bool) {
        if self.columns == 0 {
            return;
        }
        let last = self.columns - 1;
        let first = self.read(0);
        for c in 0..last {
            let next = self.read(c + 1);
            self.write(c, next);
        }
        if rotate {
            self.write(last, first);
        } else if fill_zero {
            self.write(last, 0);
        }
    }

    /// Moves every column one slot away from column 0; mirror of [`Self::shift_left`].
    pub fn shift_right(&mut self, rotate: bool, fill_zero: bool) {
        if self.columns == 0 {
            return;
        }
        let last = self.columns - 1;
        let old = self.read(last);
        for c in (1..=last).rev() {
            let prev = self.read(c - 1);
            self.write(c, prev);
        }
        if rotate {
            self.write(0, old);
        } else if fill_zero {
            self.write(0, 0);
        }
    }

    /// Moves every pixel one row up within its own column.
    pub fn shift_up(&mut self, rotate: bool) {
        let top = 1u8 << (self.height - 1);
        for c in 0..self.columns {
            let bits = self.read(c);
            let mut shifted = bits >> 1;
            if rotate && bits & 0x01 != 0 {
                shifted |= top;
            }
            self.write(c, shifted);
        }
    }

    /// Moves every pixel one row down within its own column.
    pub fn shift_down(&mut self, rotate: bool) {
        let bottom = 1u8 << (self.height - 1);
        let mask = self.mask();
        for c in 0..self.columns {
            let bits = self.read(c);
            let mut shifted = (bits << 1) & mask;
            if rotate && bits & bottom != 0 {
                shifted |= 0x01;
            }
            self.write(c, shifted);
        }
    }
}
