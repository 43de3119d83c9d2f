//! Chain driver: framebuffer, pixel API, sprite blitting and transforms.
//!
//! Methods documented as writing to the device leave the chain and the
//! framebuffer equal. `stage_*` methods only touch the framebuffer; call
//! [`MaxMatrix::reload`] to push staged columns out.

use embedded_hal::digital::OutputPin;
use tracing::{debug, info, warn};

use crate::bus::Bus;
use crate::direction::Direction;
use crate::framebuffer::Framebuffer;
use crate::geometry::{ChainConfig, PanelGeometry};
use crate::registers::{
    Register, DECODE_NONE, DIGIT_REGISTERS, NORMAL_OPERATION, SCAN_ALL_DIGITS, SHUTDOWN_MODE,
};
use crate::sprite::Sprite;
use crate::{Result, DEFAULT_INTENSITY, MAX_INTENSITY};

/// Driver for a chain of MAX7219 matrix controllers.
#[derive(Debug)]
pub struct MaxMatrix<DATA, LOAD, CLK> {
    bus: Bus<DATA, LOAD, CLK>,
    config: ChainConfig,
    framebuffer: Framebuffer,
}

impl<DATA, LOAD, CLK> MaxMatrix<DATA, LOAD, CLK>
where
    DATA: OutputPin,
    LOAD: OutputPin,
    CLK: OutputPin,
{
    /// Creates a driver for `devices` 8x8 panels.
    ///
    /// The count is clamped to [`crate::MAX_DEVICES`]; see
    /// [`ChainConfig::was_clamped`]. Nothing is sent until [`Self::init`].
    pub fn new(data: DATA, load: LOAD, clock: CLK, devices: u8) -> Self {
        Self::with_panel(data, load, clock, devices, PanelGeometry::default())
    }

    /// Creates a driver for panels of a custom geometry.
    pub fn with_panel(
        data: DATA,
        load: LOAD,
        clock: CLK,
        devices: u8,
        panel: PanelGeometry,
    ) -> Self {
        let config = ChainConfig::new(devices, panel);
        Self {
            bus: Bus::new(data, load, clock, config.devices()),
            framebuffer: Framebuffer::for_chain(&config),
            config,
        }
    }

    /// Programs every device and blanks the display.
    pub fn init(&mut self) -> Result<()> {
        self.bus.idle()?;

        self.set_command(Register::ScanLimit, SCAN_ALL_DIGITS)?;
        self.set_command(Register::DecodeMode, DECODE_NONE)?;
        self.set_command(Register::Shutdown, NORMAL_OPERATION)?;
        self.set_command(Register::DisplayTest, 0x00)?;

        self.clear()?;
        self.set_intensity(DEFAULT_INTENSITY)?;

        info!(
            "MaxMatrix initialized ({} devices, {} columns, {} layout)",
            self.config.devices(),
            self.config.columns(),
            self.framebuffer.layout()
        );
        Ok(())
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Effective number of devices.
    pub fn devices(&self) -> u8 {
        self.config.devices()
    }

    /// Total columns across the chain.
    pub fn columns(&self) -> usize {
        self.config.columns()
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Number of bus transactions issued so far.
    pub fn transactions(&self) -> u64 {
        self.bus.transactions()
    }

    /// Consumes the driver and returns the pins.
    pub fn release(self) -> (DATA, LOAD, CLK) {
        self.bus.release()
    }

    /// Broadcasts a raw register write to every device.
    pub fn set_command(&mut self, register: Register, value: u8) -> Result<()> {
        self.bus.broadcast(register, value)
    }

    /// Sets brightness on every device; values above 15 are clamped.
    pub fn set_intensity(&mut self, intensity: u8) -> Result<()> {
        let value = if intensity > MAX_INTENSITY {
            warn!(
                "Intensity {} out of range, clamped to {}",
                intensity, MAX_INTENSITY
            );
            MAX_INTENSITY
        } else {
            intensity
        };
        self.set_command(Register::Intensity, value)?;
        debug!("Intensity set to {}", value);
        Ok(())
    }

    /// Blanks every device. Column registers keep their contents.
    pub fn shutdown(&mut self) -> Result<()> {
        self.set_command(Register::Shutdown, SHUTDOWN_MODE)?;
        info!("Display shut down");
        Ok(())
    }

    /// Leaves shutdown mode.
    pub fn wake(&mut self) -> Result<()> {
        self.set_command(Register::Shutdown, NORMAL_OPERATION)?;
        info!("Display woken");
        Ok(())
    }

    /// Turns the all-LEDs-on test mode on or off.
    pub fn set_display_test(&mut self, enabled: bool) -> Result<()> {
        self.set_command(Register::DisplayTest, u8::from(enabled))
    }

    /// Gets a framebuffer column.
    pub fn column(&self, column: usize) -> Option<u8> {
        self.framebuffer.column(column)
    }

    /// Gets a framebuffer pixel.
    pub fn dot(&self, column: usize, row: u8) -> Option<bool> {
        self.framebuffer.dot(column, row)
    }

    /// Sets a framebuffer column without touching the device.
    pub fn stage_column(&mut self, column: usize, value: u8) {
        self.framebuffer.set_column(column, value);
    }

    /// Stages one panel's worth of columns starting at global column `start`.
    ///
    /// Columns that fall outside the chain are skipped.
    pub fn stage_panel(&mut self, start: i32, columns: &[u8]) {
        let width = self.config.panel().width();
        for (offset, &value) in (0..width).zip(columns) {
            if let Some(column) = self.clip_column(start.saturating_add(i32::from(offset))) {
                self.framebuffer.set_column(column, value);
            }
        }
    }

    /// Writes one column to its device and to the framebuffer.
    pub fn set_column(&mut self, column: usize, value: u8) -> Result<()> {
        if column >= self.config.columns() {
            return Ok(());
        }
        self.framebuffer.set_column(column, value);
        self.write_column(column)
    }

    /// Writes the same local column on every device in one transaction.
    ///
    /// `column` may address any of the eight digit registers; only those
    /// inside the panel width are mirrored in the framebuffer.
    pub fn set_column_all(&mut self, column: u8, value: u8) -> Result<()> {
        if column >= DIGIT_REGISTERS {
            return Ok(());
        }
        let value = value & self.config.panel().row_mask();
        self.bus.write_frame_column(column, |_| value)?;
        for device in 0..self.config.devices() {
            if let Some(global) = self.config.global_column(device, column) {
                self.framebuffer.set_column(global, value);
            }
        }
        Ok(())
    }

    /// Sets or clears one pixel, rewriting its whole column on the device.
    pub fn set_dot(&mut self, column: usize, row: u8, on: bool) -> Result<()> {
        if column >= self.config.columns() || row >= self.config.panel().height() {
            return Ok(());
        }
        self.framebuffer.set_dot(column, row, on);
        self.write_column(column)
    }

    /// Blanks every digit register on every device and the framebuffer.
    pub fn clear(&mut self) -> Result<()> {
        for column in 0..DIGIT_REGISTERS {
            self.set_column_all(column, 0)?;
        }
        self.framebuffer.clear();
        Ok(())
    }

    fn write_column(&mut self, column: usize) -> Result<()> {
        let (Some((device, local)), Some(value)) =
            (self.config.locate(column), self.framebuffer.column(column))
        else {
            return Ok(());
        };
        self.bus.write_column(device, local, value)
    }

    fn clip_column(&self, column: i32) -> Option<usize> {
        usize::try_from(column)
            .ok()
            .filter(|&c| c < self.config.columns())
    }

    fn clip_row(&self, row: i32) -> Option<u8> {
        u8::try_from(row)
            .ok()
            .filter(|&r| r < self.config.panel().height())
    }

    /// Draws a sprite with its top-left corner at (`x`, `y`).
    ///
    /// A full-height sprite at `y == 0` is written a column at a time;
    /// anything else is written pixel by pixel. Pixels off the chain are
    /// dropped.
    pub fn blit(&mut self, x: i32, y: i32, sprite: &Sprite<'_>) -> Result<()> {
        if sprite.height() == self.config.panel().height() && y == 0 {
            for (offset, &bits) in sprite.columns().iter().enumerate() {
                if let Some(column) = self.clip_column(x.saturating_add(offset as i32)) {
                    self.set_column(column, bits)?;
                }
            }
        } else {
            for sx in 0..sprite.width() {
                let Some(column) = self.clip_column(x.saturating_add(i32::from(sx))) else {
                    continue;
                };
                for sy in 0..sprite.height() {
                    if let Some(row) = self.clip_row(y.saturating_add(i32::from(sy))) {
                        self.set_dot(column, row, sprite.pixel(sx, sy))?;
                    }
                }
            }
        }
        debug!(
            "Sprite {}x{} drawn at ({}, {})",
            sprite.width(),
            sprite.height(),
            x,
            y
        );
        Ok(())
    }

    /// Draws a `[width, height, columns...]` asset.
    pub fn write_sprite(&mut self, x: i32, y: i32, asset: &[u8]) -> Result<()> {
        let sprite = Sprite::from_asset(asset)?;
        self.blit(x, y, &sprite)
    }

    /// Draws an asset using explicit dimensions instead of its header.
    pub fn write_sprite_sized(
        &mut self,
        x: i32,
        y: i32,
        width: u8,
        height: u8,
        asset: &[u8],
    ) -> Result<()> {
        let sprite = Sprite::with_size(width, height, asset)?;
        self.blit(x, y, &sprite)
    }

    /// Shifts the whole chain one column towards column 0 and flushes.
    pub fn shift_left(&mut self, rotate: bool, fill_zero: bool) -> Result<()> {
        self.framebuffer.shift_left(rotate, fill_zero);
        debug!("Shift left (rotate: {}, fill_zero: {})", rotate, fill_zero);
        self.reload()
    }

    /// Shifts the whole chain one column away from column 0 and flushes.
    pub fn shift_right(&mut self, rotate: bool, fill_zero: bool) -> Result<()> {
        self.framebuffer.shift_right(rotate, fill_zero);
        debug!("Shift right (rotate: {}, fill_zero: {})", rotate, fill_zero);
        self.reload()
    }

    /// Shifts every column one row up and flushes.
    pub fn shift_up(&mut self, rotate: bool) -> Result<()> {
        self.framebuffer.shift_up(rotate);
        debug!("Shift up (rotate: {})", rotate);
        self.reload()
    }

    /// Shifts every column one row down and flushes.
    pub fn shift_down(&mut self, rotate: bool) -> Result<()> {
        self.framebuffer.shift_down(rotate);
        debug!("Shift down (rotate: {})", rotate);
        self.reload()
    }

    /// Shifts in `direction`. `fill_zero` only applies to horizontal shifts.
    pub fn shift(&mut self, direction: Direction, rotate: bool, fill_zero: bool) -> Result<()> {
        match direction {
            Direction::Left => self.shift_left(rotate, fill_zero),
            Direction::Right => self.shift_right(rotate, fill_zero),
            Direction::Up => self.shift_up(rotate),
            Direction::Down => self.shift_down(rotate),
        }
    }

    /// Pushes the entire framebuffer to the chain, one transaction per local column.
    pub fn reload(&mut self) -> Result<()> {
        let config = &self.config;
        let framebuffer = &self.framebuffer;
        for column in 0..config.panel().width() {
            self.bus.write_frame_column(column, |device| {
                config
                    .global_column(device, column)
                    .and_then(|global| framebuffer.column(global))
                    .unwrap_or(0)
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Line;
    use crate::sim::{VirtualChain, VirtualPin};
    use crate::{Error, MAX_DEVICES};
    use embedded_hal::digital::{ErrorKind, ErrorType};
    use std::cell::Cell;
    use std::rc::Rc;

    type TestMatrix = MaxMatrix<VirtualPin, VirtualPin, VirtualPin>;

    const SMILEY: [u8; 10] = [8, 8, 0x3C, 0x42, 0xA5, 0x81, 0xA5, 0x99, 0x42, 0x3C];

    fn matrix_with(devices: u8, panel: PanelGeometry) -> (VirtualChain, TestMatrix) {
        let chain = VirtualChain::new(devices);
        let (data, load, clock) = chain.pins();
        let mut matrix = MaxMatrix::with_panel(data, load, clock, devices, panel);
        matrix.init().unwrap();
        (chain, matrix)
    }

    fn matrix(devices: u8) -> (VirtualChain, TestMatrix) {
        matrix_with(devices, PanelGeometry::default())
    }

    fn assert_in_sync(chain: &VirtualChain, matrix: &TestMatrix) {
        let width = matrix.config().panel().width();
        assert_eq!(chain.columns(width), matrix.framebuffer().to_vec());
    }

    #[test]
    fn test_init_programs_every_device() {
        let (chain, matrix) = matrix(3);
        for d in 0..3 {
            let device = chain.device(d).unwrap();
            assert_eq!(device.scan_limit, 0x07);
            assert_eq!(device.decode_mode, 0x00);
            assert_eq!(device.shutdown, 0x01);
            assert_eq!(device.display_test, 0x00);
            assert_eq!(device.intensity, DEFAULT_INTENSITY);
            assert_eq!(device.columns, [0; 8]);
        }
        // 4 config broadcasts, 8 clear transactions, intensity
        assert_eq!(matrix.transactions(), 13);
        assert_eq!(chain.latches(), 13);
        let (_, load, clock) = chain.levels();
        assert!(load && clock);
    }

    #[test]
    fn test_set_column_changes_only_that_slot() {
        let (chain, mut matrix) = matrix(2);
        for column in 0..16 {
            let value = 0x81 ^ (column as u8) << 1;
            let before = matrix.framebuffer().to_vec();
            matrix.set_column(column, value).unwrap();
            let after = matrix.framebuffer().to_vec();
            assert_eq!(after[column], value);
            for other in (0..16).filter(|&c| c != column) {
                assert_eq!(after[other], before[other]);
            }
            assert_in_sync(&chain, &matrix);
        }
    }

    #[test]
    fn test_set_column_is_one_transaction() {
        let (chain, mut matrix) = matrix(4);
        let before = matrix.transactions();
        matrix.set_column(27, 0x5A).unwrap();
        assert_eq!(matrix.transactions(), before + 1);
        assert_eq!(chain.device(3).unwrap().columns[3], 0x5A);
    }

    #[test]
    fn test_out_of_range_column_is_dropped() {
        let (chain, mut matrix) = matrix(2);
        let before = matrix.transactions();
        matrix.set_column(16, 0xFF).unwrap();
        matrix.set_dot(16, 0, true).unwrap();
        matrix.set_dot(0, 8, true).unwrap();
        assert_eq!(matrix.transactions(), before);
        assert!(matrix.framebuffer().columns().all(|v| v == 0));
        assert_in_sync(&chain, &matrix);
    }

    #[test]
    fn test_set_dot_sets_exactly_one_bit() {
        let (chain, mut matrix) = matrix(2);
        matrix.set_column(10, 0b1010_1010).unwrap();
        matrix.set_dot(10, 0, true).unwrap();
        assert_eq!(matrix.column(10), Some(0b1010_1011));
        matrix.set_dot(10, 7, false).unwrap();
        assert_eq!(matrix.column(10), Some(0b0010_1011));
        assert_eq!(matrix.dot(10, 5), Some(true));
        assert_in_sync(&chain, &matrix);
    }

    #[test]
    fn test_column_all_uses_device_relative_slots() {
        let (chain, mut matrix) = matrix(2);
        matrix.set_column_all(3, 0xFF).unwrap();
        assert_eq!(matrix.column(3), Some(0xFF));
        assert_eq!(matrix.column(11), Some(0xFF));
        assert_eq!(
            matrix.framebuffer().columns().filter(|&v| v != 0).count(),
            2
        );
        assert_in_sync(&chain, &matrix);
    }

    #[test]
    fn test_column_all_long_chain() {
        let (chain, mut matrix) = matrix(5);
        let before = matrix.transactions();
        matrix.set_column_all(6, 0x18).unwrap();
        assert_eq!(matrix.transactions(), before + 1);
        for device in 0..5 {
            assert_eq!(matrix.column(device * 8 + 6), Some(0x18));
        }
        assert_in_sync(&chain, &matrix);
    }

    #[test]
    fn test_clear() {
        let (chain, mut matrix) = matrix(3);
        matrix.write_sprite(4, 0, &SMILEY).unwrap();
        matrix.clear().unwrap();
        assert!(matrix.framebuffer().columns().all(|v| v == 0));
        assert_in_sync(&chain, &matrix);
    }

    #[test]
    fn test_stage_then_reload() {
        let (chain, mut matrix) = matrix(2);
        let before = matrix.transactions();
        matrix.stage_column(2, 0x0F);
        matrix.stage_panel(8, &SMILEY[2..]);
        assert_eq!(matrix.transactions(), before);
        assert_eq!(chain.device(0).unwrap().columns[2], 0);
        assert_eq!(matrix.column(8), Some(0x3C));

        matrix.reload().unwrap();
        assert_eq!(matrix.transactions(), before + 8);
        assert_in_sync(&chain, &matrix);
    }

    #[test]
    fn test_stage_panel_clips() {
        let (_chain, mut matrix) = matrix(1);
        matrix.stage_panel(-4, &SMILEY[2..]);
        assert_eq!(matrix.column(0), Some(0xA5));
        assert_eq!(matrix.column(3), Some(0x3C));
        assert_eq!(matrix.column(4), Some(0));
    }

    #[test]
    fn test_blit_full_panel_sprite() {
        let (chain, mut matrix) = matrix(1);
        let before = matrix.transactions();
        matrix.write_sprite(0, 0, &SMILEY).unwrap();
        assert_eq!(matrix.framebuffer().to_vec(), SMILEY[2..].to_vec());
        assert_eq!(matrix.transactions(), before + 8);
        assert_in_sync(&chain, &matrix);
    }

    #[test]
    fn test_blit_across_device_boundary() {
        let (chain, mut matrix) = matrix(2);
        matrix.write_sprite(5, 0, &SMILEY).unwrap();
        assert_eq!(matrix.framebuffer().to_vec()[5..13], SMILEY[2..]);
        assert_in_sync(&chain, &matrix);
    }

    #[test]
    fn test_blit_partial_height_per_pixel() {
        let (chain, mut matrix) = matrix(1);
        let arrow = [3, 3, 0b010, 0b111, 0b010];
        let before = matrix.transactions();
        matrix.write_sprite(2, 6, &arrow).unwrap();
        // rows 6 and 7 fit, row 8 is dropped
        assert_eq!(matrix.transactions(), before + 6);
        assert_eq!(matrix.column(2), Some(0b1000_0000));
        assert_eq!(matrix.column(3), Some(0b1100_0000));
        assert_eq!(matrix.column(4), Some(0b1000_0000));
        assert_in_sync(&chain, &matrix);
    }

    #[test]
    fn test_blit_clears_transparent_pixels() {
        let (chain, mut matrix) = matrix(1);
        matrix.set_column(1, 0xFF).unwrap();
        matrix.write_sprite(1, 2, &[1, 2, 0b01]).unwrap();
        assert_eq!(matrix.column(1), Some(0b1111_0111));
        assert_in_sync(&chain, &matrix);
    }

    #[test]
    fn test_blit_past_chain_is_noop() {
        let (chain, mut matrix) = matrix(2);
        let before = matrix.transactions();
        matrix.write_sprite(16, 0, &SMILEY).unwrap();
        matrix.write_sprite(40, 3, &[2, 2, 0x03, 0x03]).unwrap();
        assert_eq!(matrix.transactions(), before);
        assert!(matrix.framebuffer().columns().all(|v| v == 0));
        assert_in_sync(&chain, &matrix);
    }

    #[test]
    fn test_blit_negative_offset() {
        let (_chain, mut matrix) = matrix(1);
        matrix.write_sprite(-6, 0, &SMILEY).unwrap();
        assert_eq!(matrix.column(0), Some(0x42));
        assert_eq!(matrix.column(1), Some(0x3C));
        assert_eq!(matrix.column(2), Some(0));

        matrix.write_sprite(0, -1, &[1, 3, 0b110]).unwrap();
        assert_eq!(matrix.column(0), Some(0b0100_0011));
    }

    #[test]
    fn test_sized_sprite_ignores_header() {
        let (_chain, mut matrix) = matrix(1);
        matrix.write_sprite_sized(0, 0, 2, 8, &SMILEY).unwrap();
        assert_eq!(matrix.column(0), Some(0x3C));
        assert_eq!(matrix.column(1), Some(0x42));
        assert_eq!(matrix.column(2), Some(0));
        assert!(matrix.write_sprite(0, 0, &[9, 8, 0x01]).is_err());
    }

    #[test]
    fn test_shift_left_rotate_full_cycle() {
        let (chain, mut matrix) = matrix(2);
        matrix.write_sprite(3, 0, &SMILEY).unwrap();
        let original = matrix.framebuffer().clone();
        for _ in 0..16 {
            let before = matrix.transactions();
            matrix.shift_left(true, true).unwrap();
            assert_eq!(matrix.transactions(), before + 8);
            assert_in_sync(&chain, &matrix);
        }
        assert_eq!(matrix.framebuffer(), &original);
    }

    #[test]
    fn test_shift_right_undoes_shift_left() {
        let (chain, mut matrix) = matrix(3);
        matrix.write_sprite(10, 0, &SMILEY).unwrap();
        let original = matrix.framebuffer().clone();
        matrix.shift(Direction::Left, true, true).unwrap();
        matrix.shift(Direction::Left.opposite(), true, true).unwrap();
        assert_eq!(matrix.framebuffer(), &original);
        assert_in_sync(&chain, &matrix);
    }

    #[test]
    fn test_shift_left_discards_first_column() {
        let (chain, mut matrix) = matrix(1);
        matrix.write_sprite(0, 0, &SMILEY).unwrap();
        matrix.shift_left(false, true).unwrap();
        assert_eq!(matrix.framebuffer().to_vec()[..7], SMILEY[3..]);
        assert_eq!(matrix.column(7), Some(0));
        assert_in_sync(&chain, &matrix);
    }

    #[test]
    fn test_shift_up_rotate_restores() {
        let (chain, mut matrix) = matrix(2);
        matrix.write_sprite(4, 0, &SMILEY).unwrap();
        let original = matrix.framebuffer().clone();
        for _ in 0..8 {
            matrix.shift_up(true).unwrap();
        }
        assert_eq!(matrix.framebuffer(), &original);
        matrix.shift_down(false).unwrap();
        assert_eq!(matrix.column(4), Some(0x78));
        assert_in_sync(&chain, &matrix);
    }

    #[test]
    fn test_intensity_clamped() {
        let (chain, mut matrix) = matrix(2);
        matrix.set_intensity(3).unwrap();
        assert_eq!(chain.device(1).unwrap().intensity, 3);
        matrix.set_intensity(200).unwrap();
        assert_eq!(chain.device(0).unwrap().intensity, MAX_INTENSITY);
    }

    #[test]
    fn test_shutdown_keeps_columns() {
        let (chain, mut matrix) = matrix(1);
        matrix.set_column(0, 0x01).unwrap();
        matrix.shutdown().unwrap();
        let device = chain.device(0).unwrap();
        assert!(!device.is_on());
        assert!(!device.is_lit(0, 0));
        assert_eq!(device.columns[0], 0x01);
        matrix.wake().unwrap();
        assert!(chain.device(0).unwrap().is_lit(0, 0));
        matrix.set_display_test(true).unwrap();
        assert_eq!(chain.device(0).unwrap().display_test, 1);
    }

    #[test]
    fn test_device_count_clamped() {
        let chain = VirtualChain::new(MAX_DEVICES);
        let (data, load, clock) = chain.pins();
        let matrix = MaxMatrix::new(data, load, clock, 40);
        assert_eq!(matrix.devices(), MAX_DEVICES);
        assert_eq!(matrix.config().requested_devices(), 40);
        assert!(matrix.config().was_clamped());
        assert_eq!(matrix.framebuffer().len(), MAX_DEVICES as usize * 8);
    }

    #[test]
    fn test_short_panels_stay_in_sync() {
        let panel = PanelGeometry::new(5, 5).unwrap();
        let (chain, mut matrix) = matrix_with(3, panel);
        assert_eq!(matrix.columns(), 15);

        matrix.set_column(7, 0xFF).unwrap();
        assert_eq!(matrix.column(7), Some(0x1F));
        assert_eq!(chain.device(1).unwrap().columns[2], 0x1F);

        matrix.set_column_all(1, 0x11).unwrap();
        assert_eq!(matrix.column(1), Some(0x11));
        assert_eq!(matrix.column(6), Some(0x11));
        assert_eq!(matrix.column(11), Some(0x11));

        matrix.write_sprite(12, 0, &[3, 5, 0x01, 0x02, 0x04]).unwrap();
        matrix.shift_down(true).unwrap();
        assert_eq!(matrix.column(14), Some(0x08));
        matrix.shift_right(true, true).unwrap();
        assert_eq!(matrix.column(0), Some(0x08));
        assert_in_sync(&chain, &matrix);
    }

    #[test]
    fn test_shift_direction_without_fill_keeps_edge() {
        let (chain, mut matrix) = matrix(1);
        matrix.write_sprite(0, 0, &SMILEY).unwrap();
        matrix.shift(Direction::Left, false, false).unwrap();
        assert_eq!(matrix.column(6), Some(0x3C));
        assert_eq!(matrix.column(7), Some(0x3C));
        matrix.shift(Direction::Right, false, true).unwrap();
        assert_eq!(matrix.column(0), Some(0));
        assert_in_sync(&chain, &matrix);
    }

    /// Pin that fails once its shared budget of level changes runs out.
    struct FaultyPin {
        inner: VirtualPin,
        budget: Rc<Cell<usize>>,
    }

    impl FaultyPin {
        fn new(inner: VirtualPin, budget: usize) -> (Self, Rc<Cell<usize>>) {
            let budget = Rc::new(Cell::new(budget));
            let pin = Self {
                inner,
                budget: budget.clone(),
            };
            (pin, budget)
        }

        fn spend(&self) -> core::result::Result<(), ErrorKind> {
            match self.budget.get() {
                0 => Err(ErrorKind::Other),
                left => {
                    self.budget.set(left - 1);
                    Ok(())
                }
            }
        }
    }

    impl ErrorType for FaultyPin {
        type Error = ErrorKind;
    }

    impl OutputPin for FaultyPin {
        fn set_low(&mut self) -> core::result::Result<(), ErrorKind> {
            self.spend()?;
            self.inner.set_low().map_err(|e| match e {})
        }

        fn set_high(&mut self) -> core::result::Result<(), ErrorKind> {
            self.spend()?;
            self.inner.set_high().map_err(|e| match e {})
        }
    }

    #[test]
    fn test_init_reports_load_failure() {
        let chain = VirtualChain::new(2);
        let (data, load, clock) = chain.pins();
        let (load, _) = FaultyPin::new(load, 0);
        let mut matrix = MaxMatrix::new(data, load, clock, 2);

        let err = matrix.init().unwrap_err();
        assert_eq!(
            err,
            Error::Gpio {
                line: Line::Load,
                kind: ErrorKind::Other
            }
        );
        assert_eq!(matrix.transactions(), 0);
        assert_eq!(chain.latches(), 0);
    }

    #[test]
    fn test_set_column_reports_data_failure() {
        let chain = VirtualChain::new(2);
        let (data, load, clock) = chain.pins();
        let (data, budget) = FaultyPin::new(data, usize::MAX);
        let mut matrix = MaxMatrix::new(data, load, clock, 2);
        matrix.init().unwrap();
        let before = matrix.transactions();

        budget.set(0);
        let err = matrix.set_column(3, 0xFF).unwrap_err();
        assert!(matches!(err, Error::Gpio { line: Line::Data, .. }));
        assert_eq!(matrix.transactions(), before);
        assert_eq!(chain.latches(), before);
        assert_eq!(chain.device(0).unwrap().columns[3], 0);
    }

    #[test]
    fn test_reload_reports_clock_failure() {
        let chain = VirtualChain::new(3);
        let (data, load, clock) = chain.pins();
        let (clock, budget) = FaultyPin::new(clock, usize::MAX);
        let mut matrix = MaxMatrix::new(data, load, clock, 3);
        matrix.init().unwrap();
        matrix.stage_column(0, 0xAA);
        let before = matrix.transactions();

        // Fails partway through the first word
        budget.set(5);
        let err = matrix.reload().unwrap_err();
        assert!(matches!(err, Error::Gpio { line: Line::Clock, .. }));
        assert_eq!(matrix.transactions(), before);
        assert_eq!(chain.device(0).unwrap().columns[0], 0);

        budget.set(usize::MAX);
        matrix.reload().unwrap();
        assert_eq!(matrix.transactions(), before + 8);
        assert_eq!(chain.columns(8), matrix.framebuffer().to_vec());
    }
}
