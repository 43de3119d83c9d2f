//! Virtual MAX7219 chain.
//!
//! Stands in for real hardware by decoding the levels driven on the three
//! bus lines. Each device is modelled as a 16-bit shift register: a rising
//! CLOCK edge while LOAD is low shifts DATA into the device nearest the host
//! and cascades the overflow bit down the chain, and a rising LOAD edge
//! latches every device's word into its register file.
//!
//! Device indices match the driver's: the first word shifted in a
//! transaction ends up in device 0, the device furthest from the host.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, OutputPin};

use crate::bus::Line;
use crate::registers::{Register, DIGIT_REGISTERS};

/// Register file of one virtual device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceState {
    /// Digit registers, one per local column.
    pub columns: [u8; DIGIT_REGISTERS as usize],
    pub decode_mode: u8,
    pub intensity: u8,
    pub scan_limit: u8,
    pub shutdown: u8,
    pub display_test: u8,
}

impl DeviceState {
    /// Returns true when the device is out of shutdown.
    pub fn is_on(&self) -> bool {
        self.shutdown & 0x01 != 0
    }

    /// Returns whether the LED at a local column/row is lit.
    ///
    /// Accounts for shutdown and display test the way the panel shows them.
    pub fn is_lit(&self, column: u8, row: u8) -> bool {
        if self.display_test & 0x01 != 0 {
            return true;
        }
        if !self.is_on() || column >= DIGIT_REGISTERS || row >= 8 {
            return false;
        }
        self.columns[column as usize] & (1 << row) != 0
    }

    fn apply(&mut self, word: u16) {
        let address = (word >> 8) as u8;
        let value = (word & 0xFF) as u8;
        match Register::from_address(address) {
            Some(Register::NoOp) | None => {}
            Some(Register::DecodeMode) => self.decode_mode = value,
            Some(Register::Intensity) => self.intensity = value,
            Some(Register::ScanLimit) => self.scan_limit = value,
            Some(Register::Shutdown) => self.shutdown = value,
            Some(Register::DisplayTest) => self.display_test = value,
            Some(digit) => {
                if let Some(index) = digit.digit_index() {
                    self.columns[index as usize] = value;
                }
            }
        }
    }
}

#[derive(Debug)]
struct ChainState {
    data: bool,
    load: bool,
    clock: bool,
    /// Shift registers indexed from the host outward.
    shift: Vec<u16>,
    /// Register files in driver order.
    devices: Vec<DeviceState>,
    latches: u64,
}

impl ChainState {
    fn set(&mut self, line: Line, level: bool) {
        match line {
            Line::Data => self.data = level,
            Line::Clock => {
                let rising = !self.clock && level;
                self.clock = level;
                if rising && !self.load {
                    self.shift_in(self.data);
                }
            }
            Line::Load => {
                let rising = !self.load && level;
                self.load = level;
                if rising {
                    self.latch();
                }
            }
        }
    }

    fn shift_in(&mut self, bit: bool) {
        let mut carry = bit;
        for register in &mut self.shift {
            let out = *register & 0x8000 != 0;
            *register = (*register << 1) | u16::from(carry);
            carry = out;
        }
    }

    fn latch(&mut self) {
        let count = self.devices.len();
        for (position, &word) in self.shift.iter().enumerate() {
            self.devices[count - 1 - position].apply(word);
        }
        self.latches += 1;
    }
}

/// Handle to a simulated chain. Clones share the same state.
#[derive(Debug, Clone)]
pub struct VirtualChain {
    state: Rc<RefCell<ChainState>>,
}

impl VirtualChain {
    /// Creates a powered-up chain of `devices` controllers with LOAD idle high.
    pub fn new(devices: u8) -> Self {
        let count = devices as usize;
        Self {
            state: Rc::new(RefCell::new(ChainState {
                data: false,
                load: true,
                clock: false,
                shift: vec![0; count],
                devices: vec![DeviceState::default(); count],
                latches: 0,
            })),
        }
    }

    /// Returns the (data, load, clock) pins wired to this chain.
    pub fn pins(&self) -> (VirtualPin, VirtualPin, VirtualPin) {
        (
            self.pin(Line::Data),
            self.pin(Line::Load),
            self.pin(Line::Clock),
        )
    }

    fn pin(&self, line: Line) -> VirtualPin {
        VirtualPin {
            line,
            state: Rc::clone(&self.state),
        }
    }

    /// Number of physical devices.
    pub fn devices(&self) -> u8 {
        self.state.borrow().devices.len() as u8
    }

    /// Register file of a device, if it exists.
    pub fn device(&self, index: u8) -> Option<DeviceState> {
        self.state.borrow().devices.get(index as usize).copied()
    }

    /// Number of LOAD rising edges seen.
    pub fn latches(&self) -> u64 {
        self.state.borrow().latches
    }

    /// Current (data, load, clock) levels.
    pub fn levels(&self) -> (bool, bool, bool) {
        let state = self.state.borrow();
        (state.data, state.load, state.clock)
    }

    /// Column registers of the whole chain in framebuffer order.
    pub fn columns(&self, panel_width: u8) -> Vec<u8> {
        let width = panel_width.min(DIGIT_REGISTERS) as usize;
        self.state
            .borrow()
            .devices
            .iter()
            .flat_map(|device| device.columns[..width].iter().copied())
            .collect()
    }
}

/// Output pin driving one line of a [`VirtualChain`].
#[derive(Debug)]
pub struct VirtualPin {
    line: Line,
    state: Rc<RefCell<ChainState>>,
}

impl VirtualPin {
    /// The line this pin drives.
    pub fn line(&self) -> Line {
        self.line
    }
}

impl ErrorType for VirtualPin {
    type Error = Infallible;
}

impl OutputPin for VirtualPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().set(self.line, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().set(self.line, true);
        Ok(())
    }
}
