//! MAX7219 register map and command words.
//!
//! Every device consumes one 16-bit word per transaction:
//! - High byte: register address
//! - Low byte: register value
//!
//! Words addressed to [`Register::NoOp`] pass through a device without
//! touching its registers, which is how a single device in the chain is
//! targeted.

/// Number of digit (column) registers on each device.
pub const DIGIT_REGISTERS: u8 = 8;

/// Scan limit that enables all eight digit registers.
pub const SCAN_ALL_DIGITS: u8 = 0x07;

/// Decode mode for raw bitmaps (no BCD digit decoding).
pub const DECODE_NONE: u8 = 0x00;

/// Shutdown register values.
pub const SHUTDOWN_MODE: u8 = 0x00;
pub const NORMAL_OPERATION: u8 = 0x01;

/// Register addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    /// No operation; the word is forwarded untouched.
    NoOp = 0x00,
    Digit0 = 0x01,
    Digit1 = 0x02,
    Digit2 = 0x03,
    Digit3 = 0x04,
    Digit4 = 0x05,
    Digit5 = 0x06,
    Digit6 = 0x07,
    Digit7 = 0x08,
    /// BCD decode selection per digit.
    DecodeMode = 0x09,
    /// PWM brightness, 0x00-0x0F.
    Intensity = 0x0A,
    /// Number of scanned digits minus one.
    ScanLimit = 0x0B,
    /// 0 = shutdown, 1 = normal operation.
    Shutdown = 0x0C,
    /// Lights every LED when set.
    DisplayTest = 0x0F,
}

impl Register {
    /// Returns the digit register driving a local column, if the device has one.
    pub fn column(column: u8) -> Option<Self> {
        match column {
            0 => Some(Register::Digit0),
            1 => Some(Register::Digit1),
            2 => Some(Register::Digit2),
            3 => Some(Register::Digit3),
            4 => Some(Register::Digit4),
            5 => Some(Register::Digit5),
            6 => Some(Register::Digit6),
            7 => Some(Register::Digit7),
            _ => None,
        }
    }

    /// Converts a raw address to a register.
    pub fn from_address(address: u8) -> Option<Self> {
        match address {
            0x00 => Some(Register::NoOp),
            0x01..=0x08 => Self::column(address - 1),
            0x09 => Some(Register::DecodeMode),
            0x0A => Some(Register::Intensity),
            0x0B => Some(Register::ScanLimit),
            0x0C => Some(Register::Shutdown),
            0x0F => Some(Register::DisplayTest),
            _ => None,
        }
    }

    /// Returns the register address.
    pub fn address(self) -> u8 {
        self as u8
    }

    /// Returns the local column index for digit registers.
    pub fn digit_index(self) -> Option<u8> {
        match self.address() {
            a @ 0x01..=0x08 => Some(a - 1),
            _ => None,
        }
    }
}

/// Builds the 16-bit word shifted into one device.
#[inline]
pub fn command_word(register: Register, value: u8) -> u16 {
    (u16::from(register.address()) << 8) | u16::from(value)
}

/// The word sent to devices that a transaction does not target.
pub const NOOP_WORD: u16 = 0x0000;
