//! Bit-banged shift-register bus shared by every device in the chain.
//!
//! A transaction holds LOAD low, shifts one 16-bit word per device MSB
//! first (device 0 first), then drops and raises LOAD. The rising LOAD edge
//! commits every device at once. Each bit is presented on DATA while CLOCK
//! is low and sampled on the rising CLOCK edge, so CLOCK idles high.

use embedded_hal::digital::{Error as _, OutputPin};
use tracing::debug;

use crate::registers::{command_word, Register, NOOP_WORD};
use crate::{Error, Result};

/// The three bus signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Data,
    Load,
    Clock,
}

impl std::fmt::Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Line::Data => write!(f, "DATA"),
            Line::Load => write!(f, "LOAD"),
            Line::Clock => write!(f, "CLOCK"),
        }
    }
}

/// Exclusive owner of the bus pins and the chain length.
///
/// Every write takes `&mut self`; interleaving two transactions would
/// corrupt the bit stream seen by the chain.
#[derive(Debug)]
pub struct Bus<DATA, LOAD, CLK> {
    data: DATA,
    load: LOAD,
    clock: CLK,
    devices: u8,
    transactions: u64,
}

fn drive<P: OutputPin>(pin: &mut P, line: Line, high: bool) -> Result<()> {
    let result = if high { pin.set_high() } else { pin.set_low() };
    result.map_err(|e| Error::Gpio {
        line,
        kind: e.kind(),
    })
}

impl<DATA, LOAD, CLK> Bus<DATA, LOAD, CLK>
where
    DATA: OutputPin,
    LOAD: OutputPin,
    CLK: OutputPin,
{
    /// Takes ownership of the pins for a chain of `devices` controllers.
    ///
    /// The count is used as given; [`crate::ChainConfig`] does the clamping.
    pub fn new(data: DATA, load: LOAD, clock: CLK, devices: u8) -> Self {
        Self {
            data,
            load,
            clock,
            devices,
            transactions: 0,
        }
    }

    /// Number of devices each transaction addresses.
    pub fn devices(&self) -> u8 {
        self.devices
    }

    /// Number of latched transactions since construction.
    pub fn transactions(&self) -> u64 {
        self.transactions
    }

    /// Puts the lines in their idle state: CLOCK high, LOAD high.
    pub fn idle(&mut self) -> Result<()> {
        drive(&mut self.clock, Line::Clock, true)?;
        drive(&mut self.load, Line::Load, true)?;
        Ok(())
    }

    /// Sends the same register write to every device.
    pub fn broadcast(&mut self, register: Register, value: u8) -> Result<()> {
        debug!(
            "Broadcast {:?} = 0x{:02X} to {} devices",
            register, value, self.devices
        );
        let word = command_word(register, value);
        self.transaction(|_| word)
    }

    /// Writes one column register of one device; the rest of the chain gets no-ops.
    pub fn write_column(&mut self, device: u8, column: u8, value: u8) -> Result<()> {
        let Some(register) = Register::column(column) else {
            return Ok(());
        };
        let word = command_word(register, value);
        self.transaction(|d| if d == device { word } else { NOOP_WORD })
    }

    /// Writes the same column register on every device, each with its own value.
    pub fn write_frame_column<F>(&mut self, column: u8, mut value_for: F) -> Result<()>
    where
        F: FnMut(u8) -> u8,
    {
        let Some(register) = Register::column(column) else {
            return Ok(());
        };
        self.transaction(|d| command_word(register, value_for(d)))
    }

    /// Shifts one word per device and latches the chain.
    pub fn transaction<F>(&mut self, word_for: F) -> Result<()>
    where
        F: FnMut(u8) -> u16,
    {
        let words: Vec<u16> = (0..self.devices).map(word_for).collect();

        drive(&mut self.load, Line::Load, false)?;
        for &word in &words {
            self.shift_out(word)?;
        }
        drive(&mut self.load, Line::Load, false)?;
        drive(&mut self.load, Line::Load, true)?;

        self.transactions += 1;
        debug!("Latched transaction {}: {:04X?}", self.transactions, words);
        Ok(())
    }

    /// Shifts a word MSB first.
    fn shift_out(&mut self, word: u16) -> Result<()> {
        for bit in (0..16).rev() {
            drive(&mut self.clock, Line::Clock, false)?;
            drive(&mut self.data, Line::Data, word & (1 << bit) != 0)?;
            drive(&mut self.clock, Line::Clock, true)?;
        }
        Ok(())
    }

    /// Gives the pins back.
    pub fn release(self) -> (DATA, LOAD, CLK) {
        (self.data, self.load, self.clock)
    }
}
