//! Register bus and register file.

use axiflow::{mask, Module, Signal};
use tracing::trace;

use crate::ConfigError;

/// Narrow single-beat register bus.
///
/// `adr`, `dat_w` and `we` are driven by the initiator, `dat_r` by the target. A write commits on
/// the edge where `we` is high; `dat_r` holds the word at the previous cycle's `adr`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Signal)]
pub struct CsrBus {
    /// Register address.
    pub adr: u32,
    /// Write data.
    pub dat_w: u32,
    /// Read data.
    pub dat_r: u32,
    /// Write enable.
    pub we: bool,
}

impl CsrBus {
    /// Ties an initiator's register bus to a target's.
    pub fn connect(initiator: &mut CsrBus, target: &mut CsrBus) {
        target.adr = initiator.adr;
        target.dat_w = initiator.dat_w;
        target.we = initiator.we;
        initiator.dat_r = target.dat_r;
    }
}

/// Checks a register width against a bus data width.
pub(crate) fn check_register_width(width: usize, bus: usize) -> Result<(), ConfigError> {
    if ![8, 16, 32].contains(&width) || width > bus {
        return Err(ConfigError::RegisterWidth { width, bus });
    }
    Ok(())
}

/// Register file: `2^adr_width` words behind a register bus, read synchronously.
#[derive(Debug)]
pub struct RegisterFile {
    /// Target side of the register bus.
    pub bus: CsrBus,

    mem: Vec<u32>,
    data_width: usize,
    dat_r: u32,
}

impl RegisterFile {
    /// Creates a new register file of zeroed words.
    pub fn new(adr_width: usize, data_width: usize) -> Result<Self, ConfigError> {
        check_register_width(data_width, 32)?;
        if adr_width > 20 {
            return Err(ConfigError::AddrWidth(adr_width));
        }
        Ok(Self { bus: CsrBus::default(), mem: vec![0; 1 << adr_width], data_width, dat_r: 0 })
    }

    /// Word at `adr`, wrapped to the file.
    pub fn peek(&self, adr: u32) -> u32 { self.mem[self.index(adr)] }

    /// Overwrites the word at `adr`.
    pub fn poke(&mut self, adr: u32, value: u32) {
        let index = self.index(adr);
        self.mem[index] = value & mask(self.data_width) as u32;
    }

    fn index(&self, adr: u32) -> usize { adr as usize & (self.mem.len() - 1) }
}

impl Module for RegisterFile {
    fn eval(&mut self) { self.bus.dat_r = self.dat_r; }

    fn tick(&mut self) {
        let index = self.index(self.bus.adr);
        self.dat_r = self.mem[index];
        if self.bus.we {
            trace!(adr = self.bus.adr, data = self.bus.dat_w, "register write");
            self.mem[index] = self.bus.dat_w & mask(self.data_width) as u32;
        }
    }

    fn probe(&self, bits: &mut Vec<bool>) { bits.extend(self.bus.transl()) }
}
