//! Burst address generation.

use axiflow::align_down;
use thiserror::Error;

use crate::{Addr, Burst, BusConfig};

/// Bursts never cross a page of this many bytes; incrementing addresses stay inside it.
pub const PAGE_SIZE: u64 = 4096;

/// Malformed burst command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BurstError {
    /// Wrapping burst whose beat count is not 1, 2, 4, 8 or 16.
    #[error("wrapping burst of {beats} beats (must be 1, 2, 4, 8 or 16)")]
    WrapLength {
        /// Beat count.
        beats: usize,
    },

    /// Reserved burst type.
    #[error("reserved burst type")]
    Reserved,

    /// Burst of no beats, or longer than a command can describe.
    #[error("burst of {beats} beats (must be 1 to 256)")]
    Length {
        /// Beat count.
        beats: usize,
    },

    /// Transfer size wider than the data bus.
    #[error("transfer size {size} is wider than the {bytes}-byte bus")]
    Size {
        /// Transfer size.
        size: u8,
        /// Bytes per beat of the bus.
        bytes: usize,
    },
}

/// Validated burst: start address, beat count, transfer size and type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstDescriptor {
    addr: u64,
    len: u8,
    size: u8,
    burst: Burst,
}

impl BurstDescriptor {
    /// Creates a new burst descriptor.
    pub fn new(addr: u64, len: u8, size: u8, burst: Burst) -> Result<Self, BurstError> {
        match burst {
            Burst::Reserved => return Err(BurstError::Reserved),
            Burst::Wrap if ![1, 2, 4, 8, 16].contains(&(usize::from(len) + 1)) => {
                return Err(BurstError::WrapLength { beats: usize::from(len) + 1 })
            }
            _ => {}
        }
        if size > 7 {
            return Err(BurstError::Size { size, bytes: 128 });
        }
        Ok(Self { addr, len, size, burst })
    }

    /// Descriptor of a command.
    pub fn from_command(cmd: &Addr) -> Result<Self, BurstError> { Self::new(cmd.addr, cmd.len, cmd.size, cmd.burst) }

    /// Single beat at `addr`, for commands that cannot be honoured.
    pub fn single(addr: u64, size: u8) -> Self { Self { addr, len: 0, size: size.min(7), burst: Burst::Fixed } }

    /// Checks that the transfer size fits the bus.
    pub fn check_size(self, config: &BusConfig) -> Result<Self, BurstError> {
        if self.size > config.max_size() {
            return Err(BurstError::Size { size: self.size, bytes: config.bytes() });
        }
        Ok(self)
    }

    /// Start address.
    pub fn addr(&self) -> u64 { self.addr }

    /// Number of beats.
    pub fn beats(&self) -> usize { usize::from(self.len) + 1 }

    /// Bytes per beat.
    pub fn step(&self) -> u64 { 1 << self.size }

    /// Transfer size.
    pub fn size(&self) -> u8 { self.size }

    /// Burst type.
    pub fn burst(&self) -> Burst { self.burst }

    /// Aligned window `(base, bytes)` of a wrapping burst.
    pub fn wrap_window(&self) -> Option<(u64, u64)> {
        match self.burst {
            Burst::Wrap => {
                let bytes = self.step() * self.beats() as u64;
                Some((align_down(self.addr, bytes), bytes))
            }
            _ => None,
        }
    }

    /// Address of the beat following the one at `addr`.
    pub fn next_addr(&self, addr: u64) -> u64 {
        let step = self.step();
        match self.burst {
            Burst::Fixed | Burst::Reserved => addr,
            Burst::Incr => {
                let page = align_down(addr, PAGE_SIZE);
                page | ((align_down(addr, step) + step) % PAGE_SIZE)
            }
            Burst::Wrap => {
                let bytes = step * self.beats() as u64;
                let base = align_down(addr, bytes);
                let next = align_down(addr, step) + step;
                if next >= base + bytes {
                    base
                } else {
                    next
                }
            }
        }
    }

    /// Addresses of every beat, in order.
    pub fn addresses(&self) -> impl Iterator<Item = u64> + '_ {
        std::iter::successors(Some(self.addr), move |addr| Some(self.next_addr(*addr))).take(self.beats())
    }
}

/// Position inside a burst: the current beat and its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstCursor {
    desc: BurstDescriptor,
    addr: u64,
    beat: usize,
}

impl BurstCursor {
    /// Cursor on the first beat of `desc`.
    pub fn new(desc: BurstDescriptor) -> Self { Self { desc, addr: desc.addr(), beat: 0 } }

    /// Burst being walked.
    pub fn desc(&self) -> &BurstDescriptor { &self.desc }

    /// Address of the current beat.
    pub fn addr(&self) -> u64 { self.addr }

    /// Index of the current beat.
    pub fn beat(&self) -> usize { self.beat }

    /// Is the current beat the last one?
    pub fn is_last(&self) -> bool { self.beat + 1 >= self.desc.beats() }

    /// Moves to the next beat.
    pub fn advance(&mut self) {
        self.addr = self.desc.next_addr(self.addr);
        self.beat += 1;
    }
}
