//! SRAM target.

use axiflow::{align_down, ok_or, some_or, Module};
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::{Addr, Burst, BurstCursor, BurstDescriptor, BusConfig, ConfigError, Endpoint, RRes, Response, WRes};

/// SRAM parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SramConfig {
    /// Bus.
    pub bus: BusConfig,
    /// Address of the first byte.
    pub base: u64,
    /// Size in bytes: a power of two of at least one bus word.
    pub size: usize,
    /// Refuse writes with `slverr`.
    pub read_only: bool,
}

impl Default for SramConfig {
    fn default() -> Self { Self { bus: BusConfig::default(), base: 0, size: 4096, read_only: false } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    Idle,
    /// One cycle of read latency per burst.
    Wait,
    Read,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteState {
    Idle,
    Write,
    Resp,
}

/// Burst in progress on one side of the SRAM.
#[derive(Debug, Clone, Copy)]
struct Access {
    id: u32,
    cursor: BurstCursor,
    error: bool,
}

impl Access {
    fn idle() -> Self { Self { id: 0, cursor: BurstCursor::new(BurstDescriptor::single(0, 0)), error: false } }
}

/// AXI target over a byte array.
///
/// Writes take priority: a read command is accepted only while no write command is offered and no
/// write burst is open. Beats outside the array, or of a malformed burst, are answered `slverr`.
#[derive(Debug)]
pub struct Sram {
    /// Target side of the bus.
    pub bus: Endpoint,

    config: SramConfig,
    mem: Vec<u8>,
    read: ReadState,
    write: WriteState,
    r_access: Access,
    w_access: Access,
}

impl Sram {
    /// Creates a new zeroed SRAM.
    pub fn new(config: SramConfig) -> Result<Self, ConfigError> {
        let bus = config.bus.validate()?;
        if !config.size.is_power_of_two() || config.size < bus.bytes() {
            return Err(ConfigError::MemorySize(config.size));
        }
        if config.base % bus.bytes() as u64 != 0 {
            return Err(ConfigError::MemoryBase { base: config.base, bytes: bus.bytes() });
        }
        Ok(Self {
            bus: Endpoint::default(),
            config,
            mem: vec![0; config.size],
            read: ReadState::Idle,
            write: WriteState::Idle,
            r_access: Access::idle(),
            w_access: Access::idle(),
        })
    }

    /// Offset of the bus word holding `addr`, if it lies in the array.
    fn offset(&self, addr: u64) -> Option<usize> {
        let bytes = self.config.bus.bytes() as u64;
        let offset = align_down(addr, bytes).checked_sub(self.config.base)?;
        (offset + bytes <= self.config.size as u64).then_some(offset as usize)
    }

    /// Bus word at `addr`, little endian.
    pub fn read_word(&self, addr: u64) -> Option<u64> {
        let offset = self.offset(addr)?;
        let bytes = &self.mem[offset..offset + self.config.bus.bytes()];
        Some(bytes.iter().rev().fold(0, |word, byte| (word << 8) | u64::from(*byte)))
    }

    /// Copies `data` into the array from `addr`; bytes outside the array are dropped.
    pub fn load(&mut self, addr: u64, data: &[u8]) {
        for (i, byte) in data.iter().enumerate() {
            let offset = (addr + i as u64).checked_sub(self.config.base).filter(|offset| *offset < self.config.size as u64);
            match offset {
                Some(offset) => self.mem[offset as usize] = *byte,
                None => warn!(addr = addr + i as u64, "load outside the array"),
            }
        }
    }

    fn start(&self, cmd: &Addr) -> Access {
        match BurstDescriptor::from_command(cmd).and_then(|desc| desc.check_size(&self.config.bus)) {
            Ok(desc) => Access { id: cmd.id, cursor: BurstCursor::new(desc), error: false },
            Err(err) => {
                warn!(id = cmd.id, addr = cmd.addr, %err, "malformed burst");
                // Full-width incrementing beats keep `last` in step with the initiator's burst.
                let max_size = self.config.bus.max_size();
                let desc = ok_or!(
                    BurstDescriptor::new(cmd.addr, cmd.len, max_size, Burst::Incr),
                    BurstDescriptor::single(cmd.addr, max_size)
                );
                Access { id: cmd.id, cursor: BurstCursor::new(desc), error: true }
            }
        }
    }

    fn write_beat(&mut self, data: u64, strb: u8) -> bool {
        let addr = self.w_access.cursor.addr();
        let offset = some_or!(self.offset(addr), {
            warn!(addr, "write outside the array");
            return false;
        });
        if self.config.read_only {
            return false;
        }
        for lane in 0..self.config.bus.bytes() {
            if strb & (1 << lane) != 0 {
                self.mem[offset + lane] = (data >> (8 * lane)) as u8;
            }
        }
        trace!(addr, data, strb, "sram write");
        true
    }
}

impl Module for Sram {
    fn eval(&mut self) {
        self.bus.aw.accept(self.write == WriteState::Idle);
        self.bus.ar.accept(
            self.read == ReadState::Idle && self.write == WriteState::Idle && !self.bus.aw.fwd.valid,
        );
        self.bus.w.accept(self.write == WriteState::Write);

        let resp = if self.w_access.error { Response::SlvErr } else { Response::Okay };
        self.bus.b.drive(self.write == WriteState::Resp, WRes::new(self.w_access.id, resp));

        let addr = self.r_access.cursor.addr();
        let (data, resp) = match self.read_word(addr) {
            Some(data) if !self.r_access.error => (data, Response::Okay),
            _ => (0, Response::SlvErr),
        };
        let beat = RRes::new(self.r_access.id, data, resp, self.r_access.cursor.is_last());
        self.bus.r.drive(self.read == ReadState::Read, beat);
    }

    fn tick(&mut self) {
        match self.write {
            WriteState::Idle => {
                if self.bus.aw.fire() {
                    let cmd = self.bus.aw.payload().clone();
                    debug!(id = cmd.id, addr = cmd.addr, len = cmd.len, "sram write burst");
                    self.w_access = self.start(&cmd);
                    self.write = WriteState::Write;
                }
            }
            WriteState::Write => {
                if self.bus.w.fire() {
                    let beat = self.bus.w.payload().clone();
                    if !self.write_beat(beat.data, beat.strb) {
                        self.w_access.error = true;
                    }
                    if beat.last {
                        self.write = WriteState::Resp;
                    } else {
                        self.w_access.cursor.advance();
                    }
                }
            }
            WriteState::Resp => {
                if self.bus.b.fire() {
                    self.write = WriteState::Idle;
                }
            }
        }

        match self.read {
            ReadState::Idle => {
                if self.bus.ar.fire() {
                    let cmd = self.bus.ar.payload().clone();
                    debug!(id = cmd.id, addr = cmd.addr, len = cmd.len, "sram read burst");
                    self.r_access = self.start(&cmd);
                    self.read = ReadState::Wait;
                }
            }
            ReadState::Wait => self.read = ReadState::Read,
            ReadState::Read => {
                if self.bus.r.fire() {
                    if self.offset(self.r_access.cursor.addr()).is_none() {
                        warn!(addr = self.r_access.cursor.addr(), "read outside the array");
                    }
                    if self.r_access.cursor.is_last() {
                        self.read = ReadState::Idle;
                    } else {
                        self.r_access.cursor.advance();
                    }
                }
            }
        }
    }

    fn probe(&self, bits: &mut Vec<bool>) { self.bus.probe(bits) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WReq;

    fn sram() -> Sram { Sram::new(SramConfig { base: 0x1000, size: 256, ..SramConfig::default() }).unwrap() }

    #[test]
    fn sizes() {
        let config = SramConfig { size: 100, ..SramConfig::default() };
        assert_eq!(Sram::new(config).unwrap_err(), ConfigError::MemorySize(100));
        let config = SramConfig { size: 2, ..SramConfig::default() };
        assert_eq!(Sram::new(config).unwrap_err(), ConfigError::MemorySize(2));
        let config = SramConfig { base: 0x1002, size: 16, ..SramConfig::default() };
        assert_eq!(Sram::new(config).unwrap_err(), ConfigError::MemoryBase { base: 0x1002, bytes: 4 });
    }

    #[test]
    fn words_at_the_edges() {
        let mut sram = sram();
        sram.load(0x10fc, &[0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(sram.read_word(0x10fe), Some(0x4433_2211));
        assert_eq!(sram.read_word(0x1100), None);
        assert_eq!(sram.read_word(0xffc), None);
    }

    #[test]
    fn read_only_refuses_writes() {
        let config = SramConfig { base: 0x1000, size: 256, read_only: true, ..SramConfig::default() };
        let mut sram = Sram::new(config).unwrap();
        sram.load(0x1000, &[1, 2, 3, 4]);
        sram.bus.aw.offer(Addr::new(3, 0x1000, 2));
        sram.bus.b.accept(true);
        sram.eval();
        assert!(sram.bus.aw.fire());
        sram.tick();

        sram.bus.aw.idle();
        sram.bus.w.offer(WReq::new(3, 0xdead_beef, 0xf, true));
        sram.eval();
        assert!(sram.bus.w.fire());
        sram.tick();

        sram.bus.w.idle();
        sram.eval();
        assert!(sram.bus.b.fire());
        assert_eq!(*sram.bus.b.payload(), WRes::new(3, Response::SlvErr));
        sram.tick();
        assert_eq!(sram.read_word(0x1000), Some(0x0403_0201));
    }

    #[test]
    fn strobed_burst_write() {
        let mut sram = sram();
        sram.load(0x1000, &[0xff; 8]);
        sram.bus.aw.offer(Addr::new(4, 0x1000, 2).with_len(1));
        sram.bus.b.accept(true);
        sram.eval();
        assert!(sram.bus.aw.fire());
        sram.tick();

        sram.bus.aw.idle();
        sram.bus.w.offer(WReq::new(4, 0x4433_2211, 0b0101, false));
        sram.eval();
        sram.tick();
        sram.bus.w.offer(WReq::new(4, 0x8877_6655, 0b1111, true));
        sram.eval();
        sram.tick();

        sram.bus.w.idle();
        sram.eval();
        assert_eq!(*sram.bus.b.payload(), WRes::new(4, Response::Okay));
        assert!(sram.bus.b.fire());
        sram.tick();
        assert_eq!(sram.read_word(0x1000), Some(0xff33_ff11));
        assert_eq!(sram.read_word(0x1004), Some(0x8877_6655));
    }

    #[test]
    fn read_burst_waits_one_cycle() {
        let mut sram = sram();
        sram.load(0x1010, &[1, 0, 0, 0, 2, 0, 0, 0]);
        sram.bus.ar.offer(Addr::new(9, 0x1010, 2).with_len(1));
        sram.bus.r.accept(true);
        sram.eval();
        assert!(sram.bus.ar.fire());
        sram.tick();
        sram.bus.ar.idle();

        sram.eval();
        assert!(!sram.bus.r.fwd.valid);
        sram.tick();

        let mut beats = Vec::new();
        for _ in 0..2 {
            sram.eval();
            assert!(sram.bus.r.fire());
            beats.push(sram.bus.r.payload().clone());
            sram.tick();
        }
        assert_eq!(beats, vec![RRes::new(9, 1, Response::Okay, false), RRes::new(9, 2, Response::Okay, true)]);
        sram.eval();
        assert!(!sram.bus.r.fwd.valid);
    }

    #[test]
    fn write_priority_and_errors() {
        let mut sram = sram();
        sram.bus.aw.offer(Addr::new(1, 0x2000, 2));
        sram.bus.ar.offer(Addr::new(2, 0x1000, 2));
        sram.bus.b.accept(true);
        sram.eval();
        assert!(sram.bus.aw.fire());
        assert!(!sram.bus.ar.bwd.ready, "writes first");
        sram.tick();

        sram.bus.aw.idle();
        sram.bus.w.offer(WReq::new(1, 0, 0xf, true));
        sram.eval();
        assert!(!sram.bus.ar.bwd.ready, "no read while a write burst is open");
        sram.tick();

        sram.bus.w.idle();
        sram.eval();
        assert_eq!(sram.bus.b.payload().resp, Response::SlvErr);
        sram.tick();

        sram.eval();
        assert!(sram.bus.ar.fire());
    }
}
