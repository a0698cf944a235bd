//! Bridge from the burst bus to the register bus.
//!
//! Every bus beat maps to `ratio = data_width / register width` consecutive register addresses:
//! the beat at byte address `a` covers registers `(a / bytes) * ratio .. (a / bytes + 1) * ratio`,
//! sub-word `k` holding data bits `k * width ..`. Writes visit the sub-words whose strobe lanes
//! are set; a fully strobed sub-word is written directly, a partially strobed one is read first
//! and merged. Reads collect every sub-word, one register read at a time.

use axiflow::{clog2, mask, ok_or, Module};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::csr::check_register_width;
use crate::{Addr, BurstCursor, BurstDescriptor, BusConfig, ConfigError, CsrBus, Endpoint, RRes, Response, WRes};

/// Bridge parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Burst bus.
    pub bus: BusConfig,
    /// Register width: 8, 16 or 32 bits, at most the bus width.
    pub csr_data_width: usize,
    /// Register address width.
    pub csr_adr_width: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self { Self { bus: BusConfig::default(), csr_data_width: 8, csr_adr_width: 14 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    /// Waiting for a write beat, next sub-word to visit.
    Write { sub: usize },
    /// Read-modify-write of a partially strobed sub-word.
    Merge { sub: usize },
    WriteDone,
    /// Reading sub-word `sub` of the current beat.
    Read { sub: usize },
    ReadDone,
}

/// Register-bus bridge.
#[derive(Debug)]
pub struct Bridge {
    /// Target side of the burst bus.
    pub bus: Endpoint,

    /// Initiator side of the register bus. `adr`, `dat_w` and `we` are registers of the bridge.
    pub csr: CsrBus,

    config: BridgeConfig,
    ratio: usize,
    state: State,
    id: u32,
    cursor: BurstCursor,
    pending: bool,
    r_data: u64,
}

impl Bridge {
    /// Creates a new bridge.
    pub fn new(config: BridgeConfig) -> Result<Self, ConfigError> {
        let bus = config.bus.validate()?;
        check_register_width(config.csr_data_width, bus.data_width)?;
        if config.csr_adr_width == 0 || config.csr_adr_width > 32 {
            return Err(ConfigError::AddrWidth(config.csr_adr_width));
        }
        Ok(Self {
            bus: Endpoint::default(),
            csr: CsrBus::default(),
            ratio: bus.data_width / config.csr_data_width,
            config,
            state: State::Idle,
            id: 0,
            cursor: BurstCursor::new(BurstDescriptor::single(0, 0)),
            pending: false,
            r_data: 0,
        })
    }

    /// Register accesses per bus beat.
    pub fn ratio(&self) -> usize { self.ratio }

    /// Is a transaction in flight?
    pub fn busy(&self) -> bool { self.state != State::Idle }

    /// First register address of the beat at `addr`.
    fn base(&self, addr: u64) -> u32 {
        let word = (addr & self.config.bus.addr_mask()) >> clog2(self.config.bus.bytes());
        ((word * self.ratio as u64) & mask(self.config.csr_adr_width)) as u32
    }

    /// Strobe lanes of sub-word `sub`.
    fn lanes(&self, strb: u8, sub: usize) -> u8 {
        let lanes = self.config.csr_data_width / 8;
        ((u64::from(strb) >> (sub * lanes)) & mask(lanes)) as u8
    }

    fn is_full(&self, lanes: u8) -> bool { u64::from(lanes) == mask(self.config.csr_data_width / 8) }

    /// First sub-word at or after `from` with a strobe lane set.
    fn next_lane(&self, strb: u8, from: usize) -> Option<usize> { (from..self.ratio).find(|sub| self.lanes(strb, *sub) != 0) }

    fn sub_word(&self, data: u64, sub: usize) -> u32 {
        ((data >> (sub * self.config.csr_data_width)) & mask(self.config.csr_data_width)) as u32
    }

    /// Is the offered write beat consumed this cycle?
    fn write_ready(&self) -> bool {
        let strb = self.bus.w.payload().strb;
        match self.state {
            State::Write { sub } => match self.next_lane(strb, sub) {
                None => true,
                Some(k) => self.is_full(self.lanes(strb, k)) && self.next_lane(strb, k + 1).is_none(),
            },
            State::Merge { sub } => !self.pending && self.next_lane(strb, sub + 1).is_none(),
            _ => false,
        }
    }

    fn start(&mut self, cmd: &Addr) -> BurstDescriptor {
        let burst = ok_or!(
            BurstDescriptor::from_command(cmd).and_then(|burst| burst.check_size(&self.config.bus)),
            BurstDescriptor::single(cmd.addr, self.config.bus.max_size())
        );
        self.id = cmd.id;
        self.cursor = BurstCursor::new(burst);
        burst
    }

    /// Commits sub-word `sub` of the held beat and moves past it.
    fn commit(&mut self, sub: usize, data: u32) {
        let beat = self.bus.w.payload().clone();
        self.csr.adr = self.base(self.cursor.addr()) + sub as u32;
        self.csr.dat_w = data;
        self.csr.we = true;
        trace!(adr = self.csr.adr, data, "register write issued");
        match self.next_lane(beat.strb, sub + 1) {
            Some(_) => self.state = State::Write { sub: sub + 1 },
            None => self.finish_beat(beat.last),
        }
    }

    fn finish_beat(&mut self, last: bool) {
        if last {
            self.state = State::WriteDone;
        } else {
            self.cursor.advance();
            self.state = State::Write { sub: 0 };
        }
    }

    /// Issues the read of sub-word `sub` of the current beat.
    fn read(&mut self, sub: usize) {
        self.csr.adr = self.base(self.cursor.addr()) + sub as u32;
        self.pending = true;
        self.state = State::Read { sub };
    }
}

impl Module for Bridge {
    fn eval(&mut self) {
        let idle = self.state == State::Idle;
        self.bus.aw.accept(idle);
        self.bus.ar.accept(idle && !self.bus.aw.fwd.valid);
        let ready = self.write_ready();
        self.bus.w.accept(ready);

        self.bus.b.drive(self.state == State::WriteDone, WRes::new(self.id, Response::Okay));
        self.bus.r.drive(
            self.state == State::ReadDone,
            RRes::new(self.id, self.r_data, Response::Okay, self.cursor.is_last()),
        );
    }

    fn tick(&mut self) {
        let prev = self.state;
        let pending = self.pending;
        self.pending = false;
        self.csr.we = false;

        match self.state {
            State::Idle => {
                if self.bus.aw.fire() {
                    let cmd = self.bus.aw.payload().clone();
                    let burst = self.start(&cmd);
                    debug!(id = cmd.id, addr = cmd.addr, beats = burst.beats(), "bridge write");
                    self.state = State::Write { sub: 0 };
                } else if self.bus.ar.fire() {
                    let cmd = self.bus.ar.payload().clone();
                    let burst = self.start(&cmd);
                    debug!(id = cmd.id, addr = cmd.addr, beats = burst.beats(), "bridge read");
                    self.r_data = 0;
                    self.read(0);
                }
            }
            State::Write { sub } => {
                if self.bus.w.fwd.valid {
                    let beat = self.bus.w.payload().clone();
                    match self.next_lane(beat.strb, sub) {
                        None => self.finish_beat(beat.last),
                        Some(k) if self.is_full(self.lanes(beat.strb, k)) => {
                            let data = self.sub_word(beat.data, k);
                            self.commit(k, data);
                        }
                        Some(k) => {
                            self.csr.adr = self.base(self.cursor.addr()) + k as u32;
                            self.pending = true;
                            self.state = State::Merge { sub: k };
                        }
                    }
                }
            }
            State::Merge { sub } => {
                if !pending {
                    let beat = self.bus.w.payload().clone();
                    let lanes = self.lanes(beat.strb, sub);
                    let byte_mask = (0..8).filter(|i| lanes & (1 << i) != 0).fold(0u32, |acc, i| acc | (0xff << (i * 8)));
                    let merged = (self.csr.dat_r & !byte_mask) | (self.sub_word(beat.data, sub) & byte_mask);
                    self.commit(sub, merged);
                }
            }
            State::WriteDone => {
                if self.bus.b.fire() {
                    self.state = State::Idle;
                }
            }
            State::Read { sub } => {
                if !pending {
                    let word = u64::from(self.csr.dat_r) & mask(self.config.csr_data_width);
                    self.r_data |= word << (sub * self.config.csr_data_width);
                    if sub + 1 < self.ratio {
                        self.read(sub + 1);
                    } else {
                        self.state = State::ReadDone;
                    }
                }
            }
            State::ReadDone => {
                if self.bus.r.fire() {
                    if self.cursor.is_last() {
                        self.state = State::Idle;
                    } else {
                        self.cursor.advance();
                        self.r_data = 0;
                        self.read(0);
                    }
                }
            }
        }

        if self.state != prev {
            debug!(from = ?prev, to = ?self.state, "bridge state");
        }
    }

    fn probe(&self, bits: &mut Vec<bool>) {
        self.bus.probe(bits);
        bits.push(self.csr.we);
        bits.push(self.pending);
    }
}
