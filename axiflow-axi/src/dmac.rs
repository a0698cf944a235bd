//! Peripheral request interface of a DMA-330 controller, and a stream writer driven through it.
//!
//! The controller acknowledges on `da` and the peripheral requests on `dr`, both valid/ready
//! channels carrying a request type (ARM DDI 0424D).

use axiflow::{Module, Signal};
use axiflow_std::{Queue, VrChannel};
use serde::Deserialize;
use static_assertions::const_assert;
use tracing::{debug, trace};

use crate::dma::BURST_LENGTH;
use crate::{BusConfig, ConfigError, Endpoint, RRes, Response, WRes};

/// Cycles between a burst request and the controller's first read.
pub const DMAC_LATENCY: usize = 2;

const_assert!(BURST_LENGTH.is_power_of_two());

/// Request and acknowledge type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Signal)]
#[width(2)]
pub enum RequestType {
    /// Single transfer.
    #[default]
    Single,
    /// Burst transfer.
    Burst,
    /// Flush.
    Flush,
    /// Reserved encoding.
    Reserved,
}

/// Controller acknowledge.
#[derive(Debug, Default, Clone, PartialEq, Eq, Signal)]
pub struct Ack {
    /// Acknowledge type.
    #[member(name = "type")]
    pub typ: RequestType,
}

/// Peripheral request.
#[derive(Debug, Default, Clone, PartialEq, Eq, Signal)]
pub struct Request {
    /// Request type.
    #[member(name = "type")]
    pub typ: RequestType,
    /// Last transfer of the DMA sequence.
    pub last: bool,
}

/// Peripheral request bus.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DmacBus {
    /// Acknowledge, driven by the controller.
    pub da: VrChannel<Ack>,
    /// Request, driven by the peripheral.
    pub dr: VrChannel<Request>,
}

impl DmacBus {
    /// Point-to-point connection between a controller and a peripheral.
    pub fn connect(dmac: &mut DmacBus, peripheral: &mut DmacBus) {
        VrChannel::connect(&mut dmac.da, &mut peripheral.da);
        VrChannel::connect(&mut peripheral.dr, &mut dmac.dr);
    }

    /// Appends the bit image of both channels.
    pub fn probe(&self, bits: &mut Vec<bool>) {
        self.da.probe(bits);
        self.dr.probe(bits);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequesterState {
    Idle,
    AckFlush,
    Read,
}

/// Requests burst reads from the controller whenever `burst_request` is high, and answers
/// flushes.
#[derive(Debug)]
pub struct ReadRequester {
    /// Peripheral side of the request bus.
    pub bus: DmacBus,

    /// At least one burst of data is available.
    pub burst_request: bool,

    state: RequesterState,
    da_type: RequestType,
}

impl ReadRequester {
    /// Creates a new requester.
    pub fn new() -> Self {
        Self { bus: DmacBus::default(), burst_request: false, state: RequesterState::Idle, da_type: RequestType::Reserved }
    }

    /// Returns to the idle state.
    pub fn reset(&mut self) {
        self.state = RequesterState::Idle;
        self.da_type = RequestType::Reserved;
    }

    /// Status word: bit 0 `burst_request`, bit 4 idle, bit 5 reading, bits 8-9 the last
    /// acknowledge type.
    pub fn status(&self) -> u32 {
        u32::from(self.burst_request)
            | u32::from(self.state == RequesterState::Idle) << 4
            | u32::from(self.state == RequesterState::Read) << 5
            | (self.da_type as u32) << 8
    }

    fn flush_requested(&self) -> bool { self.bus.da.fwd.valid && self.bus.da.payload().typ == RequestType::Flush }
}

impl Module for ReadRequester {
    fn eval(&mut self) {
        self.bus.da.accept(true);
        match self.state {
            RequesterState::Idle if !self.flush_requested() && self.burst_request => {
                self.bus.dr.offer(Request { typ: RequestType::Burst, last: false })
            }
            RequesterState::AckFlush => self.bus.dr.offer(Request { typ: RequestType::Flush, last: false }),
            _ => self.bus.dr.idle(),
        }
    }

    fn tick(&mut self) {
        let prev = self.state;
        if self.bus.da.fire() {
            self.da_type = self.bus.da.payload().typ;
        }
        self.state = match self.state {
            RequesterState::Idle if self.flush_requested() => RequesterState::AckFlush,
            RequesterState::Idle if self.bus.dr.fire() => RequesterState::Read,
            RequesterState::AckFlush if self.bus.dr.fire() => RequesterState::Idle,
            RequesterState::Read if self.flush_requested() => RequesterState::AckFlush,
            RequesterState::Read if self.bus.da.fwd.valid && self.bus.da.payload().typ == RequestType::Burst => {
                RequesterState::Idle
            }
            state => state,
        };
        if self.state != prev {
            debug!(from = ?prev, to = ?self.state, "read requester");
        }
    }

    fn probe(&self, bits: &mut Vec<bool>) { self.bus.probe(bits) }
}

/// Stream writer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StreamWriterConfig {
    /// Bus.
    pub bus: BusConfig,
    /// Buffer depth in bus words, at least one burst.
    pub fifo_depth: usize,
}

impl Default for StreamWriterConfig {
    fn default() -> Self { Self { bus: BusConfig::default(), fifo_depth: BURST_LENGTH + DMAC_LATENCY } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Write,
    WriteDone,
    Read,
}

/// Hands a word stream to a DMA-330 controller.
///
/// The writer is an AXI target the controller reads from: read bursts are served from the
/// buffer, write bursts are discarded. A burst request is raised whenever the buffer holds at
/// least one burst.
#[derive(Debug)]
pub struct StreamWriter {
    /// Word input.
    pub sink: VrChannel<u64>,

    /// Target side of the bus the controller reads through.
    pub bus: Endpoint,

    /// Peripheral request engine.
    pub requester: ReadRequester,

    fifo: Queue<u64>,
    state: State,
    id: u32,
    remaining: u8,
}

impl StreamWriter {
    /// Creates a new stream writer.
    pub fn new(config: StreamWriterConfig) -> Result<Self, ConfigError> {
        config.bus.validate()?;
        if config.fifo_depth < BURST_LENGTH {
            return Err(ConfigError::DepthBelowBurst { depth: config.fifo_depth, burst: BURST_LENGTH });
        }
        Ok(Self {
            sink: VrChannel::default(),
            bus: Endpoint::default(),
            requester: ReadRequester::new(),
            fifo: Queue::new(config.fifo_depth)?,
            state: State::Idle,
            id: 0,
            remaining: 0,
        })
    }

    /// Is data waiting to be read?
    pub fn busy(&self) -> bool { !self.fifo.is_empty() }

    /// Buffered words.
    pub fn level(&self) -> usize { self.fifo.len() }
}

impl Module for StreamWriter {
    fn eval(&mut self) {
        self.sink.accept(!self.fifo.is_full());

        let idle = self.state == State::Idle;
        self.bus.aw.accept(idle);
        self.bus.ar.accept(idle && !self.bus.aw.fwd.valid);
        self.bus.w.accept(self.state == State::Write);
        self.bus.b.drive(self.state == State::WriteDone, WRes::new(self.id, Response::Okay));
        match self.fifo.front() {
            Some(data) if self.state == State::Read => {
                let beat = RRes::new(self.id, *data, Response::Okay, self.remaining == 0);
                self.bus.r.offer(beat);
            }
            _ => self.bus.r.idle(),
        }

        self.requester.burst_request = self.fifo.len() >= BURST_LENGTH;
        self.requester.eval();
    }

    fn tick(&mut self) {
        let enq = self.sink.fire().then(|| *self.sink.payload());
        self.fifo.update(enq, self.bus.r.fire());

        match self.state {
            State::Idle => {
                if self.bus.aw.fire() {
                    self.id = self.bus.aw.payload().id;
                    self.state = State::Write;
                } else if self.bus.ar.fire() {
                    let cmd = self.bus.ar.payload();
                    debug!(id = cmd.id, len = cmd.len, "controller read");
                    self.id = cmd.id;
                    self.remaining = cmd.len;
                    self.state = State::Read;
                }
            }
            State::Write => {
                if self.bus.w.fire() && self.bus.w.payload().last {
                    self.state = State::WriteDone;
                }
            }
            State::WriteDone => {
                if self.bus.b.fire() {
                    self.state = State::Idle;
                }
            }
            State::Read => {
                if self.bus.r.fire() {
                    trace!(data = self.bus.r.payload().data, "word handed over");
                    if self.remaining == 0 {
                        self.state = State::Idle;
                    } else {
                        self.remaining -= 1;
                    }
                }
            }
        }
        self.requester.tick();
    }

    fn probe(&self, bits: &mut Vec<bool>) {
        self.sink.probe(bits);
        self.bus.probe(bits);
        self.requester.probe(bits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Addr, WReq};

    #[test]
    fn requester_bursts_and_flushes() {
        let mut req = ReadRequester::new();
        req.eval();
        assert!(!req.bus.dr.fwd.valid);
        assert_eq!(req.status(), 0x310);

        req.burst_request = true;
        req.bus.dr.accept(true);
        req.eval();
        assert_eq!(req.bus.dr.payload().typ, RequestType::Burst);
        assert!(req.bus.dr.fire());
        req.tick();
        assert_eq!(req.status() & 0x30, 0x20);

        req.bus.da.offer(Ack { typ: RequestType::Burst });
        req.eval();
        assert!(!req.bus.dr.fwd.valid);
        req.tick();
        assert_eq!(req.status() & 0x30, 0x10);
        assert_eq!(req.status() >> 8, RequestType::Burst as u32);

        req.bus.da.offer(Ack { typ: RequestType::Flush });
        req.eval();
        assert!(!req.bus.dr.fwd.valid, "flush takes precedence");
        req.tick();
        req.bus.da.idle();
        req.eval();
        assert_eq!(req.bus.dr.payload().typ, RequestType::Flush);
        req.tick();
        req.reset();
        assert_eq!(req.status() & 0x30, 0x10);
    }

    #[test]
    fn writer_serves_reads_from_stream() {
        let mut writer = StreamWriter::new(StreamWriterConfig::default()).unwrap();
        writer.requester.bus.dr.accept(true);
        for word in 0..BURST_LENGTH as u64 {
            writer.sink.offer(word);
            writer.eval();
            assert!(writer.sink.fire());
            assert!(!writer.requester.bus.dr.fwd.valid);
            writer.tick();
        }
        writer.sink.idle();
        writer.eval();
        assert!(writer.requester.bus.dr.fire(), "one burst buffered");
        writer.tick();

        writer.bus.ar.offer(Addr::new(5, 0x8000, 2).with_len(BURST_LENGTH as u8 - 1));
        writer.bus.r.accept(true);
        writer.eval();
        assert!(writer.bus.ar.fire());
        writer.tick();
        writer.bus.ar.idle();

        let mut beats = Vec::new();
        while beats.last().map_or(true, |beat: &RRes| !beat.last) {
            writer.eval();
            assert!(writer.bus.r.fire());
            beats.push(writer.bus.r.payload().clone());
            writer.tick();
        }
        assert_eq!(beats.iter().map(|beat| beat.data).collect::<Vec<_>>(), (0..BURST_LENGTH as u64).collect::<Vec<_>>());
        assert!(beats.iter().all(|beat| beat.id == 5));
        assert!(!writer.busy());
    }

    #[test]
    fn writer_discards_writes() {
        let mut writer = StreamWriter::new(StreamWriterConfig::default()).unwrap();
        writer.bus.aw.offer(Addr::new(2, 0, 2));
        writer.bus.w.offer(WReq::new(2, 0xdead, 0xf, true));
        writer.bus.b.accept(true);

        writer.eval();
        assert!(writer.bus.aw.fire());
        assert!(!writer.bus.w.bwd.ready);
        writer.tick();
        writer.bus.aw.idle();

        writer.eval();
        assert!(writer.bus.w.fire());
        writer.tick();
        writer.bus.w.idle();

        writer.eval();
        assert!(writer.bus.b.fire());
        assert_eq!(*writer.bus.b.payload(), WRes::new(2, Response::Okay));
        writer.tick();
        assert_eq!(writer.level(), 0);
    }

    #[test]
    fn depth_below_burst() {
        let config = StreamWriterConfig { fifo_depth: 8, ..StreamWriterConfig::default() };
        assert_eq!(StreamWriter::new(config).unwrap_err(), ConfigError::DepthBelowBurst { depth: 8, burst: 16 });
    }
}
