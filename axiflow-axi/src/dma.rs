//! Streaming DMA engines.
//!
//! [`Reader`] turns `{addr, n}` requests into a stream of elements read with incrementing bursts;
//! [`Writer`] turns a stream of words into write bursts. Bursts run for the buffer length but stop
//! at the end of a page. Both buffer at most one burst.

use axiflow::{align_down, Module, Signal};
use axiflow_std::{Countdown, DownConverter, Fifo, Queue, UpDownCounter, VrChannel};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::{Addr, Burst, BusConfig, ConfigError, Endpoint, WReq, PAGE_SIZE};

/// Longest burst issued by the engines.
pub const BURST_LENGTH: usize = 16;

/// Burst length for a buffer of `depth` words.
pub fn burst_length(depth: usize) -> Result<usize, ConfigError> {
    let length = depth.min(BURST_LENGTH);
    if length == 0 || BURST_LENGTH % length != 0 {
        return Err(ConfigError::BurstLength { depth, max: BURST_LENGTH });
    }
    Ok(length)
}

/// Read request: `n` bus words from `addr`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Signal)]
pub struct ReadRequest {
    /// Start address, aligned down to the bus word.
    pub addr: u64,
    /// Number of bus words.
    pub n: u32,
}

/// Stream element.
#[derive(Debug, Default, Clone, PartialEq, Eq, Signal)]
pub struct Element {
    /// Element data.
    pub data: u64,
    /// Last element of the request.
    pub eop: bool,
}

/// Write stream word.
#[derive(Debug, Default, Clone, PartialEq, Eq, Signal)]
pub struct WriteElement {
    /// Start address of the run, sampled on its first word.
    pub addr: u64,
    /// Bus word.
    pub data: u64,
    /// End of the run. The word carries no data of its own.
    pub eop: bool,
}

fn burst_command(addr: u64, beats: usize, bus: &BusConfig) -> Addr {
    Addr::new(0, addr, bus.max_size()).with_len((beats - 1) as u8).with_burst(Burst::Incr)
}

/// Beats of a burst from the word-aligned `addr`: `length`, cut at the end of the page.
fn page_beats(addr: u64, length: usize, bus: &BusConfig) -> usize {
    let room = (PAGE_SIZE - addr % PAGE_SIZE) / bus.bytes() as u64;
    length.min(room as usize)
}

/// Reader parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Bus.
    pub bus: BusConfig,
    /// Width of the emitted elements; divides the bus width.
    pub element_width: usize,
    /// Read buffer depth in bus words.
    pub fifo_depth: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self { Self { bus: BusConfig::default(), element_width: 32, fifo_depth: BURST_LENGTH } }
}

/// Streaming DMA reader.
///
/// A request is accepted only once the previous one has been fully emitted. Bursts of the buffer
/// length are issued from the word-aligned request address, the next one only after the buffer
/// has drained; read data beyond the requested `n` words is dropped. The last element carries
/// `eop`.
#[derive(Debug)]
pub struct Reader {
    /// Request input.
    pub sink: VrChannel<ReadRequest>,

    /// Element output.
    pub source: VrChannel<Element>,

    /// Read channels of the bus (`ar`, `r`); the write channels stay idle.
    pub bus: Endpoint,

    config: ReaderConfig,
    length: usize,
    rfifo: Fifo<u64>,
    converter: DownConverter,

    next_addr: u64,
    to_issue: u64,
    to_keep: Countdown,
    elements: Countdown,
    in_flight: bool,
}

impl Reader {
    /// Creates a new reader.
    pub fn new(config: ReaderConfig) -> Result<Self, ConfigError> {
        let bus = config.bus.validate()?;
        let element = config.element_width;
        if element == 0 || element % 8 != 0 || bus.data_width % element != 0 {
            return Err(ConfigError::ElementWidth { element, bus: bus.data_width });
        }
        let length = burst_length(config.fifo_depth)?;
        Ok(Self {
            sink: VrChannel::default(),
            source: VrChannel::default(),
            bus: Endpoint::default(),
            config,
            length,
            rfifo: Fifo::new(length)?,
            converter: DownConverter::new(bus.data_width, element)?,
            next_addr: 0,
            to_issue: 0,
            to_keep: Countdown::new(),
            elements: Countdown::new(),
            in_flight: false,
        })
    }

    /// Burst length in beats.
    pub fn burst_length(&self) -> usize { self.length }

    /// Has the last request been fully emitted?
    pub fn is_idle(&self) -> bool {
        self.to_issue == 0 && !self.in_flight && self.rfifo.is_empty() && self.elements.done()
    }
}

impl Module for Reader {
    fn eval(&mut self) {
        // Read data into the buffer, surplus beats dropped.
        let keep = !self.to_keep.done();
        self.rfifo.sink.fwd.inner = self.bus.r.payload().data;
        self.rfifo.sink.fwd.valid = self.bus.r.fwd.valid && self.in_flight && keep;
        self.rfifo.eval();
        self.bus.r.accept(self.in_flight && (!keep || self.rfifo.sink.bwd.ready));

        // Buffer through the width converter.
        self.converter.sink.fwd = self.rfifo.source.fwd.clone();
        self.converter.source.bwd = self.source.bwd.clone();
        self.converter.eval();
        self.rfifo.source.bwd = self.converter.sink.bwd.clone();
        let element = Element { data: *self.converter.source.payload(), eop: self.elements.count() == 1 };
        self.source.drive(self.converter.source.fwd.valid, element);

        self.sink.accept(self.is_idle());
        let beats = page_beats(self.next_addr, self.length, &self.config.bus);
        self.bus.ar.drive(
            self.to_issue > 0 && !self.in_flight && self.rfifo.is_empty(),
            burst_command(self.next_addr, beats, &self.config.bus),
        );
        self.bus.aw.idle();
        self.bus.w.idle();
        self.bus.b.accept(false);
    }

    fn tick(&mut self) {
        if self.sink.fire() {
            let req = self.sink.payload();
            debug!(addr = req.addr, n = req.n, "read request");
            self.next_addr = align_down(req.addr, self.config.bus.bytes() as u64);
            self.to_issue = u64::from(req.n);
            self.to_keep.load(u64::from(req.n));
            self.elements.load(u64::from(req.n) * self.converter.ratio() as u64);
        }
        if self.bus.ar.fire() {
            let beats = page_beats(self.next_addr, self.length, &self.config.bus);
            trace!(addr = self.next_addr, beats, "read burst issued");
            self.in_flight = true;
            self.to_issue = self.to_issue.saturating_sub(beats as u64);
            self.next_addr += (beats * self.config.bus.bytes()) as u64;
        }
        if self.bus.r.fire() {
            if !self.to_keep.done() {
                self.to_keep.decrement();
            }
            if self.bus.r.payload().last {
                self.in_flight = false;
            }
        }
        if self.source.fire() {
            self.elements.decrement();
        }
        self.rfifo.tick();
        self.converter.tick();
    }

    fn probe(&self, bits: &mut Vec<bool>) {
        self.sink.probe(bits);
        self.source.probe(bits);
        self.bus.probe(bits);
        self.rfifo.probe(bits);
        self.converter.probe(bits);
    }
}

/// Writer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Bus.
    pub bus: BusConfig,
    /// Write buffer depth in bus words.
    pub fifo_depth: usize,
}

impl Default for WriterConfig {
    fn default() -> Self { Self { bus: BusConfig::default(), fifo_depth: BURST_LENGTH } }
}

/// Streaming DMA writer.
///
/// Words of a run are written with bursts of the buffer length, cut at page ends, full strobes.
/// The first word of a run supplies the run's start address; each further burst starts right
/// after the previous one. The `eop` word closes the run: while a burst is open it is repeated as padding up to the
/// burst end, and it is accepted once every burst of the run has been answered.
#[derive(Debug)]
pub struct Writer {
    /// Word input.
    pub sink: VrChannel<WriteElement>,

    /// Write channels of the bus (`aw`, `w`, `b`); the read channels stay idle.
    pub bus: Endpoint,

    config: WriterConfig,
    length: usize,
    wfifo: Queue<WReq>,
    commands: Queue<(u64, usize)>,
    remaining: Countdown,
    next_addr: u64,
    sof: bool,
    addressed: UpDownCounter,
    responses: UpDownCounter,
}

impl Writer {
    /// Creates a new writer.
    pub fn new(config: WriterConfig) -> Result<Self, ConfigError> {
        config.bus.validate()?;
        let length = burst_length(config.fifo_depth)?;
        Ok(Self {
            sink: VrChannel::default(),
            bus: Endpoint::default(),
            config,
            length,
            wfifo: Queue::new(length)?,
            commands: Queue::new(2)?,
            remaining: Countdown::new(),
            next_addr: 0,
            sof: true,
            addressed: UpDownCounter::default(),
            responses: UpDownCounter::default(),
        })
    }

    /// Burst length in beats.
    pub fn burst_length(&self) -> usize { self.length }

    /// Bursts issued and not yet answered.
    pub fn outstanding(&self) -> usize { self.responses.count() }

    fn burst_open(&self) -> bool { !self.remaining.done() }

    /// Is the run drained and answered?
    fn drained(&self) -> bool {
        !self.burst_open() && self.commands.is_empty() && self.wfifo.is_empty() && self.responses.count() == 0
    }

    /// Beat appended to the buffer at this edge, and the burst command it opens.
    fn next_beat(&mut self, elem: &WriteElement) -> (WReq, Option<(u64, usize)>) {
        let command = if self.burst_open() {
            None
        } else {
            let addr = if self.sof { align_down(elem.addr, self.config.bus.bytes() as u64) } else { self.next_addr };
            let beats = page_beats(addr, self.length, &self.config.bus);
            self.next_addr = addr + (beats * self.config.bus.bytes()) as u64;
            self.sof = false;
            self.remaining.load(beats as u64);
            Some((addr, beats))
        };
        let beat = WReq::new(0, elem.data, self.config.bus.full_strobe(), self.remaining.count() == 1);
        self.remaining.decrement();
        (beat, command)
    }
}

impl Module for Writer {
    fn eval(&mut self) {
        let elem = self.sink.payload();
        let ready = if elem.eop {
            self.drained()
        } else {
            !self.wfifo.is_full() && (self.burst_open() || !self.commands.is_full())
        };
        self.sink.accept(ready);

        match self.commands.front() {
            Some((addr, beats)) => {
                let cmd = burst_command(*addr, *beats, &self.config.bus);
                self.bus.aw.offer(cmd);
            }
            None => self.bus.aw.idle(),
        }
        match self.wfifo.front() {
            Some(beat) if self.addressed.count() > 0 => {
                let beat = beat.clone();
                self.bus.w.offer(beat);
            }
            _ => self.bus.w.idle(),
        }
        self.bus.b.accept(true);
        self.bus.ar.idle();
        self.bus.r.accept(false);
    }

    fn tick(&mut self) {
        let elem = self.sink.payload().clone();
        let (beat, command) = if self.sink.fire() && !elem.eop {
            let (beat, command) = self.next_beat(&elem);
            (Some(beat), command)
        } else if self.sink.fwd.valid && elem.eop && self.burst_open() && !self.wfifo.is_full() {
            trace!(data = elem.data, "padding beat");
            let (beat, command) = self.next_beat(&elem);
            (Some(beat), command)
        } else {
            (None, None)
        };
        if let Some((addr, beats)) = command {
            debug!(addr, beats, "write burst opened");
        }
        if self.sink.fire() && elem.eop {
            debug!("write run closed");
            self.sof = true;
        }

        let aw = self.bus.aw.fire();
        let w = self.bus.w.fire();
        let w_last = w && self.bus.w.payload().last;
        if w {
            trace!(data = self.bus.w.payload().data, last = w_last, "write beat");
        }
        self.commands.update(command, aw);
        self.wfifo.update(beat, w);
        self.addressed.update(aw, w_last);
        self.responses.update(aw, self.bus.b.fire());
    }

    fn probe(&self, bits: &mut Vec<bool>) {
        self.sink.probe(bits);
        self.bus.probe(bits);
    }
}
