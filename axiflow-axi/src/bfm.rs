//! Bus functional models for driving and observing components in simulation.

use std::collections::{HashMap, VecDeque};

use axiflow::{Module, Signal};
use axiflow_std::VrChannel;
use tracing::{debug, trace};

use crate::{Addr, BurstDescriptor, BurstError, BusConfig, ConfigError, Endpoint, Response, WReq};

/// Completed transaction, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Read burst: every data beat, and the first response other than `okay` if any.
    Read {
        /// Transaction identifier.
        id: u32,
        /// Data beats.
        data: Vec<u64>,
        /// Response.
        resp: Response,
    },
    /// Write burst.
    Write {
        /// Transaction identifier.
        id: u32,
        /// Response.
        resp: Response,
    },
}

fn pattern(pattern: &[bool], cycle: usize) -> bool { pattern.is_empty() || pattern[cycle % pattern.len()] }

/// Scripted AXI initiator.
///
/// Commands are issued in the order they are queued, reads and writes independently; the data
/// beats of a write follow once its command has fired. Read data and write responses are
/// collected as [`Completion`]s.
#[derive(Debug)]
pub struct Initiator {
    /// Initiator side of the bus.
    pub bus: Endpoint,

    config: BusConfig,
    reads: VecDeque<Addr>,
    writes: VecDeque<(Addr, Vec<WReq>)>,
    wdata: VecDeque<WReq>,
    rbeats: HashMap<u32, (Vec<u64>, Response)>,
    completions: Vec<Completion>,
    outstanding: usize,
    r_ready: Vec<bool>,
    b_ready: Vec<bool>,
    cycle: usize,
}

impl Initiator {
    /// Creates a new initiator.
    pub fn new(config: BusConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            bus: Endpoint::default(),
            config: config.validate()?,
            reads: VecDeque::new(),
            writes: VecDeque::new(),
            wdata: VecDeque::new(),
            rbeats: HashMap::new(),
            completions: Vec::new(),
            outstanding: 0,
            r_ready: Vec::new(),
            b_ready: Vec::new(),
            cycle: 0,
        })
    }

    /// Cycles `ready` of the response channels through the given patterns.
    pub fn with_backpressure(mut self, r_ready: Vec<bool>, b_ready: Vec<bool>) -> Self {
        self.r_ready = r_ready;
        self.b_ready = b_ready;
        self
    }

    /// Queues a read command.
    pub fn read(&mut self, cmd: Addr) -> Result<(), BurstError> {
        BurstDescriptor::from_command(&cmd)?.check_size(&self.config)?;
        self.reads.push_back(cmd);
        Ok(())
    }

    /// Queues a write of `data`, one beat per word, every beat with strobes `strb`. The command's
    /// `len` is taken from the data.
    pub fn write(&mut self, cmd: Addr, data: &[u64], strb: u8) -> Result<(), BurstError> {
        if data.is_empty() || data.len() > 256 {
            return Err(BurstError::Length { beats: data.len() });
        }
        let cmd = cmd.with_len((data.len() - 1) as u8);
        BurstDescriptor::from_command(&cmd)?.check_size(&self.config)?;
        let beats = data
            .iter()
            .enumerate()
            .map(|(i, word)| WReq::new(cmd.id, word & self.config.data_mask(), strb, i + 1 == data.len()))
            .collect();
        self.writes.push_back((cmd, beats));
        Ok(())
    }

    /// Queues a single full-width read.
    pub fn read_word(&mut self, id: u32, addr: u64) -> Result<(), BurstError> {
        self.read(Addr::new(id, addr, self.config.max_size()))
    }

    /// Queues a single full-width write.
    pub fn write_word(&mut self, id: u32, addr: u64, data: u64) -> Result<(), BurstError> {
        self.write(Addr::new(id, addr, self.config.max_size()), &[data], self.config.full_strobe())
    }

    /// Has every queued transaction completed?
    pub fn is_idle(&self) -> bool {
        self.reads.is_empty() && self.writes.is_empty() && self.wdata.is_empty() && self.outstanding == 0
    }

    /// Completed transactions.
    pub fn completions(&self) -> &[Completion] { &self.completions }

    /// Completed reads: identifier and data beats.
    pub fn reads(&self) -> impl Iterator<Item = (u32, &[u64])> + '_ {
        self.completions.iter().filter_map(|completion| match completion {
            Completion::Read { id, data, .. } => Some((*id, data.as_slice())),
            Completion::Write { .. } => None,
        })
    }

    /// Completed writes: identifier and response.
    pub fn writes(&self) -> impl Iterator<Item = (u32, Response)> + '_ {
        self.completions.iter().filter_map(|completion| match completion {
            Completion::Write { id, resp } => Some((*id, *resp)),
            Completion::Read { .. } => None,
        })
    }
}

impl Module for Initiator {
    fn eval(&mut self) {
        match self.reads.front() {
            Some(cmd) => {
                let cmd = cmd.clone();
                self.bus.ar.offer(cmd);
            }
            None => self.bus.ar.idle(),
        }
        match self.writes.front() {
            Some((cmd, _)) => {
                let cmd = cmd.clone();
                self.bus.aw.offer(cmd);
            }
            None => self.bus.aw.idle(),
        }
        match self.wdata.front() {
            Some(beat) => {
                let beat = beat.clone();
                self.bus.w.offer(beat);
            }
            None => self.bus.w.idle(),
        }
        self.bus.r.accept(pattern(&self.r_ready, self.cycle));
        self.bus.b.accept(pattern(&self.b_ready, self.cycle));
    }

    fn tick(&mut self) {
        if self.bus.ar.fire() {
            self.reads.pop_front();
            self.outstanding += 1;
        }
        if self.bus.aw.fire() {
            if let Some((_, beats)) = self.writes.pop_front() {
                self.wdata.extend(beats);
            }
            self.outstanding += 1;
        }
        if self.bus.w.fire() {
            self.wdata.pop_front();
        }
        if self.bus.r.fire() {
            let beat = self.bus.r.payload();
            trace!(id = beat.id, data = beat.data, last = beat.last, "read beat");
            let entry = self.rbeats.entry(beat.id).or_insert_with(|| (Vec::new(), Response::Okay));
            entry.0.push(beat.data);
            if entry.1 == Response::Okay {
                entry.1 = beat.resp;
            }
            if beat.last {
                if let Some((data, resp)) = self.rbeats.remove(&beat.id) {
                    debug!(id = beat.id, beats = data.len(), ?resp, "read complete");
                    self.completions.push(Completion::Read { id: beat.id, data, resp });
                }
                self.outstanding = self.outstanding.saturating_sub(1);
            }
        }
        if self.bus.b.fire() {
            let res = self.bus.b.payload();
            debug!(id = res.id, resp = ?res.resp, "write complete");
            self.completions.push(Completion::Write { id: res.id, resp: res.resp });
            self.outstanding = self.outstanding.saturating_sub(1);
        }
        self.cycle += 1;
    }

    fn probe(&self, bits: &mut Vec<bool>) { self.bus.probe(bits) }
}

/// Offers queued items on a valid/ready stream.
///
/// With a pattern, a new item is offered only on cycles where the pattern is high; an offered
/// item is held until it fires.
#[derive(Debug)]
pub struct StreamSource<V: Signal> {
    /// Output.
    pub source: VrChannel<V>,

    items: VecDeque<V>,
    valid: Vec<bool>,
    held: bool,
    cycle: usize,
}

impl<V: Signal> StreamSource<V> {
    /// Creates a new source of `items`.
    pub fn new(items: impl IntoIterator<Item = V>) -> Self {
        Self { source: VrChannel::default(), items: items.into_iter().collect(), valid: Vec::new(), held: false, cycle: 0 }
    }

    /// Offers new items only where `valid` is high, cycling through it.
    pub fn with_pattern(mut self, valid: Vec<bool>) -> Self {
        self.valid = valid;
        self
    }

    /// Queues one more item.
    pub fn push(&mut self, item: V) { self.items.push_back(item) }

    /// Has every item been sent?
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
}

impl<V: Signal> Module for StreamSource<V> {
    fn eval(&mut self) {
        match self.items.front() {
            Some(item) if self.held || pattern(&self.valid, self.cycle) => {
                let item = item.clone();
                self.source.offer(item);
            }
            _ => self.source.idle(),
        }
    }

    fn tick(&mut self) {
        if self.source.fire() {
            self.items.pop_front();
            self.held = false;
        } else {
            self.held = self.source.fwd.valid;
        }
        self.cycle += 1;
    }

    fn probe(&self, bits: &mut Vec<bool>) { self.source.probe(bits) }
}

/// Collects items from a valid/ready stream.
#[derive(Debug)]
pub struct StreamSink<V: Signal> {
    /// Input.
    pub sink: VrChannel<V>,

    items: Vec<V>,
    ready: Vec<bool>,
    cycle: usize,
}

impl<V: Signal> StreamSink<V> {
    /// Creates a new sink, always ready.
    pub fn new() -> Self { Self { sink: VrChannel::default(), items: Vec::new(), ready: Vec::new(), cycle: 0 } }

    /// Cycles `ready` through the given pattern.
    pub fn with_pattern(mut self, ready: Vec<bool>) -> Self {
        self.ready = ready;
        self
    }

    /// Items received so far.
    pub fn items(&self) -> &[V] { &self.items }
}

impl<V: Signal> Module for StreamSink<V> {
    fn eval(&mut self) { self.sink.accept(pattern(&self.ready, self.cycle)) }

    fn tick(&mut self) {
        if self.sink.fire() {
            self.items.push(self.sink.payload().clone());
        }
        self.cycle += 1;
    }

    fn probe(&self, bits: &mut Vec<bool>) { self.sink.probe(bits) }
}
