//! Transaction arbiter: `M` initiators onto a decoded set of `S` targets.
//!
//! Read and write commands are arbitrated independently by round-robin selectors. Every accepted
//! command leaves a pending-transaction record in two bounded ordering queues, one owned by the
//! initiator and one owned by the selected target. A response (or write-data burst) is routed
//! between an initiator and a target only when it is at the front of both queues, which keeps
//! each target's responses in acceptance order and each initiator's responses in issue order.
//! Full queues back-pressure the command channel.

use axiflow::{some_or, Module};
use axiflow_std::{mux_one_hot, one_hot, one_hot_index, or_reduce_selected, Queue, RoundRobin, Valid};
use itertools::izip;
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::{AddrMatch, AddressDecoder, ConfigError, Endpoint, RRes, Region, WReq, WRes};

/// Default number of transactions each ordering queue can hold.
pub const DEFAULT_NPENDING: usize = 8;

/// Arbiter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    /// Capacity of every ordering queue.
    pub npending: usize,
    /// Register the address decode for one cycle.
    pub register: bool,
}

impl Default for ArbiterConfig {
    fn default() -> Self { Self { npending: DEFAULT_NPENDING, register: false } }
}

/// Pending-transaction record. `port` is the target index in an initiator queue and the initiator
/// index in a target queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    id: u32,
    port: usize,
}

/// Accepted command: `(initiator, target, id)`.
type Accept = (usize, usize, u32);

/// Ordering queues of one completion class.
#[derive(Debug)]
struct Tracking<const M: usize, const S: usize> {
    initiator: [Queue<Pending>; M],
    target: [Queue<Pending>; S],
}

impl<const M: usize, const S: usize> Tracking<M, S> {
    fn new(npending: usize) -> Result<Self, ConfigError> {
        let queue = Queue::new(npending)?;
        Ok(Self {
            initiator: std::array::from_fn(|_| queue.clone()),
            target: std::array::from_fn(|_| queue.clone()),
        })
    }

    fn has_room(&self, initiator: usize, target: usize) -> bool {
        !self.initiator[initiator].is_full() && !self.target[target].is_full()
    }

    /// Initiator whose oldest transaction is the oldest one of `target`.
    fn route_from_target(&self, target: usize) -> Option<usize> {
        let initiator = self.target[target].front()?.port;
        (self.initiator[initiator].front()?.port == target).then_some(initiator)
    }

    /// Target whose oldest transaction is the oldest one of `initiator`.
    fn route_from_initiator(&self, initiator: usize) -> Option<usize> {
        let target = self.initiator[initiator].front()?.port;
        (self.target[target].front()?.port == initiator).then_some(target)
    }

    /// Identifier of the oldest transaction of `target`.
    fn front_id(&self, target: usize) -> Option<u32> { self.target[target].front().map(|pending| pending.id) }

    /// Clock edge: records an accepted command and retires completed `(initiator, target)` pairs.
    fn update(&mut self, accept: Option<Accept>, retire: &[(usize, usize)]) {
        for (i, queue) in self.initiator.iter_mut().enumerate() {
            let enq = accept.filter(|(initiator, ..)| *initiator == i).map(|(_, target, id)| Pending { id, port: target });
            queue.update(enq, retire.iter().any(|(initiator, _)| *initiator == i));
        }
        for (s, queue) in self.target.iter_mut().enumerate() {
            let enq = accept.filter(|(_, target, _)| *target == s).map(|(initiator, _, id)| Pending { id, port: initiator });
            queue.update(enq, retire.iter().any(|(_, target)| *target == s));
        }
    }

    fn outstanding(&self, initiator: usize) -> usize { self.initiator[initiator].len() }
}

/// Transaction arbiter.
#[derive(Debug)]
pub struct TransactionArbiter<const M: usize, const S: usize> {
    /// Initiator-facing ports.
    pub masters: [Endpoint; M],

    /// Target-facing ports.
    pub slaves: [Endpoint; S],

    ar_rr: RoundRobin<M>,
    aw_rr: RoundRobin<M>,
    ar_dec: AddressDecoder<S>,
    aw_dec: AddressDecoder<S>,

    reads: Tracking<M, S>,
    wdata: Tracking<M, S>,
    wresp: Tracking<M, S>,
}

impl<const M: usize, const S: usize> TransactionArbiter<M, S> {
    /// Creates a new arbiter.
    ///
    /// `ar_decoders` and `aw_decoders` hold one predicate per target for each command channel.
    pub fn new(
        ar_decoders: Vec<AddrMatch>, aw_decoders: Vec<AddrMatch>, config: ArbiterConfig,
    ) -> Result<Self, ConfigError> {
        let ArbiterConfig { npending, register } = config;
        if npending == 0 {
            return Err(ConfigError::Pending);
        }
        Ok(Self {
            masters: std::array::from_fn(|_| Endpoint::default()),
            slaves: std::array::from_fn(|_| Endpoint::default()),
            ar_rr: RoundRobin::new()?,
            aw_rr: RoundRobin::new()?,
            ar_dec: AddressDecoder::new(ar_decoders, register)?,
            aw_dec: AddressDecoder::new(aw_decoders, register)?,
            reads: Tracking::new(npending)?,
            wdata: Tracking::new(npending)?,
            wresp: Tracking::new(npending)?,
        })
    }

    /// Creates a new arbiter over disjoint address regions, one per target.
    pub fn from_regions(regions: &[Region], config: ArbiterConfig) -> Result<Self, ConfigError> {
        Region::check_map(regions)?;
        Self::new(regions.iter().map(Region::matcher).collect(), regions.iter().map(Region::matcher).collect(), config)
    }

    /// Current `(read, write)` grants.
    pub fn grants(&self) -> (usize, usize) { (self.ar_rr.grant(), self.aw_rr.grant()) }

    /// `(reads, writes)` accepted from `initiator` and not yet answered.
    pub fn outstanding(&self, initiator: usize) -> (usize, usize) {
        (self.reads.outstanding(initiator), self.wresp.outstanding(initiator))
    }

    /// Write bursts accepted from `initiator` whose data has not fully passed.
    pub fn pending_write_data(&self, initiator: usize) -> usize { self.wdata.outstanding(initiator) }

    fn eval_read_command(&mut self) {
        let grant = self.ar_rr.grant();
        let cmd = self.masters[grant].ar.fwd.clone();
        let room = one_hot_index(&self.ar_dec.route(cmd.inner.addr)).map_or(false, |s| self.reads.has_room(grant, s));

        self.ar_dec.master.fwd.inner = cmd.inner;
        self.ar_dec.master.fwd.valid = cmd.valid && room;
        for (dec, slave) in self.ar_dec.slaves.iter_mut().zip(self.slaves.iter()) {
            dec.bwd = slave.ar.bwd.clone();
        }
        self.ar_dec.eval();
        for (dec, slave) in self.ar_dec.slaves.iter().zip(self.slaves.iter_mut()) {
            slave.ar.fwd = dec.fwd.clone();
        }
        let ready = room && self.ar_dec.master.bwd.ready;
        for (i, master) in self.masters.iter_mut().enumerate() {
            master.ar.accept(i == grant && ready);
        }
    }

    fn eval_write_command(&mut self) {
        let grant = self.aw_rr.grant();
        let cmd = self.masters[grant].aw.fwd.clone();
        let room = one_hot_index(&self.aw_dec.route(cmd.inner.addr))
            .map_or(false, |s| self.wdata.has_room(grant, s) && self.wresp.has_room(grant, s));

        self.aw_dec.master.fwd.inner = cmd.inner;
        self.aw_dec.master.fwd.valid = cmd.valid && room;
        for (dec, slave) in self.aw_dec.slaves.iter_mut().zip(self.slaves.iter()) {
            dec.bwd = slave.aw.bwd.clone();
        }
        self.aw_dec.eval();
        for (dec, slave) in self.aw_dec.slaves.iter().zip(self.slaves.iter_mut()) {
            slave.aw.fwd = dec.fwd.clone();
        }
        let ready = room && self.aw_dec.master.bwd.ready;
        for (i, master) in self.masters.iter_mut().enumerate() {
            master.aw.accept(i == grant && ready);
        }
    }

    fn eval_write_data(&mut self) {
        let route: [Option<usize>; M] = std::array::from_fn(|i| self.wdata.route_from_initiator(i));
        let beats: [Valid<WReq>; M] = std::array::from_fn(|i| self.masters[i].w.fwd.clone());
        for (s, slave) in self.slaves.iter_mut().enumerate() {
            match mux_one_hot(&beats, &route.map(|target| target == Some(s))) {
                Some(beat) => slave.w.fwd = beat.clone(),
                None => slave.w.idle(),
            }
        }
        let ready: [bool; S] = std::array::from_fn(|s| self.slaves[s].w.bwd.ready);
        for (master, target) in izip!(self.masters.iter_mut(), route.iter()) {
            master.w.accept(target.map_or(false, |s| or_reduce_selected(&ready, &one_hot(s))));
        }
    }

    fn eval_responses(&mut self) {
        let r_route: [Option<usize>; S] = std::array::from_fn(|s| self.reads.route_from_target(s));
        let b_route: [Option<usize>; S] = std::array::from_fn(|s| self.wresp.route_from_target(s));
        let r_beats: [Valid<RRes>; S] = std::array::from_fn(|s| self.slaves[s].r.fwd.clone());
        let b_beats: [Valid<WRes>; S] = std::array::from_fn(|s| self.slaves[s].b.fwd.clone());

        for (i, master) in self.masters.iter_mut().enumerate() {
            match mux_one_hot(&r_beats, &r_route.map(|initiator| initiator == Some(i))) {
                Some(beat) => master.r.fwd = beat.clone(),
                None => master.r.idle(),
            }
            match mux_one_hot(&b_beats, &b_route.map(|initiator| initiator == Some(i))) {
                Some(beat) => master.b.fwd = beat.clone(),
                None => master.b.idle(),
            }
        }
        for (slave, r_initiator, b_initiator) in izip!(self.slaves.iter_mut(), r_route.iter(), b_route.iter()) {
            slave.r.accept(r_initiator.map_or(false, |i| self.masters[i].r.bwd.ready));
            slave.b.accept(b_initiator.map_or(false, |i| self.masters[i].b.bwd.ready));
        }
    }
}

impl<const M: usize, const S: usize> Module for TransactionArbiter<M, S> {
    fn eval(&mut self) {
        self.eval_read_command();
        self.eval_write_command();
        self.eval_write_data();
        self.eval_responses();
    }

    fn tick(&mut self) {
        // Read commands and read data.
        let grant = self.ar_rr.grant();
        let accept = if self.masters[grant].ar.fire() {
            let cmd = self.masters[grant].ar.payload();
            one_hot_index(&self.ar_dec.selection()).map(|s| {
                debug!(master = grant, slave = s, id = cmd.id, addr = cmd.addr, "read command accepted");
                (grant, s, cmd.id)
            })
        } else {
            None
        };
        let mut retire = Vec::new();
        for (s, slave) in self.slaves.iter().enumerate() {
            let initiator = some_or!(self.reads.route_from_target(s), continue);
            if !slave.r.fire() {
                continue;
            }
            let beat = slave.r.payload();
            if self.reads.front_id(s) != Some(beat.id) {
                warn!(slave = s, id = beat.id, expected = ?self.reads.front_id(s), "read data id mismatch");
            }
            trace!(slave = s, master = initiator, id = beat.id, last = beat.last, "read data routed");
            if beat.last {
                retire.push((initiator, s));
            }
        }
        self.reads.update(accept, &retire);

        // Write commands, write data and write responses.
        let grant = self.aw_rr.grant();
        let accept = if self.masters[grant].aw.fire() {
            let cmd = self.masters[grant].aw.payload();
            one_hot_index(&self.aw_dec.selection()).map(|s| {
                debug!(master = grant, slave = s, id = cmd.id, addr = cmd.addr, "write command accepted");
                (grant, s, cmd.id)
            })
        } else {
            None
        };
        let mut retire = Vec::new();
        for (i, master) in self.masters.iter().enumerate() {
            let target = some_or!(self.wdata.route_from_initiator(i), continue);
            if master.w.fire() && master.w.payload().last {
                trace!(master = i, slave = target, "write data burst passed");
                retire.push((i, target));
            }
        }
        self.wdata.update(accept, &retire);

        let mut retire = Vec::new();
        for (s, slave) in self.slaves.iter().enumerate() {
            let initiator = some_or!(self.wresp.route_from_target(s), continue);
            if slave.b.fire() {
                trace!(slave = s, master = initiator, id = slave.b.payload().id, "write response routed");
                retire.push((initiator, s));
            }
        }
        self.wresp.update(accept, &retire);

        // Grants and registered decodes.
        let ar_request = std::array::from_fn(|i| self.masters[i].ar.stalled());
        let aw_request = std::array::from_fn(|i| self.masters[i].aw.stalled());
        self.ar_rr.tick(&ar_request);
        self.aw_rr.tick(&aw_request);
        self.ar_dec.tick();
        self.aw_dec.tick();
    }

    fn probe(&self, bits: &mut Vec<bool>) {
        for endpoint in self.masters.iter().chain(self.slaves.iter()) {
            endpoint.probe(bits);
        }
    }
}
