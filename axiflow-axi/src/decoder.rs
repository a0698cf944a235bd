//! Address decoder.

use std::fmt;

use axiflow::{mask, Module};
use axiflow_std::{or_reduce_selected, selected, VrChannel};
use itertools::Itertools;
use serde::Deserialize;
use tracing::warn;

use crate::{Addr, ConfigError};

/// Address membership predicate of one target.
pub type AddrMatch = Box<dyn Fn(u64) -> bool + Send>;

/// Contiguous address region.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Region {
    /// Name, for diagnostics.
    #[serde(default)]
    pub name: String,
    /// First address.
    pub base: u64,
    /// Size in bytes.
    pub size: u64,
}

impl Region {
    /// Creates a new region.
    pub fn new(name: impl Into<String>, base: u64, size: u64) -> Self { Self { name: name.into(), base, size } }

    /// Does the region hold `addr`?
    pub fn contains(&self, addr: u64) -> bool { addr >= self.base && addr - self.base < self.size }

    /// Do two regions share an address?
    pub fn overlaps(&self, other: &Region) -> bool {
        self.base < other.base.saturating_add(other.size) && other.base < self.base.saturating_add(self.size)
    }

    /// Predicate of the region.
    pub fn matcher(&self) -> AddrMatch {
        let region = self.clone();
        Box::new(move |addr| region.contains(addr))
    }

    /// Checks that regions are nonempty and pairwise disjoint.
    pub fn check_map(regions: &[Region]) -> Result<(), ConfigError> {
        if let Some(empty) = regions.iter().find(|region| region.size == 0) {
            return Err(ConfigError::EmptyRegion(empty.name.clone()));
        }
        if let Some((a, b)) = regions.iter().tuple_combinations().find(|(a, b)| a.overlaps(b)) {
            return Err(ConfigError::OverlappingRegions(a.name.clone(), b.name.clone()));
        }
        Ok(())
    }
}

/// Predicate comparing address bits `start..end` with the same bits of `address`.
pub fn bit_field(address: u64, start: usize, end: usize) -> AddrMatch {
    let field = mask(end - start);
    let value = (address >> start) & field;
    Box::new(move |addr| (addr >> start) & field == value)
}

/// One-hot target selection for a command channel.
///
/// Command fields are broadcast to every target; only `valid` is gated by the selection, and the
/// initiator's `ready` is the OR of the selected targets' `ready`. With `register`, the selection
/// is taken from a register loaded with the previous cycle's decode of the broadcast address, and
/// targets are held off until the register matches the offered address.
pub struct AddressDecoder<const S: usize> {
    /// Initiator side.
    pub master: VrChannel<Addr>,

    /// Target side.
    pub slaves: [VrChannel<Addr>; S],

    decoders: Vec<AddrMatch>,
    register: bool,
    sel_r: [bool; S],
    addr_r: Option<u64>,
}

impl<const S: usize> fmt::Debug for AddressDecoder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressDecoder")
            .field("master", &self.master)
            .field("slaves", &self.slaves)
            .field("register", &self.register)
            .field("sel_r", &self.sel_r)
            .field("addr_r", &self.addr_r)
            .finish()
    }
}

impl<const S: usize> AddressDecoder<S> {
    /// Creates a new decoder with one predicate per target.
    pub fn new(decoders: Vec<AddrMatch>, register: bool) -> Result<Self, ConfigError> {
        if decoders.len() != S {
            return Err(ConfigError::TargetCount { given: decoders.len(), targets: S });
        }
        Ok(Self {
            master: VrChannel::default(),
            slaves: std::array::from_fn(|_| VrChannel::default()),
            decoders,
            register,
            sel_r: [false; S],
            addr_r: None,
        })
    }

    /// Creates a new decoder from disjoint regions.
    pub fn from_regions(regions: &[Region], register: bool) -> Result<Self, ConfigError> {
        Region::check_map(regions)?;
        Self::new(regions.iter().map(Region::matcher).collect(), register)
    }

    /// Combinational decode of `addr`.
    pub fn decode(&self, addr: u64) -> [bool; S] { std::array::from_fn(|i| (self.decoders[i])(addr)) }

    /// Selection in effect for `addr` this cycle.
    pub fn route(&self, addr: u64) -> [bool; S] {
        if !self.register {
            self.decode(addr)
        } else if self.addr_r == Some(addr) {
            self.sel_r
        } else {
            [false; S]
        }
    }

    /// Selection in effect for the offered command.
    pub fn selection(&self) -> [bool; S] { self.route(self.master.payload().addr) }
}

impl<const S: usize> Module for AddressDecoder<S> {
    fn eval(&mut self) {
        let sel = self.selection();
        for (slave, sel) in self.slaves.iter_mut().zip(sel.iter()) {
            slave.fwd.inner = self.master.fwd.inner.clone();
            slave.fwd.valid = self.master.fwd.valid && *sel;
        }
        let ready = std::array::from_fn(|i| self.slaves[i].bwd.ready);
        self.master.accept(or_reduce_selected(&ready, &sel));
    }

    fn tick(&mut self) {
        let addr = self.master.payload().addr;
        let sel = self.decode(addr);
        if self.master.fwd.valid && selected(&sel).len() > 1 {
            warn!(addr, "overlapping address decode");
        }
        if self.register {
            self.sel_r = sel;
            self.addr_r = Some(addr);
        }
    }

    fn probe(&self, bits: &mut Vec<bool>) {
        self.master.probe(bits);
        for slave in &self.slaves {
            slave.probe(bits);
        }
    }
}
