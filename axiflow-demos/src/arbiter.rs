//! Two initiators, two SRAM targets.

use anyhow::{ensure, Result};
use axiflow::{Module, Simulator};
use axiflow_axi::{Endpoint, Initiator, Response, Sram, SramConfig, TransactionArbiter};
use tracing::info;

use crate::config::SystemConfig;

struct System {
    masters: [Initiator; 2],
    arbiter: TransactionArbiter<2, 2>,
    targets: [Sram; 2],
}

impl System {
    fn new(config: &SystemConfig) -> Result<Self> {
        let arbiter = TransactionArbiter::from_regions(&config.regions, config.arbiter)?;
        let sram = |s: usize| -> Result<Sram> {
            let region = &config.regions[s];
            Ok(Sram::new(SramConfig { bus: config.bus, base: region.base, size: region.size as usize, read_only: false })?)
        };
        Ok(Self {
            masters: [Initiator::new(config.bus)?, Initiator::new(config.bus)?.with_backpressure(vec![true, false], vec![])],
            arbiter,
            targets: [sram(0)?, sram(1)?],
        })
    }

    fn is_idle(&self) -> bool { self.masters.iter().all(Initiator::is_idle) }

    fn connect(&mut self) {
        for (init, port) in self.masters.iter_mut().zip(self.arbiter.masters.iter_mut()) {
            Endpoint::connect(&mut init.bus, port);
        }
        for (port, sram) in self.arbiter.slaves.iter_mut().zip(self.targets.iter_mut()) {
            Endpoint::connect(port, &mut sram.bus);
        }
    }
}

impl Module for System {
    fn eval(&mut self) {
        self.masters.iter_mut().for_each(Module::eval);
        self.targets.iter_mut().for_each(Module::eval);
        self.connect();
        self.arbiter.eval();
        self.connect();
    }

    fn tick(&mut self) {
        self.masters.iter_mut().for_each(Module::tick);
        self.arbiter.tick();
        self.targets.iter_mut().for_each(Module::tick);
    }

    fn probe(&self, bits: &mut Vec<bool>) {
        self.masters.iter().for_each(|init| init.probe(bits));
        self.arbiter.probe(bits);
        self.targets.iter().for_each(|sram| sram.probe(bits));
    }
}

pub fn run(config: &SystemConfig) -> Result<()> {
    let mut system = System::new(config)?;
    let bases = [config.regions[0].base, config.regions[1].base];

    // Each initiator writes a word into both targets, then reads the other's words back.
    for (m, init) in system.masters.iter_mut().enumerate() {
        let m = m as u64;
        for (s, base) in bases.iter().enumerate() {
            init.write_word((m * 2 + s as u64) as u32, base + 4 * m, 0xa000 + m * 0x10 + s as u64)?;
        }
    }
    let mut sim = Simulator::new(system);
    let cycles = sim.run_until(System::is_idle, config.max_cycles)?;
    info!(cycles, "writes complete");

    for (m, init) in sim.top_mut().masters.iter_mut().enumerate() {
        let other = 1 - m as u64;
        for (s, base) in bases.iter().enumerate() {
            init.read_word(0x10 + s as u32, base + 4 * other)?;
        }
    }
    let cycles = sim.run_until(System::is_idle, config.max_cycles)?;
    info!(cycles, "reads complete");

    let system = sim.top();
    for (m, init) in system.masters.iter().enumerate() {
        ensure!(init.writes().all(|(_, resp)| resp == Response::Okay), "initiator {m}: write refused");
        for (id, data) in init.reads() {
            info!(master = m, id, data = ?data, "read back");
        }
    }
    for (s, sram) in system.targets.iter().enumerate() {
        let words = (0..2).filter_map(|m| sram.read_word(bases[s] + 4 * m)).collect::<Vec<_>>();
        info!(slave = s, words = ?words, "target contents");
    }
    Ok(())
}
