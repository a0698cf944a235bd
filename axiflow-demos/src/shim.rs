//! Narrow writes through the write-issue shim.

use anyhow::{ensure, Context, Result};
use axiflow::{Module, Simulator};
use axiflow_axi::{Addr, Endpoint, Initiator, Sram, SramConfig, WriteShim};
use tracing::info;

use crate::config::SystemConfig;

struct System {
    init: Initiator,
    shim: WriteShim,
    sram: Sram,
    /// `(addr, size)` of every command the shim issued.
    issued: Vec<(u64, u8)>,
}

impl System {
    fn connect(&mut self) {
        Endpoint::connect(&mut self.init.bus, &mut self.shim.upstream);
        Endpoint::connect(&mut self.shim.downstream, &mut self.sram.bus);
    }

    fn is_idle(&self) -> bool { self.init.is_idle() }
}

impl Module for System {
    fn eval(&mut self) {
        self.init.eval();
        self.sram.eval();
        self.connect();
        self.shim.eval();
        self.connect();
    }

    fn tick(&mut self) {
        if self.shim.downstream.aw.fire() {
            let cmd = self.shim.downstream.aw.payload();
            self.issued.push((cmd.addr, cmd.size));
        }
        self.init.tick();
        self.shim.tick();
        self.sram.tick();
    }

    fn probe(&self, bits: &mut Vec<bool>) {
        self.init.probe(bits);
        self.shim.probe(bits);
        self.sram.probe(bits);
    }
}

pub fn run(config: &SystemConfig) -> Result<()> {
    let region = config.regions.first().context("the system has no address region")?;
    let mut system = System {
        init: Initiator::new(config.bus)?,
        shim: WriteShim::new(config.bus)?,
        sram: Sram::new(SramConfig { bus: config.bus, base: region.base, size: region.size as usize, read_only: false })?,
        issued: Vec::new(),
    };

    let size = config.bus.max_size();
    let addr = region.base + 0x550;
    for (id, strb) in [0b0001u8, 0b0100, 0b1100, config.bus.full_strobe()].into_iter().enumerate() {
        system.init.write(Addr::new(id as u32, addr, size), &[0x4433_2211 << (id * 4)], strb)?;
    }

    let mut sim = Simulator::new(system);
    let cycles = sim.run_until(System::is_idle, config.max_cycles)?;
    let system = sim.top();
    for (addr, size) in &system.issued {
        info!(addr = *addr, size = *size, "narrow command");
    }
    info!(cycles, word = ?system.sram.read_word(addr), "final word");
    ensure!(system.issued.len() == 4, "expected four commands, saw {}", system.issued.len());
    Ok(())
}
