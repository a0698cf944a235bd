//! Bursts into a register file through the register-bus bridge.

use anyhow::{ensure, Context, Result};
use axiflow::{Module, Simulator};
use axiflow_axi::{Addr, Bridge, BridgeConfig, Burst, CsrBus, Endpoint, Initiator, RegisterFile};
use tracing::info;

use crate::config::SystemConfig;

const CSR_DATA_WIDTH: usize = 8;
const CSR_ADR_WIDTH: usize = 10;

struct System {
    init: Initiator,
    bridge: Bridge,
    regs: RegisterFile,
}

impl System {
    fn connect(&mut self) {
        Endpoint::connect(&mut self.init.bus, &mut self.bridge.bus);
        CsrBus::connect(&mut self.bridge.csr, &mut self.regs.bus);
    }

    fn is_idle(&self) -> bool { self.init.is_idle() }
}

impl Module for System {
    fn eval(&mut self) {
        self.init.eval();
        self.regs.eval();
        self.connect();
        self.bridge.eval();
        self.connect();
    }

    fn tick(&mut self) {
        self.init.tick();
        self.bridge.tick();
        self.regs.tick();
    }

    fn probe(&self, bits: &mut Vec<bool>) {
        self.init.probe(bits);
        self.bridge.probe(bits);
        self.regs.probe(bits);
    }
}

pub fn run(config: &SystemConfig) -> Result<()> {
    let bridge = Bridge::new(BridgeConfig { bus: config.bus, csr_data_width: CSR_DATA_WIDTH, csr_adr_width: CSR_ADR_WIDTH })?;
    info!(ratio = bridge.ratio(), "register accesses per beat");
    let mut system =
        System { init: Initiator::new(config.bus)?, bridge, regs: RegisterFile::new(CSR_ADR_WIDTH, CSR_DATA_WIDTH)? };

    let size = config.bus.max_size();
    let full = config.bus.full_strobe();
    let data = [0x0706_0504_0302_0100u64, 0x0f0e_0d0c_0b0a_0908, 0x1716_1514_1312_1110, 0x1f1e_1d1c_1b1a_1918];
    system.init.write(Addr::new(1, 0x40, size).with_burst(Burst::Incr), &data, full)?;
    // Lowest byte of every word only.
    system.init.write(Addr::new(2, 0x40, size), &[0xff], 0x1)?;
    system.init.read(Addr::new(3, 0x40, size).with_len(3).with_burst(Burst::Wrap))?;

    let mut sim = Simulator::new(system);
    let cycles = sim.run_until(System::is_idle, config.max_cycles)?;
    let system = sim.top();

    let (_, words) = system.init.reads().next().context("read did not complete")?;
    info!(cycles, words = ?words, "burst read back");
    ensure!(words[0] & 0xff == 0xff, "byte write lost");
    ensure!(words[1] == data[1] & config.bus.data_mask(), "burst write lost");
    Ok(())
}
