//! Systems shared by the integration tests.

#![allow(dead_code)]

use axiflow::Module;
use axiflow_axi::*;
use tracing_subscriber::EnvFilter;

/// Installs a test subscriber once; `RUST_LOG` selects the events.
pub fn try_init() {
    let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_test_writer().try_init();
}

/// Scripted initiators behind a transaction arbiter, one SRAM per address region.
#[derive(Debug)]
pub struct Interconnect<const M: usize, const S: usize> {
    pub masters: [Initiator; M],
    pub arbiter: TransactionArbiter<M, S>,
    pub targets: [Sram; S],
    /// Write commands seen by each target.
    pub aw_seen: [usize; S],
    /// Initiator whose write data never reaches the arbiter.
    pub starve_write_data: Option<usize>,
}

impl<const M: usize, const S: usize> Interconnect<M, S> {
    pub fn new(regions: &[Region], config: ArbiterConfig) -> Self {
        let bus = BusConfig::default();
        Self {
            masters: std::array::from_fn(|_| Initiator::new(bus).unwrap()),
            arbiter: TransactionArbiter::from_regions(regions, config).unwrap(),
            targets: std::array::from_fn(|s| {
                Sram::new(SramConfig { bus, base: regions[s].base, size: 4096, read_only: false }).unwrap()
            }),
            aw_seen: [0; S],
            starve_write_data: None,
        }
    }

    pub fn is_idle(&self) -> bool { self.masters.iter().all(Initiator::is_idle) }

    fn connect(&mut self) {
        for (i, (init, port)) in self.masters.iter_mut().zip(self.arbiter.masters.iter_mut()).enumerate() {
            Endpoint::connect(&mut init.bus, port);
            if self.starve_write_data == Some(i) {
                port.w.idle();
            }
        }
        for (port, sram) in self.arbiter.slaves.iter_mut().zip(self.targets.iter_mut()) {
            Endpoint::connect(port, &mut sram.bus);
        }
    }
}

impl<const M: usize, const S: usize> Module for Interconnect<M, S> {
    fn eval(&mut self) {
        self.masters.iter_mut().for_each(Module::eval);
        self.targets.iter_mut().for_each(Module::eval);
        self.connect();
        self.arbiter.eval();
        self.connect();
    }

    fn tick(&mut self) {
        for (seen, port) in self.aw_seen.iter_mut().zip(self.arbiter.slaves.iter()) {
            *seen += usize::from(port.aw.fire());
        }
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

/// Scripted initiator driving a register file through the bridge.
#[derive(Debug)]
pub struct RegisterSystem {
    pub init: Initiator,
    pub bridge: Bridge,
    pub regs: RegisterFile,
}

impl RegisterSystem {
    pub fn new(csr_data_width: usize) -> Self {
        let bus = BusConfig::default();
        Self {
            init: Initiator::new(bus).unwrap(),
            bridge: Bridge::new(BridgeConfig { bus, csr_data_width, csr_adr_width: 8 }).unwrap(),
            regs: RegisterFile::new(8, csr_data_width).unwrap(),
        }
    }

    fn connect(&mut self) {
        Endpoint::connect(&mut self.init.bus, &mut self.bridge.bus);
        CsrBus::connect(&mut self.bridge.csr, &mut self.regs.bus);
    }
}

impl Module for RegisterSystem {
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

/// DMA reader over an SRAM, fed and drained by stream models.
#[derive(Debug)]
pub struct ReadSystem {
    pub requests: StreamSource<ReadRequest>,
    pub reader: Reader,
    pub sram: Sram,
    pub elements: StreamSink<Element>,
}

impl ReadSystem {
    pub fn new(config: ReaderConfig, requests: Vec<ReadRequest>, ready: Vec<bool>) -> Self {
        Self {
            requests: StreamSource::new(requests),
            reader: Reader::new(config).unwrap(),
            sram: Sram::new(SramConfig { bus: config.bus, base: 0x1000, size: 1024, read_only: false }).unwrap(),
            elements: StreamSink::new().with_pattern(ready),
        }
    }

    fn connect(&mut self) {
        axiflow_std::VrChannel::connect(&mut self.requests.source, &mut self.reader.sink);
        axiflow_std::VrChannel::connect(&mut self.reader.source, &mut self.elements.sink);
        Endpoint::connect(&mut self.reader.bus, &mut self.sram.bus);
    }
}

impl Module for ReadSystem {
    fn eval(&mut self) {
        self.requests.eval();
        self.elements.eval();
        self.sram.eval();
        self.connect();
        self.reader.eval();
        self.connect();
    }

    fn tick(&mut self) {
        self.requests.tick();
        self.reader.tick();
        self.sram.tick();
        self.elements.tick();
    }

    fn probe(&self, bits: &mut Vec<bool>) {
        self.requests.probe(bits);
        self.reader.probe(bits);
        self.sram.probe(bits);
        self.elements.probe(bits);
    }
}

/// DMA writer into an SRAM, fed by a stream model.
#[derive(Debug)]
pub struct WriteSystem {
    pub words: StreamSource<WriteElement>,
    pub writer: Writer,
    pub sram: Sram,
}

impl WriteSystem {
    pub fn new(config: WriterConfig, words: Vec<WriteElement>, valid: Vec<bool>) -> Self {
        Self {
            words: StreamSource::new(words).with_pattern(valid),
            writer: Writer::new(config).unwrap(),
            sram: Sram::new(SramConfig { bus: config.bus, base: 0x1000, size: 1024, read_only: false }).unwrap(),
        }
    }

    fn connect(&mut self) {
        axiflow_std::VrChannel::connect(&mut self.words.source, &mut self.writer.sink);
        Endpoint::connect(&mut self.writer.bus, &mut self.sram.bus);
    }
}

impl Module for WriteSystem {
    fn eval(&mut self) {
        self.words.eval();
        self.sram.eval();
        self.connect();
        self.writer.eval();
        self.connect();
    }

    fn tick(&mut self) {
        self.words.tick();
        self.writer.tick();
        self.sram.tick();
    }

    fn probe(&self, bits: &mut Vec<bool>) {
        self.words.probe(bits);
        self.writer.probe(bits);
        self.sram.probe(bits);
    }
}
