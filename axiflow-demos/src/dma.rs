//! A write run stored by the DMA writer and streamed back by the DMA reader.

use anyhow::{ensure, Context, Result};
use axiflow::{Module, Simulator};
use axiflow_axi::{
    Element, Endpoint, ReadRequest, Reader, ReaderConfig, Sram, SramConfig, StreamSink, StreamSource, WriteElement, Writer,
    WriterConfig,
};
use axiflow_std::VrChannel;
use tracing::info;

use crate::config::SystemConfig;

const FIFO_DEPTH: usize = 4;
const WORDS: u64 = 10;

/// Writer and reader sharing one SRAM; the writer's bursts take priority in the SRAM.
struct System {
    words: StreamSource<WriteElement>,
    writer: Writer,
    requests: StreamSource<ReadRequest>,
    reader: Reader,
    elements: StreamSink<Element>,
    sram: Sram,
}

impl System {
    /// Merges the writer's write channels and the reader's read channels onto the SRAM port.
    fn connect(&mut self) {
        VrChannel::connect(&mut self.words.source, &mut self.writer.sink);
        VrChannel::connect(&mut self.requests.source, &mut self.reader.sink);
        VrChannel::connect(&mut self.reader.source, &mut self.elements.sink);

        let mut port = Endpoint::default();
        port.aw = self.writer.bus.aw.clone();
        port.w = self.writer.bus.w.clone();
        port.b = self.writer.bus.b.clone();
        port.ar = self.reader.bus.ar.clone();
        port.r = self.reader.bus.r.clone();
        Endpoint::connect(&mut port, &mut self.sram.bus);
        self.writer.bus.aw.bwd = port.aw.bwd;
        self.writer.bus.w.bwd = port.w.bwd;
        self.writer.bus.b.fwd = port.b.fwd;
        self.reader.bus.ar.bwd = port.ar.bwd;
        self.reader.bus.r.fwd = port.r.fwd;
    }
}

impl Module for System {
    fn eval(&mut self) {
        self.words.eval();
        self.requests.eval();
        self.elements.eval();
        self.sram.eval();
        self.connect();
        self.writer.eval();
        self.reader.eval();
        self.connect();
    }

    fn tick(&mut self) {
        self.words.tick();
        self.writer.tick();
        self.requests.tick();
        self.reader.tick();
        self.elements.tick();
        self.sram.tick();
    }

    fn probe(&self, bits: &mut Vec<bool>) {
        self.words.probe(bits);
        self.writer.probe(bits);
        self.requests.probe(bits);
        self.reader.probe(bits);
        self.elements.probe(bits);
        self.sram.probe(bits);
    }
}

pub fn run(config: &SystemConfig) -> Result<()> {
    let region = config.regions.first().context("the system has no address region")?;
    let bytes = config.bus.bytes() as u64;
    let mut words = (0..WORDS).map(|i| WriteElement { addr: region.base, data: 0x5a00 + i, eop: false }).collect::<Vec<_>>();
    words.push(WriteElement { addr: region.base, data: 0, eop: true });

    let system = System {
        words: StreamSource::new(words),
        writer: Writer::new(WriterConfig { bus: config.bus, fifo_depth: FIFO_DEPTH })?,
        requests: StreamSource::new(Vec::new()),
        reader: Reader::new(ReaderConfig { bus: config.bus, element_width: config.bus.data_width, fifo_depth: FIFO_DEPTH })?,
        elements: StreamSink::new().with_pattern(vec![true, true, false]),
        sram: Sram::new(SramConfig { bus: config.bus, base: region.base, size: region.size as usize, read_only: false })?,
    };

    let mut sim = Simulator::new(system);
    let cycles = sim.run_until(|system: &System| system.words.is_empty(), config.max_cycles)?;
    info!(cycles, words = WORDS, bursts = WORDS.div_ceil(FIFO_DEPTH as u64), "run written");

    sim.top_mut().requests.push(ReadRequest { addr: region.base, n: WORDS as u32 });
    let cycles = sim.run_until(|system: &System| system.requests.is_empty() && system.reader.is_idle(), config.max_cycles)?;
    let elements = sim.top().elements.items();
    info!(cycles, elements = elements.len(), "run read back");

    let data = elements.iter().map(|element| element.data).collect::<Vec<_>>();
    ensure!(data == (0..WORDS).map(|i| 0x5a00 + i).collect::<Vec<_>>(), "read back {data:x?}");
    ensure!(elements.last().map_or(false, |element| element.eop), "missing end of packet");
    info!(padding = ?sim.top().sram.read_word(region.base + WORDS * bytes), "padding word");
    Ok(())
}
