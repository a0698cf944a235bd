use std::collections::VecDeque;

use axiflow::{Module, Simulator};
use axiflow_std::{DownConverter, Fifo, StabilityMonitor, VrChannel};
use proptest::prelude::*;

/// Words through a FIFO and a 32-to-8 converter, with scripted valid and ready patterns.
#[derive(Debug)]
struct Pipeline {
    input: VrChannel<u64>,
    words: VecDeque<u64>,
    valid: Vec<bool>,
    fifo: Fifo<u64>,
    converter: DownConverter,
    ready: Vec<bool>,
    out: Vec<u64>,
    cycle: usize,
}

impl Pipeline {
    fn new(words: Vec<u64>, depth: usize, valid: Vec<bool>, ready: Vec<bool>) -> Self {
        Self {
            input: VrChannel::default(),
            words: words.into(),
            valid,
            fifo: Fifo::new(depth).unwrap(),
            converter: DownConverter::new(32, 8).unwrap(),
            ready,
            out: Vec::new(),
            cycle: 0,
        }
    }

    fn connect(&mut self) {
        VrChannel::connect(&mut self.input, &mut self.fifo.sink);
        VrChannel::connect(&mut self.fifo.source, &mut self.converter.sink);
    }
}

impl Module for Pipeline {
    fn eval(&mut self) {
        let valid = self.valid[self.cycle % self.valid.len()];
        match self.words.front() {
            Some(word) if valid => self.input.offer(*word),
            _ => self.input.idle(),
        }
        self.converter.source.accept(self.ready[self.cycle % self.ready.len()]);
        self.fifo.eval();
        self.connect();
        self.converter.eval();
        self.connect();
    }

    fn tick(&mut self) {
        if self.input.fire() {
            self.words.pop_front();
        }
        if self.converter.source.fire() {
            self.out.push(*self.converter.source.payload());
        }
        self.fifo.tick();
        self.converter.tick();
        self.cycle += 1;
    }

    fn probe(&self, bits: &mut Vec<bool>) {
        self.input.probe(bits);
        self.fifo.probe(bits);
        self.converter.probe(bits);
    }
}

#[test]
fn bytes_in_order() {
    let words = vec![0x4433_2211, 0x8877_6655];
    let mut sim = Simulator::new(Pipeline::new(words, 2, vec![true], vec![true]));
    sim.run_until(|p: &Pipeline| p.out.len() == 8, 32).unwrap();
    assert_eq!(sim.top().out, vec![0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]);
    assert!(sim.top().fifo.is_empty());
}

proptest! {
    #[test]
    fn backpressure_preserves_order_and_holds_offers(
        words in prop::collection::vec(0u64..1 << 32, 1..24),
        depth in 1usize..5,
        valid in prop::collection::vec(any::<bool>(), 1..6),
        ready in prop::collection::vec(any::<bool>(), 1..6),
    ) {
        let mut valid = valid;
        let mut ready = ready;
        valid.push(true);
        ready.push(true);
        let expected = words.iter().flat_map(|word| (0..4).map(move |b| (word >> (8 * b)) & 0xff)).collect::<Vec<_>>();

        let mut sim = Simulator::new(Pipeline::new(words, depth, valid, ready));
        let mut fifo_out = StabilityMonitor::new("fifo.source");
        let mut bytes_out = StabilityMonitor::new("converter.source");
        while sim.top().out.len() < expected.len() {
            prop_assert!(sim.cycle() < 10_000, "pipeline stalled");
            sim.settle().unwrap();
            let top = sim.top();
            prop_assert!(top.fifo.level() <= top.fifo.depth());
            fifo_out.observe(&top.fifo.source).map_err(|err| TestCaseError::fail(err.to_string()))?;
            bytes_out.observe(&top.converter.source).map_err(|err| TestCaseError::fail(err.to_string()))?;
            sim.step().unwrap();
        }
        prop_assert_eq!(&sim.top().out, &expected);
        prop_assert_eq!(fifo_out.fires() * 4, bytes_out.fires());
    }
}
