mod common;

use axiflow::{align_down, Simulator};
use axiflow_axi::{Element, ReadRequest, ReaderConfig, WriteElement, WriterConfig};
use common::{try_init, ReadSystem, WriteSystem};
use proptest::prelude::*;

const BASE: u64 = 0x1000;

fn pattern(i: usize) -> u8 { (i * 7 + 3) as u8 }

fn read_system(config: ReaderConfig, requests: Vec<ReadRequest>, ready: Vec<bool>) -> ReadSystem {
    let mut sys = ReadSystem::new(config, requests, ready);
    let bytes = (0..1024).map(pattern).collect::<Vec<_>>();
    sys.sram.load(BASE, &bytes);
    sys
}

/// Elements of `n` words read from `addr`, least significant first.
fn expected(addr: u64, n: u32, element_width: usize) -> Vec<Element> {
    let start = (align_down(addr, 4) - BASE) as usize;
    let bytes = element_width / 8;
    let count = n as usize * 4 / bytes;
    (0..count)
        .map(|e| {
            let data = (0..bytes).rev().fold(0u64, |acc, b| (acc << 8) | u64::from(pattern(start + e * bytes + b)));
            Element { data, eop: e + 1 == count }
        })
        .collect()
}

#[test]
fn reads_bytes_from_sram() {
    try_init();
    let config = ReaderConfig { element_width: 8, fifo_depth: 4, ..ReaderConfig::default() };
    let sys = read_system(config, vec![ReadRequest { addr: BASE, n: 6 }], Vec::new());

    let mut sim = Simulator::new(sys);
    sim.run_until(|sys: &ReadSystem| sys.elements.items().len() == 24 && sys.reader.is_idle(), 500).unwrap();
    assert_eq!(sim.top().elements.items(), &expected(BASE, 6, 8)[..]);
}

#[test]
fn back_to_back_requests() {
    try_init();
    let config = ReaderConfig { element_width: 32, fifo_depth: 16, ..ReaderConfig::default() };
    let requests = vec![ReadRequest { addr: 0x1105, n: 3 }, ReadRequest { addr: 0x1200, n: 0 }, ReadRequest { addr: 0x1040, n: 20 }];
    let sys = read_system(config, requests, vec![true, false]);

    let mut sim = Simulator::new(sys);
    sim.run_until(|sys: &ReadSystem| sys.requests.is_empty() && sys.reader.is_idle(), 2000).unwrap();
    let mut want = expected(0x1105, 3, 32);
    want.extend(expected(0x1040, 20, 32));
    assert_eq!(sim.top().elements.items(), &want[..]);
}

#[test]
fn writes_run_with_padding() {
    try_init();
    let mut words = (0..6u64).map(|i| WriteElement { addr: 0x1100, data: 0x100 + i, eop: false }).collect::<Vec<_>>();
    words.push(WriteElement { addr: 0x1100, data: 0xeeee_eeee, eop: true });
    words.push(WriteElement { addr: 0x1201, data: 0x77, eop: false });
    words.push(WriteElement { addr: 0x1201, data: 0xffff_ffff, eop: true });
    let sys = WriteSystem::new(WriterConfig { fifo_depth: 4, ..WriterConfig::default() }, words, vec![true, true, false]);

    let mut sim = Simulator::new(sys);
    sim.run_until(|sys: &WriteSystem| sys.words.is_empty(), 500).unwrap();
    let sys = sim.top();

    for i in 0..6u64 {
        assert_eq!(sys.sram.read_word(0x1100 + 4 * i), Some(0x100 + i));
    }
    assert_eq!(sys.sram.read_word(0x1118), Some(0xeeee_eeee));
    assert_eq!(sys.sram.read_word(0x111c), Some(0xeeee_eeee));
    assert_eq!(sys.sram.read_word(0x1120), Some(0), "nothing past the padded burst");
    assert_eq!(sys.sram.read_word(0x1200), Some(0x77));
    assert_eq!(sys.sram.read_word(0x120c), Some(0xffff_ffff));
    assert_eq!(sys.writer.outstanding(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn reader_matches_memory(
        offset in 0u64..800,
        n in 0u32..40,
        element_width in prop::sample::select(vec![8usize, 16, 32]),
        fifo_depth in prop::sample::select(vec![1usize, 2, 4, 8, 16, 32]),
        ready in prop::collection::vec(any::<bool>(), 1..8),
    ) {
        try_init();
        let config = ReaderConfig { element_width, fifo_depth, ..ReaderConfig::default() };
        let addr = BASE + offset;
        let mut ready = ready;
        ready.push(true);
        let sys = read_system(config, vec![ReadRequest { addr, n }], ready);

        let mut sim = Simulator::new(sys);
        sim.run_until(|sys: &ReadSystem| sys.requests.is_empty() && sys.reader.is_idle(), 20_000).unwrap();
        prop_assert_eq!(sim.top().elements.items(), &expected(addr, n, element_width)[..]);
    }
}
