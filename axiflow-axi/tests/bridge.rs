mod common;

use axiflow::Simulator;
use axiflow_axi::{Addr, Burst};
use common::{try_init, RegisterSystem};
use proptest::prelude::*;

#[test]
fn burst_round_trip() {
    try_init();
    let mut sys = RegisterSystem::new(8);
    let data = [0x0302_0100, 0x0706_0504, 0x0b0a_0908, 0x0f0e_0d0c];
    sys.init.write(Addr::new(1, 0x20, 2).with_burst(Burst::Incr), &data, 0xf).unwrap();
    sys.init.read(Addr::new(2, 0x20, 2).with_len(3)).unwrap();

    let mut sim = Simulator::new(sys);
    sim.run_until(|sys: &RegisterSystem| sys.init.is_idle(), 500).unwrap();
    let sys = sim.top();

    // Four bytes per beat, one register each, from register 0x20.
    for adr in 0..16 {
        assert_eq!(sys.regs.peek(0x20 + adr), adr);
    }
    assert_eq!(sys.init.reads().next(), Some((2, &data[..])));
}

#[test]
fn wrapping_read() {
    try_init();
    let mut sys = RegisterSystem::new(32);
    for adr in 0..4 {
        sys.regs.poke(adr, 0x100 + adr);
    }
    sys.init.read(Addr::new(3, 0x8, 2).with_len(3).with_burst(Burst::Wrap)).unwrap();

    let mut sim = Simulator::new(sys);
    sim.run_until(|sys: &RegisterSystem| sys.init.is_idle(), 200).unwrap();
    assert_eq!(sim.top().init.reads().next(), Some((3, &[0x102, 0x103, 0x100, 0x101][..])));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn strobed_writes_read_back(
        width in prop::sample::select(vec![8usize, 16, 32]),
        writes in prop::collection::vec((0u64..16, any::<u32>(), 0u8..16), 1..12),
    ) {
        try_init();
        let mut sys = RegisterSystem::new(width);
        let mut model = [[0u8; 4]; 16];
        for (i, (word, data, strb)) in writes.iter().enumerate() {
            let cmd = Addr::new(i as u32, word * 4, 2);
            sys.init.write(cmd, &[u64::from(*data)], *strb).unwrap();
            for (lane, byte) in data.to_le_bytes().iter().enumerate() {
                if strb & (1 << lane) != 0 {
                    model[*word as usize][lane] = *byte;
                }
            }
        }
        let mut touched = writes.iter().map(|(word, _, _)| *word).collect::<Vec<_>>();
        touched.sort_unstable();
        touched.dedup();
        for word in &touched {
            sys.init.read_word(0x100 + *word as u32, word * 4).unwrap();
        }

        let mut sim = Simulator::new(sys);
        sim.run_until(|sys: &RegisterSystem| sys.init.is_idle(), 10_000).unwrap();

        let reads = sim.top().init.reads().map(|(id, data)| (id, data.to_vec())).collect::<Vec<_>>();
        prop_assert_eq!(reads.len(), touched.len());
        for ((id, data), word) in reads.iter().zip(touched.iter()) {
            prop_assert_eq!(*id, 0x100 + *word as u32);
            prop_assert_eq!(data.clone(), vec![u64::from(u32::from_le_bytes(model[*word as usize]))]);
        }
    }
}
