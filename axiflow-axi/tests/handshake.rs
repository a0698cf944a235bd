//! Stalled transfers must hold still, whatever the backpressure.

mod common;

use axiflow::Simulator;
use axiflow_axi::{ArbiterConfig, BusConfig, Initiator, ReadRequest, ReaderConfig, Region};
use axiflow_std::StabilityMonitor;
use common::{try_init, Interconnect, ReadSystem};
use proptest::prelude::*;

/// One monitor per channel of an endpoint, in `aw, w, b, ar, r` order.
fn monitors(name: &str) -> [StabilityMonitor; 5] {
    ["aw", "w", "b", "ar", "r"].map(|channel| StabilityMonitor::new(format!("{name}.{channel}")))
}

fn observe(monitors: &mut [StabilityMonitor; 5], bus: &axiflow_axi::Endpoint) -> Result<(), TestCaseError> {
    let results = [
        monitors[0].observe(&bus.aw),
        monitors[1].observe(&bus.w),
        monitors[2].observe(&bus.b),
        monitors[3].observe(&bus.ar),
        monitors[4].observe(&bus.r),
    ];
    for result in results {
        result.map_err(|err| TestCaseError::fail(err.to_string()))?;
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn interconnect_holds_stalled_transfers(
        r_ready in prop::collection::vec(any::<bool>(), 1..6),
        b_ready in prop::collection::vec(any::<bool>(), 1..6),
        npending in 1usize..4,
    ) {
        try_init();
        let regions = [Region::new("sram0", 0x1000_0000, 0x1000_0000), Region::new("sram1", 0x2000_0000, 0x1000_0000)];
        let mut sys = Interconnect::<2, 2>::new(&regions, ArbiterConfig { npending, register: false });
        let mut r_ready = r_ready;
        let mut b_ready = b_ready;
        r_ready.push(true);
        b_ready.push(true);
        sys.masters[1] = Initiator::new(BusConfig::default()).unwrap().with_backpressure(r_ready, b_ready);
        for i in 0..6u64 {
            let target = if i % 2 == 0 { 0x1000_0000 } else { 0x2000_0000 };
            sys.masters[0].write_word(i as u32, target + 4 * i, i).unwrap();
            sys.masters[1].read_word(0x10 + i as u32, target + 4 * i).unwrap();
            sys.masters[1].write_word(0x20 + i as u32, target + 0x100 + 4 * i, i).unwrap();
        }

        let mut sim = Simulator::new(sys);
        let mut masters = [monitors("m0"), monitors("m1")];
        let mut slaves = [monitors("s0"), monitors("s1")];
        for _ in 0..2000 {
            sim.settle().unwrap();
            let sys = sim.top();
            if sys.is_idle() {
                break;
            }
            for (monitors, bus) in masters.iter_mut().zip(sys.masters.iter().map(|m| &m.bus)) {
                observe(monitors, bus)?;
            }
            for (monitors, sram) in slaves.iter_mut().zip(sys.targets.iter()) {
                observe(monitors, &sram.bus)?;
            }
            sim.step().unwrap();
        }
        prop_assert!(sim.top().is_idle());
        prop_assert_eq!(masters[1][4].fires(), 6);
        prop_assert_eq!(masters[0][2].fires() + masters[1][2].fires(), 12);
    }

    #[test]
    fn reader_holds_stalled_elements(
        ready in prop::collection::vec(any::<bool>(), 1..6),
        n in 1u32..24,
    ) {
        try_init();
        let mut ready = ready;
        ready.push(true);
        let config = ReaderConfig { element_width: 16, fifo_depth: 4, ..ReaderConfig::default() };
        let sys = ReadSystem::new(config, vec![ReadRequest { addr: 0x1010, n }], ready);

        let mut sim = Simulator::new(sys);
        let mut elements = StabilityMonitor::new("elements");
        let mut bus = monitors("reader");
        loop {
            sim.settle().unwrap();
            let sys = sim.top();
            if sys.requests.is_empty() && sys.reader.is_idle() {
                break;
            }
            prop_assert!(sim.cycle() < 2000, "reader did not finish");
            elements.observe(&sys.reader.source).map_err(|err| TestCaseError::fail(err.to_string()))?;
            observe(&mut bus, &sys.reader.bus)?;
            sim.step().unwrap();
        }
        prop_assert_eq!(elements.fires(), u64::from(n) * 2);
        prop_assert_eq!(sim.top().elements.items().len(), n as usize * 2);
    }
}
