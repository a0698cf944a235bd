//! Write-issue shim.
//!
//! Holds a write command back until the first data beat of its burst is offered, then issues it
//! with the byte offset and transfer size implied by that beat's strobes. Data beats are released
//! only after their command has been accepted downstream.

use axiflow::{align_down, Module};
use axiflow_std::VrChannel;
use tracing::{debug, trace};

use crate::{BusConfig, ConfigError, Endpoint};

/// Transfer `(size, offset)` described by a strobe pattern on a `bytes`-lane bus.
///
/// A single lane gives size 0 at that lane. An aligned run of `2^s` lanes narrower than the bus
/// gives size `s` at its first lane. Any other pattern describes no narrow transfer.
pub fn strobe_window(strb: u8, bytes: usize) -> Option<(u8, u64)> {
    if strb == 0 {
        return None;
    }
    let offset = strb.trailing_zeros() as usize;
    let lanes = (strb >> offset).trailing_ones() as usize;
    let contiguous = u32::from(strb).count_ones() as usize == lanes;
    if !contiguous || !lanes.is_power_of_two() || lanes >= bytes || offset % lanes != 0 {
        return None;
    }
    Some((lanes.trailing_zeros() as u8, offset as u64))
}

/// Write-issue shim.
#[derive(Debug)]
pub struct WriteShim {
    /// Port facing the initiator.
    pub upstream: Endpoint,

    /// Port facing the target.
    pub downstream: Endpoint,

    bus: BusConfig,
    aw_done: bool,
    stored: bool,
}

impl WriteShim {
    /// Creates a new shim.
    pub fn new(bus: BusConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            upstream: Endpoint::default(),
            downstream: Endpoint::default(),
            bus: bus.validate()?,
            aw_done: false,
            stored: false,
        })
    }

    /// Is the offered data beat the first of a burst whose command is not yet issued?
    fn first_beat(&self) -> bool { !self.aw_done && self.upstream.w.fwd.valid }

    fn command_enabled(&self) -> bool { self.first_beat() || self.stored }
}

impl Module for WriteShim {
    fn eval(&mut self) {
        let enabled = self.command_enabled();

        let mut cmd = self.upstream.aw.payload().clone();
        let bytes = self.bus.bytes();
        if let Some((size, offset)) = strobe_window(self.upstream.w.payload().strb, bytes) {
            cmd.addr = align_down(cmd.addr, bytes as u64) | offset;
            cmd.size = size;
        } else {
            cmd.addr = align_down(cmd.addr, bytes as u64);
        }
        self.downstream.aw.drive(self.upstream.aw.fwd.valid && enabled, cmd);
        self.upstream.aw.accept(self.downstream.aw.bwd.ready && enabled);

        let beat = self.upstream.w.payload().clone();
        self.downstream.w.drive(self.upstream.w.fwd.valid && self.aw_done, beat);
        self.upstream.w.accept(self.downstream.w.bwd.ready && self.aw_done);

        VrChannel::connect(&mut self.upstream.ar, &mut self.downstream.ar);
        VrChannel::connect(&mut self.downstream.r, &mut self.upstream.r);
        VrChannel::connect(&mut self.downstream.b, &mut self.upstream.b);
    }

    fn tick(&mut self) {
        if self.downstream.aw.fire() {
            let cmd = self.downstream.aw.payload();
            debug!(id = cmd.id, addr = cmd.addr, size = cmd.size, "write command issued");
            self.aw_done = true;
            self.stored = false;
        } else if self.first_beat() {
            self.stored = true;
        }
        if self.downstream.w.fire() {
            let beat = self.downstream.w.payload();
            trace!(data = beat.data, strb = beat.strb, last = beat.last, "write beat released");
            if beat.last {
                self.aw_done = false;
            }
        }
    }

    fn probe(&self, bits: &mut Vec<bool>) {
        self.upstream.probe(bits);
        self.downstream.probe(bits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Addr, WReq};

    #[test]
    fn strobe_windows() {
        assert_eq!(strobe_window(0b0001, 4), Some((0, 0)));
        assert_eq!(strobe_window(0b1000, 4), Some((0, 3)));
        assert_eq!(strobe_window(0b0011, 4), Some((1, 0)));
        assert_eq!(strobe_window(0b1100, 4), Some((1, 2)));
        assert_eq!(strobe_window(0b0110, 4), None, "misaligned half word");
        assert_eq!(strobe_window(0b1111, 4), None);
        assert_eq!(strobe_window(0b0101, 4), None);
        assert_eq!(strobe_window(0b1111_0000, 8), Some((2, 4)));
    }

    fn issue(strb: u8) -> Addr {
        let mut shim = WriteShim::new(BusConfig::default()).unwrap();
        shim.upstream.aw.offer(Addr::new(3, 0x5550, 2));
        shim.downstream.aw.accept(true);
        shim.downstream.w.accept(true);

        shim.eval();
        assert!(!shim.downstream.aw.fwd.valid, "command waits for data");
        shim.tick();

        shim.upstream.w.offer(WReq::new(3, 0x1234_5678, strb, true));
        shim.eval();
        assert!(shim.upstream.aw.fire());
        assert!(!shim.downstream.w.fwd.valid, "data waits for its command");
        let cmd = shim.downstream.aw.payload().clone();
        shim.tick();

        shim.upstream.aw.idle();
        shim.eval();
        assert!(shim.upstream.w.fire());
        shim.tick();
        cmd
    }

    #[test]
    fn narrow_commands() {
        for (strb, addr, size) in [(0b0001, 0x5550, 0), (0b0010, 0x5551, 0), (0b0100, 0x5552, 0), (0b1000, 0x5553, 0)] {
            let cmd = issue(strb);
            assert_eq!((cmd.addr, cmd.size), (addr, size), "strobe {strb:#06b}");
        }
        let cmd = issue(0b0011);
        assert_eq!((cmd.addr, cmd.size), (0x5550, 1));
        let cmd = issue(0b1100);
        assert_eq!((cmd.addr, cmd.size), (0x5552, 1));
        let cmd = issue(0b1111);
        assert_eq!((cmd.addr, cmd.size, cmd.id), (0x5550, 2, 3));
    }

    #[test]
    fn stored_first_beat() {
        let mut shim = WriteShim::new(BusConfig::default()).unwrap();
        shim.upstream.aw.offer(Addr::new(1, 0x100, 2));
        shim.upstream.w.offer(WReq::new(1, 0xaa, 0b0001, false));
        shim.eval();
        assert!(shim.downstream.aw.stalled());
        shim.tick();
        assert!(shim.stored);

        shim.downstream.aw.accept(true);
        shim.downstream.w.accept(true);
        shim.eval();
        assert!(shim.downstream.aw.fire());
        shim.tick();
        assert!(!shim.stored);

        shim.upstream.aw.idle();
        shim.eval();
        assert!(shim.downstream.w.fire());
        shim.tick();
        shim.upstream.w.offer(WReq::new(1, 0xbb, 0b0001, true));
        shim.eval();
        assert!(shim.downstream.w.fire(), "later beats of the burst flow freely");
        shim.tick();
        shim.upstream.w.idle();
        shim.eval();
        assert!(!shim.downstream.w.fwd.valid);
    }
}
