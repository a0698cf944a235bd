//! Utilities for valid-ready channels.

use axiflow::{PortDecls, Signal};
use thiserror::Error;

/// Valid/ready channel's forward signals.
#[derive(Debug, Default, Clone, PartialEq, Signal)]
pub struct Valid<V: Signal> {
    /// Inner data
    #[member(name = "")]
    pub inner: V,

    /// Valid bit
    pub valid: bool,
}

/// Ready signal.
#[derive(Debug, Default, Clone, PartialEq, Eq, Signal)]
pub struct Ready {
    /// Ready bit
    pub ready: bool,
}

/// Valid-ready channel.
///
/// The producer drives `fwd`, the consumer drives `bwd`. A transfer ("fire") happens on a clock
/// edge where both `valid` and `ready` are high. Producers must be helpful: `valid` never depends
/// on the same cycle's `ready`, so a consumer is free to compute `ready` from `valid`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VrChannel<V: Signal> {
    /// Forward signals.
    pub fwd: Valid<V>,

    /// Backward signals.
    pub bwd: Ready,
}

impl<V: Signal> VrChannel<V> {
    /// Does the channel transfer at this edge?
    pub fn fire(&self) -> bool { self.fwd.valid && self.bwd.ready }

    /// Is an offered transfer waiting for the consumer?
    pub fn stalled(&self) -> bool { self.fwd.valid && !self.bwd.ready }

    /// Offers `inner` (producer side).
    pub fn offer(&mut self, inner: V) { self.fwd = Valid { inner, valid: true }; }

    /// Withdraws the offer (producer side).
    pub fn idle(&mut self) { self.fwd = Valid::default(); }

    /// Drives `valid` with `inner`, or idles when `valid` is low.
    pub fn drive(&mut self, valid: bool, inner: V) {
        if valid {
            self.offer(inner);
        } else {
            self.idle();
        }
    }

    /// Drives ready (consumer side).
    pub fn accept(&mut self, ready: bool) { self.bwd.ready = ready; }

    /// Offered payload.
    pub fn payload(&self) -> &V { &self.fwd.inner }

    /// Ties the same-named wires of two channel ends: forward signals flow from `producer` to
    /// `consumer`, ready flows back.
    pub fn connect(producer: &mut Self, consumer: &mut Self) {
        consumer.fwd = producer.fwd.clone();
        producer.bwd = consumer.bwd.clone();
    }

    /// Appends the bit image of the channel.
    pub fn probe(&self, bits: &mut Vec<bool>) {
        bits.extend(self.fwd.transl());
        bits.extend(self.bwd.transl());
    }

    /// Port declarations: payload members, then `valid` and `ready`.
    pub fn port_decls() -> PortDecls {
        PortDecls::Struct(vec![(None, Valid::<V>::port_decls()), (None, Ready::port_decls())])
    }
}

/// Handshake rule violation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// `valid` dropped before the offered transfer fired.
    #[error("{channel}: valid retracted before fire (cycle {cycle})")]
    Retracted {
        /// Channel name.
        channel: String,
        /// Cycle of the violation.
        cycle: u64,
    },

    /// The payload changed while the transfer was stalled.
    #[error("{channel}: payload changed while stalled (cycle {cycle})")]
    PayloadChanged {
        /// Channel name.
        channel: String,
        /// Cycle of the violation.
        cycle: u64,
    },
}

/// Checks that a stalled transfer is held unchanged until it fires.
///
/// Call [`observe`](StabilityMonitor::observe) once per clock edge with the settled channel.
#[derive(Debug)]
pub struct StabilityMonitor {
    channel: String,
    cycle: u64,
    stalled: Option<Vec<bool>>,
    fires: u64,
}

impl StabilityMonitor {
    /// Creates a new monitor.
    pub fn new(channel: impl Into<String>) -> Self {
        Self { channel: channel.into(), cycle: 0, stalled: None, fires: 0 }
    }

    /// Number of transfers observed so far.
    pub fn fires(&self) -> u64 { self.fires }

    /// Observes the channel at a clock edge.
    pub fn observe<V: Signal>(&mut self, channel: &VrChannel<V>) -> Result<(), ProtocolError> {
        let cycle = self.cycle;
        self.cycle += 1;

        if let Some(held) = self.stalled.take() {
            if !channel.fwd.valid {
                return Err(ProtocolError::Retracted { channel: self.channel.clone(), cycle });
            }
            if channel.fwd.inner.transl() != held {
                return Err(ProtocolError::PayloadChanged { channel: self.channel.clone(), cycle });
            }
        }

        if channel.fire() {
            self.fires += 1;
        } else if channel.stalled() {
            self.stalled = Some(channel.fwd.inner.transl());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_ties_wires() {
        let mut producer = VrChannel::<u8>::default();
        let mut consumer = VrChannel::<u8>::default();
        producer.offer(7);
        consumer.accept(true);
        VrChannel::connect(&mut producer, &mut consumer);
        assert_eq!(*consumer.payload(), 7);
        assert!(consumer.fire());
        assert!(producer.fire());
    }

    #[test]
    fn port_names() {
        let names = VrChannel::<u8>::port_decls()
            .flatten(Some("r".to_string()))
            .into_iter()
            .map(|(name, width)| (name.unwrap(), width))
            .collect::<Vec<_>>();
        assert_eq!(names, vec![("r".to_string(), 8), ("r_valid".to_string(), 1), ("r_ready".to_string(), 1)]);
    }

    #[test]
    fn monitor_flags_retraction() {
        let mut monitor = StabilityMonitor::new("ar");
        let mut channel = VrChannel::<u8>::default();
        channel.offer(3);
        monitor.observe(&channel).unwrap();
        channel.idle();
        assert_eq!(monitor.observe(&channel), Err(ProtocolError::Retracted { channel: "ar".into(), cycle: 1 }));
    }

    #[test]
    fn monitor_flags_payload_change() {
        let mut monitor = StabilityMonitor::new("aw");
        let mut channel = VrChannel::<u8>::default();
        channel.offer(3);
        monitor.observe(&channel).unwrap();
        channel.offer(4);
        assert!(matches!(monitor.observe(&channel), Err(ProtocolError::PayloadChanged { .. })));
    }

    #[test]
    fn monitor_accepts_held_offer() {
        let mut monitor = StabilityMonitor::new("w");
        let mut channel = VrChannel::<u8>::default();
        channel.offer(9);
        monitor.observe(&channel).unwrap();
        monitor.observe(&channel).unwrap();
        channel.accept(true);
        monitor.observe(&channel).unwrap();
        channel.idle();
        monitor.observe(&channel).unwrap();
        assert_eq!(monitor.fires(), 1);
    }
}
