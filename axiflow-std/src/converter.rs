//! Stream width conversion.

use axiflow::{mask, Module};
use tracing::trace;

use crate::{ParamError, VrChannel};

/// Splits each wide word into `width_in / width_out` narrow elements, least significant first.
///
/// The converter holds no data: the narrow output is valid while the wide input is, and the wide
/// word is consumed together with its last element.
#[derive(Debug)]
pub struct DownConverter {
    /// Wide words.
    pub sink: VrChannel<u64>,

    /// Narrow elements.
    pub source: VrChannel<u64>,

    width_out: usize,
    ratio: usize,
    sub: usize,
}

impl DownConverter {
    /// Creates a new converter. `width_out` must divide `width_in`, both at most 64 bits.
    pub fn new(width_in: usize, width_out: usize) -> Result<Self, ParamError> {
        if width_in > 64 || width_out == 0 || width_in % width_out != 0 {
            return Err(ParamError::Conversion { width_in, width_out });
        }
        Ok(Self {
            sink: VrChannel::default(),
            source: VrChannel::default(),
            width_out,
            ratio: width_in / width_out,
            sub: 0,
        })
    }

    /// Number of elements per word.
    pub fn ratio(&self) -> usize { self.ratio }

    /// Is the element on `source` the last one of its word?
    pub fn is_last(&self) -> bool { self.sub + 1 == self.ratio }

    /// Is a word partially consumed?
    pub fn busy(&self) -> bool { self.sub != 0 }
}

impl Module for DownConverter {
    fn eval(&mut self) {
        let element = (self.sink.payload() >> (self.sub * self.width_out) as u32) & mask(self.width_out);
        self.source.drive(self.sink.fwd.valid, element);
        self.sink.accept(self.source.bwd.ready && self.is_last());
    }

    fn tick(&mut self) {
        if self.source.fire() {
            trace!(sub = self.sub, element = *self.source.payload(), "element out");
            self.sub = if self.is_last() { 0 } else { self.sub + 1 };
        }
    }

    fn probe(&self, bits: &mut Vec<bool>) {
        self.sink.probe(bits);
        self.source.probe(bits);
    }
}
