//! Signal: a value carried on a bundle of wires.

use std::fmt::Debug;

use crate::utils::{join_options, u64_to_bitvec};

/// Port declarations of a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortDecls {
    /// A bit vector of the given width.
    Bits(usize),

    /// Named members, each optionally prefixed.
    Struct(Vec<(Option<String>, PortDecls)>),
}

impl PortDecls {
    /// Total number of bits.
    pub fn width(&self) -> usize {
        match self {
            Self::Bits(width) => *width,
            Self::Struct(members) => members.iter().map(|(_, decls)| decls.width()).sum(),
        }
    }

    /// Flattens the declarations into leaf ports, joining nested names with `_`.
    pub fn flatten(&self, prefix: Option<String>) -> Vec<(Option<String>, usize)> {
        match self {
            Self::Bits(width) => vec![(prefix, *width)],
            Self::Struct(members) => members
                .iter()
                .flat_map(|(name, decls)| decls.flatten(join_options("_", [prefix.clone(), name.clone()])))
                .collect(),
        }
    }
}

/// A value that can be carried on wires.
///
/// `transl` gives the LSB-first bit image of the value; two values of a signal type are the same
/// wire state iff their images agree.
pub trait Signal: 'static + Debug + Clone + Default + PartialEq {
    /// Width in bits.
    const WIDTH: usize;

    /// Bit image of the value, LSB first, exactly `WIDTH` bits long.
    fn transl(&self) -> Vec<bool>;

    /// Port declarations.
    fn port_decls() -> PortDecls { PortDecls::Bits(Self::WIDTH) }
}

impl Signal for () {
    const WIDTH: usize = 0;

    fn transl(&self) -> Vec<bool> { Vec::new() }
}

impl Signal for bool {
    const WIDTH: usize = 1;

    fn transl(&self) -> Vec<bool> { vec![*self] }
}

macro_rules! impl_signal_uint {
    ($($t:ty),*) => {
        $(
            impl Signal for $t {
                const WIDTH: usize = <$t>::BITS as usize;

                fn transl(&self) -> Vec<bool> { u64_to_bitvec(Self::WIDTH, u64::from(*self)) }
            }
        )*
    };
}

impl_signal_uint!(u8, u16, u32, u64);

impl<A: Signal, B: Signal> Signal for (A, B) {
    const WIDTH: usize = A::WIDTH + B::WIDTH;

    fn transl(&self) -> Vec<bool> {
        let mut bits = self.0.transl();
        bits.extend(self.1.transl());
        bits
    }

    fn port_decls() -> PortDecls { PortDecls::Struct(vec![(None, A::port_decls()), (None, B::port_decls())]) }
}
