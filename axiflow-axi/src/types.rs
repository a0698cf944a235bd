//! AXI4 payloads and bus parameters.

use axiflow::{clog2, mask, Signal};
use axiflow_std::ParamError;
use paste::paste;
use serde::Deserialize;
use static_assertions::const_assert;
use thiserror::Error;

/// Widest data bus the payloads can carry.
pub const MAX_DATA_WIDTH: usize = 64;

/// Widest transaction identifier the payloads can carry.
pub const MAX_ID_WIDTH: usize = 32;

// Strobes are carried in a byte.
const_assert!(MAX_DATA_WIDTH / 8 <= 8);

/// Burst type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Signal)]
#[width(2)]
pub enum Burst {
    /// Every beat uses the same address.
    Fixed,
    /// The address advances by the transfer size each beat.
    #[default]
    Incr,
    /// The address advances and wraps inside an aligned window.
    Wrap,
    /// Reserved encoding.
    Reserved,
}

/// Response code.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Signal)]
#[width(2)]
pub enum Response {
    /// Normal access success.
    #[default]
    Okay,
    /// Exclusive access success.
    ExOkay,
    /// Target error.
    SlvErr,
    /// Decode error.
    DecErr,
}

/// Lock type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Signal)]
#[width(2)]
pub enum Lock {
    /// Normal access.
    #[default]
    Normal,
    /// Exclusive access.
    Exclusive,
}

/// aw*, ar*.
#[derive(Debug, Default, Clone, PartialEq, Eq, Signal)]
pub struct Addr {
    /// Transaction identifier.
    pub id: u32,
    /// Start address.
    pub addr: u64,
    /// Beats minus one.
    pub len: u8,
    /// log2 of the bytes per beat.
    #[width(3)]
    pub size: u8,
    /// Burst type.
    pub burst: Burst,
    /// Lock type, passed through.
    pub lock: Lock,
    /// Memory type, passed through.
    #[width(4)]
    pub cache: u8,
    /// Protection type, passed through.
    #[width(3)]
    pub prot: u8,
    /// Quality of service, passed through.
    #[width(4)]
    pub qos: u8,
}

/// w*.
#[derive(Debug, Default, Clone, PartialEq, Eq, Signal)]
pub struct WReq {
    /// Transaction identifier.
    pub id: u32,
    /// Write data.
    pub data: u64,
    /// Byte strobes.
    pub strb: u8,
    /// Last beat of the burst.
    pub last: bool,
}

/// b*.
#[derive(Debug, Default, Clone, PartialEq, Eq, Signal)]
pub struct WRes {
    /// Transaction identifier.
    pub id: u32,
    /// Write response.
    pub resp: Response,
}

/// r*.
#[derive(Debug, Default, Clone, PartialEq, Eq, Signal)]
pub struct RRes {
    /// Transaction identifier.
    pub id: u32,
    /// Read data.
    pub data: u64,
    /// Read response.
    pub resp: Response,
    /// Last beat of the burst.
    pub last: bool,
}

macro_rules! impl_with {
    ($t:ty { $($field:ident: $ty:ty),* $(,)? }) => {
        impl $t {
            $(
                paste! {
                    #[doc = concat!("Returns `self` with `", stringify!($field), "` replaced.")]
                    pub fn [<with_ $field>](mut self, $field: $ty) -> Self {
                        self.$field = $field;
                        self
                    }
                }
            )*
        }
    };
}

impl_with!(Addr { len: u8, size: u8, burst: Burst, lock: Lock, cache: u8, prot: u8, qos: u8 });

impl Addr {
    /// Single-beat incrementing command.
    pub fn new(id: u32, addr: u64, size: u8) -> Self { Self { id, addr, size, ..Default::default() } }
}

impl WReq {
    /// Creates a new write beat.
    pub fn new(id: u32, data: u64, strb: u8, last: bool) -> Self { Self { id, data, strb, last } }
}

impl WRes {
    /// Creates a new write response.
    pub fn new(id: u32, resp: Response) -> Self { Self { id, resp } }
}

impl RRes {
    /// Creates a new read beat.
    pub fn new(id: u32, data: u64, resp: Response, last: bool) -> Self { Self { id, data, resp, last } }
}

/// Configuration error, raised when a component is constructed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Data width is not 8, 16, 32 or 64.
    #[error("unsupported data width {0} (must be 8, 16, 32 or 64)")]
    DataWidth(usize),

    /// Address width is zero or wider than 64 bits.
    #[error("unsupported address width {0}")]
    AddrWidth(usize),

    /// Identifier width is zero or wider than 32 bits.
    #[error("unsupported id width {0}")]
    IdWidth(usize),

    /// Register width is not 8, 16 or 32, or wider than the bus.
    #[error("unsupported register width {width} on a {bus}-bit bus")]
    RegisterWidth {
        /// Register width.
        width: usize,
        /// Bus data width.
        bus: usize,
    },

    /// Element width does not divide the bus width.
    #[error("element width {element} does not divide the {bus}-bit bus")]
    ElementWidth {
        /// Element width.
        element: usize,
        /// Bus data width.
        bus: usize,
    },

    /// Buffer depth does not evenly divide the maximum burst length.
    #[error("buffer depth {depth} does not evenly divide the maximum burst length {max}")]
    BurstLength {
        /// Buffer depth.
        depth: usize,
        /// Maximum burst length.
        max: usize,
    },

    /// Buffer depth is below one burst.
    #[error("buffer depth {depth} is below the burst length {burst}")]
    DepthBelowBurst {
        /// Buffer depth.
        depth: usize,
        /// Burst length.
        burst: usize,
    },

    /// Zero pending transactions allowed.
    #[error("at least one pending transaction must be allowed")]
    Pending,

    /// Number of address predicates differs from the number of targets.
    #[error("{given} address predicates for {targets} targets")]
    TargetCount {
        /// Predicates given.
        given: usize,
        /// Targets.
        targets: usize,
    },

    /// Empty address region.
    #[error("address region {0} is empty")]
    EmptyRegion(String),

    /// Two address regions overlap.
    #[error("address regions {0} and {1} overlap")]
    OverlappingRegions(String, String),

    /// Memory size is not a nonzero power of two holding whole words.
    #[error("memory size {0} must be a power of two of at least one bus word")]
    MemorySize(usize),

    /// Invalid buffer, counter or converter parameter.
    #[error(transparent)]
    Param(#[from] ParamError),

    /// Memory base is not aligned to a bus word.
    #[error("memory base {base:#x} is not aligned to the {bytes}-byte bus")]
    MemoryBase {
        /// Base address.
        base: u64,
        /// Bytes per beat of the bus.
        bytes: usize,
    },
}

/// Bus parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Address width in bits.
    pub addr_width: usize,
    /// Data width in bits.
    pub data_width: usize,
    /// Identifier width in bits.
    pub id_width: usize,
}

impl Default for BusConfig {
    fn default() -> Self { Self { addr_width: 32, data_width: 32, id_width: 12 } }
}

impl BusConfig {
    /// Creates a new validated configuration.
    pub fn new(addr_width: usize, data_width: usize, id_width: usize) -> Result<Self, ConfigError> {
        Self { addr_width, data_width, id_width }.validate()
    }

    /// Checks the widths.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if ![8, 16, 32, 64].contains(&self.data_width) {
            return Err(ConfigError::DataWidth(self.data_width));
        }
        if self.addr_width == 0 || self.addr_width > 64 {
            return Err(ConfigError::AddrWidth(self.addr_width));
        }
        if self.id_width == 0 || self.id_width > MAX_ID_WIDTH {
            return Err(ConfigError::IdWidth(self.id_width));
        }
        Ok(self)
    }

    /// Bytes per beat.
    pub fn bytes(&self) -> usize { self.data_width / 8 }

    /// Number of strobe bits.
    pub fn strb_width(&self) -> usize { self.bytes() }

    /// `size` of a full-width beat.
    pub fn max_size(&self) -> u8 { clog2(self.bytes()) as u8 }

    /// All strobes set.
    pub fn full_strobe(&self) -> u8 { mask(self.strb_width()) as u8 }

    /// Mask of the data bits.
    pub fn data_mask(&self) -> u64 { mask(self.data_width) }

    /// Mask of the address bits.
    pub fn addr_mask(&self) -> u64 { mask(self.addr_width) }

    /// Mask of the identifier bits.
    pub fn id_mask(&self) -> u32 { mask(self.id_width) as u32 }
}
