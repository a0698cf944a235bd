//! AXI4 interconnect components.
//!
//! Endpoints, burst addressing, address decoding, the transaction arbiter, and the bridges from
//! the burst bus to a register bus, to DMA streams, and to a DMA-330 peripheral request interface.

// # Tries to deny all lints (`rustc -W help`).
#![deny(absolute_paths_not_starting_with_crate)]
#![deny(anonymous_parameters)]
#![deny(deprecated_in_future)]
#![deny(explicit_outlives_requirements)]
#![deny(keyword_idents)]
#![deny(macro_use_extern_crate)]
#![deny(non_ascii_idents)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(unused_extern_crates)]
#![deny(unused_import_braces)]
//
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![warn(unreachable_pub)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
//
#![allow(elided_lifetimes_in_paths)]
#![allow(clippy::new_without_default)]

pub mod arbiter;
pub mod bfm;
pub mod bridge;
pub mod burst;
pub mod csr;
pub mod decoder;
pub mod dma;
pub mod dmac;
pub mod endpoint;
pub mod sram;
pub mod types;
pub mod wrshim;

pub use arbiter::{ArbiterConfig, TransactionArbiter};
pub use bfm::{Completion, Initiator, StreamSink, StreamSource};
pub use bridge::{Bridge, BridgeConfig};
pub use burst::{BurstCursor, BurstDescriptor, BurstError, PAGE_SIZE};
pub use csr::{CsrBus, RegisterFile};
pub use decoder::{AddrMatch, AddressDecoder, Region};
pub use dma::{Element, ReadRequest, Reader, ReaderConfig, WriteElement, Writer, WriterConfig};
pub use dmac::{DmacBus, ReadRequester, RequestType, StreamWriter, StreamWriterConfig};
pub use endpoint::{Direction, Endpoint, Port};
pub use sram::{Sram, SramConfig};
pub use types::*;
pub use wrshim::WriteShim;
