//! Standard library.

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

mod converter;
mod counter;
mod error;
pub mod fifo;
mod mux_one_hot;
mod rr_mux;
mod valid_ready;

pub use converter::*;
pub use counter::*;
pub use error::ParamError;
pub use fifo::{Fifo, Queue};
pub use mux_one_hot::*;
pub use rr_mux::*;
pub use valid_ready::*;
