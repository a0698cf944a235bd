//! AxiFlow: cycle-level simulation of latency-insensitive hardware interfaces.
//!
//! Every component is a [`Module`]: it recomputes its combinational outputs from its registered
//! state in [`Module::eval`] and commits the next state at the clock edge in [`Module::tick`]. A
//! [`Simulator`] settles the combinational network to a fixed point before each edge.

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

mod module;
mod signal;
mod sim;
pub mod utils;

pub use axiflow_macro::Signal;
pub use module::Module;
pub use signal::{PortDecls, Signal};
pub use sim::{SimError, Simulator, DEFAULT_MAX_PASSES};
pub use utils::*;
