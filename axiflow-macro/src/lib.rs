//! Derive macro for wire payloads.
//!
//! # Note
//!
//! `#[derive(Signal)]` on a struct lays its fields out LSB-first in declaration order, and its
//! `port_decls()` is the struct of its fields. A field may narrow its wire width with `#[width(N)]`
//! and rename (or hide, with an empty name) its port with `#[member(name = "...")]`.
//!
//! For example, the following payload
//!
//! ```ignore
//! #[derive(Debug, Default, Clone, PartialEq, Eq, Signal)]
//! pub struct B {
//!     pub id: u32,
//!     #[width(2)]
//!     pub resp: u8,
//! }
//! ```
//!
//! has `WIDTH == 34` and the following `port_decls()`:
//!
//! ```ignore
//! PortDecls::Struct(vec![
//!     (Some("id".to_string()), PortDecls::Bits(32)),
//!     (Some("resp".to_string()), PortDecls::Bits(2)),
//! ])
//! ```
//!
//! Unit-only enums are encoded in `#[width(N)]` bits (default: enough bits for every variant), each
//! variant taking its position or its `#[encode(V)]` value.

mod signal;
mod utils;

use proc_macro::{self, TokenStream};

/// Derives `axiflow::Signal`.
#[proc_macro_derive(Signal, attributes(member, width, encode))]
pub fn signal(input: TokenStream) -> TokenStream { signal::derive(input) }
