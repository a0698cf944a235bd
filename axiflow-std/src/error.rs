//! Parameter errors.

use thiserror::Error;

/// Invalid primitive parameter, raised when a primitive is constructed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamError {
    /// Zero-entry queue or FIFO.
    #[error("capacity must be nonzero")]
    Capacity,

    /// Round-robin selector without requesters.
    #[error("round-robin selector needs at least one requester")]
    Requesters,

    /// Output width that does not divide the input width, or an input wider than 64 bits.
    #[error("cannot split {width_in}-bit words into {width_out}-bit elements")]
    Conversion {
        /// Input width.
        width_in: usize,
        /// Output width.
        width_out: usize,
    },
}
