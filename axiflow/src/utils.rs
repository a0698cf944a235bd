//! Utilities.

use std::iter::IntoIterator;

/// Returns ceiling log2.
pub const fn clog2(value: usize) -> usize {
    if value == 0 {
        0
    } else {
        (::std::mem::size_of::<usize>() * 8) - (value - 1).leading_zeros() as usize
    }
}

/// Returns `value` rounded down to a multiple of `by`, which must be a power of two.
pub const fn align_down(value: u64, by: u64) -> u64 { value & !(by - 1) }

/// Returns the mask with the low `width` bits set.
pub const fn mask(width: usize) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1 << width) - 1
    }
}

/// Returns bit-represented value of an integer, LSB first.
pub fn u64_to_bitvec(n: usize, value: u64) -> Vec<bool> {
    (0..n).map(|i| if i >= 64 { false } else { (value & (1 << i)) != 0 }).collect::<Vec<_>>()
}

/// Truncates or zero-extends a bit vector to `width` bits.
pub fn resize_bits(mut bits: Vec<bool>, width: usize) -> Vec<bool> {
    bits.resize(width, false);
    bits
}

/// Combines all elements into one String, separated by `sep`. Returns `None` if all elements are `None`.
pub fn join_options<I>(sep: &str, iterable: I) -> Option<String>
where I: IntoIterator<Item = Option<String>> {
    let iterable = iterable.into_iter().flatten().collect::<Vec<_>>();
    if iterable.is_empty() {
        None
    } else {
        Some(iterable.join(sep))
    }
}

/// Ok or executing the given expression.
#[macro_export]
macro_rules! ok_or {
    ($e:expr, $err:expr) => {{
        match $e {
            Ok(r) => r,
            Err(_) => $err,
        }
    }};
}

/// Some or executing the given expression.
#[macro_export]
macro_rules! some_or {
    ($e:expr, $err:expr) => {{
        match $e {
            Some(r) => r,
            None => $err,
        }
    }};
}
