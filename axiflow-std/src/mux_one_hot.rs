//! Mux one-hot.

use arrayvec::ArrayVec;

/// Indices of the set bits of a selection vector.
pub fn selected<const N: usize>(sel: &[bool; N]) -> ArrayVec<usize, N> {
    sel.iter().enumerate().filter(|(_, s)| **s).map(|(i, _)| i).collect()
}

/// Index of the selected input, if exactly one bit is set.
pub fn one_hot_index<const N: usize>(sel: &[bool; N]) -> Option<usize> {
    let selected = selected(sel);
    if selected.len() == 1 {
        Some(selected[0])
    } else {
        None
    }
}

/// `OR(ready[i] & sel[i])`: the return path of a one-hot broadcast.
pub fn or_reduce_selected<const N: usize>(ready: &[bool; N], sel: &[bool; N]) -> bool {
    ready.iter().zip(sel.iter()).any(|(r, s)| *r && *s)
}

/// Input picked by a one-hot selection vector.
pub fn mux_one_hot<'a, T, const N: usize>(inputs: &'a [T; N], sel: &[bool; N]) -> Option<&'a T> {
    one_hot_index(sel).map(|i| &inputs[i])
}

/// One-hot vector with bit `index` set.
pub fn one_hot<const N: usize>(index: usize) -> [bool; N] { std::array::from_fn(|i| i == index) }
