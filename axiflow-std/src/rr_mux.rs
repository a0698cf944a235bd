//! Round-robin selection.

use tracing::debug;

use crate::ParamError;

/// Round-robin selector over `N` requesters.
///
/// The grant is registered. It stays with the current holder for as long as the holder keeps
/// requesting, and otherwise moves at the next edge to the first requester after the holder in
/// cyclic order. With requests defined as `valid & !ready`, a holder whose transfer fires stops
/// requesting in that very cycle, so priority rotates after every grant.
#[derive(Debug, Clone)]
pub struct RoundRobin<const N: usize> {
    grant: usize,
}

impl<const N: usize> RoundRobin<N> {
    /// Creates a new selector granting index 0.
    pub fn new() -> Result<Self, ParamError> {
        if N == 0 {
            return Err(ParamError::Requesters);
        }
        Ok(Self { grant: 0 })
    }

    /// Current grant.
    pub fn grant(&self) -> usize { self.grant }

    /// Grant after the next edge, given this cycle's requests.
    pub fn next_grant(&self, request: &[bool; N]) -> usize {
        if request[self.grant] {
            return self.grant;
        }
        (1..N).map(|offset| (self.grant + offset) % N).find(|&i| request[i]).unwrap_or(self.grant)
    }

    /// Clock edge.
    pub fn tick(&mut self, request: &[bool; N]) {
        let next = self.next_grant(request);
        if next != self.grant {
            debug!(from = self.grant, to = next, "grant moves");
        }
        self.grant = next;
    }
}
