//! FIFO Tracker.

/// Read/write pointers of a ring buffer.
///
/// The pointers alone cannot tell a full ring from an empty one, so the tracker also remembers
/// the last operation: equal pointers after an enqueue mean full, after a dequeue mean empty.
#[derive(Debug, Clone)]
pub struct Tracker {
    slots: usize,
    wptr: usize,
    rptr: usize,
    last_enq: bool,
    last_deq: bool,
}

impl Tracker {
    /// Creates a new tracker for `slots` entries.
    pub fn new(slots: usize) -> Self { Self { slots, wptr: 0, rptr: 0, last_enq: false, last_deq: true } }

    /// Write pointer.
    pub fn wptr(&self) -> usize { self.wptr }

    /// Read pointer.
    pub fn rptr(&self) -> usize { self.rptr }

    /// Is the ring full?
    pub fn full(&self) -> bool { self.wptr == self.rptr && self.last_enq }

    /// Is the ring empty?
    pub fn empty(&self) -> bool { self.wptr == self.rptr && self.last_deq }

    /// Number of occupied entries.
    pub fn len(&self) -> usize {
        if self.full() {
            self.slots
        } else {
            (self.wptr + self.slots - self.rptr) % self.slots
        }
    }

    /// Advances the pointers by one clock edge.
    pub fn advance(&mut self, enq: bool, deq: bool) {
        if enq {
            self.wptr = (self.wptr + 1) % self.slots;
        }
        if deq {
            self.rptr = (self.rptr + 1) % self.slots;
        }
        // A simultaneous push and pop keeps the occupancy, and with it the full/empty reading.
        if enq != deq {
            self.last_enq = enq;
            self.last_deq = deq;
        }
    }
}
