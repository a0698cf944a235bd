//! FIFO.

mod tracker;

use axiflow::{Module, Signal};
pub use tracker::Tracker;

use crate::{ParamError, VrChannel};

/// Fixed-capacity ring buffer.
///
/// Storage is allocated once at construction; entries live in arena slots indexed by the
/// tracker's pointers.
#[derive(Debug, Clone)]
pub struct Queue<V> {
    slots: Vec<Option<V>>,
    tracker: Tracker,
}

impl<V: Clone> Queue<V> {
    /// Creates a new queue holding at most `capacity` entries. `capacity` must be nonzero.
    pub fn new(capacity: usize) -> Result<Self, ParamError> {
        if capacity == 0 {
            return Err(ParamError::Capacity);
        }
        Ok(Self { slots: vec![None; capacity], tracker: Tracker::new(capacity) })
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize { self.slots.len() }

    /// Number of entries.
    pub fn len(&self) -> usize { self.tracker.len() }

    /// Is the queue empty?
    pub fn is_empty(&self) -> bool { self.tracker.empty() }

    /// Is the queue full?
    pub fn is_full(&self) -> bool { self.tracker.full() }

    /// Oldest entry.
    pub fn front(&self) -> Option<&V> {
        if self.is_empty() {
            None
        } else {
            self.slots[self.tracker.rptr()].as_ref()
        }
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &V> + '_ {
        let rptr = self.tracker.rptr();
        (0..self.len()).filter_map(move |i| self.slots[(rptr + i) % self.slots.len()].as_ref())
    }

    /// Clock edge: optionally pushes `enq` and pops the front.
    ///
    /// Pushing to a full queue (without a simultaneous pop) or popping an empty one is a bug in
    /// the caller's ready/valid logic.
    pub fn update(&mut self, enq: Option<V>, deq: bool) {
        debug_assert!(!deq || !self.is_empty(), "pop from an empty queue");
        debug_assert!(enq.is_none() || !self.is_full() || deq, "push to a full queue");

        if deq {
            self.slots[self.tracker.rptr()] = None;
        }
        let push = enq.is_some();
        if let Some(value) = enq {
            self.slots[self.tracker.wptr()] = Some(value);
        }
        self.tracker.advance(push, deq);
    }

    /// Pushes at the clock edge.
    pub fn push(&mut self, value: V) { self.update(Some(value), false) }

    /// Pops at the clock edge.
    pub fn pop(&mut self) -> Option<V> {
        let front = self.front().cloned();
        if front.is_some() {
            self.update(None, true);
        }
        front
    }
}

/// Synchronous first-word-fall-through FIFO with valid-ready ports.
///
/// `sink` is ready whenever the FIFO is not full; `source` is valid whenever it is not empty. A push
/// and a pop may happen on the same edge.
#[derive(Debug)]
pub struct Fifo<V: Signal> {
    /// Ingress.
    pub sink: VrChannel<V>,

    /// Egress.
    pub source: VrChannel<V>,

    queue: Queue<V>,
}

impl<V: Signal> Fifo<V> {
    /// Creates a new FIFO with `depth` entries.
    pub fn new(depth: usize) -> Result<Self, ParamError> {
        Ok(Self { sink: VrChannel::default(), source: VrChannel::default(), queue: Queue::new(depth)? })
    }

    /// Number of buffered entries.
    pub fn level(&self) -> usize { self.queue.len() }

    /// Depth.
    pub fn depth(&self) -> usize { self.queue.capacity() }

    /// Is the FIFO empty?
    pub fn is_empty(&self) -> bool { self.queue.is_empty() }
}

impl<V: Signal> Module for Fifo<V> {
    fn eval(&mut self) {
        self.sink.accept(!self.queue.is_full());
        match self.queue.front() {
            Some(front) => {
                let front = front.clone();
                self.source.offer(front);
            }
            None => self.source.idle(),
        }
    }

    fn tick(&mut self) {
        let enq = if self.sink.fire() { Some(self.sink.payload().clone()) } else { None };
        let deq = self.source.fire();
        self.queue.update(enq, deq);
    }

    fn probe(&self, bits: &mut Vec<bool>) {
        self.sink.probe(bits);
        self.source.probe(bits);
    }
}
