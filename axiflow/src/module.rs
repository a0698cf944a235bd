//! Module.

/// A synchronous component.
///
/// Within one clock cycle, the simulator calls [`eval`](Module::eval) until no wire changes, then
/// calls [`tick`](Module::tick) exactly once. Input wires are written by whoever owns the module
/// (a parent composite or a testbench) before `eval`.
pub trait Module {
    /// Recomputes every combinational output from the registered state and the current inputs.
    ///
    /// Must not change registered state; calling it twice without touching the inputs is a no-op.
    fn eval(&mut self);

    /// Clock edge: commits the next registered state from the settled wires.
    fn tick(&mut self);

    /// Appends the bit image of every wire the module drives or observes.
    fn probe(&self, bits: &mut Vec<bool>);
}

impl<M: Module + ?Sized> Module for Box<M> {
    fn eval(&mut self) { (**self).eval() }

    fn tick(&mut self) { (**self).tick() }

    fn probe(&self, bits: &mut Vec<bool>) { (**self).probe(bits) }
}
