//! Simulator.

use thiserror::Error;
use tracing::trace;

use crate::Module;

/// Default bound on combinational passes per cycle.
pub const DEFAULT_MAX_PASSES: usize = 64;

/// Simulation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    /// The combinational network did not reach a fixed point.
    #[error("combinational loop: no fixed point after {passes} passes in cycle {cycle}")]
    CombinationalLoop {
        /// Cycle being settled.
        cycle: u64,
        /// Passes evaluated.
        passes: usize,
    },

    /// The awaited condition did not hold within the cycle budget.
    #[error("timed out after {cycles} cycles (at cycle {cycle})")]
    Timeout {
        /// Cycle budget.
        cycles: u64,
        /// Cycle at which the budget ran out.
        cycle: u64,
    },
}

/// Drives a top-level module clock by clock.
#[derive(Debug)]
pub struct Simulator<M> {
    top: M,
    cycle: u64,
    max_passes: usize,
}

impl<M: Module> Simulator<M> {
    /// Creates a new simulator at cycle 0.
    pub fn new(top: M) -> Self { Self { top, cycle: 0, max_passes: DEFAULT_MAX_PASSES } }

    /// Overrides the bound on combinational passes per cycle.
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }

    /// Current cycle.
    pub fn cycle(&self) -> u64 { self.cycle }

    /// Top module.
    pub fn top(&self) -> &M { &self.top }

    /// Top module, for driving its inputs between cycles.
    pub fn top_mut(&mut self) -> &mut M { &mut self.top }

    /// Consumes the simulator and returns the top module.
    pub fn into_inner(self) -> M { self.top }

    /// Evaluates the combinational network until no wire changes. Returns the number of passes.
    pub fn settle(&mut self) -> Result<usize, SimError> {
        let mut prev = Vec::new();
        self.top.probe(&mut prev);

        for pass in 1..=self.max_passes {
            self.top.eval();
            let mut cur = Vec::with_capacity(prev.len());
            self.top.probe(&mut cur);
            if cur == prev {
                return Ok(pass);
            }
            prev = cur;
        }

        Err(SimError::CombinationalLoop { cycle: self.cycle, passes: self.max_passes })
    }

    /// Settles and commits one clock cycle.
    pub fn step(&mut self) -> Result<(), SimError> {
        let passes = self.settle()?;
        trace!(cycle = self.cycle, passes, "clock edge");
        self.top.tick();
        self.cycle += 1;
        Ok(())
    }

    /// Runs `cycles` clock cycles.
    pub fn run(&mut self, cycles: u64) -> Result<(), SimError> {
        for _ in 0..cycles {
            self.step()?;
        }
        Ok(())
    }

    /// Steps until `done` holds on the settled top module, at most `max_cycles` edges.
    ///
    /// Returns the cycle at which `done` held. The module is left settled, before that cycle's edge.
    pub fn run_until<F>(&mut self, mut done: F, max_cycles: u64) -> Result<u64, SimError>
    where F: FnMut(&M) -> bool {
        for _ in 0..=max_cycles {
            self.settle()?;
            if done(&self.top) {
                return Ok(self.cycle);
            }
            self.top.tick();
            self.cycle += 1;
        }
        Err(SimError::Timeout { cycles: max_cycles, cycle: self.cycle })
    }
}
