//! Counter modules.

/// Down counter: loaded with a count, decremented per event, done at zero.
#[derive(Debug, Clone, Default)]
pub struct Countdown {
    count: u64,
}

impl Countdown {
    /// Creates a done countdown.
    pub fn new() -> Self { Self { count: 0 } }

    /// Remaining count.
    pub fn count(&self) -> u64 { self.count }

    /// Has the count reached zero?
    pub fn done(&self) -> bool { self.count == 0 }

    /// Loads a new count.
    pub fn load(&mut self, count: u64) { self.count = count }

    /// Decrements unless done.
    pub fn decrement(&mut self) { self.count = self.count.saturating_sub(1) }
}

/// Up/down occupancy counter.
#[derive(Debug, Clone, Default)]
pub struct UpDownCounter {
    count: usize,
}

impl UpDownCounter {
    /// Current count.
    pub fn count(&self) -> usize { self.count }

    /// Applies one edge's increments and decrements.
    pub fn update(&mut self, up: bool, down: bool) {
        self.count = (self.count + usize::from(up)).saturating_sub(usize::from(down));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_saturates() {
        let mut countdown = Countdown::new();
        assert!(countdown.done());
        countdown.load(2);
        countdown.decrement();
        countdown.decrement();
        countdown.decrement();
        assert!(countdown.done());
    }

    #[test]
    fn up_down() {
        let mut counter = UpDownCounter::default();
        counter.update(true, false);
        counter.update(true, true);
        counter.update(false, true);
        assert_eq!(counter.count(), 1);
        counter.update(false, true);
        counter.update(false, true);
        assert_eq!(counter.count(), 0);
    }
}
