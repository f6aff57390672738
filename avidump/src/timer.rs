//! Exact rational clock.
//!
//! A [`Timer`] adds a rational step per increment and reports the whole units
//! accumulated so far. The fractional part is carried as an integer remainder,
//! so `read()` after `F` increments is exactly `floor(F * step_n / step_d)`.

/// Accumulates a rational step without drift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    /// Whole units
    w: u64,
    /// Fractional units, in `1/d`
    n: u64,
    d: u64,
    step_whole: u64,
    step_frac: u64,
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl Timer {
    /// Timer advancing by `step_n / step_d` units per increment.
    ///
    /// A zero denominator is treated as 1.
    pub fn new(step_n: u64, step_d: u64) -> Self {
        let mut timer = Timer {
            w: 0,
            n: 0,
            d: 1,
            step_whole: 0,
            step_frac: 0,
        };
        timer.set_step(step_n, step_d);
        timer
    }

    /// Nanosecond clock of an event stream running at `rate_n / rate_d`
    /// events per second.
    pub fn nanoseconds(rate_n: u64, rate_d: u64) -> Self {
        Self::new(1_000_000_000 * rate_d, rate_n)
    }

    fn set_step(&mut self, step_n: u64, step_d: u64) {
        let step_d = step_d.max(1);
        let g = gcd(step_n, step_d).max(1);
        let (step_n, step_d) = (step_n / g, step_d / g);
        self.d = step_d;
        self.step_whole = step_n / step_d;
        self.step_frac = step_n % step_d;
    }

    /// Add one step.
    pub fn increment(&mut self) {
        self.w += self.step_whole;
        self.n += self.step_frac;
        if self.n >= self.d {
            self.n -= self.d;
            self.w += 1;
        }
    }

    /// Whole units accumulated.
    pub fn read(&self) -> u64 {
        self.w
    }

    /// Increment, then read.
    pub fn read_next(&mut self) -> u64 {
        self.increment();
        self.w
    }

    /// What `read_next` would return.
    pub fn peek_next(&self) -> u64 {
        let carry = u64::from(self.n + self.step_frac >= self.d);
        self.w + self.step_whole + carry
    }

    /// Change the step, keeping the current phase.
    pub fn rate(&mut self, step_n: u64, step_d: u64) {
        let old_d = self.d;
        self.set_step(step_n, step_d);
        self.n = ((self.n as u128 * self.d as u128) / old_d as u128) as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ntsc_exact() {
        let mut timer = Timer::new(30000, 1001);
        for _ in 0..100_000 {
            timer.increment();
        }
        assert_eq!(timer.read(), 2_997_002);
    }

    #[test]
    fn test_read_next_and_peek() {
        let mut timer = Timer::new(48000, 60);
        assert_eq!(timer.read(), 0);
        assert_eq!(timer.peek_next(), 800);
        assert_eq!(timer.read(), 0);
        assert_eq!(timer.read_next(), 800);
        assert_eq!(timer.read_next(), 1600);
    }

    #[test]
    fn test_fractional_carry() {
        let mut timer = Timer::new(1, 3);
        let values: Vec<u64> = (0..6).map(|_| timer.read_next()).collect();
        assert_eq!(values, vec![0, 0, 1, 1, 1, 2]);
    }

    #[test]
    fn test_nanoseconds() {
        let mut timer = Timer::nanoseconds(60, 1);
        for _ in 0..60 {
            timer.increment();
        }
        assert_eq!(timer.read(), 1_000_000_000);

        let mut ntsc = Timer::nanoseconds(60000, 1001);
        ntsc.increment();
        assert_eq!(ntsc.read(), 16_683_333);
    }

    #[test]
    fn test_rate_change_keeps_phase() {
        let mut timer = Timer::new(1, 2);
        timer.increment();
        assert_eq!(timer.read(), 0);

        // Half a unit carried over into quarters
        timer.rate(1, 4);
        timer.increment();
        assert_eq!(timer.read(), 0);
        timer.increment();
        assert_eq!(timer.read(), 1);
    }

    #[test]
    fn test_zero_denominator() {
        let mut timer = Timer::new(5, 0);
        assert_eq!(timer.read_next(), 5);
    }
}
