/// Real (host) time sources.
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic host clock.
pub trait RealClock {
    /// Microseconds since an arbitrary fixed origin.
    fn now_us(&self) -> u64;

    /// Platform millisecond ticks, as stamped on raw events. Wraps.
    fn ticks_ms(&self) -> u32 {
        (self.now_us() / 1000) as u32
    }
}

/// Clock backed by `std::time::Instant`, origin at construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl RealClock for SystemClock {
    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_us: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new(start_us: u64) -> Self {
        Self {
            now_us: Rc::new(Cell::new(start_us)),
        }
    }

    pub fn set_us(&self, us: u64) {
        self.now_us.set(us);
    }

    pub fn set_ms(&self, ms: u64) {
        self.now_us.set(ms * 1000);
    }

    pub fn advance_us(&self, us: u64) {
        self.now_us.set(self.now_us.get() + us);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance_us(ms * 1000);
    }
}

impl RealClock for ManualClock {
    fn now_us(&self) -> u64 {
        self.now_us.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(0);
        let view = clock.clone();
        clock.advance_ms(5);
        assert_eq!(view.now_us(), 5_000);
        assert_eq!(view.ticks_ms(), 5);
    }

    #[test]
    fn ticks_wrap_like_platform_counters() {
        let clock = ManualClock::new(0);
        clock.set_ms(u32::MAX as u64 + 3);
        assert_eq!(clock.ticks_ms(), 2);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_us();
        let b = clock.now_us();
        assert!(b >= a);
    }
}
