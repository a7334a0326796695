//! Emulated time.
//!
//! The emulated machine runs on its own logical clock, counted in ticks of
//! the master oscillator. Emulated time only advances when the machine
//! executes; it never follows the wall clock.

/// Master clock ticks per emulated second.
pub const MAIN_FREQ: u64 = 3_579_545 * 960;

/// A point on the emulated clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EmuTime(u64);

/// A span of emulated time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EmuDuration(u64);

impl EmuTime {
    pub const ZERO: EmuTime = EmuTime(0);

    #[inline]
    pub fn from_ticks(ticks: u64) -> Self {
        EmuTime(ticks)
    }

    #[inline]
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`, zero if `earlier` is later.
    #[inline]
    pub fn saturating_duration_since(self, earlier: EmuTime) -> EmuDuration {
        EmuDuration(self.0.saturating_sub(earlier.0))
    }
}

impl EmuDuration {
    pub const ZERO: EmuDuration = EmuDuration(0);

    #[inline]
    pub fn from_ticks(ticks: u64) -> Self {
        EmuDuration(ticks)
    }

    #[inline]
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// Duration of `secs` emulated seconds. Negative and NaN inputs map to
    /// zero, overly large ones saturate.
    pub fn from_secs_f64(secs: f64) -> Self {
        EmuDuration((secs * MAIN_FREQ as f64) as u64)
    }

    pub fn from_millis(ms: u64) -> Self {
        EmuDuration(ms.saturating_mul(MAIN_FREQ) / 1000)
    }

    pub fn to_secs_f64(self) -> f64 {
        self.0 as f64 / MAIN_FREQ as f64
    }

    #[inline]
    pub fn saturating_sub(self, other: EmuDuration) -> EmuDuration {
        EmuDuration(self.0.saturating_sub(other.0))
    }
}

impl std::ops::Add<EmuDuration> for EmuTime {
    type Output = EmuTime;

    fn add(self, rhs: EmuDuration) -> EmuTime {
        EmuTime(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub<EmuDuration> for EmuTime {
    type Output = EmuTime;

    fn sub(self, rhs: EmuDuration) -> EmuTime {
        EmuTime(self.0.saturating_sub(rhs.0))
    }
}

impl std::fmt::Display for EmuTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_round_trip_at_tick_precision() {
        let d = EmuDuration::from_secs_f64(1.0);
        assert_eq!(d.ticks(), MAIN_FREQ);
        assert!((d.to_secs_f64() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn millis_match_seconds() {
        assert_eq!(
            EmuDuration::from_millis(250),
            EmuDuration::from_secs_f64(0.25)
        );
    }

    #[test]
    fn invalid_seconds_clamp_to_zero() {
        assert_eq!(EmuDuration::from_secs_f64(-3.0), EmuDuration::ZERO);
        assert_eq!(EmuDuration::from_secs_f64(f64::NAN), EmuDuration::ZERO);
    }

    #[test]
    fn arithmetic_saturates() {
        let t = EmuTime::from_ticks(10);
        assert_eq!(t - EmuDuration::from_ticks(20), EmuTime::ZERO);
        assert_eq!(
            EmuTime::from_ticks(u64::MAX) + EmuDuration::from_ticks(1),
            EmuTime::from_ticks(u64::MAX)
        );
        assert_eq!(
            EmuTime::from_ticks(5).saturating_duration_since(EmuTime::from_ticks(9)),
            EmuDuration::ZERO
        );
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", EmuTime::from_ticks(42)), "T=42");
    }
}
