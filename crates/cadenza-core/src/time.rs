//! Wall-clock positions and spans, in seconds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub};

/// A position on the playback clock, measured from the start of playback.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Timestamp(f64);

/// A signed span of wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Duration(f64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0.0);

    #[inline]
    pub const fn from_seconds(seconds: f64) -> Self {
        Self(seconds)
    }

    #[inline]
    pub fn from_samples(samples: u64, sample_rate: f64) -> Self {
        Self(samples as f64 / sample_rate)
    }

    #[inline]
    pub const fn seconds(self) -> f64 {
        self.0
    }

    /// Nearest sample index; positions before zero map to sample 0.
    #[inline]
    pub fn to_samples(self, sample_rate: f64) -> u64 {
        (self.0 * sample_rate).round().max(0.0) as u64
    }
}

impl Duration {
    pub const ZERO: Duration = Duration(0.0);

    #[inline]
    pub const fn from_seconds(seconds: f64) -> Self {
        Self(seconds)
    }

    #[inline]
    pub fn from_millis(millis: f64) -> Self {
        Self(millis / 1000.0)
    }

    #[inline]
    pub const fn seconds(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0.0
    }

    /// Nearest whole number of samples; negative spans map to 0.
    #[inline]
    pub fn to_samples(self, sample_rate: f64) -> u64 {
        (self.0 * sample_rate).round().max(0.0) as u64
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Timestamp) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs.0)
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Duration {
        Duration(self.0 + rhs.0)
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs.0;
    }
}

impl Sub for Duration {
    type Output = Duration;

    fn sub(self, rhs: Duration) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl Neg for Duration {
    type Output = Duration;

    fn neg(self) -> Duration {
        Duration(-self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.0)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_arithmetic() {
        let start = Timestamp::from_seconds(1.5);
        let end = start + Duration::from_millis(250.0);
        assert_eq!(end.seconds(), 1.75);
        assert_eq!((end - start).seconds(), 0.25);
        assert!((start - end).is_negative());
    }

    #[test]
    fn test_sample_conversion() {
        assert_eq!(Timestamp::from_seconds(0.5).to_samples(48000.0), 24000);
        assert_eq!(Duration::from_seconds(-1.0).to_samples(48000.0), 0);
        assert_eq!(Timestamp::from_samples(44100, 44100.0).seconds(), 1.0);
    }
}
