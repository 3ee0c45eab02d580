//! Exact rational beat positions.

use crate::{Error, Result};
use num_rational::Ratio;
use num_traits::{CheckedAdd, CheckedSub};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A tempo-independent position or length in beats.
///
/// Stored as a reduced fraction so that sums of note lengths like `1/3` stay
/// exact no matter how long a sequence gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "BeatRepr", into = "String")]
pub struct Beat(Ratio<u64>);

impl Beat {
    pub const ZERO: Beat = Beat(Ratio::new_raw(0, 1));
    pub const ONE: Beat = Beat(Ratio::new_raw(1, 1));

    pub fn new(numer: u64, denom: u64) -> Result<Self> {
        if denom == 0 {
            return Err(Error::InvalidBeat(format!("{}/{}", numer, denom)));
        }
        Ok(Self(Ratio::new(numer, denom)))
    }

    pub fn from_integer(beats: u64) -> Self {
        Self(Ratio::from_integer(beats))
    }

    #[inline]
    pub fn numer(&self) -> u64 {
        *self.0.numer()
    }

    #[inline]
    pub fn denom(&self) -> u64 {
        *self.0.denom()
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.numer() == 0
    }

    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.numer() as f64 / self.denom() as f64
    }

    /// `self + rhs`, or `None` if the reduced sum does not fit in `u64`
    /// terms.
    pub fn checked_add(self, rhs: Beat) -> Option<Beat> {
        self.0.checked_add(&rhs.0).map(Beat)
    }

    /// `self - rhs`, or `None` if the result would be negative or does not
    /// fit.
    pub fn checked_sub(self, rhs: Beat) -> Option<Beat> {
        if rhs > self {
            None
        } else {
            self.0.checked_sub(&rhs.0).map(Beat)
        }
    }
}

impl Default for Beat {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<u64> for Beat {
    fn from(beats: u64) -> Self {
        Self::from_integer(beats)
    }
}

impl fmt::Display for Beat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denom() == 1 {
            write!(f, "{}", self.numer())
        } else {
            write!(f, "{}/{}", self.numer(), self.denom())
        }
    }
}

/// Parses `3`, `0.25`, `.5` or `3/4`.
impl FromStr for Beat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidBeat(s.to_string());
        let digits = |part: &str| -> Result<u64> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse::<u64>().map_err(|_| invalid())
        };

        if let Some((numer, denom)) = s.split_once('/') {
            return Beat::new(digits(numer)?, digits(denom)?).map_err(|_| invalid());
        }

        if let Some((whole, frac)) = s.split_once('.') {
            let whole = if whole.is_empty() { 0 } else { digits(whole)? };
            let frac_value = digits(frac)?;
            let scale = u32::try_from(frac.len())
                .ok()
                .and_then(|len| 10u64.checked_pow(len))
                .ok_or_else(invalid)?;
            let numer = whole
                .checked_mul(scale)
                .and_then(|w| w.checked_add(frac_value))
                .ok_or_else(invalid)?;
            return Beat::new(numer, scale);
        }

        Ok(Beat::from_integer(digits(s)?))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BeatRepr {
    Integer(u64),
    Text(String),
}

impl TryFrom<BeatRepr> for Beat {
    type Error = Error;

    fn try_from(repr: BeatRepr) -> Result<Self> {
        match repr {
            BeatRepr::Integer(beats) => Ok(Beat::from_integer(beats)),
            BeatRepr::Text(text) => text.parse(),
        }
    }
}

impl From<Beat> for String {
    fn from(beat: Beat) -> Self {
        beat.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!("3".parse::<Beat>().unwrap(), Beat::from_integer(3));
        assert_eq!("0.25".parse::<Beat>().unwrap(), Beat::new(1, 4).unwrap());
        assert_eq!(".5".parse::<Beat>().unwrap(), Beat::new(1, 2).unwrap());
        assert_eq!("3/4".parse::<Beat>().unwrap(), Beat::new(3, 4).unwrap());
        assert_eq!("1.50".parse::<Beat>().unwrap(), Beat::new(3, 2).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "x", "1/0", "-1", "1.", "1/2/3", "1e3", "+2"] {
            assert!(bad.parse::<Beat>().is_err(), "{:?} should not parse", bad);
        }
    }

    #[test]
    fn test_thirds_stay_exact() {
        let third = Beat::new(1, 3).unwrap();
        let sum = third.checked_add(third).and_then(|b| b.checked_add(third));
        assert_eq!(sum, Some(Beat::ONE));
        assert_eq!(Beat::ONE.checked_sub(third), Some(Beat::new(2, 3).unwrap()));
        assert_eq!(third.checked_sub(Beat::ONE), None);
    }

    #[test]
    fn test_checked_add_overflow() {
        let max = Beat::from_integer(u64::MAX);
        assert_eq!(max.checked_add(Beat::ONE), None);
        assert_eq!(max.checked_add(Beat::ZERO), Some(max));
        // Denominators whose lcm does not fit.
        let a = Beat::new(1, u64::MAX).unwrap();
        let b = Beat::new(1, u64::MAX - 1).unwrap();
        assert_eq!(a.checked_add(b), None);
        assert_eq!(b.checked_sub(a), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Beat::new(6, 4).unwrap().to_string(), "3/2");
        assert_eq!(Beat::from_integer(2).to_string(), "2");
    }
}
