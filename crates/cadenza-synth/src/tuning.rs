//! Pitch names and pitch standards.
//!
//! A [`Pitch`] is a letter name, an accidental adjustment in semitones, and
//! an octave number. A [`PitchStandard`] maps it to Hz in 12-tone equal
//! temperament, anchored at the frequency of C0.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reference pitch for A4.
pub const A4_FREQ: f64 = 440.0;

/// Semitones from C0 up to A4.
const A4_SEMITONES: f64 = 57.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PitchName {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl PitchName {
    pub const ALL: [PitchName; 7] = [
        PitchName::C,
        PitchName::D,
        PitchName::E,
        PitchName::F,
        PitchName::G,
        PitchName::A,
        PitchName::B,
    ];

    /// Semitones above C in the same octave.
    #[inline]
    pub fn semitone(self) -> i32 {
        match self {
            PitchName::C => 0,
            PitchName::D => 2,
            PitchName::E => 4,
            PitchName::F => 5,
            PitchName::G => 7,
            PitchName::A => 9,
            PitchName::B => 11,
        }
    }

    /// Case-insensitive letter lookup.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_lowercase() {
            'c' => Some(PitchName::C),
            'd' => Some(PitchName::D),
            'e' => Some(PitchName::E),
            'f' => Some(PitchName::F),
            'g' => Some(PitchName::G),
            'a' => Some(PitchName::A),
            'b' => Some(PitchName::B),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            PitchName::C => 'C',
            PitchName::D => 'D',
            PitchName::E => 'E',
            PitchName::F => 'F',
            PitchName::G => 'G',
            PitchName::A => 'A',
            PitchName::B => 'B',
        }
    }
}

/// Semitone adjustment for an accidental symbol.
pub fn accidental(symbol: char) -> Option<f64> {
    match symbol {
        '#' | '♯' => Some(1.0),
        'b' | '♭' => Some(-1.0),
        '𝄪' => Some(2.0),
        '𝄫' => Some(-2.0),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pitch {
    pub name: PitchName,
    /// Accidentals, in semitones (may be fractional for microtones).
    pub adjustment: f64,
    pub octave: i32,
}

impl Pitch {
    pub fn new(name: PitchName, adjustment: f64, octave: i32) -> Self {
        Self {
            name,
            adjustment,
            octave,
        }
    }

    pub fn natural(name: PitchName, octave: i32) -> Self {
        Self::new(name, 0.0, octave)
    }

    /// Distance from C0 in semitones.
    #[inline]
    pub fn semitones(&self) -> f64 {
        f64::from(self.octave) * 12.0 + f64::from(self.name.semitone()) + self.adjustment
    }

    pub fn transposed(self, octaves: i32) -> Self {
        Self {
            octave: self.octave.saturating_add(octaves),
            ..self
        }
    }

    /// The octave of `name` + `adjustment` that lands nearest to `previous`.
    ///
    /// Ties go to the lower octave.
    pub fn closest_to(name: PitchName, adjustment: f64, previous: &Pitch) -> Self {
        let target = previous.semitones();
        (previous.octave.saturating_sub(1)..=previous.octave.saturating_add(1))
            .map(|octave| Pitch::new(name, adjustment, octave))
            .fold(None::<Pitch>, |best, candidate| match best {
                Some(best)
                    if (best.semitones() - target).abs()
                        <= (candidate.semitones() - target).abs() =>
                {
                    Some(best)
                }
                _ => Some(candidate),
            })
            .unwrap_or_else(|| Pitch::new(name, adjustment, previous.octave))
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name.letter())?;
        let mut rest = self.adjustment;
        while rest >= 1.0 {
            f.write_str("#")?;
            rest -= 1.0;
        }
        while rest <= -1.0 {
            f.write_str("b")?;
            rest += 1.0;
        }
        write!(f, "{}", self.octave)
    }
}

/// Parses `C4`, `f#3`, `Bb-1`, `e♭5`.
impl FromStr for Pitch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidPitch(s.to_string());
        let mut chars = s.chars();
        let name = chars
            .next()
            .and_then(PitchName::from_letter)
            .ok_or_else(invalid)?;

        let rest = chars.as_str();
        let mut adjustment = 0.0;
        let mut octave_at = rest.len();
        for (i, c) in rest.char_indices() {
            match accidental(c) {
                Some(semitones) => adjustment += semitones,
                None => {
                    octave_at = i;
                    break;
                }
            }
        }
        let octave = rest[octave_at..].parse::<i32>().map_err(|_| invalid())?;
        Ok(Pitch::new(name, adjustment, octave))
    }
}

/// Maps pitches to frequencies.
pub trait PitchStandard: fmt::Debug + Send + Sync {
    /// Frequency of C0 in Hz.
    fn c0(&self) -> f64;

    fn resolve(&self, pitch: &Pitch) -> f64 {
        self.c0() * (pitch.semitones() / 12.0).exp2()
    }

    fn name(&self) -> &'static str;
}

/// Concert pitch: A4 = 440 Hz.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct A440;

impl PitchStandard for A440 {
    fn c0(&self) -> f64 {
        A4_FREQ * (-A4_SEMITONES / 12.0).exp2()
    }

    fn name(&self) -> &'static str {
        "a440"
    }
}

/// Scientific (philosophical) pitch: every C is a power of two, C4 = 256 Hz.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScientificPitch;

impl PitchStandard for ScientificPitch {
    fn c0(&self) -> f64 {
        16.0
    }

    fn name(&self) -> &'static str {
        "scientific"
    }
}

/// Equal temperament around an arbitrary A4, e.g. 432 Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqualTemperament {
    a4: f64,
}

impl EqualTemperament {
    pub fn with_a4(a4: f64) -> Result<Self> {
        if !(a4.is_finite() && a4 > 0.0) {
            return Err(Error::InvalidPitch(format!("A4 reference {}", a4)));
        }
        Ok(Self { a4 })
    }
}

impl PitchStandard for EqualTemperament {
    fn c0(&self) -> f64 {
        self.a4 * (-A4_SEMITONES / 12.0).exp2()
    }

    fn name(&self) -> &'static str {
        "equal-temperament"
    }
}

/// Named standards, for configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StandardKind {
    #[default]
    A440,
    Scientific,
}

impl PitchStandard for StandardKind {
    fn c0(&self) -> f64 {
        match self {
            StandardKind::A440 => A440.c0(),
            StandardKind::Scientific => ScientificPitch.c0(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            StandardKind::A440 => A440.name(),
            StandardKind::Scientific => ScientificPitch.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_a440_reference_points() {
        assert_relative_eq!(A440.resolve(&"A4".parse().unwrap()), 440.0, max_relative = 1e-12);
        assert_relative_eq!(A440.resolve(&"C4".parse().unwrap()), 261.6255653, max_relative = 1e-9);
        assert_relative_eq!(A440.c0(), 16.351597831287414, max_relative = 1e-12);
    }

    #[test]
    fn test_scientific_powers_of_two() {
        assert_eq!(ScientificPitch.resolve(&Pitch::natural(PitchName::C, 4)), 256.0);
        assert_eq!(ScientificPitch.resolve(&Pitch::natural(PitchName::C, 0)), 16.0);
    }

    #[test]
    fn test_accidentals_are_semitones() {
        let sharp: Pitch = "F#3".parse().unwrap();
        let flat: Pitch = "Gb3".parse().unwrap();
        assert_eq!(sharp.semitones(), flat.semitones());
        assert_eq!("e𝄫5".parse::<Pitch>().unwrap().adjustment, -2.0);
        assert_eq!("Bb-1".parse::<Pitch>().unwrap().octave, -1);
        assert!("H4".parse::<Pitch>().is_err());
        assert!("C".parse::<Pitch>().is_err());
    }

    #[test]
    fn test_closest_octave() {
        let g4 = Pitch::natural(PitchName::G, 4);
        assert_eq!(Pitch::closest_to(PitchName::C, 0.0, &g4).octave, 5);
        assert_eq!(Pitch::closest_to(PitchName::E, 0.0, &g4).octave, 4);
        let b3 = Pitch::natural(PitchName::B, 3);
        assert_eq!(Pitch::closest_to(PitchName::C, 0.0, &b3).octave, 4);
        // Tritone: equidistant, take the lower.
        let c4 = Pitch::natural(PitchName::C, 4);
        assert_eq!(Pitch::closest_to(PitchName::F, 1.0, &c4).octave, 3);
    }

    #[test]
    fn test_display() {
        assert_eq!(Pitch::new(PitchName::F, 1.0, 3).to_string(), "F#3");
        assert_eq!(Pitch::new(PitchName::B, -2.0, 2).to_string(), "Bbb2");
    }

    #[test]
    fn test_custom_reference() {
        let a432 = EqualTemperament::with_a4(432.0).unwrap();
        assert_relative_eq!(a432.resolve(&Pitch::natural(PitchName::A, 4)), 432.0, max_relative = 1e-12);
        assert!(EqualTemperament::with_a4(0.0).is_err());
        assert_eq!(StandardKind::Scientific.c0(), 16.0);
    }
}
