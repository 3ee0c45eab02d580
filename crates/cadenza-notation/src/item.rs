//! The parsed notation tree.
//!
//! Items are plain immutable data. Lengths left out in the source stay
//! `None` here and take the default length in scope when tones are
//! materialized.

use cadenza_core::Beat;
use cadenza_synth::{PitchName, Tag};

/// A pitch as written, before any scale or octave context is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum PitchSymbol {
    /// A 1-based degree of the scale in scope.
    Degree {
        degree: u32,
        adjustment: f64,
        octave_shift: i32,
    },
    /// A letter name, with the octave inferred from the previous pitch when
    /// it is left out.
    Absolute {
        name: PitchName,
        adjustment: f64,
        octave: Option<i32>,
        octave_shift: i32,
    },
}

impl PitchSymbol {
    pub fn degree(degree: u32) -> Self {
        PitchSymbol::Degree {
            degree,
            adjustment: 0.0,
            octave_shift: 0,
        }
    }

    pub fn absolute(name: PitchName, octave: Option<i32>) -> Self {
        PitchSymbol::Absolute {
            name,
            adjustment: 0.0,
            octave,
            octave_shift: 0,
        }
    }

    pub fn octave_shift(&self) -> i32 {
        match self {
            PitchSymbol::Degree { octave_shift, .. } | PitchSymbol::Absolute { octave_shift, .. } => {
                *octave_shift
            }
        }
    }

    pub(crate) fn with_octave_shift(mut self, shift: i32) -> Self {
        match &mut self {
            PitchSymbol::Degree { octave_shift, .. } | PitchSymbol::Absolute { octave_shift, .. } => {
                *octave_shift = shift
            }
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub pitch: PitchSymbol,
    /// Beats to advance.
    pub length: Option<Beat>,
    /// Beats to sound; defaults to the length.
    pub duration: Option<Beat>,
    pub tags: Vec<Tag>,
}

/// Which chord member later pitches are read relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChordMember {
    #[default]
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chord {
    pub pitches: Vec<PitchSymbol>,
    pub length: Option<Beat>,
    pub duration: Option<Beat>,
    pub tags: Vec<Tag>,
    pub reference: ChordMember,
}

/// Sequence or overlapped children plus the tags applied to all of them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Group {
    pub items: Vec<Item>,
    pub tags: Vec<Tag>,
}

impl Group {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Note(Note),
    Rest { length: Option<Beat> },
    Chord(Chord),
    /// Children one after another.
    Sequence(Group),
    /// Children all starting at the same beat.
    Overlapped(Group),
    /// Rotate the scale so degree 1 falls on its `n`th pitch (1-based).
    Mode(u32),
    /// Raise the lowest `n` pitches of each later chord by an octave.
    Inversion(u32),
    /// Replace the scale for later siblings.
    Scale(Vec<PitchSymbol>),
    /// Move the pitch reference and/or replace the default length for later
    /// siblings, without sounding.
    Set {
        pitch: Option<PitchSymbol>,
        length: Option<Beat>,
    },
}

impl Item {
    /// True for items that take up time or make sound.
    pub fn is_event(&self) -> bool {
        !matches!(
            self,
            Item::Mode(_) | Item::Inversion(_) | Item::Scale(_) | Item::Set { .. }
        )
    }

    /// Beats this item advances an enclosing sequence by, given the default
    /// length in scope, or `None` if the total does not fit in a [`Beat`].
    ///
    /// Overlapped groups last as long as their longest child.
    pub fn length(&self, default: Beat) -> Option<Beat> {
        match self {
            Item::Note(Note { length, .. })
            | Item::Chord(Chord { length, .. })
            | Item::Rest { length } => Some(length.unwrap_or(default)),
            Item::Sequence(group) => {
                let mut default = default;
                let mut total = Beat::ZERO;
                for item in &group.items {
                    if let Item::Set {
                        length: Some(length),
                        ..
                    } = item
                    {
                        default = *length;
                    }
                    total = total.checked_add(item.length(default)?)?;
                }
                Some(total)
            }
            Item::Overlapped(group) => {
                let mut default = default;
                let mut longest = Beat::ZERO;
                for item in &group.items {
                    if let Item::Set {
                        length: Some(length),
                        ..
                    } = item
                    {
                        default = *length;
                    }
                    longest = longest.max(item.length(default)?);
                }
                Some(longest)
            }
            Item::Mode(_) | Item::Inversion(_) | Item::Scale(_) | Item::Set { .. } => {
                Some(Beat::ZERO)
            }
        }
    }
}
