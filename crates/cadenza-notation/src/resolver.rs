//! Pitch resolution against the context in scope.

use crate::error::ResolutionError;
use crate::item::{ChordMember, PitchSymbol};
use cadenza_core::Beat;
use cadenza_synth::{Pitch, PitchName, PitchStandard};
use std::sync::Arc;

/// Octave given to the first unnumbered pitch of a scale declaration.
pub const SCALE_OCTAVE: i32 = 4;

/// Everything that shapes how a pitch or length reads at one point of the
/// item tree.
///
/// A composite item starts from a copy of its parent's context; directives
/// change the copy for the siblings after them and the change is dropped
/// when the composite ends.
///
/// Scale degrees are read relative to the last degree played: a degree
/// lands in whichever octave keeps it within half a scale of that step, and
/// `+`/`-` marks shift from there. The octave reached carries forward.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    scale: Option<Arc<[Pitch]>>,
    mode: u32,
    inversion: u32,
    /// Scale index of the last degree played.
    step: usize,
    /// Octaves above the declared scale reached by the last degree.
    scale_octave: i32,
    length: Beat,
    previous: Pitch,
}

impl Default for Context {
    /// C major from C4, mode 1, no inversion, one-beat notes.
    fn default() -> Self {
        let scale: Vec<Pitch> = PitchName::ALL
            .into_iter()
            .map(|name| Pitch::natural(name, SCALE_OCTAVE))
            .collect();
        Self {
            scale: Some(scale.into()),
            mode: 1,
            inversion: 0,
            step: 0,
            scale_octave: 0,
            length: Beat::ONE,
            previous: Pitch::natural(PitchName::C, SCALE_OCTAVE),
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// No scale in scope until one is declared.
    pub fn without_scale(mut self) -> Self {
        self.scale = None;
        self
    }

    pub fn with_scale(mut self, scale: Vec<Pitch>) -> Result<Self, ResolutionError> {
        self.set_scale(scale)?;
        Ok(self)
    }

    pub fn with_default_length(mut self, length: Beat) -> Self {
        self.length = length;
        self
    }

    pub fn scale(&self) -> Option<&[Pitch]> {
        self.scale.as_deref()
    }

    pub fn mode(&self) -> u32 {
        self.mode
    }

    pub fn inversion(&self) -> u32 {
        self.inversion
    }

    /// Octaves above the scale in scope that the last degree reached.
    pub fn scale_octave(&self) -> i32 {
        self.scale_octave
    }

    pub fn default_length(&self) -> Beat {
        self.length
    }

    /// The last pitch played, the reference for unnumbered letter names.
    pub fn previous(&self) -> Pitch {
        self.previous
    }

    /// A new scale is read from its first pitch.
    pub(crate) fn set_scale(&mut self, scale: Vec<Pitch>) -> Result<(), ResolutionError> {
        if scale.is_empty() {
            return Err(ResolutionError::EmptyScale);
        }
        self.scale = Some(scale.into());
        self.step = 0;
        self.scale_octave = 0;
        Ok(())
    }

    pub(crate) fn set_mode(&mut self, mode: u32) {
        self.mode = mode;
    }

    pub(crate) fn set_inversion(&mut self, inversion: u32) {
        self.inversion = inversion;
    }

    pub(crate) fn set_default_length(&mut self, length: Beat) {
        self.length = length;
    }

    /// Resolve a single note and move the context past it.
    pub(crate) fn play(&mut self, symbol: &PitchSymbol) -> Result<Pitch, ResolutionError> {
        let resolved = resolve_symbol(symbol, self)?;
        if let Some((step, scale_octave)) = resolved.step {
            self.step = step;
            self.scale_octave = scale_octave;
        }
        self.previous = resolved.pitch;
        Ok(resolved.pitch)
    }

    /// Resolve a chord and move the context past it.
    ///
    /// Each member is read relative to the one before it, marks included.
    /// Afterwards the context follows the `reference` member.
    pub(crate) fn play_chord(
        &mut self,
        symbols: &[PitchSymbol],
        reference: ChordMember,
    ) -> Result<Vec<Pitch>, ResolutionError> {
        let mut pitches = Vec::with_capacity(symbols.len());
        let mut scratch = self.clone();
        let mut first = None;
        for symbol in symbols {
            pitches.push(scratch.play(symbol)?);
            if first.is_none() {
                first = Some(scratch.clone());
            }
        }
        let leader = match reference {
            ChordMember::First => first,
            ChordMember::Last => pitches.last().map(|_| scratch),
        };
        if let Some(leader) = leader {
            self.follow(&leader);
        }
        invert(&mut pitches, self.inversion);
        Ok(pitches)
    }

    fn follow(&mut self, other: &Context) {
        self.step = other.step;
        self.scale_octave = other.scale_octave;
        self.previous = other.previous;
    }

    /// Resolve a scale declaration and make it the scale in scope.
    pub(crate) fn declare_scale(&mut self, symbols: &[PitchSymbol]) -> Result<(), ResolutionError> {
        let mut scale = Vec::with_capacity(symbols.len());
        let mut reader = self.clone();
        for symbol in symbols {
            let pitch = match (symbol, scale.last()) {
                (
                    PitchSymbol::Absolute {
                        name,
                        adjustment,
                        octave: None,
                        octave_shift,
                    },
                    None,
                ) => Pitch::new(*name, *adjustment, SCALE_OCTAVE.saturating_add(*octave_shift)),
                (
                    PitchSymbol::Absolute {
                        name,
                        adjustment,
                        octave: None,
                        octave_shift,
                    },
                    Some(previous),
                ) => Pitch::closest_to(*name, *adjustment, previous).transposed(*octave_shift),
                _ => reader.play(symbol)?,
            };
            scale.push(pitch);
        }
        self.set_scale(scale)
    }
}

struct Resolved {
    pitch: Pitch,
    /// Scale index and octave a degree moves the context to.
    step: Option<(usize, i32)>,
}

/// Octaves to move so that scale index `step` stays within half a scale of
/// `previous`.
fn nearest_octave(previous: usize, step: usize, size: usize) -> i32 {
    let half = size / 2;
    if previous + half < step {
        -1
    } else if step + half < previous {
        1
    } else {
        0
    }
}

fn resolve_symbol(symbol: &PitchSymbol, context: &Context) -> Result<Resolved, ResolutionError> {
    match *symbol {
        PitchSymbol::Degree {
            degree,
            adjustment,
            octave_shift,
        } => {
            let scale = context.scale().ok_or(ResolutionError::NoScale { degree })?;
            let size = scale.len();
            if degree == 0 || degree as usize > size {
                return Err(ResolutionError::DegreeOutOfRange { degree, size });
            }
            let mode = context.mode;
            if mode == 0 || mode as usize > size {
                return Err(ResolutionError::ModeOutOfRange { mode, size });
            }

            let step = ((degree - 1) as usize + (mode - 1) as usize) % size;
            let scale_octave = context
                .scale_octave
                .saturating_add(nearest_octave(context.step % size, step, size))
                .saturating_add(octave_shift);
            let base = scale[step];
            Ok(Resolved {
                pitch: Pitch::new(
                    base.name,
                    base.adjustment + adjustment,
                    base.octave.saturating_add(scale_octave),
                ),
                step: Some((step, scale_octave)),
            })
        }
        PitchSymbol::Absolute {
            name,
            adjustment,
            octave,
            octave_shift,
        } => {
            let pitch = match octave {
                Some(octave) => Pitch::new(name, adjustment, octave.saturating_add(octave_shift)),
                None => Pitch::closest_to(name, adjustment, &context.previous).transposed(octave_shift),
            };
            Ok(Resolved { pitch, step: None })
        }
    }
}

/// The pitch `symbol` names in `context`, without moving the context.
pub fn pitch(symbol: &PitchSymbol, context: &Context) -> Result<Pitch, ResolutionError> {
    resolve_symbol(symbol, context).map(|resolved| resolved.pitch)
}

/// Frequency of `symbol` in `context` under `standard`.
pub fn resolve(
    symbol: &PitchSymbol,
    context: &Context,
    standard: &dyn PitchStandard,
) -> Result<f64, ResolutionError> {
    Ok(standard.resolve(&pitch(symbol, context)?))
}

/// Raise the lowest `inversion` pitches by an octave, wrapping around for
/// inversions past the chord size. Ties rank in chord order.
pub fn invert(pitches: &mut [Pitch], inversion: u32) {
    let size = pitches.len();
    if size == 0 || inversion == 0 {
        return;
    }
    let mut order: Vec<usize> = (0..size).collect();
    order.sort_by(|&a, &b| pitches[a].semitones().total_cmp(&pitches[b].semitones()));

    let inversion = inversion as usize;
    let (full, extra) = (inversion / size, inversion % size);
    for (rank, index) in order.into_iter().enumerate() {
        let octaves = full + usize::from(rank < extra);
        pitches[index] = pitches[index].transposed(octaves as i32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cadenza_synth::A440;

    fn letter(name: PitchName, octave: Option<i32>) -> PitchSymbol {
        PitchSymbol::absolute(name, octave)
    }

    fn degrees(context: &mut Context, degrees: &[u32]) -> Vec<(PitchName, i32)> {
        degrees
            .iter()
            .map(|&d| {
                let p = context.play(&PitchSymbol::degree(d)).unwrap();
                (p.name, p.octave)
            })
            .collect()
    }

    #[test]
    fn test_default_scale_is_c_major() {
        let context = Context::new();
        let c4 = resolve(&PitchSymbol::degree(1), &context, &A440).unwrap();
        let a4 = resolve(&PitchSymbol::degree(6).with_octave_shift(1), &context, &A440).unwrap();
        assert_relative_eq!(c4, 261.6255653005986, max_relative = 1e-12);
        assert_relative_eq!(a4, 440.0, max_relative = 1e-12);
    }

    #[test]
    fn test_degrees_take_the_nearest_octave() {
        use PitchName::*;
        // Within half a scale of the step before, else the octave below.
        assert_eq!(degrees(&mut Context::new(), &[1, 7]), vec![(C, 4), (B, 3)]);
        assert_eq!(degrees(&mut Context::new(), &[1, 4]), vec![(C, 4), (F, 4)]);
        assert_eq!(degrees(&mut Context::new(), &[1, 5]), vec![(C, 4), (G, 3)]);

        // Stepwise motion climbs through the octave and keeps going.
        let mut context = Context::new();
        assert_eq!(
            degrees(&mut context, &[1, 2, 3, 4, 5, 6, 7, 1, 3]),
            vec![(C, 4), (D, 4), (E, 4), (F, 4), (G, 4), (A, 4), (B, 4), (C, 5), (E, 5)]
        );
        assert_eq!(context.scale_octave(), 1);

        // And back down.
        assert_eq!(degrees(&mut context, &[7, 5]), vec![(B, 4), (G, 4)]);
        assert_eq!(context.scale_octave(), 0);
    }

    #[test]
    fn test_marks_shift_from_the_nearest_octave() {
        let mut context = Context::new();
        context.play(&PitchSymbol::degree(1)).unwrap();
        let b4 = context.play(&PitchSymbol::degree(7).with_octave_shift(1)).unwrap();
        assert_eq!((b4.name, b4.octave), (PitchName::B, 4));
        let c5 = context.play(&PitchSymbol::degree(1)).unwrap();
        assert_eq!(c5.octave, 5);
    }

    #[test]
    fn test_mode_rotates_and_wraps() {
        use PitchName::*;
        let mut context = Context::new();
        context.set_mode(2);
        assert_eq!(
            degrees(&mut context, &[1, 2, 3, 4, 5, 6, 7]),
            vec![(D, 4), (E, 4), (F, 4), (G, 4), (A, 4), (B, 4), (C, 5)]
        );

        context.set_mode(8);
        assert_eq!(
            pitch(&PitchSymbol::degree(1), &context),
            Err(ResolutionError::ModeOutOfRange { mode: 8, size: 7 })
        );
    }

    #[test]
    fn test_degree_range_and_missing_scale() {
        let context = Context::new();
        assert_eq!(
            pitch(&PitchSymbol::degree(8), &context),
            Err(ResolutionError::DegreeOutOfRange { degree: 8, size: 7 })
        );
        assert_eq!(
            pitch(&PitchSymbol::degree(1), &Context::new().without_scale()),
            Err(ResolutionError::NoScale { degree: 1 })
        );
        assert_eq!(Context::new().with_scale(vec![]), Err(ResolutionError::EmptyScale));
    }

    #[test]
    fn test_octave_marks_accumulate() {
        let mut context = Context::new();
        let up = PitchSymbol::degree(1).with_octave_shift(1);
        assert_eq!(context.play(&up).unwrap().octave, 5);
        assert_eq!(context.play(&PitchSymbol::degree(1)).unwrap().octave, 5);
        assert_eq!(context.scale_octave(), 1);
    }

    #[test]
    fn test_huge_marks_saturate() {
        let mut context = Context::new();
        let up = PitchSymbol::degree(1).with_octave_shift(i32::MAX);
        assert_eq!(context.play(&up).unwrap().octave, i32::MAX);
        assert_eq!(context.play(&up).unwrap().octave, i32::MAX);
    }

    #[test]
    fn test_chord_reference_member() {
        let triad = [PitchSymbol::degree(1), PitchSymbol::degree(3), PitchSymbol::degree(5)];

        let mut context = Context::new();
        context.play_chord(&triad, ChordMember::First).unwrap();
        assert_eq!(context.previous(), Pitch::natural(PitchName::C, 4));
        assert_eq!(context.play(&PitchSymbol::degree(7)).unwrap().octave, 3);

        let mut context = Context::new();
        context.play_chord(&triad, ChordMember::Last).unwrap();
        assert_eq!(context.previous(), Pitch::natural(PitchName::G, 4));
        assert_eq!(context.play(&PitchSymbol::degree(7)).unwrap().octave, 4);

        let mut context = Context::new();
        assert_eq!(context.play_chord(&[], ChordMember::Last), Ok(vec![]));
        assert_eq!(context, Context::new());
    }

    #[test]
    fn test_chord_members_chain() {
        let mut context = Context::new();
        let pitches = context
            .play_chord(&[PitchSymbol::degree(5), PitchSymbol::degree(1)], ChordMember::First)
            .unwrap();
        assert_eq!(pitches[0], Pitch::natural(PitchName::G, 3));
        assert_eq!(pitches[1], Pitch::natural(PitchName::C, 4));
    }

    #[test]
    fn test_absolute_closest_octave() {
        let mut context = Context::new();
        let b3 = context.play(&letter(PitchName::B, Some(3))).unwrap();
        assert_eq!(b3.octave, 3);
        let c = context.play(&letter(PitchName::C, None)).unwrap();
        assert_eq!(c.octave, 4);
        let g = context.play(&letter(PitchName::G, None)).unwrap();
        assert_eq!(g.octave, 3);
    }

    #[test]
    fn test_scale_declaration_chains_from_octave_four() {
        let mut context = Context::new();
        context
            .declare_scale(&[
                letter(PitchName::A, None),
                letter(PitchName::B, None),
                letter(PitchName::C, None),
            ])
            .unwrap();
        let octaves: Vec<i32> = context.scale().unwrap().iter().map(|p| p.octave).collect();
        assert_eq!(octaves, vec![4, 4, 5]);
    }

    #[test]
    fn test_scale_from_degrees_of_current_scale() {
        let mut context = Context::new();
        context
            .declare_scale(&[PitchSymbol::degree(1), PitchSymbol::degree(3), PitchSymbol::degree(5)])
            .unwrap();
        let names: Vec<PitchName> = context.scale().unwrap().iter().map(|p| p.name).collect();
        assert_eq!(names, vec![PitchName::C, PitchName::E, PitchName::G]);
    }

    #[test]
    fn test_inversion_raises_lowest() {
        let c_major = || {
            vec![
                Pitch::natural(PitchName::C, 4),
                Pitch::natural(PitchName::E, 4),
                Pitch::natural(PitchName::G, 4),
            ]
        };

        let mut none = c_major();
        invert(&mut none, 0);
        assert_eq!(none, c_major());

        let mut first = c_major();
        invert(&mut first, 1);
        assert_eq!(first[0].octave, 5);
        assert_eq!(&first[1..], &c_major()[1..]);

        let mut wrapped = c_major();
        invert(&mut wrapped, 4);
        let octaves: Vec<i32> = wrapped.iter().map(|p| p.octave).collect();
        assert_eq!(octaves, vec![6, 5, 5]);
    }

    #[test]
    fn test_inversion_ranks_by_height() {
        let mut pitches = vec![
            Pitch::natural(PitchName::G, 4),
            Pitch::natural(PitchName::C, 4),
        ];
        invert(&mut pitches, 1);
        assert_eq!(pitches[0].octave, 4);
        assert_eq!(pitches[1].octave, 5);
    }
}
