//! Walking an item tree into tones.

use crate::error::ResolutionError;
use crate::item::{Chord, Group, Item, Note};
use crate::resolver::Context;
use cadenza_core::{Beat, Metronome, Timestamp};
use cadenza_synth::{Pitch, PitchStandard, Tag, Tone};
use std::collections::{BTreeSet, VecDeque};
use std::slice;
use tracing::debug;

/// One composite being walked.
struct Frame<'a> {
    items: slice::Iter<'a, Item>,
    /// Beat the next child starts at.
    offset: Beat,
    /// Overlapped children all start at `offset`.
    parallel: bool,
    context: Context,
    tags: BTreeSet<Tag>,
}

/// Lazy iterator over the tones of an item tree.
///
/// Tones come out in tree order: children of an overlapped group are walked
/// one after another, so starts are only non-decreasing within a sequence.
/// [`materialize`] collects and orders them by start. The walk uses an
/// explicit stack, so deep trees cannot overflow the call stack. After an
/// error the iterator is exhausted.
pub struct Tones<'a> {
    metronome: &'a Metronome,
    standard: &'a dyn PitchStandard,
    stack: Vec<Frame<'a>>,
    ready: VecDeque<Tone>,
}

impl<'a> Tones<'a> {
    pub fn new(item: &'a Item, metronome: &'a Metronome, standard: &'a dyn PitchStandard) -> Self {
        Self::with_context(item, Context::default(), metronome, standard)
    }

    /// Start the walk from `context` instead of the default C major one.
    pub fn with_context(
        item: &'a Item,
        context: Context,
        metronome: &'a Metronome,
        standard: &'a dyn PitchStandard,
    ) -> Self {
        Self {
            metronome,
            standard,
            stack: vec![Frame {
                items: slice::from_ref(item).iter(),
                offset: Beat::ZERO,
                parallel: false,
                context,
                tags: BTreeSet::new(),
            }],
            ready: VecDeque::new(),
        }
    }

    fn time(&self, beat: Beat) -> Result<Timestamp, ResolutionError> {
        self.metronome
            .resolve(beat)
            .map_err(|source| ResolutionError::Tempo { beat, source })
    }

    fn tone(
        &self,
        pitch: &Pitch,
        start: Beat,
        duration: Beat,
        tags: &BTreeSet<Tag>,
    ) -> Result<Tone, ResolutionError> {
        let begin = self.time(start)?;
        let end = start
            .checked_add(duration)
            .ok_or(ResolutionError::BeatOverflow { beat: start })?;
        let end = self.time(end)?;
        Ok(Tone {
            start: begin,
            length: end - begin,
            frequency: self.standard.resolve(pitch),
            tags: tags.clone(),
        })
    }

    fn visit(&mut self, item: &'a Item, start: Beat) -> Result<(), ResolutionError> {
        let Some(frame) = self.stack.last_mut() else {
            return Ok(());
        };
        match item {
            Item::Note(Note {
                pitch,
                length,
                duration,
                tags,
            }) => {
                let pitch = frame.context.play(pitch)?;
                let length = length.unwrap_or(frame.context.default_length());
                let tags = with_tags(&frame.tags, tags);
                let tone = self.tone(&pitch, start, duration.unwrap_or(length), &tags)?;
                self.ready.push_back(tone);
            }
            Item::Chord(Chord {
                pitches,
                length,
                duration,
                tags,
                reference,
            }) => {
                let pitches = frame.context.play_chord(pitches, *reference)?;
                let length = length.unwrap_or(frame.context.default_length());
                let tags = with_tags(&frame.tags, tags);
                for pitch in &pitches {
                    let tone = self.tone(pitch, start, duration.unwrap_or(length), &tags)?;
                    self.ready.push_back(tone);
                }
            }
            Item::Rest { .. } => {}
            Item::Sequence(group) | Item::Overlapped(group) => {
                let Group { items, tags } = group;
                let frame = Frame {
                    items: items.iter(),
                    offset: start,
                    parallel: matches!(item, Item::Overlapped(_)),
                    context: frame.context.clone(),
                    tags: with_tags(&frame.tags, tags),
                };
                self.stack.push(frame);
            }
            Item::Mode(mode) => frame.context.set_mode(*mode),
            Item::Inversion(inversion) => frame.context.set_inversion(*inversion),
            Item::Scale(symbols) => frame.context.declare_scale(symbols)?,
            Item::Set { pitch, length } => {
                if let Some(pitch) = pitch {
                    frame.context.play(pitch)?;
                }
                if let Some(length) = length {
                    frame.context.set_default_length(*length);
                }
            }
        }
        Ok(())
    }

    /// Exhaust the walk.
    fn fail(&mut self, error: ResolutionError) -> ResolutionError {
        self.stack.clear();
        self.ready.clear();
        error
    }
}

fn with_tags(inherited: &BTreeSet<Tag>, own: &[Tag]) -> BTreeSet<Tag> {
    let mut tags = inherited.clone();
    tags.extend(own.iter().cloned());
    tags
}

impl Iterator for Tones<'_> {
    type Item = Result<Tone, ResolutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tone) = self.ready.pop_front() {
                return Some(Ok(tone));
            }

            let frame = self.stack.last_mut()?;
            let Some(item) = frame.items.next() else {
                self.stack.pop();
                continue;
            };
            let start = frame.offset;
            if !frame.parallel {
                match item
                    .length(frame.context.default_length())
                    .and_then(|length| start.checked_add(length))
                {
                    Some(offset) => frame.offset = offset,
                    None => return Some(Err(self.fail(ResolutionError::BeatOverflow { beat: start }))),
                }
            }

            if let Err(e) = self.visit(item, start) {
                return Some(Err(self.fail(e)));
            }
        }
    }
}

/// Every tone of `item`, ordered by start; ties keep tree order.
pub fn materialize(
    item: &Item,
    metronome: &Metronome,
    standard: &dyn PitchStandard,
) -> Result<Vec<Tone>, ResolutionError> {
    let mut tones = Tones::new(item, metronome, standard).collect::<Result<Vec<_>, _>>()?;
    tones.sort_by(|a, b| a.start.seconds().total_cmp(&b.start.seconds()));
    debug!(tones = tones.len(), standard = standard.name(), "Notation materialized");
    Ok(tones)
}
