//! Beat-to-wall-clock conversion driven by tempo instructions.
//!
//! Each instruction sets the tempo from its beat up to the next instruction's
//! beat (right-continuous). Instructions sharing a beat are all kept in
//! insertion order; the segment between them is zero beats long, so the last
//! one added wins with no elapsed time. That is how a score switches tempo
//! instantly, e.g. for swing.

use super::Beat;
use crate::time::Timestamp;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// A tempo change at a beat position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoInstruction {
    pub beat: Beat,
    /// Beats per minute. Must be positive and finite.
    pub bpm: f64,
}

impl TempoInstruction {
    pub fn new(beat: Beat, bpm: f64) -> Self {
        Self { beat, bpm }
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    beat: Beat,
    bpm: f64,
    /// Wall-clock seconds at `beat`.
    time: f64,
}

impl Segment {
    #[inline]
    fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }
}

/// Ordered tempo map.
///
/// `resolve` takes `&self`: the index of the last segment hit is cached in an
/// atomic hint, so in-order queries are O(1) and out-of-order queries fall
/// back to a binary search.
#[derive(Debug, Default)]
pub struct Metronome {
    segments: Vec<Segment>,
    hint: AtomicUsize,
}

impl Clone for Metronome {
    fn clone(&self) -> Self {
        Self {
            segments: self.segments.clone(),
            hint: AtomicUsize::new(0),
        }
    }
}

impl Metronome {
    pub fn new() -> Self {
        Self::default()
    }

    /// A metronome with a single tempo from beat 0.
    pub fn constant(bpm: f64) -> Result<Self> {
        let mut metronome = Self::new();
        metronome.add_instruction(Beat::ZERO, bpm)?;
        Ok(metronome)
    }

    pub fn from_instructions(
        instructions: impl IntoIterator<Item = TempoInstruction>,
    ) -> Result<Self> {
        let mut metronome = Self::new();
        for instruction in instructions {
            metronome.add(instruction)?;
        }
        Ok(metronome)
    }

    pub fn add(&mut self, instruction: TempoInstruction) -> Result<()> {
        self.add_instruction(instruction.beat, instruction.bpm)
    }

    /// Insert a tempo change, after any existing instruction at the same beat.
    pub fn add_instruction(&mut self, beat: Beat, bpm: f64) -> Result<()> {
        if !(bpm.is_finite() && bpm > 0.0) {
            return Err(Error::InvalidTempo(bpm));
        }

        let at = self.segments.partition_point(|s| s.beat <= beat);
        self.segments.insert(
            at,
            Segment {
                beat,
                bpm,
                time: 0.0,
            },
        );
        self.recalculate(at);
        self.hint.store(0, Ordering::Relaxed);

        debug!(%beat, bpm, instructions = self.segments.len(), "Tempo instruction added");
        Ok(())
    }

    fn recalculate(&mut self, from: usize) {
        for i in from..self.segments.len() {
            let time = match i.checked_sub(1).map(|p| self.segments[p]) {
                Some(prev) => {
                    let beats = self.segments[i]
                        .beat
                        .checked_sub(prev.beat)
                        .unwrap_or(Beat::ZERO);
                    prev.time + beats.as_f64() * prev.seconds_per_beat()
                }
                None => self.segments[i].beat.as_f64() * self.segments[i].seconds_per_beat(),
            };
            self.segments[i].time = time;
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Instructions in beat order (insertion order among equal beats).
    pub fn instructions(&self) -> impl Iterator<Item = TempoInstruction> + '_ {
        self.segments
            .iter()
            .map(|s| TempoInstruction::new(s.beat, s.bpm))
    }

    /// Wall-clock time of `beat`.
    ///
    /// Fails with [`Error::MissingDownbeat`] unless an instruction sits at beat 0.
    pub fn resolve(&self, beat: Beat) -> Result<Timestamp> {
        let segment = self.segment_for(beat)?;
        let beats = beat.checked_sub(segment.beat).unwrap_or(Beat::ZERO);
        Ok(Timestamp::from_seconds(
            segment.time + beats.as_f64() * segment.seconds_per_beat(),
        ))
    }

    /// Tempo in effect at `beat`.
    pub fn tempo_at(&self, beat: Beat) -> Result<f64> {
        Ok(self.segment_for(beat)?.bpm)
    }

    /// Fractional beat reached at `time`; the inverse of [`Metronome::resolve`].
    pub fn beat_at(&self, time: Timestamp) -> Result<f64> {
        self.check_downbeat()?;
        let seconds = time.seconds().max(0.0);
        let at = self.segments.partition_point(|s| s.time <= seconds);
        let segment = self.segments[at.saturating_sub(1)];
        Ok(segment.beat.as_f64() + (seconds - segment.time) / segment.seconds_per_beat())
    }

    fn check_downbeat(&self) -> Result<()> {
        match self.segments.first() {
            Some(first) if first.beat.is_zero() => Ok(()),
            _ => Err(Error::MissingDownbeat),
        }
    }

    fn segment_for(&self, beat: Beat) -> Result<Segment> {
        self.check_downbeat()?;
        let index = self.locate(beat);
        Ok(self.segments[index])
    }

    /// Index of the last segment starting at or before `beat`.
    fn locate(&self, beat: Beat) -> usize {
        let len = self.segments.len();
        let covers = |i: usize| {
            self.segments[i].beat <= beat && (i + 1 == len || self.segments[i + 1].beat > beat)
        };

        let hint = self.hint.load(Ordering::Relaxed);
        if hint < len && covers(hint) {
            return hint;
        }
        if hint + 1 < len && covers(hint + 1) {
            self.hint.store(hint + 1, Ordering::Relaxed);
            return hint + 1;
        }

        let index = self
            .segments
            .partition_point(|s| s.beat <= beat)
            .saturating_sub(1);
        self.hint.store(index, Ordering::Relaxed);
        index
    }
}
