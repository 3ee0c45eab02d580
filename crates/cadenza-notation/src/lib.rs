//! Compact music notation compiled to [`Tone`]s.
//!
//! Parsing and materialization are separate steps: [`parse`] turns text
//! into an immutable [`Item`] tree, and [`Tones`] walks that tree with a
//! [`Metronome`] and a [`PitchStandard`] to produce timed, pitched events.
//!
//! # Example
//!
//! ```ignore
//! use cadenza_notation::{materialize, parse, Dialect};
//! use cadenza_core::Metronome;
//! use cadenza_synth::A440;
//!
//! let item = parse("@(1 3 5) +(1,0.5 3+)", Dialect::Relative)?;
//! let tones = materialize(&item, &Metronome::constant(120.0)?, &A440)?;
//! ```
//!
//! [`Tone`]: cadenza_synth::Tone
//! [`Metronome`]: cadenza_core::Metronome
//! [`PitchStandard`]: cadenza_synth::PitchStandard

pub mod error;
pub use error::{Error, Position, ResolutionError, Result, SyntaxError};

pub mod item;
pub use item::{Chord, ChordMember, Group, Item, Note, PitchSymbol};

mod parser;
pub use parser::{parse, Dialect, MAX_DEPTH};

pub mod resolver;
pub use resolver::Context;

mod materializer;
pub use materializer::{materialize, Tones};
