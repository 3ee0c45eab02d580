//! Musical time: rational beats and the tempo map that places them on the clock.

mod beat;
mod metronome;

pub use beat::Beat;
pub use metronome::{Metronome, TempoInstruction};
