//! Tones, pitch standards, and the voice-spawning [`Instrument`].
//!
//! # Example
//!
//! ```ignore
//! use cadenza_synth::{Instrument, Tone};
//! use cadenza_dsp::Oscillator;
//!
//! let mut instrument = Instrument::from_frequency(|hz| Box::new(Oscillator::square(hz)));
//! let handle = instrument.handle();
//! handle.add_tone(tone)?;
//! ```

mod error;
pub use error::{Error, Result};

pub mod tuning;
pub use tuning::{
    accidental, EqualTemperament, Pitch, PitchName, PitchStandard, ScientificPitch, StandardKind,
    A440, A4_FREQ,
};

mod tone;
pub use tone::{Tag, Tone};

mod handle;
pub use handle::{Command, InstrumentHandle};

mod instrument;
pub use instrument::{Instrument, VoiceId, VoiceState};
