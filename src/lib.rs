//! # Cadenza - Music Notation to Sound
//!
//! Compact music notation compiled into timed tones and rendered through a
//! block-based audio graph.
//!
//! ## Architecture
//!
//! Cadenza is an umbrella crate that coordinates:
//! - **cadenza-core** - Audio graph runtime (Node, Graph, Block) and transport (Beat, Metronome)
//! - **cadenza-dsp** - Signal nodes (oscillators, arithmetic, detune, delay, low-pass, callback)
//! - **cadenza-automation** - Note-anchored envelopes
//! - **cadenza-synth** - Tones, pitch standards, and the voice-spawning Instrument
//! - **cadenza-notation** - Parser, pitch resolver and lazy tone materializer
//!
//! ## Quick Start
//!
//! ```ignore
//! use cadenza::prelude::*;
//!
//! let instrument = Instrument::from_frequency(|hz| Box::new(Oscillator::square(hz)));
//! let mut session = Session::builder()
//!     .sample_rate(44100.0)
//!     .tempo(Beat::ZERO, 100.0)
//!     .notation("@(1 3 5) +(1,0.5 3+)")
//!     .build(instrument)?;
//!
//! let mut frames = Vec::new();
//! while !session.is_finished() {
//!     session.render_interleaved(&mut frames);
//!     sink.write(&frames);
//! }
//! ```
//!
//! Sessions can also be configured from TOML with [`SessionConfig::from_toml_str`].

/// Re-export of cadenza-core for direct access
pub use cadenza_core as core;

pub use cadenza_automation as automation;
pub use cadenza_dsp as dsp;
pub use cadenza_notation as notation;
pub use cadenza_synth as synth;

// Graph runtime and transport
pub use cadenza_core::{
    Arity, Beat, Block, Duration, EngineConfig, Graph, Metronome, Node, NodeIndex, Param,
    RenderContext, TempoInstruction, Timestamp,
};

// Signal nodes
pub use cadenza_dsp::{
    Add, Callback, CallbackHandle, ConstantValue, Delay, Detune, Gain, LowPassFilter, Multiply,
    Oscillator, Passthrough, Waveform,
};

pub use cadenza_automation::{Envelope, EnvelopeNode, EnvelopePoint};

// Tones and instruments
pub use cadenza_synth::{
    Instrument, InstrumentHandle, Pitch, PitchName, PitchStandard, ScientificPitch, StandardKind,
    Tag, Tone, A440,
};

// Notation
pub use cadenza_notation::{materialize, parse, Dialect, Item, Tones};

mod error;
pub use error::{Error, Result};

mod builder;
mod engine;

pub use builder::{SessionBuilder, SessionConfig};
pub use engine::Session;

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{Session, SessionBuilder, SessionConfig};

    pub use crate::core::prelude::*;

    pub use crate::{
        materialize, parse, Dialect, Envelope, EnvelopePoint, Gain, Instrument, Oscillator,
        PitchStandard, ScientificPitch, Tone, A440,
    };
}
