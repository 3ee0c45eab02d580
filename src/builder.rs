//! Configuration and builder for a [`Session`].

use crate::{Result, Session};
use cadenza_automation::Envelope;
use cadenza_core::{Beat, EngineConfig, Graph, Metronome, Node, RenderContext, TempoInstruction};
use cadenza_dsp::Gain;
use cadenza_notation::{materialize, parse, Dialect};
use cadenza_synth::{Instrument, PitchStandard, StandardKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Everything a session needs besides the instrument itself.
///
/// Loads from TOML; every field is optional:
///
/// ```toml
/// dialect = "relative"
/// pitch_standard = "scientific"
///
/// [engine]
/// sample_rate = 44100.0
/// channels = 1
/// block_size = 256
///
/// [[tempo]]
/// beat = 0
/// bpm = 90.0
///
/// [[tempo]]
/// beat = "7/2"
/// bpm = 140.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub engine: EngineConfig,
    pub dialect: Dialect,
    pub pitch_standard: StandardKind,
    pub tempo: Vec<TempoInstruction>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            dialect: Dialect::default(),
            pitch_standard: StandardKind::default(),
            tempo: vec![TempoInstruction::new(Beat::ZERO, 120.0)],
        }
    }
}

impl SessionConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: SessionConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the engine settings and that the tempo list builds a usable
    /// metronome.
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.metronome()?.resolve(Beat::ZERO)?;
        Ok(())
    }

    pub fn metronome(&self) -> Result<Metronome> {
        Ok(Metronome::from_instructions(self.tempo.iter().copied())?)
    }
}

/// Fluent construction of a [`Session`].
///
/// # Example
///
/// ```ignore
/// use cadenza::prelude::*;
///
/// let instrument = Instrument::from_frequency(|hz| Box::new(Oscillator::sine(hz)));
/// let mut session = Session::builder()
///     .sample_rate(44100.0)
///     .channels(1)
///     .tempo(Beat::ZERO, 90.0)
///     .notation("@(1 3 5) +(1,0.5 3+)")
///     .build(instrument)?;
///
/// while !session.is_finished() {
///     sink.write(session.render_block());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    config: SessionConfig,
    /// Set once `tempo` is called, replacing the default tempo.
    custom_tempo: bool,
    envelope: Option<Envelope>,
    gain: f64,
    notation: Option<String>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            config: SessionConfig::default(),
            custom_tempo: false,
            envelope: None,
            gain: 1.0,
            notation: None,
        }
    }
}

impl SessionBuilder {
    /// Start from a loaded configuration. Tempo calls append to its tempo list.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self.custom_tempo = true;
        self
    }

    /// Default: 48000.0
    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.config.engine.sample_rate = sample_rate;
        self
    }

    /// Default: 2
    pub fn channels(mut self, channels: usize) -> Self {
        self.config.engine.channels = channels;
        self
    }

    /// Default: 512
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.config.engine.block_size = block_size;
        self
    }

    /// Default: [`Dialect::Relative`]
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.config.dialect = dialect;
        self
    }

    /// Default: [`StandardKind::A440`]
    pub fn pitch_standard(mut self, standard: StandardKind) -> Self {
        self.config.pitch_standard = standard;
        self
    }

    /// Add a tempo instruction. The first call replaces the default of
    /// 120 bpm from beat 0.
    pub fn tempo(mut self, beat: Beat, bpm: f64) -> Self {
        if !self.custom_tempo {
            self.config.tempo.clear();
            self.custom_tempo = true;
        }
        self.config.tempo.push(TempoInstruction::new(beat, bpm));
        self
    }

    /// Envelope for every voice. Default: the instrument's own.
    pub fn envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = Some(envelope);
        self
    }

    /// Output gain after the instrument mix. Default: 1.0
    pub fn gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }

    /// Notation to schedule before the first block.
    pub fn notation(mut self, source: impl Into<String>) -> Self {
        self.notation = Some(source.into());
        self
    }

    /// Parse and materialize the notation, schedule it on `instrument`,
    /// and wire the instrument through the output gain.
    pub fn build(self, instrument: Instrument) -> Result<Session> {
        let SessionBuilder {
            config,
            envelope,
            gain,
            notation,
            ..
        } = self;
        config.validate()?;
        let metronome = config.metronome()?;

        let mut instrument = match envelope {
            Some(envelope) => instrument.with_envelope(envelope),
            None => instrument,
        };
        let handle = instrument.handle();

        let mut scheduled = 0;
        if let Some(source) = notation.as_deref() {
            let item = parse(source, config.dialect)?;
            let tones = materialize(&item, &metronome, &config.pitch_standard)?;
            scheduled = tones.len();
            instrument.add_tones(tones);
        }

        let output = Gain::new(gain);
        let gain = output.gain();

        let mut graph = Graph::new();
        let instrument = graph.add(instrument);
        let output = graph.add(output);
        graph.connect(instrument, output)?;
        graph.set_output(Some(output))?;
        graph.validate()?;
        graph.prepare(&config.engine);

        let ctx = RenderContext::from_config(&config.engine);
        debug!(
            sample_rate = config.engine.sample_rate,
            channels = config.engine.channels,
            block_size = config.engine.block_size,
            tones = scheduled,
            standard = config.pitch_standard.name(),
            "Session built"
        );

        Ok(Session::new(config, ctx, graph, instrument, gain, handle, metronome))
    }
}
