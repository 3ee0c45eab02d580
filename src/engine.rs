//! The session: notation, tempo map and instrument graph driven block by block.

use crate::{Result, SessionBuilder, SessionConfig};
use cadenza_core::{
    prepare_outputs, Block, Duration, EngineConfig, Graph, Metronome, Node, NodeIndex, Param,
    RenderContext, Timestamp,
};
use cadenza_notation::{parse, Tones};
use cadenza_synth::InstrumentHandle;
use tracing::debug;

/// A rendering pipeline for an external sink.
///
/// The session owns the graph and never touches an audio device: callers
/// pull blocks with [`Session::render_block`] (planar) or
/// [`Session::render_interleaved`] and hand them to whatever consumes audio.
/// Tones can be added while rendering, from this thread with
/// [`Session::schedule`] or from any thread through [`Session::handle`].
///
/// # Example
///
/// ```ignore
/// use cadenza::prelude::*;
///
/// let mut session = Session::builder()
///     .notation("+(1 2 3 4 5,2)")
///     .build(Instrument::from_frequency(|hz| Box::new(Oscillator::square(hz))))?;
///
/// let mut frames = Vec::new();
/// while !session.is_finished() {
///     session.render_interleaved(&mut frames);
///     device.write(&frames);
/// }
/// ```
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    ctx: RenderContext,
    graph: Graph,
    instrument: NodeIndex,
    gain: Param,
    output: Vec<Block>,
    handle: InstrumentHandle,
    metronome: Metronome,
    /// Samples rendered so far.
    samples: u64,
}

impl Session {
    /// Create a new session builder
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    pub(crate) fn new(
        config: SessionConfig,
        ctx: RenderContext,
        graph: Graph,
        instrument: NodeIndex,
        gain: Param,
        handle: InstrumentHandle,
        metronome: Metronome,
    ) -> Self {
        let mut output = Vec::new();
        prepare_outputs(&mut output, graph.outputs().max(1), &ctx);
        Self {
            config,
            ctx,
            graph,
            instrument,
            gain,
            output,
            handle,
            metronome,
            samples: 0,
        }
    }

    /// Render the next block of `block_size` frames.
    pub fn render_block(&mut self) -> &Block {
        self.graph.render(&self.ctx, &[], &mut self.output);
        self.samples += self.ctx.frames as u64;
        &self.output[0]
    }

    /// Render the next block into `out` as interleaved frames, replacing its
    /// contents.
    pub fn render_interleaved(&mut self, out: &mut Vec<f32>) {
        out.clear();
        self.render_block().interleave_into(out);
    }

    /// Parse `source` and schedule its tones to start at the current
    /// position. Returns how many tones were scheduled.
    ///
    /// Nothing is scheduled unless every tone resolves.
    pub fn schedule(&mut self, source: &str) -> Result<usize> {
        let item = parse(source, self.config.dialect)?;
        let offset = self.position() - Timestamp::ZERO;

        let tones = Tones::new(&item, &self.metronome, &self.config.pitch_standard)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let count = tones.len();
        for mut tone in tones {
            tone.start = tone.start + offset;
            self.handle.add_tone(tone)?;
        }

        debug!(tones = count, at = %self.position(), "Notation scheduled");
        Ok(count)
    }

    /// Nothing left to play: no tone scheduled, no voice sounding and no
    /// command queued.
    pub fn is_finished(&self) -> bool {
        self.graph
            .node(self.instrument)
            .map_or(true, |instrument| instrument.finished())
    }

    /// Silence everything and rewind to the start.
    pub fn reset(&mut self) {
        self.graph.reset();
        self.samples = 0;
    }

    /// A cloneable control handle for the session's instrument.
    pub fn handle(&self) -> InstrumentHandle {
        self.handle.clone()
    }

    /// Output gain, shared with the render path.
    pub fn gain(&self) -> Param {
        self.gain.clone()
    }

    /// Position of the next block's first frame.
    pub fn position(&self) -> Timestamp {
        Timestamp::from_samples(self.samples, self.ctx.sample_rate)
    }

    /// Length of one rendered block.
    pub fn block_duration(&self) -> Duration {
        Duration::from_seconds(self.config.engine.block_seconds())
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.config.engine
    }

    pub fn metronome(&self) -> &Metronome {
        &self.metronome
    }
}
