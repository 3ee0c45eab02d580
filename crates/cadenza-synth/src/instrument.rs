//! Per-tone voice spawning.
//!
//! An [`Instrument`] holds a schedule of [`Tone`]s. When the playback clock
//! reaches a tone's start it asks the factory for a fresh voice node, wires
//! it into a small graph (frequency source, voice, envelope) and mixes that
//! graph into its output until the envelope's tail has played out.
//!
//! Voices live in an arena indexed by slot. Retired voices are reaped by a
//! sweep at the end of each block and their slots reused.

use crate::handle::{Command, InstrumentHandle};
use crate::Tone;
use cadenza_automation::Envelope;
use cadenza_core::{
    prepare_outputs, Block, EngineConfig, Graph, Node, RenderContext, Timestamp,
};
use cadenza_dsp::ConstantValue;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use tracing::{debug, trace, warn};

/// Unique identifier for a voice instance.
pub type VoiceId = u64;

/// Builds the signal node for one voice.
enum Factory {
    Tone(Box<dyn FnMut(&Tone) -> Box<dyn Node> + Send>),
    Frequency(Box<dyn FnMut(f64) -> Box<dyn Node> + Send>),
}

impl Factory {
    fn build(&mut self, tone: &Tone) -> Box<dyn Node> {
        match self {
            Factory::Tone(factory) => factory(tone),
            Factory::Frequency(factory) => factory(tone.frequency),
        }
    }
}

/// Where a voice is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceState {
    /// Between the tone's start and end.
    #[default]
    Active,
    /// Past the tone's end, playing out the envelope tail.
    Retiring,
}

struct Scheduled {
    tone: Tone,
    seq: u64,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    /// Start time, then arrival order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.tone
            .start
            .seconds()
            .total_cmp(&other.tone.start.seconds())
            .then(self.seq.cmp(&other.seq))
    }
}

struct Voice {
    id: VoiceId,
    graph: Graph,
    outputs: Vec<Block>,
    /// Frames of silence before the voice's first sample in its first block.
    lead: usize,
    /// Sample at which the tone's own length runs out.
    release: u64,
    /// Sample at which the envelope tail has fully played.
    end: u64,
    state: VoiceState,
}

/// Plays tones by spawning one voice graph per tone.
///
/// Mixing is plain addition with no normalization; put a
/// [`Gain`](cadenza_dsp::Gain) downstream to keep the sum in range.
pub struct Instrument {
    factory: Factory,
    envelope: Envelope,
    config: Option<EngineConfig>,
    schedule: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
    voices: Vec<Option<Voice>>,
    free: Vec<usize>,
    active: usize,
    next_id: VoiceId,
    /// Samples rendered so far; the playback clock.
    samples: u64,
    sender: Sender<Command>,
    receiver: Receiver<Command>,
}

impl fmt::Debug for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrument")
            .field("envelope", &self.envelope)
            .field("scheduled", &self.schedule.len())
            .field("voices", &self.active)
            .field("samples", &self.samples)
            .finish()
    }
}

impl Instrument {
    /// An instrument whose factory sees the whole tone, tags included.
    pub fn new<F>(factory: F) -> Self
    where
        F: FnMut(&Tone) -> Box<dyn Node> + Send + 'static,
    {
        Self::with_factory(Factory::Tone(Box::new(factory)))
    }

    /// An instrument whose factory only needs the tone's frequency.
    pub fn from_frequency<F>(factory: F) -> Self
    where
        F: FnMut(f64) -> Box<dyn Node> + Send + 'static,
    {
        Self::with_factory(Factory::Frequency(Box::new(factory)))
    }

    fn with_factory(factory: Factory) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            factory,
            envelope: Envelope::default(),
            config: None,
            schedule: BinaryHeap::new(),
            next_seq: 0,
            voices: Vec::new(),
            free: Vec::new(),
            active: 0,
            next_id: 0,
            samples: 0,
            sender,
            receiver,
        }
    }

    /// Replace the envelope applied to voices spawned from now on.
    pub fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// A control handle for another thread.
    pub fn handle(&self) -> InstrumentHandle {
        InstrumentHandle::new(self.sender.clone())
    }

    pub fn add_tone(&mut self, tone: Tone) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.schedule.push(Reverse(Scheduled { tone, seq }));
    }

    pub fn add_tones(&mut self, tones: impl IntoIterator<Item = Tone>) {
        for tone in tones {
            self.add_tone(tone);
        }
    }

    /// Drop every scheduled tone and sounding voice.
    pub fn clear(&mut self) {
        self.schedule.clear();
        self.voices.clear();
        self.free.clear();
        self.active = 0;
    }

    /// Voices currently sounding.
    pub fn voice_count(&self) -> usize {
        self.active
    }

    /// Tones waiting for their start time.
    pub fn scheduled_count(&self) -> usize {
        self.schedule.len()
    }

    /// States of the live voices, keyed by id.
    pub fn voices(&self) -> impl Iterator<Item = (VoiceId, VoiceState)> + '_ {
        self.voices.iter().flatten().map(|v| (v.id, v.state))
    }

    pub fn is_idle(&self) -> bool {
        self.active == 0 && self.schedule.is_empty() && self.receiver.is_empty()
    }

    /// Playback position at the start of the next block.
    pub fn position(&self, sample_rate: f64) -> Timestamp {
        Timestamp::from_samples(self.samples, sample_rate)
    }

    fn drain_commands(&mut self) {
        let mut drained = 0usize;
        while let Ok(command) = self.receiver.try_recv() {
            drained += 1;
            match command {
                Command::AddTone(tone) => self.add_tone(tone),
                Command::Clear => self.clear(),
            }
        }
        if drained > 0 {
            debug!(commands = drained, "Instrument control queue drained");
        }
    }

    fn config_for(&self, ctx: &RenderContext) -> EngineConfig {
        match self.config {
            Some(config)
                if config.sample_rate == ctx.sample_rate && config.channels == ctx.channels =>
            {
                config
            }
            _ => EngineConfig::new(ctx.sample_rate, ctx.channels, ctx.frames),
        }
    }

    /// A voice graph for `tone`, its envelope already `skip` samples in.
    fn build_voice(
        &mut self,
        tone: &Tone,
        skip: u64,
        config: &EngineConfig,
    ) -> cadenza_core::Result<Graph> {
        let node = self.factory.build(tone);
        let mut graph = Graph::new();

        let frequency = if node.inputs().accepts(1) {
            Some(graph.add(ConstantValue::new(tone.frequency)))
        } else {
            None
        };
        let voice = graph.add_boxed(node);
        if let Some(frequency) = frequency {
            graph.connect(frequency, voice)?;
        }
        let mut envelope = self.envelope.node(tone.length);
        envelope.skip(skip, config.sample_rate);
        let envelope = graph.add(envelope);
        graph.connect(voice, envelope)?;
        graph.set_output(Some(envelope))?;
        graph.validate()?;

        graph.prepare(config);
        Ok(graph)
    }

    /// Start every tone due before `block_end`.
    fn spawn_due(&mut self, ctx: &RenderContext, block_end: u64) {
        let config = self.config_for(ctx);
        while let Some(Reverse(next)) = self.schedule.peek() {
            if next.tone.start.to_samples(ctx.sample_rate) >= block_end {
                break;
            }
            let Some(Reverse(Scheduled { tone, .. })) = self.schedule.pop() else {
                break;
            };

            let start = tone.start.to_samples(ctx.sample_rate);
            let tail = self.envelope.tail(tone.length);
            let release = tone.end().to_samples(ctx.sample_rate);
            let end = (tone.end() + tail).to_samples(ctx.sample_rate);
            if end <= self.samples {
                trace!(start = %tone.start, "Dropping tone that ended before playback reached it");
                continue;
            }

            // Late tones join partway through their envelope.
            let skip = self.samples.saturating_sub(start);
            let graph = match self.build_voice(&tone, skip, &config) {
                Ok(graph) => graph,
                Err(e) => {
                    warn!(error = %e, frequency = tone.frequency, "Voice graph rejected, dropping tone");
                    continue;
                }
            };

            let id = self.next_id;
            self.next_id += 1;
            let voice = Voice {
                id,
                graph,
                outputs: Vec::new(),
                lead: start.saturating_sub(self.samples) as usize,
                release,
                end,
                state: VoiceState::Active,
            };
            match self.free.pop() {
                Some(slot) => self.voices[slot] = Some(voice),
                None => self.voices.push(Some(voice)),
            }
            self.active += 1;
            debug!(voice = id, start = %tone.start, length = %tone.length, frequency = tone.frequency, "Voice spawned");
        }
    }
}

impl Node for Instrument {
    fn name(&self) -> &'static str {
        "instrument"
    }

    fn prepare(&mut self, config: &EngineConfig) {
        self.config = Some(*config);
        for voice in self.voices.iter_mut().flatten() {
            voice.graph.prepare(config);
        }
    }

    fn render(&mut self, ctx: &RenderContext, _inputs: &[Block], outputs: &mut [Block]) {
        self.drain_commands();

        let out = &mut outputs[0];
        out.resize(ctx.channels, ctx.frames);

        let block_end = self.samples + ctx.frames as u64;
        self.spawn_due(ctx, block_end);

        for slot in 0..self.voices.len() {
            let Some(voice) = self.voices[slot].as_mut() else {
                continue;
            };

            let lead = std::mem::take(&mut voice.lead).min(ctx.frames);
            let voice_ctx = ctx.with_frames(ctx.frames - lead);
            let width = voice.graph.outputs().max(1);
            prepare_outputs(&mut voice.outputs, width, &voice_ctx);
            voice.graph.render(&voice_ctx, &[], &mut voice.outputs);
            out.mix_at(&voice.outputs[0], lead);

            if block_end >= voice.release {
                voice.state = VoiceState::Retiring;
            }
            if block_end >= voice.end || voice.graph.finished() {
                debug!(voice = voice.id, "Voice retired");
                self.voices[slot] = None;
                self.free.push(slot);
                self.active -= 1;
            }
        }

        self.samples = block_end;
    }

    /// Silence every voice, forget the schedule and rewind the clock.
    fn reset(&mut self) {
        self.clear();
        self.samples = 0;
    }

    /// Nothing scheduled, sounding or queued. New tones sent through a
    /// handle make the instrument busy again.
    fn finished(&self) -> bool {
        self.is_idle()
    }
}
