//! Envelope applied as a graph node.

use crate::EnvelopeShape;
use cadenza_core::{Arity, Block, Node, RenderContext};

/// Multiplies the mix of its inputs by an envelope, following its own
/// local clock from the first rendered sample.
///
/// With no inputs the envelope itself is emitted, usable as a control signal.
#[derive(Debug, Clone)]
pub struct EnvelopeNode {
    shape: EnvelopeShape,
    samples: u64,
    elapsed: f64,
}

impl EnvelopeNode {
    pub fn new(shape: EnvelopeShape) -> Self {
        Self {
            shape,
            samples: 0,
            elapsed: 0.0,
        }
    }

    pub fn shape(&self) -> &EnvelopeShape {
        &self.shape
    }

    /// Move the local clock `samples` ahead, for a note that started before
    /// its first rendered block.
    pub fn skip(&mut self, samples: u64, sample_rate: f64) {
        self.samples += samples;
        self.elapsed = self.samples as f64 / sample_rate;
    }

    /// Local seconds rendered so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

impl Node for EnvelopeNode {
    fn name(&self) -> &'static str {
        "envelope"
    }

    fn inputs(&self) -> Arity {
        Arity::at_least(0)
    }

    fn render(&mut self, ctx: &RenderContext, inputs: &[Block], outputs: &mut [Block]) {
        let out = &mut outputs[0];
        if inputs.is_empty() {
            out.fill(1.0);
        } else {
            for input in inputs {
                out.mix(input);
            }
        }

        for frame in 0..ctx.frames {
            let t = (self.samples + frame as u64) as f64 / ctx.sample_rate;
            let gain = self.shape.value_at(t) as f32;
            for c in 0..out.channels() {
                out.channel_mut(c)[frame] *= gain;
            }
        }
        self.samples += ctx.frames as u64;
        self.elapsed = self.samples as f64 / ctx.sample_rate;
    }

    fn reset(&mut self) {
        self.samples = 0;
        self.elapsed = 0.0;
    }

    /// Past the last breakpoint with the volume resting at zero.
    fn finished(&self) -> bool {
        self.elapsed > self.shape.end() && self.shape.final_volume() == 0.0
    }
}
