//! Frequency detune, in octaves.

use cadenza_core::{Arity, Block, Node, Param, RenderContext};

/// Scales a frequency signal by `2^detune`.
///
/// Sits between a frequency source and an oscillator: `0` leaves the pitch
/// alone, `1` raises it an octave, `-1/12` lowers it a semitone. With no input
/// it detunes its own `frequency` parameter instead.
#[derive(Debug, Clone)]
pub struct Detune {
    detune: Param,
    frequency: Param,
    // Cached 2^detune, recomputed only when the parameter moves.
    last_detune: f64,
    ratio: f64,
}

impl Detune {
    pub fn new(detune: f64) -> Self {
        Self {
            detune: Param::new(detune),
            frequency: Param::new(0.0),
            last_detune: detune,
            ratio: detune.exp2(),
        }
    }

    pub fn with_frequency(detune: f64, frequency_hz: f64) -> Self {
        let node = Self::new(detune);
        node.frequency.set(frequency_hz);
        node
    }

    pub fn detune(&self) -> Param {
        self.detune.clone()
    }

    pub fn frequency(&self) -> Param {
        self.frequency.clone()
    }

    fn ratio(&mut self) -> f64 {
        let detune = self.detune.get();
        if detune != self.last_detune {
            self.last_detune = detune;
            self.ratio = detune.exp2();
        }
        self.ratio
    }
}

impl Node for Detune {
    fn name(&self) -> &'static str {
        "detune"
    }

    fn inputs(&self) -> Arity {
        Arity::between(0, 1)
    }

    fn render(&mut self, ctx: &RenderContext, inputs: &[Block], outputs: &mut [Block]) {
        let ratio = self.ratio();
        let out = &mut outputs[0];
        match inputs.first() {
            Some(input) => {
                for c in 0..ctx.channels {
                    for (f, s) in out.channel_mut(c).iter_mut().enumerate() {
                        *s = (input.sample(c, f) as f64 * ratio) as f32;
                    }
                }
            }
            None => out.fill((self.frequency.get() * ratio) as f32),
        }
    }
}
