//! Fixed sample delay line.

use crate::{Error, Result};
use cadenza_core::{Arity, Block, Duration, EngineConfig, Node, RenderContext};

/// Delays its input by a fixed time, rounded to whole samples.
#[derive(Debug, Clone)]
pub struct Delay {
    delay: Duration,
    samples: usize,
    sample_rate: f64,
    // One ring per channel, each `samples` long.
    lines: Vec<Vec<f32>>,
    cursor: usize,
}

impl Delay {
    pub fn new(delay: Duration) -> Result<Self> {
        if delay.is_negative() || !delay.seconds().is_finite() {
            return Err(Error::InvalidParameter(format!(
                "delay must be non-negative, got {}",
                delay
            )));
        }
        Ok(Self {
            delay,
            samples: 0,
            sample_rate: 0.0,
            lines: Vec::new(),
            cursor: 0,
        })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Delay length in samples at the current sample rate.
    pub fn delay_samples(&self) -> usize {
        self.samples
    }

    fn configure(&mut self, sample_rate: f64, channels: usize) {
        self.sample_rate = sample_rate;
        self.samples = self.delay.to_samples(sample_rate) as usize;
        self.lines = vec![vec![0.0; self.samples]; channels];
        self.cursor = 0;
    }
}

impl Node for Delay {
    fn name(&self) -> &'static str {
        "delay"
    }

    fn inputs(&self) -> Arity {
        Arity::between(0, 1)
    }

    fn prepare(&mut self, config: &EngineConfig) {
        self.configure(config.sample_rate, config.channels);
    }

    fn render(&mut self, ctx: &RenderContext, inputs: &[Block], outputs: &mut [Block]) {
        if self.sample_rate != ctx.sample_rate || self.lines.len() != ctx.channels {
            self.configure(ctx.sample_rate, ctx.channels);
        }
        let out = &mut outputs[0];
        let input = inputs.first();

        if self.samples == 0 {
            if let Some(input) = input {
                out.mix(input);
            }
            return;
        }

        let start = self.cursor;
        for (c, line) in self.lines.iter_mut().enumerate() {
            let mut cursor = start;
            for (f, s) in out.channel_mut(c).iter_mut().enumerate() {
                *s = line[cursor];
                line[cursor] = input.map_or(0.0, |block| block.sample(c, f));
                cursor = (cursor + 1) % self.samples;
            }
        }
        self.cursor = (start + ctx.frames) % self.samples;
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.fill(0.0);
        }
        self.cursor = 0;
    }
}
