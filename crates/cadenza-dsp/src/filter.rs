//! Rolling-average low-pass filter.

use crate::{Error, Result};
use cadenza_core::{Arity, Block, EngineConfig, Node, Param, RenderContext};

/// Averages the last `sample_rate / frequency` samples of its input.
///
/// Any component whose period divides the window cancels completely.
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    frequency: Param,
    sample_rate: f64,
    window: usize,
    history: Vec<Window>,
}

#[derive(Debug, Clone, Default)]
struct Window {
    samples: Vec<f32>,
    cursor: usize,
    sum: f64,
}

impl Window {
    fn with_len(len: usize) -> Self {
        Self {
            samples: vec![0.0; len],
            cursor: 0,
            sum: 0.0,
        }
    }

    #[inline]
    fn push(&mut self, sample: f32) -> f32 {
        let len = self.samples.len();
        self.sum += sample as f64 - self.samples[self.cursor] as f64;
        self.samples[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % len;
        (self.sum / len as f64) as f32
    }
}

impl LowPassFilter {
    pub fn new(frequency_hz: f64) -> Result<Self> {
        if !(frequency_hz.is_finite() && frequency_hz > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "cutoff must be positive, got {}",
                frequency_hz
            )));
        }
        Ok(Self {
            frequency: Param::new(frequency_hz),
            sample_rate: 0.0,
            window: 0,
            history: Vec::new(),
        })
    }

    pub fn frequency(&self) -> Param {
        self.frequency.clone()
    }

    /// Current averaging window in samples.
    pub fn window(&self) -> usize {
        self.window
    }

    fn window_for(&self, sample_rate: f64) -> usize {
        let frequency = self.frequency.get();
        if frequency > 0.0 {
            ((sample_rate / frequency).round() as usize).max(1)
        } else {
            1
        }
    }

    fn configure(&mut self, sample_rate: f64, channels: usize) {
        self.sample_rate = sample_rate;
        self.window = self.window_for(sample_rate);
        self.history = vec![Window::with_len(self.window); channels];
    }
}

impl Node for LowPassFilter {
    fn name(&self) -> &'static str {
        "low-pass"
    }

    fn inputs(&self) -> Arity {
        Arity::between(0, 1)
    }

    fn prepare(&mut self, config: &EngineConfig) {
        self.configure(config.sample_rate, config.channels);
    }

    fn render(&mut self, ctx: &RenderContext, inputs: &[Block], outputs: &mut [Block]) {
        if self.sample_rate != ctx.sample_rate
            || self.history.len() != ctx.channels
            || self.window_for(ctx.sample_rate) != self.window
        {
            self.configure(ctx.sample_rate, ctx.channels);
        }
        let input = inputs.first();
        let out = &mut outputs[0];
        for (c, history) in self.history.iter_mut().enumerate() {
            for (f, s) in out.channel_mut(c).iter_mut().enumerate() {
                *s = history.push(input.map_or(0.0, |block| block.sample(c, f)));
            }
        }
    }

    fn reset(&mut self) {
        let channels = self.history.len();
        self.history = vec![Window::with_len(self.window.max(1)); channels];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rejects_non_positive_cutoff() {
        assert!(LowPassFilter::new(0.0).is_err());
        assert!(LowPassFilter::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_cancels_period_matching_window() {
        // 250 Hz cutoff at 1 kHz: window of 4 samples, so a 4-sample square cancels.
        let mut filter = LowPassFilter::new(250.0).unwrap();
        let ctx = RenderContext::new(1000.0, 1, 8);
        let square = Block::from_channels(&[vec![1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0]]);
        let mut outputs = vec![Block::new(1, 8)];
        filter.render(&ctx, &[square], &mut outputs);

        assert_eq!(filter.window(), 4);
        let out = outputs[0].channel(0);
        assert_abs_diff_eq!(out[0], 0.25);
        assert_abs_diff_eq!(out[1], 0.5);
        for &s in &out[3..] {
            assert_abs_diff_eq!(s, 0.0);
        }
    }

    #[test]
    fn test_passes_dc() {
        let mut filter = LowPassFilter::new(100.0).unwrap();
        let ctx = RenderContext::new(1000.0, 2, 16);
        let mut outputs = vec![Block::new(2, 16)];
        filter.render(&ctx, &[Block::filled(2, 16, 0.8)], &mut outputs);
        assert_abs_diff_eq!(outputs[0].channel(1)[15], 0.8, epsilon = 1e-6);
    }
}
