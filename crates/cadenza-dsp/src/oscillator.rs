//! Periodic oscillators.
//!
//! The oscillator's frequency comes from its first input when one is
//! connected (read from channel 0, per sample), otherwise from its
//! `frequency` parameter. This lets a voice drive pitch from a
//! [`ConstantValue`](crate::ConstantValue) or any frequency-modulating chain.

use cadenza_core::{Arity, Block, Node, Param, RenderContext};
use std::f64::consts::TAU;
use std::fmt;

/// Shape of one period, evaluated at a phase in `[0, 1)`.
#[derive(Clone, Copy, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Triangle,
    Sawtooth,
    /// Any periodic function of phase.
    Custom(fn(f64) -> f64),
}

impl Waveform {
    #[inline]
    pub fn evaluate(&self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (phase * TAU).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            // Starts at 0 and rises, peaking at a quarter period.
            Waveform::Triangle => ((((phase - 0.25).abs() - 0.5).abs()) - 0.25) * 4.0,
            Waveform::Sawtooth => phase * 2.0 - 1.0,
            Waveform::Custom(f) => f(phase),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Triangle => "triangle",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug)]
pub struct Oscillator {
    waveform: Waveform,
    frequency: Param,
    phase: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency_hz: f64) -> Self {
        Self {
            waveform,
            frequency: Param::new(frequency_hz),
            phase: 0.0,
        }
    }

    pub fn sine(frequency_hz: f64) -> Self {
        Self::new(Waveform::Sine, frequency_hz)
    }

    pub fn square(frequency_hz: f64) -> Self {
        Self::new(Waveform::Square, frequency_hz)
    }

    pub fn triangle(frequency_hz: f64) -> Self {
        Self::new(Waveform::Triangle, frequency_hz)
    }

    pub fn sawtooth(frequency_hz: f64) -> Self {
        Self::new(Waveform::Sawtooth, frequency_hz)
    }

    pub fn custom(shape: fn(f64) -> f64, frequency_hz: f64) -> Self {
        Self::new(Waveform::Custom(shape), frequency_hz)
    }

    /// Frequency used while no input is connected.
    pub fn frequency(&self) -> Param {
        self.frequency.clone()
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }
}

impl Node for Oscillator {
    fn name(&self) -> &'static str {
        self.waveform.name()
    }

    fn inputs(&self) -> Arity {
        Arity::between(0, 1)
    }

    fn render(&mut self, ctx: &RenderContext, inputs: &[Block], outputs: &mut [Block]) {
        let period = ctx.sample_period();
        let fixed = self.frequency.get();
        let out = &mut outputs[0];

        for frame in 0..ctx.frames {
            let hz = inputs
                .first()
                .map_or(fixed, |input| input.sample(0, frame) as f64);
            out.set_frame(frame, self.waveform.evaluate(self.phase) as f32);
            self.phase = (self.phase + hz * period).rem_euclid(1.0);
        }
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn render(osc: &mut Oscillator, inputs: &[Block], frames: usize) -> Block {
        let ctx = RenderContext::new(8.0, 1, frames);
        let mut outputs = vec![Block::new(1, frames)];
        osc.render(&ctx, inputs, &mut outputs);
        outputs.pop().unwrap()
    }

    #[test]
    fn test_triangle_shape() {
        let shape = Waveform::Triangle;
        assert_abs_diff_eq!(shape.evaluate(0.0), 0.0);
        assert_abs_diff_eq!(shape.evaluate(0.25), 1.0);
        assert_abs_diff_eq!(shape.evaluate(0.5), 0.0);
        assert_abs_diff_eq!(shape.evaluate(0.75), -1.0);
        assert_abs_diff_eq!(shape.evaluate(0.125), 0.5);
    }

    #[test]
    fn test_square_toggles_each_half_period() {
        // 1 Hz at 8 Hz sample rate: four high samples then four low.
        let mut osc = Oscillator::square(1.0);
        let out = render(&mut osc, &[], 8);
        assert_eq!(out.channel(0), &[1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0]);
    }

    #[test]
    fn test_sine_quarter_period() {
        let mut osc = Oscillator::sine(2.0);
        let out = render(&mut osc, &[], 4);
        assert_abs_diff_eq!(out.channel(0)[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out.channel(0)[1], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out.channel(0)[3], -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_input_overrides_parameter() {
        let mut osc = Oscillator::sawtooth(0.0);
        let freq = Block::filled(1, 4, 2.0);
        let out = render(&mut osc, &[freq], 4);
        assert_eq!(out.channel(0), &[-1.0, -0.5, 0.0, 0.5]);
    }

    #[test]
    fn test_parameter_and_reset() {
        let mut osc = Oscillator::sawtooth(1.0);
        osc.frequency().set(2.0);
        render(&mut osc, &[], 3);
        assert_abs_diff_eq!(osc.phase(), 0.75);
        osc.reset();
        assert_eq!(osc.phase(), 0.0);
    }
}
