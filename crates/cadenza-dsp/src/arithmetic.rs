//! Sources and combinators: constants, sums, products, gain, passthrough.

use cadenza_core::{Arity, Block, Node, Param, RenderContext};

/// Emits one value on every channel, e.g. a voice's frequency.
#[derive(Debug, Clone)]
pub struct ConstantValue {
    value: Param,
}

impl ConstantValue {
    pub fn new(value: f64) -> Self {
        Self {
            value: Param::new(value),
        }
    }

    pub fn value(&self) -> Param {
        self.value.clone()
    }
}

impl Node for ConstantValue {
    fn name(&self) -> &'static str {
        "constant"
    }

    fn render(&mut self, _ctx: &RenderContext, _inputs: &[Block], outputs: &mut [Block]) {
        outputs[0].fill(self.value.get() as f32);
    }
}

/// Sums all inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Add;

impl Node for Add {
    fn name(&self) -> &'static str {
        "add"
    }

    fn inputs(&self) -> Arity {
        Arity::at_least(0)
    }

    fn render(&mut self, _ctx: &RenderContext, inputs: &[Block], outputs: &mut [Block]) {
        for input in inputs {
            outputs[0].mix(input);
        }
    }
}

/// Multiplies all inputs sample by sample. With no inputs it is silent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Multiply;

impl Node for Multiply {
    fn name(&self) -> &'static str {
        "multiply"
    }

    fn inputs(&self) -> Arity {
        Arity::at_least(0)
    }

    fn render(&mut self, ctx: &RenderContext, inputs: &[Block], outputs: &mut [Block]) {
        let Some((first, rest)) = inputs.split_first() else {
            return;
        };
        let out = &mut outputs[0];
        for c in 0..ctx.channels {
            let samples = out.channel_mut(c);
            for (f, s) in samples.iter_mut().enumerate() {
                *s = rest
                    .iter()
                    .fold(first.sample(c, f), |acc, input| acc * input.sample(c, f));
            }
        }
    }
}

/// Mixes its inputs and scales the result.
#[derive(Debug, Clone)]
pub struct Gain {
    gain: Param,
}

impl Gain {
    pub fn new(gain: f64) -> Self {
        Self {
            gain: Param::new(gain),
        }
    }

    pub fn gain(&self) -> Param {
        self.gain.clone()
    }
}

impl Node for Gain {
    fn name(&self) -> &'static str {
        "gain"
    }

    fn inputs(&self) -> Arity {
        Arity::at_least(0)
    }

    fn render(&mut self, _ctx: &RenderContext, inputs: &[Block], outputs: &mut [Block]) {
        let out = &mut outputs[0];
        for input in inputs {
            out.mix(input);
        }
        out.scale(self.gain.get() as f32);
    }
}

/// Forwards its single input unchanged; a convenient graph input or output anchor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Node for Passthrough {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn inputs(&self) -> Arity {
        Arity::between(0, 1)
    }

    fn render(&mut self, _ctx: &RenderContext, inputs: &[Block], outputs: &mut [Block]) {
        if let Some(input) = inputs.first() {
            outputs[0].mix(input);
        }
    }
}
