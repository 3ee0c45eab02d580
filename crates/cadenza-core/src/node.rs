//! The block-processing capability shared by every signal node.

use crate::{Block, EngineConfig, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How many input blocks a node accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arity {
    pub min: usize,
    /// `None` means unbounded.
    pub max: Option<usize>,
}

impl Arity {
    pub const NONE: Arity = Arity::exactly(0);

    pub const fn exactly(count: usize) -> Self {
        Self {
            min: count,
            max: Some(count),
        }
    }

    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub const fn between(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    #[inline]
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }

    #[inline]
    pub fn admits_more_than(&self, count: usize) -> bool {
        self.max.map_or(true, |max| count < max)
    }
}

impl Default for Arity {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", max),
            Some(max) => write!(f, "{}..={}", self.min, max),
            None => write!(f, "{}..", self.min),
        }
    }
}

/// Per-block render parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    pub sample_rate: f64,
    pub channels: usize,
    pub frames: usize,
}

impl RenderContext {
    pub fn new(sample_rate: f64, channels: usize, frames: usize) -> Self {
        Self {
            sample_rate,
            channels,
            frames,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.sample_rate, config.channels, config.block_size)
    }

    /// Same rate and channel layout, different block length.
    pub fn with_frames(&self, frames: usize) -> Self {
        Self { frames, ..*self }
    }

    /// Seconds per sample.
    #[inline]
    pub fn sample_period(&self) -> f64 {
        1.0 / self.sample_rate
    }
}

/// A unit of block-based signal processing.
///
/// `render` receives every connected input block and must overwrite each of
/// its `outputs` (the caller sizes them to `ctx.channels` x `ctx.frames` and
/// passes exactly [`Node::outputs`] of them). Rendering never fails: graphs are
/// validated when they are wired, not while they play.
pub trait Node: Send {
    /// Short name used in errors and logs.
    fn name(&self) -> &'static str {
        "node"
    }

    fn inputs(&self) -> Arity {
        Arity::NONE
    }

    fn outputs(&self) -> usize {
        1
    }

    /// Called before the first render and whenever the config changes.
    fn prepare(&mut self, _config: &EngineConfig) {}

    fn render(&mut self, ctx: &RenderContext, inputs: &[Block], outputs: &mut [Block]);

    /// Return to the freshly-prepared state (phase, history, local clock).
    fn reset(&mut self) {}

    /// True once the node will only produce silence from now on.
    fn finished(&self) -> bool {
        false
    }

    /// Check the wiring of any nodes held inside this one.
    fn validate(&mut self) -> Result<()> {
        Ok(())
    }
}

impl fmt::Debug for dyn Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node").field("name", &self.name()).finish()
    }
}

impl<N: Node + ?Sized> Node for Box<N> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn inputs(&self) -> Arity {
        (**self).inputs()
    }

    fn outputs(&self) -> usize {
        (**self).outputs()
    }

    fn prepare(&mut self, config: &EngineConfig) {
        (**self).prepare(config)
    }

    fn render(&mut self, ctx: &RenderContext, inputs: &[Block], outputs: &mut [Block]) {
        (**self).render(ctx, inputs, outputs)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn finished(&self) -> bool {
        (**self).finished()
    }

    fn validate(&mut self) -> Result<()> {
        (**self).validate()
    }
}

/// Size `outputs` for a node about to render under `ctx`.
pub fn prepare_outputs(outputs: &mut Vec<Block>, count: usize, ctx: &RenderContext) {
    outputs.resize_with(count, Block::default);
    for block in outputs.iter_mut() {
        block.resize(ctx.channels, ctx.frames);
    }
}
