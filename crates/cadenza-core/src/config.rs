//! Render configuration shared by every node in a session.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Sample rate, channel count and block size for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: f64,
    pub channels: usize,
    /// Frames per rendered block.
    pub block_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            channels: 2,
            block_size: 512,
        }
    }
}

impl EngineConfig {
    pub const MAX_CHANNELS: usize = 64;
    pub const MAX_BLOCK_SIZE: usize = 8192;

    pub fn new(sample_rate: f64, channels: usize, block_size: usize) -> Self {
        Self {
            sample_rate,
            channels,
            block_size,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(8000.0..=384000.0).contains(&self.sample_rate) {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if self.channels == 0 || self.channels > Self::MAX_CHANNELS {
            return Err(Error::InvalidConfig(format!(
                "channels {} out of range (1-{})",
                self.channels,
                Self::MAX_CHANNELS
            )));
        }
        if self.block_size == 0 || self.block_size > Self::MAX_BLOCK_SIZE {
            return Err(Error::InvalidConfig(format!(
                "block_size {} out of range (1-{})",
                self.block_size,
                Self::MAX_BLOCK_SIZE
            )));
        }
        Ok(())
    }

    /// Length of one block in seconds.
    #[inline]
    pub fn block_seconds(&self) -> f64 {
        self.block_size as f64 / self.sample_rate
    }
}
