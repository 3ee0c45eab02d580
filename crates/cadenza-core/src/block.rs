//! Planar multichannel sample blocks.

/// One block of planar `f32` audio: `channels` runs of `frames` samples.
///
/// Resizing keeps the allocation, so a block reused across renders stops
/// allocating once it has reached its largest size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    data: Vec<f32>,
    channels: usize,
    frames: usize,
}

impl Block {
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            data: vec![0.0; channels * frames],
            channels,
            frames,
        }
    }

    /// A block holding one constant value on every channel.
    pub fn filled(channels: usize, frames: usize, value: f32) -> Self {
        Self {
            data: vec![value; channels * frames],
            channels,
            frames,
        }
    }

    /// Build a block from per-channel sample vectors of equal length.
    pub fn from_channels(channels: &[Vec<f32>]) -> Self {
        let frames = channels.first().map(Vec::len).unwrap_or(0);
        let mut block = Self::new(channels.len(), frames);
        for (c, samples) in channels.iter().enumerate() {
            let len = samples.len().min(frames);
            block.channel_mut(c)[..len].copy_from_slice(&samples[..len]);
        }
        block
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reshape and zero the block.
    pub fn resize(&mut self, channels: usize, frames: usize) {
        self.channels = channels;
        self.frames = frames;
        self.data.clear();
        self.data.resize(channels * frames, 0.0);
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    #[inline]
    pub fn channel(&self, channel: usize) -> &[f32] {
        let start = channel * self.frames;
        &self.data[start..start + self.frames]
    }

    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let start = channel * self.frames;
        &mut self.data[start..start + self.frames]
    }

    /// Sample lookup that broadcasts mono blocks to any channel and reads
    /// silence past the end.
    #[inline]
    pub fn sample(&self, channel: usize, frame: usize) -> f32 {
        if self.channels == 0 || frame >= self.frames {
            return 0.0;
        }
        let channel = if channel < self.channels { channel } else { 0 };
        self.data[channel * self.frames + frame]
    }

    /// Write the same value to every channel at `frame`.
    #[inline]
    pub fn set_frame(&mut self, frame: usize, value: f32) {
        for c in 0..self.channels {
            self.data[c * self.frames + frame] = value;
        }
    }

    pub fn copy_from(&mut self, other: &Block) {
        self.channels = other.channels;
        self.frames = other.frames;
        self.data.clear();
        self.data.extend_from_slice(&other.data);
    }

    /// Additively mix `other` into this block, broadcasting mono sources.
    pub fn mix(&mut self, other: &Block) {
        let frames = self.frames.min(other.frames);
        for c in 0..self.channels {
            let start = c * self.frames;
            for (f, out) in self.data[start..start + frames].iter_mut().enumerate() {
                *out += other.sample(c, f);
            }
        }
    }

    /// Mix `other` into this block starting at frame `offset`.
    pub fn mix_at(&mut self, other: &Block, offset: usize) {
        if offset >= self.frames {
            return;
        }
        let frames = (self.frames - offset).min(other.frames);
        for c in 0..self.channels {
            let start = c * self.frames + offset;
            for (f, out) in self.data[start..start + frames].iter_mut().enumerate() {
                *out += other.sample(c, f);
            }
        }
    }

    pub fn scale(&mut self, gain: f32) {
        for s in &mut self.data {
            *s *= gain;
        }
    }

    pub fn peak(&self) -> f32 {
        self.data.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    pub fn is_silent(&self, threshold: f32) -> bool {
        self.peak() <= threshold
    }

    /// Append the block to `out` as interleaved frames.
    pub fn interleave_into(&self, out: &mut Vec<f32>) {
        out.reserve(self.data.len());
        for f in 0..self.frames {
            for c in 0..self.channels {
                out.push(self.data[c * self.frames + f]);
            }
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_zeroes() {
        let mut block = Block::filled(2, 4, 1.0);
        block.resize(1, 3);
        assert_eq!(block.channels(), 1);
        assert_eq!(block.frames(), 3);
        assert!(block.as_slice().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_mix_broadcasts_mono() {
        let mut stereo = Block::filled(2, 3, 0.5);
        let mono = Block::filled(1, 3, 0.25);
        stereo.mix(&mono);
        assert_eq!(stereo.channel(0), &[0.75, 0.75, 0.75]);
        assert_eq!(stereo.channel(1), &[0.75, 0.75, 0.75]);
    }

    #[test]
    fn test_mix_at_offset() {
        let mut out = Block::new(1, 4);
        out.mix_at(&Block::filled(1, 4, 1.0), 2);
        assert_eq!(out.channel(0), &[0.0, 0.0, 1.0, 1.0]);
        out.mix_at(&Block::filled(1, 4, 1.0), 4);
        assert_eq!(out.channel(0), &[0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_interleave() {
        let block = Block::from_channels(&[vec![1.0, 2.0], vec![-1.0, -2.0]]);
        let mut out = Vec::new();
        block.interleave_into(&mut out);
        assert_eq!(out, vec![1.0, -1.0, 2.0, -2.0]);
    }

    #[test]
    fn test_sample_out_of_range_is_silent() {
        let block = Block::filled(1, 2, 0.5);
        assert_eq!(block.sample(3, 1), 0.5);
        assert_eq!(block.sample(0, 5), 0.0);
    }
}
