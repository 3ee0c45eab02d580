//! Envelope breakpoints and their resolution against a note length.

use crate::node::EnvelopeNode;
use crate::{Error, Result};
use cadenza_core::Duration;
use serde::{Deserialize, Serialize};

/// One breakpoint.
///
/// Its local time is `whence * length + offset`: `whence = 0` anchors to the
/// note start, `whence = 1` to the note end (usually with a negative or zero
/// offset), and values between interpolate the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopePoint {
    pub whence: f64,
    pub offset: Duration,
    pub volume: f64,
}

impl EnvelopePoint {
    pub fn new(whence: f64, offset: Duration, volume: f64) -> Self {
        Self {
            whence,
            offset,
            volume,
        }
    }

    pub fn from_start(offset: Duration, volume: f64) -> Self {
        Self::new(0.0, offset, volume)
    }

    pub fn from_end(offset: Duration, volume: f64) -> Self {
        Self::new(1.0, offset, volume)
    }

    /// Local time of this point for a note of `length`.
    #[inline]
    pub fn time(&self, length: Duration) -> f64 {
        self.whence * length.seconds() + self.offset.seconds()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    points: Vec<EnvelopePoint>,
}

impl Default for Envelope {
    /// 5 ms linear attack to full volume, held to the note end, then a 5 ms release.
    fn default() -> Self {
        let ramp = Duration::from_millis(5.0);
        Self {
            points: vec![
                EnvelopePoint::from_start(Duration::ZERO, 0.0),
                EnvelopePoint::from_start(ramp, 1.0),
                EnvelopePoint::from_end(Duration::ZERO, 1.0),
                EnvelopePoint::from_end(ramp, 0.0),
            ],
        }
    }
}

impl Envelope {
    pub fn new(points: impl IntoIterator<Item = EnvelopePoint>) -> Result<Self> {
        let points: Vec<EnvelopePoint> = points.into_iter().collect();
        if points.is_empty() {
            return Err(Error::Empty);
        }
        for (index, point) in points.iter().enumerate() {
            let reason = if !(0.0..=1.0).contains(&point.whence) {
                format!("whence {} outside 0..=1", point.whence)
            } else if !point.offset.seconds().is_finite() {
                "offset is not finite".to_string()
            } else if !point.volume.is_finite() {
                "volume is not finite".to_string()
            } else {
                continue;
            };
            return Err(Error::InvalidPoint { index, reason });
        }
        Ok(Self { points })
    }

    /// Volume 1 throughout, with no tail.
    pub fn flat() -> Self {
        Self {
            points: vec![EnvelopePoint::from_start(Duration::ZERO, 1.0)],
        }
    }

    pub fn points(&self) -> &[EnvelopePoint] {
        &self.points
    }

    /// Resolve every point to a local time for a note of `length`.
    pub fn shape(&self, length: Duration) -> EnvelopeShape {
        let mut breakpoints: Vec<(f64, f64)> = self
            .points
            .iter()
            .map(|p| (p.time(length).max(0.0), p.volume))
            .collect();
        // Stable: points landing on the same time keep their declared order.
        breakpoints.sort_by(|a, b| a.0.total_cmp(&b.0));
        EnvelopeShape { breakpoints }
    }

    /// How far the last breakpoint reaches past the note end.
    pub fn tail(&self, length: Duration) -> Duration {
        let end = self
            .points
            .iter()
            .map(|p| p.time(length))
            .fold(f64::NEG_INFINITY, f64::max);
        Duration::from_seconds((end - length.seconds()).max(0.0))
    }

    pub fn value_at(&self, length: Duration, time: Duration) -> f64 {
        self.shape(length).value_at(time.seconds())
    }

    /// An envelope node shaped for a note of `length`.
    pub fn node(&self, length: Duration) -> EnvelopeNode {
        EnvelopeNode::new(self.shape(length))
    }
}

/// An envelope resolved to absolute local times, sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeShape {
    breakpoints: Vec<(f64, f64)>,
}

impl EnvelopeShape {
    /// Volume at local time `t` seconds.
    ///
    /// Holds the first volume before the first breakpoint and the last after
    /// the last; interpolates linearly in between.
    pub fn value_at(&self, t: f64) -> f64 {
        let (Some(&(first_t, first_v)), Some(&(last_t, last_v))) =
            (self.breakpoints.first(), self.breakpoints.last())
        else {
            return 1.0;
        };
        if t < first_t {
            return first_v;
        }
        if t >= last_t {
            return last_v;
        }

        let next = self.breakpoints.partition_point(|&(time, _)| time <= t);
        let (t0, v0) = self.breakpoints[next - 1];
        let (t1, v1) = self.breakpoints[next];
        if t1 <= t0 {
            return v1;
        }
        v0 + (v1 - v0) * (t - t0) / (t1 - t0)
    }

    /// Local time of the last breakpoint.
    pub fn end(&self) -> f64 {
        self.breakpoints.last().map_or(0.0, |&(t, _)| t)
    }

    /// Volume held after the last breakpoint.
    pub fn final_volume(&self) -> f64 {
        self.breakpoints.last().map_or(1.0, |&(_, v)| v)
    }

    pub fn breakpoints(&self) -> &[(f64, f64)] {
        &self.breakpoints
    }
}
