//! Timed callbacks that mutate parameters as the playback clock advances.
//!
//! [`Callback`] wraps another node and, before each block it renders, fires
//! every registration due within that block. Registrations wait in one queue
//! sorted by start time and are taken from its front as the clock passes
//! them, so the per-block cost is proportional to the callbacks that
//! actually fire. A ranged registration keeps firing once per block until
//! its end time.
//!
//! Fired one-shots, expired ranges and cancelled registrations are dropped
//! once the clock reaches them.
//!
//! Time is local to the node: zero at the first rendered sample, or after
//! [`Node::reset`].

use cadenza_core::{Arity, Block, EngineConfig, Node, RenderContext, Timestamp};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

pub type CallbackFn = Box<dyn FnMut(Timestamp) + Send>;

/// Cancels a registration, even after the node has moved into a graph.
#[derive(Debug, Clone)]
pub struct CallbackHandle {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

impl CallbackHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

struct Registration {
    id: u64,
    start: Timestamp,
    end: Option<Timestamp>,
    callback: CallbackFn,
    cancelled: Arc<AtomicBool>,
}

impl Registration {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn fire(&mut self, now: Timestamp) {
        let at = if now < self.start { self.start } else { now };
        (self.callback)(at);
    }
}

pub struct Callback {
    inner: Box<dyn Node>,
    /// Not started yet, sorted by start.
    waiting: VecDeque<Registration>,
    /// Ranged registrations that have started and not yet ended.
    ranged: Vec<Registration>,
    next_id: u64,
    samples: u64,
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("inner", &self.inner.name())
            .field("waiting", &self.waiting.len())
            .field("ranged", &self.ranged.len())
            .finish()
    }
}

impl Callback {
    pub fn new<N: Node + 'static>(inner: N) -> Self {
        Self::from_boxed(Box::new(inner))
    }

    pub fn from_boxed(inner: Box<dyn Node>) -> Self {
        Self {
            inner,
            waiting: VecDeque::new(),
            ranged: Vec::new(),
            next_id: 0,
            samples: 0,
        }
    }

    /// Fire once, in the block containing `at`.
    pub fn register(
        &mut self,
        at: Timestamp,
        callback: impl FnMut(Timestamp) + Send + 'static,
    ) -> CallbackHandle {
        self.insert(at, None, Box::new(callback))
    }

    /// Fire once per block from `start` until the block starting at or after `end`.
    pub fn register_range(
        &mut self,
        start: Timestamp,
        end: Timestamp,
        callback: impl FnMut(Timestamp) + Send + 'static,
    ) -> CallbackHandle {
        self.insert(start, Some(end), Box::new(callback))
    }

    pub fn cancel(&mut self, handle: &CallbackHandle) {
        handle.cancel();
    }

    /// Registrations that have not started yet.
    pub fn pending(&self) -> usize {
        self.waiting.iter().filter(|r| !r.is_cancelled()).count()
    }

    /// Registrations still held, including cancelled ones the clock has not
    /// reached.
    pub fn len(&self) -> usize {
        self.waiting.len() + self.ranged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn inner(&self) -> &dyn Node {
        self.inner.as_ref()
    }

    pub fn inner_mut(&mut self) -> &mut dyn Node {
        self.inner.as_mut()
    }

    /// Node-local time of the next block.
    pub fn position(&self, sample_rate: f64) -> Timestamp {
        Timestamp::from_samples(self.samples, sample_rate)
    }

    fn insert(
        &mut self,
        start: Timestamp,
        end: Option<Timestamp>,
        callback: CallbackFn,
    ) -> CallbackHandle {
        let id = self.next_id;
        self.next_id += 1;
        let cancelled = Arc::new(AtomicBool::new(false));

        // A late registration fires next block.
        let at = self.waiting.partition_point(|r| r.start <= start);
        self.waiting.insert(
            at,
            Registration {
                id,
                start,
                end,
                callback,
                cancelled: cancelled.clone(),
            },
        );
        CallbackHandle { id, cancelled }
    }

    fn fire_due(&mut self, now: Timestamp, block_end: Timestamp) {
        while self.waiting.front().is_some_and(|r| r.start < block_end) {
            let Some(mut registration) = self.waiting.pop_front() else {
                break;
            };
            if registration.is_cancelled() {
                continue;
            }
            match registration.end {
                None => {
                    trace!(id = registration.id, %now, "Callback fired");
                    registration.fire(now);
                }
                Some(_) => self.ranged.push(registration),
            }
        }

        self.ranged.retain_mut(|registration| match registration.end {
            Some(end) if now < end && !registration.is_cancelled() => {
                registration.fire(now);
                true
            }
            _ => false,
        });
    }
}

impl Node for Callback {
    fn name(&self) -> &'static str {
        "callback"
    }

    fn inputs(&self) -> Arity {
        self.inner.inputs()
    }

    fn outputs(&self) -> usize {
        self.inner.outputs()
    }

    fn prepare(&mut self, config: &EngineConfig) {
        self.inner.prepare(config);
    }

    fn render(&mut self, ctx: &RenderContext, inputs: &[Block], outputs: &mut [Block]) {
        let now = Timestamp::from_samples(self.samples, ctx.sample_rate);
        let block_end = Timestamp::from_samples(self.samples + ctx.frames as u64, ctx.sample_rate);
        self.fire_due(now, block_end);
        self.inner.render(ctx, inputs, outputs);
        self.samples += ctx.frames as u64;
    }

    /// Rewind the clock. Ranges in progress wait for their start again;
    /// one-shots that already fired stay gone.
    fn reset(&mut self) {
        self.inner.reset();
        for registration in std::mem::take(&mut self.ranged) {
            let at = self.waiting.partition_point(|r| r.start <= registration.start);
            self.waiting.insert(at, registration);
        }
        self.samples = 0;
    }

    fn finished(&self) -> bool {
        self.inner.finished()
    }

    fn validate(&mut self) -> cadenza_core::Result<()> {
        self.inner.validate()
    }
}
