//! Signal nodes for the cadenza graph: periodic oscillators, arithmetic
//! combinators, detune, delay, a rolling low-pass filter, and the timed
//! callback wrapper. Every tweakable value is a lock-free [`Param`].
//!
//! [`Param`]: cadenza_core::Param

mod error;
pub use error::{Error, Result};

mod oscillator;
pub use oscillator::{Oscillator, Waveform};

mod arithmetic;
pub use arithmetic::{Add, ConstantValue, Gain, Multiply, Passthrough};

mod detune;
pub use detune::Detune;

mod delay;
pub use delay::Delay;

mod filter;
pub use filter::LowPassFilter;

mod callback;
pub use callback::{Callback, CallbackHandle};
