//! Tolerance constants for audio testing.
//!
//! Different operations require different precision levels.

/// Floating point rounding errors (for passthrough, exact gain).
/// Use for operations that should be mathematically exact.
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Frequencies of a few hundred Hz carried through f32 blocks.
pub const FREQUENCY_EPSILON: f32 = 1e-3;

/// DSP processing tolerance (oscillators may have slight variations).
pub const DSP_EPSILON: f32 = 1e-4;

/// Silence threshold (~-80dB).
/// Values below this are considered silent.
pub const SILENCE_THRESHOLD: f32 = 0.0001;

/// Reference frequencies under A440.
pub const B3: f32 = 246.941_65;
pub const C4: f32 = 261.625_57;
pub const E4: f32 = 329.627_56;
pub const G4: f32 = 391.995_42;
pub const A4: f32 = 440.0;
pub const C5: f32 = 523.251_1;
pub const E5: f32 = 659.255_1;
pub const G5: f32 = 783.990_9;
