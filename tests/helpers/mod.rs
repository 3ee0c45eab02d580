//! Test helpers and fixtures for cadenza integration tests
//!
//! Sessions here render offline, block by block, so every test is
//! deterministic and needs no audio device.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (passthrough, unity gain)
//! - `FREQUENCY_EPSILON` (1e-3): Frequencies carried through f32 blocks
//! - `SILENCE_THRESHOLD` (0.0001): Silence detection (-80dB)

#![allow(dead_code)]

pub mod tolerances;

use cadenza::prelude::*;
use cadenza::Passthrough;

/// Default test sample rate (matches common hardware)
pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// Standard buffer size for deterministic testing
pub const TEST_BUFFER_SIZE: usize = 512;

/// Low rate for frequency sessions: one beat at 60 bpm is 8000 samples.
pub const FREQUENCY_SAMPLE_RATE: f64 = 8000.0;

/// Frequency session block size; 80 blocks per beat at 60 bpm.
pub const FREQUENCY_BLOCK_SIZE: usize = 100;

/// Give up rendering after this many blocks.
pub const MAX_BLOCKS: usize = 100_000;

/// An instrument whose voices output their own frequency as a constant.
///
/// With a flat envelope the rendered signal is the sum of the frequencies
/// sounding at each sample, which makes scheduling visible sample by sample.
pub fn frequency_instrument() -> Instrument {
    Instrument::from_frequency(|_| Box::new(Passthrough)).with_envelope(Envelope::flat())
}

/// Mono 8 kHz session at 60 bpm driven by [`frequency_instrument`].
pub fn frequency_session(notation: &str) -> Session {
    Session::builder()
        .sample_rate(FREQUENCY_SAMPLE_RATE)
        .channels(1)
        .block_size(FREQUENCY_BLOCK_SIZE)
        .tempo(Beat::ZERO, 60.0)
        .notation(notation)
        .build(frequency_instrument())
        .expect("Failed to build frequency session")
}

/// Mono session playing sine voices at the test sample rate.
pub fn sine_session(notation: &str, bpm: f64) -> Session {
    Session::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .channels(1)
        .block_size(TEST_BUFFER_SIZE)
        .tempo(Beat::ZERO, bpm)
        .notation(notation)
        .build(Instrument::from_frequency(|hz| Box::new(Oscillator::sine(hz))))
        .expect("Failed to build sine session")
}

/// Send `tracing` output through the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Render channel 0 until the session reports it is finished.
pub fn render_to_end(session: &mut Session) -> Vec<f32> {
    let mut samples = Vec::new();
    for _ in 0..MAX_BLOCKS {
        if session.is_finished() {
            return samples;
        }
        samples.extend_from_slice(session.render_block().channel(0));
    }
    panic!("Session still playing after {} blocks", MAX_BLOCKS);
}

/// Render exactly `blocks` blocks of channel 0.
pub fn render_blocks(session: &mut Session, blocks: usize) -> Vec<f32> {
    let mut samples = Vec::new();
    for _ in 0..blocks {
        samples.extend_from_slice(session.render_block().channel(0));
    }
    samples
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Rough frequency estimate from upward zero crossings.
pub fn estimate_frequency(samples: &[f32], sample_rate: f64) -> f64 {
    let crossings = samples
        .windows(2)
        .filter(|pair| pair[0] < 0.0 && pair[1] >= 0.0)
        .count();
    crossings as f64 * sample_rate / samples.len() as f64
}

/// Assert that a signal is approximately silent (all values near zero).
pub fn assert_silence(samples: &[f32], tolerance: f32) {
    let max = peak(samples);
    assert!(
        max <= tolerance,
        "Expected silence, but peak amplitude was {}",
        max
    );
}

/// Assert that a signal has content (not silent).
pub fn assert_has_audio(samples: &[f32], min_rms: f32) {
    let r = rms(samples);
    assert!(
        r >= min_rms,
        "Expected audio content with RMS >= {}, but RMS was {}",
        min_rms,
        r
    );
}

/// Assert every sample in `range` equals `expected` within `tolerance`.
pub fn assert_constant(
    samples: &[f32],
    range: std::ops::Range<usize>,
    expected: f32,
    tolerance: f32,
) {
    for i in range {
        assert!(
            (samples[i] - expected).abs() <= tolerance,
            "Sample {}: expected {}, got {}",
            i,
            expected,
            samples[i]
        );
    }
}
