//! Error types for cadenza-synth.

use thiserror::Error;

/// Result type alias for cadenza-synth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cadenza-synth.
#[derive(Debug, Error)]
pub enum Error {
    /// The instrument behind a handle has been dropped.
    #[error("Instrument control queue disconnected")]
    Disconnected,

    #[error("Invalid envelope: {0}")]
    Envelope(#[from] cadenza_automation::Error),

    #[error("Invalid pitch: {0}")]
    InvalidPitch(String),
}
