//! Centralized error type for the cadenza umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] cadenza_core::Error),

    #[error("DSP: {0}")]
    Dsp(#[from] cadenza_dsp::Error),

    #[error("Automation: {0}")]
    Automation(#[from] cadenza_automation::Error),

    #[error("Synth: {0}")]
    Synth(#[from] cadenza_synth::Error),

    #[error(transparent)]
    Notation(#[from] cadenza_notation::Error),

    #[error("Config: {0}")]
    Config(#[from] toml::de::Error),
}

impl From<cadenza_notation::SyntaxError> for Error {
    fn from(error: cadenza_notation::SyntaxError) -> Self {
        Error::Notation(error.into())
    }
}

impl From<cadenza_notation::ResolutionError> for Error {
    fn from(error: cadenza_notation::ResolutionError) -> Self {
        Error::Notation(error.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
