//! Error types for cadenza-automation.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Envelope needs at least one point")]
    Empty,

    #[error("Invalid envelope point {index}: {reason}")]
    InvalidPoint { index: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
