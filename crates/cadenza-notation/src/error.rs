//! Error types for cadenza-notation.

use cadenza_core::Beat;
use std::fmt;
use thiserror::Error;

/// Result type alias for cadenza-notation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A location in notation source. `line` and `column` are 1-based and count
/// characters, `offset` is the byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Locate byte `offset` within `source`.
    pub fn locate(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        Self {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Malformed notation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Syntax error at {position}: expected {}, found {found}", expected.join(" or "))]
pub struct SyntaxError {
    pub position: Position,
    pub expected: Vec<&'static str>,
    /// What was there instead, quoted, or `end of input`.
    pub found: String,
}

/// Well-formed notation that cannot be turned into tones.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    #[error("Scale degree {degree} is out of range for a scale of {size} pitches")]
    DegreeOutOfRange { degree: u32, size: usize },

    #[error("Mode {mode} is out of range for a scale of {size} pitches")]
    ModeOutOfRange { mode: u32, size: usize },

    #[error("Scale degree {degree} used with no scale in scope")]
    NoScale { degree: u32 },

    #[error("Scale declaration has no pitches")]
    EmptyScale,

    #[error("Beat positions past {beat} do not fit in an exact fraction")]
    BeatOverflow { beat: Beat },

    #[error("Cannot place beat {beat}: {source}")]
    Tempo {
        beat: Beat,
        #[source]
        source: cadenza_core::Error,
    },
}

/// Errors that can occur in cadenza-notation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}
