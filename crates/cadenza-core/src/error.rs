//! Error types for cadenza-core.

use crate::graph::NodeIndex;
use crate::node::Arity;
use thiserror::Error;

/// Error type for cadenza-core operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Connecting the two nodes would make the graph cyclic.
    #[error("Connecting {from} -> {to} would create a cycle")]
    Cycle { from: NodeIndex, to: NodeIndex },

    /// A node received more (or fewer) inputs than it accepts.
    #[error("Node {node} ({name}) accepts {expected} inputs, found {found}")]
    Arity {
        node: NodeIndex,
        name: &'static str,
        expected: Arity,
        found: usize,
    },

    #[error("Node {node} has {outputs} outputs, port {port} does not exist")]
    PortOutOfRange {
        node: NodeIndex,
        port: usize,
        outputs: usize,
    },

    #[error("Illegal node index: {0}")]
    IllegalIndex(NodeIndex),

    #[error("Invalid tempo: {0}. Must be positive and finite")]
    InvalidTempo(f64),

    #[error("Invalid beat: {0}")]
    InvalidBeat(String),

    /// Beats cannot be resolved until an instruction defines the tempo at beat 0.
    #[error("No tempo instruction at beat 0")]
    MissingDownbeat,
}

impl Error {
    /// True for the errors raised while wiring a graph.
    pub fn is_graph_error(&self) -> bool {
        matches!(
            self,
            Error::Cycle { .. }
                | Error::Arity { .. }
                | Error::PortOutOfRange { .. }
                | Error::IllegalIndex(_)
        )
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
