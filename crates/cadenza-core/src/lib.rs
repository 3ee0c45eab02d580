//! Block-based audio graph runtime and musical transport.
//!
//! # Primary API
//!
//! - [`Node`]: the block-processing capability every signal unit implements
//! - [`Graph`]: a directed graph of nodes, itself usable as a node
//! - [`Block`]: planar multichannel sample buffers
//! - [`Metronome`]: beat to wall-clock conversion from [`TempoInstruction`]s
//! - [`Param`]: lock-free parameter cells shared with control code
//!
//! # Example
//!
//! ```ignore
//! use cadenza_core::prelude::*;
//!
//! let mut graph = Graph::new();
//! let osc = graph.add(my_oscillator);
//! graph.set_output(Some(osc))?;
//! graph.validate()?;
//! graph.prepare(&EngineConfig::default());
//! ```

pub mod error;
pub use error::{Error, Result};

mod block;
pub use block::Block;

mod config;
pub use config::EngineConfig;

pub mod graph;
pub use graph::{Graph, Input, NodeIndex};

mod node;
pub use node::{prepare_outputs, Arity, Node, RenderContext};

mod param;
pub use param::Param;

pub mod time;
pub use time::{Duration, Timestamp};

pub mod transport;
pub use transport::{Beat, Metronome, TempoInstruction};

pub mod prelude {
    pub use crate::{
        Arity, Beat, Block, Duration, EngineConfig, Graph, Metronome, Node, NodeIndex, Param,
        RenderContext, TempoInstruction, Timestamp,
    };
}
