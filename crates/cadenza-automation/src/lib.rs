//! Note-anchored envelopes.
//!
//! An [`Envelope`] is a list of breakpoints, each anchored to the start
//! (`whence = 0`) or end (`whence = 1`) of a note plus a time offset. Given a
//! note length it resolves to an [`EnvelopeShape`]: absolute local times with
//! linear interpolation between them. [`EnvelopeNode`] applies a shape to its
//! inputs sample by sample.
//!
//! # Example
//!
//! ```ignore
//! use cadenza_automation::{Envelope, EnvelopePoint};
//! use cadenza_core::Duration;
//!
//! let envelope = Envelope::new([
//!     EnvelopePoint::from_start(Duration::ZERO, 0.0),
//!     EnvelopePoint::from_start(Duration::from_millis(100.0), 1.0),
//!     EnvelopePoint::from_end(Duration::from_millis(-50.0), 0.5),
//!     EnvelopePoint::from_end(Duration::ZERO, 0.0),
//! ])?;
//! let node = envelope.node(Duration::from_seconds(1.0));
//! ```

mod error;
pub use error::{Error, Result};

mod envelope;
pub use envelope::{Envelope, EnvelopePoint, EnvelopeShape};

mod node;
pub use node::EnvelopeNode;
