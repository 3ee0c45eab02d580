//! Control surface for an instrument owned by the render thread.

use crate::{Error, Result, Tone};
use crossbeam_channel::Sender;

/// A change queued for the instrument, applied at the next block boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddTone(Tone),
    /// Drop every scheduled and sounding voice.
    Clear,
}

/// Cloneable, `Send` handle feeding an [`Instrument`](crate::Instrument).
///
/// Commands sent before a render call are applied before that block is
/// produced, in the order they were sent.
#[derive(Debug, Clone)]
pub struct InstrumentHandle {
    sender: Sender<Command>,
}

impl InstrumentHandle {
    pub(crate) fn new(sender: Sender<Command>) -> Self {
        Self { sender }
    }

    pub fn send(&self, command: Command) -> Result<()> {
        self.sender.send(command).map_err(|_| Error::Disconnected)
    }

    pub fn add_tone(&self, tone: Tone) -> Result<()> {
        self.send(Command::AddTone(tone))
    }

    pub fn clear(&self) -> Result<()> {
        self.send(Command::Clear)
    }
}
