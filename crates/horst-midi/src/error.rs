use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiError {
    #[error("MIDI channel {0} out of range (0-15)")]
    InvalidChannel(u8),

    #[error("MIDI controller {0} out of range (0-127)")]
    InvalidController(u8),
}

pub type Result<T> = core::result::Result<T, MidiError>;
