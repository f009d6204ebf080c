//! Centralized error type for the horst umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] horst_core::Error),

    #[error("MIDI: {0}")]
    Midi(#[from] horst_midi::MidiError),

    #[error("Transport: {0}")]
    Transport(#[from] horst_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, Error>;
