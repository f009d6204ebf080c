//! Error types for the transport adapter.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open transport client {name}: {reason}")]
    ClientOpen { name: String, reason: String },

    #[error("Failed to register port {name}: {reason}")]
    PortRegistration { name: String, reason: String },

    #[error("Failed to connect \"{source_port}\" -> \"{destination}\": {reason}")]
    Connection {
        source_port: String,
        destination: String,
        reason: String,
    },

    #[error("Failed to disconnect \"{source_port}\" -> \"{destination}\": {reason}")]
    Disconnection {
        source_port: String,
        destination: String,
        reason: String,
    },

    #[error("Reinstantiation at {sample_rate} Hz / {buffer_size} frames failed")]
    Reconfiguration {
        sample_rate: f64,
        buffer_size: usize,
        #[source]
        source: horst_core::Error,
    },

    #[error(transparent)]
    Core(#[from] horst_core::Error),

    #[error(transparent)]
    Midi(#[from] horst_midi::MidiError),
}

pub type Result<T> = std::result::Result<T, TransportError>;
