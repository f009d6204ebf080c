//! Error types for horst-core.

use thiserror::Error;

/// Error type for plugin host operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("Failed to instantiate {uri}: {reason}")]
    InstantiationFailed { uri: String, reason: String },

    #[error("Failed to spawn worker thread")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("Port index {index} out of bounds (plugin has {count} ports)")]
    PortOutOfRange { index: usize, count: usize },

    #[error("URID {0} was never mapped")]
    UridOutOfRange(u32),

    #[error("Plugin is not instantiated")]
    NotInstantiated,

    #[error("Power of two block length required, got {0}")]
    NonPowerOfTwoBlockLength(usize),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
