//! Real-time transport adapter for horst.
//!
//! [`TransportAdapter`] wires a [`horst_core::Horst`] onto a transport client:
//! it registers ports, binds buffers each cycle, applies MIDI control changes
//! with sample accuracy, and handles bypass, monitoring and reinstantiation.
//! [`PluginControls`] is the lock-free control plane other threads use.

pub mod adapter;
pub mod client;
pub mod config;
pub mod connection;
pub mod controls;
pub mod error;
mod reconfigure;

pub use adapter::{TransportAdapter, MIDI_INPUT_PORT};
pub use client::{PortDirection, PortId, PortKind, ProcessScope, Transport, TransportClient};
pub use config::AdapterConfig;
pub use connection::ConnectionManager;
pub use controls::{PluginControls, ReconfigState};
pub use error::{Result, TransportError};
