//! # horst - LV2-style plugin host
//!
//! ## Architecture
//!
//! horst is an umbrella crate that coordinates:
//! - **horst-core** - Plugin instance lifecycle, URID table, chunk queues, worker thread
//! - **horst-midi** - MIDI control changes and per-port CC bindings
//! - **horst-transport** - Real-time adapter: port binding, sample-accurate
//!   automation, bypass, monitoring, reinstantiation
//!
//! ## Quick Start
//!
//! ```ignore
//! use horst::prelude::*;
//!
//! let (mut adapter, client) = HorstBuilder::new(&registry, "http://example.org/amp")
//!     .build(&transport)?;
//!
//! let controls = adapter.controls();
//! controls.set_midi_binding(gain, MidiBinding::new(0, 7)?)?;
//! controls.set_control_port_value(gain, 0.5)?;
//! ```

pub use horst_core as core;
pub use horst_midi as midi;
pub use horst_transport as transport;

pub use horst_core::{
    Horst, HostConfig, PluginDescriptor, PluginInstance, PluginProvider, PluginRegistry,
    PluginWorker, PortBuffer, PortProperties, UridMap,
};
pub use horst_midi::{MidiBinding, RawMidiEvent};
pub use horst_transport::{
    AdapterConfig, ConnectionManager, PluginControls, ProcessScope, ReconfigState, Transport,
    TransportAdapter, TransportClient,
};

mod builder;
pub use builder::HorstBuilder;

mod error;
pub use error::{Error, Result};

pub mod prelude {
    pub use crate::{
        AdapterConfig, Error, Horst, HorstBuilder, HostConfig, MidiBinding, PluginControls,
        PluginProvider, PluginRegistry, PortProperties, ProcessScope, Result, Transport,
        TransportAdapter, TransportClient,
    };
}
