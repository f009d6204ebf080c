//! Transport-facing traits.
//!
//! A transport (JACK, PipeWire, an offline renderer, ...) owns the port
//! buffers and drives the adapter. These traits are all the adapter needs
//! from it.

use crate::error::Result;
use horst_core::PortBuffer;
use horst_midi::RawMidiEvent;

/// Handle to a port registered with a transport client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    /// One `f32` per frame. Audio, CV and exposed control ports use this.
    Audio,
    Midi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// An open client of the audio transport.
pub trait TransportClient {
    /// Name the transport actually assigned (may differ from the requested one).
    fn client_name(&self) -> &str;

    fn sample_rate(&self) -> f64;

    fn buffer_size(&self) -> usize;

    fn register_port(
        &mut self,
        name: &str,
        kind: PortKind,
        direction: PortDirection,
    ) -> Result<PortId>;

    /// Connect two ports by full name (`client:port`).
    fn connect(&mut self, source: &str, destination: &str) -> Result<()>;

    fn disconnect(&mut self, source: &str, destination: &str) -> Result<()>;

    /// Full names of all ports whose name contains `pattern` (all ports if empty).
    fn ports(&self, pattern: &str) -> Vec<String>;
}

/// Opens transport clients.
pub trait Transport {
    type Client: TransportClient;

    fn open(&self, client_name: &str) -> Result<Self::Client>;
}

/// Buffers and events for one process cycle.
pub trait ProcessScope {
    fn n_frames(&self) -> usize;

    /// Buffer of an audio port, valid for `n_frames` samples during this cycle.
    fn port_buffer(&self, port: PortId) -> PortBuffer;

    /// Incoming MIDI events of a MIDI port, ordered by frame offset.
    fn midi_events(&self, port: PortId) -> &[RawMidiEvent];
}
