//! MIDI control-change handling for horst: raw events, CC extraction and
//! per-port bindings readable from the audio thread without locks.

pub mod binding;
pub mod error;
pub mod event;

pub use binding::{AtomicMidiBinding, MidiBinding};
pub use error::{MidiError, Result};
pub use event::{ControlChange, RawMidiEvent, CONTROL_CHANGE};
