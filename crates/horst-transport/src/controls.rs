//! Control-plane state shared with the audio thread.
//!
//! Every field is a single lock-free cell, so any thread may read or write
//! while the adapter is processing.

use crate::config::AdapterConfig;
use crate::error::Result;
use horst_core::{AtomicFlag, AtomicFloat, PortProperties};
use horst_midi::{AtomicMidiBinding, MidiBinding};
use std::sync::atomic::{AtomicU8, Ordering};

/// Reinstantiation state of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReconfigState {
    /// Instantiated for the current sample rate and buffer size.
    Stable = 0,
    Reconfiguring = 1,
    /// Reinstantiation failed; the adapter outputs silence.
    Failed = 2,
}

impl ReconfigState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Stable,
            1 => Self::Reconfiguring,
            _ => Self::Failed,
        }
    }
}

/// Published port values, MIDI bindings and flags of one hosted plugin.
///
/// For control ports the value is the control value. For transport-bound
/// audio ports it is the last cycle's peak when monitoring is enabled, else 0.
#[derive(Debug)]
pub struct PluginControls {
    plugin_name: String,
    plugin_uri: String,
    client_name: String,
    ports: Vec<PortProperties>,
    values: Box<[AtomicFloat]>,
    bindings: Box<[AtomicMidiBinding]>,
    enabled: AtomicFlag,
    control_input_updates: AtomicFlag,
    control_output_updates: AtomicFlag,
    audio_input_monitoring: AtomicFlag,
    audio_output_monitoring: AtomicFlag,
    reconfig_state: AtomicU8,
}

impl PluginControls {
    pub fn new(
        plugin_name: &str,
        plugin_uri: &str,
        client_name: &str,
        ports: &[PortProperties],
        config: &AdapterConfig,
    ) -> Self {
        let values = ports
            .iter()
            .map(|p| {
                let initial = if p.is_control && p.is_input {
                    p.default_value
                } else {
                    0.0
                };
                AtomicFloat::new(initial)
            })
            .collect();

        Self {
            plugin_name: plugin_name.to_string(),
            plugin_uri: plugin_uri.to_string(),
            client_name: client_name.to_string(),
            ports: ports.to_vec(),
            values,
            bindings: ports.iter().map(|_| AtomicMidiBinding::default()).collect(),
            enabled: AtomicFlag::new(config.enabled),
            control_input_updates: AtomicFlag::new(config.control_input_updates),
            control_output_updates: AtomicFlag::new(config.control_output_updates),
            audio_input_monitoring: AtomicFlag::new(config.audio_input_monitoring),
            audio_output_monitoring: AtomicFlag::new(config.audio_output_monitoring),
            reconfig_state: AtomicU8::new(ReconfigState::Stable as u8),
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.ports.len() {
            return Err(horst_core::Error::PortOutOfRange {
                index,
                count: self.ports.len(),
            }
            .into());
        }
        Ok(())
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    pub fn plugin_uri(&self) -> &str {
        &self.plugin_uri
    }

    /// Name of the transport client.
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    pub fn ports(&self) -> &[PortProperties] {
        &self.ports
    }

    pub fn port_properties(&self, index: usize) -> Result<&PortProperties> {
        self.check_index(index)?;
        Ok(&self.ports[index])
    }

    /// Index of the port with the given symbol.
    pub fn port_index(&self, symbol: &str) -> Option<usize> {
        self.ports.iter().position(|p| p.symbol == symbol)
    }

    pub fn control_port_value(&self, index: usize) -> Result<f32> {
        self.check_index(index)?;
        Ok(self.values[index].get())
    }

    /// Publish a value. Control inputs pick it up on the next cycle.
    pub fn set_control_port_value(&self, index: usize, value: f32) -> Result<()> {
        self.check_index(index)?;
        self.values[index].set(value);
        Ok(())
    }

    pub fn midi_binding(&self, index: usize) -> Result<MidiBinding> {
        self.check_index(index)?;
        Ok(self.bindings[index].load())
    }

    pub fn set_midi_binding(&self, index: usize, binding: MidiBinding) -> Result<()> {
        self.check_index(index)?;
        let binding = binding.validated()?;
        let port = &self.ports[index];
        if !(port.is_control && port.is_input) {
            tracing::warn!(
                "MIDI binding on port {} ({}) has no effect: not a control input",
                index,
                port.symbol
            );
        }
        self.bindings[index].store(binding);
        Ok(())
    }

    pub fn enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub fn control_input_updates_enabled(&self) -> bool {
        self.control_input_updates.get()
    }

    pub fn set_control_input_updates_enabled(&self, enabled: bool) {
        self.control_input_updates.set(enabled);
    }

    pub fn control_output_updates_enabled(&self) -> bool {
        self.control_output_updates.get()
    }

    pub fn set_control_output_updates_enabled(&self, enabled: bool) {
        self.control_output_updates.set(enabled);
    }

    pub fn audio_input_monitoring_enabled(&self) -> bool {
        self.audio_input_monitoring.get()
    }

    pub fn set_audio_input_monitoring_enabled(&self, enabled: bool) {
        self.audio_input_monitoring.set(enabled);
    }

    pub fn audio_output_monitoring_enabled(&self) -> bool {
        self.audio_output_monitoring.get()
    }

    pub fn set_audio_output_monitoring_enabled(&self, enabled: bool) {
        self.audio_output_monitoring.set(enabled);
    }

    pub fn reconfig_state(&self) -> ReconfigState {
        ReconfigState::from_u8(self.reconfig_state.load(Ordering::Acquire))
    }

    pub(crate) fn set_reconfig_state(&self, state: ReconfigState) {
        self.reconfig_state.store(state as u8, Ordering::Release);
    }

    // Unchecked accessors for the audio thread; indices come from the port list.

    #[inline]
    pub(crate) fn value(&self, index: usize) -> f32 {
        self.values[index].get()
    }

    #[inline]
    pub(crate) fn publish(&self, index: usize, value: f32) {
        self.values[index].set(value);
    }

    #[inline]
    pub(crate) fn binding(&self, index: usize) -> MidiBinding {
        self.bindings[index].load()
    }
}
