//! Real-time transport adapter.
//!
//! Binds transport buffers to plugin ports every cycle, turns incoming MIDI
//! control changes into sub-block parameter automation, and implements
//! bypass and peak monitoring on top of [`Horst`].

use crate::client::{PortDirection, PortId, PortKind, ProcessScope, TransportClient};
use crate::config::AdapterConfig;
use crate::controls::{PluginControls, ReconfigState};
use crate::error::Result;
use horst_core::{Horst, PortBuffer, PortProperties};
use std::cell::Cell;
use std::path::Path;
use std::sync::Arc;

/// Name of the MIDI input port every adapter registers.
pub const MIDI_INPUT_PORT: &str = "midi-in";

/// A plugin wired onto a transport client.
///
/// [`process`](Self::process) runs on the transport's audio thread. The
/// reconfiguration callbacks must not run concurrently with it.
pub struct TransportAdapter {
    pub(crate) horst: Horst,
    pub(crate) controls: Arc<PluginControls>,
    pub(crate) sample_rate: f64,
    pub(crate) buffer_size: usize,
    expose_control_ports: bool,
    midi_port: PortId,
    /// Transport port per plugin port, if registered.
    port_ids: Vec<Option<PortId>>,
    input_indices: Vec<usize>,
    output_indices: Vec<usize>,
    control_inputs: Vec<usize>,
    control_outputs: Vec<usize>,
    /// Audio-thread copies of control values. The plugin is connected to these.
    working: Vec<Cell<f32>>,
    /// Silence for transport-bound input ports while disabled.
    zero_buffers: Vec<Vec<f32>>,
    transport_buffers: Vec<PortBuffer>,
    data_locations: Vec<PortBuffer>,
}

impl TransportAdapter {
    /// Instantiate `horst` for the client's sample rate and buffer size and
    /// register its ports.
    pub fn new(
        mut horst: Horst,
        client: &mut dyn TransportClient,
        config: &AdapterConfig,
    ) -> Result<Self> {
        let sample_rate = client.sample_rate();
        let buffer_size = client.buffer_size();
        horst.instantiate(sample_rate, buffer_size)?;

        let midi_port = client.register_port(MIDI_INPUT_PORT, PortKind::Midi, PortDirection::Input)?;

        let ports: Vec<PortProperties> = horst.ports().to_vec();
        let expose_control_ports = config.expose_control_ports;

        let mut port_ids = vec![None; ports.len()];
        let mut input_indices = Vec::new();
        let mut output_indices = Vec::new();
        let mut zero_buffers = vec![Vec::new(); ports.len()];

        for (index, port) in ports.iter().enumerate() {
            tracing::debug!(
                "Port {} \"{}\": input={} audio={} control={} cv={} side_chain={} range=[{}, {}] default={}",
                index,
                port.symbol,
                port.is_input,
                port.is_audio,
                port.is_control,
                port.is_cv,
                port.is_side_chain,
                port.minimum_value,
                port.maximum_value,
                port.default_value
            );

            if !(port.is_signal() || (port.is_control && expose_control_ports)) {
                continue;
            }

            let direction = if port.is_input {
                PortDirection::Input
            } else {
                PortDirection::Output
            };
            port_ids[index] = Some(client.register_port(&port.symbol, PortKind::Audio, direction)?);

            if port.is_input {
                input_indices.push(index);
                zero_buffers[index] = vec![0.0; buffer_size];
            } else {
                output_indices.push(index);
            }
        }

        let working = ports
            .iter()
            .map(|p| {
                Cell::new(if p.is_control && p.is_input {
                    p.default_value
                } else {
                    0.0
                })
            })
            .collect();

        let control_inputs = ports
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_control && p.is_input)
            .map(|(i, _)| i)
            .collect();
        let control_outputs = ports
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_control && p.is_output)
            .map(|(i, _)| i)
            .collect();

        let controls = Arc::new(PluginControls::new(
            horst.name(),
            horst.uri(),
            client.client_name(),
            &ports,
            config,
        ));

        let mut adapter = Self {
            horst,
            controls,
            sample_rate,
            buffer_size,
            expose_control_ports,
            midi_port,
            port_ids,
            input_indices,
            output_indices,
            control_inputs,
            control_outputs,
            working,
            zero_buffers,
            transport_buffers: vec![PortBuffer::null(); ports.len()],
            data_locations: vec![PortBuffer::null(); ports.len()],
        };
        adapter.connect_control_ports()?;

        tracing::info!(
            "Hosting {} as \"{}\" ({} inputs, {} outputs) at {} Hz / {} frames",
            adapter.horst.name(),
            adapter.controls.client_name(),
            adapter.input_indices.len(),
            adapter.output_indices.len(),
            sample_rate,
            buffer_size
        );
        Ok(adapter)
    }

    /// Process one cycle. Called on the transport's audio thread.
    pub fn process(&mut self, scope: &dyn ProcessScope) {
        let frames = scope.n_frames();
        let controls = &*self.controls;

        if controls.reconfig_state() != ReconfigState::Stable {
            self.silence_outputs(scope, frames);
            return;
        }
        if frames > self.buffer_size {
            self.horst
                .log_realtime("Cycle longer than the buffer size, output silenced");
            self.silence_outputs(scope, frames);
            return;
        }

        let enabled = controls.enabled();
        let control_input_updates = controls.control_input_updates_enabled();
        let control_output_updates = controls.control_output_updates_enabled();
        let audio_input_monitoring = controls.audio_input_monitoring_enabled();
        let audio_output_monitoring = controls.audio_output_monitoring_enabled();
        let ports = controls.ports();

        for (index, port_id) in self.port_ids.iter().enumerate() {
            let Some(port_id) = *port_id else {
                continue;
            };
            let buffer = scope.port_buffer(port_id);
            self.transport_buffers[index] = buffer;

            let location = if !enabled && ports[index].is_input {
                let zero = &mut self.zero_buffers[index];
                zero.fill(0.0);
                PortBuffer::from_slice(zero)
            } else {
                buffer
            };
            self.data_locations[index] = location;
            connect(&mut self.horst, index, location);
        }

        if control_input_updates && !self.expose_control_ports {
            for &index in &self.control_inputs {
                self.working[index].set(controls.value(index));
            }
        }

        let fixed_block_length = self.horst.fixed_block_length_required();
        let mut processed = 0;

        for event in scope.midi_events(self.midi_port) {
            let Some(cc) = event.as_control_change() else {
                continue;
            };
            let at = cc.frame_offset.min(frames);
            let mut split = false;

            for &index in &self.control_inputs {
                let binding = controls.binding(index);
                if !binding.matches(cc.channel, cc.controller) {
                    continue;
                }

                if !fixed_block_length && at > processed {
                    run(&mut self.horst, at - processed);
                    processed = at;
                    split = true;
                }

                let port = &ports[index];
                let value = binding.map_value(cc.value, port.minimum_value, port.maximum_value);
                self.working[index].set(value);
                controls.publish(index, value);
            }

            if split && processed < frames {
                for (index, port_id) in self.port_ids.iter().enumerate() {
                    if port_id.is_some() {
                        connect(
                            &mut self.horst,
                            index,
                            self.data_locations[index].offset(processed),
                        );
                    }
                }
            }
        }

        // A control change clamped to the cycle end may already have run every frame.
        if processed < frames || frames == 0 {
            run(&mut self.horst, frames - processed);
        }

        if !enabled {
            for (&input, &output) in self.input_indices.iter().zip(&self.output_indices) {
                let src = self.transport_buffers[input].as_ptr();
                let dst = self.transport_buffers[output].as_ptr();
                if src.is_null() || dst.is_null() {
                    continue;
                }
                for frame in 0..frames {
                    // SAFETY: both buffers hold at least `frames` samples this
                    // cycle; element-wise access stays sound if they alias.
                    unsafe { *dst.add(frame) += *src.add(frame) };
                }
            }
        }

        for (indices, monitoring) in [
            (&self.input_indices, audio_input_monitoring),
            (&self.output_indices, audio_output_monitoring),
        ] {
            for &index in indices {
                let level = if monitoring {
                    peak(self.transport_buffers[index], frames)
                } else {
                    0.0
                };
                controls.publish(index, level);
            }
        }

        if control_output_updates && !self.expose_control_ports {
            for &index in &self.control_outputs {
                controls.publish(index, self.working[index].get());
            }
        }
    }

    /// Point every control port at its working value.
    pub(crate) fn connect_control_ports(&mut self) -> horst_core::Result<()> {
        for (index, port) in self.controls.ports().iter().enumerate() {
            if port.is_control {
                let location = PortBuffer::from_ptr(self.working[index].as_ptr());
                self.data_locations[index] = location;
                self.horst.connect_port(index, location)?;
            }
        }
        Ok(())
    }

    pub(crate) fn resize_zero_buffers(&mut self, buffer_size: usize) {
        for &index in &self.input_indices {
            self.zero_buffers[index].resize(buffer_size, 0.0);
        }
    }

    fn silence_outputs(&self, scope: &dyn ProcessScope, frames: usize) {
        for &index in &self.output_indices {
            if let Some(port_id) = self.port_ids[index] {
                let buffer = scope.port_buffer(port_id);
                if !buffer.is_null() {
                    // SAFETY: the transport guarantees `frames` samples per port.
                    unsafe { buffer.as_mut_slice(frames) }.fill(0.0);
                }
            }
        }
    }

    /// Shared control-plane handle.
    pub fn controls(&self) -> Arc<PluginControls> {
        Arc::clone(&self.controls)
    }

    pub fn horst(&self) -> &Horst {
        &self.horst
    }

    pub fn horst_mut(&mut self) -> &mut Horst {
        &mut self.horst
    }

    pub fn client_name(&self) -> &str {
        self.controls.client_name()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn midi_port(&self) -> PortId {
        self.midi_port
    }

    /// Transport port registered for a plugin port.
    pub fn port_id(&self, index: usize) -> Option<PortId> {
        self.port_ids.get(index).copied().flatten()
    }

    pub fn reconfig_state(&self) -> ReconfigState {
        self.controls.reconfig_state()
    }

    pub fn save_state(&mut self, path: &Path) -> Result<()> {
        Ok(self.horst.save_state(path)?)
    }

    pub fn restore_state(&mut self, path: &Path) -> Result<()> {
        Ok(self.horst.restore_state(path)?)
    }
}

#[inline]
fn connect(horst: &mut Horst, index: usize, buffer: PortBuffer) {
    if horst.connect_port(index, buffer).is_err() {
        horst.log_realtime("connect_port failed");
    }
}

#[inline]
fn run(horst: &mut Horst, frames: usize) {
    if horst.run(frames).is_err() {
        horst.log_realtime("run failed: plugin not instantiated");
    }
}

/// Largest absolute sample value in the first `frames` samples.
#[inline]
fn peak(buffer: PortBuffer, frames: usize) -> f32 {
    if buffer.is_null() {
        return 0.0;
    }
    // SAFETY: transport buffers hold at least `frames` samples this cycle.
    unsafe { buffer.as_slice(frames) }
        .iter()
        .fold(0.0f32, |max, sample| max.max(sample.abs()))
}
