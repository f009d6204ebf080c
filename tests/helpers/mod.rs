//! Test helpers and fixtures for horst integration tests
//!
//! - [`GainDescriptor`]: a gain plugin that records every call into a [`Recorder`]
//! - [`MockTransport`] / [`MockClient`] / [`MockScope`]: in-memory transport
//!   with manual cycle control


use crossbeam_channel::Receiver;
use horst::core::{
    uris, FeatureSet, RunContext, StateInterface, StateRetrieve, StateStatus, StateStore, Urid,
    WorkResponder, WorkerError,
};
use horst::transport::{PortDirection, PortId, PortKind, TransportError};
use horst::{
    AdapterConfig, Horst, PluginDescriptor, PluginInstance, PluginWorker, PortBuffer,
    PortProperties, ProcessScope, RawMidiEvent, Transport, TransportAdapter, TransportClient,
};
use parking_lot::Mutex;
use std::cell::Cell;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const TEST_SAMPLE_RATE: f64 = 48000.0;
pub const TEST_BUFFER_SIZE: usize = 256;

pub const GAIN_URI: &str = "http://example.org/plugins/gain";
pub const GAIN_NAME: &str = "Test Gain";

/// Port indices of the gain plugin.
pub const IN: usize = 0;
pub const OUT: usize = 1;
pub const GAIN: usize = 2;
pub const LEVEL: usize = 3;

/// Bytes per work item the plugin schedules.
pub const WORK_ITEM_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Activated(usize),
    Deactivated(usize),
    Run {
        instance: usize,
        frames: usize,
        gain: f32,
        input_peak: f32,
    },
    Saved(StateStatus),
    /// Whether the stored property was found.
    Restored(bool),
}

/// Everything the plugin observed, shared between test and plugin.
#[derive(Default)]
pub struct Recorder {
    calls: Mutex<Vec<Call>>,
    pub instances: AtomicUsize,
    /// Work items to schedule during the next `run`.
    pub schedule_next_run: AtomicUsize,
    pub scheduled: AtomicUsize,
    pub no_space: AtomicUsize,
    /// Work calls entered, including one still waiting on the gate.
    pub started: AtomicUsize,
    pub worked: AtomicUsize,
    pub responses: AtomicUsize,
    pub gain_urid: AtomicU32,
    pub max_block_length: AtomicUsize,
}

impl Recorder {
    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// `(frames, gain)` of every run, in order.
    pub fn runs(&self) -> Vec<(usize, f32)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::Run { frames, gain, .. } => Some((*frames, *gain)),
                _ => None,
            })
            .collect()
    }

    pub fn input_peaks(&self) -> Vec<f32> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::Run { input_peak, .. } => Some(*input_peak),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    pub fn count(&self, counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Mono gain plugin: `out = in * gain`, `level = gain`.
pub struct GainDescriptor {
    ports: Vec<PortProperties>,
    required: Vec<String>,
    optional: Vec<String>,
    extensions: Vec<String>,
    gate: Option<Receiver<()>>,
    recorder: Arc<Recorder>,
}

impl Default for GainDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

impl GainDescriptor {
    pub fn new() -> Self {
        Self {
            ports: vec![
                PortProperties::audio_input("in"),
                PortProperties::audio_output("out"),
                PortProperties::control_input("gain", 0.0, 1.0, 1.0).with_name("Gain"),
                PortProperties::control_output("level"),
            ],
            required: vec![uris::URID_MAP.to_string()],
            optional: vec![uris::OPTIONS.to_string(), uris::BOUNDED_BLOCK_LENGTH.to_string()],
            extensions: Vec::new(),
            gate: None,
            recorder: Arc::new(Recorder::default()),
        }
    }

    pub fn recorder(&self) -> Arc<Recorder> {
        Arc::clone(&self.recorder)
    }

    pub fn with_required(mut self, uri: &str) -> Self {
        self.required.push(uri.to_string());
        self
    }

    /// Schedule work; every work call first waits on `gate`.
    pub fn with_worker(mut self, gate: Receiver<()>) -> Self {
        self.required.push(uris::WORKER_SCHEDULE.to_string());
        self.extensions.push(uris::WORKER_INTERFACE.to_string());
        self.gate = Some(gate);
        self
    }

    pub fn with_state(mut self) -> Self {
        self.extensions.push(uris::STATE_INTERFACE.to_string());
        self
    }

    pub fn into_arc(self) -> Arc<dyn PluginDescriptor> {
        Arc::new(self)
    }
}

impl PluginDescriptor for GainDescriptor {
    fn uri(&self) -> &str {
        GAIN_URI
    }

    fn name(&self) -> &str {
        GAIN_NAME
    }

    fn ports(&self) -> &[PortProperties] {
        &self.ports
    }

    fn required_features(&self) -> &[String] {
        &self.required
    }

    fn optional_features(&self) -> &[String] {
        &self.optional
    }

    fn extension_data(&self) -> &[String] {
        &self.extensions
    }

    fn instantiate(
        &self,
        _sample_rate: f64,
        features: &FeatureSet,
    ) -> std::result::Result<Box<dyn PluginInstance>, String> {
        let id = self.recorder.instances.fetch_add(1, Ordering::SeqCst);
        self.recorder
            .gain_urid
            .store(features.urid_map().map(GAIN_URI), Ordering::SeqCst);
        let max_block = features.option(uris::MAX_BLOCK_LENGTH).unwrap_or(0);
        self.recorder
            .max_block_length
            .store(max_block as usize, Ordering::SeqCst);

        Ok(Box::new(GainInstance {
            id,
            recorder: Arc::clone(&self.recorder),
            buffers: vec![PortBuffer::null(); self.ports.len()],
            worker: self.gate.clone().map(|gate| GainWorker {
                gate,
                recorder: Arc::clone(&self.recorder),
            }),
            has_state: self
                .extensions
                .iter()
                .any(|uri| uri == uris::STATE_INTERFACE),
        }))
    }
}

struct GainInstance {
    id: usize,
    recorder: Arc<Recorder>,
    buffers: Vec<PortBuffer>,
    worker: Option<GainWorker>,
    has_state: bool,
}

impl PluginInstance for GainInstance {
    fn connect_port(&mut self, index: usize, buffer: PortBuffer) {
        self.buffers[index] = buffer;
    }

    fn activate(&mut self) {
        self.recorder.record(Call::Activated(self.id));
    }

    fn deactivate(&mut self) {
        self.recorder.record(Call::Deactivated(self.id));
    }

    fn run(&mut self, frames: usize, ctx: &mut RunContext<'_>) {
        let gain = if self.buffers[GAIN].is_null() {
            1.0
        } else {
            unsafe { self.buffers[GAIN].read() }
        };

        let input = self.buffers[IN];
        let output = self.buffers[OUT];
        let mut input_peak = 0.0f32;
        if !input.is_null() && !output.is_null() {
            for frame in 0..frames {
                unsafe {
                    let sample = *input.as_ptr().add(frame);
                    input_peak = input_peak.max(sample.abs());
                    *output.as_ptr().add(frame) = sample * gain;
                }
            }
        }

        if !self.buffers[LEVEL].is_null() {
            unsafe { self.buffers[LEVEL].write(gain) };
        }

        for n in 0..self.recorder.schedule_next_run.swap(0, Ordering::SeqCst) {
            match ctx.schedule_work(&[n as u8; WORK_ITEM_SIZE]) {
                Ok(()) => {
                    self.recorder.scheduled.fetch_add(1, Ordering::SeqCst);
                }
                Err(WorkerError::NoSpace) => {
                    self.recorder.no_space.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => panic!("unexpected schedule error: {e:?}"),
            }
        }

        self.recorder.record(Call::Run {
            instance: self.id,
            frames,
            gain,
            input_peak,
        });
    }

    fn work_response(&mut self, _data: &[u8], _ctx: &mut RunContext<'_>) {
        self.recorder.responses.fetch_add(1, Ordering::SeqCst);
    }

    fn take_worker(&mut self) -> Option<Box<dyn PluginWorker>> {
        self.worker
            .take()
            .map(|worker| Box::new(worker) as Box<dyn PluginWorker>)
    }

    fn state(&mut self) -> Option<&mut dyn StateInterface> {
        if self.has_state {
            Some(self as &mut dyn StateInterface)
        } else {
            None
        }
    }
}

impl StateInterface for GainInstance {
    fn save(&mut self, store: &mut dyn StateStore, flags: u32) -> StateStatus {
        let key: Urid = self.recorder.gain_urid.load(Ordering::SeqCst);
        let status = store.store(key, &1.0f32.to_le_bytes(), 0, flags);
        self.recorder.record(Call::Saved(status));
        status
    }

    fn restore(&mut self, retrieve: &dyn StateRetrieve, _flags: u32) -> StateStatus {
        let key: Urid = self.recorder.gain_urid.load(Ordering::SeqCst);
        let found = retrieve.retrieve(key).is_some();
        self.recorder.record(Call::Restored(found));
        if found {
            StateStatus::Success
        } else {
            StateStatus::NoProperty
        }
    }
}

struct GainWorker {
    gate: Receiver<()>,
    recorder: Arc<Recorder>,
}

impl PluginWorker for GainWorker {
    fn work(
        &mut self,
        respond: &mut WorkResponder<'_>,
        data: &[u8],
    ) -> std::result::Result<(), WorkerError> {
        self.recorder.started.fetch_add(1, Ordering::SeqCst);
        // Blocks until the test drops the sender.
        let _ = self.gate.recv_timeout(Duration::from_secs(5));
        respond.respond(&data[..data.len().min(8)])?;
        self.recorder.worked.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A gate that is already open.
pub fn open_gate() -> Receiver<()> {
    let (_sender, receiver) = crossbeam_channel::unbounded();
    receiver
}

/// Poll `condition` for up to five seconds.
pub fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// In-memory transport.
pub struct MockTransport {
    pub sample_rate: f64,
    pub buffer_size: usize,
    pub fail_open: bool,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            sample_rate: TEST_SAMPLE_RATE,
            buffer_size: TEST_BUFFER_SIZE,
            fail_open: false,
        }
    }
}

impl Transport for MockTransport {
    type Client = MockClient;

    fn open(&self, client_name: &str) -> horst::transport::Result<MockClient> {
        if self.fail_open {
            return Err(TransportError::ClientOpen {
                name: client_name.to_string(),
                reason: "server not running".to_string(),
            });
        }
        Ok(MockClient::new(client_name, self.sample_rate, self.buffer_size))
    }
}

pub struct MockClient {
    name: String,
    sample_rate: f64,
    buffer_size: usize,
    ports: Vec<(String, PortKind, PortDirection)>,
    external: Vec<String>,
    connections: Vec<(String, String)>,
}

impl MockClient {
    pub fn new(name: &str, sample_rate: f64, buffer_size: usize) -> Self {
        Self {
            name: name.to_string(),
            sample_rate,
            buffer_size,
            ports: Vec::new(),
            external: vec![
                "system:capture_1".to_string(),
                "system:playback_1".to_string(),
            ],
            connections: Vec::new(),
        }
    }

    pub fn port_id(&self, name: &str) -> PortId {
        let index = self
            .ports
            .iter()
            .position(|(port, _, _)| port == name)
            .unwrap_or_else(|| panic!("no port {name}"));
        PortId(index)
    }

    pub fn port_names(&self) -> Vec<&str> {
        self.ports.iter().map(|(name, _, _)| name.as_str()).collect()
    }

    pub fn port(&self, id: PortId) -> &(String, PortKind, PortDirection) {
        &self.ports[id.0]
    }

    pub fn connections(&self) -> &[(String, String)] {
        &self.connections
    }

    fn full_names(&self) -> Vec<String> {
        self.ports
            .iter()
            .map(|(port, _, _)| format!("{}:{}", self.name, port))
            .chain(self.external.iter().cloned())
            .collect()
    }

    fn exists(&self, port: &str) -> bool {
        self.full_names().iter().any(|name| name == port)
    }
}

impl TransportClient for MockClient {
    fn client_name(&self) -> &str {
        &self.name
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn register_port(
        &mut self,
        name: &str,
        kind: PortKind,
        direction: PortDirection,
    ) -> horst::transport::Result<PortId> {
        if self.ports.iter().any(|(port, _, _)| port == name) {
            return Err(TransportError::PortRegistration {
                name: name.to_string(),
                reason: "duplicate port name".to_string(),
            });
        }
        self.ports.push((name.to_string(), kind, direction));
        Ok(PortId(self.ports.len() - 1))
    }

    fn connect(&mut self, source: &str, destination: &str) -> horst::transport::Result<()> {
        if !self.exists(source) || !self.exists(destination) {
            return Err(TransportError::Connection {
                source_port: source.to_string(),
                destination: destination.to_string(),
                reason: "no such port".to_string(),
            });
        }
        self.connections
            .push((source.to_string(), destination.to_string()));
        Ok(())
    }

    fn disconnect(&mut self, source: &str, destination: &str) -> horst::transport::Result<()> {
        let position = self
            .connections
            .iter()
            .position(|(s, d)| s == source && d == destination);
        match position {
            Some(position) => {
                self.connections.remove(position);
                Ok(())
            }
            None => Err(TransportError::Disconnection {
                source_port: source.to_string(),
                destination: destination.to_string(),
                reason: "not connected".to_string(),
            }),
        }
    }

    fn ports(&self, pattern: &str) -> Vec<String> {
        self.full_names()
            .into_iter()
            .filter(|name| name.contains(pattern))
            .collect()
    }
}

/// One process cycle's buffers and MIDI events.
pub struct MockScope {
    frames: usize,
    buffers: Vec<Vec<Cell<f32>>>,
    midi: Vec<Vec<RawMidiEvent>>,
}

impl MockScope {
    pub fn new(client: &MockClient, frames: usize) -> Self {
        let buffers = client
            .ports
            .iter()
            .map(|(_, kind, _)| match kind {
                PortKind::Audio => (0..frames).map(|_| Cell::new(0.0)).collect(),
                PortKind::Midi => Vec::new(),
            })
            .collect();
        Self {
            frames,
            buffers,
            midi: vec![Vec::new(); client.ports.len()],
        }
    }

    pub fn set(&self, port: PortId, samples: &[f32]) {
        for (cell, sample) in self.buffers[port.0].iter().zip(samples) {
            cell.set(*sample);
        }
    }

    pub fn fill(&self, port: PortId, value: f32) {
        for cell in &self.buffers[port.0] {
            cell.set(value);
        }
    }

    pub fn samples(&self, port: PortId) -> Vec<f32> {
        self.buffers[port.0].iter().map(Cell::get).collect()
    }

    pub fn push_midi(&mut self, port: PortId, event: RawMidiEvent) {
        self.midi[port.0].push(event);
    }
}

impl ProcessScope for MockScope {
    fn n_frames(&self) -> usize {
        self.frames
    }

    fn port_buffer(&self, port: PortId) -> PortBuffer {
        match self.buffers.get(port.0) {
            Some(buffer) if !buffer.is_empty() => PortBuffer::from_ptr(buffer.as_ptr() as *mut f32),
            _ => PortBuffer::null(),
        }
    }

    fn midi_events(&self, port: PortId) -> &[RawMidiEvent] {
        self.midi.get(port.0).map_or(&[], Vec::as_slice)
    }
}

/// Route `tracing` output through the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Host `descriptor` on a fresh mock client.
pub fn adapter_for(
    descriptor: GainDescriptor,
    config: &AdapterConfig,
) -> (TransportAdapter, MockClient, Arc<Recorder>) {
    init_tracing();
    let recorder = descriptor.recorder();
    let mut client = MockClient::new("gain", TEST_SAMPLE_RATE, TEST_BUFFER_SIZE);
    let horst = Horst::new(descriptor.into_arc()).expect("Failed to create host");
    let adapter =
        TransportAdapter::new(horst, &mut client, config).expect("Failed to create adapter");
    (adapter, client, recorder)
}

pub fn gain_adapter() -> (TransportAdapter, MockClient, Arc<Recorder>) {
    adapter_for(GainDescriptor::new(), &AdapterConfig::default())
}
