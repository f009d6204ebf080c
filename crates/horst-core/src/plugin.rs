//! Plugin description and instance traits.
//!
//! Discovery and descriptor parsing live outside this crate. A
//! [`PluginProvider`] resolves a URI to a [`PluginDescriptor`], which knows the
//! plugin's ports and declared features and can create [`PluginInstance`]s.

use crate::error::{Error, Result};
use crate::features::FeatureSet;
use crate::state::StateInterface;
use crate::worker::{RunContext, WorkResponder, WorkerError};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Static description of one plugin port.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortProperties {
    pub name: String,
    pub symbol: String,
    pub is_audio: bool,
    pub is_control: bool,
    pub is_cv: bool,
    pub is_input: bool,
    pub is_output: bool,
    pub is_side_chain: bool,
    pub is_logarithmic: bool,
    pub minimum_value: f32,
    pub default_value: f32,
    pub maximum_value: f32,
}

impl PortProperties {
    fn new(symbol: impl Into<String>, is_input: bool) -> Self {
        let symbol = symbol.into();
        Self {
            name: symbol.clone(),
            symbol,
            is_input,
            is_output: !is_input,
            maximum_value: 1.0,
            ..Default::default()
        }
    }

    pub fn audio_input(symbol: impl Into<String>) -> Self {
        Self {
            is_audio: true,
            ..Self::new(symbol, true)
        }
    }

    pub fn audio_output(symbol: impl Into<String>) -> Self {
        Self {
            is_audio: true,
            ..Self::new(symbol, false)
        }
    }

    pub fn cv_input(symbol: impl Into<String>) -> Self {
        Self {
            is_cv: true,
            ..Self::new(symbol, true)
        }
    }

    pub fn cv_output(symbol: impl Into<String>) -> Self {
        Self {
            is_cv: true,
            ..Self::new(symbol, false)
        }
    }

    pub fn control_input(symbol: impl Into<String>, min: f32, default: f32, max: f32) -> Self {
        Self {
            is_control: true,
            minimum_value: min,
            default_value: default,
            maximum_value: max,
            ..Self::new(symbol, true)
        }
    }

    pub fn control_output(symbol: impl Into<String>) -> Self {
        Self {
            is_control: true,
            ..Self::new(symbol, false)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn side_chain(mut self) -> Self {
        self.is_side_chain = true;
        self
    }

    pub fn logarithmic(mut self) -> Self {
        self.is_logarithmic = true;
        self
    }

    /// Audio and CV ports carry one sample per frame.
    pub fn is_signal(&self) -> bool {
        self.is_audio || self.is_cv
    }
}

/// Raw pointer to port data, as handed to `connect_port`.
///
/// Control ports point at a single `f32`, audio and CV ports at one `f32` per
/// frame. The pointer is only dereferenced through the `unsafe` accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortBuffer {
    ptr: *mut f32,
}

// SAFETY: the pointee is owned by the transport or the adapter and is only
// accessed from the thread that currently drives the plugin.
unsafe impl Send for PortBuffer {}

impl PortBuffer {
    pub const fn null() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
        }
    }

    pub fn from_ptr(ptr: *mut f32) -> Self {
        Self { ptr }
    }

    pub fn from_slice(data: &mut [f32]) -> Self {
        Self {
            ptr: data.as_mut_ptr(),
        }
    }

    pub fn as_ptr(self) -> *mut f32 {
        self.ptr
    }

    pub fn is_null(self) -> bool {
        self.ptr.is_null()
    }

    /// The same buffer, `frames` samples further on.
    pub fn offset(self, frames: usize) -> Self {
        Self {
            ptr: self.ptr.wrapping_add(frames),
        }
    }

    /// # Safety
    /// The buffer must be non-null, valid for `len` reads and not written
    /// through another alias while the slice lives.
    pub unsafe fn as_slice<'a>(self, len: usize) -> &'a [f32] {
        std::slice::from_raw_parts(self.ptr, len)
    }

    /// # Safety
    /// The buffer must be non-null, valid for `len` writes and not aliased
    /// while the slice lives.
    pub unsafe fn as_mut_slice<'a>(self, len: usize) -> &'a mut [f32] {
        std::slice::from_raw_parts_mut(self.ptr, len)
    }

    /// # Safety
    /// The buffer must be non-null and point at an initialized `f32`.
    pub unsafe fn read(self) -> f32 {
        *self.ptr
    }

    /// # Safety
    /// The buffer must be non-null and valid for writes.
    pub unsafe fn write(self, value: f32) {
        *self.ptr = value;
    }
}

impl Default for PortBuffer {
    fn default() -> Self {
        Self::null()
    }
}

/// Static information about a plugin and its instantiation entry point.
pub trait PluginDescriptor: Send + Sync {
    fn uri(&self) -> &str;

    fn name(&self) -> &str;

    fn ports(&self) -> &[PortProperties];

    fn required_features(&self) -> &[String] {
        &[]
    }

    fn optional_features(&self) -> &[String] {
        &[]
    }

    /// Extension interfaces the plugin provides (worker, state, ...).
    fn extension_data(&self) -> &[String] {
        &[]
    }

    /// Create a new instance. The error string is the plugin's own reason.
    fn instantiate(
        &self,
        sample_rate: f64,
        features: &FeatureSet,
    ) -> std::result::Result<Box<dyn PluginInstance>, String>;
}

/// A live plugin instance.
///
/// `run`, `work_response` and `end_run` are called on the audio thread and
/// must not block or allocate.
pub trait PluginInstance: Send {
    fn connect_port(&mut self, index: usize, buffer: PortBuffer);

    fn activate(&mut self) {}

    fn deactivate(&mut self) {}

    fn run(&mut self, frames: usize, ctx: &mut RunContext<'_>);

    /// Deliver one response produced by the worker.
    fn work_response(&mut self, _data: &[u8], _ctx: &mut RunContext<'_>) {}

    /// Called after every `run`.
    fn end_run(&mut self, _ctx: &mut RunContext<'_>) {}

    /// Hand over the worker-side half of the plugin. Called once per instance.
    fn take_worker(&mut self) -> Option<Box<dyn PluginWorker>> {
        None
    }

    fn state(&mut self) -> Option<&mut dyn StateInterface> {
        None
    }
}

/// Worker-side half of a plugin, driven by the host's worker thread.
pub trait PluginWorker: Send {
    fn work(&mut self, respond: &mut WorkResponder<'_>, data: &[u8]) -> std::result::Result<(), WorkerError>;
}

/// Resolves plugin URIs to descriptors.
pub trait PluginProvider {
    fn find(&self, uri: &str) -> Option<Arc<dyn PluginDescriptor>>;

    /// Like [`find`](Self::find), failing with [`Error::PluginNotFound`].
    fn get(&self, uri: &str) -> Result<Arc<dyn PluginDescriptor>> {
        self.find(uri)
            .ok_or_else(|| Error::PluginNotFound(uri.to_string()))
    }
}

/// In-memory provider keyed by plugin URI.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn PluginDescriptor>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: Arc<dyn PluginDescriptor>) {
        tracing::debug!("Registered plugin {}", descriptor.uri());
        self.plugins
            .insert(descriptor.uri().to_string(), descriptor);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl PluginProvider for PluginRegistry {
    fn find(&self, uri: &str) -> Option<Arc<dyn PluginDescriptor>> {
        self.plugins.get(uri).cloned()
    }
}
