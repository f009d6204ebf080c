//! Plugin host core.
//!
//! [`Horst`] owns one plugin instance together with its negotiated
//! capabilities, URID table, worker queues and worker thread. `run` is the
//! audio-thread entry point; everything else is called from the owning
//! (control) thread and must not overlap with `run`.

use crate::chunk_queue::{chunk_queue_with_max_chunk, ChunkConsumer, ChunkProducer};
use crate::config::HostConfig;
use crate::error::{Error, Result};
use crate::features::{negotiate, BlockLengths, Capabilities, FeatureSet};
use crate::plugin::{PluginDescriptor, PluginInstance, PortBuffer, PortProperties};
use crate::rt_log::{rt_log, RtLogDrain, RtLogger};
use crate::state::PathState;
use crate::urid::{Urid, UridMap};
use crate::worker::{RunContext, Worker, WorkerState};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Audio-thread half: work producer, response consumer and the RT log.
struct AudioSide {
    items: Option<ChunkProducer>,
    responses: Option<ChunkConsumer>,
    log: RtLogger,
    /// The live instance handed over a worker; scheduling is refused otherwise.
    worker_installed: bool,
    /// Work was scheduled and the worker has not been woken yet.
    notify_pending: bool,
}

/// Host for a single plugin.
pub struct Horst {
    descriptor: Arc<dyn PluginDescriptor>,
    capabilities: Capabilities,
    urid_map: UridMap,
    block_lengths: BlockLengths,
    instantiated_with: Option<(f64, usize)>,
    instance: Option<Box<dyn PluginInstance>>,
    audio: AudioSide,
    worker: Option<Worker>,
    rt_log: Arc<Mutex<RtLogDrain>>,
}

impl Horst {
    pub fn new(descriptor: Arc<dyn PluginDescriptor>) -> Result<Self> {
        Self::with_config(descriptor, &HostConfig::default())
    }

    /// Negotiate features and, if the plugin schedules work, start the worker thread.
    ///
    /// Nothing is instantiated yet; call [`instantiate`](Self::instantiate).
    pub fn with_config(descriptor: Arc<dyn PluginDescriptor>, config: &HostConfig) -> Result<Self> {
        let capabilities = negotiate(
            descriptor.required_features(),
            descriptor.optional_features(),
            descriptor.extension_data(),
        )?;

        let (log, drain) = rt_log(config.realtime_log_capacity);
        let rt_log = Arc::new(Mutex::new(drain));

        let (items, responses, worker) = if capabilities.needs_worker {
            let (item_producer, item_consumer) = chunk_queue_with_max_chunk(
                config.work_queue_capacity,
                config.max_chunk_for(config.work_queue_capacity),
            );
            let (response_producer, response_consumer) = chunk_queue_with_max_chunk(
                config.response_queue_capacity,
                config.max_chunk_for(config.response_queue_capacity),
            );
            let worker = Worker::spawn(item_consumer, response_producer, Arc::clone(&rt_log))?;
            (Some(item_producer), Some(response_consumer), Some(worker))
        } else {
            (None, None, None)
        };

        tracing::info!(
            "Loaded plugin {} <{}> with {} ports",
            descriptor.name(),
            descriptor.uri(),
            descriptor.ports().len()
        );

        Ok(Self {
            descriptor,
            capabilities,
            urid_map: UridMap::new(),
            block_lengths: BlockLengths::default(),
            instantiated_with: None,
            instance: None,
            audio: AudioSide {
                items,
                responses,
                log,
                worker_installed: false,
                notify_pending: false,
            },
            worker,
            rt_log,
        })
    }

    /// Create (or recreate) the plugin instance.
    ///
    /// Calling it again with the same parameters keeps the live instance and
    /// its port connections. Otherwise the previous instance is released only
    /// after the new one was created; responses and queued work meant for it
    /// are discarded.
    pub fn instantiate(&mut self, sample_rate: f64, buffer_size: usize) -> Result<()> {
        if self.instance.is_some() && self.instantiated_with == Some((sample_rate, buffer_size)) {
            tracing::debug!("Already instantiated at {} Hz / {} frames", sample_rate, buffer_size);
            return Ok(());
        }

        if self.capabilities.power_of_two_block_length && !buffer_size.is_power_of_two() {
            return Err(Error::NonPowerOfTwoBlockLength(buffer_size));
        }

        let block_lengths =
            BlockLengths::for_buffer_size(buffer_size, self.capabilities.fixed_block_length);
        let features = FeatureSet::new(self.urid_map.clone(), block_lengths);

        let mut instance = self
            .descriptor
            .instantiate(sample_rate, &features)
            .map_err(|reason| Error::InstantiationFailed {
                uri: self.descriptor.uri().to_string(),
                reason,
            })?;

        let plugin_worker = instance.take_worker();
        let worker_installed = self.worker.is_some() && plugin_worker.is_some();
        match &self.worker {
            Some(worker) => {
                if plugin_worker.is_none() {
                    tracing::warn!(
                        "Plugin requested worker scheduling but has no worker interface; work will be refused"
                    );
                }
                worker.replace_plugin_worker(plugin_worker);
            }
            None if plugin_worker.is_some() => {
                tracing::debug!("Ignoring worker interface; schedule feature was not requested");
            }
            None => {}
        }

        if let Some(responses) = self.audio.responses.as_mut() {
            responses.clear();
        }
        self.audio.notify_pending = false;
        self.audio.worker_installed = worker_installed;

        instance.activate();
        if let Some(mut old) = self.instance.replace(instance) {
            old.deactivate();
        }

        self.block_lengths = block_lengths;
        self.instantiated_with = Some((sample_rate, buffer_size));

        tracing::info!(
            "Instantiated {} at {} Hz, block length {}..{} (nominal {})",
            self.descriptor.name(),
            sample_rate,
            block_lengths.min,
            block_lengths.max,
            block_lengths.nominal
        );
        Ok(())
    }

    /// Bind a data location to a port of the live instance.
    #[inline]
    pub fn connect_port(&mut self, index: usize, buffer: PortBuffer) -> Result<()> {
        let count = self.descriptor.ports().len();
        if index >= count {
            return Err(Error::PortOutOfRange { index, count });
        }
        let instance = self.instance.as_mut().ok_or(Error::NotInstantiated)?;
        instance.connect_port(index, buffer);
        Ok(())
    }

    /// Process one block on the audio thread.
    ///
    /// Delivers pending worker responses, runs the plugin, calls `end_run`,
    /// then tries to wake the worker if work was scheduled.
    pub fn run(&mut self, frames: usize) -> Result<()> {
        let instance = self.instance.as_mut().ok_or(Error::NotInstantiated)?;
        let audio = &mut self.audio;

        {
            let items = if audio.worker_installed {
                audio.items.as_mut()
            } else {
                None
            };
            let mut ctx = RunContext::new(
                items,
                &mut audio.notify_pending,
                &mut audio.log,
            );

            if let Some(responses) = audio.responses.as_mut() {
                while responses
                    .consume(|data| instance.work_response(data, &mut ctx))
                    .is_some()
                {}
            }

            instance.run(frames, &mut ctx);
            instance.end_run(&mut ctx);
        }

        if audio.notify_pending {
            if let Some(worker) = &self.worker {
                if worker.try_notify() {
                    audio.notify_pending = false;
                }
            }
        }
        Ok(())
    }

    /// Queue a message for the real-time log. Safe on the audio thread.
    #[inline]
    pub fn log_realtime(&mut self, message: &str) -> bool {
        self.audio.log.log(message)
    }

    /// Forward queued real-time log messages to `tracing`.
    pub fn drain_realtime_log(&self) -> usize {
        self.rt_log.lock().drain()
    }

    pub fn urid_map(&self, uri: &str) -> Urid {
        self.urid_map.map(uri)
    }

    pub fn urid_unmap(&self, urid: Urid) -> Result<Arc<str>> {
        self.urid_map.unmap(urid)
    }

    /// Shared URID table, as handed to the plugin.
    pub fn urid_table(&self) -> &UridMap {
        &self.urid_map
    }

    /// Let the plugin save its state through the host's store callback.
    pub fn save_state(&mut self, path: &Path) -> Result<()> {
        let instance = self.instance.as_mut().ok_or(Error::NotInstantiated)?;
        let Some(state) = instance.state() else {
            tracing::debug!("No state interface, not saving");
            return Ok(());
        };

        let mut store = PathState::new(path);
        let status = state.save(&mut store, 0);
        tracing::debug!("Saved state to {}: {:?}", path.display(), status);
        Ok(())
    }

    /// Let the plugin restore its state through the host's retrieve callback.
    pub fn restore_state(&mut self, path: &Path) -> Result<()> {
        let instance = self.instance.as_mut().ok_or(Error::NotInstantiated)?;
        let Some(state) = instance.state() else {
            tracing::debug!("No state interface, not restoring");
            return Ok(());
        };

        let retrieve = PathState::new(path);
        let status = state.restore(&retrieve, 0);
        tracing::debug!("Restored state from {}: {:?}", path.display(), status);
        Ok(())
    }

    /// `None` if the plugin does not use a worker.
    pub fn worker_state(&self) -> Option<WorkerState> {
        self.worker.as_ref().map(Worker::state)
    }

    pub fn descriptor(&self) -> &Arc<dyn PluginDescriptor> {
        &self.descriptor
    }

    pub fn uri(&self) -> &str {
        self.descriptor.uri()
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn ports(&self) -> &[PortProperties] {
        self.descriptor.ports()
    }

    pub fn port_count(&self) -> usize {
        self.descriptor.ports().len()
    }

    pub fn port_properties(&self, index: usize) -> Result<&PortProperties> {
        let ports = self.descriptor.ports();
        ports.get(index).ok_or(Error::PortOutOfRange {
            index,
            count: ports.len(),
        })
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn fixed_block_length_required(&self) -> bool {
        self.capabilities.fixed_block_length
    }

    pub fn power_of_two_block_length_required(&self) -> bool {
        self.capabilities.power_of_two_block_length
    }

    pub fn block_lengths(&self) -> BlockLengths {
        self.block_lengths
    }

    pub fn is_instantiated(&self) -> bool {
        self.instance.is_some()
    }

    pub fn sample_rate(&self) -> Option<f64> {
        self.instantiated_with.map(|(rate, _)| rate)
    }

    pub fn buffer_size(&self) -> Option<usize> {
        self.instantiated_with.map(|(_, size)| size)
    }
}

impl Drop for Horst {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.as_mut() {
            worker.shutdown();
        }
        self.drain_realtime_log();
        if let Some(instance) = self.instance.as_mut() {
            instance.deactivate();
        }
    }
}
