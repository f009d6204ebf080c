//! Plugin host core: URID table, lock-free chunk queues, worker protocol and
//! the plugin instance lifecycle.
//!
//! # Primary API
//!
//! - [`Horst`]: owns one plugin instance, its worker thread and queues
//! - [`PluginProvider`] / [`PluginDescriptor`] / [`PluginInstance`]: the plugin side
//! - [`UridMap`]: URI interning shared with the plugin
//! - [`chunk_queue`]: SPSC queue of contiguous variable-length chunks
//!
//! # Example
//!
//! ```ignore
//! use horst_core::{Horst, PluginProvider};
//!
//! let descriptor = provider.get("http://example.org/amp")?;
//! let mut host = Horst::new(descriptor)?;
//! host.instantiate(48000.0, 256)?;
//! host.connect_port(0, input)?;
//! host.run(256)?;
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod chunk_queue;
pub use chunk_queue::{
    chunk_queue, chunk_queue_with_max_chunk, ChunkConsumer, ChunkProducer, ChunkQueueError,
};

pub mod config;
pub use config::HostConfig;

pub mod features;
pub use features::{negotiate, uris, BlockLengths, Capabilities, FeatureSet, PluginOption};

mod host;
pub use host::Horst;

pub mod lockfree;
pub use lockfree::{AtomicFlag, AtomicFloat};

pub mod plugin;
pub use plugin::{
    PluginDescriptor, PluginInstance, PluginProvider, PluginRegistry, PluginWorker, PortBuffer,
    PortProperties,
};

pub mod rt_log;
pub use rt_log::{rt_log, RtLogDrain, RtLogger};

pub mod state;
pub use state::{PathState, StateInterface, StateRetrieve, StateStatus, StateStore, StateValue};

pub mod urid;
pub use urid::{Urid, UridMap, UNMAPPED};

pub mod worker;
pub use worker::{RunContext, WorkResponder, Worker, WorkerError, WorkerState};
