//! Worker thread and the scheduling contract around it.
//!
//! The audio thread produces work items and consumes responses; the worker
//! thread does the opposite. Both directions go through chunk queues. The
//! audio thread wakes the worker with a `try_lock` on the wake mutex and
//! retries on the next cycle if the lock is contended, so it never blocks.

use crate::chunk_queue::{ChunkConsumer, ChunkProducer};
use crate::error::{Error, Result};
use crate::plugin::PluginWorker;
use crate::rt_log::{RtLogDrain, RtLogger};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;

/// Status of a schedule or respond request. Never allocates.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerError {
    /// The queue is full. The request was not queued; try again later.
    #[error("Not enough space in the work queue")]
    NoSpace,

    #[error("No worker is available")]
    Unavailable,

    #[error("Work failed")]
    Failed,
}

/// Lifecycle of the worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Waiting to be woken.
    Idle = 0,
    /// Draining work items.
    Running = 1,
    /// Quit requested, not yet joined.
    Stopping = 2,
    Stopped = 3,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// Audio-thread view of the host, passed into `run`, `work_response` and `end_run`.
pub struct RunContext<'a> {
    items: Option<&'a mut ChunkProducer>,
    scheduled: &'a mut bool,
    log: &'a mut RtLogger,
}

impl<'a> RunContext<'a> {
    pub(crate) fn new(
        items: Option<&'a mut ChunkProducer>,
        scheduled: &'a mut bool,
        log: &'a mut RtLogger,
    ) -> Self {
        Self {
            items,
            scheduled,
            log,
        }
    }

    /// Queue `data` for the plugin's worker.
    ///
    /// `NoSpace` means the item was dropped and may be retried; it is not fatal.
    pub fn schedule_work(&mut self, data: &[u8]) -> std::result::Result<(), WorkerError> {
        let items = self
            .items
            .as_deref_mut()
            .ok_or(WorkerError::Unavailable)?;
        items.write(data).map_err(|_| WorkerError::NoSpace)?;
        *self.scheduled = true;
        Ok(())
    }

    pub fn has_worker(&self) -> bool {
        self.items.is_some()
    }

    /// Queue a message for the real-time log.
    pub fn log(&mut self, message: &str) -> bool {
        self.log.log(message)
    }
}

/// Worker-thread handle for sending responses back to the audio thread.
pub struct WorkResponder<'a> {
    responses: &'a mut ChunkProducer,
}

impl<'a> WorkResponder<'a> {
    pub fn respond(&mut self, data: &[u8]) -> std::result::Result<(), WorkerError> {
        self.responses
            .write(data)
            .map_err(|_| WorkerError::NoSpace)
    }

    pub fn available(&self) -> usize {
        self.responses.write_available()
    }
}

#[derive(Default)]
struct WakeState {
    pending: bool,
    quit: bool,
}

/// Everything the worker thread touches while draining.
struct Slot {
    plugin_worker: Option<Box<dyn PluginWorker>>,
    items: ChunkConsumer,
    responses: ChunkProducer,
}

impl Slot {
    /// Feed queued items to the plugin worker until the queue is empty or
    /// `quit` is raised.
    fn drain(&mut self, quit: &AtomicBool) -> usize {
        let Slot {
            plugin_worker,
            items,
            responses,
        } = self;

        let mut processed = 0;
        while !quit.load(Ordering::Acquire)
            && items
            .consume(|data| {
                let Some(worker) = plugin_worker.as_mut() else {
                    return;
                };
                let mut responder = WorkResponder {
                    responses: &mut *responses,
                };
                if let Err(e) = worker.work(&mut responder, data) {
                    tracing::warn!("Plugin work callback failed: {}", e);
                }
            })
            .is_some()
        {
            processed += 1;
        }
        processed
    }
}

struct Shared {
    wake: Mutex<WakeState>,
    condvar: Condvar,
    state: AtomicU8,
    /// Checked between items so shutdown does not wait for the whole queue.
    quit: AtomicBool,
    slot: Mutex<Slot>,
}

impl Shared {
    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Owner's handle to a running worker thread.
///
/// Dropping it stops and joins the thread. Items still queued are discarded.
pub struct Worker {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Start the worker thread. It begins `Idle`, waiting to be notified.
    pub fn spawn(
        items: ChunkConsumer,
        responses: ChunkProducer,
        rt_log: Arc<Mutex<RtLogDrain>>,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            wake: Mutex::new(WakeState::default()),
            condvar: Condvar::new(),
            state: AtomicU8::new(WorkerState::Idle as u8),
            quit: AtomicBool::new(false),
            slot: Mutex::new(Slot {
                plugin_worker: None,
                items,
                responses,
            }),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("horst-worker".into())
            .spawn(move || worker_loop(&thread_shared, &rt_log))
            .map_err(Error::WorkerSpawn)?;

        tracing::debug!("Worker thread started");

        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// Install the worker half of a new instance.
    ///
    /// Items queued for the previous instance are dropped; returns how many.
    pub fn replace_plugin_worker(&self, plugin_worker: Option<Box<dyn PluginWorker>>) -> usize {
        let mut slot = self.shared.slot.lock();
        slot.plugin_worker = plugin_worker;
        let dropped = slot.items.clear();
        if dropped > 0 {
            tracing::debug!("Dropped {} stale work items", dropped);
        }
        dropped
    }

    /// Wake the worker without blocking. Returns false if the lock was
    /// contended; the caller retries next cycle.
    #[inline]
    pub fn try_notify(&self) -> bool {
        match self.shared.wake.try_lock() {
            Some(mut wake) => {
                wake.pending = true;
                self.shared.condvar.notify_one();
                true
            }
            None => false,
        }
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Ask the thread to quit and join it.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        self.shared.quit.store(true, Ordering::Release);
        {
            let mut wake = self.shared.wake.lock();
            wake.quit = true;
            self.shared.set_state(WorkerState::Stopping);
            self.shared.condvar.notify_one();
        }

        if handle.join().is_err() {
            tracing::error!("Worker thread panicked");
        }
        self.shared.set_state(WorkerState::Stopped);

        let discarded = self.shared.slot.lock().items.clear();
        if discarded > 0 {
            tracing::debug!("Discarded {} queued work items at shutdown", discarded);
        }
        tracing::debug!("Worker thread stopped");
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: &Shared, rt_log: &Mutex<RtLogDrain>) {
    loop {
        {
            let mut wake = shared.wake.lock();
            while !wake.pending && !wake.quit {
                shared.set_state(WorkerState::Idle);
                shared.condvar.wait(&mut wake);
            }
            if wake.quit {
                break;
            }
            wake.pending = false;
            shared.set_state(WorkerState::Running);
        }

        rt_log.lock().drain();
        let processed = shared.slot.lock().drain(&shared.quit);
        tracing::trace!("Worker processed {} items", processed);
    }

    rt_log.lock().drain();
}
