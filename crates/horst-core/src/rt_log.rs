//! Log channel for the audio thread.
//!
//! The audio thread may not call into `tracing` (formatting and subscriber
//! locks), so it pushes plain UTF-8 messages into a chunk queue instead.
//! A non-real-time thread drains them into `tracing::debug!`.

use crate::chunk_queue::{chunk_queue, ChunkConsumer, ChunkProducer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Create a log channel holding at most `capacity - 1` bytes of messages.
pub fn rt_log(capacity: usize) -> (RtLogger, RtLogDrain) {
    let (producer, consumer) = chunk_queue(capacity);
    let missed = Arc::new(AtomicUsize::new(0));
    (
        RtLogger {
            producer,
            missed: Arc::clone(&missed),
        },
        RtLogDrain { consumer, missed },
    )
}

/// Audio-thread end of the log channel.
pub struct RtLogger {
    producer: ChunkProducer,
    missed: Arc<AtomicUsize>,
}

impl RtLogger {
    /// Queue a message. Returns false (and counts it as missed) if it does not fit.
    pub fn log(&mut self, message: &str) -> bool {
        if self.producer.write(message.as_bytes()).is_ok() {
            true
        } else {
            self.missed.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    pub fn missed(&self) -> usize {
        self.missed.load(Ordering::Relaxed)
    }
}

/// Draining end of the log channel.
pub struct RtLogDrain {
    consumer: ChunkConsumer,
    missed: Arc<AtomicUsize>,
}

impl RtLogDrain {
    /// Forward every queued message to `tracing`. Returns how many were forwarded.
    pub fn drain(&mut self) -> usize {
        self.drain_with(|message| tracing::debug!("[rt] {}", message))
    }

    /// Hand every queued message to `f`, then report dropped messages.
    pub fn drain_with(&mut self, mut f: impl FnMut(&str)) -> usize {
        let mut count = 0;
        while self
            .consumer
            .consume(|bytes| f(&String::from_utf8_lossy(bytes)))
            .is_some()
        {
            count += 1;
        }

        let missed = self.missed.swap(0, Ordering::Relaxed);
        if missed > 0 {
            tracing::warn!("[rt] {} log messages dropped (queue full)", missed);
        }
        count
    }
}
