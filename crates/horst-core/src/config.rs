//! Host configuration.

use serde::{Deserialize, Serialize};

/// Queue sizes for one plugin host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Work-item queue capacity in bytes.
    pub work_queue_capacity: usize,
    /// Work-response queue capacity in bytes.
    pub response_queue_capacity: usize,
    /// Real-time log queue capacity in bytes.
    pub realtime_log_capacity: usize,
    /// Largest single work item or response. `None` allows the whole queue.
    pub max_chunk_size: Option<usize>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            work_queue_capacity: 10 * 1024 * 1024,
            response_queue_capacity: 10 * 1024 * 1024,
            realtime_log_capacity: 10 * 1024,
            max_chunk_size: None,
        }
    }
}

impl HostConfig {
    pub fn with_work_queue_capacity(mut self, bytes: usize) -> Self {
        self.work_queue_capacity = bytes;
        self
    }

    pub fn with_response_queue_capacity(mut self, bytes: usize) -> Self {
        self.response_queue_capacity = bytes;
        self
    }

    pub fn with_realtime_log_capacity(mut self, bytes: usize) -> Self {
        self.realtime_log_capacity = bytes;
        self
    }

    pub fn with_max_chunk_size(mut self, bytes: usize) -> Self {
        self.max_chunk_size = Some(bytes);
        self
    }

    pub(crate) fn max_chunk_for(&self, capacity: usize) -> usize {
        self.max_chunk_size
            .unwrap_or(capacity.saturating_sub(1))
    }
}
