//! Reinstantiation on sample rate and buffer size changes.
//!
//! The transport calls these from its non-realtime callbacks, never while
//! [`TransportAdapter::process`] runs. While reconfiguring, and after a
//! failed reconfiguration, `process` outputs silence. A later successful
//! change recovers the adapter.

use crate::adapter::TransportAdapter;
use crate::controls::ReconfigState;
use crate::error::{Result, TransportError};
use std::error::Error as _;

impl TransportAdapter {
    /// The transport switched to a new buffer size.
    pub fn buffer_size_changed(&mut self, buffer_size: usize) -> Result<()> {
        if buffer_size == self.buffer_size && self.controls.reconfig_state() == ReconfigState::Stable {
            return Ok(());
        }
        self.reconfigure(self.sample_rate, buffer_size)
    }

    /// The transport switched to a new sample rate.
    pub fn sample_rate_changed(&mut self, sample_rate: f64) -> Result<()> {
        if sample_rate == self.sample_rate && self.controls.reconfig_state() == ReconfigState::Stable {
            return Ok(());
        }
        self.reconfigure(sample_rate, self.buffer_size)
    }

    fn reconfigure(&mut self, sample_rate: f64, buffer_size: usize) -> Result<()> {
        self.controls.set_reconfig_state(ReconfigState::Reconfiguring);
        tracing::info!(
            "Reconfiguring {}: {} Hz / {} frames",
            self.horst.name(),
            sample_rate,
            buffer_size
        );

        match self.try_reconfigure(sample_rate, buffer_size) {
            Ok(()) => {
                self.controls.set_reconfig_state(ReconfigState::Stable);
                Ok(())
            }
            Err(e) => {
                match e.source() {
                    Some(cause) => tracing::error!("{}: {}", e, cause),
                    None => tracing::error!("{}", e),
                }
                self.controls.set_reconfig_state(ReconfigState::Failed);
                Err(e)
            }
        }
    }

    fn try_reconfigure(&mut self, sample_rate: f64, buffer_size: usize) -> Result<()> {
        let failed = move |source: horst_core::Error| TransportError::Reconfiguration {
            sample_rate,
            buffer_size,
            source,
        };

        if self.horst.power_of_two_block_length_required() && !buffer_size.is_power_of_two() {
            return Err(failed(horst_core::Error::NonPowerOfTwoBlockLength(buffer_size)));
        }

        self.sample_rate = sample_rate;
        self.buffer_size = buffer_size;
        self.resize_zero_buffers(buffer_size);

        self.horst.instantiate(sample_rate, buffer_size).map_err(failed)?;
        self.connect_control_ports().map_err(failed)?;
        Ok(())
    }
}
