//! MIDI CC bindings for control ports.
//!
//! A binding is read by the audio thread every cycle and written by control
//! threads at any time. It is larger than any lock-free atomic, so
//! [`AtomicMidiBinding`] stores it behind a sequence lock: readers retry while
//! a write is in flight and never block a writer.

use crate::error::{MidiError, Result};
use crossbeam::utils::Backoff;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{fence, AtomicU32, Ordering};

/// Maps one (channel, controller) pair onto a control port.
///
/// The port value becomes `offset + factor * value / 127`, scaled linearly
/// into the port's `[minimum, maximum]` range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiBinding {
    pub enabled: bool,
    /// 0-15.
    pub channel: u8,
    /// 0-127.
    pub cc: u8,
    pub factor: f32,
    pub offset: f32,
}

impl Default for MidiBinding {
    fn default() -> Self {
        Self {
            enabled: false,
            channel: 0,
            cc: 0,
            factor: 1.0,
            offset: 0.0,
        }
    }
}

impl MidiBinding {
    /// An enabled binding with identity transform.
    pub fn new(channel: u8, cc: u8) -> Result<Self> {
        Self {
            enabled: true,
            channel,
            cc,
            ..Default::default()
        }
        .validated()
    }

    pub fn with_transform(mut self, factor: f32, offset: f32) -> Self {
        self.factor = factor;
        self.offset = offset;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Check channel and controller ranges.
    pub fn validated(self) -> Result<Self> {
        if self.channel > 15 {
            return Err(MidiError::InvalidChannel(self.channel));
        }
        if self.cc > 127 {
            return Err(MidiError::InvalidController(self.cc));
        }
        Ok(self)
    }

    #[inline]
    pub fn matches(&self, channel: u8, cc: u8) -> bool {
        self.enabled && self.channel == channel && self.cc == cc
    }

    /// Port value for a raw CC value, given the port's range.
    #[inline]
    pub fn map_value(&self, value: u8, minimum: f32, maximum: f32) -> f32 {
        let transformed = self.offset + self.factor * (value as f32 / 127.0);
        minimum + (maximum - minimum) * transformed
    }

    #[inline]
    fn pack_header(&self) -> u32 {
        (self.enabled as u32) | ((self.channel as u32) << 8) | ((self.cc as u32) << 16)
    }

    #[inline]
    fn unpack(header: u32, factor: u32, offset: u32) -> Self {
        Self {
            enabled: header & 1 != 0,
            channel: (header >> 8) as u8,
            cc: (header >> 16) as u8,
            factor: f32::from_bits(factor),
            offset: f32::from_bits(offset),
        }
    }
}

/// A [`MidiBinding`] shared between threads without locks on the read side.
#[derive(Debug)]
pub struct AtomicMidiBinding {
    /// Odd while a write is in progress.
    seq: AtomicU32,
    header: AtomicU32,
    factor: AtomicU32,
    offset: AtomicU32,
}

impl AtomicMidiBinding {
    pub fn new(binding: MidiBinding) -> Self {
        Self {
            seq: AtomicU32::new(0),
            header: AtomicU32::new(binding.pack_header()),
            factor: AtomicU32::new(binding.factor.to_bits()),
            offset: AtomicU32::new(binding.offset.to_bits()),
        }
    }

    /// Consistent snapshot. Spins only while a store is in flight.
    #[inline]
    pub fn load(&self) -> MidiBinding {
        let backoff = Backoff::new();
        loop {
            let before = self.seq.load(Ordering::Acquire);
            if before & 1 == 0 {
                let header = self.header.load(Ordering::Relaxed);
                let factor = self.factor.load(Ordering::Relaxed);
                let offset = self.offset.load(Ordering::Relaxed);
                fence(Ordering::Acquire);
                if self.seq.load(Ordering::Relaxed) == before {
                    return MidiBinding::unpack(header, factor, offset);
                }
            }
            backoff.spin();
        }
    }

    pub fn store(&self, binding: MidiBinding) {
        let backoff = Backoff::new();
        let mut seq = self.seq.load(Ordering::Relaxed);
        loop {
            if seq & 1 == 0 {
                match self.seq.compare_exchange_weak(
                    seq,
                    seq.wrapping_add(1),
                    Ordering::Acquire,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => break,
                    Err(current) => seq = current,
                }
            } else {
                backoff.snooze();
                seq = self.seq.load(Ordering::Relaxed);
            }
        }
        fence(Ordering::Release);

        self.header.store(binding.pack_header(), Ordering::Relaxed);
        self.factor.store(binding.factor.to_bits(), Ordering::Relaxed);
        self.offset.store(binding.offset.to_bits(), Ordering::Relaxed);

        self.seq.store(seq.wrapping_add(2), Ordering::Release);
    }
}

impl Default for AtomicMidiBinding {
    fn default() -> Self {
        Self::new(MidiBinding::default())
    }
}

impl Clone for AtomicMidiBinding {
    fn clone(&self) -> Self {
        Self::new(self.load())
    }
}
