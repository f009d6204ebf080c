//! Lock-free cells shared between the audio thread and the control plane.
//!
//! Each cell sits on its own cache line so that a port value written by the
//! audio thread does not contend with a flag toggled from the control thread.

use atomic_float::AtomicF32;
use std::sync::atomic::{AtomicBool, Ordering};

/// Published port value: written by any thread, read once per cycle.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFloat(AtomicF32);

impl AtomicFloat {
    pub fn new(value: f32) -> Self {
        Self(AtomicF32::new(value))
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.0.store(value, Ordering::Release);
    }
}

/// Runtime switch such as `enabled` or a monitoring toggle.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFlag(AtomicBool);

impl AtomicFlag {
    pub fn new(value: bool) -> Self {
        Self(AtomicBool::new(value))
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.0.store(value, Ordering::Release);
    }
}
