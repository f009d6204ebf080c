//! State persistence contract between host and plugin.
//!
//! The plugin drives save and restore, calling back into a store or
//! retrieve function for each property. The host side is a stub: storing
//! always reports [`StateStatus::Unknown`] and nothing is ever retrieved.

use crate::urid::Urid;
use std::path::{Path, PathBuf};

/// Result of a state callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateStatus {
    Success,
    Unknown,
    BadType,
    BadFlags,
    NoFeature,
    NoProperty,
    NoSpace,
}

/// A stored property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateValue<'a> {
    pub value: &'a [u8],
    pub value_type: Urid,
    pub flags: u32,
}

/// Host callback receiving properties during save.
pub trait StateStore {
    fn store(&mut self, key: Urid, value: &[u8], value_type: Urid, flags: u32) -> StateStatus;
}

/// Host callback providing properties during restore.
pub trait StateRetrieve {
    fn retrieve(&self, key: Urid) -> Option<StateValue<'_>>;
}

/// Plugin-side state extension.
pub trait StateInterface {
    fn save(&mut self, store: &mut dyn StateStore, flags: u32) -> StateStatus;

    fn restore(&mut self, retrieve: &dyn StateRetrieve, flags: u32) -> StateStatus;
}

/// Store/retrieve pair bound to a state path. Persists nothing.
#[derive(Debug, Clone)]
pub struct PathState {
    path: PathBuf,
}

impl PathState {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for PathState {
    fn store(&mut self, key: Urid, value: &[u8], value_type: Urid, flags: u32) -> StateStatus {
        tracing::debug!(
            key,
            size = value.len(),
            value_type,
            flags,
            path = %self.path.display(),
            "State store is not implemented"
        );
        StateStatus::Unknown
    }
}

impl StateRetrieve for PathState {
    fn retrieve(&self, key: Urid) -> Option<StateValue<'_>> {
        tracing::debug!(key, path = %self.path.display(), "State retrieve is not implemented");
        None
    }
}
