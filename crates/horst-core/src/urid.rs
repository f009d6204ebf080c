//! URID table: interning of URI strings to small integers.
//!
//! Identifiers start at 1; 0 is reserved for "unmapped". Entries are never
//! removed or renumbered for the lifetime of the table.

use crate::error::{Error, Result};
use hashbrown::HashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Integer standing in for a URI.
pub type Urid = u32;

/// The value no URI ever maps to.
pub const UNMAPPED: Urid = 0;

#[derive(Debug, Default)]
struct UridTable {
    uris: Vec<Arc<str>>,
    ids: HashMap<Arc<str>, Urid>,
}

/// Shared handle to an append-only URID table.
///
/// Cloning is cheap and every clone sees the same table, so the same handle
/// can be given to the plugin (map/unmap features) and kept by the host.
/// Mapping takes a lock and may allocate; it is not meant for the audio thread.
#[derive(Debug, Clone, Default)]
pub struct UridMap {
    table: Arc<RwLock<UridTable>>,
}

impl UridMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `uri` to its identifier, appending it if it is new.
    pub fn map(&self, uri: &str) -> Urid {
        if let Some(&urid) = self.table.read().ids.get(uri) {
            return urid;
        }

        let mut table = self.table.write();
        // Another thread may have mapped it between the two locks.
        if let Some(&urid) = table.ids.get(uri) {
            return urid;
        }

        let uri: Arc<str> = Arc::from(uri);
        table.uris.push(Arc::clone(&uri));
        let urid = table.uris.len() as Urid;
        tracing::trace!("URI: {} -> URID: {}", uri, urid);
        table.ids.insert(uri, urid);
        urid
    }

    /// Identifier of an already mapped `uri`. Never inserts.
    pub fn find(&self, uri: &str) -> Option<Urid> {
        self.table.read().ids.get(uri).copied()
    }

    /// Look up the URI for an identifier previously returned by [`map`](Self::map).
    pub fn unmap(&self, urid: Urid) -> Result<Arc<str>> {
        let table = self.table.read();
        urid.checked_sub(1)
            .and_then(|index| table.uris.get(index as usize))
            .cloned()
            .ok_or(Error::UridOutOfRange(urid))
    }

    /// Number of mapped URIs.
    pub fn len(&self) -> usize {
        self.table.read().uris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
