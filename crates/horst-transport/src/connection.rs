//! Batch port connection helper.

use crate::client::TransportClient;
use crate::error::{Result, TransportError};

/// Lists and (dis)connects transport ports in batches.
pub struct ConnectionManager<C: TransportClient> {
    client: C,
}

impl<C: TransportClient> ConnectionManager<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }

    /// Full names of ports containing `pattern`.
    pub fn ports(&self, pattern: &str) -> Vec<String> {
        self.client.ports(pattern)
    }

    /// Connect every `(source, destination)` pair. Returns how many succeeded.
    ///
    /// With `fail_on_error` the first failure aborts the batch; otherwise
    /// failures are logged and skipped.
    pub fn connect(&mut self, connections: &[(String, String)], fail_on_error: bool) -> Result<usize> {
        let mut connected = 0;
        for (source, destination) in connections {
            tracing::debug!("Connecting \"{}\" -> \"{}\"", source, destination);
            match self.client.connect(source, destination) {
                Ok(()) => connected += 1,
                Err(e) if fail_on_error => {
                    return Err(TransportError::Connection {
                        source_port: source.clone(),
                        destination: destination.clone(),
                        reason: e.to_string(),
                    })
                }
                Err(e) => {
                    tracing::warn!("Failed to connect \"{}\" -> \"{}\": {}", source, destination, e)
                }
            }
        }
        Ok(connected)
    }

    /// Disconnect every pair, stopping at the first failure.
    pub fn disconnect(&mut self, connections: &[(String, String)]) -> Result<()> {
        for (source, destination) in connections {
            tracing::debug!("Disconnecting \"{}\" -> \"{}\"", source, destination);
            self.client
                .disconnect(source, destination)
                .map_err(|e| TransportError::Disconnection {
                    source_port: source.clone(),
                    destination: destination.clone(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }
}
