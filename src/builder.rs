//! Builder for hosting a plugin on a transport.

use crate::Result;
use horst_core::{Horst, HostConfig, PluginProvider};
use horst_transport::{AdapterConfig, Transport, TransportAdapter, TransportError};

/// Looks a plugin up, opens a transport client for it and wires both together.
///
/// # Example
///
/// ```ignore
/// use horst::prelude::*;
///
/// let (mut adapter, client) = HorstBuilder::new(&registry, "http://example.org/amp")
///     .client_name("amp-1")
///     .build(&transport)?;
///
/// // From the transport's process callback:
/// adapter.process(&scope);
/// ```
pub struct HorstBuilder<'a> {
    provider: &'a dyn PluginProvider,
    uri: String,
    host_config: HostConfig,
    adapter_config: AdapterConfig,
}

impl<'a> HorstBuilder<'a> {
    pub fn new(provider: &'a dyn PluginProvider, uri: impl Into<String>) -> Self {
        Self {
            provider,
            uri: uri.into(),
            host_config: HostConfig::default(),
            adapter_config: AdapterConfig::default(),
        }
    }

    /// Default: the plugin name
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.adapter_config.client_name = Some(name.into());
        self
    }

    pub fn host_config(mut self, config: HostConfig) -> Self {
        self.host_config = config;
        self
    }

    pub fn adapter_config(mut self, config: AdapterConfig) -> Self {
        self.adapter_config = config;
        self
    }

    /// Instantiate the plugin for a freshly opened client of `transport`.
    ///
    /// The client is returned so the caller can activate it and hand the
    /// adapter to its process callback.
    pub fn build<T: Transport>(self, transport: &T) -> Result<(TransportAdapter, T::Client)> {
        let descriptor = self.provider.get(&self.uri)?;
        let horst = Horst::with_config(descriptor, &self.host_config)?;

        let name = self.adapter_config.resolve_client_name(horst.name()).to_string();
        let mut client = transport.open(&name).map_err(|e| match e {
            e @ TransportError::ClientOpen { .. } => e,
            other => TransportError::ClientOpen {
                name: name.clone(),
                reason: other.to_string(),
            },
        })?;

        let adapter = TransportAdapter::new(horst, &mut client, &self.adapter_config)?;
        tracing::info!("Client \"{}\" ready", adapter.client_name());
        Ok((adapter, client))
    }
}
